use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// The only labels allowed to reach a caller (besides "no label").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Real,
    Fake,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Real => "real",
            Verdict::Fake => "fake",
            Verdict::Unknown => "unknown",
        }
    }

    /// Canonical verdict for a local model label; anything unresolvable becomes `Unknown`.
    pub fn from_model_label(label: &str) -> Self {
        normalize_label(label).unwrap_or(Verdict::Unknown)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" => Ok(Verdict::Real),
            "fake" => Ok(Verdict::Fake),
            "unknown" => Ok(Verdict::Unknown),
            _ => Err(format!("Unknown verdict: {}", s)),
        }
    }
}

const REAL_SYNONYMS: [&str; 6] = ["real", "true", "authentic", "genuine", "verified", "legit"];
const FAKE_SYNONYMS: [&str; 6] = [
    "fake",
    "false",
    "fabricated",
    "hoax",
    "misleading",
    "misinformation",
];

/// Canonicalise a free-form classification into `real`/`fake`.
///
/// Exact synonyms are tried first, then a substring match on `real` and
/// then `fake`. Returns `None` when neither resolves.
pub fn normalize_label(raw: &str) -> Option<Verdict> {
    let token = raw.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }

    if REAL_SYNONYMS.contains(&token.as_str()) {
        return Some(Verdict::Real);
    }
    if FAKE_SYNONYMS.contains(&token.as_str()) {
        return Some(Verdict::Fake);
    }
    if token.contains("real") {
        return Some(Verdict::Real);
    }
    if token.contains("fake") {
        return Some(Verdict::Fake);
    }

    warn!(classification = %raw, "Could not normalize classification");
    None
}

/// Oracle side of a comparison; `Error` when the oracle failed or answered nonsense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleVerdict {
    #[serde(rename = "real")]
    Real,
    #[serde(rename = "fake")]
    Fake,
    #[serde(rename = "ERROR")]
    Error,
}

impl From<Verdict> for OracleVerdict {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Real => OracleVerdict::Real,
            Verdict::Fake => OracleVerdict::Fake,
            Verdict::Unknown => OracleVerdict::Error,
        }
    }
}

impl fmt::Display for OracleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleVerdict::Real => f.write_str("real"),
            OracleVerdict::Fake => f.write_str("fake"),
            OracleVerdict::Error => f.write_str("ERROR"),
        }
    }
}
