//! Reader for the oracle's tagged plain-text answer.
//!
//! ```text
//! VERDICT: FAKE
//! SUMMARY: - claim contradicts satellite imagery
//! EXPLANATION: ...
//! ```
//!
//! Tags are matched case-insensitively. A section runs from its first tag up
//! to the next tag of any kind, or the end of the scanned text.

use regex::Regex;
use std::sync::OnceLock;

use super::types::OracleAnalysis;
use crate::error::ParseError;

/// Only this many bytes of a response are scanned.
pub const MAX_SCAN_BYTES: usize = 32 * 1024;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(VERDICT|SUMMARY|EXPLANATION):").expect("tag pattern is valid")
    })
}

struct Tag<'a> {
    name: &'a str,
    start: usize,
    end: usize,
}

fn bounded(text: &str) -> &str {
    if text.len() <= MAX_SCAN_BYTES {
        return text;
    }
    let mut end = MAX_SCAN_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn scan_tags(text: &str) -> Vec<Tag<'_>> {
    tag_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Tag {
                name: name.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Extract one section, `None` when its tag never appears.
pub fn extract_section<'a>(text: &'a str, section: &str) -> Option<&'a str> {
    let text = bounded(text);
    let tags = scan_tags(text);
    let (index, tag) = tags
        .iter()
        .enumerate()
        .find(|(_, tag)| tag.name.eq_ignore_ascii_case(section))?;
    let stop = tags.get(index + 1).map_or(text.len(), |next| next.start);
    Some(text[tag.end..stop].trim())
}

/// Parse a full tagged answer. The verdict is upper-cased.
///
/// A missing tag is an error; a tag followed by nothing yields an empty field.
pub fn parse_tagged_response(text: &str) -> Result<OracleAnalysis, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let section = |name: &str| {
        extract_section(text, name)
            .map(str::to_string)
            .ok_or_else(|| ParseError::MissingSection {
                section: name.to_string(),
            })
    };

    Ok(OracleAnalysis {
        verdict: section("VERDICT")?.to_uppercase(),
        summary: section("SUMMARY")?,
        explanation: section("EXPLANATION")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WELL_FORMED: &str = "VERDICT: fake\nSUMMARY:\n- NASA images show a round Earth\n- No hidden truth\nEXPLANATION: The claim contradicts established evidence.";

    #[test]
    fn test_parse_well_formed() {
        let analysis = parse_tagged_response(WELL_FORMED).unwrap();
        assert_eq!(
            analysis,
            OracleAnalysis {
                verdict: "FAKE".to_string(),
                summary: "- NASA images show a round Earth\n- No hidden truth".to_string(),
                explanation: "The claim contradicts established evidence.".to_string(),
            }
        );
    }

    #[test]
    fn test_tags_are_case_insensitive_and_reordered() {
        let text = "explanation: because\nverdict: Real\nsummary: ok";
        let analysis = parse_tagged_response(text).unwrap();
        assert_eq!(analysis.verdict, "REAL");
        assert_eq!(analysis.summary, "ok");
        assert_eq!(analysis.explanation, "because");
    }

    #[test]
    fn test_preamble_is_ignored() {
        let text = format!("Sure, here is my analysis.\n\n{WELL_FORMED}");
        let analysis = parse_tagged_response(&text).unwrap();
        assert_eq!(analysis.verdict, "FAKE");
    }

    #[test]
    fn test_missing_section_is_explicit() {
        let err = parse_tagged_response("VERDICT: REAL\nSUMMARY: fine").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingSection {
                section: "EXPLANATION".to_string()
            }
        );
    }

    #[test]
    fn test_empty_field_is_not_missing() {
        let analysis = parse_tagged_response("VERDICT: REAL\nSUMMARY:\nEXPLANATION:").unwrap();
        assert_eq!(analysis.summary, "");
        assert_eq!(analysis.explanation, "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_tagged_response("  \n"), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "VERDICT: FAKE\nSUMMARY: a\nEXPLANATION: b\nVERDICT: REAL";
        assert_eq!(extract_section(text, "VERDICT"), Some("FAKE"));
        assert_eq!(extract_section(text, "EXPLANATION"), Some("b"));
    }

    #[test]
    fn test_scan_is_bounded() {
        let mut text = "x".repeat(MAX_SCAN_BYTES);
        text.push_str("VERDICT: FAKE");
        assert_eq!(extract_section(&text, "VERDICT"), None);
    }

    #[test]
    fn test_bounded_respects_char_boundaries() {
        let text = "é".repeat(MAX_SCAN_BYTES);
        let cut = bounded(&text);
        assert!(cut.len() <= MAX_SCAN_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
