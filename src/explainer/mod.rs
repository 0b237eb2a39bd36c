//! Word-level attribution for the fake-news classifier.
//!
//! [`PerturbationExplainer`] removes random subsets of words from the
//! article, asks the model how the probability of `fake` moves, and ranks
//! words by how much their presence shifts it.

mod stopwords;

pub use stopwords::{is_informative, is_stop_word};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, error};

use crate::arbiter::Verdict;
use crate::classifier::LocalClassifier;
use crate::config::ExplainerConfig;
use crate::error::ClassifierResult;

/// Characters of article text considered for attribution.
pub const MAX_EXPLAIN_CHARS: usize = 1500;
/// Ranked candidates considered before filtering.
pub const NUM_FEATURES: usize = 30;
/// Influences returned after filtering.
pub const MAX_INFLUENCES: usize = 10;

const KERNEL_WIDTH: f64 = 0.25;

/// One word's pull on the prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordInfluence {
    pub word: String,
    /// Positive pushes towards `fake`.
    pub score: f64,
    pub impact: Verdict,
}

impl WordInfluence {
    fn new(word: impl Into<String>, score: f64) -> Self {
        Self {
            word: word.into(),
            score,
            impact: if score > 0.0 {
                Verdict::Fake
            } else {
                Verdict::Real
            },
        }
    }
}

/// Attribution result: HTML markup plus the ranked influences, strongest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub markup: Option<String>,
    pub influences: Vec<WordInfluence>,
}

impl Explanation {
    /// The `(None, [])` sentinel.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A model that reports how likely a text is to be fake.
#[async_trait]
pub trait ProbabilityModel: Send + Sync {
    async fn fake_probability(&self, text: &str) -> ClassifierResult<f64>;
}

#[async_trait]
impl ProbabilityModel for LocalClassifier {
    async fn fake_probability(&self, text: &str) -> ClassifierResult<f64> {
        LocalClassifier::fake_probability(self, text).await
    }
}

/// Pluggable attribution algorithm. Never fails; total failure is [`Explanation::empty`].
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, text: &str, model: &dyn ProbabilityModel) -> Explanation;
}

/// Local surrogate attribution over random word removals.
#[derive(Debug, Clone)]
pub struct PerturbationExplainer {
    num_samples: usize,
    seed: Option<u64>,
}

impl Default for PerturbationExplainer {
    fn default() -> Self {
        Self::from_config(&ExplainerConfig::default())
    }
}

impl PerturbationExplainer {
    pub fn new(num_samples: usize, seed: Option<u64>) -> Self {
        Self {
            num_samples: num_samples.max(1),
            seed,
        }
    }

    pub fn from_config(config: &ExplainerConfig) -> Self {
        Self::new(config.num_samples, config.seed)
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    async fn attribute(
        &self,
        text: &str,
        model: &dyn ProbabilityModel,
    ) -> ClassifierResult<Explanation> {
        let clean: String = unescape_html(text).chars().take(MAX_EXPLAIN_CHARS).collect();
        let doc = Document::new(&clean);
        let d = doc.vocabulary.len();
        if d == 0 {
            return Ok(Explanation::empty());
        }

        let masks = self.masks(d);
        let mut samples = Vec::with_capacity(masks.len());
        for mask in masks {
            let probability = model.fake_probability(&doc.render(&mask)).await?;
            let removed = mask.iter().filter(|keep| !**keep).count();
            let distance = removed as f64 / d as f64;
            let weight = (-(distance * distance) / (KERNEL_WIDTH * KERNEL_WIDTH)).exp();
            samples.push((mask, probability, weight));
        }

        let mut ranked: Vec<WordInfluence> = doc
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, word)| WordInfluence::new(word.clone(), word_score(&samples, i)))
            .collect();
        ranked.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));

        let influences: Vec<WordInfluence> = ranked
            .into_iter()
            .take(NUM_FEATURES)
            .filter(|influence| is_informative(&influence.word))
            .take(MAX_INFLUENCES)
            .collect();

        debug!(
            words = d,
            samples = samples.len(),
            kept = influences.len(),
            "Attribution computed"
        );

        Ok(Explanation {
            markup: Some(render_markup(&influences)),
            influences,
        })
    }

    /// Keep/drop masks; the first keeps every word.
    fn masks(&self, d: usize) -> Vec<Vec<bool>> {
        let mut rng = self.rng();
        let mut masks = Vec::with_capacity(self.num_samples);
        masks.push(vec![true; d]);
        for _ in 1..self.num_samples {
            let k = rng.random_range(1..=d);
            let mut mask = vec![true; d];
            for i in index::sample(&mut rng, d, k).iter() {
                mask[i] = false;
            }
            masks.push(mask);
        }
        masks
    }
}

#[async_trait]
impl Explainer for PerturbationExplainer {
    async fn explain(&self, text: &str, model: &dyn ProbabilityModel) -> Explanation {
        match self.attribute(text, model).await {
            Ok(explanation) => explanation,
            Err(e) => {
                error!(error = %e, "Attribution failed");
                Explanation::empty()
            }
        }
    }
}

fn word_score(samples: &[(Vec<bool>, f64, f64)], word: usize) -> f64 {
    let (mut on_sum, mut on_weight, mut off_sum, mut off_weight) = (0.0, 0.0, 0.0, 0.0);
    for (mask, probability, weight) in samples {
        if mask[word] {
            on_sum += probability * weight;
            on_weight += weight;
        } else {
            off_sum += probability * weight;
            off_weight += weight;
        }
    }
    if on_weight == 0.0 || off_weight == 0.0 {
        return 0.0;
    }
    on_sum / on_weight - off_sum / off_weight
}

fn render_markup(influences: &[WordInfluence]) -> String {
    influences
        .iter()
        .map(|influence| {
            format!(
                r#"<span class="xai-{}" data-score="{:.4}">{}</span>"#,
                influence.impact, influence.score, influence.word
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
    })
}

/// Decode the common named and numeric HTML entities; unknown ones are left alone.
pub fn unescape_html(text: &str) -> String {
    entity_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "quot" => Some('"'),
                "amp" => Some('&'),
                "apos" => Some('\''),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|n| n.parse().ok()))
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Article text split into word tokens over a distinct vocabulary.
struct Document<'a> {
    text: &'a str,
    /// `(start, end, vocabulary index)` per token.
    tokens: Vec<(usize, usize, usize)>,
    vocabulary: Vec<String>,
}

impl<'a> Document<'a> {
    fn new(text: &'a str) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut vocabulary = Vec::new();
        let mut tokens = Vec::new();
        for m in word_pattern().find_iter(text) {
            let next = vocabulary.len();
            let id = *index.entry(m.as_str()).or_insert(next);
            if id == next {
                vocabulary.push(m.as_str().to_string());
            }
            tokens.push((m.start(), m.end(), id));
        }
        Self {
            text,
            tokens,
            vocabulary,
        }
    }

    /// The text with every occurrence of dropped words removed.
    fn render(&self, keep: &[bool]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for &(start, end, id) in &self.tokens {
            out.push_str(&self.text[cursor..start]);
            if keep[id] {
                out.push_str(&self.text[start..end]);
            }
            cursor = end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}
