use async_trait::async_trait;
use tracing::{debug, warn};

use super::types::{NarrativeExplanation, OracleAnalysis};
use crate::error::OracleResult;

/// External verification service consulted for a second verdict and a
/// narrative explanation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationOracle: Send + Sync {
    /// Ask the oracle about one article.
    async fn verify(&self, article_text: &str) -> OracleResult<OracleAnalysis>;
}

/// Non-failing entry points available on every [`VerificationOracle`].
///
/// Both convert every failure into a sentinel and a log event.
#[async_trait]
pub trait OracleExt: VerificationOracle {
    /// Like `verify`, but `None` on transport, credential, or format failure.
    async fn analyze(&self, article_text: &str) -> Option<OracleAnalysis> {
        match self.verify(article_text).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!(error = %e, "Oracle analysis unavailable");
                None
            }
        }
    }

    /// Legacy `(summary, explanation, confidence note)` shape. Never empty-handed:
    /// failures yield the fixed placeholder triple.
    async fn explain(
        &self,
        article_text: &str,
        label: &str,
        confidence: f64,
    ) -> NarrativeExplanation {
        debug!(label, confidence, "Requesting narrative explanation");
        match self.analyze(article_text).await {
            Some(analysis) => NarrativeExplanation::from_analysis(&analysis),
            None => NarrativeExplanation::unavailable(),
        }
    }
}

impl<T: VerificationOracle + ?Sized> OracleExt for T {}
