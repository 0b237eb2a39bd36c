//! Verification oracle backed by Google Gemini.
//!
//! [`GeminiClient`] sends the fact-checking prompt and reads back the tagged
//! answer through [`parse_tagged_response`]. Everything above this module
//! talks to the [`VerificationOracle`] trait only.

mod client;
mod oracle;
mod parse;
mod types;

pub use client::GeminiClient;
#[cfg(test)]
pub use oracle::MockVerificationOracle;
pub use oracle::{OracleExt, VerificationOracle};
pub use parse::{extract_section, parse_tagged_response, MAX_SCAN_BYTES};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    NarrativeExplanation, OracleAnalysis, Part, UsageMetadata,
};
