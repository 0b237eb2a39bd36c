//! Centralized prompt definitions for the verification oracle
//!
//! The oracle answers in a tagged plain-text format that
//! [`crate::gemini::parse_tagged_response`] reads back.

/// Placeholder replaced with the article text.
const ARTICLE_PLACEHOLDER: &str = "{article}";

/// Fact-checking prompt. The three tags must match the parser's tag set.
pub const FACT_CHECK_PROMPT: &str = r#"Act as a professional Fact-Checker. Analyze the following news article:

ARTICLE: "{article}"

Please provide your response in this EXACT format:
VERDICT: [Either 'REAL' or 'FAKE']
SUMMARY: [Provide 3-5 bullet points]
EXPLANATION: [A brief explanation of your factual reasoning]
"#;

/// Build the fact-checking prompt for one article.
pub fn fact_check_prompt(article_text: &str) -> String {
    FACT_CHECK_PROMPT.replacen(ARTICLE_PLACEHOLDER, article_text, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_tag() {
        for tag in ["VERDICT:", "SUMMARY:", "EXPLANATION:"] {
            assert!(FACT_CHECK_PROMPT.contains(tag), "missing {tag}");
        }
    }

    #[test]
    fn test_fact_check_prompt_embeds_article() {
        let prompt = fact_check_prompt("Earth is flat");
        assert!(prompt.contains("ARTICLE: \"Earth is flat\""));
        assert!(!prompt.contains(ARTICLE_PLACEHOLDER));
    }

    #[test]
    fn test_article_braces_are_not_reexpanded() {
        let prompt = fact_check_prompt("literal {article} token");
        assert!(prompt.contains("literal {article} token"));
    }
}
