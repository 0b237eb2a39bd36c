//! Gemini oracle client tests against a mock HTTP server.

use serde_json::json;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use news_xai::config::{GeminiConfig, RequestConfig};
use news_xai::error::{OracleError, ParseError};
use news_xai::gemini::{GeminiClient, NarrativeExplanation, OracleExt, VerificationOracle};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn create_client(base_url: &str, max_retries: u32) -> GeminiClient {
    let config = GeminiConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        model: "gemini-2.5-flash".to_string(),
    };
    let request = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 10,
    };
    GeminiClient::new(&config, request).expect("Failed to create client")
}

fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 40, "totalTokenCount": 160 }
    }))
}

#[tokio::test]
async fn test_verify_parses_tagged_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_string_contains("Earth is flat"))
        .respond_with(answer(
            "VERDICT: fake\nSUMMARY:\n- NASA imagery shows a sphere\nEXPLANATION: The claim contradicts centuries of evidence.",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server.uri(), 0);
    let analysis = client
        .verify("Breaking: Earth is flat, NASA hides truth")
        .await
        .unwrap();

    assert_eq!(analysis.verdict, "FAKE");
    assert_eq!(analysis.summary, "- NASA imagery shows a sphere");
    assert_eq!(
        analysis.explanation,
        "The claim contradicts centuries of evidence."
    );
}

#[tokio::test]
async fn test_answer_split_across_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "VERDICT: REAL\nSUMMARY: ok\n" },
                    { "text": "EXPLANATION: consistent with reporting" }
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let analysis = create_client(&server.uri(), 0).verify("text").await.unwrap();
    assert_eq!(analysis.verdict, "REAL");
    assert_eq!(analysis.explanation, "consistent with reporting");
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
        .expect(1)
        .mount(&server)
        .await;

    let err = create_client(&server.uri(), 0)
        .verify("text")
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Api { status: 403, .. }));
}

#[tokio::test]
async fn test_retries_then_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = create_client(&server.uri(), 2)
        .verify("text")
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Unavailable { retries: 3, .. }));
}

#[tokio::test]
async fn test_empty_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = create_client(&server.uri(), 0)
        .verify("text")
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::EmptyResponse));
}

#[tokio::test]
async fn test_missing_section_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(answer("VERDICT: FAKE\nSUMMARY: no explanation follows"))
        .mount(&server)
        .await;

    let err = create_client(&server.uri(), 0)
        .verify("text")
        .await
        .unwrap_err();
    match err {
        OracleError::Parse(ParseError::MissingSection { section }) => {
            assert_eq!(section, "EXPLANATION")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = create_client(&server.uri(), 0)
        .verify("text")
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_analyze_and_explain_never_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = create_client(&server.uri(), 0);
    assert!(client.analyze("text").await.is_none());
    assert_eq!(
        client.explain("text", "FAKE", 42.0).await,
        NarrativeExplanation::unavailable()
    );
}

#[tokio::test]
async fn test_unreachable_server() {
    let client = create_client("http://127.0.0.1:1", 0);
    assert!(client.analyze("text").await.is_none());
}
