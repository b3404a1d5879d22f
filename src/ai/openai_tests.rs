//! Unit tests for the OpenAI-compatible text generator.

use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::ai::generation::{
    GenerationConstraints, GenerationError, GenerationRequest, TextGenerator,
};

use super::{
    ChatContent, OpenAiConfig, OpenAiTextGenerator, parse_content_value, truncate_for_message,
};

#[fixture]
fn request() -> GenerationRequest {
    GenerationRequest::new("You summarise pull requests.", "Summarise this diff").with_constraints(
        GenerationConstraints {
            max_tokens: Some(256),
            schema_hint: Some(json!({ "problem": "string" })),
        },
    )
}

fn generator_for(server: &MockServer, timeout: Duration) -> OpenAiTextGenerator {
    OpenAiTextGenerator::new(OpenAiConfig::new(
        format!("{}/v1", server.uri()),
        "gpt-test",
        Some("sk-test".to_owned()),
        timeout,
    ))
    .expect("client should build")
}

async fn respond_with(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[test]
fn parse_content_value_supports_string_and_array() {
    let as_string: ChatContent =
        serde_json::from_value(json!("hello")).expect("string content should decode");
    let as_array: ChatContent = serde_json::from_value(json!([{"text":"first"}, {"text":"second"}]))
        .expect("array content should decode");
    let as_null: ChatContent = serde_json::from_value(json!(null)).expect("null should decode");

    assert_eq!(parse_content_value(&as_string), Some("hello"));
    assert_eq!(parse_content_value(&as_array), Some("first"));
    assert_eq!(parse_content_value(&as_null), None);
}

#[rstest]
#[case::short("abc", 5, "abc")]
#[case::exact("abcde", 5, "abcde")]
#[case::long("abcdefgh", 5, "abcde...")]
fn truncate_for_message_marks_cut_text(
    #[case] input: &str,
    #[case] max: usize,
    #[case] expected: &str,
) {
    assert_eq!(truncate_for_message(input, max), expected);
}

#[rstest]
#[tokio::test]
async fn complete_requires_api_key(request: GenerationRequest) {
    let generator = OpenAiTextGenerator::new(OpenAiConfig::default()).expect("client should build");
    let error = generator
        .complete(&request)
        .await
        .expect_err("missing key should be rejected");

    assert!(
        matches!(error, GenerationError::Configuration { .. }),
        "expected Configuration error, got {error:?}"
    );
}

#[rstest]
#[tokio::test]
async fn complete_returns_trimmed_assistant_text(request: GenerationRequest) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-test",
            "max_tokens": 256,
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  {\"ok\":true}\n" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = generator_for(&server, Duration::from_secs(5))
        .complete(&request)
        .await
        .expect("completion should succeed");

    assert_eq!(text, "{\"ok\":true}");
}

#[rstest]
#[case::rate_limited(429)]
#[case::gateway_timeout(504)]
#[case::server_error(500)]
#[tokio::test]
async fn complete_maps_error_statuses(request: GenerationRequest, #[case] status: u16) {
    let server = respond_with(ResponseTemplate::new(status).set_body_string("busy")).await;

    let error = generator_for(&server, Duration::from_secs(5))
        .complete(&request)
        .await
        .expect_err("error status should fail");

    match status {
        429 => assert!(
            matches!(error, GenerationError::RateLimited { .. }),
            "expected RateLimited, got {error:?}"
        ),
        504 => assert_eq!(error, GenerationError::Timeout),
        _ => assert!(
            matches!(&error, GenerationError::Api { message } if message.contains("500")),
            "expected Api error mentioning status, got {error:?}"
        ),
    }
}

#[rstest]
#[tokio::test]
async fn complete_reports_client_timeout(request: GenerationRequest) {
    let server = respond_with(
        ResponseTemplate::new(200)
            .set_delay(Duration::from_millis(500))
            .set_body_json(json!({ "choices": [] })),
    )
    .await;

    let error = generator_for(&server, Duration::from_millis(50))
        .complete(&request)
        .await
        .expect_err("slow response should time out");

    assert_eq!(error, GenerationError::Timeout);
}

#[rstest]
#[tokio::test]
async fn complete_rejects_blank_content(request: GenerationRequest) {
    let server = respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": "   " } }]
    })))
    .await;

    let error = generator_for(&server, Duration::from_secs(5))
        .complete(&request)
        .await
        .expect_err("blank content should fail");

    assert_eq!(error, GenerationError::EmptyResponse);
}
