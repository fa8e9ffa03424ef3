//! Movie summary endpoint tests.

mod common;

use axum::http::StatusCode;
use common::{offline_config, with_llm, TestHarness};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn summaries_need_an_llm() {
    let harness = TestHarness::new();
    let (status, body) = harness
        .post("/api/movie/summary", json!({"title": "Dune"}))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "not_configured");
}

#[tokio::test]
async fn summary_requires_title() {
    let llm = MockServer::start().await;
    let harness = TestHarness::with_config(with_llm(offline_config(), &llm.uri()));

    let (status, body) = harness
        .post("/api/movie/summary-only", json!({"plot": "Sand."}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn short_summary_is_generated_once() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("  A desert epic about power and prophecy.\n"))
        .expect(1)
        .mount(&llm)
        .await;

    let harness = TestHarness::with_config(with_llm(offline_config(), &llm.uri()));
    for _ in 0..2 {
        let (status, body) = harness
            .post("/api/movie/summary-only", json!({"title": "Dune"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["summary"],
            "A desert epic about power and prophecy."
        );
    }
}

#[tokio::test]
async fn full_summary_combines_three_prompts() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("3 key highlights"))
        .respond_with(completion("1. Stunning visuals\n2. Score by Hans Zimmer\n- Epic scale\n4. extra"))
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Suggest 5 similar"))
        .respond_with(completion("Arrival, Blade Runner 2049，Interstellar、Prometheus, Sunshine, Alien"))
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("film critic. Summarize"))
        .respond_with(completion("Worth it."))
        .mount(&llm)
        .await;

    let harness = TestHarness::with_config(with_llm(offline_config(), &llm.uri()));
    let (status, body) = harness
        .post(
            "/api/movie/summary",
            json!({"title": "Dune", "genres": ["Science Fiction"]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["summary"], "Worth it.");
    assert_eq!(
        data["highlights"],
        json!(["Stunning visuals", "Score by Hans Zimmer", "Epic scale"])
    );
    assert_eq!(
        data["similarMovies"],
        json!(["Arrival", "Blade Runner 2049", "Interstellar", "Prometheus", "Sunshine"])
    );
}

#[tokio::test]
async fn llm_outage_is_bad_gateway() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&llm)
        .await;

    let harness = TestHarness::with_config(with_llm(offline_config(), &llm.uri()));
    let (status, _) = harness
        .post("/api/movie/similar", json!({"title": "Dune"}))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
