use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use news_summarizer::config::Config;
use news_summarizer::llm::GenerationError;
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

use crate::common::*;

#[tokio::test]
async fn missing_text_is_rejected() {
    let generator = FakeGenerator::replying(SUMMARY);
    let app = app(FakeFetcher::html(""), generator.clone());

    for body in [json!({}), json!({ "text": "" }), json!({ "text": "  \n " })] {
        let (status, body) = post_json(&app, "/api/summarize", body, "10.0.0.1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "text is required");
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn identical_text_and_language_reuse_summary() {
    let generator = FakeGenerator::replying(SUMMARY);
    let app = app(FakeFetcher::html(""), generator.clone());
    let request = json!({ "text": "Harga beras naik di Jakarta.", "lang": "id" });

    let (status, first) = post_json(&app, "/api/summarize", request.clone(), "10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = post_json(&app, "/api/summarize", request, "10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first, second);
    assert_eq!(first["summary"], SUMMARY);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn different_languages_are_cached_separately() {
    let generator = FakeGenerator::replying(SUMMARY);
    let app = app(FakeFetcher::html(""), generator.clone());
    let text = "Harga beras naik di Jakarta.";

    post_json(&app, "/api/summarize", json!({ "text": text, "lang": "id" }), "10.0.0.1").await;
    assert!(generator.last_prompt().unwrap().contains("in Indonesian."));

    post_json(&app, "/api/summarize", json!({ "text": text, "lang": "en" }), "10.0.0.1").await;
    assert!(generator.last_prompt().unwrap().contains("in English."));
    assert_eq!(generator.calls(), 2);

    // No selector means Indonesian, which is already cached.
    post_json(&app, "/api/summarize", json!({ "text": text }), "10.0.0.1").await;
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn prompt_includes_source_url_and_article() {
    let generator = FakeGenerator::replying(SUMMARY);
    let app = app(FakeFetcher::html(""), generator.clone());

    let (status, _) = post_json(
        &app,
        "/api/summarize",
        json!({ "text": "Isi artikel.", "url": "https://www.tempo.co/a/1" }),
        "10.0.0.1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("https://www.tempo.co/a/1"));
    assert!(prompt.contains("Isi artikel."));
}

#[tokio::test]
async fn model_errors_are_bad_gateway_and_not_cached() {
    let generator = FakeGenerator::failing(GenerationError::Status {
        provider: "Gemini",
        status: 500,
        body: "quota exceeded".to_string(),
    });
    let app = app(FakeFetcher::html(""), generator.clone());
    let request = json!({ "text": "Sebuah artikel." });

    let (status, body) = post_json(&app, "/api/summarize", request.clone(), "10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));

    generator.set_reply(Ok("   ".to_string()));
    let (status, body) = post_json(&app, "/api/summarize", request.clone(), "10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "No output from the model.");

    generator.set_reply(Ok(SUMMARY.to_string()));
    let (status, _) = post_json(&app, "/api/summarize", request, "10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn fourth_request_in_a_minute_is_limited() {
    let generator = FakeGenerator::replying(SUMMARY);
    let app = app(FakeFetcher::html(""), generator.clone());

    for i in 0..3 {
        let (status, _) = post_json(
            &app,
            "/api/summarize",
            json!({ "text": format!("Artikel nomor {i}.") }),
            "10.0.0.1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let req = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "10.0.0.1")
        .body(Body::from(json!({ "text": "Artikel keempat." }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let header_secs: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let retry_after = body["retryAfter"].as_u64().expect("integer retryAfter");

    assert_eq!(retry_after, header_secs);
    assert!(retry_after >= 1 && retry_after <= 60);
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn markdown_in_model_output_is_stripped() {
    let generator = FakeGenerator::replying(
        "# Ringkasan\n**TL;DR:** Harga naik.\n- Poin satu\nSumber: [Kompas](https://kompas.com/a)",
    );
    let app = app(FakeFetcher::html(""), generator);

    let (status, body) = post_json(&app, "/api/summarize", json!({ "text": "x" }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);

    let summary = body["summary"].as_str().unwrap();
    assert!(!summary.contains(['*', '#', '[']));
    assert!(summary.contains("Kompas (https://kompas.com/a)"));
}

#[tokio::test]
async fn slow_model_hits_request_deadline() {
    let config = Config {
        request_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let generator = FakeGenerator::slow(SUMMARY, Duration::from_millis(500));
    let app = app_with(config, FakeFetcher::html(""), EchoParser::new(), generator);

    let (status, body) = post_json(&app, "/api/summarize", json!({ "text": "x" }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "Request processing timed out");
}
