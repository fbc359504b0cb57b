use axum::http::StatusCode;
use news_summarizer::config::Config;
use news_summarizer::domain::PolicyViolation;
use news_summarizer::extractor::ParseError;
use news_summarizer::fetcher::FetchError;
use serde_json::json;

use crate::common::*;

const BBC_URL: &str = "https://www.bbc.com/news/world-1";

#[tokio::test]
async fn missing_url_is_rejected() {
    let fetcher = FakeFetcher::html(article_text(200));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    let (status, body) = post_json(&app, "/api/extract", json!({}), "10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    let (status, _) = post_json(&app, "/api/extract", json!({ "url": "   " }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn malformed_url_and_body_are_rejected() {
    let fetcher = FakeFetcher::html(article_text(200));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    for url in ["bbc.com/news", "ftp://bbc.com/file", "http//broken"] {
        let (status, body) = post_json(&app, "/api/extract", json!({ "url": url }), "10.0.0.1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "url {url}");
        assert_eq!(body["error"], "Invalid URL format");
    }

    let (status, body) = post_raw(&app, "/api/extract", "{not json".to_string(), "10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn blocked_and_unlisted_domains_never_fetch() {
    let fetcher = FakeFetcher::html(article_text(200));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    let (status, body) = post_json(
        &app,
        "/api/extract",
        json!({ "url": "https://www.cnnindonesia.com/nasional/1" }),
        "10.0.0.1",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not supported"));

    let (status, body) = post_json(
        &app,
        "/api/extract",
        json!({ "url": "https://fakekompas.com/read/1" }),
        "10.0.0.1",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("supported media"));

    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn subdomain_of_allowed_source_is_fetched() {
    let fetcher = FakeFetcher::html(article_text(150));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    let (status, body) = post_json(
        &app,
        "/api/extract",
        json!({ "url": "https://news.kompas.com/read/2024/01/01/banjir" }),
        "10.0.0.1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Test article");
    assert_eq!(body["byline"], "Reporter");
    assert_eq!(body["dir"], "ltr");
    assert_eq!(fetcher.urls(), vec!["https://news.kompas.com/read/2024/01/01/banjir"]);
}

#[tokio::test]
async fn repeated_url_is_served_from_cache() {
    let fetcher = FakeFetcher::html(article_text(300));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    let (first_status, first) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
    let (second_status, second) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn cache_hits_do_not_consume_quota() {
    let fetcher = FakeFetcher::html(article_text(300));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    for _ in 0..10 {
        let (status, _) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn content_length_boundary() {
    let fetcher = FakeFetcher::html(format!("  {}  \n", article_text(99)));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    let (status, body) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("too short"));

    fetcher.set_response(Ok(format!("  {}  \n", article_text(100))));
    let (status, body) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"].as_str().unwrap().chars().count(), 100);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn fetch_failures_map_to_distinct_statuses() {
    let cases = [
        (FetchError::Timeout, StatusCode::REQUEST_TIMEOUT),
        (FetchError::Network("connection refused".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (FetchError::Status(404), StatusCode::NOT_FOUND),
        (FetchError::Status(403), StatusCode::FORBIDDEN),
        (FetchError::NotHtml("application/pdf".to_string()), StatusCode::BAD_REQUEST),
        (FetchError::TooLarge(1024), StatusCode::BAD_REQUEST),
        (FetchError::RedirectRefused(PolicyViolation::NotAllowed), StatusCode::BAD_REQUEST),
    ];

    for (err, expected) in cases {
        let fetcher = FakeFetcher::failing(err.clone());
        let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));
        let (status, body) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
        assert_eq!(status, expected, "{err:?}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn failures_are_not_cached() {
    let fetcher = FakeFetcher::failing(FetchError::Timeout);
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    let (status, _) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    fetcher.set_response(Ok(article_text(200)));
    let (status, _) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn parser_failure_is_server_error() {
    for err in [ParseError::NoArticle, ParseError::Failed("bad markup".to_string())] {
        let fetcher = FakeFetcher::html(article_text(200));
        let app = app_with(
            Config::default(),
            fetcher.clone(),
            EchoParser::failing(err),
            FakeGenerator::replying(SUMMARY),
        );
        let (status, body) = post_json(&app, "/api/extract", json!({ "url": BBC_URL }), "10.0.0.1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to extract article"));
    }
}

#[tokio::test]
async fn extraction_is_rate_limited_per_client() {
    let fetcher = FakeFetcher::html(article_text(200));
    let app = app(fetcher.clone(), FakeGenerator::replying(SUMMARY));

    for i in 0..5 {
        let url = format!("https://www.bbc.com/news/{i}");
        let (status, _) = post_json(&app, "/api/extract", json!({ "url": url }), "10.0.0.1").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = post_json(
        &app,
        "/api/extract",
        json!({ "url": "https://www.bbc.com/news/6" }),
        "10.0.0.1",
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after = body["retryAfter"].as_u64().unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);
    assert_eq!(fetcher.calls(), 5);

    let (status, _) = post_json(
        &app,
        "/api/extract",
        json!({ "url": "https://www.bbc.com/news/6" }),
        "10.0.0.2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
