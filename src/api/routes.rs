use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use chrono::Utc;
use std::future::Future;
use tracing::{error, info, warn};

use crate::api::client::client_id;
use crate::api::models::{ExtractRequest, HealthResponse, SummarizeRequest, SupportedResponse};
use crate::error::{AppError, Result};
use crate::extractor::ExtractedArticle;
use crate::pipeline::{SummaryInput, SummaryResult};
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/extract", post(extract_handler))
        .route("/api/summarize", post(summarize_handler))
        .route("/api/supported", get(supported_handler))
        .route("/api/health", get(health_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

fn handle_panic(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("handler panicked");
    AppError::Internal("Internal server error".to_string()).into_response()
}

/// Runs `work` under the overall request deadline and logs the outcome.
async fn guarded<T, F>(state: &AppState, endpoint: &'static str, work: F) -> Result<Json<T>>
where
    F: Future<Output = Result<T>>,
{
    let start = std::time::Instant::now();
    let result = tokio::time::timeout(state.config.request_timeout, work)
        .await
        .unwrap_or(Err(AppError::RequestTimeout));
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => info!(endpoint, ?elapsed, "request succeeded"),
        Err(err) if err.status().is_server_error() => {
            error!(endpoint, ?elapsed, status = %err.status(), error = %err, "request failed")
        }
        Err(err) => warn!(endpoint, ?elapsed, status = %err.status(), error = %err, "request rejected"),
    }

    result.map(Json)
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidInput(format!("Invalid request body: {}", rejection.body_text())))
}

async fn extract_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractedArticle>> {
    let req = body(payload)?;
    let client = client_id(&headers);
    info!(url = ?req.url, client = %client, "extract request");

    guarded(&state, "extract", state.extract.run(&client, req.url.as_deref())).await
}

async fn summarize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryResult>> {
    let req = body(payload)?;
    let client = client_id(&headers);
    info!(
        bytes = req.text.as_deref().map(str::len).unwrap_or(0),
        lang = ?req.lang,
        client = %client,
        "summarize request"
    );

    let input = SummaryInput {
        text: req.text.as_deref(),
        url: req.url.as_deref(),
        lang: req.lang.as_deref(),
    };
    guarded(&state, "summarize", state.summarize.run(&client, input)).await
}

async fn supported_handler(State(state): State<AppState>) -> Json<SupportedResponse> {
    Json(SupportedResponse {
        allowed: state.policy.allowed().to_vec(),
        blocked: state.policy.blocked().to_vec(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        extract_cache_entries: state.extract.cache().len(),
        summarize_cache_entries: state.summarize.cache().len(),
        tracked_clients: state.extract.limiter().tracked_clients()
            + state.summarize.limiter().tracked_clients(),
    })
}
