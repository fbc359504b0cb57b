use axum::{
    response::{IntoResponse, Response},
    Json,
    http::{header, HeaderValue, StatusCode},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("This site is not supported for automatic extraction.")]
    DomainBlocked,

    #[error("Only news URLs from supported media outlets can be extracted.")]
    DomainNotAllowed,

    #[error("Too many requests. Please try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Timed out while fetching the article.")]
    FetchTimeout,

    #[error("Failed to fetch article: {0}")]
    FetchFailed(String),

    #[error("Source responded with status {0}")]
    SourceStatus(u16),

    #[error("URL does not point to an HTML page (content-type: {0})")]
    NotHtml(String),

    #[error("Page is too large to process")]
    PageTooLarge,

    #[error("Failed to extract article: {0}")]
    ParseFailed(String),

    #[error("Extracted article is too short ({0} characters).")]
    ContentTooShort(usize),

    #[error("Model error: {0}")]
    ModelBackend(String),

    #[error("No output from the model.")]
    EmptyModelOutput,

    #[error("Request processing timed out")]
    RequestTimeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::DomainBlocked
            | AppError::DomainNotAllowed
            | AppError::NotHtml(_)
            | AppError::PageTooLarge
            | AppError::ContentTooShort(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::FetchTimeout | AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::SourceStatus(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::ModelBackend(_) | AppError::EmptyModelOutput => StatusCode::BAD_GATEWAY,
            AppError::FetchFailed(_)
            | AppError::ParseFailed(_)
            | AppError::ConfigError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            retry_after,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
