use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{header, Client, ClientBuilder, StatusCode};
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{DomainPolicy, PolicyViolation};
use crate::error::{AppError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("source responded with status {0}")]
    Status(u16),

    #[error("not an HTML document: {0}")]
    NotHtml(String),

    #[error("page exceeds {0} bytes")]
    TooLarge(usize),

    #[error("redirect refused: {0}")]
    RedirectRefused(PolicyViolation),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => AppError::FetchTimeout,
            FetchError::Network(msg) => AppError::FetchFailed(msg),
            FetchError::Status(code) => AppError::SourceStatus(code),
            FetchError::NotHtml(content_type) => AppError::NotHtml(content_type),
            FetchError::TooLarge(_) => AppError::PageTooLarge,
            FetchError::RedirectRefused(PolicyViolation::Blocked) => AppError::DomainBlocked,
            FetchError::RedirectRefused(PolicyViolation::NotAllowed) => AppError::DomainNotAllowed,
        }
    }
}

/// Retrieves the raw HTML of an article page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// Accepts only 2xx responses declaring an HTML content type.
pub fn validate_response(
    status: StatusCode,
    content_type: Option<&str>,
) -> std::result::Result<(), FetchError> {
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.contains("text/html") || content_type.contains("application/xhtml+xml") {
        Ok(())
    } else if content_type.is_empty() {
        Err(FetchError::NotHtml("unknown".to_string()))
    } else {
        Err(FetchError::NotHtml(content_type))
    }
}

/// Follows a redirect only while every hop stays within `policy`.
fn redirect_policy(policy: Arc<DomainPolicy>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let host = attempt.url().host_str().unwrap_or_default().to_string();
        match policy.check(&host) {
            Ok(()) => attempt.follow(),
            Err(violation) => {
                warn!(host = %host, %violation, "refusing redirect");
                attempt.error(violation)
            }
        }
    })
}

/// Outbound HTTP GET with a hard deadline and a body size cap. Redirects are
/// checked against the same source lists as the submitted URL.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize, policy: Arc<DomainPolicy>) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .redirect(redirect_policy(policy))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    async fn fetch_inner(&self, url: &str) -> std::result::Result<String, FetchError> {
        let mut response = self
            .client
            .get(url)
            .header(header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(network_error)?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        validate_response(response.status(), content_type.as_deref())?;

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network_error)? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn network_error(err: reqwest::Error) -> FetchError {
    let refused = err
        .source()
        .and_then(|source| source.downcast_ref::<PolicyViolation>())
        .copied();
    if let Some(violation) = refused {
        FetchError::RedirectRefused(violation)
    } else if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let start = std::time::Instant::now();
        // Dropping the future on timeout aborts the request; nothing partial is returned.
        let result = tokio::time::timeout(self.timeout, self.fetch_inner(url))
            .await
            .unwrap_or(Err(FetchError::Timeout));
        debug!(url, elapsed = ?start.elapsed(), ok = result.is_ok(), "fetch finished");
        result
    }
}
