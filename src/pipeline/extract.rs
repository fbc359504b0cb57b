use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::TtlCache;
use crate::domain::{extract_domain, is_valid_url, DomainPolicy, PolicyViolation};
use crate::error::{AppError, Result};
use crate::extractor::{ArticleParser, ExtractedArticle, ParseError};
use crate::fetcher::PageFetcher;
use crate::rate_limit::FixedWindowLimiter;

/// Articles shorter than this, in characters after trimming, are rejected.
pub const MIN_CONTENT_CHARS: usize = 100;

pub fn cache_key(url: &str) -> String {
    let normalized = Url::parse(url.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.trim().to_string());
    format!("extract:{}", normalized)
}

pub struct ExtractionPipeline {
    policy: Arc<DomainPolicy>,
    cache: TtlCache<ExtractedArticle>,
    limiter: FixedWindowLimiter,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn ArticleParser>,
}

impl ExtractionPipeline {
    pub fn new(
        policy: Arc<DomainPolicy>,
        cache: TtlCache<ExtractedArticle>,
        limiter: FixedWindowLimiter,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn ArticleParser>,
    ) -> Self {
        Self {
            policy,
            cache,
            limiter,
            fetcher,
            parser,
        }
    }

    pub fn cache(&self) -> &TtlCache<ExtractedArticle> {
        &self.cache
    }

    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    pub async fn run(&self, client_id: &str, url: Option<&str>) -> Result<ExtractedArticle> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::InvalidInput("URL is required".to_string()))?;

        if !is_valid_url(url) {
            return Err(AppError::InvalidInput("Invalid URL format".to_string()));
        }

        let key = cache_key(url);
        if let Some(article) = self.cache.get(&key) {
            debug!(url, "extract cache hit");
            return Ok(article);
        }

        let domain = extract_domain(url);
        match self.policy.check(&domain) {
            Ok(()) => {}
            Err(PolicyViolation::Blocked) => {
                warn!(domain = %domain, "blocked domain");
                return Err(AppError::DomainBlocked);
            }
            Err(PolicyViolation::NotAllowed) => {
                warn!(domain = %domain, "domain not on allow list");
                return Err(AppError::DomainNotAllowed);
            }
        }

        if self.limiter.is_rate_limited(client_id) {
            let retry_after_secs = self.limiter.retry_after_secs(client_id);
            warn!(client = client_id, retry_after_secs, "extract rate limited");
            return Err(AppError::RateLimited { retry_after_secs });
        }

        info!(url, "fetching article");
        let html = self.fetcher.fetch(url).await?;

        let parser = Arc::clone(&self.parser);
        let base_url = url.to_string();
        let parsed = tokio::task::spawn_blocking(move || parser.parse(&html, &base_url))
            .await?
            .map_err(|e| match e {
                ParseError::NoArticle => AppError::ParseFailed("no article content found".to_string()),
                ParseError::Failed(msg) => AppError::ParseFailed(msg),
            })?;

        let content = parsed.text_content.trim();
        let length = content.chars().count();
        if length < MIN_CONTENT_CHARS {
            return Err(AppError::ContentTooShort(length));
        }

        let article = ExtractedArticle {
            title: parsed.title,
            content: content.to_string(),
            excerpt: parsed.excerpt,
            byline: parsed.byline,
            dir: parsed.dir,
        };

        self.cache.set(key, article.clone());
        info!(url, chars = length, "article extracted");
        Ok(article)
    }
}
