use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::error::{AppError, Result};
use crate::llm::TextGenerator;
use crate::prompt::{build_prompt, Language};
use crate::rate_limit::FixedWindowLimiter;

static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)\s]*)\)").expect("Failed to compile link pattern")
});

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*[-*•+][ \t]+").expect("Failed to compile list marker pattern")
});

static HEADING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#{1,6}(?:[ \t]+|$)").expect("Failed to compile heading pattern")
});

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[^\n]*$").expect("Failed to compile code fence pattern")
});

static STRONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*([^*\n]+?)\*\*").expect("Failed to compile strong pattern")
});

// Opening star followed by, and closing star preceded by, a non-space.
static EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").expect("Failed to compile emphasis pattern")
});

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([^`\n]+)`").expect("Failed to compile inline code pattern")
});

static STRAY_STARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*{2,}").expect("Failed to compile star run pattern")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
}

/// What a caller may send for summarization.
#[derive(Debug, Clone, Default)]
pub struct SummaryInput<'a> {
    pub text: Option<&'a str>,
    pub url: Option<&'a str>,
    pub lang: Option<&'a str>,
}

pub fn cache_key(text: &str, lang: Language) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("summarize:{}:{}", hex::encode(digest), lang.code())
}

pub struct SummarizationPipeline {
    cache: TtlCache<SummaryResult>,
    limiter: FixedWindowLimiter,
    generator: Arc<dyn TextGenerator>,
}

impl SummarizationPipeline {
    pub fn new(
        cache: TtlCache<SummaryResult>,
        limiter: FixedWindowLimiter,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            cache,
            limiter,
            generator,
        }
    }

    pub fn cache(&self) -> &TtlCache<SummaryResult> {
        &self.cache
    }

    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    pub async fn run(&self, client_id: &str, input: SummaryInput<'_>) -> Result<SummaryResult> {
        let text = input
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::InvalidInput("text is required".to_string()))?;
        let lang = Language::from_code(input.lang);

        let key = cache_key(text, lang);
        if let Some(result) = self.cache.get(&key) {
            debug!(lang = lang.code(), "summary cache hit");
            return Ok(result);
        }

        if self.limiter.is_rate_limited(client_id) {
            let retry_after_secs = self.limiter.retry_after_secs(client_id);
            warn!(client = client_id, retry_after_secs, "summarize rate limited");
            return Err(AppError::RateLimited { retry_after_secs });
        }

        let prompt = build_prompt(text, input.url, lang);
        debug!(prompt_chars = prompt.len(), "built prompt");

        let llm_start = std::time::Instant::now();
        let raw = self.generator.generate(&prompt).await?;
        info!(elapsed = ?llm_start.elapsed(), "model call finished");

        let summary = ensure_plain_text(&raw);
        if summary.is_empty() {
            return Err(AppError::EmptyModelOutput);
        }

        let result = SummaryResult { summary };
        self.cache.set(key, result.clone());
        Ok(result)
    }
}

/// Strips markdown the model may emit despite being asked for plain text.
/// Links become `text (url)`. Markers are removed only where they act as
/// markdown, so text like `C#` or `5 * 3` survives.
fn ensure_plain_text(text: &str) -> String {
    let text = MARKDOWN_LINK.replace_all(text, |caps: &regex::Captures| {
        let label = caps[1].trim();
        let target = caps[2].trim();
        match (label.is_empty(), target.is_empty()) {
            (_, true) => label.to_string(),
            (true, false) => target.to_string(),
            (false, false) => format!("{} ({})", label, target),
        }
    });
    let text = CODE_FENCE.replace_all(&text, "");
    let text = HEADING_MARKER.replace_all(&text, "");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = STRONG.replace_all(&text, "$1");
    let text = EMPHASIS.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = STRAY_STARS.replace_all(&text, "");

    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
