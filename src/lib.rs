pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use cache::TtlCache;
use config::{Config, LlmProvider};
use domain::DomainPolicy;
use error::Result;
use extractor::{ArticleParser, ReadabilityParser};
use fetcher::{HttpFetcher, PageFetcher};
use llm::{GeminiClient, OpenRouterClient, TextGenerator};
use pipeline::{ExtractionPipeline, SummarizationPipeline};
use rate_limit::FixedWindowLimiter;

fn source_policy(config: &Config) -> Arc<DomainPolicy> {
    Arc::new(DomainPolicy::new(&config.allowed_domains, &config.blocked_domains))
}

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<DomainPolicy>,
    pub extract: Arc<ExtractionPipeline>,
    pub summarize: Arc<SummarizationPipeline>,
}

impl AppState {
    /// Wires the production fetcher, parser and model backend.
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(
            config.fetch_timeout,
            config.max_page_bytes,
            source_policy(&config),
        )?);
        let parser = Arc::new(ReadabilityParser::default());
        let generator: Arc<dyn TextGenerator> = match config.llm_provider {
            LlmProvider::Gemini => {
                let mut client = GeminiClient::new(
                    config.google_api_key.clone(),
                    config.gemini_model.clone(),
                    config.model_temperature,
                    config.model_timeout,
                );
                if let Some(base) = &config.gemini_base_url {
                    client = client.with_base_url(base.clone());
                }
                Arc::new(client)
            }
            LlmProvider::OpenRouter => Arc::new(
                OpenRouterClient::new(
                    config.openrouter_api_key.clone(),
                    config.openrouter_model.clone(),
                    config.model_temperature,
                    config.model_timeout,
                )
                .with_site(None, Some(env!("CARGO_PKG_NAME").to_string())),
            ),
        };
        Ok(Self::with_collaborators(config, fetcher, parser, generator))
    }

    /// Builds fresh caches and limiters around the given capabilities.
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn ArticleParser>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let policy = source_policy(&config);

        let extract = ExtractionPipeline::new(
            Arc::clone(&policy),
            TtlCache::new(config.extract_cache_ttl),
            FixedWindowLimiter::with_capacity(
                config.extract_rate_limit,
                config.rate_limit_window,
                config.rate_limit_max_clients,
            ),
            fetcher,
            parser,
        );
        let summarize = SummarizationPipeline::new(
            TtlCache::new(config.summarize_cache_ttl),
            FixedWindowLimiter::with_capacity(
                config.summarize_rate_limit,
                config.rate_limit_window,
                config.rate_limit_max_clients,
            ),
            generator,
        );

        Self {
            config: Arc::new(config),
            policy,
            extract: Arc::new(extract),
            summarize: Arc::new(summarize),
        }
    }

    /// Evicts expired cache entries and reset rate-limit windows.
    pub fn sweep(&self) {
        let cached = self.extract.cache().clean() + self.summarize.cache().clean();
        let windows = self.extract.limiter().sweep() + self.summarize.limiter().sweep();
        debug!(cached, windows, "sweep finished");
    }

    /// Runs [`AppState::sweep`] every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                state.sweep();
            }
        })
    }
}
