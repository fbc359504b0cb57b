use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::domain::{DEFAULT_ALLOWED_DOMAINS, DEFAULT_BLOCKED_DOMAINS};
use crate::error::{AppError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenRouter,
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(LlmProvider::Gemini),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            other => Err(AppError::ConfigError(format!("Unknown LLM_PROVIDER: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub llm_provider: LlmProvider,
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub model_temperature: f32,
    pub fetch_timeout: Duration,
    pub model_timeout: Duration,
    pub request_timeout: Duration,
    pub max_page_bytes: usize,
    pub extract_cache_ttl: Duration,
    pub summarize_cache_ttl: Duration,
    pub extract_rate_limit: u32,
    pub summarize_rate_limit: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_max_clients: usize,
    pub sweep_interval: Option<Duration>,
    pub allowed_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            llm_provider: LlmProvider::Gemini,
            google_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: None,
            openrouter_api_key: String::new(),
            openrouter_model: "deepseek/deepseek-chat-v3-0324".to_string(),
            model_temperature: 0.2,
            fetch_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(90),
            max_page_bytes: 5 * 1024 * 1024,
            extract_cache_ttl: Duration::from_secs(10 * 60),
            summarize_cache_ttl: Duration::from_secs(15 * 60),
            extract_rate_limit: 5,
            summarize_rate_limit: 3,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_clients: 10_000,
            sweep_interval: Some(Duration::from_secs(60)),
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            blocked_domains: DEFAULT_BLOCKED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; unset variables take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let port: u16 = parse_or(var("PORT"), "PORT", 3000)?;

        let llm_provider = match var("LLM_PROVIDER") {
            Some(p) => p.parse()?,
            None => LlmProvider::Gemini,
        };
        let google_api_key = var("GOOGLE_API_KEY").unwrap_or_default();
        let openrouter_api_key = var("OPENROUTER_API_KEY").unwrap_or_default();
        match llm_provider {
            LlmProvider::Gemini if google_api_key.is_empty() => {
                return Err(AppError::ConfigError("GOOGLE_API_KEY is not set".to_string()));
            }
            LlmProvider::OpenRouter if openrouter_api_key.is_empty() => {
                return Err(AppError::ConfigError("OPENROUTER_API_KEY is not set".to_string()));
            }
            _ => {}
        }

        let extract_rate_limit = parse_or(var("EXTRACT_RATE_LIMIT"), "EXTRACT_RATE_LIMIT", defaults.extract_rate_limit)?;
        let summarize_rate_limit = parse_or(var("SUMMARIZE_RATE_LIMIT"), "SUMMARIZE_RATE_LIMIT", defaults.summarize_rate_limit)?;
        if extract_rate_limit == 0 || summarize_rate_limit == 0 {
            return Err(AppError::ConfigError("Rate limits must be at least 1".to_string()));
        }

        let fetch_timeout = secs(var("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS", defaults.fetch_timeout)?;
        let model_timeout = secs(var("MODEL_TIMEOUT_SECS"), "MODEL_TIMEOUT_SECS", defaults.model_timeout)?;
        let request_timeout = secs(var("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", defaults.request_timeout)?;
        let rate_limit_window = secs(var("RATE_LIMIT_WINDOW_SECS"), "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window)?;
        for (name, value) in [
            ("FETCH_TIMEOUT_SECS", fetch_timeout),
            ("MODEL_TIMEOUT_SECS", model_timeout),
            ("REQUEST_TIMEOUT_SECS", request_timeout),
            ("RATE_LIMIT_WINDOW_SECS", rate_limit_window),
        ] {
            if value.is_zero() {
                return Err(AppError::ConfigError(format!("{} must be at least 1", name)));
            }
        }

        let sweep_secs: u64 = parse_or(var("SWEEP_INTERVAL_SECS"), "SWEEP_INTERVAL_SECS", 60)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            llm_provider,
            google_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: var("GEMINI_BASE_URL"),
            openrouter_api_key,
            openrouter_model: var("OPENROUTER_MODEL").unwrap_or(defaults.openrouter_model),
            model_temperature: parse_or(var("MODEL_TEMPERATURE"), "MODEL_TEMPERATURE", defaults.model_temperature)?,
            fetch_timeout,
            model_timeout,
            request_timeout,
            max_page_bytes: parse_or(var("MAX_PAGE_BYTES"), "MAX_PAGE_BYTES", defaults.max_page_bytes)?,
            extract_cache_ttl: secs(var("EXTRACT_CACHE_TTL_SECS"), "EXTRACT_CACHE_TTL_SECS", defaults.extract_cache_ttl)?,
            summarize_cache_ttl: secs(var("SUMMARIZE_CACHE_TTL_SECS"), "SUMMARIZE_CACHE_TTL_SECS", defaults.summarize_cache_ttl)?,
            extract_rate_limit,
            summarize_rate_limit,
            rate_limit_window,
            rate_limit_max_clients: parse_or(var("RATE_LIMIT_MAX_CLIENTS"), "RATE_LIMIT_MAX_CLIENTS", defaults.rate_limit_max_clients)?,
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            allowed_domains: var("ALLOWED_DOMAINS").map(split_list).unwrap_or(defaults.allowed_domains),
            blocked_domains: var("BLOCKED_DOMAINS").map(split_list).unwrap_or(defaults.blocked_domains),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

fn secs(value: Option<String>, name: &str, default: Duration) -> Result<Duration> {
    parse_or(value, name, default.as_secs()).map(Duration::from_secs)
}

fn split_list(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}
