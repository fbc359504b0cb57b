use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Deserialize, Serialize, Default)]
pub struct ExtractRequest {
    pub url: Option<String>,
}

#[derive(Deserialize, Serialize, Default)]
pub struct SummarizeRequest {
    pub text: Option<String>,
    pub url: Option<String>,
    pub lang: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SupportedResponse {
    pub allowed: Vec<String>,
    pub blocked: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub extract_cache_entries: usize,
    pub summarize_cache_entries: usize,
    pub tracked_clients: usize,
}
