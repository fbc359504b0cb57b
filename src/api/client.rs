use axum::http::HeaderMap;

const FALLBACK_CLIENT: &str = "127.0.0.1";

/// Identifies the caller for rate limiting.
///
/// Takes the first `X-Forwarded-For` hop, then `X-Real-IP`, then a loopback
/// default. These headers are trusted as sent: without a reverse proxy that
/// overwrites them, a client can pick its own identifier.
pub fn client_id(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    header("x-real-ip")
        .unwrap_or(FALLBACK_CLIENT)
        .to_string()
}
