//! Anon-key authentication for backend requests.
//!
//! The project key travels twice: as the `apikey` header the gateway checks and as
//! a bearer token for the function runtime.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "apikey";

/// Build the default headers for every backend request.
pub fn auth_headers(anon_key: &str) -> Result<HeaderMap, AppError> {
    let mut key = HeaderValue::from_str(anon_key)
        .map_err(|_| AppError::Config("Anon key contains invalid header characters".to_string()))?;
    key.set_sensitive(true);

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key))
        .map_err(|_| AppError::Config("Anon key contains invalid header characters".to_string()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

/// Shorten a key for log output.
pub fn redact_key(key: &str) -> String {
    if key.len() <= 8 {
        return "***".to_string();
    }
    match key.get(..6) {
        Some(prefix) => format!("{}…({} chars)", prefix, key.len()),
        None => "***".to_string(),
    }
}

/// Redact the `apikey` query parameter of a socket URL for log output.
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return "<invalid url>".to_string();
    };
    if !parsed.query_pairs().any(|(name, _)| name == API_KEY_HEADER) {
        return parsed.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == API_KEY_HEADER {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
