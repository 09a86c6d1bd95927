// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for the webhook and issue-tracker adapters.

use std::time::Duration;

use clawmark_core::ClawmarkError;
use serde::de::DeserializeOwned;
use url::Url;

/// Upper bound on any single outbound HTTP delivery.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("clawmark/", env!("CARGO_PKG_VERSION"));

/// Builds the client every HTTP adapter uses.
pub(crate) fn build_client() -> Result<reqwest::Client, ClawmarkError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ClawmarkError::Transport {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Maps a reqwest send failure to the error taxonomy.
pub(crate) fn request_failed(e: reqwest::Error) -> ClawmarkError {
    if e.is_timeout() {
        return ClawmarkError::Timeout {
            duration: HTTP_TIMEOUT,
        };
    }
    ClawmarkError::Transport {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Rejects non-2xx responses, keeping a prefix of the body for the log.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, ClawmarkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClawmarkError::transport(format!(
        "{what} returned {status}: {}",
        truncate_chars(&body, 200)
    )))
}

/// Decodes a JSON body, treating a malformed one as a transport failure.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, ClawmarkError> {
    response.json::<T>().await.map_err(|e| ClawmarkError::Transport {
        message: format!("malformed {what} response: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Deserializes per-adapter settings, mapping shape errors to `Config`.
pub(crate) fn parse_config<T: DeserializeOwned>(
    adapter_type: &str,
    config: &serde_json::Value,
) -> Result<T, ClawmarkError> {
    serde_json::from_value(config.clone())
        .map_err(|e| ClawmarkError::Config(format!("invalid {adapter_type} settings: {e}")))
}

/// Parses an http(s) URL for validation messages.
pub(crate) fn http_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Trims and drops empty strings.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn http_url_rejects_other_schemes() {
        assert!(http_url("https://example.com").is_some());
        assert!(http_url("ftp://example.com").is_none());
        assert!(http_url("example.com").is_none());
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty(&Some("  x ".into())), Some("x"));
        assert_eq!(non_empty(&Some("   ".into())), None);
        assert_eq!(non_empty(&None), None);
    }
}
