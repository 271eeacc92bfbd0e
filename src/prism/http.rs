//! HTTP envelopes and transport construction for Prism API calls

use crate::config::Config;
use crate::error::Result;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// A request ready to be sent
///
/// The envelope does not know its own encoding; the codec that built it set
/// `content_type` and `body`. The body is held as [`Bytes`] so the same request
/// can be sent again or inspected without re-encoding.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Label used in logs
    pub operation: String,
    pub method: Method,
    pub url: Url,
    pub content_type: &'static str,
    pub body: Option<Bytes>,
}

impl RequestEnvelope {
    pub fn new(method: Method, url: Url, content_type: &'static str, body: Option<Bytes>) -> Self {
        Self {
            operation: String::new(),
            method,
            url,
            content_type,
            body,
        }
    }

    /// Body as text, lossy for non-UTF-8 payloads
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_ref().map(|b| String::from_utf8_lossy(b))
    }
}

/// A response read fully into memory
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseEnvelope {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 200-299
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Canonical reason phrase for the status, e.g. "Bad Request"
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status")
    }
}

/// Build the pooled reqwest transport for a configuration
///
/// The returned client is cheap to clone and safe to share between
/// concurrent requests.
pub fn build_transport(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.insecure)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    Ok(client)
}
