//! Minimal HTTP page client with safe logging and a hard timeout.
//!
//! - One attempt per page: no retries, a fixed per-request timeout
//! - Non-2xx statuses are errors; bodies are decoded using the response charset
//! - Redacts sensitive query params and never logs secret values
//! - Optional *raw* request/response logging via `PAGESPLIT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), pagesplit_http::HttpError> {
//! let client = pagesplit_http::HttpClient::new()?;
//! let html = client
//!     .get_text("https://example.com/", pagesplit_http::RequestOpts::default())
//!     .await?;
//! # let _ = html;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and
//! (optionally) raw request/response lines (target `http.raw`).

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use std::env;
use std::time::Duration;
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "PAGESPLIT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

const SECRET_QUERY_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), "-XGET".to_string()];
    for (name, val) in headers.iter() {
        let mut v = val.to_str().unwrap_or("").to_string();
        if name.as_str().eq_ignore_ascii_case("authorization") {
            v = "<redacted>".into();
        }
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    let mut shown = url.clone();
    let (_, redacted) = redact_query(url);
    if !redacted.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(redacted.iter());
    }
    parts.push(format!("'{}'", shown.as_str()));
    parts.join(" ")
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("server returned {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("decode error: {0}")]
    Decode(String),
}

// ==============================
// Options
// ==============================

/// Client-wide settings fixed at construction time.
///
/// ```
/// use pagesplit_http::ClientOptions;
/// use std::time::Duration;
///
/// let opts = ClientOptions::default();
/// assert_eq!(opts.timeout, Duration::from_secs(10));
/// assert!(opts.user_agent.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            user_agent: None,
        }
    }
}

/// Per-request tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
}

impl RequestOpts {
    /// Options sending `Accept: <media>` with the request.
    ///
    /// ```
    /// use pagesplit_http::RequestOpts;
    ///
    /// let opts = RequestOpts::accepting("text/html");
    /// let headers = opts.headers.unwrap();
    /// assert_eq!(headers["accept"], "text/html");
    /// ```
    pub fn accepting(media: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(media));
        Self {
            headers: Some(headers),
            ..Self::default()
        }
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client with [`ClientOptions::default`].
    ///
    /// ```no_run
    /// use pagesplit_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(10));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(opts: ClientOptions) -> Result<Self, HttpError> {
        let mut builder = Client::builder().connect_timeout(opts.connect_timeout);
        if let Some(agent) = &opts.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| HttpError::Build(format!("invalid user agent: {e}")))?;
            let mut headers = HeaderMap::new();
            headers.insert(USER_AGENT, value);
            builder = builder.default_headers(headers);
        }
        let inner = builder
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            default_timeout: opts.timeout,
        })
    }

    /// Override the default timeout.
    ///
    /// ```no_run
    /// use pagesplit_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET an absolute URL and return the decoded body text.
    ///
    /// Exactly one attempt is made. Network failures, timeouts and non-2xx
    /// statuses are all reported as errors.
    pub async fn get_text(&self, url: &str, opts: RequestOpts) -> Result<String, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(format!("{url}: {e}")))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let mut rb = self.inner.get(url.clone()).timeout(timeout);
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let (host_path, redacted_q) = redact_query(&url);

        tracing::debug!(
            req_id=%req_id,
            method="GET",
            host_path=%host_path,
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&url, opts.headers.as_ref().unwrap_or(&HeaderMap::new()));
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let mapped = classify_send_error(&err, timeout);
            tracing::warn!(
                req_id=%req_id,
                host_path=%host_path,
                message=%err,
                "http.network_error.send"
            );
            mapped
        })?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        if !status.is_success() {
            tracing::warn!(
                req_id=%req_id,
                %status,
                host_path=%host_path,
                "http.error"
            );
            return Err(HttpError::Status {
                status,
                url: host_path,
            });
        }

        let body = resp.text().await.map_err(|err| {
            tracing::warn!(
                req_id=%req_id,
                host_path=%host_path,
                message=%err,
                "http.network_error.body"
            );
            if err.is_timeout() {
                HttpError::Timeout(timeout)
            } else if err.is_decode() {
                HttpError::Decode(err.to_string())
            } else {
                HttpError::Network(err.to_string())
            }
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=body.len(),
            content_type=%content_type,
            "http.response.headers"
        );

        if raw_enabled() {
            let mut text = body.clone();
            let truncated = text.len() > RAW_MAX_BODY;
            if truncated {
                truncate_at_char_boundary(&mut text, RAW_MAX_BODY);
            }
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                body=%text,
                truncated
            );
        }

        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snip_body(&body),
            "http.response.body_snippet"
        );

        Ok(body)
    }
}

// ==============================
// Helpers
// ==============================

fn classify_send_error(err: &reqwest::Error, timeout: Duration) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(timeout)
    } else if err.is_builder() {
        HttpError::Build(err.to_string())
    } else {
        HttpError::Network(err.to_string())
    }
}

fn snip_body(body: &str) -> String {
    let mut snip = body.to_string();
    if snip.len() > 500 {
        truncate_at_char_boundary(&mut snip, 500);
        snip.push_str("...");
    }
    snip
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Return "host + path" and the redacted query list for logging.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let is_secret = SECRET_QUERY_KEYS.contains(&k.to_ascii_lowercase().as_str());
            (
                k,
                if is_secret {
                    "<redacted>".into()
                } else {
                    v.to_string()
                },
            )
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_secret_query_params() {
        let url = Url::parse("https://example.com/page?id=4&api_key=hunter2&Token=x").unwrap();
        let (host_path, pairs) = redact_query(&url);
        assert_eq!(host_path, "example.com/page");
        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), "4".to_string()),
                ("api_key".to_string(), "<redacted>".to_string()),
                ("Token".to_string(), "<redacted>".to_string()),
            ]
        );
    }

    #[test]
    fn curl_never_shows_secrets() {
        let url = Url::parse("https://example.com/?token=abc&q=rust").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        let curl = make_curl(&url, &headers);
        assert!(!curl.contains("abc"));
        assert!(curl.contains("q=rust"));
    }

    #[test]
    fn snippet_respects_utf8_boundaries() {
        let body = "画".repeat(400);
        let snip = snip_body(&body);
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= 503);
    }
}
