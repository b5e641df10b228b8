//! Transport configuration for stream consumption.

use std::collections::HashMap;
use std::time::Duration;

/// A secret string type for sensitive data like bearer tokens.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Transport configuration merged under each call.
///
/// Everything here is a caller-supplied extra. The protocol fields the
/// consumer owns (request method and `Content-Type`) are not configurable:
/// the method is always POST and a `content-type` entry in `extra_headers`
/// is ignored.
///
/// # Example
/// ```rust
/// use dripline::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::default()
///     .with_timeout(Duration::from_secs(30))
///     .with_bearer_token("sk-...")
///     .with_header("x-request-id".to_string(), "abc123".to_string());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Request timeout covering the whole transfer
    pub timeout: Option<Duration>,

    /// Bearer credential sent as an `Authorization` header
    pub bearer_token: Option<SecretString>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in the request
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    /// Create empty transport options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the bearer credential.
    pub fn with_bearer_token(mut self, token: impl Into<SecretString>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
