//! Client-wide and per-request configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::caller::{Caller, RetryPolicy};
use crate::transport::{Transport, UreqTransport, DEFAULT_TIMEOUT};

/// Production endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.getzep.com/api/v2";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ZEP_API_KEY";

/// Environment variable overriding the base URL.
pub const API_URL_ENV: &str = "ZEP_API_URL";

fn api_key_header(key: &SecretString) -> (String, String) {
    (
        "Authorization".to_string(),
        format!("Api-Key {}", key.expose_secret()),
    )
}

/// Configuration shared by every resource client.
#[derive(Clone)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub headers: Vec<(String, String)>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("headers", &self.headers.len())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            headers: Vec::new(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            transport: None,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded from `ZEP_API_KEY` and `ZEP_API_URL`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                options.api_key = Some(SecretString::from(key));
            }
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                options.base_url = Some(url);
            }
        }
        options
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    /// Ignored when a custom transport is supplied.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Base URL without a trailing slash.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Default headers for every request: auth first, then custom headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        if let Some(key) = &self.api_key {
            headers.push(api_key_header(key));
        }
        headers.extend(self.headers.iter().cloned());
        headers
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(UreqTransport::new(self.timeout)),
        }
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.transport(), self.retry.clone())
    }
}

/// Per-call overrides. Everything is optional.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub headers: Vec<(String, String)>,
    pub max_attempts: Option<u32>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("headers", &self.headers.len())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        if let Some(key) = &self.api_key {
            headers.push(api_key_header(key));
        }
        headers.extend(self.headers.iter().cloned());
        headers
    }
}
