//! Caller-owned client configuration.
//!
//! Every component receives its options explicitly; there is no process-wide
//! client. Unset knobs fall back to the `SUPABASE_*` environment variables
//! read by [`ClientOptions::from_env`].

use std::env;
use std::time::Duration;

use crate::request::Headers;
use crate::{Error, ErrorContext, Result};

/// Default `X-Client-Info` value.
pub fn default_client_info() -> String {
    format!("supabase-core-rust/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Project API key, sent as `apikey` and as the default bearer token.
    pub api_key: String,
    /// User access token; replaces the API key in `Authorization` when set.
    pub access_token: Option<String>,
    /// Extra headers sent on every request.
    pub headers: Headers,
    /// Schema profile for the tabular API.
    pub schema: Option<String>,
    pub client_info: String,
    /// No timeout unless set; cancellation belongs to the caller.
    pub timeout: Option<Duration>,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            headers: Headers::new(),
            schema: None,
            client_info: default_client_info(),
            timeout: None,
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
        }
    }

    /// Read options from `SUPABASE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let url = env::var("SUPABASE_URL").map_err(|_| {
            Error::configuration_with_context(
                "SUPABASE_URL is not set",
                ErrorContext::new().with_field_path("url").with_source("env"),
            )
        })?;
        let api_key = env::var("SUPABASE_KEY").map_err(|_| {
            Error::configuration_with_context(
                "SUPABASE_KEY is not set",
                ErrorContext::new().with_field_path("api_key").with_source("env"),
            )
        })?;

        let mut options = Self::new(url, api_key);
        options.schema = env::var("SUPABASE_SCHEMA").ok().filter(|s| !s.is_empty());
        options.apply_transport_env(|name| env::var(name).ok());
        Ok(options)
    }

    /// Apply the `SUPABASE_HTTP_*` and `SUPABASE_PROXY_URL` settings found by
    /// `lookup`. Missing or unparsable values leave the current setting alone.
    pub(crate) fn apply_transport_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = lookup("SUPABASE_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(n) = lookup("SUPABASE_HTTP_POOL_MAX_IDLE_PER_HOST").and_then(|s| s.parse::<usize>().ok()) {
            self.pool_max_idle_per_host = n;
        }
        if let Some(secs) = lookup("SUPABASE_HTTP_POOL_IDLE_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            self.pool_idle_timeout = Duration::from_secs(secs);
        }
        if let Some(proxy) = lookup("SUPABASE_PROXY_URL").filter(|s| !s.is_empty()) {
            self.proxy_url = Some(proxy);
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_client_info(mut self, client_info: impl Into<String>) -> Self {
        self.client_info = client_info.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Headers every call starts from before call-specific overrides.
    pub fn default_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("apikey", self.api_key.clone());
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        headers.insert("Authorization", format!("Bearer {}", token));
        headers.merge(&self.headers);
        headers
    }

    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.url)
    }

    pub fn functions_url(&self) -> String {
        format!("{}/functions/v1", self.url)
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }
}
