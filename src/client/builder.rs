use crate::client::core::Client;
use crate::config::ClientOptions;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
///
/// Anything not set explicitly falls back to the `SUPABASE_*` environment,
/// the same variables [`ClientOptions::from_env`] reads. An explicit
/// `timeout` wins over `SUPABASE_HTTP_TIMEOUT_SECS`.
pub struct ClientBuilder {
    url: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    schema: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            api_key: None,
            access_token: None,
            schema: None,
            headers: Vec::new(),
            timeout: None,
            http_client: None,
        }
    }

    /// Project base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Signed-in user's token; replaces the API key as bearer.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a header sent on every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reuse an existing `reqwest::Client` (and its pool) instead of building one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let url = self
            .url
            .or_else(|| std::env::var("SUPABASE_URL").ok())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "project URL must be specified",
                    ErrorContext::new().with_field_path("url").with_source("builder"),
                )
            })?;
        let api_key = self
            .api_key
            .or_else(|| std::env::var("SUPABASE_KEY").ok())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "API key required",
                    ErrorContext::new().with_field_path("api_key").with_source("builder"),
                )
            })?;

        let mut options = ClientOptions::new(url, api_key);
        options.access_token = self.access_token;
        options.schema = self
            .schema
            .or_else(|| std::env::var("SUPABASE_SCHEMA").ok().filter(|s| !s.is_empty()));
        options.apply_transport_env(|name| std::env::var(name).ok());
        if let Some(timeout) = self.timeout {
            options.timeout = Some(timeout);
        }
        options.headers.extend(self.headers);

        let transport = match self.http_client {
            Some(client) => HttpTransport::from_client(client),
            None => HttpTransport::new(&options)?,
        };
        Ok(Client::with_transport(options, Arc::new(transport)))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
