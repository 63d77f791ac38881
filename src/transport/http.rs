use crate::config::ClientOptions;
use crate::request::{Headers, Method};
use crate::{Error, ErrorContext, Result};
use reqwest::Proxy;
use tracing::debug;
use url::Url;

/// The one connection-reusing HTTP client shared by every sub-API.
///
/// `reqwest::Client` is internally reference counted, so clones share the
/// same pool and are safe to use from concurrent calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(Some(options.pool_idle_timeout))
            .http2_adaptive_window(true);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = &options.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy URL: {}", e),
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_source("transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(super::TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send one request and return the raw response, whatever its status.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: &Headers,
        body: Option<reqwest::Body>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .request(method.to_reqwest(), url.clone())
            .headers(headers.to_header_map()?);

        if let Some(body) = body {
            request = request.body(body);
        }

        debug!(method = method.as_str(), url = url.as_str(), "sending request");

        request
            .send()
            .await
            .map_err(|e| Error::Transport(super::TransportError::Http(e)))
    }
}
