//! Serverless functions sub-API.
//!
//! Unlike the other services, a failed invocation is reported with the raw
//! body as its message, and a relay failure can arrive with a 2xx status
//! plus an `x-relay-error` header.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::client::RequestExecutor;
use crate::error::RequestError;
use crate::request::{Headers, Method};
use crate::response::ErrorResponse;
use crate::transport::TransportError;
use crate::{Error, ErrorContext, Result};

const RELAY_ERROR_HEADER: &str = "x-relay-error";

/// Per-invocation options.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub headers: Headers,
    /// JSON body; defaults to `{}`.
    pub body: Value,
    /// Bearer token overriding the default `Authorization` header.
    pub access_token: Option<String>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            headers: Headers::new(),
            body: Value::Object(Default::default()),
            access_token: None,
        }
    }
}

impl InvokeOptions {
    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FunctionsClient {
    url: String,
    executor: RequestExecutor,
}

impl FunctionsClient {
    /// `url` is the functions root, e.g. `https://xyz.supabase.co/functions/v1`.
    pub fn new(url: impl Into<String>, executor: RequestExecutor) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            executor,
        }
    }

    /// Invoke and return the unread response for streaming or binary bodies.
    pub async fn invoke_raw(&self, function_name: &str, options: InvokeOptions) -> Result<reqwest::Response> {
        let raw = format!("{}/{}", self.url, function_name);
        let url = Url::parse(&raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid function URL: {}", e),
                ErrorContext::new().with_details(raw).with_source("functions"),
            )
        })?;

        let mut headers = self.executor.merge_headers(Some(&options.headers));
        if let Some(token) = options.access_token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert("Authorization", format!("Bearer {}", token));
        }
        headers.insert("Content-Type", "application/json");

        let payload = reqwest::Body::from(serde_json::to_string(&options.body)?);
        let response = self
            .executor
            .transport()
            .send(Method::Post, url, &headers, Some(payload))
            .await?;

        let status = response.status().as_u16();
        let relay_error = response.headers().contains_key(RELAY_ERROR_HEADER);
        if response.status().is_success() && !relay_error {
            return Ok(response);
        }

        let content = match response.text().await {
            Ok(content) => content,
            Err(e) => {
                debug!(function = function_name, error = %e, "failed to read error body");
                String::new()
            }
        };
        info!(
            http_status = status,
            function = function_name,
            relay_error,
            "function invocation failed"
        );
        Err(Error::Request(RequestError::new(status, ErrorResponse::raw(&content))))
    }

    /// Invoke and return the body as text.
    pub async fn invoke(&self, function_name: &str, options: InvokeOptions) -> Result<String> {
        self.invoke_raw(function_name, options)
            .await?
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))
    }

    /// Invoke and decode the JSON body into `T`.
    pub async fn invoke_typed<T: DeserializeOwned>(&self, function_name: &str, options: InvokeOptions) -> Result<T> {
        let content = self.invoke(function_name, options).await?;
        serde_json::from_str(&content).map_err(|e| Error::decode(e, &content))
    }
}
