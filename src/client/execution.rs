//! Request execution: one request, one response, no retries.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::codec::{Codec, JsonCodec};
use crate::config::{default_client_info, ClientOptions};
use crate::error::RequestError;
use crate::request::{build_url, Headers, Method, CLIENT_INFO_HEADER};
use crate::response::{ErrorResponse, ResponseEnvelope, TypedResponse};
use crate::transport::{HttpTransport, TransportError};
use crate::{Error, Result};

/// Body type to name when a call carries no body: `None::<&NoBody>`.
pub type NoBody = serde_json::Value;

/// Sends requests over the shared transport and turns responses into
/// envelopes or typed errors.
///
/// Cloning is cheap; clones share the transport.
#[derive(Debug, Clone)]
pub struct RequestExecutor<C = JsonCodec> {
    transport: Arc<HttpTransport>,
    default_headers: Headers,
    codec: C,
}

impl RequestExecutor<JsonCodec> {
    pub fn new(transport: Arc<HttpTransport>, default_headers: Headers) -> Self {
        Self::with_codec(transport, default_headers, JsonCodec::new())
    }

    /// Executor carrying the option defaults (`apikey`, `Authorization`, extra headers).
    pub fn from_options(transport: Arc<HttpTransport>, options: &ClientOptions) -> Self {
        let mut headers = options.default_headers();
        headers.insert_if_absent(CLIENT_INFO_HEADER, options.client_info.clone());
        Self::new(transport, headers)
    }
}

impl<C: Codec> RequestExecutor<C> {
    pub fn with_codec(transport: Arc<HttpTransport>, mut default_headers: Headers, codec: C) -> Self {
        default_headers.insert_if_absent(CLIENT_INFO_HEADER, default_client_info());
        Self {
            transport,
            default_headers,
            codec,
        }
    }

    /// Same transport and headers, different serializer configuration.
    pub fn codec<D: Codec>(&self, codec: D) -> RequestExecutor<D> {
        RequestExecutor {
            transport: self.transport.clone(),
            default_headers: self.default_headers.clone(),
            codec,
        }
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    pub fn transport(&self) -> &Arc<HttpTransport> {
        &self.transport
    }

    /// Default headers with `headers` applied on top.
    pub fn merge_headers(&self, headers: Option<&Headers>) -> Headers {
        match headers {
            Some(headers) => Headers::merged(&self.default_headers, headers),
            None => self.default_headers.clone(),
        }
    }

    /// Execute a request and return the raw envelope.
    ///
    /// A GET whose body is a string map has the map merged into the query;
    /// any other GET body is dropped. Other methods send the body as JSON.
    /// Every non-2xx status raises [`Error::Request`].
    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: Option<&Headers>,
    ) -> Result<ResponseEnvelope> {
        let value = match body {
            Some(body) => Some(self.codec.to_value(body)?).filter(|v| !v.is_null()),
            None => None,
        };
        let url = build_url(url, method, value.as_ref())?;
        let mut headers = self.merge_headers(headers);

        let payload = match value {
            Some(value) if method != Method::Get => {
                headers.insert("Content-Type", "application/json");
                Some(reqwest::Body::from(serde_json::to_string(&value)?))
            }
            _ => None,
        };

        let response = self.send(method, url, &headers, payload).await?;
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let final_url = response.url().clone();
        let content = response
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        Ok(ResponseEnvelope {
            content,
            status,
            headers: response_headers,
            method,
            url: final_url,
        })
    }

    /// Execute a request and decode the body into `T`.
    ///
    /// A body that does not match `T` raises [`Error::Decode`], never
    /// [`Error::Request`].
    pub async fn execute_typed<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: Option<&Headers>,
    ) -> Result<TypedResponse<T>> {
        let envelope = self.execute(method, url, body, headers).await?;
        let model = self
            .codec
            .decode(&envelope.content)
            .map_err(|e| Error::decode(e, &envelope.content))?;
        Ok(TypedResponse { envelope, model })
    }

    /// Send prepared headers and body, raising for non-2xx statuses.
    ///
    /// The successful response is returned unread so callers can stream it.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: &Headers,
        body: Option<reqwest::Body>,
    ) -> Result<reqwest::Response> {
        let request_id = Uuid::new_v4();
        let start = Instant::now();
        let response = self.transport.send(method, url.clone(), headers, body).await?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            debug!(
                request_id = %request_id,
                http_status = status,
                method = method.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "request succeeded"
            );
            return Ok(response);
        }

        let content = match response.text().await {
            Ok(content) => content,
            Err(e) => {
                debug!(request_id = %request_id, error = %e, "failed to read error body");
                String::new()
            }
        };
        let error = ErrorResponse::parse(&content);
        info!(
            request_id = %request_id,
            http_status = status,
            method = method.as_str(),
            url = url.as_str(),
            fallback = error.fallback,
            duration_ms = start.elapsed().as_millis() as u64,
            "request failed"
        );
        Err(Error::Request(RequestError::new(status, error)))
    }
}
