use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::codec::JsonCodec;
use super::execution::RequestExecutor;
use crate::config::ClientOptions;
use crate::functions::FunctionsClient;
use crate::request::{compose_headers, Headers, Method, RangeSpec};
use crate::response::TypedResponse;
use crate::storage::StorageClient;
use crate::transport::HttpTransport;
use crate::Result;

/// Access to every sub-API of one project over one shared transport.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) options: ClientOptions,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) executor: RequestExecutor,
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&options)?);
        Ok(Self::with_transport(options, transport))
    }

    pub fn builder() -> super::builder::ClientBuilder {
        super::builder::ClientBuilder::new()
    }

    pub(crate) fn with_transport(options: ClientOptions, transport: Arc<HttpTransport>) -> Self {
        let executor = RequestExecutor::from_options(transport.clone(), &options);
        Self {
            options,
            transport,
            executor,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &Arc<HttpTransport> {
        &self.transport
    }

    /// The raw request pipeline, carrying the project's default headers.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn storage(&self) -> StorageClient {
        StorageClient::new(self.options.storage_url(), self.executor.clone())
    }

    pub fn functions(&self) -> FunctionsClient {
        FunctionsClient::new(self.options.functions_url(), self.executor.clone())
    }

    /// Headers for a tabular request: defaults, caller overrides, schema
    /// profile, optional row range and client identifier.
    pub fn rest_headers(&self, method: Method, headers: Option<&Headers>, range: Option<RangeSpec>) -> Headers {
        compose_headers(method, &self.options, headers, range)
    }

    /// Run one tabular request against `{url}/rest/v1/{path}`.
    ///
    /// Bodies are encoded without `null` members, the tabular API's convention.
    pub async fn rest<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        headers: Option<&Headers>,
        range: Option<RangeSpec>,
    ) -> Result<TypedResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}/{}", self.options.rest_url(), path.trim_start_matches('/'));
        let headers = self.rest_headers(method, headers, range);
        self.executor
            .codec(JsonCodec::skip_nulls())
            .execute_typed(method, &url, body, Some(&headers))
            .await
    }
}
