//! Response envelopes and the server error body.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::request::Method;

/// Message used when a failed response carried no structured error body.
pub const FALLBACK_ERROR_MESSAGE: &str = "Invalid or Empty response received. Are you trying to update or delete a record that does not exist?";

/// Raw result of one completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub content: String,
    pub status: u16,
    pub headers: HeaderMap,
    /// Method and final URL (query included) of the request that produced this response.
    pub method: Method,
    pub url: Url,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An envelope plus the body decoded into a caller-chosen shape.
#[derive(Debug, Clone)]
pub struct TypedResponse<T> {
    pub envelope: ResponseEnvelope,
    pub model: T,
}

impl<T> TypedResponse<T> {
    pub fn into_model(self) -> T {
        self.model
    }
}

/// Error body returned by the REST services.
///
/// `message` is required: a body without it is treated like an empty or
/// malformed one and replaced by [`ErrorResponse::fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Raw body text.
    #[serde(skip)]
    pub content: String,
    /// Set when `message` is [`FALLBACK_ERROR_MESSAGE`] rather than server supplied.
    #[serde(skip)]
    pub fallback: bool,
}

impl ErrorResponse {
    /// Parse a failed response body, falling back to the fixed message.
    pub fn parse(content: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(content) {
            Ok(mut parsed) => {
                parsed.content = content.to_string();
                parsed
            }
            Err(_) => Self::fallback(content),
        }
    }

    pub fn fallback(content: &str) -> Self {
        Self {
            message: FALLBACK_ERROR_MESSAGE.to_string(),
            code: None,
            details: None,
            hint: None,
            content: content.to_string(),
            fallback: true,
        }
    }

    /// Error whose message is the raw body, as the functions service reports it.
    pub fn raw(content: &str) -> Self {
        Self {
            message: content.to_string(),
            code: None,
            details: None,
            hint: None,
            content: content.to_string(),
            fallback: false,
        }
    }
}
