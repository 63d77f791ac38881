//! Ordered, case-insensitive header map and default-header composition.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::Method;
use crate::config::ClientOptions;
use crate::{Error, ErrorContext, Result};

pub const CLIENT_INFO_HEADER: &str = "X-Client-Info";

/// Header name/value pairs in insertion order.
///
/// Names compare case-insensitively. Inserting an existing name replaces the
/// value in place (last write wins) and adopts the new spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => {
                let slot = &mut self.entries[idx];
                slot.0 = name;
                Some(std::mem::replace(&mut slot.1, value))
            }
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Insert only when the name is not present yet.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if self.position(&name).is_none() {
            self.entries.push((name, value.into()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply `overrides` on top of `self`; colliding names take the override value.
    pub fn merge(&mut self, overrides: &Headers) {
        for (name, value) in overrides.iter() {
            self.insert(name, value);
        }
    }

    /// `defaults` with `overrides` applied on top.
    pub fn merged(defaults: &Headers, overrides: &Headers) -> Headers {
        let mut out = defaults.clone();
        out.merge(overrides);
        out
    }

    pub(crate) fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header name: {}", e),
                    ErrorContext::new().with_field_path(format!("headers.{}", name)),
                )
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header value: {}", e),
                    ErrorContext::new().with_field_path(format!("headers.{}", name)),
                )
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Row window for tabular reads, sent as `Range: from-to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub from: u64,
    pub to: Option<u64>,
}

impl RangeSpec {
    pub fn new(from: u64, to: Option<u64>) -> Self {
        Self { from, to }
    }

    fn header_value(&self) -> String {
        match self.to {
            Some(to) => format!("{}-{}", self.from, to),
            None => format!("{}-", self.from),
        }
    }
}

/// Build the header set for one call.
///
/// Option defaults come first, call headers override them. The schema profile
/// and client identifier are only added when the caller did not set them.
pub fn compose_headers(
    method: Method,
    options: &ClientOptions,
    call_headers: Option<&Headers>,
    range: Option<RangeSpec>,
) -> Headers {
    let mut headers = options.default_headers();
    if let Some(call_headers) = call_headers {
        headers.merge(call_headers);
    }

    if let Some(schema) = options.schema.as_deref().filter(|s| !s.is_empty()) {
        let profile = if method == Method::Get {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        headers.insert_if_absent(profile, schema);
    }

    if let Some(range) = range {
        headers.insert("Range-Unit", "items");
        headers.insert("Range", range.header_value());
    }

    headers.insert_if_absent(CLIENT_INFO_HEADER, options.client_info.clone());
    headers
}
