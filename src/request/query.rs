//! Target URL construction.

use serde_json::Value;
use url::form_urlencoded;
use url::Url;

use super::Method;
use crate::{Error, ErrorContext, Result};

/// Build the final request URL.
///
/// Only a GET whose body is a string-to-string JSON object changes the URL:
/// each entry is merged into the query, replacing same-named keys. Every other
/// existing query segment is kept byte for byte.
pub fn build_url(url: &str, method: Method, body: Option<&Value>) -> Result<Url> {
    let mut parsed = Url::parse(url).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid request URL: {}", e),
            ErrorContext::new().with_field_path("url").with_details(url),
        )
    })?;

    if method != Method::Get {
        return Ok(parsed);
    }
    let params = match body.and_then(string_pairs) {
        Some(params) if !params.is_empty() => params,
        _ => return Ok(parsed),
    };

    let mut segments: Vec<String> = parsed
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let key = segment_key(segment);
            !params.iter().any(|(k, _)| *k == key)
        })
        .map(str::to_string)
        .collect();

    for (key, value) in &params {
        segments.push(
            form_urlencoded::Serializer::new(String::new())
                .append_pair(key, value)
                .finish(),
        );
    }

    parsed.set_query(Some(&segments.join("&")));
    Ok(parsed)
}

fn segment_key(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

/// `Some` only when `value` is an object whose members are all strings.
fn string_pairs(value: &Value) -> Option<Vec<(String, String)>> {
    let object = value.as_object()?;
    object
        .iter()
        .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}
