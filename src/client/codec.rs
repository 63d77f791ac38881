//! Serializer configuration shared by request encoding and response decoding.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// How request bodies are encoded and response bodies decoded.
///
/// Field naming and enum conventions belong to the model types' serde
/// attributes; the codec covers the document-level rules layered on top.
pub trait Codec: Send + Sync {
    fn to_value<B: Serialize + ?Sized>(&self, body: &B) -> serde_json::Result<Value>;

    fn encode<B: Serialize + ?Sized>(&self, body: &B) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_value(body)?)
    }

    fn decode<T: DeserializeOwned>(&self, content: &str) -> serde_json::Result<T>;
}

/// Plain `serde_json` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    skip_nulls: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `null` object members when encoding, at any depth.
    pub fn skip_nulls() -> Self {
        Self { skip_nulls: true }
    }
}

impl Codec for JsonCodec {
    fn to_value<B: Serialize + ?Sized>(&self, body: &B) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(body)?;
        if self.skip_nulls {
            strip_nulls(&mut value);
        }
        Ok(value)
    }

    fn decode<T: DeserializeOwned>(&self, content: &str) -> serde_json::Result<T> {
        serde_json::from_str(content)
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
