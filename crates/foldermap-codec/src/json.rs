//! JSON codec, used for files without a known extension.

use std::sync::LazyLock;

use foldermap_core::{CodecKind, Value, ValueMap};
use serde_json::Value as Json;

use crate::codec::TextCodec;
use crate::error::CodecError;

static GLOBAL: LazyLock<JsonCodec> = LazyLock::new(|| JsonCodec);

/// Reads and writes leaves as pretty-printed JSON objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Shared instance.
    pub fn global() -> &'static JsonCodec {
        &GLOBAL
    }
}

impl TextCodec for JsonCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Json
    }

    fn decode_document(&self, text: &str) -> Result<ValueMap, CodecError> {
        if text.trim().is_empty() {
            return Ok(ValueMap::new());
        }

        match from_json(serde_json::from_str(text)?) {
            Value::Map(map) => Ok(map),
            other => Err(CodecError::NotAMap {
                found: other.value_type(),
            }),
        }
    }

    fn encode_document(&self, values: &ValueMap) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(values)?)
    }
}

fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).map_or(Value::Long(i), Value::Int),
            None => n
                .as_f64()
                .map_or_else(|| Value::Text(n.to_string()), Value::Double),
        },
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        Json::Object(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect(),
        ),
    }
}
