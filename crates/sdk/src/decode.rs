//! Decoding and filtering of module outputs.

use blockstream_types::{AnyPayload, Cursor, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Turns an encoded module output into a structured value.
pub trait Decoder {
    fn decode(&self, payload: &AnyPayload) -> Result<Value, DecodeError>;
}

impl<D: Decoder + ?Sized> Decoder for &D {
    fn decode(&self, payload: &AnyPayload) -> Result<Value, DecodeError> {
        (**self).decode(payload)
    }
}

/// A decoded, non-empty output of the target module, as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedOutput {
    pub module: String,
    pub block_number: u64,
    pub block_id: String,
    pub cursor: Cursor,
    pub value: Value,
}

/// Extract the structured output of `module` from a response.
///
/// Returns `None` when the response carries no output for that module or the
/// payload is zero-length. A payload that is present but cannot be decoded is
/// an error.
pub fn unpack_map_output<D: Decoder>(
    response: &Response,
    module: &str,
    decoder: &D,
) -> Result<Option<Value>, DecodeError> {
    let Response::BlockScopedData(data) = response else {
        return Ok(None);
    };

    let Some(output) = data.output.as_ref().filter(|o| o.name == module) else {
        return Ok(None);
    };

    match output.map_output.as_ref() {
        Some(any) if !any.value.is_empty() => decoder.decode(any).map(Some),
        _ => Ok(None),
    }
}

/// Whether every field of a decoded message is absent or holds its default
pub fn is_empty_message(value: &Value) -> bool {
    match value {
        Value::Object(fields) => fields.values().all(is_default_value),
        other => is_default_value(other),
    }
}

fn is_default_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => is_empty_message(value),
    }
}

/// Decode the output of `module` carried by `response`, dropping empty messages.
pub fn decode<D: Decoder>(
    response: &Response,
    module: &str,
    decoder: &D,
) -> Result<Option<DecodedOutput>, DecodeError> {
    let Some(value) = unpack_map_output(response, module, decoder)? else {
        return Ok(None);
    };

    if is_empty_message(&value) {
        return Ok(None);
    }

    let Response::BlockScopedData(data) = response else {
        return Ok(None);
    };

    Ok(Some(DecodedOutput {
        module: module.to_string(),
        block_number: data.clock.number,
        block_id: data.clock.id.clone(),
        cursor: data.cursor.clone(),
        value,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{data, data_with_output, undo};

    /// Decodes any payload as raw JSON
    struct JsonDecoder;

    impl Decoder for JsonDecoder {
        fn decode(&self, payload: &AnyPayload) -> Result<Value, DecodeError> {
            serde_json::from_slice(&payload.value).map_err(|source| DecodeError::InvalidJson {
                type_name: payload.type_name().to_string(),
                source,
            })
        }
    }

    #[test]
    fn test_is_empty_message() {
        assert!(is_empty_message(&json!({})));
        assert!(is_empty_message(&json!({"a": 0, "b": "", "c": false, "d": null, "e": []})));
        assert!(is_empty_message(&json!({"nested": {"x": 0}})));
        assert!(!is_empty_message(&json!({"a": 1})));
        assert!(!is_empty_message(&json!({"a": "x"})));
        assert!(!is_empty_message(&json!({"nested": {"x": 0.5}})));
        assert!(!is_empty_message(&json!({"tags": [""]})));
    }

    #[test]
    fn test_decode_block_output() {
        let response = data(100_000, "c1", Some(r#"{"number": "100000"}"#));

        let output = decode(&response, "map_block_meta", &JsonDecoder)
            .unwrap()
            .unwrap();

        assert_eq!(output.module, "map_block_meta");
        assert_eq!(output.block_number, 100_000);
        assert_eq!(output.cursor, Cursor::new("c1"));
        assert_eq!(output.value, json!({"number": "100000"}));
    }

    #[test]
    fn test_decode_skips_empty_output() {
        let response = data(100_000, "c1", Some(r#"{"number": 0, "hash": ""}"#));
        assert!(decode(&response, "map_block_meta", &JsonDecoder).unwrap().is_none());
    }

    #[test]
    fn test_decode_skips_missing_or_foreign_output() {
        let no_output = data(100_000, "c1", None);
        assert!(decode(&no_output, "map_block_meta", &JsonDecoder).unwrap().is_none());

        let zero_length = data(100_000, "c1", Some(""));
        assert!(decode(&zero_length, "map_block_meta", &JsonDecoder).unwrap().is_none());

        let other_module = data_with_output(100_000, "c1", "map_other", r#"{"a": 1}"#);
        assert!(decode(&other_module, "map_block_meta", &JsonDecoder).unwrap().is_none());

        assert!(decode(&undo(99, "c0"), "map_block_meta", &JsonDecoder).unwrap().is_none());
        assert!(decode(&Response::Other, "map_block_meta", &JsonDecoder).unwrap().is_none());
    }

    #[test]
    fn test_decode_surfaces_malformed_payload() {
        let response = data(100_000, "c1", Some("not json"));
        assert!(matches!(
            decode(&response, "map_block_meta", &JsonDecoder),
            Err(DecodeError::InvalidJson { .. })
        ));
    }
}
