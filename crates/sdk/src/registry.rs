//! Descriptor-driven type registry.
//!
//! Module outputs travel as JSON objects tagged with a type URL. The registry
//! checks each object against the type descriptors shipped in the package and
//! normalizes it the way canonical protobuf JSON does: default-valued fields
//! are omitted and 64-bit integers are rendered as strings.

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use blockstream_types::{AnyPayload, FieldDescriptor, FieldKind, Package, TypeDescriptor};
use serde_json::{Map, Value};

use crate::{
    decode::{Decoder, is_empty_message},
    error::DecodeError,
};

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the type descriptors shipped in a package
    pub fn from_package(package: &Package) -> Self {
        let mut registry = Self::new();
        for descriptor in &package.types {
            registry.register(descriptor.clone());
        }
        registry
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn decode_message(&self, type_name: &str, value: Value) -> Result<Value, DecodeError> {
        let descriptor = self
            .types
            .get(type_name)
            .ok_or_else(|| DecodeError::UnknownType(type_name.to_string()))?;

        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject(type_name.to_string()));
        };

        if let Some(unknown) = fields.keys().find(|k| descriptor.field(k).is_none()) {
            return Err(DecodeError::UnknownField {
                type_name: type_name.to_string(),
                field: unknown.clone(),
            });
        }

        // Declaration order, defaults omitted
        let mut decoded = Map::new();
        for field in &descriptor.fields {
            let Some(raw) = fields.remove(&field.name) else {
                continue;
            };
            if let Some(value) = self.decode_field(type_name, field, raw)? {
                decoded.insert(field.name.clone(), value);
            }
        }

        Ok(Value::Object(decoded))
    }

    fn decode_field(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
        raw: Value,
    ) -> Result<Option<Value>, DecodeError> {
        if raw.is_null() {
            return Ok(None);
        }

        if field.repeated {
            let Value::Array(items) = raw else {
                return Err(kind_error(type_name, field));
            };
            let decoded = items
                .into_iter()
                .map(|item| self.decode_single(type_name, field, item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok((!decoded.is_empty()).then_some(Value::Array(decoded)));
        }

        let decoded = self.decode_single(type_name, field, raw)?;
        let is_default = match &decoded {
            Value::Object(_) => is_empty_message(&decoded),
            Value::String(s) => s.is_empty() || (is_64_bit(&field.kind) && s == "0"),
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            _ => false,
        };
        Ok((!is_default).then_some(decoded))
    }

    fn decode_single(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
        raw: Value,
    ) -> Result<Value, DecodeError> {
        let invalid = || kind_error(type_name, field);

        match &field.kind {
            FieldKind::String => raw.is_string().then_some(raw).ok_or_else(invalid),
            FieldKind::Bool => raw.is_boolean().then_some(raw).ok_or_else(invalid),
            FieldKind::Double => raw.is_number().then_some(raw).ok_or_else(invalid),
            FieldKind::Int32 => match raw.as_i64() {
                Some(n) if i32::try_from(n).is_ok() => Ok(raw),
                _ => Err(invalid()),
            },
            FieldKind::Uint32 => match raw.as_u64() {
                Some(n) if u32::try_from(n).is_ok() => Ok(raw),
                _ => Err(invalid()),
            },
            FieldKind::Int64 => match &raw {
                Value::Number(n) => n.as_i64().map(|n| Value::String(n.to_string())),
                Value::String(s) => s.parse::<i64>().ok().map(|n| Value::String(n.to_string())),
                _ => None,
            }
            .ok_or_else(invalid),
            FieldKind::Uint64 => match &raw {
                Value::Number(n) => n.as_u64().map(|n| Value::String(n.to_string())),
                Value::String(s) => s.parse::<u64>().ok().map(|n| Value::String(n.to_string())),
                _ => None,
            }
            .ok_or_else(invalid),
            FieldKind::Bytes => match &raw {
                Value::String(s) if STANDARD.decode(s.as_bytes()).is_ok() => Ok(raw),
                _ => Err(invalid()),
            },
            FieldKind::Message(nested) => self.decode_message(nested, raw),
        }
    }
}

fn kind_error(type_name: &str, field: &FieldDescriptor) -> DecodeError {
    DecodeError::FieldKind {
        type_name: type_name.to_string(),
        field: field.name.clone(),
        expected: field.kind.clone(),
    }
}

fn is_64_bit(kind: &FieldKind) -> bool {
    matches!(kind, FieldKind::Int64 | FieldKind::Uint64)
}

impl Decoder for TypeRegistry {
    fn decode(&self, payload: &AnyPayload) -> Result<Value, DecodeError> {
        let type_name = payload.type_name();
        if !self.contains(type_name) {
            return Err(DecodeError::UnknownType(type_name.to_string()));
        }

        let value: Value =
            serde_json::from_slice(&payload.value).map_err(|source| DecodeError::InvalidJson {
                type_name: type_name.to_string(),
                source,
            })?;

        self.decode_message(type_name, value)
    }
}
