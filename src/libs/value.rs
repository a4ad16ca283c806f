use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

use crate::libs::error::{ExplorerError, Result};
use crate::libs::query_builder::Param;
use crate::libs::schema::{ColumnKind, ColumnSchema};

/// One client-submitted field, as decoded from the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Number(Number),
    String(String),
    Bool(bool),
    /// Arrays and objects. Only reachable for unconstrained column types.
    Other(Value),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::String(s),
            Value::Bool(b) => FieldValue::Bool(b),
            other => FieldValue::Other(other),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}

impl FieldValue {
    pub fn into_param(self) -> Param {
        match self {
            FieldValue::Null => Param::Null,
            FieldValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Param::Int(i)
                } else if n.is_u64() {
                    // beyond i64, let the engine parse the literal
                    Param::Text(n.to_string())
                } else {
                    n.as_f64().map(Param::Float).unwrap_or_else(|| Param::Text(n.to_string()))
                }
            }
            FieldValue::String(s) => Param::Text(s),
            FieldValue::Bool(b) => Param::Bool(b),
            FieldValue::Other(v) => Param::Text(v.to_string()),
        }
    }
}

pub type FieldMap = HashMap<String, FieldValue>;

/// Decodes a request body into its fields. `null` counts as an empty object,
/// anything else that is not an object is malformed.
pub fn decode_fields(body: &[u8]) -> Result<FieldMap> {
    serde_json::from_slice::<Option<FieldMap>>(body)
        .map(Option::unwrap_or_default)
        .map_err(ExplorerError::MalformedBody)
}

/// Checks `value` against the column's nullability and type bucket.
pub fn validate(value: &FieldValue, column: &ColumnSchema) -> Result<()> {
    let ok = match value {
        FieldValue::Null => column.nullable,
        _ => match column.kind {
            ColumnKind::Integer => matches!(value, FieldValue::Number(n) if is_whole(n)),
            ColumnKind::Text => matches!(value, FieldValue::String(_)),
            ColumnKind::Other => true,
        },
    };

    if ok {
        Ok(())
    } else {
        Err(ExplorerError::InvalidFieldType(column.name.clone()))
    }
}

/// Native integers, or floats equal to their own truncation.
fn is_whole(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    match n.as_f64() {
        Some(f) => f == (f as i64) as f64,
        None => false,
    }
}
