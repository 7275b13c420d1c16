//! Widget value types
//!
//! A widget value is a tagged union: exactly one variant is populated at a
//! time. The serialized form mirrors the backend's `oneof` field names, so a
//! stored entry becomes `{"id": "...", "int_value": 5}` on the wire.

use serde::{Deserialize, Serialize};

/// The value held by a single widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WidgetValue {
    #[serde(rename = "bool_value")]
    Bool(bool),
    #[serde(rename = "int_value")]
    Int(i64),
    #[serde(rename = "double_value")]
    Double(f64),
    #[serde(rename = "string_value")]
    String(String),
    #[serde(rename = "string_array_value")]
    StringArray(Vec<String>),
    #[serde(rename = "int_array_value")]
    IntArray(Vec<i64>),
    #[serde(rename = "double_array_value")]
    DoubleArray(Vec<f64>),
    /// Raw bytes, base64 on the wire
    #[serde(rename = "bytes_value")]
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    /// Serialized JSON text (not a parsed value)
    #[serde(rename = "json_value")]
    Json(String),
    /// Arrow IPC table buffer, base64 on the wire
    #[serde(rename = "arrow_value")]
    Arrow(#[serde(with = "base64_bytes")] Vec<u8>),
    /// One-shot button press
    #[serde(rename = "trigger_value")]
    Trigger(bool),
}

impl WidgetValue {
    /// The variant tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            WidgetValue::Bool(_) => ValueKind::Bool,
            WidgetValue::Int(_) => ValueKind::Int,
            WidgetValue::Double(_) => ValueKind::Double,
            WidgetValue::String(_) => ValueKind::String,
            WidgetValue::StringArray(_) => ValueKind::StringArray,
            WidgetValue::IntArray(_) => ValueKind::IntArray,
            WidgetValue::DoubleArray(_) => ValueKind::DoubleArray,
            WidgetValue::Bytes(_) => ValueKind::Bytes,
            WidgetValue::Json(_) => ValueKind::Json,
            WidgetValue::Arrow(_) => ValueKind::Arrow,
            WidgetValue::Trigger(_) => ValueKind::Trigger,
        }
    }
}

/// Variant tag of a [`WidgetValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    String,
    StringArray,
    IntArray,
    DoubleArray,
    Bytes,
    Json,
    Arrow,
    Trigger,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::StringArray => "string_array",
            ValueKind::IntArray => "int_array",
            ValueKind::DoubleArray => "double_array",
            ValueKind::Bytes => "bytes",
            ValueKind::Json => "json",
            ValueKind::Arrow => "arrow",
            ValueKind::Trigger => "trigger",
        };
        write!(f, "{}", name)
    }
}

/// One stored widget entry, as sent upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    /// Widget identifier
    pub id: String,
    /// The populated value variant
    #[serde(flatten)]
    pub value: WidgetValue,
}

impl WidgetState {
    pub fn new(id: impl Into<String>, value: WidgetValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Where a state change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Source {
    /// True for user interaction, false for defaults and initialization
    pub from_ui: bool,
}

impl Source {
    /// A change made by the user; flushes upstream
    pub const fn ui() -> Self {
        Self { from_ui: true }
    }

    /// A programmatic change; held locally
    pub const fn programmatic() -> Self {
        Self { from_ui: false }
    }
}

pub(crate) mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
