//! Opaque JSON payloads
//!
//! Record data, mutable values and metadata are schema-less. They are carried
//! as `JsonValue`, a newtype over `serde_json::Value`, with no compile-time
//! shape guarantee. Callers must type-check on read.
//!
//! - `JsonValue`: payload of immutable records, mutable entries and contexts
//! - `Metadata`: string-keyed JSON map attached to most records
//! - `NumericValue`: integer/float classification used by arithmetic updates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// Free-form metadata map
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// JSON value wrapper
///
/// Derefs to `serde_json::Value` so the usual accessors (`is_array`,
/// `as_str`, indexing) are available directly.
///
/// # Examples
///
/// ```
/// use cortex_core::JsonValue;
///
/// let v = JsonValue::from(42i64);
/// assert_eq!(v.type_name(), "number");
/// assert!(JsonValue::array().is_array());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonValue(serde_json::Value);

/// Numeric interpretation of a JSON value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    /// Fits in an i64
    Int(i64),
    /// Any other finite number
    Float(f64),
}

impl NumericValue {
    /// Widen to f64
    pub fn as_f64(self) -> f64 {
        match self {
            NumericValue::Int(i) => i as f64,
            NumericValue::Float(f) => f,
        }
    }
}

impl JsonValue {
    /// Create a null JSON value
    pub fn null() -> Self {
        JsonValue(serde_json::Value::Null)
    }

    /// Create an empty JSON object
    pub fn object() -> Self {
        JsonValue(serde_json::Value::Object(Metadata::new()))
    }

    /// Create an empty JSON array
    pub fn array() -> Self {
        JsonValue(serde_json::Value::Array(Vec::new()))
    }

    /// Get the underlying serde_json::Value
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }

    /// Get a reference to the underlying serde_json::Value
    pub fn as_inner(&self) -> &serde_json::Value {
        &self.0
    }

    /// Name of the JSON type, used in TYPE_MISMATCH errors
    pub fn type_name(&self) -> &'static str {
        value_type_name(&self.0)
    }

    /// Interpret as a number, if it is one
    pub fn as_numeric(&self) -> Option<NumericValue> {
        match &self.0 {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(NumericValue::Int(i)),
                None => n.as_f64().map(NumericValue::Float),
            },
            _ => None,
        }
    }

    /// Build from a numeric value (non-finite floats become null)
    pub fn from_numeric(n: NumericValue) -> Self {
        match n {
            NumericValue::Int(i) => JsonValue::from(i),
            NumericValue::Float(f) => JsonValue::from(f),
        }
    }

    /// Approximate encoded size in bytes, for limit checks
    pub fn size_bytes(&self) -> usize {
        self.0.to_string().len()
    }

    /// Case-insensitive substring search over every string leaf
    ///
    /// `needle` must already be lowercased. Object keys are not searched.
    pub fn contains_text(&self, needle: &str) -> bool {
        value_contains_text(&self.0, needle)
    }
}

/// Name of a serde_json value's type
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Case-insensitive substring search over metadata string values
pub fn metadata_contains_text(metadata: &Metadata, needle: &str) -> bool {
    metadata.values().any(|v| value_contains_text(v, needle))
}

fn value_contains_text(v: &serde_json::Value, needle: &str) -> bool {
    // Iterative walk; payloads are user-controlled and may nest deeply.
    let mut stack = vec![v];
    while let Some(current) = stack.pop() {
        match current {
            serde_json::Value::String(s) => {
                if s.to_lowercase().contains(needle) {
                    return true;
                }
            }
            serde_json::Value::Number(n) => {
                if n.to_string().contains(needle) {
                    return true;
                }
            }
            serde_json::Value::Array(items) => stack.extend(items.iter()),
            serde_json::Value::Object(map) => stack.extend(map.values()),
            serde_json::Value::Null | serde_json::Value::Bool(_) => {}
        }
    }
    false
}

impl FromStr for JsonValue {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map(JsonValue)
    }
}

impl Deref for JsonValue {
    type Target = serde_json::Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for JsonValue {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for JsonValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(v: serde_json::Value) -> Self {
        JsonValue(v)
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(v: JsonValue) -> Self {
        v.0
    }
}

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        JsonValue(serde_json::Value::Bool(v))
    }
}

impl From<i64> for JsonValue {
    fn from(v: i64) -> Self {
        JsonValue(serde_json::Value::Number(v.into()))
    }
}

impl From<i32> for JsonValue {
    fn from(v: i32) -> Self {
        JsonValue(serde_json::Value::Number(v.into()))
    }
}

impl From<f64> for JsonValue {
    fn from(v: f64) -> Self {
        JsonValue(
            serde_json::Number::from_f64(v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
        )
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        JsonValue(serde_json::Value::String(v.to_string()))
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        JsonValue(serde_json::Value::String(v))
    }
}

impl From<Metadata> for JsonValue {
    fn from(v: Metadata) -> Self {
        JsonValue(serde_json::Value::Object(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names() {
        assert_eq!(JsonValue::null().type_name(), "null");
        assert_eq!(JsonValue::from(true).type_name(), "boolean");
        assert_eq!(JsonValue::from(1.5).type_name(), "number");
        assert_eq!(JsonValue::from("x").type_name(), "string");
        assert_eq!(JsonValue::array().type_name(), "array");
        assert_eq!(JsonValue::object().type_name(), "object");
    }

    #[test]
    fn test_as_numeric() {
        assert_eq!(JsonValue::from(7i64).as_numeric(), Some(NumericValue::Int(7)));
        assert_eq!(
            JsonValue::from(2.5).as_numeric(),
            Some(NumericValue::Float(2.5))
        );
        assert_eq!(JsonValue::from("7").as_numeric(), None);
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert!(JsonValue::from(f64::NAN).is_null());
        assert!(JsonValue::from_numeric(NumericValue::Float(f64::INFINITY)).is_null());
    }

    #[test]
    fn test_contains_text_walks_nested_values() {
        let v = JsonValue::from(json!({"a": {"b": ["x", "Deep Needle"]}}));
        assert!(v.contains_text("needle"));
        assert!(!v.contains_text("absent"));
    }

    #[test]
    fn test_metadata_contains_text() {
        let mut m = Metadata::new();
        m.insert("topic".into(), json!("Billing"));
        assert!(metadata_contains_text(&m, "bill"));
        assert!(!metadata_contains_text(&m, "topic"));
    }

    #[test]
    fn test_parse_and_display() {
        let v: JsonValue = r#"{"v":1}"#.parse().unwrap();
        assert_eq!(v["v"], json!(1));
        assert_eq!(v.to_string(), r#"{"v":1}"#);
    }
}
