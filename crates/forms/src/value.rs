//! Values held by form controls.
//!
//! Leaves hold scalars (`Number`, `Text`); groups aggregate into `Record`,
//! arrays into `List`. Numbers are `f64` because user input may be `NaN`
//! until it parses.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::FormError;

/// A control value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Record(BTreeMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Text(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Field lookup on a record; `None` for any other variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|fields| fields.get(key))
    }

    /// Scalar equality where two `NaN`s count as the same value.
    ///
    /// Calculators use this to skip writes that would not change anything.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Convert from JSON. Booleans and nulls have no form representation.
    pub fn from_json(v: &serde_json::Value) -> Result<Value, FormError> {
        match v {
            serde_json::Value::Number(n) => {
                n.as_f64()
                    .map(Value::Number)
                    .ok_or_else(|| FormError::UnsupportedValue {
                        message: format!("number {} is not representable as f64", n),
                    })
            }
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(obj) => obj
                .iter()
                .map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Record),
            serde_json::Value::Bool(b) => Err(FormError::UnsupportedValue {
                message: format!("boolean {}", b),
            }),
            serde_json::Value::Null => Err(FormError::UnsupportedValue {
                message: "null".to_string(),
            }),
        }
    }

    /// Convert to JSON. Integral numbers are written without a fraction;
    /// non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Number(n) => number_to_json(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Format a number the way it is shown to users: `20` rather than `20.0`,
/// `0` for negative zero, `NaN` and `Infinity` spelled out.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Record(_) | Value::List(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Record(fields)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_keeps_structure() {
        let json = json!({"name": "Tea", "items": [1, 2.5], "nested": {"n": -3}});
        let value = Value::from_json(&json).unwrap();
        assert_eq!(value.get("name"), Some(&Value::Text("Tea".to_string())));
        assert_eq!(
            value.get("items").and_then(Value::as_list).map(|l| l.len()),
            Some(2)
        );
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn json_rejects_booleans_and_null() {
        assert!(matches!(
            Value::from_json(&json!(true)),
            Err(FormError::UnsupportedValue { .. })
        ));
        assert!(matches!(
            Value::from_json(&json!({"a": null})),
            Err(FormError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn nan_becomes_null_in_json() {
        assert_eq!(Value::Number(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn integral_numbers_have_no_fraction() {
        assert_eq!(Value::Number(20.0).to_json().to_string(), "20");
        assert_eq!(Value::Number(0.5).to_json().to_string(), "0.5");
    }

    #[test]
    fn format_number_matches_display_conventions() {
        assert_eq!(format_number(25.0), "25");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(-2.5), "-2.5");
    }

    #[test]
    fn same_as_treats_nan_as_equal() {
        assert!(Value::Number(f64::NAN).same_as(&Value::Number(f64::NAN)));
        assert!(!Value::Number(1.0).same_as(&Value::Number(f64::NAN)));
        assert!(Value::from("a").same_as(&Value::from("a")));
    }
}
