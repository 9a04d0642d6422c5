//! Command parameters as the host hands them over.
//!
//! Hosts send a flat JSON object, usually of strings. A parameter is
//! missing when it is absent or falsy (`""`, `0`, `false`, `null`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::PluginError;
use crate::types::Scalar;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterBag(Map<String, Value>);

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `key=value` style pairs; every value is kept as a string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ParameterBag(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value under `key`, if present and truthy.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| is_truthy(v))
    }

    /// A required string parameter. `message` is what the user sees when it
    /// is missing.
    pub fn require_str(&self, key: &str, message: &str) -> Result<String, PluginError> {
        match self.get(key) {
            None => Err(PluginError::missing(key, message)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(PluginError::InvalidParameter {
                name: key.to_string(),
                expected: "string",
                value: other.to_string(),
            }),
        }
    }

    /// A required whole number. Strings are read up to the first character
    /// that is not part of a number; fractions are truncated. `"0"` is
    /// present and yields a run that draws nothing.
    pub fn require_count(&self, key: &str, message: &str) -> Result<u32, PluginError> {
        let value = self.get(key).ok_or_else(|| PluginError::missing(key, message))?;
        let scalar = match value {
            Value::String(s) => Scalar::parse_lenient(s),
            Value::Number(n) => Scalar(n.as_f64().unwrap_or(f64::NAN)),
            _ => Scalar::NAN,
        };
        let invalid = || PluginError::InvalidParameter {
            name: key.to_string(),
            expected: "non-negative whole number",
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        };
        let v = scalar.try_finite().map_err(|_| invalid())?.trunc();
        if v < 0.0 || v > f64::from(u32::MAX) {
            return Err(invalid());
        }
        Ok(v as u32)
    }

    /// An optional image dimension, read like an integer prefix. Text that is
    /// not a number yields NaN so the caller can reject it.
    pub fn dimension(&self, key: &str) -> Option<f64> {
        self.get(key).map(|value| match value {
            Value::String(s) => Scalar::parse_lenient(s).raw().trunc(),
            Value::Number(n) => n.as_f64().map_or(f64::NAN, f64::trunc),
            _ => f64::NAN,
        })
    }
}
