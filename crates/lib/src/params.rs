//! Caller-supplied parameter values: a tagged variant over the JSON scalar types.
//!
//! Request bodies carry `{"parameters": {name: value}}` with arbitrary scalar values;
//! arrays and objects are rejected at deserialization. Type rules are enforced by
//! the validator, not here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter map as received from the caller (name -> scalar value).
pub type ParamMap = HashMap<String, ParamValue>;

/// One scalar parameter value. Untagged: JSON null/bool/number/string map directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// The string payload when this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the value for template substitution. Whole numbers print without a
    /// trailing `.0` (a JSON `5` substitutes as `5`, not `5.0`).
    pub fn render(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => format_number(*n),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
