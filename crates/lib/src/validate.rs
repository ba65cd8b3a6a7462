//! Parameter validation: caller-supplied values against a command's declared
//! parameter schemas. Checks run in schema order and stop at the first
//! violation.

use crate::catalog::{ParameterKind, ParameterSchema};
use crate::params::{ParamMap, ParamValue};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required parameter '{0}' is missing")]
    MissingRequired(String),
    #[error("required parameter '{0}' must not be empty")]
    EmptyRequired(String),
    #[error("parameter '{0}' must be a string")]
    NotText(String),
    #[error("invalid validation pattern for parameter '{0}'")]
    BadPattern(String),
    #[error("parameter '{0}' does not match its validation pattern")]
    PatternMismatch(String),
    #[error("parameter '{0}' must be a number")]
    NotNumber(String),
    #[error("parameter '{0}' must be a boolean")]
    NotBoolean(String),
    #[error("parameter '{0}' has no options defined")]
    NoOptions(String),
    #[error("parameter '{0}' is not one of the allowed options")]
    InvalidOption(String),
}

/// Validate `inputs` against `schemas`, in schema order, first error wins.
/// A null value counts as absent; optional parameters left out are fine.
pub fn validate_parameters(
    schemas: &[ParameterSchema],
    inputs: &ParamMap,
) -> Result<(), ValidationError> {
    for schema in schemas {
        if schema.required {
            let value = inputs
                .get(&schema.name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| ValidationError::MissingRequired(schema.name.clone()))?;
            if let ParamValue::Text(s) = value {
                if s.trim().is_empty() {
                    return Err(ValidationError::EmptyRequired(schema.name.clone()));
                }
            }
        }

        if let Some(value) = inputs.get(&schema.name).filter(|v| !v.is_null()) {
            check_value(schema, value)?;
        }
    }
    Ok(())
}

fn check_value(schema: &ParameterSchema, value: &ParamValue) -> Result<(), ValidationError> {
    match schema.kind {
        ParameterKind::Text => check_text(schema, value),
        ParameterKind::Number => check_number(schema, value),
        ParameterKind::Boolean => check_boolean(schema, value),
        ParameterKind::Select => check_select(schema, value),
        // File handling is delegated to the upload collaborator.
        ParameterKind::File => Ok(()),
    }
}

fn check_text(schema: &ParameterSchema, value: &ParamValue) -> Result<(), ValidationError> {
    let Some(pattern) = schema.pattern.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let s = value
        .as_text()
        .ok_or_else(|| ValidationError::NotText(schema.name.clone()))?;
    let re =
        Regex::new(pattern).map_err(|_| ValidationError::BadPattern(schema.name.clone()))?;
    // Search semantics: the pattern must match somewhere, not the whole value.
    if !re.is_match(s) {
        return Err(ValidationError::PatternMismatch(schema.name.clone()));
    }
    Ok(())
}

fn check_number(schema: &ParameterSchema, value: &ParamValue) -> Result<(), ValidationError> {
    match value {
        ParamValue::Number(_) => Ok(()),
        ParamValue::Text(s) if s.parse::<f64>().is_ok() => Ok(()),
        _ => Err(ValidationError::NotNumber(schema.name.clone())),
    }
}

fn check_boolean(schema: &ParameterSchema, value: &ParamValue) -> Result<(), ValidationError> {
    match value {
        ParamValue::Bool(_) => Ok(()),
        ParamValue::Text(s) if s == "true" || s == "false" => Ok(()),
        _ => Err(ValidationError::NotBoolean(schema.name.clone())),
    }
}

fn check_select(schema: &ParameterSchema, value: &ParamValue) -> Result<(), ValidationError> {
    let Some(options) = schema.options.as_deref().filter(|o| !o.is_empty()) else {
        return Err(ValidationError::NoOptions(schema.name.clone()));
    };
    let s = value
        .as_text()
        .ok_or_else(|| ValidationError::NotText(schema.name.clone()))?;
    // Options are trimmed; the caller's value is compared as-is.
    if !options.split(',').any(|option| option.trim() == s) {
        return Err(ValidationError::InvalidOption(schema.name.clone()));
    }
    Ok(())
}
