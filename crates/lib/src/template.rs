//! Command template rendering: flat `{{name}}` substitution only.
//!
//! Deliberately not a general template engine: no conditionals, no loops, no
//! nested fields. A placeholder that cannot be resolved is a hard error; a
//! half-rendered command is more dangerous executed than it is useful.

use crate::params::ParamMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
    #[error("malformed placeholder '{0}'")]
    Malformed(String),
    #[error("template references unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("template parameter '{0}' has no value")]
    NullParameter(String),
}

/// Substitute `{{name}}` placeholders with rendered parameter values.
/// Placeholder names may contain letters, digits, `_` and `-`; surrounding
/// whitespace inside the braces is ignored (`{{ name }}` works).
pub fn render(template: &str, inputs: &ParamMap) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0usize;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or(TemplateError::Unterminated(consumed + start))?;
        let name = after[..end].trim();
        if name.is_empty() || !is_placeholder_name(name) {
            return Err(TemplateError::Malformed(after[..end].to_string()));
        }
        match inputs.get(name) {
            None => return Err(TemplateError::UnknownParameter(name.to_string())),
            Some(v) if v.is_null() => {
                return Err(TemplateError::NullParameter(name.to_string()))
            }
            Some(v) => out.push_str(&v.render()),
        }
        consumed += start + 2 + end + 2;
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use std::collections::HashMap;

    fn inputs(pairs: &[(&str, ParamValue)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn substitutes_named_placeholders() {
        let map = inputs(&[("message", ParamValue::Text("hello".into()))]);
        assert_eq!(render("echo {{message}}", &map).unwrap(), "echo hello");
    }

    #[test]
    fn accepts_padded_placeholder_names() {
        let map = inputs(&[("path", ParamValue::Text("/tmp".into()))]);
        assert_eq!(render("ls {{ path }}", &map).unwrap(), "ls /tmp");
    }

    #[test]
    fn renders_numbers_and_booleans() {
        let map = inputs(&[
            ("count", ParamValue::Number(3.0)),
            ("verbose", ParamValue::Bool(true)),
        ]);
        assert_eq!(
            render("head -n {{count}} {{verbose}}", &map).unwrap(),
            "head -n 3 true"
        );
    }

    #[test]
    fn unknown_placeholder_is_an_error_not_empty() {
        let map = inputs(&[]);
        assert_eq!(
            render("echo {{missing}}", &map),
            Err(TemplateError::UnknownParameter("missing".to_string()))
        );
    }

    #[test]
    fn null_value_is_an_error() {
        let map = inputs(&[("x", ParamValue::Null)]);
        assert_eq!(
            render("echo {{x}}", &map),
            Err(TemplateError::NullParameter("x".to_string()))
        );
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let map = inputs(&[("a", ParamValue::Text("1".into()))]);
        assert_eq!(
            render("echo {{a", &map),
            Err(TemplateError::Unterminated(5))
        );
    }

    #[test]
    fn rejects_non_flat_placeholders() {
        let map = inputs(&[("a", ParamValue::Text("1".into()))]);
        assert!(matches!(
            render("echo {{a.b}}", &map),
            Err(TemplateError::Malformed(_))
        ));
        assert!(matches!(
            render("echo {{if a}}", &map),
            Err(TemplateError::Malformed(_))
        ));
    }

    #[test]
    fn plain_text_passes_through() {
        let map = inputs(&[]);
        assert_eq!(render("uptime", &map).unwrap(), "uptime");
        assert_eq!(render("a } b { c", &map).unwrap(), "a } b { c");
    }

    #[test]
    fn repeated_placeholder_substitutes_each_occurrence() {
        let map = inputs(&[("n", ParamValue::Text("x".into()))]);
        assert_eq!(render("{{n}} {{n}}", &map).unwrap(), "x x");
    }
}
