//! Template rendering with `{placeholder}` substitution
//!
//! Templates are plain text with `{name}` placeholders. Every placeholder
//! must be covered by the variable map; a leftover placeholder after
//! substitution is an error, so credentials can never silently end up as
//! literal `{password}` in a rendered config file.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Errors from template rendering
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder had no value in the variable map
    #[error("unresolved placeholder: {{{name}}}")]
    UnresolvedPlaceholder { name: String },
}

/// Render a template, substituting every `{name}` placeholder.
///
/// Unused variables are fine; unresolved placeholders are not.
pub fn render(
    template: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let mut rendered = template.to_string();
    for (name, value) in variables {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }

    if let Some(captures) = PLACEHOLDER_RE.captures(&rendered) {
        return Err(TemplateError::UnresolvedPlaceholder {
            name: captures[1].to_string(),
        });
    }

    Ok(rendered)
}

/// Convenience constructor for a variable map
pub fn vars<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all() {
        let out = render(
            "{host}:{port}:*:{user}:{password}\n",
            &vars([
                ("host", "db.internal"),
                ("port", "5432"),
                ("user", "wiki"),
                ("password", "s3cret"),
            ]),
        )
        .unwrap();
        assert_eq!(out, "db.internal:5432:*:wiki:s3cret\n");
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let out = render("{name} and {name}", &vars([("name", "wiki")])).unwrap();
        assert_eq!(out, "wiki and wiki");
    }

    #[test]
    fn test_render_rejects_residual_placeholder() {
        let err = render("user: {user}\npass: {password}\n", &vars([("user", "wiki")]))
            .unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnresolvedPlaceholder {
                name: "password".into()
            }
        );
    }

    #[test]
    fn test_render_ignores_unused_variables() {
        let out = render("plain text", &vars([("unused", "x")])).unwrap();
        assert_eq!(out, "plain text");
    }

    #[test]
    fn test_render_leaves_non_placeholder_braces() {
        // Uppercase or non-identifier braces are not placeholders
        let out = render("${HOME} {A} {1}", &vars([])).unwrap();
        assert_eq!(out, "${HOME} {A} {1}");
    }
}
