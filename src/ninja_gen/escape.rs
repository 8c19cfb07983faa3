//! Escaping of paths and values for Ninja syntax.
//!
//! Inputs are Ninja templates: a `$` starts a variable reference or an
//! escape and is passed through once validated. Plain characters that Ninja
//! would misread are escaped; characters it cannot represent at all are
//! rejected.

use crate::error::GraphError;
use crate::expand::{Token, tokenize};

/// Escape a path for a `build` line.
///
/// Spaces and colons become `$ ` and `$:`. `|`, newlines, carriage returns
/// and NUL cannot appear in a Ninja path and are rejected.
pub(crate) fn escape_path(path: &str) -> Result<String, GraphError> {
    if path.is_empty() {
        return Err(GraphError::serialization("an empty path", "paths must not be empty"));
    }
    let tokens = validate(path, || format!("path `{path}`"))?;
    let mut out = String::with_capacity(path.len());
    for (idx, token) in tokens.iter().copied().enumerate() {
        match token {
            Token::Literal(text) => {
                for c in text.chars() {
                    match c {
                        ' ' => out.push_str("$ "),
                        ':' => out.push_str("$:"),
                        '|' | '\n' | '\r' | '\0' => {
                            return Err(GraphError::serialization(
                                format!("path `{}`", path.escape_debug()),
                                format!("character {c:?} cannot be represented in a Ninja path"),
                            ));
                        }
                        other => out.push(other),
                    }
                }
            }
            Token::Escape(c) => {
                out.push('$');
                out.push(c);
            }
            Token::Var(name) => push_reference(&mut out, name, tokens.get(idx + 1)),
        }
    }
    Ok(out)
}

/// Escape the right-hand side of a `name = value` binding.
///
/// Leading spaces, which Ninja would strip, become `$ `. Newlines, carriage
/// returns and NUL are rejected.
pub(crate) fn escape_value(context: &str, value: &str) -> Result<String, GraphError> {
    let tokens = validate(value, || context.to_owned())?;
    let mut out = String::with_capacity(value.len());
    let mut leading = true;
    for (idx, token) in tokens.iter().copied().enumerate() {
        match token {
            Token::Literal(text) => {
                for c in text.chars() {
                    match c {
                        ' ' if leading => out.push_str("$ "),
                        '\n' | '\r' | '\0' => {
                            return Err(GraphError::serialization(
                                context.to_owned(),
                                format!("character {c:?} cannot be represented in a Ninja value"),
                            ));
                        }
                        other => {
                            leading = false;
                            out.push(other);
                        }
                    }
                }
            }
            Token::Escape(c) => {
                leading = false;
                out.push('$');
                out.push(c);
            }
            Token::Var(name) => {
                leading = false;
                push_reference(&mut out, name, tokens.get(idx + 1));
            }
        }
    }
    Ok(out)
}

/// Check that `name` is usable as a rule or variable name.
pub(crate) fn check_name(kind: &str, name: &str) -> Result<(), GraphError> {
    if crate::vars::is_valid_name(name) {
        Ok(())
    } else {
        Err(GraphError::serialization(
            format!("{kind} name `{}`", name.escape_debug()),
            "names may only contain ASCII letters, digits, `_`, `-` and `.`",
        ))
    }
}

fn validate<'a, F>(text: &'a str, context: F) -> Result<Vec<Token<'a>>, GraphError>
where
    F: FnOnce() -> String,
{
    tokenize(text).map_err(|err| GraphError::serialization(context(), err.to_string()))
}

/// Braces are kept only where the bare form would read differently: dotted
/// names, or a following literal that would extend the name.
fn push_reference(out: &mut String, name: &str, next: Option<&Token<'_>>) {
    let extends = matches!(
        next,
        Some(Token::Literal(text)) if text.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
    if extends || name.contains('.') {
        out.push_str("${");
        out.push_str(name);
        out.push('}');
    } else {
        out.push('$');
        out.push_str(name);
    }
}
