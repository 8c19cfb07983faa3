//! Template scanning and lazy variable expansion.
//!
//! Templates use Ninja's `$` syntax: `$name` and `${name}` reference
//! variables, while `$$`, `$ ` and `$:` stand for a literal dollar, space and
//! colon. [`tokenize`] checks the syntax; [`expand`] substitutes references
//! through a lookup callback. The crate-internal [`Expander`] supplies that
//! callback for the global scope and for one edge at a time, evaluating
//! variable values only when they are needed.

use camino::Utf8PathBuf;

use crate::error::{GraphError, Scope};
use crate::graph::BuildEdge;
use crate::rules::Rule;
use crate::vars::{Bindings, is_valid_name};

/// One lexical piece of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text copied verbatim.
    Literal(&'a str),
    /// An escaped character (`$$`, `$ ` or `$:`), holding the character.
    Escape(char),
    /// A variable reference, holding its name.
    Var(&'a str),
}

/// A malformed `$` sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} at byte {position}")]
pub struct TemplateError {
    /// Byte offset of the offending `$`.
    pub position: usize,
    /// What was wrong.
    pub reason: &'static str,
}

const fn is_simple_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Split `template` into literals, escapes and variable references.
///
/// # Errors
///
/// Returns [`TemplateError`] for a trailing `$`, an unterminated or invalid
/// `${...}`, or a `$` followed by a character that starts neither an escape
/// nor a name.
///
/// # Examples
///
/// ```
/// use ninjascribe::expand::{Token, tokenize};
///
/// let tokens = tokenize("$cxx $$HOME ${out}.d").expect("valid");
/// assert_eq!(
///     tokens,
///     vec![
///         Token::Var("cxx"),
///         Token::Literal(" "),
///         Token::Escape('$'),
///         Token::Literal("HOME "),
///         Token::Var("out"),
///         Token::Literal(".d"),
///     ]
/// );
/// ```
pub fn tokenize(template: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        let (literal, tail) = rest.split_at(pos);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        let position = template.len() - tail.len();
        let after = tail.get(1..).unwrap_or_default();
        let mut chars = after.chars();
        rest = match chars.next() {
            Some(c @ ('$' | ' ' | ':')) => {
                tokens.push(Token::Escape(c));
                chars.as_str()
            }
            Some('{') => {
                let body = chars.as_str();
                let end = body.find('}').ok_or(TemplateError {
                    position,
                    reason: "unterminated `${`",
                })?;
                let (name, closing) = body.split_at(end);
                if !is_valid_name(name) {
                    return Err(TemplateError {
                        position,
                        reason: "invalid variable name inside `${}`",
                    });
                }
                tokens.push(Token::Var(name));
                closing.get(1..).unwrap_or_default()
            }
            Some(c) if is_simple_name_char(c) => {
                let len = after
                    .find(|ch: char| !is_simple_name_char(ch))
                    .unwrap_or(after.len());
                let (name, remainder) = after.split_at(len);
                tokens.push(Token::Var(name));
                remainder
            }
            Some(_) => {
                return Err(TemplateError {
                    position,
                    reason: "`$` must start an escape (`$$`, `$ `, `$:`) or a variable reference",
                });
            }
            None => {
                return Err(TemplateError {
                    position,
                    reason: "dangling `$` at end of text",
                });
            }
        };
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }
    Ok(tokens)
}

/// Expand `template`, resolving each variable reference through `lookup`.
///
/// Escapes are replaced by the character they stand for.
///
/// # Errors
///
/// Returns [`GraphError::Serialization`] for malformed `$` syntax, or
/// whatever `lookup` returns.
///
/// # Examples
///
/// ```
/// use ninjascribe::expand::expand;
///
/// let text = expand("$cc -c $in", |name| Ok(format!("<{name}>"))).expect("expand");
/// assert_eq!(text, "<cc> -c <in>");
/// ```
pub fn expand<F>(template: &str, mut lookup: F) -> Result<String, GraphError>
where
    F: FnMut(&str) -> Result<String, GraphError>,
{
    let tokens = tokenize(template).map_err(|err| {
        GraphError::serialization(format!("template `{template}`"), err.to_string())
    })?;
    let mut out = String::with_capacity(template.len());
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Escape(c) => out.push(c),
            Token::Var(name) => out.push_str(&lookup(name)?),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Global,
    Edge,
    Rule,
}

/// Expands templates against the global bindings and, optionally, one edge.
pub(crate) struct Expander<'a> {
    globals: &'a Bindings,
    edge: Option<(&'a BuildEdge, Option<&'a Rule>)>,
    scope: Scope,
    stack: Vec<(Layer, String)>,
}

impl<'a> Expander<'a> {
    pub(crate) const fn global(globals: &'a Bindings) -> Self {
        Self {
            globals,
            edge: None,
            scope: Scope::Global,
            stack: Vec::new(),
        }
    }

    /// `rule` is `None` for `phony` edges.
    pub(crate) fn for_edge(globals: &'a Bindings, edge: &'a BuildEdge, rule: Option<&'a Rule>) -> Self {
        Self {
            globals,
            edge: Some((edge, rule)),
            scope: Scope::Edge(edge.label()),
            stack: Vec::new(),
        }
    }

    /// Expand in file scope: only global bindings are visible.
    pub(crate) fn expand_global(&mut self, template: &str) -> Result<String, GraphError> {
        expand(template, |name| self.global_var(name))
    }

    /// Expand in edge scope: `$in`, `$out`, edge bindings, rule bindings and
    /// globals, in that order.
    pub(crate) fn expand_edge(&mut self, template: &str) -> Result<String, GraphError> {
        expand(template, |name| self.edge_var(name))
    }

    fn global_var(&mut self, name: &str) -> Result<String, GraphError> {
        let globals = self.globals;
        let value = globals.get(name).ok_or_else(|| GraphError::UnboundVariable {
            name: name.to_owned(),
            scope: Scope::Global,
        })?;
        self.nested(Layer::Global, name, |this| this.expand_global(value))
    }

    fn edge_var(&mut self, name: &str) -> Result<String, GraphError> {
        let Some((edge, rule)) = self.edge else {
            return self.global_var(name);
        };
        match name {
            "in" => self.join_paths(&edge.explicit_inputs, " "),
            "in_newline" => self.join_paths(&edge.explicit_inputs, "\n"),
            "out" => self.join_paths(&edge.explicit_outputs, " "),
            _ => {
                if let Some(value) = edge.variables.get(name) {
                    // Edge bindings see the file scope, so `x = $x -O3` extends the global `x`.
                    return self.nested(Layer::Edge, name, |this| this.expand_global(value));
                }
                if let Some(template) = rule.and_then(|r| rule_binding(r, name)) {
                    return self.nested(Layer::Rule, name, |this| this.expand_edge(template));
                }
                if self.globals.contains(name) {
                    return self.global_var(name);
                }
                Err(GraphError::UnboundVariable {
                    name: name.to_owned(),
                    scope: self.scope.clone(),
                })
            }
        }
    }

    fn join_paths(&mut self, paths: &[Utf8PathBuf], separator: &str) -> Result<String, GraphError> {
        let expanded = paths
            .iter()
            .map(|p| self.expand_global(p.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(expanded.join(separator))
    }

    fn nested<F>(&mut self, layer: Layer, name: &str, f: F) -> Result<String, GraphError>
    where
        F: FnOnce(&mut Self) -> Result<String, GraphError>,
    {
        if let Some(start) = self
            .stack
            .iter()
            .position(|(l, n)| *l == layer && n == name)
        {
            let mut chain: Vec<String> = self
                .stack
                .iter()
                .skip(start)
                .map(|(_, n)| n.clone())
                .collect();
            chain.push(name.to_owned());
            return Err(GraphError::RecursiveVariable {
                name: name.to_owned(),
                chain,
            });
        }
        self.stack.push((layer, name.to_owned()));
        let result = f(self);
        self.stack.pop();
        result
    }
}

fn rule_binding<'r>(rule: &'r Rule, name: &str) -> Option<&'r str> {
    match name {
        "command" => Some(rule.command.as_str()),
        "depfile" => rule.depfile.as_deref(),
        "description" => rule.description.as_deref(),
        _ => None,
    }
}
