//! Error types raised while building or rendering a build description.
//!
//! Every variant is a construction- or render-time failure. None are retried;
//! each carries the rule, edge, variable, or cycle it concerns so the message
//! alone is enough to locate the mistake.

use std::fmt::{self, Display, Formatter};

use camino::Utf8PathBuf;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

/// Lookup context used when reporting unbound variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// File-level bindings only.
    Global,
    /// The bindings visible while expanding one edge, named by its first
    /// explicit output.
    Edge(String),
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global scope"),
            Self::Edge(label) => write!(f, "edge `{label}`"),
        }
    }
}

/// Errors raised by the variable store, rule registry, build graph and
/// serializer.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A rule name was looked up but never registered.
    #[error("{}", unknown_rule_message(.rule, .referenced_by.as_deref()))]
    #[diagnostic(
        code(ninjascribe::graph::unknown_rule),
        help("register the rule before adding edges that use it")
    )]
    UnknownRule {
        /// Name of the missing rule.
        rule: String,
        /// Label of the edge that referenced the rule, when known.
        referenced_by: Option<String>,
    },

    /// A rule with the same name has already been registered.
    #[error("rule `{rule}` is already registered")]
    #[diagnostic(code(ninjascribe::rules::duplicate_rule))]
    DuplicateRule {
        /// Name that was registered twice.
        rule: String,
    },

    /// One or more outputs are already produced by another edge.
    #[error("outputs already produced by another edge: {}", .outputs.iter().join(", "))]
    #[diagnostic(
        code(ninjascribe::graph::duplicate_output),
        help("every output path must be produced by exactly one edge")
    )]
    DuplicateOutput {
        /// Clashing output paths, sorted.
        outputs: Vec<String>,
    },

    /// A template referenced a variable bound in neither the edge nor the
    /// global scope.
    #[error("variable `{name}` is not bound in {scope}")]
    #[diagnostic(code(ninjascribe::vars::unbound_variable))]
    UnboundVariable {
        /// Referenced variable name.
        name: String,
        /// Scope in which the lookup failed.
        scope: Scope,
    },

    /// Expanding a variable eventually required expanding itself.
    #[error("variable `{name}` refers to itself: {}", .chain.iter().join(" -> "))]
    #[diagnostic(code(ninjascribe::vars::recursive_variable))]
    RecursiveVariable {
        /// Variable at which the loop was detected.
        name: String,
        /// Expansion chain leading back to `name`.
        chain: Vec<String>,
    },

    /// Edges depend on each other in a loop.
    #[error("circular dependency: {}", .cycle.iter().join(" -> "))]
    #[diagnostic(code(ninjascribe::graph::cyclic_dependency))]
    CyclicDependency {
        /// One output per participating edge, closed by repeating the first.
        cycle: Vec<Utf8PathBuf>,
    },

    /// An edge id did not come from this description.
    #[error("no edge #{index} in this build description")]
    #[diagnostic(
        code(ninjascribe::graph::unknown_edge),
        help("edge ids are only valid for the description that returned them")
    )]
    UnknownEdge {
        /// Insertion index carried by the id.
        index: usize,
    },

    /// The description cannot be written in Ninja syntax, or writing it
    /// failed.
    #[error("cannot serialise {context}: {reason}")]
    #[diagnostic(code(ninjascribe::ninja_gen::serialization))]
    Serialization {
        /// What was being serialised (a path, a binding, a file).
        context: String,
        /// Why it failed.
        reason: String,
        /// Underlying I/O failure, if any.
        #[source]
        source: Option<std::io::Error>,
    },
}

impl GraphError {
    pub(crate) fn serialization(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialization {
            context: context.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }
}

fn unknown_rule_message(rule: &str, referenced_by: Option<&str>) -> String {
    referenced_by.map_or_else(
        || format!("rule `{rule}` is not registered"),
        |edge| format!("rule `{rule}` referenced by edge `{edge}` is not registered"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "rule `cc` is not registered")]
    #[case(Some("a.o"), "rule `cc` referenced by edge `a.o` is not registered")]
    fn unknown_rule_names_the_edge(#[case] edge: Option<&str>, #[case] expected: &str) {
        let err = GraphError::UnknownRule {
            rule: "cc".into(),
            referenced_by: edge.map(str::to_owned),
        };
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn cycle_message_lists_path() {
        let err = GraphError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "circular dependency: a -> b -> a");
    }

    #[test]
    fn unbound_variable_mentions_scope() {
        let err = GraphError::UnboundVariable {
            name: "cxx".into(),
            scope: Scope::Edge("a.o".into()),
        };
        assert_eq!(err.to_string(), "variable `cxx` is not bound in edge `a.o`");
    }
}
