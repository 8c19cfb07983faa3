//! Rule templates and their registry.
//!
//! A [`Rule`] is a named command template shared by any number of edges.
//! Unlike variables, rules are registered once: a second registration under
//! the same name is rejected.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::GraphError;

/// Built-in Ninja rule that edges may use without registering it.
pub const PHONY: &str = "phony";

/// Dependency-file syntax the executor parses after running a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepsFormat {
    /// No dependency information is recorded.
    None,
    /// Makefile-style depfile, re-read by Ninja on every run.
    Make,
    /// Compiler-style depfile, folded into Ninja's deps log.
    Gcc,
}

impl DepsFormat {
    /// Value for the Ninja `deps` key, if this format needs one.
    #[must_use]
    pub const fn ninja_value(self) -> Option<&'static str> {
        match self {
            Self::None | Self::Make => None,
            Self::Gcc => Some("gcc"),
        }
    }
}

/// A reusable command template.
///
/// `command` may reference `$in`, `$out` and any variable; references are
/// expanded lazily when the description is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Unique identifier referenced by edges.
    pub name: String,
    /// Command template.
    pub command: String,
    /// Optional human-friendly summary shown by Ninja while running.
    pub description: Option<String>,
    /// Path template of the dependency file written by the command.
    pub depfile: Option<String>,
    /// Syntax of `depfile`.
    pub deps: Option<DepsFormat>,
}

impl Rule {
    /// Create a rule with only a command.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
            depfile: None,
            deps: None,
        }
    }

    /// Attach a depfile and the syntax it uses.
    #[must_use]
    pub fn with_depfile(mut self, depfile: impl Into<String>, deps: DepsFormat) -> Self {
        self.depfile = Some(depfile.into());
        self.deps = Some(deps);
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Rules in registration order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RuleRegistry {
    rules: IndexMap<String, Rule>,
}

impl RuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateRule`] when the name is taken, including
    /// the built-in `phony`.
    pub fn register(&mut self, rule: Rule) -> Result<(), GraphError> {
        if rule.name == PHONY || self.rules.contains_key(&rule.name) {
            return Err(GraphError::DuplicateRule { rule: rule.name });
        }
        tracing::debug!(rule = %rule.name, "registered rule");
        self.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Fetch a registered rule.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownRule`] when no rule has that name.
    pub fn lookup(&self, name: &str) -> Result<&Rule, GraphError> {
        self.rules.get(name).ok_or_else(|| GraphError::UnknownRule {
            rule: name.to_owned(),
            referenced_by: None,
        })
    }

    /// Whether `name` can be used by an edge: registered, or `phony`.
    #[must_use]
    pub fn is_usable(&self, name: &str) -> bool {
        name == PHONY || self.rules.contains_key(name)
    }

    /// Iterate over rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
