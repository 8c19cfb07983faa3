//! Caller-owned build description.
//!
//! A [`Description`] bundles the variable store, rule registry and build
//! graph for one generation run: construct it, populate it, render it, then
//! drop it.
//!
//! # Examples
//!
//! ```
//! use ninjascribe::{BuildEdge, Description, Rule};
//!
//! let mut ninja = Description::new();
//! ninja.variable("cxxflags", "-O0");
//! ninja.rule(Rule::new("cxx", "g++ $cxxflags -c $in -o $out")).expect("rule");
//! let fast = ninja
//!     .build(BuildEdge::new("cxx").input("a.cpp").output("a.o").variable("cxxflags", "-O3"))
//!     .expect("edge");
//! let plain = ninja.build(BuildEdge::new("cxx").input("b.cpp").output("b.o")).expect("edge");
//!
//! assert_eq!(ninja.resolve(fast, "cxxflags").expect("bound"), "-O3");
//! assert_eq!(ninja.resolve(plain, "cxxflags").expect("bound"), "-O0");
//! assert_eq!(ninja.command(fast).expect("command"), "g++ -O3 -c a.cpp -o a.o");
//! ```

use camino::Utf8Path;
use serde::Serialize;

use crate::error::{GraphError, Scope};
use crate::expand::Expander;
use crate::graph::{BuildEdge, BuildGraph, EdgeId};
use crate::ninja_gen::{self, GenerateOptions, WriteOutcome};
use crate::rules::{PHONY, Rule, RuleRegistry};
use crate::vars::Bindings;

/// Variables, rules and edges of one build description.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Description {
    variables: Bindings,
    rules: RuleRegistry,
    graph: BuildGraph,
}

impl Description {
    /// Create an empty description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a global variable; later bindings replace earlier ones.
    pub fn variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.set(name, value);
    }

    /// Register a rule.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateRule`] if the name is taken.
    pub fn rule(&mut self, rule: Rule) -> Result<(), GraphError> {
        self.rules.register(rule)
    }

    /// Add a build edge.
    ///
    /// # Errors
    ///
    /// See [`BuildGraph::add_edge`].
    pub fn build(&mut self, edge: BuildEdge) -> Result<EdgeId, GraphError> {
        self.graph.add_edge(&self.rules, edge)
    }

    /// Resolve `name` as seen by edge `id`, without expanding the value.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnboundVariable`] when the name is bound neither
    /// on the edge nor globally, and [`GraphError::UnknownEdge`] when `id`
    /// belongs to another description.
    pub fn resolve(&self, id: EdgeId, name: &str) -> Result<&str, GraphError> {
        let edge = self.edge_by_id(id)?;
        self.variables
            .resolve(name, &edge.variables, &Scope::Edge(edge.label()))
    }

    /// Fully expanded command line of edge `id`.
    ///
    /// Phony edges have an empty command.
    ///
    /// # Errors
    ///
    /// Returns the same expansion errors rendering would, or
    /// [`GraphError::UnknownEdge`] for an id from another description.
    pub fn command(&self, id: EdgeId) -> Result<String, GraphError> {
        let edge = self.edge_by_id(id)?;
        if edge.rule == PHONY {
            return Ok(String::new());
        }
        let rule = self.rules.lookup(&edge.rule)?;
        Expander::for_edge(&self.variables, edge, Some(rule)).expand_edge(&rule.command)
    }

    fn edge_by_id(&self, id: EdgeId) -> Result<&BuildEdge, GraphError> {
        self.graph
            .edge(id)
            .ok_or(GraphError::UnknownEdge { index: id.index() })
    }

    /// Check the graph for dependency cycles and duplicate outputs, comparing
    /// paths after their variables are expanded against the globals.
    ///
    /// # Errors
    ///
    /// - [`GraphError::CyclicDependency`] or [`GraphError::DuplicateOutput`]
    ///   as described for [`BuildGraph::check_resolved`];
    /// - [`GraphError::UnboundVariable`] when a path references an unbound
    ///   global.
    pub fn check_cycles(&self) -> Result<(), GraphError> {
        ninja_gen::check_paths(&self.variables, &self.graph)
    }

    /// Render the description as Ninja text.
    ///
    /// # Errors
    ///
    /// See [`ninja_gen::render_with`].
    pub fn render(&self, options: &GenerateOptions) -> Result<String, GraphError> {
        ninja_gen::render_with(&self.variables, &self.rules, &self.graph, options)
    }

    /// Check for cycles, render, and atomically write the result to `path`.
    ///
    /// Nothing is written unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first cycle, expansion, serialisation or I/O error.
    pub fn write(&self, path: &Utf8Path, options: &GenerateOptions) -> Result<WriteOutcome, GraphError> {
        self.check_cycles()?;
        let text = self.render(options)?;
        ninja_gen::write_atomic(path, &text)
    }

    /// Global variables.
    #[must_use]
    pub const fn variables(&self) -> &Bindings {
        &self.variables
    }

    /// Registered rules.
    #[must_use]
    pub const fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// The build graph.
    #[must_use]
    pub const fn graph(&self) -> &BuildGraph {
        &self.graph
    }
}
