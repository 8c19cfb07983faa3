//! Ninja build description generator.
//!
//! This library builds an in-memory dependency graph of variables, rules and
//! build edges, checks it, and serialises it into a `build.ninja` file for
//! the Ninja executor. The [`project`] module describes the C++ project this
//! tool ships with; the rest is general purpose.

pub mod cli;
pub mod description;
pub mod error;
pub mod expand;
pub mod graph;
pub mod ninja_gen;
pub mod paths;
pub mod project;
pub mod rules;
pub mod runner;
pub mod vars;

pub use description::Description;
pub use error::{GraphError, Scope};
pub use graph::{BuildEdge, BuildGraph, EdgeId};
pub use rules::{DepsFormat, Rule, RuleRegistry};
pub use vars::Bindings;
