//! The build graph.
//!
//! Edges are stored in insertion order alongside an index from every output
//! path to the edge producing it. The graph is a function from outputs to
//! edges: [`BuildGraph::add_edge`] refuses a second producer for any path and
//! leaves the graph untouched when it does.
//!
//! # Examples
//!
//! ```
//! use ninjascribe::graph::{BuildEdge, BuildGraph};
//! use ninjascribe::rules::{Rule, RuleRegistry};
//!
//! let mut rules = RuleRegistry::new();
//! rules.register(Rule::new("cc", "cc -c $in -o $out")).expect("register");
//! let mut graph = BuildGraph::default();
//! graph
//!     .add_edge(&rules, BuildEdge::new("cc").input("a.c").output("a.o"))
//!     .expect("add edge");
//! assert!(graph.add_edge(&rules, BuildEdge::new("cc").input("b.c").output("a.o")).is_err());
//! assert_eq!(graph.len(), 1);
//! ```

mod cycle;
mod edge;
mod view;

use std::collections::{HashMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::GraphError;
use crate::rules::RuleRegistry;

pub use edge::BuildEdge;
use view::PathView;

/// Position of an edge within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(usize);

impl EdgeId {
    /// Insertion index of the edge.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Edges in insertion order plus the output-to-producer index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildGraph {
    edges: Vec<BuildEdge>,
    #[serde(skip)]
    producers: HashMap<Utf8PathBuf, EdgeId>,
}

impl BuildGraph {
    /// Append `edge` to the graph.
    ///
    /// Variable references are not checked here; they are resolved when the
    /// graph is rendered.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownRule`] when the edge's rule is not registered;
    /// - [`GraphError::Serialization`] when the edge has no explicit output;
    /// - [`GraphError::DuplicateOutput`] when an output is already produced,
    ///   or listed twice by this edge;
    /// - [`GraphError::CyclicDependency`] when the edge consumes one of its
    ///   own outputs.
    ///
    /// On error the graph is unchanged.
    pub fn add_edge(&mut self, rules: &RuleRegistry, edge: BuildEdge) -> Result<EdgeId, GraphError> {
        if !rules.is_usable(&edge.rule) {
            let referenced_by = Some(edge.label());
            return Err(GraphError::UnknownRule {
                rule: edge.rule,
                referenced_by,
            });
        }
        if edge.explicit_outputs.is_empty() {
            return Err(GraphError::serialization(
                format!("edge using rule `{}`", edge.rule),
                "a build edge needs at least one explicit output",
            ));
        }
        if let Some(outputs) = self.duplicate_outputs(&edge) {
            return Err(GraphError::DuplicateOutput { outputs });
        }
        let own: HashSet<&Utf8PathBuf> = edge.all_outputs().collect();
        if let Some(looped) = edge.all_inputs().find(|input| own.contains(input)) {
            return Err(GraphError::CyclicDependency {
                cycle: vec![looped.clone(), looped.clone()],
            });
        }

        let id = EdgeId(self.edges.len());
        for output in edge.all_outputs() {
            self.producers.insert(output.clone(), id);
        }
        tracing::debug!(edge = %edge.label(), rule = %edge.rule, "added build edge");
        self.edges.push(edge);
        Ok(id)
    }

    fn duplicate_outputs(&self, edge: &BuildEdge) -> Option<Vec<String>> {
        let mut seen = HashSet::new();
        let mut dups: Vec<String> = edge
            .all_outputs()
            .filter(|out| !seen.insert(*out) || self.producers.contains_key(*out))
            .map(ToString::to_string)
            .collect();
        if dups.is_empty() {
            None
        } else {
            dups.sort();
            dups.dedup();
            Some(dups)
        }
    }

    /// Verify that no chain of edges depends on itself.
    ///
    /// All three input classes count as dependencies. Paths are compared as
    /// written, apart from `.` components.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicDependency`] listing one output per edge on
    /// the cycle, starting from the smallest path and closed by repeating it.
    pub fn check_cycles(&self) -> Result<(), GraphError> {
        self.check_resolved(|path| Ok(path.to_owned()))
    }

    /// Check outputs and dependencies after rewriting every path with
    /// `resolve`, typically expanding `$name` references against the final
    /// globals.
    ///
    /// Two spellings of one path, such as `$builddir/a.o` and `build/a.o`,
    /// name the same file once resolved.
    ///
    /// # Errors
    ///
    /// - whatever `resolve` returns;
    /// - [`GraphError::DuplicateOutput`] when two edges produce the same
    ///   resolved path;
    /// - [`GraphError::CyclicDependency`] for a loop between resolved paths.
    pub fn check_resolved<F>(&self, resolve: F) -> Result<(), GraphError>
    where
        F: FnMut(&Utf8Path) -> Result<Utf8PathBuf, GraphError>,
    {
        let view = PathView::build(self, resolve)?;
        match cycle::find_cycle(&view) {
            Some(cycle) => Err(GraphError::CyclicDependency { cycle }),
            None => Ok(()),
        }
    }

    /// The edge producing `path`, if any.
    #[must_use]
    pub fn producer(&self, path: &Utf8Path) -> Option<EdgeId> {
        self.producers.get(path).copied()
    }

    /// Fetch an edge by id.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&BuildEdge> {
        self.edges.get(id.0)
    }

    /// Iterate over edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &BuildEdge)> {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i), e))
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{PHONY, Rule};
    use rstest::{fixture, rstest};

    #[fixture]
    fn rules() -> RuleRegistry {
        let mut rules = RuleRegistry::new();
        rules
            .register(Rule::new("cc", "cc -c $in -o $out"))
            .expect("register cc");
        rules
    }

    #[rstest]
    fn unknown_rule_leaves_graph_unchanged(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        let err = graph
            .add_edge(&rules, BuildEdge::new("link").input("a.o").output("app"))
            .expect_err("unknown rule");
        assert!(matches!(
            err,
            GraphError::UnknownRule { ref rule, referenced_by: Some(ref edge) }
                if rule == "link" && edge == "app"
        ));
        assert!(graph.is_empty());
    }

    #[rstest]
    fn phony_needs_no_registration(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        graph
            .add_edge(&rules, BuildEdge::new(PHONY).input("a.o").output("all"))
            .expect("phony edge");
        assert_eq!(graph.len(), 1);
    }

    #[rstest]
    fn implicit_output_collision_is_duplicate(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        graph
            .add_edge(
                &rules,
                BuildEdge::new("cc").input("a.c").output("a.o").implicit_output("a.d"),
            )
            .expect("first");
        let err = graph
            .add_edge(&rules, BuildEdge::new("cc").input("b.c").output("a.d"))
            .expect_err("duplicate");
        match err {
            GraphError::DuplicateOutput { outputs } => assert_eq!(outputs, vec!["a.d"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.producer(Utf8Path::new("a.d")), Some(EdgeId(0)));
    }

    #[rstest]
    fn repeated_output_within_edge_is_duplicate(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        let err = graph
            .add_edge(
                &rules,
                BuildEdge::new("cc").input("a.c").output("a.o").implicit_output("a.o"),
            )
            .expect_err("duplicate");
        assert!(matches!(err, GraphError::DuplicateOutput { .. }));
        assert!(graph.producer(Utf8Path::new("a.o")).is_none());
    }

    #[rstest]
    fn self_referential_edge_is_rejected(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        let err = graph
            .add_edge(&rules, BuildEdge::new("cc").input("a.o").output("a.o"))
            .expect_err("self loop");
        match err {
            GraphError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec![Utf8PathBuf::from("a.o"), Utf8PathBuf::from("a.o")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(graph.is_empty());
    }

    #[rstest]
    fn edge_without_outputs_is_rejected(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        let err = graph
            .add_edge(&rules, BuildEdge::new("cc").input("a.c"))
            .expect_err("no outputs");
        assert!(matches!(err, GraphError::Serialization { .. }));
    }

    #[rstest]
    fn producers_cover_implicit_outputs(rules: RuleRegistry) {
        let mut graph = BuildGraph::default();
        let id = graph
            .add_edge(
                &rules,
                BuildEdge::new("cc").input("a.c").output("a.o").implicit_output("gen/"),
            )
            .expect("edge");
        assert_eq!(graph.producer(Utf8Path::new("gen/")), Some(id));
        assert_eq!(graph.edge(id).map(BuildEdge::label).as_deref(), Some("a.o"));
    }
}
