//! Resolved paths for whole-graph checks.
//!
//! The producer index kept by [`BuildGraph`] compares paths exactly as they
//! were written. Ninja compares them after expansion, so `$builddir/a.o` and
//! `build/a.o` are one file. A [`PathView`] holds every edge's paths after a
//! caller-supplied rewrite, with its own producer index over the results.

use std::collections::{HashMap, HashSet};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use super::{BuildGraph, EdgeId};
use crate::error::GraphError;

/// One edge's paths after resolution.
#[derive(Debug, Default)]
pub(super) struct ResolvedEdge {
    /// Explicit outputs first, then implicit ones.
    pub(super) outputs: Vec<Utf8PathBuf>,
    /// Explicit, implicit and order-only inputs.
    pub(super) inputs: Vec<Utf8PathBuf>,
}

#[derive(Debug, Default)]
pub(super) struct PathView {
    edges: Vec<ResolvedEdge>,
    producers: HashMap<Utf8PathBuf, EdgeId>,
}

impl PathView {
    /// Resolve every path of `graph` with `resolve`.
    ///
    /// # Errors
    ///
    /// Propagates errors from `resolve` and reports
    /// [`GraphError::DuplicateOutput`] when two outputs resolve to one path.
    pub(super) fn build<F>(graph: &BuildGraph, mut resolve: F) -> Result<Self, GraphError>
    where
        F: FnMut(&Utf8Path) -> Result<Utf8PathBuf, GraphError>,
    {
        let mut view = Self::default();
        let mut dups = Vec::new();
        for (id, edge) in graph.edges() {
            let mut resolved = ResolvedEdge::default();
            let mut own = HashSet::new();
            for output in edge.all_outputs() {
                let path = normalise(&resolve(output)?);
                if !own.insert(path.clone()) || view.producers.contains_key(&path) {
                    dups.push(path.to_string());
                    continue;
                }
                resolved.outputs.push(path);
            }
            for input in edge.all_inputs() {
                resolved.inputs.push(normalise(&resolve(input)?));
            }
            for output in &resolved.outputs {
                view.producers.insert(output.clone(), id);
            }
            view.edges.push(resolved);
        }
        if dups.is_empty() {
            Ok(view)
        } else {
            dups.sort();
            dups.dedup();
            Err(GraphError::DuplicateOutput { outputs: dups })
        }
    }

    pub(super) fn ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len()).map(EdgeId)
    }

    pub(super) fn edge(&self, id: EdgeId) -> Option<&ResolvedEdge> {
        self.edges.get(id.0)
    }

    pub(super) fn producer(&self, path: &Utf8Path) -> Option<EdgeId> {
        self.producers.get(path).copied()
    }
}

/// Drop `.` components so `./a.o` and `a.o` compare equal.
fn normalise(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|component| !matches!(component, Utf8Component::CurDir))
        .collect()
}
