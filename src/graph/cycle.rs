//! Cycle detection over edges.
//!
//! Each edge depends on the producers of its explicit, implicit and
//! order-only inputs. Inputs without a producer are source files.

use std::collections::HashMap;

use camino::Utf8PathBuf;

use super::EdgeId;
use super::view::PathView;

/// Tracks the visitation state of an edge during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Return the first cycle found, as one output path per edge.
pub(super) fn find_cycle(view: &PathView) -> Option<Vec<Utf8PathBuf>> {
    let mut detector = CycleDetector::new(view);
    for id in view.ids() {
        if detector.is_visited(id) {
            continue;
        }
        if let Some(found) = detector.visit(id) {
            return Some(found);
        }
    }
    tracing::debug!(sources = detector.sources, "cycle check passed");
    None
}

struct CycleDetector<'a> {
    view: &'a PathView,
    stack: Vec<EdgeId>,
    states: HashMap<EdgeId, VisitState>,
    sources: usize,
}

impl<'a> CycleDetector<'a> {
    fn new(view: &'a PathView) -> Self {
        Self {
            view,
            stack: Vec::new(),
            states: HashMap::new(),
            sources: 0,
        }
    }

    fn is_visited(&self, id: EdgeId) -> bool {
        matches!(self.states.get(&id), Some(VisitState::Visited))
    }

    fn visit(&mut self, id: EdgeId) -> Option<Vec<Utf8PathBuf>> {
        match self.states.get(&id) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self
                    .stack
                    .iter()
                    .position(|n| *n == id)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting edge must be on the stack");
                        0
                    });
                let mut cycle: Vec<Utf8PathBuf> = self
                    .stack
                    .iter()
                    .skip(idx)
                    .filter_map(|e| self.primary_output(*e))
                    .collect();
                if let Some(first) = self.primary_output(id) {
                    cycle.push(first);
                }
                return Some(canonicalize_cycle(cycle));
            }
            None => {
                self.states.insert(id, VisitState::Visiting);
            }
        }

        self.stack.push(id);

        let view = self.view;
        if let Some(edge) = view.edge(id) {
            for input in &edge.inputs {
                let Some(dep) = view.producer(input) else {
                    self.sources += 1;
                    continue;
                };
                if let Some(cycle) = self.visit(dep) {
                    return Some(cycle);
                }
            }
        }

        self.stack.pop();
        self.states.insert(id, VisitState::Visited);
        None
    }

    fn primary_output(&self, id: EdgeId) -> Option<Utf8PathBuf> {
        self.view
            .edge(id)
            .and_then(|e| e.outputs.first().cloned())
    }
}

/// Rotate a closed cycle so it starts at its smallest path.
fn canonicalize_cycle(mut cycle: Vec<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}
