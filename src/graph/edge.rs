//! Build edges and their dependency classes.

use camino::Utf8PathBuf;
use indexmap::IndexSet;
use serde::Serialize;

use crate::vars::Bindings;

/// One unit of work: a rule applied to classified inputs, producing
/// classified outputs.
///
/// Explicit inputs and outputs keep their order because they are substituted
/// into `$in` and `$out`. The remaining classes are insertion-ordered sets.
///
/// # Examples
///
/// ```
/// use ninjascribe::graph::BuildEdge;
///
/// let edge = BuildEdge::new("cxx")
///     .input("src/a.cpp")
///     .output("obj/a.o")
///     .order_only("gen/data.h")
///     .variable("cxxflags", "-O3");
/// assert_eq!(edge.label(), "obj/a.o");
/// assert_eq!(edge.all_inputs().count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEdge {
    /// Name of the rule that performs the work.
    pub rule: String,
    /// Inputs substituted into `$in`, in order.
    pub explicit_inputs: Vec<Utf8PathBuf>,
    /// Inputs that must be current before the edge runs but are not part of
    /// `$in`.
    pub implicit_inputs: IndexSet<Utf8PathBuf>,
    /// Inputs that must exist first but whose changes never force a rebuild.
    pub order_only_inputs: IndexSet<Utf8PathBuf>,
    /// Outputs substituted into `$out`, in order.
    pub explicit_outputs: Vec<Utf8PathBuf>,
    /// Side-effect outputs that other edges may depend on.
    pub implicit_outputs: IndexSet<Utf8PathBuf>,
    /// Bindings that shadow globals while this edge is expanded.
    pub variables: Bindings,
}

impl BuildEdge {
    /// Start an edge that runs `rule`.
    #[must_use]
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            explicit_inputs: Vec::new(),
            implicit_inputs: IndexSet::new(),
            order_only_inputs: IndexSet::new(),
            explicit_outputs: Vec::new(),
            implicit_outputs: IndexSet::new(),
            variables: Bindings::new(),
        }
    }

    /// Append an explicit output.
    #[must_use]
    pub fn output(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.explicit_outputs.push(path.into());
        self
    }

    /// Append several explicit outputs.
    #[must_use]
    pub fn outputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.explicit_outputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add an implicit output.
    #[must_use]
    pub fn implicit_output(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.implicit_outputs.insert(path.into());
        self
    }

    /// Append an explicit input.
    #[must_use]
    pub fn input(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.explicit_inputs.push(path.into());
        self
    }

    /// Append several explicit inputs.
    #[must_use]
    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.explicit_inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add an implicit input.
    #[must_use]
    pub fn implicit(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.implicit_inputs.insert(path.into());
        self
    }

    /// Add an order-only input.
    #[must_use]
    pub fn order_only(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.order_only_inputs.insert(path.into());
        self
    }

    /// Bind an edge-local variable.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.set(name, value);
        self
    }

    /// Name used in diagnostics: the first explicit output.
    #[must_use]
    pub fn label(&self) -> String {
        self.explicit_outputs
            .first()
            .map_or_else(|| String::from("<no outputs>"), ToString::to_string)
    }

    /// Explicit then implicit outputs.
    pub fn all_outputs(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.explicit_outputs.iter().chain(&self.implicit_outputs)
    }

    /// Explicit, implicit, then order-only inputs.
    pub fn all_inputs(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.explicit_inputs
            .iter()
            .chain(&self.implicit_inputs)
            .chain(&self.order_only_inputs)
    }
}
