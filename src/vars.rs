//! Variable bindings.
//!
//! [`Bindings`] backs both the global variable store and the per-edge
//! overrides. Declaration order is preserved so the serializer can emit
//! bindings in the order they were first set.
//!
//! # Examples
//!
//! ```
//! use ninjascribe::vars::Bindings;
//! use ninjascribe::Scope;
//!
//! let mut globals = Bindings::new();
//! globals.set("cxxflags", "-O0");
//! let mut edge = Bindings::new();
//! edge.set("cxxflags", "-O3");
//!
//! let scope = Scope::Edge("a.o".into());
//! assert_eq!(globals.resolve("cxxflags", &edge, &scope).ok(), Some("-O3"));
//! assert_eq!(globals.resolve("cxxflags", &Bindings::new(), &scope).ok(), Some("-O0"));
//! ```

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{GraphError, Scope};

/// Ordered name/value bindings.
///
/// Setting an existing name replaces its value but keeps its original
/// position. Later writes win; redefinition is never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bindings {
    values: IndexMap<String, String>,
}

impl Bindings {
    /// Create an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, returning the previous value if any.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = name.into();
        let previous = self.values.insert(key.clone(), value.into());
        if previous.is_some() {
            tracing::debug!(variable = %key, "rebinding variable");
        }
        previous
    }

    /// Look up a binding without any fallback.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Resolve `name`, preferring `overrides` over these bindings.
    ///
    /// The returned value is raw: any `$` references it contains are left for
    /// the caller to expand.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnboundVariable`] naming `scope` when neither set
    /// of bindings contains `name`.
    pub fn resolve<'a>(
        &'a self,
        name: &str,
        overrides: &'a Self,
        scope: &Scope,
    ) -> Result<&'a str, GraphError> {
        overrides
            .get(name)
            .or_else(|| self.get(name))
            .ok_or_else(|| GraphError::UnboundVariable {
                name: name.to_owned(),
                scope: scope.clone(),
            })
    }

    /// Whether `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no bindings exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Bindings
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (name, value) in iter {
            bindings.set(name, value);
        }
        bindings
    }
}

/// Whether `name` is usable as a Ninja variable or rule name.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn last_write_wins_and_keeps_position() {
        let mut vars = Bindings::new();
        vars.set("a", "1");
        vars.set("b", "2");
        assert_eq!(vars.set("a", "3").as_deref(), Some("1"));
        let pairs: Vec<_> = vars.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn resolve_reports_scope_when_unbound() {
        let vars = Bindings::new();
        let err = vars
            .resolve("missing", &Bindings::new(), &Scope::Global)
            .expect_err("unbound");
        match err {
            GraphError::UnboundVariable { name, scope } => {
                assert_eq!(name, "missing");
                assert_eq!(scope, Scope::Global);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn overrides_do_not_leak_between_edges() {
        let globals: Bindings = [("cxxflags", "-O0")].into_iter().collect();
        let tuned: Bindings = [("cxxflags", "-O3")].into_iter().collect();
        let plain = Bindings::new();
        let scope = Scope::Edge("e".into());
        assert_eq!(globals.resolve("cxxflags", &tuned, &scope).ok(), Some("-O3"));
        assert_eq!(globals.resolve("cxxflags", &plain, &scope).ok(), Some("-O0"));
    }

    #[rstest]
    #[case("cxxflags", true)]
    #[case("out.d", true)]
    #[case("with-dash_1", true)]
    #[case("", false)]
    #[case("has space", false)]
    #[case("a:b", false)]
    fn validates_names(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_valid_name(name), expected);
    }
}
