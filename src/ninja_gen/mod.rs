//! Ninja file generator.
//!
//! This module converts the variable store, rule registry and build graph
//! into the textual representation expected by the Ninja build system.
//! Rules and edges are written in declaration order. Globals keep theirs too,
//! except that a global is moved after any global its value references: Ninja
//! expands top-level bindings as it reads them. Rendering the same description
//! twice produces byte-identical text.
//!
//! Every template is expanded before any text is produced: an unbound
//! variable, a malformed `$` sequence or an unrepresentable character aborts
//! rendering with no partial output.

mod escape;
mod file_io;
mod writer;

use std::collections::HashSet;

use camino::Utf8PathBuf;

use crate::error::GraphError;
use crate::expand::{Expander, Token, tokenize};
use crate::graph::{BuildEdge, BuildGraph};
use crate::rules::{PHONY, Rule, RuleRegistry};
use crate::vars::Bindings;

use escape::{check_name, escape_path, escape_value};
use writer::Writer;

pub use file_io::{WriteOutcome, write_atomic, write_stdout};

/// Line width used when none is configured, matching Ninja's own
/// `ninja_syntax` helper.
pub const DEFAULT_WIDTH: usize = 78;

macro_rules! write_kv {
    ($w:expr, $owner:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            let escaped = escape_value(&format!("`{}` of {}", $key, $owner), val)?;
            $w.binding($key, &escaped, 1);
        }
    };
}

/// Options controlling the rendered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Maximum line width before wrapping with `$` continuations; `None`
    /// disables wrapping.
    pub width: Option<usize>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            width: Some(DEFAULT_WIDTH),
        }
    }
}

/// Render a Ninja build file with the default options.
///
/// # Errors
///
/// See [`render_with`].
///
/// # Examples
///
/// ```
/// use ninjascribe::graph::{BuildEdge, BuildGraph};
/// use ninjascribe::ninja_gen::render;
/// use ninjascribe::rules::{Rule, RuleRegistry};
/// use ninjascribe::vars::Bindings;
///
/// let mut vars = Bindings::new();
/// vars.set("cc", "gcc");
/// let mut rules = RuleRegistry::new();
/// rules.register(Rule::new("cc", "$cc -c $in -o $out")).expect("rule");
/// let mut graph = BuildGraph::default();
/// graph
///     .add_edge(&rules, BuildEdge::new("cc").input("a.c").output("a.o"))
///     .expect("edge");
///
/// let ninja = render(&vars, &rules, &graph).expect("render");
/// assert_eq!(
///     ninja,
///     "cc = gcc\n\nrule cc\n  command = $cc -c $in -o $out\n\nbuild a.o: cc a.c\n\n"
/// );
/// ```
pub fn render(vars: &Bindings, rules: &RuleRegistry, graph: &BuildGraph) -> Result<String, GraphError> {
    render_with(vars, rules, graph, &GenerateOptions::default())
}

/// Render a Ninja build file.
///
/// # Errors
///
/// - [`GraphError::UnboundVariable`] when a template references a variable
///   bound in neither the edge nor the global scope;
/// - [`GraphError::RecursiveVariable`] when a variable expands to itself;
/// - [`GraphError::UnknownRule`] when an edge's rule is missing;
/// - [`GraphError::DuplicateOutput`] when two outputs name the same file once
///   their variables are expanded;
/// - [`GraphError::CyclicDependency`] for a dependency loop between expanded
///   paths;
/// - [`GraphError::Serialization`] for malformed `$` sequences, invalid
///   names, or characters Ninja cannot represent.
pub fn render_with(
    vars: &Bindings,
    rules: &RuleRegistry,
    graph: &BuildGraph,
    options: &GenerateOptions,
) -> Result<String, GraphError> {
    check_references(vars, rules, graph)?;

    let mut w = Writer::new(options.width.filter(|width| *width > 0));
    for (name, value) in global_order(vars)? {
        check_name("variable", name)?;
        let escaped = escape_value(&format!("variable `{name}`"), value)?;
        w.binding(name, &escaped, 0);
    }
    if !vars.is_empty() {
        w.blank();
    }
    for rule in rules.iter() {
        write_rule(&mut w, rule)?;
    }
    for (_, edge) in graph.edges() {
        write_edge(&mut w, edge)?;
    }
    tracing::debug!(
        variables = vars.len(),
        rules = rules.len(),
        edges = graph.len(),
        "rendered Ninja description"
    );
    Ok(w.finish())
}

/// Expand every template once, in the scope it will be evaluated in.
fn check_references(vars: &Bindings, rules: &RuleRegistry, graph: &BuildGraph) -> Result<(), GraphError> {
    let mut globals = Expander::global(vars);
    for (_, value) in vars.iter() {
        globals.expand_global(value)?;
    }
    check_paths(vars, graph)?;
    for (_, edge) in graph.edges() {
        for (_, value) in edge.variables.iter() {
            globals.expand_global(value)?;
        }
        if edge.rule == PHONY {
            continue;
        }
        let rule = rules.lookup(&edge.rule).map_err(|_| GraphError::UnknownRule {
            rule: edge.rule.clone(),
            referenced_by: Some(edge.label()),
        })?;
        let mut scoped = Expander::for_edge(vars, edge, Some(rule));
        for template in std::iter::once(&rule.command)
            .chain(rule.description.as_ref())
            .chain(rule.depfile.as_ref())
        {
            scoped.expand_edge(template)?;
        }
    }
    Ok(())
}

/// Check outputs and dependencies with every path expanded in file scope, the
/// way Ninja will see them.
pub(crate) fn check_paths(vars: &Bindings, graph: &BuildGraph) -> Result<(), GraphError> {
    let mut globals = Expander::global(vars);
    graph.check_resolved(|path| globals.expand_global(path.as_str()).map(Utf8PathBuf::from))
}

/// Globals in the order they must be written: each one after the globals its
/// value references, declaration order otherwise.
fn global_order(vars: &Bindings) -> Result<Vec<(&str, &str)>, GraphError> {
    let mut order = GlobalOrder {
        vars,
        placed: HashSet::new(),
        visiting: Vec::new(),
        ordered: Vec::with_capacity(vars.len()),
    };
    for (name, _) in vars.iter() {
        order.place(name)?;
    }
    Ok(order.ordered)
}

struct GlobalOrder<'a> {
    vars: &'a Bindings,
    placed: HashSet<&'a str>,
    visiting: Vec<&'a str>,
    ordered: Vec<(&'a str, &'a str)>,
}

impl<'a> GlobalOrder<'a> {
    fn place(&mut self, name: &'a str) -> Result<(), GraphError> {
        if self.placed.contains(name) {
            return Ok(());
        }
        let vars = self.vars;
        let Some(value) = vars.get(name) else {
            return Ok(());
        };
        if let Some(start) = self.visiting.iter().position(|n| *n == name) {
            let mut chain: Vec<String> = self
                .visiting
                .iter()
                .skip(start)
                .map(|n| (*n).to_owned())
                .collect();
            chain.push(name.to_owned());
            return Err(GraphError::RecursiveVariable {
                name: name.to_owned(),
                chain,
            });
        }
        let tokens = tokenize(value).map_err(|err| {
            GraphError::serialization(format!("variable `{name}`"), err.to_string())
        })?;
        self.visiting.push(name);
        for token in tokens {
            if let Token::Var(dep) = token {
                self.place(dep)?;
            }
        }
        self.visiting.pop();
        self.placed.insert(name);
        self.ordered.push((name, value));
        Ok(())
    }
}

fn write_rule(w: &mut Writer, rule: &Rule) -> Result<(), GraphError> {
    check_name("rule", &rule.name)?;
    let owner = format!("rule `{}`", rule.name);
    w.line(&format!("rule {}", rule.name), 0);
    write_kv!(w, owner, "command", Some(&rule.command));
    write_kv!(w, owner, "description", &rule.description);
    write_kv!(w, owner, "depfile", &rule.depfile);
    write_kv!(w, owner, "deps", rule.deps.and_then(|d| d.ninja_value()));
    w.blank();
    Ok(())
}

fn write_edge(w: &mut Writer, edge: &BuildEdge) -> Result<(), GraphError> {
    let mut line = String::from("build");
    push_paths(&mut line, "", &edge.explicit_outputs)?;
    push_paths(&mut line, " |", &edge.implicit_outputs)?;
    line.push_str(": ");
    line.push_str(&edge.rule);
    push_paths(&mut line, "", &edge.explicit_inputs)?;
    push_paths(&mut line, " |", &edge.implicit_inputs)?;
    push_paths(&mut line, " ||", &edge.order_only_inputs)?;
    w.line(&line, 0);

    let owner = format!("edge `{}`", edge.label());
    for (name, value) in edge.variables.iter() {
        check_name("variable", name)?;
        write_kv!(w, owner, name, Some(value));
    }
    w.blank();
    Ok(())
}

fn push_paths<'a, I>(line: &mut String, separator: &str, paths: I) -> Result<(), GraphError>
where
    I: IntoIterator<Item = &'a camino::Utf8PathBuf>,
{
    let mut iter = paths.into_iter().peekable();
    if iter.peek().is_none() {
        return Ok(());
    }
    line.push_str(separator);
    for path in iter {
        line.push(' ');
        line.push_str(&escape_path(path.as_str())?);
    }
    Ok(())
}
