//! Shared helpers for integration tests.
//!
//! Provides a small reader for the subset of Ninja syntax the generator
//! emits, so tests can assert on structure rather than on exact layout.

#![allow(
    dead_code,
    reason = "each test crate uses a different subset of the helpers"
)]

use anyhow::{Context, Result, bail, ensure};
use camino::Utf8PathBuf;

/// One `build` statement read back from generated text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedEdge {
    /// Explicit outputs.
    pub outputs: Vec<String>,
    /// Outputs after `|`.
    pub implicit_outputs: Vec<String>,
    /// Rule name.
    pub rule: String,
    /// Explicit inputs.
    pub inputs: Vec<String>,
    /// Inputs after `|`.
    pub implicit: Vec<String>,
    /// Inputs after `||`.
    pub order_only: Vec<String>,
    /// Indented bindings in file order.
    pub bindings: Vec<(String, String)>,
}

impl ParsedEdge {
    /// Value of the edge-level binding `name`.
    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Join `$`-continued lines into logical lines.
pub fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;
    for raw in text.lines() {
        let piece = match pending.take() {
            Some(mut head) => {
                head.push_str(raw.trim_start());
                head
            }
            None => raw.to_owned(),
        };
        let trailing = piece.chars().rev().take_while(|&c| c == '$').count();
        if trailing.rem_euclid(2) == 1 {
            let mut head = piece;
            head.pop();
            pending = Some(head);
        } else {
            lines.push(piece);
        }
    }
    if let Some(rest) = pending {
        lines.push(rest);
    }
    lines
}

/// Split a `build` line into words, unescaping `$ `, `$:` and `$$`.
/// Unescaped colons become their own word.
fn words(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => match chars.peek().copied() {
                Some(' ') => {
                    current.push(' ');
                    chars.next();
                }
                Some(':') => {
                    current.push(':');
                    chars.next();
                }
                Some('$') => {
                    current.push('$');
                    chars.next();
                }
                _ => current.push('$'),
            },
            ' ' => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            ':' => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                out.push(String::from(":"));
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn parse_build(line: &str) -> Result<ParsedEdge> {
    let mut edge = ParsedEdge::default();
    let mut iter = words(line).into_iter();
    ensure!(iter.next().as_deref() == Some("build"), "not a build line: {line}");

    let mut implicit = false;
    loop {
        let word = iter.next().with_context(|| format!("missing `:` in {line}"))?;
        match word.as_str() {
            ":" => break,
            "|" => implicit = true,
            _ if implicit => edge.implicit_outputs.push(word),
            _ => edge.outputs.push(word),
        }
    }
    edge.rule = iter.next().with_context(|| format!("missing rule in {line}"))?;

    let mut class = 0;
    for word in iter {
        match (word.as_str(), class) {
            ("|", 0) => class = 1,
            ("||", 0 | 1) => class = 2,
            ("|" | "||", _) => bail!("misplaced separator in {line}"),
            (_, 0) => edge.inputs.push(word),
            (_, 1) => edge.implicit.push(word),
            _ => edge.order_only.push(word),
        }
    }
    Ok(edge)
}

/// Read every `build` statement in `text`, with its indented bindings.
pub fn parse_edges(text: &str) -> Result<Vec<ParsedEdge>> {
    let mut edges: Vec<ParsedEdge> = Vec::new();
    let mut in_edge = false;
    for line in logical_lines(text) {
        if line.starts_with("build ") {
            edges.push(parse_build(&line)?);
            in_edge = true;
        } else if let Some(binding) = line.strip_prefix("  ").filter(|_| in_edge) {
            let (key, value) = binding
                .split_once(" = ")
                .with_context(|| format!("malformed binding: {line}"))?;
            if let Some(edge) = edges.last_mut() {
                edge.bindings.push((key.to_owned(), value.to_owned()));
            }
        } else {
            in_edge = false;
        }
    }
    Ok(edges)
}

/// Top-level `name = value` bindings in file order.
pub fn parse_globals(text: &str) -> Vec<(String, String)> {
    logical_lines(text)
        .into_iter()
        .take_while(|line| !line.starts_with("rule ") && !line.starts_with("build "))
        .filter_map(|line| {
            line.split_once(" = ")
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Names of the `rule` blocks in file order.
pub fn parse_rule_names(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("rule "))
        .map(str::to_owned)
        .collect()
}

/// Create a temporary directory with a UTF-8 path.
pub fn utf8_tempdir() -> Result<(tempfile::TempDir, Utf8PathBuf)> {
    let temp = tempfile::tempdir().context("create temp dir")?;
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .map_err(|p| anyhow::anyhow!("temp dir {} is not UTF-8", p.display()))?;
    Ok((temp, path))
}

/// Create `files` (relative paths) under `root`, with empty contents.
pub fn touch_all(root: &camino::Utf8Path, files: &[&str]) -> Result<()> {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        std::fs::write(&path, "").with_context(|| format!("write {path}"))?;
    }
    Ok(())
}

/// Write an executable shell script at `path`.
pub fn write_script(path: &std::path::Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("write script {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).context("stat script")?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).context("chmod script")?;
    }
    Ok(())
}

/// Create a fake Ninja that records its arguments to `args.txt` beside
/// itself and checks that the `-f` build file exists in its working
/// directory.
///
/// The script exits with `exit_code` once the check passes, and with `2`
/// when the build file is missing.
pub fn fake_ninja(exit_code: i32) -> Result<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempfile::tempdir().context("create fake ninja dir")?;
    let path = dir.path().join("ninja");
    let log = dir.path().join("args.txt");
    let body = format!(
        concat!(
            "echo \"$@\" > '{log}'\n",
            "if [ \"$1\" = \"-f\" ] && [ ! -f \"$2\" ]; then\n",
            "  echo \"missing build file: $2\" >&2\n",
            "  exit 2\n",
            "fi\n",
            "echo 'ninja: no work to do.'\n",
            "exit {code}"
        ),
        log = log.display(),
        code = exit_code,
    );
    write_script(&path, &body)?;
    Ok((dir, path))
}
