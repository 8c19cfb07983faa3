//! Source discovery and path-stem helpers.
//!
//! [`discover`] walks a directory tree and returns the regular files whose
//! root-relative path matches a glob pattern. Results are sorted so generated
//! descriptions do not depend on filesystem iteration order.

use std::path::PathBuf;
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern};
use miette::Diagnostic;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while discovering files.
#[derive(Debug, Error, Diagnostic)]
pub enum DiscoverError {
    /// The glob pattern could not be parsed.
    #[error("invalid glob pattern `{pattern}`: {source}")]
    #[diagnostic(code(ninjascribe::paths::invalid_pattern))]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser error.
        #[source]
        source: glob::PatternError,
    },
    /// A directory under the root could not be read.
    #[error("failed to walk `{root}`: {source}")]
    #[diagnostic(code(ninjascribe::paths::walk_failed))]
    Walk {
        /// Root being searched.
        root: Utf8PathBuf,
        /// Traversal error.
        #[source]
        source: walkdir::Error,
    },
    /// A matching candidate is not valid UTF-8.
    #[error("path `{}` is not valid UTF-8", .path.display())]
    #[diagnostic(code(ninjascribe::paths::non_utf8))]
    NonUtf8 {
        /// Offending path.
        path: PathBuf,
    },
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Find files under `root` matching `pattern`.
///
/// `**` matches any number of directories, including none. Paths are returned
/// relative to `root` with `/` separators, sorted and deduplicated. A missing
/// root, or one with no matches, yields an empty vector.
///
/// # Errors
///
/// Returns [`DiscoverError`] for an invalid pattern, an unreadable directory,
/// or a non-UTF-8 file name.
///
/// # Examples
///
/// ```
/// use ninjascribe::paths::discover;
///
/// let found = discover("does/not/exist", "**/*.cpp").expect("discover");
/// assert!(found.is_empty());
/// ```
pub fn discover(
    root: impl AsRef<Utf8Path>,
    pattern: &str,
) -> Result<Vec<Utf8PathBuf>, DiscoverError> {
    let base = root.as_ref();
    let matcher = Pattern::new(pattern).map_err(|source| DiscoverError::InvalidPattern {
        pattern: pattern.to_owned(),
        source,
    })?;
    if !base.is_dir() {
        tracing::debug!(root = %base, pattern, "discovery root missing; nothing to match");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for walked in WalkDir::new(base).follow_links(true).sort_by_file_name() {
        let entry = walked.map_err(|source| DiscoverError::Walk {
            root: base.to_owned(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = relative_utf8(base, entry.path())? else {
            continue;
        };
        if matcher.matches_with(&relative, MATCH_OPTIONS) {
            found.push(Utf8PathBuf::from(relative));
        }
    }
    found.sort();
    found.dedup();
    tracing::debug!(root = %base, pattern, matches = found.len(), "discovered files");
    Ok(found)
}

fn relative_utf8(root: &Utf8Path, path: &std::path::Path) -> Result<Option<String>, DiscoverError> {
    let Ok(relative) = path.strip_prefix(root.as_std_path()) else {
        return Ok(None);
    };
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| DiscoverError::NonUtf8 {
                path: path.to_path_buf(),
            })?;
        parts.push(part);
    }
    Ok(Some(parts.join("/")))
}

/// Run [`discover`] for several independent root/pattern pairs in parallel.
///
/// Results come back in request order, each sorted as [`discover`] sorts.
///
/// # Errors
///
/// Returns the first [`DiscoverError`] in request order.
pub fn discover_all<R>(requests: &[(R, &str)]) -> Result<Vec<Vec<Utf8PathBuf>>, DiscoverError>
where
    R: AsRef<Utf8Path> + Sync,
{
    thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|(root, pattern)| scope.spawn(move || discover(root, pattern)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Remove the final extension from `path`.
///
/// Used to derive a parallel output path, for example an object file from a
/// discovered source. Paths without an extension, and dotfiles such as
/// `.hidden`, are returned unchanged.
///
/// # Examples
///
/// ```
/// use ninjascribe::paths::stem;
///
/// assert_eq!(stem("src/sub/b.cpp"), "src/sub/b");
/// assert_eq!(stem("archive.tar.gz"), "archive.tar");
/// assert_eq!(stem("Makefile"), "Makefile");
/// ```
#[must_use]
pub fn stem(path: impl AsRef<Utf8Path>) -> Utf8PathBuf {
    let original = path.as_ref();
    if original.extension().is_some() {
        original.with_extension("")
    } else {
        original.to_owned()
    }
}
