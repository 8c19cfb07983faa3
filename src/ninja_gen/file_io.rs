//! File creation helpers for generated Ninja files.
//!
//! The rendered text is written to a temporary file beside the destination
//! and renamed into place, so a failure never leaves a truncated build file
//! behind.

use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use tempfile::Builder;
use tracing::info;

use crate::error::GraphError;

/// Result of [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The destination was created or replaced.
    Written,
    /// The destination already held identical content and was not touched.
    Unchanged,
}

/// Write `content` to `path` via a temporary file and an atomic rename.
///
/// Missing parent directories are created. If `path` already contains
/// exactly `content`, it is left alone so its modification time does not
/// make Ninja regenerate anything.
///
/// # Errors
///
/// Returns [`GraphError::Serialization`] when any filesystem step fails; the
/// destination is then left as it was.
pub fn write_atomic(path: &Utf8Path, content: &str) -> Result<WriteOutcome, GraphError> {
    if fs::read(path).is_ok_and(|existing| existing == content.as_bytes()) {
        info!("Ninja file at {path} is up to date");
        return Ok(WriteOutcome::Unchanged);
    }
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|err| GraphError::io(format!("directory `{parent}`"), err))?;

    let mut tmp = Builder::new()
        .prefix(".ninjascribe.")
        .suffix(".ninja.tmp")
        .tempfile_in(parent)
        .map_err(|err| GraphError::io(format!("temporary file in `{parent}`"), err))?;
    {
        let handle = tmp.as_file_mut();
        handle
            .write_all(content.as_bytes())
            .and_then(|()| handle.flush())
            .and_then(|()| handle.sync_all())
            .map_err(|err| GraphError::io(format!("temporary file for `{path}`"), err))?;
    }
    tmp.persist(path)
        .map_err(|err| GraphError::io(format!("`{path}`"), err.error))?;
    info!("Wrote Ninja file to {path}");
    Ok(WriteOutcome::Written)
}

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

/// Write `content` to standard output, treating a closed pipe as success.
///
/// # Errors
///
/// Returns [`GraphError::Serialization`] for any other write failure.
pub fn write_stdout(content: &str) -> Result<(), GraphError> {
    let mut stdout = io::stdout().lock();
    match stdout.write_all(content.as_bytes()).and_then(|()| stdout.flush()) {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(GraphError::io("standard output", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[test]
    fn creates_parent_directories() {
        let temp = tempfile::tempdir().expect("temp dir");
        let target = utf8_dir(&temp).join("nested/build.ninja");
        let outcome = write_atomic(&target, "build all: phony\n").expect("write");
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(
            fs::read_to_string(&target).expect("read"),
            "build all: phony\n"
        );
    }

    #[test]
    fn identical_content_is_not_rewritten() {
        let temp = tempfile::tempdir().expect("temp dir");
        let target = utf8_dir(&temp).join("build.ninja");
        write_atomic(&target, "rule cc\n").expect("first write");
        let outcome = write_atomic(&target, "rule cc\n").expect("second write");
        assert_eq!(outcome, WriteOutcome::Unchanged);
        let changed = write_atomic(&target, "rule ld\n").expect("third write");
        assert_eq!(changed, WriteOutcome::Written);
    }

    #[test]
    fn leaves_no_temporary_files_behind() {
        let temp = tempfile::tempdir().expect("temp dir");
        let target = utf8_dir(&temp).join("build.ninja");
        write_atomic(&target, "x = 1\n").expect("write");
        let names: Vec<_> = fs::read_dir(temp.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("build.ninja")]);
    }

    #[test]
    fn failed_write_keeps_destination_absent() {
        let temp = tempfile::tempdir().expect("temp dir");
        let blocker = utf8_dir(&temp).join("not-a-dir");
        fs::write(&blocker, "file").expect("blocker");
        let target = blocker.join("build.ninja");
        let err = write_atomic(&target, "x = 1\n").expect_err("parent is a file");
        assert!(matches!(err, GraphError::Serialization { source: Some(_), .. }));
        assert!(!target.exists());
    }
}
