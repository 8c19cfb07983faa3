//! Build description for a C++ extension library with a flatbuffers schema.
//!
//! Produces the graph the project's task runner has always generated: every
//! `src/**/*.cpp` compiles to an object under `$builddir/obj`, top-level
//! sources link into a shared library, and sources under `src/test` link
//! into a test binary against that library. A single-header test framework
//! is downloaded and the flatbuffers schema is compiled before any object is
//! built.

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

use crate::description::Description;
use crate::error::GraphError;
use crate::graph::BuildEdge;
use crate::paths::{DiscoverError, discover_all, stem};
use crate::rules::{DepsFormat, Rule};

const CATCH_URL: &str = "https://github.com/catchorg/Catch2/releases/download/v2.3.0/catch.hpp";
const CATCH_HEADER: &str = "$builddir/third-party/include/catch.hpp";
const SCHEMA: &str = "$projectdir/src/flategy_data.fbs";
const GENERATED_HEADER: &str = "$builddir/gen/flategy_data_generated.h";
const GENERATED_DIR: &str = "$builddir/gen/flategy_data/";
const SHARED_LIBRARY: &str = "$builddir/libflategy.so";
const TEST_BINARY: &str = "$builddir/tests";

/// Errors raised while describing the project.
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    /// Source discovery failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Discover(#[from] DiscoverError),
    /// The graph could not be built.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

/// Knobs for the generated description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Compile with optimisation instead of debug information.
    pub release: bool,
    /// Value of the `builddir` variable.
    pub builddir: String,
    /// Value of the `projectdir` variable.
    pub projectdir: String,
    /// C++ compiler.
    pub cxx: String,
    /// Include directories outside the project (Python and numpy headers).
    pub system_includes: Vec<String>,
    /// Library the shared object links against.
    pub python_lib: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            release: false,
            builddir: String::from("build"),
            projectdir: String::from("."),
            cxx: String::from("g++"),
            system_includes: vec![
                String::from("/usr/include/python3.6m"),
                String::from("/usr/local/lib/python3.6/dist-packages/numpy/core/include"),
            ],
            python_lib: String::from("python3.6m"),
        }
    }
}

impl ProjectConfig {
    /// Path of the linked test binary relative to the project root, which is
    /// also its Ninja target name.
    #[must_use]
    pub fn test_binary(&self) -> Utf8PathBuf {
        Utf8Path::new(&self.builddir).join("tests")
    }

    fn cxxflags(&self) -> String {
        let variant = if self.release {
            "-O3 -mtune=native"
        } else {
            "-O0 -g"
        };
        let includes = [
            "$projectdir/include",
            "$builddir/gen",
            "$builddir/third-party/include",
        ]
        .into_iter()
        .chain(self.system_includes.iter().map(String::as_str))
        .map(|dir| format!("-I {dir}"))
        .join(" ");
        format!("-c -fpic -Wall -Wextra -Werror -std=c++17 {variant} {includes}")
    }
}

/// Describe the project rooted at `root`.
///
/// Sources are discovered under `root/src`; the generated paths are relative
/// to `$projectdir`, so Ninja must run from `root`. The result has passed the
/// cycle check.
///
/// # Errors
///
/// Returns [`ProjectError`] when discovery fails or the graph is invalid.
pub fn describe(root: &Utf8Path, config: &ProjectConfig) -> Result<Description, ProjectError> {
    let src = root.join("src");
    let found = discover_all(&[
        (src.as_path(), "**/*.cpp"),
        (src.as_path(), "*.cpp"),
        (src.as_path(), "test/*.cpp"),
    ])?;
    let mut sets = found.into_iter();
    let all_sources = sets.next().unwrap_or_default();
    let library_sources = sets.next().unwrap_or_default();
    let test_sources = sets.next().unwrap_or_default();
    tracing::debug!(
        sources = all_sources.len(),
        library = library_sources.len(),
        tests = test_sources.len(),
        "discovered project sources"
    );

    let mut ninja = Description::new();
    ninja.variable("builddir", &config.builddir);
    ninja.variable("projectdir", &config.projectdir);
    ninja.variable("cxx", &config.cxx);
    ninja.variable("cxxflags", config.cxxflags());
    ninja.variable("linkflags", "-Wl,--no-undefined");

    ninja.rule(
        Rule::new("cxx", "$cxx $cxxflags $in -MMD -MF $out.d -o $out")
            .with_depfile("$out.d", DepsFormat::Gcc),
    )?;
    ninja.rule(Rule::new("link", "$cxx $linkflags $in -o $out $libs"))?;
    ninja.rule(Rule::new("download", "wget -qO $out $url"))?;
    ninja.rule(Rule::new(
        "flatc",
        "flatc --python --cpp --gen-object-api -o $dir $in",
    ))?;

    ninja.build(
        BuildEdge::new("download")
            .output(CATCH_HEADER)
            .variable("url", CATCH_URL),
    )?;
    ninja.build(
        BuildEdge::new("flatc")
            .input(SCHEMA)
            .output(GENERATED_HEADER)
            .implicit_output(GENERATED_DIR)
            .variable("dir", "$builddir/gen"),
    )?;

    for cpp in &all_sources {
        ninja.build(
            BuildEdge::new("cxx")
                .input(format!("$projectdir/src/{cpp}"))
                .output(object_for(cpp))
                .order_only(CATCH_HEADER)
                .order_only(GENERATED_HEADER),
        )?;
    }

    ninja.build(
        BuildEdge::new("link")
            .inputs(library_sources.iter().map(object_for))
            .output(SHARED_LIBRARY)
            .variable("libs", format!("-l{}", config.python_lib))
            .variable("linkflags", "-shared"),
    )?;
    ninja.build(
        BuildEdge::new("link")
            .inputs(test_sources.iter().map(object_for))
            .output(TEST_BINARY)
            .implicit(SHARED_LIBRARY)
            .variable("libs", "-L$builddir -lflategy"),
    )?;

    ninja.check_cycles()?;
    Ok(ninja)
}

fn object_for(source: &Utf8PathBuf) -> String {
    format!("$builddir/obj/{}.o", stem(source))
}
