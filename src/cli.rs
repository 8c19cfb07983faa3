//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Line width used by the CLI, wider than the library default so compiler
/// flag lists stay readable.
pub const CLI_WIDTH: usize = 120;

/// Generate the project's Ninja build file and optionally run Ninja on it.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Ninja build file, relative to the project directory.
    #[arg(short = 'f', long, value_name = "FILE", default_value = "build.ninja")]
    pub build_file: PathBuf,

    /// Project root to describe.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Compile with optimisation.
    #[arg(long)]
    pub release: bool,

    /// Wrap generated lines at this width; `0` disables wrapping.
    #[arg(short, long, value_name = "N", default_value_t = CLI_WIDTH)]
    pub width: usize,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `generate` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate);
        }
        self
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Write the build file.
    Generate,

    /// Write the build file, then run Ninja on the given targets.
    Build {
        /// Targets to build; Ninja's defaults when empty.
        targets: Vec<String>,
    },

    /// Print the build description to standard output instead of writing it.
    Graph,

    /// Write the build file, build the test binary, and run it with the
    /// build directory on the library path.
    Test,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec!["ninjascribe"], Commands::Generate)]
    #[case(vec!["ninjascribe", "graph"], Commands::Graph)]
    #[case(vec!["ninjascribe", "test"], Commands::Test)]
    #[case(
        vec!["ninjascribe", "build", "build/tests"],
        Commands::Build { targets: vec!["build/tests".into()] }
    )]
    fn parses_commands(#[case] args: Vec<&str>, #[case] expected: Commands) {
        let cli = Cli::try_parse_from(args).expect("parse").with_default_command();
        assert_eq!(cli.command, Some(expected));
    }

    #[test]
    fn defaults_match_task_runner() {
        let cli = Cli::try_parse_from(["ninjascribe"]).expect("parse");
        assert_eq!(cli.build_file, PathBuf::from("build.ninja"));
        assert_eq!(cli.width, CLI_WIDTH);
        assert!(!cli.release);
    }

    #[test]
    fn release_and_directory_flags() {
        let cli = Cli::try_parse_from(["ninjascribe", "--release", "-C", "proj", "-f", "out.ninja"])
            .expect("parse");
        assert!(cli.release);
        assert_eq!(cli.directory, Some(PathBuf::from("proj")));
        assert_eq!(cli.build_file, PathBuf::from("out.ninja"));
    }
}
