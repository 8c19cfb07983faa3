//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! generates the build description and, for `build` and `test`, hands it to
//! Ninja, streaming child output back to the user.

use crate::cli::{Cli, Commands};
use crate::ninja_gen::{GenerateOptions, WriteOutcome, write_atomic, write_stdout};
use crate::project::{self, ProjectConfig};
use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info};

/// Environment variable override for the Ninja executable.
pub const NINJA_ENV: &str = "NINJASCRIBE_NINJA";

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if generating the description, writing it, running
/// Ninja, or running the tests fails.
pub fn run(cli: &Cli) -> Result<()> {
    let root = project_root(cli)?;
    let command = cli.command.clone().unwrap_or(Commands::Generate);
    let config = ProjectConfig {
        release: cli.release,
        ..ProjectConfig::default()
    };
    let ninja = generate_ninja(cli, &root, &config)?;
    match command {
        Commands::Graph => {
            write_stdout(&ninja).context("printing build description")?;
        }
        Commands::Generate => {
            write_build_file(&root, cli, &ninja)?;
        }
        Commands::Build { targets } => {
            let build_file = write_build_file(&root, cli, &ninja)?;
            run_ninja(Path::new(&ninja_program()), &root, &build_file, &targets)?;
        }
        Commands::Test => {
            let build_file = write_build_file(&root, cli, &ninja)?;
            let binary = config.test_binary();
            run_ninja(Path::new(&ninja_program()), &root, &build_file, &[binary.to_string()])?;
            run_tests(&root, &binary, Utf8Path::new(&config.builddir))?;
        }
    }
    Ok(())
}

fn project_root(cli: &Cli) -> Result<Utf8PathBuf> {
    let dir = cli
        .directory
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|path| anyhow!("project directory {} is not valid UTF-8", path.display()))
}

fn ninja_program() -> OsString {
    std::env::var_os(NINJA_ENV).unwrap_or_else(|| OsString::from("ninja"))
}

/// Build the description for the project at `root` and render it.
///
/// # Errors
///
/// Returns an error if source discovery fails or the graph is invalid.
fn generate_ninja(cli: &Cli, root: &Utf8Path, config: &ProjectConfig) -> Result<String> {
    let description = project::describe(root, config)
        .with_context(|| format!("describing project at {root}"))?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let json = serde_json::to_string_pretty(&description).context("serialising description")?;
        debug!("Description:\n{json}");
    }
    let options = GenerateOptions {
        width: Some(cli.width),
    };
    description.render(&options).context("rendering Ninja file")
}

fn write_build_file(root: &Utf8Path, cli: &Cli, ninja: &str) -> Result<Utf8PathBuf> {
    let relative = Utf8Path::from_path(&cli.build_file)
        .ok_or_else(|| anyhow!("build file {} is not valid UTF-8", cli.build_file.display()))?;
    let path = root.join(relative);
    match write_atomic(&path, ninja).with_context(|| format!("writing {path}"))? {
        WriteOutcome::Written => debug!("build file {path} updated"),
        WriteOutcome::Unchanged => debug!("build file {path} unchanged"),
    }
    Ok(path)
}

/// Invoke the Ninja executable on `build_file` from `root`.
///
/// Standard output and error are streamed back as they arrive.
///
/// # Errors
///
/// Returns an error if Ninja fails to spawn or reports a non-zero exit
/// status.
pub fn run_ninja(program: &Path, root: &Utf8Path, build_file: &Utf8Path, targets: &[String]) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.current_dir(root);
    // Paths in the build file are relative to the project root, so hand
    // Ninja the file relative to it as well.
    let file_arg = build_file.strip_prefix(root).unwrap_or(build_file);
    cmd.arg("-f").arg(file_arg.as_str());
    cmd.args(targets);
    run_streamed(cmd, "ninja")
}

/// Run the test binary at `binary` (relative to `root`) from `root`, with
/// `library_dir` on the dynamic loader path so it finds the shared library.
///
/// # Errors
///
/// Returns an error if the binary fails to spawn or exits unsuccessfully.
pub fn run_tests(root: &Utf8Path, binary: &Utf8Path, library_dir: &Utf8Path) -> Result<()> {
    let program = std::path::absolute(root.join(binary).as_std_path())
        .with_context(|| format!("locating {binary} under {root}"))?;
    let mut cmd = Command::new(program);
    cmd.current_dir(root);
    cmd.env("LD_LIBRARY_PATH", library_dir.as_str());
    run_streamed(cmd, "tests")
}

fn run_streamed(mut cmd: Command, label: &'static str) -> Result<()> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    info!("Running command: {program} {}", args.join(" "));

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {program}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("child stderr was not captured"))?;

    let out_handle = thread::spawn(move || forward_output(stdout, io::stdout(), "stdout"));
    let err_handle = thread::spawn(move || forward_output(stderr, io::stderr(), "stderr"));

    let status = child
        .wait()
        .with_context(|| format!("waiting for {label}"))?;
    for handle in [out_handle, err_handle] {
        match handle.join() {
            Ok(stats) => debug!(
                bytes = stats.bytes_read,
                write_failed = stats.write_failed,
                "forwarded child output"
            ),
            Err(_) => debug!("output forwarding thread panicked"),
        }
    }

    if status.success() {
        Ok(())
    } else {
        bail!("{label} exited with {status}")
    }
}

/// Forwarding statistics for a child output stream.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
struct ForwardStats {
    bytes_read: u64,
    write_failed: bool,
}

struct CountingReader<R> {
    inner: R,
    read: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.read = self.read.saturating_add(count as u64);
        Ok(count)
    }
}

/// Copy raw bytes from the child to `writer`.
///
/// Once the writer fails the rest of the stream is drained to a sink, so the
/// child never blocks on or dies from a closed pipe.
fn forward_output<R: Read, W: Write>(reader: R, mut writer: W, stream_name: &'static str) -> ForwardStats {
    let mut counting = CountingReader {
        inner: reader,
        read: 0,
    };
    let mut stats = ForwardStats::default();
    if let Err(err) = io::copy(&mut counting, &mut writer) {
        stats.write_failed = true;
        debug!("Failed to write child {stream_name} output to parent: {err}; discarding remaining bytes");
        if let Err(drain_err) = io::copy(&mut counting, &mut io::sink()) {
            debug!("Failed to drain child {stream_name} output after writer closed: {drain_err}");
        }
    }
    stats.bytes_read = counting.read;
    stats
}
