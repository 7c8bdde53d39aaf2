//! Command runner abstraction for shelling out to the filter toolchain.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, info};

use crate::error::ExecError;

/// Environment variable exposing the filter's install location to the child.
pub const FILTER_DIR_ENV: &str = "FILTER_DIR";
/// Environment variable exposing the pipeline's working-directory root to the child.
pub const WORKING_DIR_ENV: &str = "FILTER_WORKING_DIR";

/// One child process to run to completion.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    /// Working directory of the child process.
    pub filter_dir: &'a Path,
    /// Auxiliary root handed to the child for resolving pipeline paths.
    pub working_dir: Option<&'a Path>,
    /// Short label prefixed to every forwarded output line.
    pub tag: &'a str,
}

/// Runner interface for invoking external commands.
pub trait Runner: Send + Sync {
    /// Resolve a program on the search path.
    fn lookup(&self, program: &str) -> Result<PathBuf, which::Error>;

    /// Execute a command and return its captured output, whatever its exit status.
    fn output(&self, program: &str, args: &[&str]) -> Result<Output, ExecError>;

    /// Run a command to completion, forwarding its output to the log.
    ///
    /// A nonzero exit status is an error.
    fn execute(&self, invocation: &Invocation<'_>) -> Result<(), ExecError>;
}

/// [`Runner`] backed by real OS processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn lookup(&self, program: &str) -> Result<PathBuf, which::Error> {
        which::which(program)
    }

    fn output(&self, program: &str, args: &[&str]) -> Result<Output, ExecError> {
        Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<(), ExecError> {
        let program = invocation.program;
        debug!(
            program,
            args = ?invocation.args,
            dir = %invocation.filter_dir.display(),
            "exec"
        );

        let mut command = Command::new(program);
        command
            .args(invocation.args)
            .current_dir(invocation.filter_dir)
            .env(FILTER_DIR_ENV, invocation.filter_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(root) = invocation.working_dir {
            command.env(WORKING_DIR_ENV, root);
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let tag = invocation.tag;
        // Reader threads log through the caller's subscriber.
        let dispatch = tracing::dispatcher::get_default(|current| current.clone());
        let (stdout_res, stderr_res) = std::thread::scope(|scope| {
            let out = scope.spawn(|| {
                tracing::dispatcher::with_default(&dispatch, || forward_lines(stdout, tag, false))
            });
            let err = scope.spawn(|| {
                tracing::dispatcher::with_default(&dispatch, || forward_lines(stderr, tag, true))
            });
            (join_reader(out.join()), join_reader(err.join()))
        });

        let status = child.wait().map_err(|source| ExecError::Io {
            program: program.to_string(),
            source,
        })?;
        let io_err = |source| ExecError::Io {
            program: program.to_string(),
            source,
        };
        stdout_res.map_err(io_err)?;
        let stderr = stderr_res.map_err(io_err)?;

        if status.success() {
            Ok(())
        } else {
            Err(ExecError::ExitStatus {
                program: program.to_string(),
                code: status.code(),
                stderr,
            })
        }
    }
}

/// Log each line read from a child stream, optionally keeping a copy.
fn forward_lines<R: Read>(stream: Option<R>, tag: &str, capture: bool) -> std::io::Result<String> {
    let mut captured = String::new();
    let Some(stream) = stream else {
        return Ok(captured);
    };
    for line in BufReader::new(stream).lines() {
        let line = line?;
        info!("[{}] {}", tag, line);
        if capture {
            captured.push_str(&line);
            captured.push('\n');
        }
    }
    Ok(captured)
}

fn join_reader(
    joined: std::thread::Result<std::io::Result<String>>,
) -> std::io::Result<String> {
    joined.unwrap_or_else(|_| Err(std::io::Error::other("output reader thread panicked")))
}

/// Stdout of a command as lossy UTF-8 text.
pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}
