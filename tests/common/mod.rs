#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};

use regolith_filters::error::ExecError;
use regolith_filters::filter::RawObject;
use regolith_filters::runner::{Invocation, Runner};

/// Invocation captured by [`TestRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub program: String,
    pub args: Vec<String>,
    pub filter_dir: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub tag: String,
}

#[derive(Clone)]
struct Rule {
    contains: Vec<String>,
    status: i32,
    stdout: String,
}

impl Rule {
    fn matches(&self, cmd: &str) -> bool {
        self.contains.iter().all(|needle| cmd.contains(needle))
    }
}

/// Fake runner: records every call and answers from rules.
///
/// Unmatched commands succeed with empty output.
pub struct TestRunner {
    on_path: bool,
    rules: Mutex<Vec<Rule>>,
    pub lookups: Mutex<Vec<String>>,
    pub outputs: Mutex<Vec<String>>,
    pub executed: Mutex<Vec<Recorded>>,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self {
            on_path: true,
            rules: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }
}

impl TestRunner {
    /// Runner whose search path contains nothing.
    pub fn without_toolchain() -> Self {
        Self {
            on_path: false,
            ..Self::default()
        }
    }

    pub fn add_rule(&self, contains: &[&str], status: i32, stdout: &str) {
        self.rules.lock().expect("rules lock").push(Rule {
            contains: contains.iter().map(|s| s.to_string()).collect(),
            status,
            stdout: stdout.to_string(),
        });
    }

    pub fn executed(&self) -> Vec<Recorded> {
        self.executed.lock().expect("executed lock").clone()
    }

    fn answer(&self, cmdline: &str) -> (i32, String) {
        self.rules
            .lock()
            .expect("rules lock")
            .iter()
            .find(|rule| rule.matches(cmdline))
            .map(|rule| (rule.status, rule.stdout.clone()))
            .unwrap_or((0, String::new()))
    }
}

impl Runner for TestRunner {
    fn lookup(&self, program: &str) -> Result<PathBuf, which::Error> {
        self.lookups.lock().expect("lookups lock").push(program.to_string());
        if self.on_path {
            Ok(Path::new("/usr/local/bin").join(program))
        } else {
            Err(which::Error::CannotFindBinaryPath)
        }
    }

    fn output(&self, program: &str, args: &[&str]) -> Result<Output, ExecError> {
        let cmdline = format!("{} {}", program, args.join(" "));
        self.outputs.lock().expect("outputs lock").push(cmdline.clone());
        let (status, stdout) = self.answer(&cmdline);
        Ok(Output {
            status: exit_status(status),
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<(), ExecError> {
        let cmdline = format!("{} {}", invocation.program, invocation.args.join(" "));
        self.executed.lock().expect("executed lock").push(Recorded {
            program: invocation.program.to_string(),
            args: invocation.args.to_vec(),
            filter_dir: invocation.filter_dir.to_path_buf(),
            working_dir: invocation.working_dir.map(Path::to_path_buf),
            tag: invocation.tag.to_string(),
        });
        let (status, _) = self.answer(&cmdline);
        if status == 0 {
            Ok(())
        } else {
            Err(ExecError::ExitStatus {
                program: invocation.program.to_string(),
                code: Some(status),
                stderr: "fake failure\n".to_string(),
            })
        }
    }
}

/// Shared buffer the log subscriber writes into.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with debug logging captured, returning its result and the log text.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().expect("log lock")).to_string();
    (result, logs)
}

pub fn object(value: serde_json::Value) -> RawObject {
    value.as_object().cloned().expect("json object")
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}
