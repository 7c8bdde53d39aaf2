//! Error taxonomy for filter definitions, environment checks and execution.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Missing or mistyped configuration property.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required property \"{0}\"")]
    MissingProperty(String),

    #[error("property \"{property}\" must be of type {expected}")]
    PropertyType { property: String, expected: String },

    #[error("unknown filter runner \"{0}\"")]
    UnknownRunner(String),
}

impl SchemaError {
    pub(crate) fn missing(property: &str) -> Self {
        Self::MissingProperty(property.to_string())
    }

    pub(crate) fn mistyped(property: impl Into<String>, expected: &str) -> Self {
        Self::PropertyType {
            property: property.into(),
            expected: expected.to_string(),
        }
    }
}

/// Required toolchain is missing or cannot be queried.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("{program} not found, download and install it from {download_url}")]
    ToolchainNotFound {
        program: String,
        download_url: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to check {program} version")]
    VersionQueryFailed {
        program: String,
        #[source]
        source: ExecError,
    },
}

/// Failure reported by a [`Runner`](crate::runner::Runner) while running a child process.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}")]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("i/o error while streaming output of {program}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Step of the filter lifecycle an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ParseDefinition,
    CreateRunner,
    Check,
    InstallDependencies,
    RunSubprocess,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ParseDefinition => "parse filter definition",
            Operation::CreateRunner => "create filter runner",
            Operation::Check => "check environment",
            Operation::InstallDependencies => "install dependencies",
            Operation::RunSubprocess => "run subprocess",
        };
        f.write_str(name)
    }
}

/// Cause carried by a [`FilterError`].
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error(transparent)]
    Schema(SchemaError),

    #[error("invalid filter run configuration: {0}")]
    FilterParse(SchemaError),

    #[error(transparent)]
    Environment(EnvironmentError),

    #[error("failed to resolve absolute path of {}", .path.display())]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download dependencies")]
    DependencyInstall(#[source] ExecError),

    #[error(transparent)]
    Subprocess(ExecError),

    #[error("failed to serialize filter settings")]
    Serialization(#[source] serde_json::Error),
}

/// Error annotated with the failing operation and the filter it concerns.
#[derive(Error, Debug)]
#[error("{operation} failed for filter \"{filter_id}\": {kind}")]
pub struct FilterError {
    pub operation: Operation,
    pub filter_id: String,
    #[source]
    pub kind: ErrorKind,
}

impl FilterError {
    pub fn new(operation: Operation, filter_id: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            operation,
            filter_id: filter_id.into(),
            kind,
        }
    }

    /// Schema error behind this failure, if any.
    pub fn schema(&self) -> Option<&SchemaError> {
        match &self.kind {
            ErrorKind::Schema(err) | ErrorKind::FilterParse(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
