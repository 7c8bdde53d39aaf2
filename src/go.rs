//! Filters implemented as Go programs, run with `go run`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::context::{InstallContext, RunContext, join_under, short_filter_name};
use crate::error::{EnvironmentError, ErrorKind, ExecError, FilterError, Operation, Result};
use crate::filter::{Filter, FilterDefinition, RawObject, RemoteFilterDefinition, required_str};
use crate::runner::{self, Invocation, Runner};

const GO: &str = "go";
const GO_DOWNLOAD_URL: &str = "https://golang.org/dl/";

/// Definition of a filter backed by a Go script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoFilterDefinition {
    pub base: FilterDefinition,
    /// Script path relative to the filter's install directory.
    pub script: String,
}

/// A Go filter bound to its per-run arguments and settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GoFilter {
    pub filter: Filter,
    pub definition: GoFilterDefinition,
}

impl GoFilterDefinition {
    /// Parse a definition from its raw configuration object.
    pub fn from_object(id: &str, obj: &RawObject) -> Result<Self> {
        let script = required_str(obj, "script").map_err(|err| {
            FilterError::new(Operation::ParseDefinition, id, ErrorKind::Schema(err))
        })?;
        Ok(Self {
            base: FilterDefinition::from_id(id),
            script: script.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    /// Bind this definition to one entry of a pipeline run.
    pub fn create_filter_runner(&self, run_configuration: &RawObject) -> Result<GoFilter> {
        let filter = Filter::from_object(run_configuration).map_err(|err| {
            FilterError::new(Operation::CreateRunner, self.id(), ErrorKind::FilterParse(err))
        })?;
        Ok(GoFilter {
            filter,
            definition: self.clone(),
        })
    }

    /// Verify that the Go toolchain is installed and answers `go version`.
    pub fn check(&self, context: &RunContext<'_>) -> Result<()> {
        check_toolchain(context.runner())
            .map_err(|err| FilterError::new(Operation::Check, self.id(), ErrorKind::Environment(err)))
    }

    /// Fetch the Go module dependencies of the script.
    ///
    /// With a `parent`, the script lives in the parent pack's download
    /// directory; otherwise it is resolved against the install root.
    pub fn install_dependencies(
        &self,
        parent: Option<&RemoteFilterDefinition>,
        context: &InstallContext<'_>,
    ) -> Result<()> {
        let fail = |kind| FilterError::new(Operation::InstallDependencies, self.id(), kind);
        info!(filter = %self.id(), "downloading dependencies");

        let script_path = self.resolve_script(parent, context).map_err(fail)?;
        let filter_dir = script_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| script_path.clone());

        let tag = short_filter_name(self.id());
        let args = ["mod".to_string(), "download".to_string()];
        context
            .runner()
            .execute(&Invocation {
                program: GO,
                args: &args,
                filter_dir: &filter_dir,
                working_dir: None,
                tag: &tag,
            })
            .map_err(|err| fail(ErrorKind::DependencyInstall(err)))
    }

    /// Absolute path of the script for dependency installation.
    pub fn resolve_script(
        &self,
        parent: Option<&RemoteFilterDefinition>,
        context: &InstallContext<'_>,
    ) -> std::result::Result<PathBuf, ErrorKind> {
        let base = match parent {
            Some(parent) => parent.download_path(context.dot_regolith_path),
            None => context.install_root.to_path_buf(),
        };
        let joined = join_under(&base, &self.script);
        std::path::absolute(&joined).map_err(|source| ErrorKind::PathResolution {
            path: joined,
            source,
        })
    }
}

impl GoFilter {
    pub fn id(&self) -> &str {
        &self.filter.id
    }

    pub fn check(&self, context: &RunContext<'_>) -> Result<()> {
        self.definition.check(context)
    }

    /// Run the script and report whether the pipeline was interrupted meanwhile.
    pub fn run(&self, context: &RunContext<'_>) -> Result<bool> {
        self.run_script(context)?;
        Ok(context.is_interrupted())
    }

    /// Argument vector passed to `go`.
    pub fn arguments(&self, context: &RunContext<'_>) -> Result<Vec<String>> {
        let script = join_under(&context.absolute_location, &self.definition.script);
        let mut args = vec!["run".to_string(), script.display().to_string()];
        if !self.filter.settings.is_empty() {
            let settings = serde_json::to_string(&self.filter.settings).map_err(|err| {
                FilterError::new(Operation::RunSubprocess, self.id(), ErrorKind::Serialization(err))
            })?;
            args.push(settings);
        }
        args.extend(self.filter.arguments.iter().cloned());
        Ok(args)
    }

    fn run_script(&self, context: &RunContext<'_>) -> Result<()> {
        let fail = |kind| FilterError::new(Operation::RunSubprocess, self.id(), kind);
        let args = self.arguments(context)?;
        let working_dir = context.working_dir().map_err(|source| {
            fail(ErrorKind::PathResolution {
                path: context.dot_regolith_path.join("tmp"),
                source,
            })
        })?;
        let tag = short_filter_name(self.id());
        context
            .runner()
            .execute(&Invocation {
                program: GO,
                args: &args,
                filter_dir: &context.absolute_location,
                working_dir: Some(&working_dir),
                tag: &tag,
            })
            .map_err(|err| fail(ErrorKind::Subprocess(err)))
    }
}

fn check_toolchain(runner: &dyn Runner) -> std::result::Result<(), EnvironmentError> {
    runner
        .lookup(GO)
        .map_err(|source| EnvironmentError::ToolchainNotFound {
            program: GO.to_string(),
            download_url: GO_DOWNLOAD_URL.to_string(),
            source,
        })?;

    let version_err = |source| EnvironmentError::VersionQueryFailed {
        program: GO.to_string(),
        source,
    };
    let output = runner.output(GO, &["version"]).map_err(version_err)?;
    if !output.status.success() {
        return Err(version_err(ExecError::ExitStatus {
            program: GO.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }));
    }

    let report = runner::stdout_text(&output);
    debug!("found Go version {}", normalize_version(&report));
    Ok(())
}

/// Trim whitespace and a single leading `v` from a version report.
pub fn normalize_version(raw: &str) -> &str {
    let trimmed = raw.trim_matches(|c: char| c == ' ' || c == '\n' || c == '\t' || c == '\r');
    trimmed.strip_prefix('v').unwrap_or(trimmed)
}
