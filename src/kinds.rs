//! Filter kinds and the uniform contract each of them implements.

use crate::context::{InstallContext, RunContext};
use crate::error::{ErrorKind, FilterError, Operation, Result, SchemaError};
use crate::filter::{RawObject, RemoteFilterDefinition, required_str};
use crate::go::{GoFilter, GoFilterDefinition};

/// Definition side of a filter kind: validates the environment, installs
/// dependencies and creates runners.
pub trait FilterInstaller: std::fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn check(&self, context: &RunContext<'_>) -> Result<()>;

    fn install_dependencies(
        &self,
        parent: Option<&RemoteFilterDefinition>,
        context: &InstallContext<'_>,
    ) -> Result<()>;

    fn create_filter_runner(&self, run_configuration: &RawObject) -> Result<Box<dyn FilterRunner>>;
}

/// Runner side of a filter kind, bound to one pipeline entry.
pub trait FilterRunner: std::fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn is_disabled(&self) -> bool;

    fn check(&self, context: &RunContext<'_>) -> Result<()>;

    /// Run the filter; `Ok(true)` asks the caller to stop the pipeline.
    fn run(&self, context: &RunContext<'_>) -> Result<bool>;
}

impl FilterInstaller for GoFilterDefinition {
    fn id(&self) -> &str {
        GoFilterDefinition::id(self)
    }

    fn check(&self, context: &RunContext<'_>) -> Result<()> {
        GoFilterDefinition::check(self, context)
    }

    fn install_dependencies(
        &self,
        parent: Option<&RemoteFilterDefinition>,
        context: &InstallContext<'_>,
    ) -> Result<()> {
        GoFilterDefinition::install_dependencies(self, parent, context)
    }

    fn create_filter_runner(&self, run_configuration: &RawObject) -> Result<Box<dyn FilterRunner>> {
        Ok(Box::new(GoFilterDefinition::create_filter_runner(
            self,
            run_configuration,
        )?))
    }
}

impl FilterRunner for GoFilter {
    fn id(&self) -> &str {
        GoFilter::id(self)
    }

    fn is_disabled(&self) -> bool {
        self.filter.disabled
    }

    fn check(&self, context: &RunContext<'_>) -> Result<()> {
        GoFilter::check(self, context)
    }

    fn run(&self, context: &RunContext<'_>) -> Result<bool> {
        GoFilter::run(self, context)
    }
}

/// Parse a raw definition, picking the filter kind from its `runWith` key.
pub fn parse_definition(id: &str, obj: &RawObject) -> Result<Box<dyn FilterInstaller>> {
    let schema_err = |err| FilterError::new(Operation::ParseDefinition, id, ErrorKind::Schema(err));
    let run_with = required_str(obj, "runWith").map_err(schema_err)?;
    match run_with {
        "go" => Ok(Box::new(GoFilterDefinition::from_object(id, obj)?)),
        other => Err(schema_err(SchemaError::UnknownRunner(other.to_string()))),
    }
}
