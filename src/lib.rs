//! Script filter adapters for build pipelines.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod go;
pub mod kinds;
pub mod logging;
pub mod runner;

pub use context::{InstallContext, RunContext};
pub use error::{ErrorKind, FilterError, Operation, SchemaError};
pub use kinds::{FilterInstaller, FilterRunner, parse_definition};
