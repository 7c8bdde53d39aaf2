//! Command handlers driving filters from a pipeline config.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::config::{PipelineConfig, load_pipeline_config, project_root};
use crate::context::{InstallContext, RunContext};
use crate::filter::required_str;
use crate::kinds::{FilterInstaller, parse_definition};
use crate::runner::{Runner, SystemRunner};

/// Loaded pipeline with its resolved directories.
struct Pipeline {
    config: PipelineConfig,
    root: PathBuf,
    dot_regolith: PathBuf,
}

impl Pipeline {
    fn load(path: &Path) -> Result<Self> {
        let config = load_pipeline_config(path)?;
        Ok(Self::from_config(config, project_root(path)?))
    }

    fn from_config(config: PipelineConfig, root: PathBuf) -> Self {
        let dot_regolith = root.join(&config.dot_regolith);
        Self {
            config,
            root,
            dot_regolith,
        }
    }

    fn definitions(&self) -> Result<Vec<Box<dyn FilterInstaller>>> {
        self.config
            .definitions
            .iter()
            .map(|(id, raw)| parse_definition(id, raw).map_err(anyhow::Error::from))
            .collect()
    }

    /// Install directory of a definition: its remote pack's download
    /// directory, or the project root for local filters.
    fn location(&self, id: &str) -> Result<PathBuf> {
        Ok(match self.config.remote_for(id)? {
            Some(remote) => remote.download_path(&self.dot_regolith),
            None => self.root.clone(),
        })
    }

    fn context<'a>(
        &self,
        location: PathBuf,
        interrupted: &Arc<AtomicBool>,
        runner: &'a dyn Runner,
    ) -> RunContext<'a> {
        RunContext::new(
            location,
            self.dot_regolith.clone(),
            Arc::clone(interrupted),
            runner,
        )
    }
}

pub(super) fn handle_check(config: &Path) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let interrupted = Arc::new(AtomicBool::new(false));
    for definition in pipeline.definitions()? {
        let location = pipeline.location(definition.id())?;
        definition.check(&pipeline.context(location, &interrupted, &SystemRunner))?;
        println!("{}  ok", definition.id());
    }
    Ok(())
}

pub(super) fn handle_install(config: &Path) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    install_all(&pipeline, &SystemRunner)?;
    Ok(())
}

pub(super) fn handle_run(config: &Path, skip_check: bool) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install interrupt handler")?;

    let ran = run_entries(&pipeline, &interrupted, &SystemRunner, skip_check)?;
    info!(filters = ran, "pipeline finished");
    Ok(())
}

/// Install dependencies of every definition, each against its own pack.
fn install_all(pipeline: &Pipeline, runner: &dyn Runner) -> Result<usize> {
    let context = InstallContext::new(&pipeline.root, &pipeline.dot_regolith, runner);
    let definitions = pipeline.definitions()?;
    for definition in &definitions {
        let parent = pipeline.config.remote_for(definition.id())?;
        definition.install_dependencies(parent.as_ref(), &context)?;
        println!("installed dependencies for {}", definition.id());
    }
    Ok(definitions.len())
}

/// Run the pipeline entries in order until done or interrupted.
///
/// Returns how many filters were run.
fn run_entries(
    pipeline: &Pipeline,
    interrupted: &Arc<AtomicBool>,
    runner: &dyn Runner,
    skip_check: bool,
) -> Result<usize> {
    let mut ran = 0;
    for entry in &pipeline.config.filters {
        let id = required_str(entry, "filter").context("invalid filter entry")?;
        let definition = parse_definition(id, pipeline.config.definition(id)?)?;
        let filter = definition.create_filter_runner(entry)?;
        if filter.is_disabled() {
            info!(filter = %filter.id(), "filter disabled, skipping");
            continue;
        }
        let context = pipeline.context(pipeline.location(id)?, interrupted, runner);
        if !skip_check {
            filter.check(&context)?;
        }
        info!(filter = %filter.id(), "running filter");
        ran += 1;
        match filter.run(&context) {
            Ok(false) => {}
            Ok(true) => {
                info!("pipeline interrupted");
                break;
            }
            // Ctrl-C reaches the child too, so its failure is expected.
            Err(err) if context.is_interrupted() => {
                warn!(filter = %filter.id(), "pipeline interrupted: {err}");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(ran)
}
