//! Per-invocation run context handed to `check` and `run`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::runner::Runner;

const MAX_TAG_LEN: usize = 16;

/// Parameters of a single `check` / `run` call.
#[derive(Clone)]
pub struct RunContext<'a> {
    /// Absolute directory the filter is installed in.
    pub absolute_location: PathBuf,
    /// Absolute path of the pipeline's `.regolith` state directory.
    pub dot_regolith_path: PathBuf,
    interrupted: Arc<AtomicBool>,
    runner: &'a dyn Runner,
}

impl<'a> RunContext<'a> {
    pub fn new(
        absolute_location: impl Into<PathBuf>,
        dot_regolith_path: impl Into<PathBuf>,
        interrupted: Arc<AtomicBool>,
        runner: &'a dyn Runner,
    ) -> Self {
        Self {
            absolute_location: absolute_location.into(),
            dot_regolith_path: dot_regolith_path.into(),
            interrupted,
            runner,
        }
    }

    /// Whether the orchestrator asked the pipeline to stop.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn runner(&self) -> &'a dyn Runner {
        self.runner
    }

    /// Root of the pipeline's working directory.
    pub fn working_dir(&self) -> std::io::Result<PathBuf> {
        absolute_working_dir(&self.dot_regolith_path)
    }
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("absolute_location", &self.absolute_location)
            .field("dot_regolith_path", &self.dot_regolith_path)
            .field("interrupted", &self.is_interrupted())
            .finish_non_exhaustive()
    }
}

/// Parameters of an `install_dependencies` call.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    /// Directory local filter scripts are resolved against.
    pub install_root: &'a Path,
    /// Pipeline state directory; remote packs live under its cache.
    pub dot_regolith_path: &'a Path,
    runner: &'a dyn Runner,
}

impl<'a> InstallContext<'a> {
    pub fn new(install_root: &'a Path, dot_regolith_path: &'a Path, runner: &'a dyn Runner) -> Self {
        Self {
            install_root,
            dot_regolith_path,
            runner,
        }
    }

    pub fn runner(&self) -> &'a dyn Runner {
        self.runner
    }
}

/// Append `relative` to `base`, ignoring any root or drive prefix so the
/// result never replaces `base`.
pub fn join_under(base: &Path, relative: &str) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::ParentDir => joined.push(".."),
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
        }
    }
    joined
}

/// Absolute form of `<dot_regolith>/tmp`.
pub fn absolute_working_dir(dot_regolith_path: &Path) -> std::io::Result<PathBuf> {
    std::path::absolute(dot_regolith_path.join("tmp"))
}

/// Short label for a filter id, used to attribute child output in logs.
///
/// Ids longer than 16 characters keep their first 13 characters followed
/// by `...`.
pub fn short_filter_name(id: &str) -> String {
    if id.chars().count() <= MAX_TAG_LEN {
        return id.to_string();
    }
    let head: String = id.chars().take(MAX_TAG_LEN - 3).collect();
    format!("{head}...")
}
