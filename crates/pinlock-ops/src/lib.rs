//! High-level operations behind the `pinlock` commands.

pub mod ops_compile;
pub mod ops_tree;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pinlock_core::config::GlobalConfig;
use pinlock_core::lockfile;
use pinlock_core::manifest::InputManifest;
use pinlock_index::MemoryIndex;
use pinlock_resolver::{DependencyGraph, ResolveError, ResolveOptions, Resolver};
use pinlock_util::errors::PinlockError;
use pinlock_util::progress;
use tokio_util::sync::CancellationToken;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_backtracks: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub jobs: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, config: &mut GlobalConfig) {
        if let Some(n) = self.max_backtracks {
            config.resolver.max_backtracks = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.index.timeout_secs = secs;
        }
        if let Some(jobs) = self.jobs {
            config.index.jobs = jobs;
        }
    }
}

/// Read `input`, load the index at `index`, and resolve. The pins of every
/// lock file in `constraints` narrow the result without adding packages.
pub async fn resolve_input(
    input: &Path,
    index: &Path,
    constraints: &[PathBuf],
    config: &GlobalConfig,
    cancel: &CancellationToken,
) -> miette::Result<DependencyGraph> {
    let manifest = InputManifest::from_path(input)?;
    let roots = manifest
        .parse_requirements()
        .map_err(|e| PinlockError::Manifest {
            message: format!("{}: {e}", input.display()),
        })?;
    let mut pins = Vec::new();
    for path in constraints {
        pins.extend(lockfile::read_pins_from_path(path)?);
    }
    let index = MemoryIndex::from_path(index)?;

    progress::status(
        "Resolving",
        &format!("{} requirements from {}", roots.len(), input.display()),
    );
    let spinner = progress::spinner("resolving dependencies");
    let result = Resolver::new(Arc::new(index))
        .with_options(ResolveOptions::from(config))
        .with_cancellation(cancel.clone())
        .with_constraints(pins)
        .resolve_requirements(roots)
        .await;
    spinner.finish_and_clear();

    result.map_err(|e| match e {
        ResolveError::Cancelled => PinlockError::Cancelled.into(),
        other => miette::Report::new(other),
    })
}
