//! Core dependency resolution algorithm: incremental constraint propagation
//! over a first-discovered edge queue, highest-satisfying version selection,
//! and chronological backtracking over a stack of state snapshots.

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use pinlock_core::config::GlobalConfig;
use pinlock_core::requirement::RequirementError;
use pinlock_core::{PackageName, Requirement, Version, VersionConstraint};
use pinlock_index::{IndexError, PackageIndex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cache::IndexSession;
use crate::conflict::{ConflictChain, ConstraintSource};
use crate::graph::{DependencyGraph, ResolvedPackage};
use crate::provenance::{Provenance, Requirer};

/// Why a resolution run failed.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// A requirement string could not be parsed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedRequirement(#[from] RequirementError),

    /// The index has no record of a required package.
    #[error("package `{name}` was not found in the index (required via {})", format_chain(.chain))]
    #[diagnostic(help("check the spelling, or make sure the index lists this package"))]
    UnknownPackage {
        name: PackageName,
        /// Packages from a root requirement down to `name`.
        chain: Vec<PackageName>,
    },

    /// A transient index failure. Not retried here; the caller may rerun.
    #[error("index unavailable while querying `{name}`: {reason}")]
    #[diagnostic(help("this is usually transient; retry the run"))]
    IndexUnavailable { name: PackageName, reason: String },

    /// Every candidate combination was tried and none satisfied all constraints.
    #[error("unresolvable constraints: {conflict}")]
    #[diagnostic(help("relax one of the listed constraints"))]
    UnresolvableConstraint { conflict: ConflictChain },

    /// The index listed a version string that does not parse.
    #[error("invalid version `{version}` listed for `{name}`: {reason}")]
    VersionParse {
        name: PackageName,
        version: String,
        reason: String,
    },

    /// A package in the index declares a requirement that does not parse.
    #[error("`{name}` {version} declares a malformed requirement (required via {}): {source}", format_chain(.chain))]
    #[diagnostic(help("fix the requirement string in the index entry"))]
    InvalidDeclaredRequirement {
        name: PackageName,
        version: String,
        /// Packages from a root requirement down to `name`.
        chain: Vec<PackageName>,
        source: RequirementError,
    },

    /// The backtracking budget ran out before a solution or a proof of failure.
    #[error("gave up after {0} backtracking steps")]
    #[diagnostic(help("raise `max-backtracks` in the config, or pin more packages"))]
    BacktrackLimit(usize),

    /// The run was cancelled between steps.
    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    /// The conflict chain, for unresolvable constraints.
    pub fn conflict(&self) -> Option<&ConflictChain> {
        match self {
            ResolveError::UnresolvableConstraint { conflict } => Some(conflict),
            _ => None,
        }
    }
}

fn format_chain(chain: &[PackageName]) -> String {
    if chain.len() <= 1 {
        return "the input manifest".to_string();
    }
    let names: Vec<&str> = chain.iter().map(|n| n.as_str()).collect();
    names.join(" -> ")
}

/// Tunables for one resolution run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub max_backtracks: usize,
    /// Per-query index timeout.
    pub timeout: Duration,
    /// Concurrent index queries allowed in the prefetch pool.
    pub jobs: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from(&GlobalConfig::default())
    }
}

impl From<&GlobalConfig> for ResolveOptions {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            max_backtracks: config.resolver.max_backtracks,
            timeout: Duration::from_secs(config.index.timeout_secs),
            jobs: config.index.jobs,
        }
    }
}

/// A discovered requirement: `requirer` needs `required` within `constraint`.
#[derive(Debug, Clone)]
pub struct RequirementEdge {
    pub requirer: Requirer,
    pub required: PackageName,
    pub constraint: VersionConstraint,
}

/// Everything the search mutates. Cloned wholesale at each decision point.
#[derive(Debug, Clone, Default)]
struct State {
    queue: VecDeque<RequirementEdge>,
    accumulated: BTreeMap<PackageName, Vec<(Requirer, VersionConstraint)>>,
    chosen: BTreeMap<PackageName, Version>,
    provenance: Provenance,
}

impl State {
    fn constraint_on(&self, name: &PackageName) -> VersionConstraint {
        self.accumulated
            .get(name)
            .into_iter()
            .flatten()
            .fold(VersionConstraint::any(), |acc, (_, c)| acc.intersect(c))
    }
}

/// A decision point: the state before `package` was pinned, and the
/// candidates not yet tried, highest first.
#[derive(Debug)]
struct Frame {
    package: PackageName,
    requirer: Requirer,
    snapshot: State,
    remaining: VecDeque<Version>,
}

/// Resolves root requirements against a package index.
pub struct Resolver {
    index: Arc<dyn PackageIndex>,
    options: ResolveOptions,
    cancel: CancellationToken,
    constraints: Vec<Requirement>,
}

impl Resolver {
    pub fn new(index: Arc<dyn PackageIndex>) -> Self {
        Self {
            index,
            options: ResolveOptions::default(),
            cancel: CancellationToken::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Abort the run at the next step once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Narrow the versions of any package the roots pull in, without
    /// pulling anything in. Typically the pins of a previous lock file.
    pub fn with_constraints(mut self, constraints: Vec<Requirement>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Parse and resolve root requirement strings.
    pub async fn resolve(&self, requirements: &[String]) -> Result<DependencyGraph, ResolveError> {
        let roots = requirements
            .iter()
            .map(|r| Requirement::parse(r))
            .collect::<Result<Vec<_>, _>>()?;
        self.resolve_requirements(roots).await
    }

    /// Resolve already-parsed root requirements.
    pub async fn resolve_requirements(
        &self,
        roots: Vec<Requirement>,
    ) -> Result<DependencyGraph, ResolveError> {
        let session = IndexSession::new(self.index.clone(), self.options.timeout, self.options.jobs);
        let search = Search::new(
            &session,
            &self.options,
            &self.cancel,
            roots,
            &self.constraints,
        );
        search.run().await
    }
}

/// Resolve `requirements` against `index` with default options.
pub async fn resolve(
    requirements: &[String],
    index: Arc<dyn PackageIndex>,
) -> Result<DependencyGraph, ResolveError> {
    Resolver::new(index).resolve(requirements).await
}

struct Search<'a> {
    session: &'a IndexSession,
    options: &'a ResolveOptions,
    cancel: &'a CancellationToken,
    state: State,
    frames: Vec<Frame>,
    first_conflict: Option<ConflictChain>,
    backtracks: usize,
}

impl<'a> Search<'a> {
    fn new(
        session: &'a IndexSession,
        options: &'a ResolveOptions,
        cancel: &'a CancellationToken,
        roots: Vec<Requirement>,
        constraints: &[Requirement],
    ) -> Self {
        let mut accumulated: BTreeMap<PackageName, Vec<(Requirer, VersionConstraint)>> =
            BTreeMap::new();
        for c in constraints {
            accumulated
                .entry(c.name.clone())
                .or_default()
                .push((Requirer::Constraint, c.constraint.clone()));
        }
        let queue = roots
            .into_iter()
            .map(|r| RequirementEdge {
                requirer: Requirer::Root,
                required: r.name,
                constraint: r.constraint,
            })
            .collect();
        Self {
            session,
            options,
            cancel,
            state: State {
                queue,
                accumulated,
                ..State::default()
            },
            frames: Vec::new(),
            first_conflict: None,
            backtracks: 0,
        }
    }

    async fn run(mut self) -> Result<DependencyGraph, ResolveError> {
        self.session
            .prefetch(self.state.queue.iter().map(|e| &e.required));

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("resolution cancelled");
                return Err(ResolveError::Cancelled);
            }
            let Some(edge) = self.state.queue.pop_front() else {
                break;
            };
            self.process(edge).await?;
        }

        Ok(self.finish())
    }

    async fn process(&mut self, edge: RequirementEdge) -> Result<(), ResolveError> {
        tracing::trace!(
            requirer = %edge.requirer,
            package = %edge.required,
            constraint = %edge.constraint,
            "processing edge"
        );
        let target = edge.required;
        self.state
            .accumulated
            .entry(target.clone())
            .or_default()
            .push((edge.requirer.clone(), edge.constraint));
        let constraint = self.state.constraint_on(&target);

        match self.state.chosen.get(&target).cloned() {
            Some(version) if constraint.matches(&version) => {
                self.state.provenance.record(&target, edge.requirer);
                Ok(())
            }
            Some(version) => {
                let conflict = self.conflict(&target, Some(version));
                self.backtrack(conflict).await
            }
            None => {
                let mut candidates = self.candidates(&target, &constraint, &edge.requirer).await?;
                let Some(first) = candidates.pop_front() else {
                    let conflict = self.conflict(&target, None);
                    return self.backtrack(conflict).await;
                };
                self.frames.push(Frame {
                    package: target.clone(),
                    requirer: edge.requirer.clone(),
                    snapshot: self.state.clone(),
                    remaining: candidates,
                });
                self.apply(&target, first, edge.requirer).await
            }
        }
    }

    /// Versions of `target` admitted by `constraint`, highest first.
    ///
    /// Pre-releases are only offered when the constraint names one or when
    /// no final release qualifies.
    async fn candidates(
        &self,
        target: &PackageName,
        constraint: &VersionConstraint,
        requirer: &Requirer,
    ) -> Result<VecDeque<Version>, ResolveError> {
        let versions = self
            .session
            .versions(target)
            .await
            .map_err(|e| self.index_error(e, requirer))?;

        let mut matching: Vec<Version> = versions
            .iter()
            .filter(|v| constraint.matches(v))
            .cloned()
            .collect();
        if !constraint.mentions_prerelease() && matching.iter().any(|v| !v.is_prerelease()) {
            matching.retain(|v| !v.is_prerelease());
        }
        matching.sort_by(|a, b| b.cmp_exact(a));
        matching.dedup_by(|a, b| a.cmp_exact(b) == Ordering::Equal);
        Ok(matching.into())
    }

    /// Pin `package` at `version` and enqueue its own requirements.
    async fn apply(
        &mut self,
        package: &PackageName,
        version: Version,
        requirer: Requirer,
    ) -> Result<(), ResolveError> {
        tracing::debug!(package = %package, version = %version, "selected version");
        let requirements = self
            .session
            .requirements(package, &version)
            .await
            .map_err(|e| self.index_error(e, &requirer))?;

        self.state.chosen.insert(package.clone(), version);
        self.state.provenance.record(package, requirer);

        let mut edges: Vec<RequirementEdge> = requirements
            .iter()
            .map(|r| RequirementEdge {
                requirer: Requirer::Package(package.clone()),
                required: r.name.clone(),
                constraint: r.constraint.clone(),
            })
            .collect();
        edges.sort_by(|a, b| {
            a.required
                .cmp(&b.required)
                .then_with(|| a.constraint.to_string().cmp(&b.constraint.to_string()))
        });

        let chosen = &self.state.chosen;
        self.session.prefetch(
            edges
                .iter()
                .map(|e| &e.required)
                .filter(|name| !chosen.contains_key(*name)),
        );
        self.state.queue.extend(edges);
        Ok(())
    }

    /// Unwind to the most recent decision with an untried candidate and take it.
    async fn backtrack(&mut self, conflict: ConflictChain) -> Result<(), ResolveError> {
        tracing::debug!(package = %conflict.package, "conflict, backtracking");
        if self.first_conflict.is_none() {
            tracing::warn!("{conflict}");
            self.first_conflict = Some(conflict.clone());
        }

        loop {
            let Some(frame) = self.frames.last_mut() else {
                let conflict = self.first_conflict.take().unwrap_or(conflict);
                return Err(ResolveError::UnresolvableConstraint { conflict });
            };
            let Some(next) = frame.remaining.pop_front() else {
                self.frames.pop();
                continue;
            };

            self.backtracks += 1;
            if self.backtracks > self.options.max_backtracks {
                return Err(ResolveError::BacktrackLimit(self.options.max_backtracks));
            }

            let package = frame.package.clone();
            let requirer = frame.requirer.clone();
            self.state = frame.snapshot.clone();
            tracing::debug!(package = %package, version = %next, "retrying with next candidate");
            return self.apply(&package, next, requirer).await;
        }
    }

    fn conflict(&self, package: &PackageName, chosen: Option<Version>) -> ConflictChain {
        let sources = self
            .state
            .accumulated
            .get(package)
            .into_iter()
            .flatten()
            .map(|(requirer, constraint)| {
                let (requirer_version, chain) = match requirer {
                    Requirer::Root | Requirer::Constraint => (None, Vec::new()),
                    Requirer::Package(name) => (
                        self.state.chosen.get(name).cloned(),
                        self.state.provenance.chain_to(name),
                    ),
                };
                ConstraintSource {
                    requirer: requirer.clone(),
                    requirer_version,
                    constraint: constraint.clone(),
                    chain,
                }
            })
            .collect();
        ConflictChain {
            package: package.clone(),
            chosen,
            sources,
        }
    }

    /// Root-to-`name` chain through `requirer`.
    fn chain_through(&self, requirer: &Requirer, name: &PackageName) -> Vec<PackageName> {
        let mut chain = match requirer {
            Requirer::Root | Requirer::Constraint => Vec::new(),
            Requirer::Package(parent) => self.state.provenance.chain_to(parent),
        };
        chain.push(name.clone());
        chain
    }

    fn index_error(&self, err: IndexError, requirer: &Requirer) -> ResolveError {
        match err {
            IndexError::UnknownPackage(name) => ResolveError::UnknownPackage {
                chain: self.chain_through(requirer, &name),
                name,
            },
            IndexError::Unavailable { name, reason } => {
                ResolveError::IndexUnavailable { name, reason }
            }
            IndexError::InvalidVersion {
                name,
                version,
                reason,
            } => ResolveError::VersionParse {
                name,
                version,
                reason,
            },
            IndexError::InvalidRequirement {
                name,
                version,
                source,
            } => ResolveError::InvalidDeclaredRequirement {
                chain: self.chain_through(requirer, &name),
                name,
                version,
                source,
            },
        }
    }

    fn finish(self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, version) in &self.state.chosen {
            graph.insert(ResolvedPackage {
                name: name.clone(),
                version: version.clone(),
                parents: self.state.provenance.parents_of(name),
                direct: self.state.provenance.is_direct(name),
                constraint: self.state.constraint_on(name),
            });
        }
        tracing::info!(
            packages = graph.len(),
            backtracks = self.backtracks,
            queries = self.session.query_count(),
            "resolution complete"
        );
        graph
    }
}
