//! Resolution session cache for avoiding redundant index queries.
//!
//! One [`IndexSession`] lives for exactly one resolution run. Every
//! `(package)` version listing and every `(package, version)` requirement
//! list is fetched at most once; later requests, including ones racing with
//! a background prefetch, wait on the same cell. Prefetches run on a bounded
//! worker pool and never touch resolver state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pinlock_core::{PackageName, Requirement, Version};
use pinlock_index::{IndexError, PackageIndex};
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;

type VersionsCell = Arc<OnceCell<Result<Arc<Vec<Version>>, IndexError>>>;
type RequirementsCell = Arc<OnceCell<Result<Arc<Vec<Requirement>>, IndexError>>>;

/// Memoizing, timeout-enforcing front for a [`PackageIndex`].
pub struct IndexSession {
    index: Arc<dyn PackageIndex>,
    timeout: Duration,
    permits: Arc<Semaphore>,
    queries: Arc<AtomicUsize>,
    versions: Mutex<HashMap<PackageName, VersionsCell>>,
    requirements: Mutex<HashMap<(PackageName, String), RequirementsCell>>,
    prefetches: Mutex<JoinSet<()>>,
}

impl IndexSession {
    pub fn new(index: Arc<dyn PackageIndex>, timeout: Duration, jobs: usize) -> Self {
        Self {
            index,
            timeout,
            permits: Arc::new(Semaphore::new(jobs.max(1))),
            queries: Arc::new(AtomicUsize::new(0)),
            versions: Mutex::new(HashMap::new()),
            requirements: Mutex::new(HashMap::new()),
            prefetches: Mutex::new(JoinSet::new()),
        }
    }

    /// Number of queries actually sent to the underlying index.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Available versions of `name`, fetched once per session.
    pub async fn versions(&self, name: &PackageName) -> Result<Arc<Vec<Version>>, IndexError> {
        let cell = self.versions_cell(name).0;
        cell.get_or_init(|| {
            fetch_versions(
                self.index.clone(),
                name.clone(),
                self.timeout,
                self.permits.clone(),
                self.queries.clone(),
            )
        })
        .await
        .clone()
    }

    /// Requirements declared by `name` at `version`, fetched once per session.
    pub async fn requirements(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Arc<Vec<Requirement>>, IndexError> {
        let key = (name.clone(), version.to_string());
        let cell = {
            let mut map = lock(&self.requirements);
            map.entry(key).or_default().clone()
        };
        cell.get_or_init(|| {
            fetch_requirements(
                self.index.clone(),
                name.clone(),
                version.clone(),
                self.timeout,
                self.permits.clone(),
                self.queries.clone(),
            )
        })
        .await
        .clone()
    }

    /// Start fetching version listings for `names` in the background.
    ///
    /// Names already cached or in flight are skipped. Failures are kept in the
    /// cache and surface when the resolver asks for that package.
    pub fn prefetch<'a>(&self, names: impl IntoIterator<Item = &'a PackageName>) {
        let mut tasks = lock(&self.prefetches);
        reap(&mut tasks);
        for name in names {
            let (cell, fresh) = self.versions_cell(name);
            if !fresh {
                continue;
            }
            tracing::trace!(package = %name, "prefetching versions");
            let index = self.index.clone();
            let name = name.clone();
            let timeout = self.timeout;
            let permits = self.permits.clone();
            let queries = self.queries.clone();
            tasks.spawn(async move {
                let _ = cell
                    .get_or_init(|| fetch_versions(index, name, timeout, permits, queries))
                    .await;
            });
        }
    }

    /// Prefetch tasks spawned and not yet reaped.
    pub fn prefetches_in_flight(&self) -> usize {
        let mut tasks = lock(&self.prefetches);
        reap(&mut tasks);
        tasks.len()
    }

    fn versions_cell(&self, name: &PackageName) -> (VersionsCell, bool) {
        let mut map = lock(&self.versions);
        match map.get(name) {
            Some(cell) => (cell.clone(), false),
            None => {
                let cell = VersionsCell::default();
                map.insert(name.clone(), cell.clone());
                (cell, true)
            }
        }
    }
}

/// Drop finished prefetch tasks so the set only holds live ones.
fn reap(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            tracing::debug!(error = %e, "prefetch task failed");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn fetch_versions(
    index: Arc<dyn PackageIndex>,
    name: PackageName,
    timeout: Duration,
    permits: Arc<Semaphore>,
    queries: Arc<AtomicUsize>,
) -> Result<Arc<Vec<Version>>, IndexError> {
    let _permit = permits.acquire().await;
    queries.fetch_add(1, Ordering::Relaxed);
    match tokio::time::timeout(timeout, index.available_versions(&name)).await {
        Ok(result) => result.map(Arc::new),
        Err(_) => Err(timed_out(name, timeout)),
    }
}

async fn fetch_requirements(
    index: Arc<dyn PackageIndex>,
    name: PackageName,
    version: Version,
    timeout: Duration,
    permits: Arc<Semaphore>,
    queries: Arc<AtomicUsize>,
) -> Result<Arc<Vec<Requirement>>, IndexError> {
    let _permit = permits.acquire().await;
    queries.fetch_add(1, Ordering::Relaxed);
    match tokio::time::timeout(timeout, index.declared_requirements(&name, &version)).await {
        Ok(result) => result.map(Arc::new),
        Err(_) => Err(timed_out(name, timeout)),
    }
}

fn timed_out(name: PackageName, timeout: Duration) -> IndexError {
    IndexError::Unavailable {
        name,
        reason: format!("no response within {}ms", timeout.as_millis()),
    }
}
