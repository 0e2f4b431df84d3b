use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pinlock_core::{PackageName, Requirement, Version};
use pinlock_index::{IndexError, MemoryIndex, PackageIndex};
use pinlock_resolver::provenance::Requirer;
use pinlock_resolver::{resolve, DependencyGraph, ResolveError, ResolveOptions, Resolver};
use tokio_util::sync::CancellationToken;

fn name(s: &str) -> PackageName {
    PackageName::new(s).unwrap()
}

fn memory(entries: &[(&str, &str, &[&str])]) -> MemoryIndex {
    let mut index = MemoryIndex::new();
    for (n, v, reqs) in entries {
        index.insert(name(n), *v, reqs.iter().map(|r| r.to_string()).collect());
    }
    index
}

fn index(entries: &[(&str, &str, &[&str])]) -> Arc<dyn PackageIndex> {
    Arc::new(memory(entries))
}

fn roots(reqs: &[&str]) -> Vec<String> {
    reqs.iter().map(|r| r.to_string()).collect()
}

fn version_of(graph: &DependencyGraph, pkg: &str) -> String {
    graph.get(&name(pkg)).unwrap().version.to_string()
}

fn parents_of(graph: &DependencyGraph, pkg: &str) -> Vec<String> {
    graph
        .get(&name(pkg))
        .unwrap()
        .parents
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// Diamond: both roots constrain `c` from opposite sides.
fn diamond() -> Arc<dyn PackageIndex> {
    index(&[
        ("a", "1.0", &[]),
        ("a", "2.0", &["c>=1.0"]),
        ("b", "1.0", &["c<2.0"]),
        ("c", "0.9", &[]),
        ("c", "1.0", &[]),
        ("c", "1.5", &[]),
        ("c", "2.0", &[]),
    ])
}

/// Counts queries per package and forwards to an in-memory index.
struct CountingIndex {
    inner: MemoryIndex,
    version_calls: Mutex<HashMap<PackageName, usize>>,
    requirement_calls: Mutex<HashMap<(PackageName, String), usize>>,
}

impl CountingIndex {
    fn new(inner: MemoryIndex) -> Self {
        Self {
            inner,
            version_calls: Mutex::new(HashMap::new()),
            requirement_calls: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PackageIndex for CountingIndex {
    async fn available_versions(&self, name: &PackageName) -> Result<Vec<Version>, IndexError> {
        *self
            .version_calls
            .lock()
            .unwrap()
            .entry(name.clone())
            .or_default() += 1;
        self.inner.available_versions(name).await
    }

    async fn declared_requirements(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Vec<Requirement>, IndexError> {
        *self
            .requirement_calls
            .lock()
            .unwrap()
            .entry((name.clone(), version.to_string()))
            .or_default() += 1;
        self.inner.declared_requirements(name, version).await
    }
}

/// Never answers within any reasonable timeout.
struct SlowIndex;

#[async_trait]
impl PackageIndex for SlowIndex {
    async fn available_versions(&self, _name: &PackageName) -> Result<Vec<Version>, IndexError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    async fn declared_requirements(
        &self,
        _name: &PackageName,
        _version: &Version,
    ) -> Result<Vec<Requirement>, IndexError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }
}

/// Cancels `token` as soon as a requirement list is requested.
struct CancellingIndex {
    inner: MemoryIndex,
    token: CancellationToken,
}

#[async_trait]
impl PackageIndex for CancellingIndex {
    async fn available_versions(&self, name: &PackageName) -> Result<Vec<Version>, IndexError> {
        self.inner.available_versions(name).await
    }

    async fn declared_requirements(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Vec<Requirement>, IndexError> {
        self.token.cancel();
        self.inner.declared_requirements(name, version).await
    }
}

#[tokio::test]
async fn highest_version_satisfying_both_sides() {
    let graph = resolve(&roots(&["a", "b"]), diamond()).await.unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(version_of(&graph, "a"), "2.0");
    assert_eq!(version_of(&graph, "b"), "1.0");
    assert_eq!(version_of(&graph, "c"), "1.5");
    assert_eq!(parents_of(&graph, "c"), vec!["a", "b"]);
    assert!(!graph.get(&name("c")).unwrap().direct);
    assert_eq!(
        graph.get(&name("c")).unwrap().constraint.to_string(),
        ">=1.0,<2.0"
    );
}

#[tokio::test]
async fn conflicting_pins_name_both_requirers() {
    let idx = index(&[
        ("a", "1.0", &["c==1.0"]),
        ("b", "1.0", &["c==2.0"]),
        ("c", "1.0", &[]),
        ("c", "2.0", &[]),
    ]);
    let err = resolve(&roots(&["a==1.0", "b==1.0"]), idx)
        .await
        .unwrap_err();
    let conflict = err.conflict().expect("expected an unresolvable constraint");
    assert_eq!(conflict.package, name("c"));
    assert_eq!(conflict.requirers(), vec![&name("a"), &name("b")]);

    let message = err.to_string();
    assert!(message.contains("`c`"), "got: {message}");
    assert!(message.contains("a 1.0 requires c ==1.0"), "got: {message}");
    assert!(message.contains("b 1.0 requires c ==2.0"), "got: {message}");
}

#[tokio::test]
async fn single_root_without_dependencies() {
    let graph = resolve(&roots(&["a"]), index(&[("a", "1.0", &[])]))
        .await
        .unwrap();
    assert_eq!(graph.len(), 1);
    let a = graph.get(&name("a")).unwrap();
    assert!(a.direct);
    assert!(a.parents.is_empty());
}

#[tokio::test]
async fn backtracks_to_an_older_parent() {
    let idx = index(&[
        ("a", "1.0", &["c==1.0"]),
        ("a", "2.0", &["c==2.0", "d"]),
        ("b", "1.0", &["c<2"]),
        ("c", "1.0", &[]),
        ("c", "2.0", &[]),
        ("d", "1.0", &[]),
    ]);
    let graph = resolve(&roots(&["a", "b"]), idx).await.unwrap();
    assert_eq!(version_of(&graph, "a"), "1.0");
    assert_eq!(version_of(&graph, "c"), "1.0");
    assert_eq!(parents_of(&graph, "c"), vec!["a", "b"]);
    // `d` only came from the abandoned a 2.0 branch.
    assert!(graph.get(&name("d")).is_none());
}

#[tokio::test]
async fn root_constraint_with_no_candidates() {
    let err = resolve(&roots(&["a>=9"]), index(&[("a", "1.0", &[])]))
        .await
        .unwrap_err();
    let conflict = err.conflict().unwrap();
    assert_eq!(conflict.package, name("a"));
    assert!(conflict.chosen.is_none());
    assert_eq!(conflict.sources.len(), 1);
    assert_eq!(conflict.sources[0].requirer, Requirer::Root);
}

#[tokio::test]
async fn cycles_resolve_once() {
    let idx = index(&[("a", "1.0", &["b"]), ("b", "1.0", &["a>=1"])]);
    let graph = resolve(&roots(&["a"]), idx).await.unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(parents_of(&graph, "a"), vec!["b"]);
    assert_eq!(parents_of(&graph, "b"), vec!["a"]);
    assert!(graph.get(&name("a")).unwrap().direct);
}

#[tokio::test]
async fn every_version_satisfies_its_constraint() {
    let graph = resolve(&roots(&["a", "b"]), diamond()).await.unwrap();
    for package in graph.packages() {
        assert!(
            package.constraint.matches(&package.version),
            "{package} violates {}",
            package.constraint
        );
    }
}

#[tokio::test]
async fn resolution_is_deterministic() {
    let first = resolve(&roots(&["b", "a"]), diamond()).await.unwrap();
    let second = resolve(&roots(&["b", "a"]), diamond()).await.unwrap();
    assert_eq!(pinlock_resolver::emit(&first), pinlock_resolver::emit(&second));
}

#[tokio::test]
async fn relocking_with_emitted_pins_is_stable() {
    let graph = resolve(&roots(&["a", "b"]), diamond()).await.unwrap();
    let text = pinlock_resolver::emit(&graph);
    let pins = pinlock_core::lockfile::read_pins(&text).unwrap();
    assert_eq!(pins.len(), graph.len());

    // A newer `c` inside both bounds appears; the pins keep the old one.
    let grown = index(&[
        ("a", "1.0", &[]),
        ("a", "2.0", &["c>=1.0"]),
        ("b", "1.0", &["c<2.0"]),
        ("c", "0.9", &[]),
        ("c", "1.0", &[]),
        ("c", "1.5", &[]),
        ("c", "1.9", &[]),
        ("c", "2.0", &[]),
    ]);
    let again = Resolver::new(grown)
        .with_constraints(pins)
        .resolve(&roots(&["a", "b"]))
        .await
        .unwrap();
    assert_eq!(version_of(&again, "c"), "1.5");
    assert!(!again.get(&name("c")).unwrap().direct);
    assert_eq!(pinlock_resolver::emit(&again), text);
}

#[tokio::test]
async fn constraints_do_not_pull_packages_in() {
    let idx = index(&[("a", "1.0", &[]), ("z", "1.0", &[])]);
    let constraints = vec![
        Requirement::parse("a==1.0").unwrap(),
        Requirement::parse("z==1.0").unwrap(),
    ];
    let graph = Resolver::new(idx)
        .with_constraints(constraints)
        .resolve(&roots(&["a"]))
        .await
        .unwrap();
    assert_eq!(graph.len(), 1);
    assert!(graph.get(&name("z")).is_none());
    assert!(graph.get(&name("a")).unwrap().direct);
}

#[tokio::test]
async fn conflicting_constraint_is_reported() {
    let constraints = vec![Requirement::parse("c==2.0").unwrap()];
    let err = Resolver::new(diamond())
        .with_constraints(constraints)
        .resolve(&roots(&["b"]))
        .await
        .unwrap_err();
    let conflict = err.conflict().expect("conflict chain");
    assert_eq!(conflict.package, name("c"));
    assert!(conflict
        .sources
        .iter()
        .any(|s| s.requirer == Requirer::Constraint));
    assert!(err.to_string().contains("constraints file requires c ==2.0"));
}

#[tokio::test]
async fn unknown_transitive_package_reports_chain() {
    let idx = index(&[("a", "1.0", &["b"]), ("b", "1.0", &["missing>=1"])]);
    let err = resolve(&roots(&["a"]), idx).await.unwrap_err();
    match err {
        ResolveError::UnknownPackage { name: pkg, chain } => {
            assert_eq!(pkg, name("missing"));
            assert_eq!(chain, vec![name("a"), name("b"), name("missing")]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_root_package() {
    let err = resolve(&roots(&["nope"]), index(&[])).await.unwrap_err();
    assert!(
        matches!(&err, ResolveError::UnknownPackage { chain, .. } if chain == &vec![name("nope")]),
        "got: {err}"
    );
    assert!(err.to_string().contains("the input manifest"));
}

#[tokio::test]
async fn malformed_root_requirement_fails_before_any_query() {
    let counting = Arc::new(CountingIndex::new(memory(&[("a", "1.0", &[])])));
    let err = resolve(&roots(&["a", "b[extra]>=1"]), counting.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::MalformedRequirement(_)), "got: {err}");
    assert!(counting.version_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_index_requirement() {
    let idx = index(&[("a", "1.0", &["b"]), ("b", "1.0", &["c>>1"])]);
    let err = resolve(&roots(&["a"]), idx).await.unwrap_err();
    let text = err.to_string();
    match err {
        ResolveError::InvalidDeclaredRequirement {
            name: pkg,
            version,
            chain,
            source,
        } => {
            assert_eq!(pkg, name("b"));
            assert_eq!(version, "1.0");
            assert_eq!(chain, vec![name("a"), name("b")]);
            assert_eq!(source.input, "c>>1");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(text.contains("`b` 1.0"), "got: {text}");
    assert!(text.contains("a -> b"), "got: {text}");
}

#[tokio::test]
async fn invalid_version_in_index_is_fatal() {
    let idx = index(&[("a", "1.0", &[]), ("a", "one-point-oh", &[])]);
    let err = resolve(&roots(&["a"]), idx).await.unwrap_err();
    match err {
        ResolveError::VersionParse { name: pkg, version, .. } => {
            assert_eq!(pkg, name("a"));
            assert_eq!(version, "one-point-oh");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn slow_index_times_out() {
    let options = ResolveOptions {
        timeout: Duration::from_millis(20),
        ..ResolveOptions::default()
    };
    let err = Resolver::new(Arc::new(SlowIndex))
        .with_options(options)
        .resolve(&roots(&["a"]))
        .await
        .unwrap_err();
    match err {
        ResolveError::IndexUnavailable { name: pkg, reason } => {
            assert_eq!(pkg, name("a"));
            assert!(reason.contains("20ms"), "got: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let err = Resolver::new(diamond())
        .with_cancellation(token)
        .resolve(&roots(&["a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled));
}

#[tokio::test]
async fn cancelled_mid_run() {
    let token = CancellationToken::new();
    let idx = Arc::new(CancellingIndex {
        inner: memory(&[("a", "1.0", &["b"]), ("b", "1.0", &[])]),
        token: token.clone(),
    });
    let err = Resolver::new(idx)
        .with_cancellation(token)
        .resolve(&roots(&["a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled));
}

#[tokio::test]
async fn index_queries_are_memoized() {
    let counting = Arc::new(CountingIndex::new(memory(&[
        ("a", "1.0", &["c==1.0"]),
        ("a", "2.0", &["c==2.0"]),
        ("b", "1.0", &["c<2"]),
        ("c", "1.0", &[]),
        ("c", "2.0", &[]),
    ])));
    let graph = resolve(&roots(&["a", "b", "a>=1"]), counting.clone())
        .await
        .unwrap();
    assert_eq!(version_of(&graph, "a"), "1.0");

    for (pkg, calls) in counting.version_calls.lock().unwrap().iter() {
        assert_eq!(*calls, 1, "versions of {pkg} fetched {calls} times");
    }
    for ((pkg, version), calls) in counting.requirement_calls.lock().unwrap().iter() {
        assert_eq!(*calls, 1, "requirements of {pkg} {version} fetched {calls} times");
    }
}

#[tokio::test]
async fn transitive_prerelease_opt_in() {
    let idx = index(&[
        ("a", "1.0", &["b>=2.0rc1"]),
        ("b", "1.9", &[]),
        ("b", "2.0rc1", &[]),
    ]);
    let graph = resolve(&roots(&["a"]), idx).await.unwrap();
    assert_eq!(version_of(&graph, "b"), "2.0rc1");
}

#[tokio::test]
async fn search_budget_from_options() {
    let idx = index(&[
        ("a", "1.0", &["c==1.0"]),
        ("a", "2.0", &["c==1.0"]),
        ("b", "1.0", &["c==2.0"]),
        ("c", "1.0", &[]),
        ("c", "2.0", &[]),
    ]);
    let options = ResolveOptions {
        max_backtracks: 0,
        ..ResolveOptions::default()
    };
    let err = Resolver::new(idx)
        .with_options(options)
        .resolve(&roots(&["a", "b"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::BacktrackLimit(0)), "got: {err}");
}

#[tokio::test]
async fn names_are_normalized_across_sources() {
    let idx = index(&[
        ("Zope.Interface", "5.0", &[]),
        ("web", "1.0", &["zope_interface>=4"]),
    ]);
    let graph = resolve(&roots(&["web", "ZOPE-interface"]), idx)
        .await
        .unwrap();
    assert_eq!(graph.len(), 2);
    let zope = graph.get(&name("zope-interface")).unwrap();
    assert!(zope.direct);
    assert_eq!(parents_of(&graph, "zope-interface"), vec!["web"]);
}
