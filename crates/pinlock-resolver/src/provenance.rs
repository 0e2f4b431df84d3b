//! Provenance: which requirers are responsible for each resolved package.
//!
//! Stored as an explicit adjacency multimap keyed by the required package, so
//! packages never hold back-pointers to their dependents. The tracker is part
//! of the resolver's snapshotted state: when a branch is abandoned by
//! backtracking, the edges it recorded vanish with it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use pinlock_core::PackageName;

/// Who declared a requirement: the input manifest itself, a constraints
/// file, or a package.
///
/// Constraints narrow versions but never pull a package in, so they are
/// never recorded as provenance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirer {
    Root,
    Constraint,
    Package(PackageName),
}

impl fmt::Display for Requirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirer::Root => f.write_str("<root>"),
            Requirer::Constraint => f.write_str("<constraint>"),
            Requirer::Package(name) => write!(f, "{name}"),
        }
    }
}

/// Multimap from a package to the set of requirers whose edges were accepted.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    requirers: BTreeMap<PackageName, BTreeSet<Requirer>>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted edge `requirer -> required`. Duplicates are ignored.
    pub fn record(&mut self, required: &PackageName, requirer: Requirer) {
        self.requirers
            .entry(required.clone())
            .or_default()
            .insert(requirer);
    }

    /// Every requirer of `name`, root first, then packages in name order.
    pub fn requirers_of(&self, name: &PackageName) -> impl Iterator<Item = &Requirer> {
        self.requirers.get(name).into_iter().flatten()
    }

    /// Package requirers of `name`, excluding the root.
    pub fn parents_of(&self, name: &PackageName) -> BTreeSet<PackageName> {
        self.requirers_of(name)
            .filter_map(|r| match r {
                Requirer::Package(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// True if the input manifest requires `name` directly.
    pub fn is_direct(&self, name: &PackageName) -> bool {
        self.requirers
            .get(name)
            .is_some_and(|set| set.contains(&Requirer::Root))
    }

    /// Shortest chain of packages from a root requirement down to `name`
    /// (inclusive), following recorded edges backwards. Ties go to the
    /// alphabetically first requirer. Returns just `[name]` when no chain exists.
    pub fn chain_to(&self, name: &PackageName) -> Vec<PackageName> {
        let mut came_from: BTreeMap<PackageName, PackageName> = BTreeMap::new();
        let mut seen: BTreeSet<PackageName> = BTreeSet::new();
        let mut queue: VecDeque<PackageName> = VecDeque::new();
        seen.insert(name.clone());
        queue.push_back(name.clone());

        while let Some(current) = queue.pop_front() {
            if self.is_direct(&current) {
                let mut chain = vec![current.clone()];
                let mut cursor = current;
                while let Some(next) = came_from.get(&cursor) {
                    chain.push(next.clone());
                    cursor = next.clone();
                }
                return chain;
            }
            for parent in self.parents_of(&current) {
                if seen.insert(parent.clone()) {
                    came_from.insert(parent.clone(), current.clone());
                    queue.push_back(parent);
                }
            }
        }
        vec![name.clone()]
    }

    pub fn len(&self) -> usize {
        self.requirers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirers.is_empty()
    }
}
