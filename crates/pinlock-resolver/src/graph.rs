//! The resolved dependency graph and its traversal reports.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use pinlock_core::{PackageName, Version, VersionConstraint};

/// A package pinned to exactly one version.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Version,
    /// Packages whose accepted requirements pulled this one in. Root excluded.
    pub parents: BTreeSet<PackageName>,
    /// Declared directly by the input manifest.
    pub direct: bool,
    /// Intersection of every accepted constraint on this package.
    pub constraint: VersionConstraint,
}

impl fmt::Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// One resolved version per package name, plus provenance.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    packages: BTreeMap<PackageName, ResolvedPackage>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `package.name`.
    pub fn insert(&mut self, package: ResolvedPackage) {
        self.packages.insert(package.name.clone(), package);
    }

    pub fn get(&self, name: &PackageName) -> Option<&ResolvedPackage> {
        self.packages.get(name)
    }

    /// Packages in name order.
    pub fn packages(&self) -> impl Iterator<Item = &ResolvedPackage> {
        self.packages.values()
    }

    /// Packages that `name` requires, in name order.
    pub fn dependencies_of(&self, name: &PackageName) -> Vec<&ResolvedPackage> {
        self.packages
            .values()
            .filter(|p| p.parents.contains(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Build a petgraph view: a root node plus one node per package, with an
    /// edge from every requirer to what it requires.
    fn view(&self) -> GraphView<'_> {
        let mut graph: DiGraph<Option<&ResolvedPackage>, ()> = DiGraph::new();
        let root = graph.add_node(None);
        let mut index = HashMap::new();
        for package in self.packages.values() {
            index.insert(&package.name, graph.add_node(Some(package)));
        }
        for package in self.packages.values() {
            let to = index[&package.name];
            if package.direct {
                graph.add_edge(root, to, ());
            }
            for parent in &package.parents {
                if let Some(&from) = index.get(parent) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        GraphView { graph, index, root }
    }

    /// Print the dependency tree below the input manifest, labelled `root_label`.
    pub fn print_tree(&self, root_label: &str, max_depth: Option<usize>) -> String {
        let view = self.view();
        let mut output = format!("{root_label}\n");
        let mut visited = HashSet::new();
        visited.insert(view.root);

        let children = view.neighbors(view.root, Direction::Outgoing);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            view.print_subtree(
                &mut output,
                child,
                "",
                i == count - 1,
                1,
                max_depth,
                &mut visited,
                Direction::Outgoing,
                root_label,
            );
        }
        output
    }

    /// Shortest path from the input manifest to `target`, in name order on ties.
    pub fn find_path(&self, target: &PackageName) -> Option<Vec<&ResolvedPackage>> {
        let view = self.view();
        let &goal = view.index.get(target)?;

        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([view.root]);
        let mut seen = HashSet::from([view.root]);
        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = Vec::new();
                let mut cursor = goal;
                while let Some(package) = view.graph[cursor] {
                    path.push(package);
                    match came_from.get(&cursor) {
                        Some(&prev) => cursor = prev,
                        None => break,
                    }
                }
                path.reverse();
                return Some(path);
            }
            for next in view.neighbors(current, Direction::Outgoing) {
                if seen.insert(next) {
                    came_from.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Inverted tree: `target` followed by everything that requires it, up to
    /// the input manifest.
    pub fn print_inverted_tree(&self, target: &PackageName, root_label: &str) -> String {
        let view = self.view();
        let mut output = String::new();
        let Some(&idx) = view.index.get(target) else {
            return output;
        };
        output.push_str(&format!("{}\n", view.label(idx, root_label)));

        let mut visited = HashSet::new();
        visited.insert(idx);
        let dependents = view.neighbors(idx, Direction::Incoming);
        let count = dependents.len();
        for (i, dep) in dependents.into_iter().enumerate() {
            view.print_subtree(
                &mut output,
                dep,
                "",
                i == count - 1,
                1,
                None,
                &mut visited,
                Direction::Incoming,
                root_label,
            );
        }
        output
    }
}

struct GraphView<'g> {
    graph: DiGraph<Option<&'g ResolvedPackage>, ()>,
    index: HashMap<&'g PackageName, NodeIndex>,
    root: NodeIndex,
}

impl<'g> GraphView<'g> {
    fn label(&self, idx: NodeIndex, root_label: &str) -> String {
        match self.graph[idx] {
            Some(package) => package.to_string(),
            None => root_label.to_string(),
        }
    }

    /// Neighbours in `dir`, root first, then by package name.
    fn neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| match dir {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect();
        out.sort_by_key(|&n| self.graph[n].map(|p| p.name.clone()));
        out.dedup();
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
        dir: Direction,
        root_label: &str,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!(
            "{prefix}{connector}{}\n",
            self.label(idx, root_label)
        ));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let next = self.neighbors(idx, dir);
        let count = next.len();
        for (i, child) in next.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
                dir,
                root_label,
            );
        }

        visited.remove(&idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PackageName {
        PackageName::new(s).unwrap()
    }

    fn make(n: &str, version: &str, parents: &[&str], direct: bool) -> ResolvedPackage {
        ResolvedPackage {
            name: name(n),
            version: Version::parse(version).unwrap(),
            parents: parents.iter().map(|p| name(p)).collect(),
            direct,
            constraint: VersionConstraint::any(),
        }
    }

    fn sample() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.insert(make("a", "2.0", &[], true));
        g.insert(make("b", "1.0", &[], true));
        g.insert(make("c", "1.5", &["a", "b"], false));
        g.insert(make("d", "0.1", &["c"], false));
        g
    }

    #[test]
    fn dependencies_of_uses_parents() {
        let g = sample();
        let deps: Vec<String> = g
            .dependencies_of(&name("a"))
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(deps, vec!["c==1.5"]);
    }

    #[test]
    fn tree_printing() {
        let g = sample();
        let tree = g.print_tree("requirements.in", None);
        let expected = "\
requirements.in
├── a==2.0
│   └── c==1.5
│       └── d==0.1
└── b==1.0
    └── c==1.5
        └── d==0.1
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn tree_respects_depth() {
        let g = sample();
        let tree = g.print_tree("requirements.in", Some(1));
        assert!(tree.contains("a==2.0"));
        assert!(!tree.contains("c==1.5"));
    }

    #[test]
    fn find_path_exists() {
        let g = sample();
        let path = g.find_path(&name("d")).unwrap();
        let names: Vec<&str> = path.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn find_path_not_found() {
        let g = sample();
        assert!(g.find_path(&name("missing")).is_none());
    }

    #[test]
    fn inverted_tree() {
        let g = sample();
        let inv = g.print_inverted_tree(&name("d"), "requirements.in");
        let expected = "\
d==0.1
└── c==1.5
    ├── a==2.0
    │   └── requirements.in
    └── b==1.0
        └── requirements.in
";
        assert_eq!(inv, expected);
    }

    #[test]
    fn cycles_terminate() {
        let mut g = DependencyGraph::new();
        g.insert(make("a", "1.0", &["b"], true));
        g.insert(make("b", "1.0", &["a"], false));
        let tree = g.print_tree("requirements.in", None);
        assert!(tree.contains("b==1.0"));
        assert_eq!(g.find_path(&name("b")).unwrap().len(), 2);
    }
}
