//! The resolved logical dependency tree of a project.
//!
//! Despite the name this is a graph: npm dedupes installs, so one node can be
//! required by several parents, and cycles (`a -> b -> a`) are legal.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use semver::Version;

use crate::package::Package;

/// One installed package in the logical tree.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TreeNode {
    pub name: String,
    pub version: Version,
    pub dev: bool,
    pub optional: bool,
    pub bundled: bool,
}

impl TreeNode {
    /// A production node (not dev, optional, or bundled).
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            dev: false,
            optional: false,
            bundled: false,
        }
    }

    pub fn package(&self) -> Package {
        Package::new(self.name.clone(), self.version.clone())
    }

    /// Whether this node only exists for development, optional, or bundled installs.
    pub fn is_excluded(&self) -> bool {
        self.dev || self.optional || self.bundled
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A rooted dependency graph backed by petgraph.
#[derive(Debug, Clone)]
pub struct LogicalTree {
    graph: DiGraph<TreeNode, ()>,
    root: NodeIndex,
}

impl LogicalTree {
    /// Create a tree whose root is the project itself.
    pub fn new(project_name: impl Into<String>, project_version: Version) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(TreeNode::new(project_name, project_version));
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Add an installed package. Nodes are not deduplicated: the same
    /// `name@version` may be installed at several locations.
    pub fn add_node(&mut self, node: TreeNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Record that `from` requires `to`.
    pub fn add_dependency(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn node(&self, idx: NodeIndex) -> &TreeNode {
        &self.graph[idx]
    }

    /// Direct dependencies of a node, ordered by name then version.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        children.sort_by(|a, b| {
            let (a, b) = (&self.graph[*a], &self.graph[*b]);
            (&a.name, &a.version).cmp(&(&b.name, &b.version))
        });
        children
    }

    /// Direct dependencies of the project.
    pub fn top_level(&self) -> Vec<NodeIndex> {
        self.dependencies_of(self.root)
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() <= 1
    }

    /// The subgraph reachable from the root through production nodes only.
    pub fn production(&self) -> LogicalTree {
        let root_node = &self.graph[self.root];
        let mut out = LogicalTree::new(root_node.name.clone(), root_node.version.clone());
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        mapping.insert(self.root, out.root);

        let mut queue = VecDeque::from([self.root]);
        while let Some(old) = queue.pop_front() {
            let new_parent = mapping[&old];
            for child in self.dependencies_of(old) {
                let node = &self.graph[child];
                if node.is_excluded() {
                    continue;
                }
                let new_child = match mapping.get(&child) {
                    Some(&idx) => idx,
                    None => {
                        let idx = out.add_node(node.clone());
                        mapping.insert(child, idx);
                        queue.push_back(child);
                        idx
                    }
                };
                out.add_dependency(new_parent, new_child);
            }
        }
        out
    }
}
