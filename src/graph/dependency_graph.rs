//! Dependency graph implementation using petgraph.
//!
//! Provides a directed graph structure for modeling resolved package
//! dependencies, with per-node resolution status, deduplicated edges,
//! cycle detection, and insertion-ordered traversal.

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Outcome of resolving a single package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// The package was discovered and (unless the run stopped early) expanded.
    #[default]
    Resolved,
    /// Fetching the package's dependencies failed.
    Unresolved,
    /// The package sits at the maximum depth and has children that were not explored.
    Truncated,
}

impl NodeStatus {
    /// Returns the marker renderers attach to the node, if any.
    ///
    /// Every renderer derives its annotation from this method, so the
    /// ASCII tree and the image always agree on which nodes are marked.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::Resolved => None,
            Self::Unresolved => Some("unresolved"),
            Self::Truncated => Some("truncated"),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::Unresolved => write!(f, "unresolved"),
            Self::Truncated => write!(f, "truncated"),
        }
    }
}

/// Represents a node in the dependency graph.
///
/// Each node corresponds to exactly one package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Package name (e.g., "libc6", "serde")
    pub name: String,
    /// Shortest discovery distance from the root package (0 = root)
    pub depth: usize,
    /// Resolution status
    pub status: NodeStatus,
    /// Why the lookup failed, for unresolved nodes
    pub error: Option<String>,
}

impl DependencyNode {
    /// Creates a new resolved node at the given depth.
    ///
    /// # Example
    ///
    /// ```rust
    /// use depviz::graph::{DependencyNode, NodeStatus};
    ///
    /// let node = DependencyNode::new("libc6", 1);
    /// assert_eq!(node.name, "libc6");
    /// assert_eq!(node.depth, 1);
    /// assert_eq!(node.status, NodeStatus::Resolved);
    /// ```
    pub fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            status: NodeStatus::Resolved,
            error: None,
        }
    }

    /// Returns true if the node is unresolved.
    pub fn is_unresolved(&self) -> bool {
        self.status == NodeStatus::Unresolved
    }

    /// Returns true if the node was truncated by the depth limit.
    pub fn is_truncated(&self) -> bool {
        self.status == NodeStatus::Truncated
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Represents an edge in the dependency graph.
///
/// Edges point from the dependent package to its dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyEdge {
    /// The target was already on the discovering node's ancestor path
    pub closes_cycle: bool,
}

impl DependencyEdge {
    /// Creates a plain dependency edge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an edge that points back to an ancestor.
    pub fn cyclic() -> Self {
        Self { closes_cycle: true }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.closes_cycle {
            write!(f, "depends on (cycle)")
        } else {
            write!(f, "depends on")
        }
    }
}

/// A directed graph representing resolved package dependencies.
///
/// The graph uses petgraph's `DiGraph` as an arena: nodes are never removed,
/// so node and edge indices follow insertion order and iteration is stable
/// across runs on identical input.
///
/// # Example
///
/// ```rust
/// use depviz::graph::DependencyGraph;
///
/// let mut graph = DependencyGraph::with_root("app");
/// graph.add_package("libfoo", 1);
/// graph.add_package("libbar", 1);
///
/// assert!(graph.add_edge("app", "libfoo"));
/// assert!(graph.add_edge("app", "libbar"));
/// assert!(!graph.add_edge("app", "libbar")); // duplicate
///
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<DependencyNode, DependencyEdge>,
    /// Maps package names to their node indices for O(1) lookup
    node_indices: HashMap<String, NodeIndex>,
    /// The package resolution started from
    root: Option<NodeIndex>,
}

impl DependencyGraph {
    /// Creates a new empty dependency graph with no root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding only the root package at depth 0.
    ///
    /// # Example
    ///
    /// ```rust
    /// use depviz::graph::DependencyGraph;
    ///
    /// let graph = DependencyGraph::with_root("app");
    /// assert_eq!(graph.root().map(|n| n.depth), Some(0));
    /// assert_eq!(graph.node_count(), 1);
    /// ```
    pub fn with_root(name: &str) -> Self {
        let mut graph = Self::new();
        graph.root = Some(graph.add_package(name, 0));
        graph
    }

    /// Adds a package at the given depth.
    ///
    /// If the package already exists its node index is returned and its
    /// depth is lowered when `depth` is smaller, so a node always keeps the
    /// minimum depth over every discovery path.
    pub fn add_package(&mut self, name: &str, depth: usize) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            let node = &mut self.graph[idx];
            if depth < node.depth {
                node.depth = depth;
            }
            return idx;
        }

        let idx = self.graph.add_node(DependencyNode::new(name, depth));
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    /// Adds an edge between two packages.
    ///
    /// Creates an edge from `from` (the dependent) to `to` (the dependency).
    /// Both nodes must already exist in the graph.
    ///
    /// # Returns
    ///
    /// `true` if a new edge was added, `false` if either node doesn't exist
    /// or the edge was already present.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        self.add_edge_with_metadata(from, to, DependencyEdge::new())
    }

    /// Adds an edge with custom metadata.
    ///
    /// Returns `true` if a new edge was added.
    pub fn add_edge_with_metadata(&mut self, from: &str, to: &str, edge: DependencyEdge) -> bool {
        let Some(&from_idx) = self.node_indices.get(from) else {
            return false;
        };
        let Some(&to_idx) = self.node_indices.get(to) else {
            return false;
        };
        self.connect(from_idx, to_idx, edge)
    }

    /// Adds a deduplicated edge between two existing node indices.
    pub(crate) fn connect(&mut self, from: NodeIndex, to: NodeIndex, edge: DependencyEdge) -> bool {
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    /// Marks a package as unresolved, recording why the lookup failed.
    ///
    /// Returns `false` if the package is not in the graph.
    pub fn mark_unresolved(&mut self, name: &str, reason: impl Into<String>) -> bool {
        match self.get_node_mut(name) {
            Some(node) => {
                node.status = NodeStatus::Unresolved;
                node.error = Some(reason.into());
                true
            }
            None => false,
        }
    }

    /// Marks a package as truncated by the depth limit.
    ///
    /// Returns `false` if the package is not in the graph.
    pub fn mark_truncated(&mut self, name: &str) -> bool {
        match self.get_node_mut(name) {
            Some(node) => {
                node.status = NodeStatus::Truncated;
                true
            }
            None => false,
        }
    }

    /// Returns the root node, if the graph has one.
    pub fn root(&self) -> Option<&DependencyNode> {
        self.root.and_then(|idx| self.graph.node_weight(idx))
    }

    /// Returns the root node's index.
    pub fn root_index(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Gets a reference to a dependency node by name.
    pub fn get_node(&self, name: &str) -> Option<&DependencyNode> {
        self.node_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Gets a mutable reference to a dependency node by name.
    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut DependencyNode> {
        self.node_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight_mut(idx))
    }

    /// Looks up the node index of a package.
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices.get(name).copied()
    }

    /// Gets the node stored at an index.
    pub fn node_at(&self, idx: NodeIndex) -> Option<&DependencyNode> {
        self.graph.node_weight(idx)
    }

    /// Returns the outgoing edges of a node in the order they were added.
    ///
    /// petgraph walks adjacency lists newest-first, so the edges are sorted
    /// back into insertion order here.
    pub fn dependency_edges(&self, idx: NodeIndex) -> Vec<(NodeIndex, DependencyEdge)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex, DependencyEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target(), *edge.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges
            .into_iter()
            .map(|(_, target, edge)| (target, edge))
            .collect()
    }

    /// Gets the direct dependencies of a package, in discovery order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use depviz::graph::DependencyGraph;
    ///
    /// let mut graph = DependencyGraph::with_root("app");
    /// graph.add_package("zlib", 1);
    /// graph.add_package("curl", 1);
    /// graph.add_edge("app", "zlib");
    /// graph.add_edge("app", "curl");
    ///
    /// let names: Vec<&str> = graph
    ///     .get_dependencies("app")
    ///     .iter()
    ///     .map(|n| n.name.as_str())
    ///     .collect();
    /// assert_eq!(names, vec!["zlib", "curl"]);
    /// ```
    pub fn get_dependencies(&self, name: &str) -> Vec<&DependencyNode> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        self.dependency_edges(idx)
            .into_iter()
            .filter_map(|(target, _)| self.graph.node_weight(target))
            .collect()
    }

    /// Gets the dependents of a package (incoming edges).
    pub fn get_dependents(&self, name: &str) -> Vec<&DependencyNode> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let mut sources: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source()))
            .collect();
        sources.sort_by_key(|(id, _)| *id);
        sources
            .into_iter()
            .filter_map(|(_, source)| self.graph.node_weight(source))
            .collect()
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.graph.node_weights()
    }

    /// Iterates over all edges in insertion order as `(from, to, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&DependencyNode, &DependencyNode, &DependencyEdge)> {
        self.graph
            .edge_references()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()], edge.weight()))
    }

    /// Returns the edges as `(from, to)` name pairs in insertion order.
    pub fn edge_names(&self) -> Vec<(String, String)> {
        self.edges()
            .map(|(from, to, _)| (from.name.clone(), to.name.clone()))
            .collect()
    }

    /// Checks if the graph contains cycles.
    ///
    /// # Example
    ///
    /// ```rust
    /// use depviz::graph::DependencyGraph;
    ///
    /// let mut graph = DependencyGraph::with_root("a");
    /// graph.add_package("b", 1);
    /// graph.add_edge("a", "b");
    /// graph.add_edge("b", "a");
    ///
    /// assert!(graph.has_cycles());
    /// ```
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Detects and returns all cycles in the graph.
    ///
    /// Each strongly connected component with more than one node, and each
    /// self-loop, is reported as a list of package names in insertion order.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        self.cyclic_components()
            .iter()
            .map(|component| self.names(component))
            .collect()
    }

    /// Returns detailed cycle information including the cycle path.
    ///
    /// The path follows real edges: it starts at the component's earliest
    /// package and walks dependencies inside the component back to it.
    pub fn get_cycle_details(&self) -> Vec<CycleInfo> {
        self.cyclic_components()
            .iter()
            .map(|component| CycleInfo {
                nodes: self.names(component),
                path: self.names(&self.cycle_through(component)),
            })
            .collect()
    }

    /// Cyclic strongly connected components, members sorted by index.
    fn cyclic_components(&self) -> Vec<Vec<NodeIndex>> {
        let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();

        components.sort_by_key(|component| component[0]);
        components
    }

    /// Finds a simple cycle through the first member of `component`.
    ///
    /// Depth-first over edges in insertion order, staying inside the
    /// component. The start node is not repeated at the end.
    fn cycle_through(&self, component: &[NodeIndex]) -> Vec<NodeIndex> {
        let Some(&start) = component.first() else {
            return Vec::new();
        };
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let targets = |idx: NodeIndex| -> Vec<NodeIndex> {
            // Reversed so popping yields insertion order
            self.dependency_edges(idx)
                .into_iter()
                .map(|(target, _)| target)
                .filter(|target| members.contains(target))
                .rev()
                .collect()
        };

        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        let mut pending = vec![targets(start)];

        while let Some(next_targets) = pending.last_mut() {
            let Some(next) = next_targets.pop() else {
                pending.pop();
                path.pop();
                continue;
            };
            if next == start {
                return path;
            }
            if visited.insert(next) {
                path.push(next);
                pending.push(targets(next));
            }
        }

        Vec::new()
    }

    fn names(&self, indices: &[NodeIndex]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&idx| self.graph.node_weight(idx))
            .map(|node| node.name.clone())
            .collect()
    }

    /// Returns a set of package names that are part of any cycle.
    pub fn get_nodes_in_cycles(&self) -> HashSet<String> {
        self.detect_cycles().into_iter().flatten().collect()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Checks if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Checks if a node exists in the graph.
    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Gets nodes at a specific depth.
    pub fn get_nodes_at_depth(&self, depth: usize) -> Vec<&DependencyNode> {
        self.graph
            .node_weights()
            .filter(|node| node.depth == depth)
            .collect()
    }

    /// Gets nodes with the given status.
    pub fn get_nodes_by_status(&self, status: NodeStatus) -> Vec<&DependencyNode> {
        self.graph
            .node_weights()
            .filter(|node| node.status == status)
            .collect()
    }

    /// Counts nodes with the given status.
    pub fn count_status(&self, status: NodeStatus) -> usize {
        self.graph
            .node_weights()
            .filter(|node| node.status == status)
            .count()
    }

    /// Lists every broken structural invariant.
    ///
    /// An empty result means the graph has a depth-0 root, a name index that
    /// matches the node arena, no dangling or duplicate edges, and only
    /// non-empty package names.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        match self.root() {
            Some(root) if root.depth != 0 => {
                violations.push(format!("root '{}' has depth {}", root.name, root.depth));
            }
            Some(_) => {}
            None => violations.push("graph has no root".to_string()),
        }

        if self.node_indices.len() != self.graph.node_count() {
            violations.push(format!(
                "name index holds {} entries for {} nodes",
                self.node_indices.len(),
                self.graph.node_count()
            ));
        }

        for (name, &idx) in &self.node_indices {
            match self.graph.node_weight(idx) {
                Some(node) if node.name == *name => {}
                _ => violations.push(format!("name index entry '{name}' is stale")),
            }
            if name.is_empty() {
                violations.push("empty package name".to_string());
            }
        }

        let mut seen = HashSet::new();
        for edge in self.graph.edge_references() {
            let (from, to) = (edge.source(), edge.target());
            if self.graph.node_weight(from).is_none() || self.graph.node_weight(to).is_none() {
                violations.push(format!("edge {} points outside the node set", edge.id().index()));
            }
            if !seen.insert((from, to)) {
                violations.push(format!(
                    "duplicate edge {} -> {}",
                    self.graph[from].name, self.graph[to].name
                ));
            }
        }

        violations
    }

    /// Exposes the underlying petgraph structure for rendering.
    pub fn as_petgraph(&self) -> &DiGraph<DependencyNode, DependencyEdge> {
        &self.graph
    }
}

impl Index<NodeIndex> for DependencyGraph {
    type Output = DependencyNode;

    fn index(&self, idx: NodeIndex) -> &DependencyNode {
        &self.graph[idx]
    }
}

impl IndexMut<NodeIndex> for DependencyGraph {
    fn index_mut(&mut self, idx: NodeIndex) -> &mut DependencyNode {
        &mut self.graph[idx]
    }
}

/// Information about a detected circular dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// The package names in the cycle's strongly connected component
    pub nodes: Vec<String>,
    /// One closed walk along real edges, without repeating the first package
    pub path: Vec<String>,
}

impl CycleInfo {
    /// Returns a formatted string representation of the cycle path.
    ///
    /// For example: "a -> b -> c -> a"
    pub fn cycle_path(&self) -> String {
        match self.path.first() {
            Some(first) => format!("{} -> {}", self.path.join(" -> "), first),
            None => String::new(),
        }
    }

    /// Returns the number of packages in the cycle.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the cycle is empty (should not happen in practice).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
