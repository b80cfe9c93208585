//! ASCII tree rendering for resolved dependency graphs.
//!
//! The graph is walked depth-first from the root, children in the order
//! they were discovered. A package is expanded the first time it is
//! printed; later occurrences, and targets of cycle-closing edges, are
//! printed as reference leaves marked `(*)`.
//!
//! ```text
//! curl
//! ├── libc6
//! ├── libcurl4 [truncated]
//! │   └── libc6 (*)
//! └── zlib1g [unresolved: package 'zlib1g' not found in repository index]
//! ```

use crossterm::style::Stylize;
use std::collections::HashSet;
use std::io::Write;

use super::RenderError;
use crate::graph::{DependencyGraph, NodeStatus};

/// A single printed line of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    /// Package name
    pub name: String,
    /// Depth in the printed tree (0 = root)
    pub depth: usize,
    /// Status of the package
    pub status: NodeStatus,
    /// Failure reason for unresolved packages
    pub error: Option<String>,
    /// The package was already expanded elsewhere or closes a cycle
    pub is_reference: bool,
    /// Whether this is the last child of its parent
    pub is_last_child: bool,
    /// `is_last_child` of every ancestor below the root, outermost first
    pub ancestors_are_last: Vec<bool>,
}

impl TreeLine {
    /// Build the tree prefix (indentation and branch lines)
    pub fn tree_prefix(&self) -> String {
        let mut prefix = String::new();

        for &is_last in &self.ancestors_are_last {
            if is_last {
                prefix.push_str("    ");
            } else {
                prefix.push_str("│   ");
            }
        }

        if self.depth > 0 {
            if self.is_last_child {
                prefix.push_str("└── ");
            } else {
                prefix.push_str("├── ");
            }
        }

        prefix
    }

    /// The status marker printed after the name, without styling.
    pub fn marker(&self) -> Option<String> {
        let marker = self.status.marker()?;
        Some(match (&self.status, &self.error) {
            (NodeStatus::Unresolved, Some(reason)) => format!("[{marker}: {reason}]"),
            _ => format!("[{marker}]"),
        })
    }
}

/// Renders a dependency graph as an indented ASCII tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiTreeRenderer {
    colored: bool,
}

impl AsciiTreeRenderer {
    /// Create a renderer that prints plain text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable terminal colors for markers.
    pub fn with_colors(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Flatten the graph into printable lines.
    ///
    /// Uses an explicit stack so deep graphs do not grow the call stack.
    pub fn flatten(graph: &DependencyGraph) -> Vec<TreeLine> {
        struct Frame {
            idx: petgraph::graph::NodeIndex,
            depth: usize,
            via_cycle: bool,
            is_last_child: bool,
            ancestors_are_last: Vec<bool>,
        }

        let mut lines = Vec::new();
        let Some(root) = graph.root_index() else {
            return lines;
        };

        let mut expanded = HashSet::new();
        let mut stack = vec![Frame {
            idx: root,
            depth: 0,
            via_cycle: false,
            is_last_child: true,
            ancestors_are_last: Vec::new(),
        }];

        while let Some(frame) = stack.pop() {
            let node = &graph[frame.idx];
            let is_reference = frame.via_cycle || expanded.contains(&frame.idx);

            lines.push(TreeLine {
                name: node.name.clone(),
                depth: frame.depth,
                status: node.status,
                error: node.error.clone(),
                is_reference,
                is_last_child: frame.is_last_child,
                ancestors_are_last: frame.ancestors_are_last.clone(),
            });

            if is_reference {
                continue;
            }
            expanded.insert(frame.idx);

            let mut child_ancestors = frame.ancestors_are_last;
            if frame.depth > 0 {
                child_ancestors.push(frame.is_last_child);
            }

            let children = graph.dependency_edges(frame.idx);
            let count = children.len();
            // Reverse so the first child is popped first
            for (i, (target, edge)) in children.into_iter().enumerate().rev() {
                stack.push(Frame {
                    idx: target,
                    depth: frame.depth + 1,
                    via_cycle: edge.closes_cycle,
                    is_last_child: i == count - 1,
                    ancestors_are_last: child_ancestors.clone(),
                });
            }
        }

        lines
    }

    /// Write the tree, followed by a legend when markers were used.
    pub fn render<W: Write>(&self, graph: &DependencyGraph, writer: &mut W) -> Result<(), RenderError> {
        let lines = Self::flatten(graph);

        for line in &lines {
            write!(writer, "{}{}", line.tree_prefix(), line.name)?;
            if let Some(marker) = line.marker() {
                write!(writer, " {}", self.style_marker(line.status, marker))?;
            }
            if line.is_reference {
                write!(writer, " (*)")?;
            }
            writeln!(writer)?;
        }

        let legend = legend(&lines);
        if !legend.is_empty() {
            writeln!(writer)?;
            for entry in legend {
                writeln!(writer, "{entry}")?;
            }
        }

        Ok(())
    }

    /// Render the tree into a string.
    pub fn render_to_string(&self, graph: &DependencyGraph) -> Result<String, RenderError> {
        let mut buffer = Vec::new();
        self.render(graph, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            RenderError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn style_marker(&self, status: NodeStatus, marker: String) -> String {
        if !self.colored {
            return marker;
        }
        match status {
            NodeStatus::Unresolved => marker.red().to_string(),
            NodeStatus::Truncated => marker.yellow().to_string(),
            NodeStatus::Resolved => marker,
        }
    }
}

fn legend(lines: &[TreeLine]) -> Vec<&'static str> {
    let mut legend = Vec::new();
    if lines.iter().any(|l| l.is_reference) {
        legend.push("(*) = already shown above or part of a cycle");
    }
    if lines.iter().any(|l| l.status == NodeStatus::Truncated) {
        legend.push("[truncated] = not expanded, maximum depth reached");
    }
    if lines.iter().any(|l| l.status == NodeStatus::Unresolved) {
        legend.push("[unresolved] = dependencies could not be fetched");
    }
    legend
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(graph: &DependencyGraph) -> String {
        AsciiTreeRenderer::new().render_to_string(graph).unwrap()
    }

    fn create_test_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::with_root("project");
        for (name, depth) in [("dep-a", 1), ("dep-b", 1), ("sub-1", 2), ("sub-2", 2)] {
            graph.add_package(name, depth);
        }
        graph.add_edge("project", "dep-a");
        graph.add_edge("project", "dep-b");
        graph.add_edge("dep-a", "sub-1");
        graph.add_edge("dep-a", "sub-2");
        graph
    }

    #[test]
    fn test_flatten_order_and_depth() {
        let lines = AsciiTreeRenderer::flatten(&create_test_graph());
        let names: Vec<(&str, usize)> = lines.iter().map(|l| (l.name.as_str(), l.depth)).collect();
        assert_eq!(
            names,
            vec![("project", 0), ("dep-a", 1), ("sub-1", 2), ("sub-2", 2), ("dep-b", 1)]
        );
    }

    #[test]
    fn test_render_tree_shape() {
        let expected = "\
project
├── dep-a
│   ├── sub-1
│   └── sub-2
└── dep-b
";
        assert_eq!(render(&create_test_graph()), expected);
    }

    #[test]
    fn test_nested_last_child_prefix() {
        let mut graph = DependencyGraph::with_root("r");
        graph.add_package("a", 1);
        graph.add_package("b", 2);
        graph.add_package("c", 3);
        graph.add_edge("r", "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");

        let expected = "\
r
└── a
    └── b
        └── c
";
        assert_eq!(render(&graph), expected);
    }

    #[test]
    fn test_repeated_node_is_reference() {
        let mut graph = DependencyGraph::with_root("app");
        graph.add_package("a", 1);
        graph.add_package("b", 1);
        graph.add_package("shared", 2);
        graph.add_package("leaf", 3);
        graph.add_edge("app", "a");
        graph.add_edge("app", "b");
        graph.add_edge("a", "shared");
        graph.add_edge("b", "shared");
        graph.add_edge("shared", "leaf");

        let output = render(&graph);
        assert!(output.contains("│   └── shared\n"));
        assert!(output.contains("    └── shared (*)\n"));
        // The subtree is printed once
        assert_eq!(output.matches("leaf").count(), 1);
        assert!(output.contains("(*) = already shown above"));
    }

    #[test]
    fn test_cycle_renders_as_reference() {
        let mut graph = DependencyGraph::with_root("A");
        graph.add_package("B", 1);
        graph.add_edge("A", "B");
        graph.add_edge_with_metadata("B", "A", crate::graph::DependencyEdge::cyclic());

        let expected = "\
A
└── B
    └── A (*)

(*) = already shown above or part of a cycle
";
        assert_eq!(render(&graph), expected);
    }

    #[test]
    fn test_status_markers() {
        let mut graph = DependencyGraph::with_root("app");
        graph.add_package("deep", 1);
        graph.add_package("broken", 1);
        graph.add_edge("app", "deep");
        graph.add_edge("app", "broken");
        graph.mark_truncated("deep");
        graph.mark_unresolved("broken", "HTTP 404");

        let output = render(&graph);
        assert!(output.contains("├── deep [truncated]\n"));
        assert!(output.contains("└── broken [unresolved: HTTP 404]\n"));
        assert!(output.contains("[truncated] = not expanded"));
        assert!(output.contains("[unresolved] = dependencies could not be fetched"));
    }

    #[test]
    fn test_root_only() {
        let graph = DependencyGraph::with_root("solo");
        assert_eq!(render(&graph), "solo\n");
    }

    #[test]
    fn test_empty_graph_renders_nothing() {
        assert_eq!(render(&DependencyGraph::new()), "");
    }

    #[test]
    fn test_colored_markers_keep_text() {
        let mut graph = DependencyGraph::with_root("app");
        graph.mark_unresolved("app", "timeout");

        let output = AsciiTreeRenderer::new()
            .with_colors(true)
            .render_to_string(&graph)
            .unwrap();
        assert!(output.starts_with("app "));
        assert!(output.contains("[unresolved: timeout]"));
    }

    #[test]
    fn test_tree_prefix() {
        let line = TreeLine {
            name: "x".to_string(),
            depth: 3,
            status: NodeStatus::Resolved,
            error: None,
            is_reference: false,
            is_last_child: false,
            ancestors_are_last: vec![false, true],
        };
        assert_eq!(line.tree_prefix(), "│       ├── ");
        assert_eq!(line.marker(), None);
    }
}
