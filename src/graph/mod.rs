//! Graph module for dependency relationship modeling and resolution.
//!
//! This module provides the [`DependencyGraph`] arena that holds one node
//! per package, and the [`Resolver`] that fills it breadth-first from a
//! [`DependencySource`](crate::source::DependencySource).
//!
//! # Example
//!
//! ```rust
//! use depviz::graph::{DependencyGraph, NodeStatus};
//!
//! let mut graph = DependencyGraph::with_root("curl");
//! graph.add_package("libcurl4", 1);
//! graph.add_package("zlib1g", 1);
//! graph.add_edge("curl", "libcurl4");
//! graph.add_edge("curl", "zlib1g");
//! graph.mark_truncated("libcurl4");
//!
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.count_status(NodeStatus::Truncated), 1);
//! ```

mod dependency_graph;
mod resolver;

pub use dependency_graph::{CycleInfo, DependencyEdge, DependencyGraph, DependencyNode, NodeStatus};
pub use resolver::{
    FetchFailure, Resolution, ResolveError, Resolver, ResolverConfig, DEFAULT_CONCURRENCY,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_DEPTH,
};
