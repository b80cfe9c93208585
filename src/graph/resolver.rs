//! Breadth-first dependency resolution.
//!
//! The resolver expands the graph one depth level at a time. Fetches for a
//! level run concurrently (bounded by [`ResolverConfig::concurrency`]) but
//! their results are applied by a single mutator in queue order, so node
//! depths, node order and edge order never depend on which fetch answers
//! first.

use futures::stream::{self, StreamExt};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{DependencyEdge, DependencyGraph, NodeStatus};
use crate::source::{DependencySource, SourceError, SourceResult};

/// Default maximum number of in-flight fetches per level.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default timeout for a single dependency lookup.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum resolution depth.
pub const DEFAULT_MAX_DEPTH: usize = 3;

const CANCELLED_REASON: &str = "resolution cancelled before this package was fetched";

/// Structural errors in the arguments passed to [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The root package name is empty.
    #[error("root package name must not be empty")]
    EmptyRoot,

    /// The maximum depth is zero.
    #[error("maximum depth must be at least 1, got {0}")]
    InvalidMaxDepth(usize),

    /// Zero concurrent fetches would never make progress.
    #[error("fetch concurrency must be at least 1")]
    InvalidConcurrency,
}

/// Tuning knobs for a resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Deepest level at which new packages are added (root = 0)
    pub max_depth: usize,
    /// Maximum number of concurrent fetches
    pub concurrency: usize,
    /// Timeout applied to every lookup
    pub fetch_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    /// Creates a config with the given depth and default concurrency/timeout.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

/// A lookup that failed during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// The package whose dependencies could not be fetched
    pub package: String,
    /// Depth of the package in the graph
    pub depth: usize,
    /// Human-readable failure reason
    pub reason: String,
}

/// The result of one resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The resolved graph
    pub graph: DependencyGraph,
    /// Every failed lookup, in the order the packages were queued
    pub failures: Vec<FetchFailure>,
    /// Whether the run was cancelled before the queue drained
    pub cancelled: bool,
    /// The depth limit the run used
    pub max_depth: usize,
}

impl Resolution {
    /// Returns true if nothing below the root could be resolved.
    ///
    /// That is the case when the root lookup itself failed, or when the root
    /// has direct dependencies and every one of them failed.
    pub fn direct_dependencies_all_failed(&self) -> bool {
        let Some(root) = self.graph.root() else {
            return false;
        };
        if root.is_unresolved() {
            return true;
        }

        let direct = self.graph.get_dependencies(&root.name);
        !direct.is_empty() && direct.iter().all(|node| node.is_unresolved())
    }
}

/// Resolves transitive dependency graphs from a [`DependencySource`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use depviz::graph::{Resolver, ResolverConfig};
/// use depviz::source::FixtureSource;
///
/// # tokio_test_block_on(async {
/// let source = Arc::new(FixtureSource::from_contents("A: B\nB: A\n"));
/// let resolver = Resolver::new(source, ResolverConfig::with_max_depth(3));
/// let resolution = resolver.resolve("A").await.unwrap();
///
/// assert_eq!(resolution.graph.node_count(), 2);
/// assert_eq!(resolution.graph.edge_count(), 2);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub struct Resolver {
    source: Arc<dyn DependencySource>,
    config: ResolverConfig,
    cancel: CancellationToken,
}

impl Resolver {
    /// Creates a resolver over `source`.
    pub fn new(source: Arc<dyn DependencySource>, config: ResolverConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to abort resolution early.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The config this resolver runs with.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves the dependency graph of `root`.
    ///
    /// Individual lookup failures never fail the call: the package is marked
    /// unresolved and resolution continues with its siblings. Cancellation
    /// also returns normally, with [`Resolution::cancelled`] set and every
    /// package that was still waiting to be fetched marked unresolved.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if `root` is empty or the config has a zero
    /// depth or zero concurrency.
    pub async fn resolve(&self, root: &str) -> Result<Resolution, ResolveError> {
        if root.is_empty() {
            return Err(ResolveError::EmptyRoot);
        }
        if self.config.max_depth == 0 {
            return Err(ResolveError::InvalidMaxDepth(self.config.max_depth));
        }
        if self.config.concurrency == 0 {
            return Err(ResolveError::InvalidConcurrency);
        }

        info!(
            "Resolving '{}' from {} (max depth {})",
            root,
            self.source.describe(),
            self.config.max_depth
        );

        let mut state = TraversalState::new(root);
        let mut cancelled = false;
        let mut frontier = state.graph.root_index().into_iter().collect::<Vec<_>>();
        let mut depth = 0;

        while !frontier.is_empty() {
            let names: Vec<String> = frontier
                .iter()
                .map(|&idx| state.graph[idx].name.clone())
                .collect();
            debug!("Expanding {} package(s) at depth {}", names.len(), depth);

            let results = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                results = self.fetch_level(names) => Some(results),
            };

            let Some(results) = results else {
                warn!("Resolution cancelled at depth {}", depth);
                state.abandon(&frontier);
                cancelled = true;
                break;
            };

            let mut next = Vec::new();
            for (&idx, result) in frontier.iter().zip(results) {
                match result {
                    Err(err) => state.record_failure(idx, &err),
                    Ok(deps) if depth < self.config.max_depth => {
                        next.extend(state.expand(idx, &deps));
                    }
                    Ok(deps) => state.probe_frontier(idx, &deps),
                }
            }

            frontier = next;
            depth += 1;
        }

        let graph = state.graph;
        info!(
            "Resolved {} package(s), {} edge(s): {} unresolved, {} truncated",
            graph.node_count(),
            graph.edge_count(),
            graph.count_status(NodeStatus::Unresolved),
            graph.count_status(NodeStatus::Truncated)
        );

        Ok(Resolution {
            graph,
            failures: state.failures,
            cancelled,
            max_depth: self.config.max_depth,
        })
    }

    /// Fetches every package of one level, returning results in input order.
    async fn fetch_level(&self, names: Vec<String>) -> Vec<SourceResult<Vec<String>>> {
        stream::iter(names)
            .map(|name| {
                let source = Arc::clone(&self.source);
                let timeout = self.config.fetch_timeout;
                async move { fetch_with_timeout(source.as_ref(), &name, timeout).await }
            })
            .buffered(self.config.concurrency)
            .collect()
            .await
    }
}

async fn fetch_with_timeout(
    source: &dyn DependencySource,
    package: &str,
    timeout: Duration,
) -> SourceResult<Vec<String>> {
    match tokio::time::timeout(timeout, source.direct_dependencies(package)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            package: package.to_string(),
            after: timeout,
        }),
    }
}

/// Graph plus the discovery-tree bookkeeping used for cycle detection.
struct TraversalState {
    graph: DependencyGraph,
    /// Node -> the node that first discovered it
    parents: HashMap<NodeIndex, NodeIndex>,
    failures: Vec<FetchFailure>,
}

impl TraversalState {
    fn new(root: &str) -> Self {
        Self {
            graph: DependencyGraph::with_root(root),
            parents: HashMap::new(),
            failures: Vec::new(),
        }
    }

    /// Returns true if `candidate` is `node` or lies on its discovery path.
    fn is_ancestor(&self, candidate: NodeIndex, node: NodeIndex) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == candidate {
                return true;
            }
            current = self.parents.get(&idx).copied();
        }
        false
    }

    /// Records the dependencies of `idx` and returns newly discovered packages.
    fn expand(&mut self, idx: NodeIndex, deps: &[String]) -> Vec<NodeIndex> {
        let child_depth = self.graph[idx].depth + 1;
        let mut discovered = Vec::new();

        for dep in deps.iter().filter(|dep| !dep.is_empty()) {
            match self.graph.index_of(dep) {
                Some(existing) => {
                    let closes_cycle = self.is_ancestor(existing, idx);
                    if closes_cycle {
                        debug!("Cycle: {} -> {}", self.graph[idx].name, dep);
                    }
                    self.graph.connect(idx, existing, DependencyEdge { closes_cycle });
                }
                None => {
                    let child = self.graph.add_package(dep, child_depth);
                    self.parents.insert(child, idx);
                    self.graph.connect(idx, child, DependencyEdge::new());
                    discovered.push(child);
                }
            }
        }

        discovered
    }

    /// Handles a package at the depth limit.
    ///
    /// Edges to packages already in the graph are kept; any other dependency
    /// means the package has unexplored children and is marked truncated.
    fn probe_frontier(&mut self, idx: NodeIndex, deps: &[String]) {
        let mut unexplored = 0;

        for dep in deps.iter().filter(|dep| !dep.is_empty()) {
            match self.graph.index_of(dep) {
                Some(existing) => {
                    let closes_cycle = self.is_ancestor(existing, idx);
                    self.graph.connect(idx, existing, DependencyEdge { closes_cycle });
                }
                None => unexplored += 1,
            }
        }

        if unexplored > 0 {
            let node = &mut self.graph[idx];
            debug!("Truncated {} ({} unexplored)", node.name, unexplored);
            node.status = NodeStatus::Truncated;
        }
    }

    fn record_failure(&mut self, idx: NodeIndex, err: &SourceError) {
        let reason = err.to_string();
        let node = &mut self.graph[idx];
        warn!("Could not resolve {}: {}", node.name, reason);

        node.status = NodeStatus::Unresolved;
        node.error = Some(reason.clone());
        self.failures.push(FetchFailure {
            package: node.name.clone(),
            depth: node.depth,
            reason,
        });
    }

    /// Marks packages that were queued but never fetched.
    fn abandon(&mut self, pending: &[NodeIndex]) {
        for &idx in pending {
            let node = &mut self.graph[idx];
            node.status = NodeStatus::Unresolved;
            node.error = Some(CANCELLED_REASON.to_string());
        }
    }
}
