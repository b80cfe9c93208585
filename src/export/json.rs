//! JSON export implementation.
//!
//! Exports the resolved graph in JSON format for machine-readable output.

use super::{ExportData, Exporter};
use crate::graph::NodeStatus;
use crate::render::RenderError;
use serde::Serialize;
use std::io::Write;

/// JSON exporter implementation.
pub struct JsonExporter;

/// Serializable package node for JSON output.
#[derive(Serialize)]
struct JsonNode<'a> {
    name: &'a str,
    depth: usize,
    status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Serializable edge for JSON output.
#[derive(Serialize)]
struct JsonEdge<'a> {
    from: &'a str,
    to: &'a str,
    cycle: bool,
}

/// Serializable cycle info for JSON output.
#[derive(Serialize)]
struct JsonCycle {
    packages: Vec<String>,
    path: String,
}

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    nodes: usize,
    edges: usize,
    resolved: usize,
    unresolved: usize,
    truncated: usize,
    circular_dependencies: usize,
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport<'a> {
    root: &'a str,
    max_depth: usize,
    cancelled: bool,
    summary: JsonSummary,
    nodes: Vec<JsonNode<'a>>,
    edges: Vec<JsonEdge<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    circular_dependencies: Vec<JsonCycle>,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ExportData<'_>, writer: &mut W) -> Result<(), RenderError> {
        let nodes: Vec<JsonNode> = data
            .graph
            .nodes()
            .map(|n| JsonNode {
                name: &n.name,
                depth: n.depth,
                status: n.status,
                error: n.error.as_deref(),
            })
            .collect();

        let edges: Vec<JsonEdge> = data
            .graph
            .edges()
            .map(|(from, to, edge)| JsonEdge {
                from: &from.name,
                to: &to.name,
                cycle: edge.closes_cycle,
            })
            .collect();

        let circular_dependencies: Vec<JsonCycle> = data
            .cycles
            .iter()
            .map(|c| JsonCycle {
                packages: c.nodes.clone(),
                path: c.cycle_path(),
            })
            .collect();

        let export = JsonExport {
            root: data.root_name(),
            max_depth: data.max_depth,
            cancelled: data.cancelled,
            summary: JsonSummary {
                nodes: data.graph.node_count(),
                edges: data.graph.edge_count(),
                resolved: data.resolved_count(),
                unresolved: data.unresolved_count(),
                truncated: data.truncated_count(),
                circular_dependencies: data.cycles.len(),
            },
            nodes,
            edges,
            circular_dependencies,
        };

        serde_json::to_writer_pretty(&mut *writer, &export)?;
        writeln!(writer)?;
        Ok(())
    }
}
