//! Export functionality for resolution results.
//!
//! The resolved graph can be written as JSON next to the rendered artifact,
//! for tooling that wants the nodes and edges rather than a picture.

pub mod json;

use crate::graph::{CycleInfo, DependencyGraph, NodeStatus, Resolution};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::render::RenderError;

pub use json::JsonExporter;

/// Data container for export operations.
///
/// Holds everything an exporter needs from one resolution run.
#[derive(Debug, Clone)]
pub struct ExportData<'a> {
    /// The resolved graph
    pub graph: &'a DependencyGraph,
    /// Depth limit used for the run
    pub max_depth: usize,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Detected circular dependencies
    pub cycles: Vec<CycleInfo>,
}

impl<'a> ExportData<'a> {
    /// Collect export data from a resolution.
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            graph: &resolution.graph,
            max_depth: resolution.max_depth,
            cancelled: resolution.cancelled,
            cycles: resolution.graph.get_cycle_details(),
        }
    }

    /// Name of the root package, empty for an empty graph.
    pub fn root_name(&self) -> &str {
        self.graph.root().map(|n| n.name.as_str()).unwrap_or_default()
    }

    /// Count of resolved packages
    pub fn resolved_count(&self) -> usize {
        self.graph.count_status(NodeStatus::Resolved)
    }

    /// Count of packages whose lookup failed
    pub fn unresolved_count(&self) -> usize {
        self.graph.count_status(NodeStatus::Unresolved)
    }

    /// Count of packages cut off by the depth limit
    pub fn truncated_count(&self) -> usize {
        self.graph.count_status(NodeStatus::Truncated)
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData<'_>, writer: &mut W) -> Result<(), RenderError>;
}

/// Export data to a string.
pub fn export_to_string<E: Exporter>(exporter: &E, data: &ExportData<'_>) -> Result<String, RenderError> {
    let mut buffer = Vec::new();
    exporter.export(data, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| RenderError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Export data to a file, replacing any existing content.
pub fn export_to_file<E: Exporter>(
    exporter: &E,
    data: &ExportData<'_>,
    path: &Path,
) -> Result<(), RenderError> {
    let to_write_error = |source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_write_error)?;
    let mut writer = BufWriter::new(file);
    exporter.export(data, &mut writer)?;
    writer.flush().map_err(to_write_error)
}
