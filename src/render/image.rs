//! Graph image rendering through Graphviz.
//!
//! The graph is serialized to DOT with petgraph's [`Dot`] writer. DOT output
//! files are written directly; raster and vector formats are produced by
//! piping the DOT text through the `dot` executable.

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::RenderError;
use crate::graph::{DependencyEdge, DependencyGraph, DependencyNode, NodeStatus};

type Graph = DiGraph<DependencyNode, DependencyEdge>;

/// Output formats supported by the image renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Graphviz source text
    Dot,
    Png,
    Svg,
    Pdf,
    Jpeg,
    Gif,
}

impl ImageFormat {
    /// Picks the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "dot" | "gv" => Ok(Self::Dot),
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            _ => Err(RenderError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// The `-T` argument Graphviz expects for this format.
    pub fn graphviz_name(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.graphviz_name())
    }
}

/// Renders a dependency graph to an image file.
#[derive(Debug, Clone)]
pub struct ImageRenderer {
    output: PathBuf,
    dot_command: PathBuf,
}

impl ImageRenderer {
    /// Create a renderer writing to `output`, using `dot` from `PATH`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            dot_command: PathBuf::from("dot"),
        }
    }

    /// Use a specific Graphviz `dot` executable.
    pub fn with_dot_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.dot_command = command.into();
        self
    }

    /// The file this renderer writes.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Write the graph to the output file in the format its extension names.
    pub fn render(&self, graph: &DependencyGraph) -> Result<ImageFormat, RenderError> {
        let format = ImageFormat::from_path(&self.output)?;
        let dot = to_dot(graph);

        match format {
            ImageFormat::Dot => {
                fs::write(&self.output, dot).map_err(|source| RenderError::Write {
                    path: self.output.clone(),
                    source,
                })?;
            }
            _ => self.run_graphviz(&dot, format)?,
        }

        info!("Wrote {} graph to {}", format, self.output.display());
        Ok(format)
    }

    fn run_graphviz(&self, dot: &str, format: ImageFormat) -> Result<(), RenderError> {
        debug!(
            "Running {} -T{} -o {}",
            self.dot_command.display(),
            format.graphviz_name(),
            self.output.display()
        );

        let mut child = Command::new(&self.dot_command)
            .arg(format!("-T{}", format.graphviz_name()))
            .arg("-o")
            .arg(&self.output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => RenderError::GraphvizUnavailable {
                    command: self.dot_command.clone(),
                },
                _ => RenderError::Io(source),
            })?;

        // Dropping stdin closes the pipe. A broken pipe means dot exited
        // early; its status and stderr explain why.
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(dot.as_bytes()) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("Graphviz closed its input early");
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RenderError::Io(err));
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(RenderError::GraphvizFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Serializes the graph as Graphviz DOT.
///
/// Nodes are labelled with the package name plus the status marker;
/// truncated nodes are dashed, unresolved nodes red, the root bold, and
/// cycle-closing edges dashed.
pub fn to_dot(graph: &DependencyGraph) -> String {
    let root = graph.root_index();
    let edge_getter = |_: &Graph, edge: EdgeReference<'_, DependencyEdge>| {
        edge_attributes(edge.weight())
    };
    let node_getter = |_: &Graph, (idx, node): (NodeIndex, &DependencyNode)| {
        node_attributes(node, Some(idx) == root)
    };

    let dot = Dot::with_attr_getters(
        graph.as_petgraph(),
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &edge_getter,
        &node_getter,
    );
    format!("{dot}")
}

fn node_attributes(node: &DependencyNode, is_root: bool) -> String {
    let mut label = escape(&node.name);
    if let Some(marker) = node.status.marker() {
        label.push_str(&format!("\\n[{marker}]"));
    }

    let mut attributes = vec![format!("label = \"{label}\""), "shape = box".to_string()];
    match node.status {
        NodeStatus::Resolved => {}
        NodeStatus::Truncated => {
            attributes.push("style = dashed".to_string());
            attributes.push("color = gray40".to_string());
        }
        NodeStatus::Unresolved => {
            attributes.push("color = red".to_string());
            attributes.push("fontcolor = red".to_string());
        }
    }
    if let Some(error) = &node.error {
        attributes.push(format!("tooltip = \"{}\"", escape(error)));
    }
    if is_root {
        attributes.push("penwidth = 2".to_string());
    }
    attributes.join(", ")
}

fn edge_attributes(edge: &DependencyEdge) -> String {
    if edge.closes_cycle {
        "style = dashed, color = gray40".to_string()
    } else {
        String::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
