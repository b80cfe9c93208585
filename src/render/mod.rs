//! Output renderers for resolved dependency graphs.
//!
//! Two renderers are available:
//!
//! - [`AsciiTreeRenderer`] - an indented tree written to stdout
//! - [`ImageRenderer`] - a Graphviz image written to a file
//!
//! Both take their node markers from [`NodeStatus::marker`](crate::graph::NodeStatus::marker),
//! so a package flagged truncated or unresolved in one output is flagged
//! the same way in the other.

pub mod ascii;
pub mod image;

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use crate::graph::DependencyGraph;

pub use ascii::{AsciiTreeRenderer, TreeLine};
pub use image::{to_dot, ImageFormat, ImageRenderer};

/// Errors that can occur while producing output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Writing to a stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Writing the output file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output file extension names no supported format.
    #[error(
        "unsupported output format for {}: expected .png, .svg, .pdf, .jpg, .gif or .dot",
        .path.display()
    )]
    UnsupportedFormat { path: PathBuf },

    /// The Graphviz `dot` executable could not be started.
    #[error("Graphviz executable '{}' not found; install Graphviz or write a .dot file instead", .command.display())]
    GraphvizUnavailable { command: PathBuf },

    /// Graphviz ran but reported an error.
    #[error("Graphviz failed ({status}): {stderr}")]
    GraphvizFailed { status: String, stderr: String },

    /// Serializing the JSON export failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// The renderer selected for a run.
#[derive(Debug, Clone)]
pub enum Renderer {
    /// Print an ASCII tree to stdout
    AsciiTree(AsciiTreeRenderer),
    /// Write an image file
    Image(ImageRenderer),
}

impl Renderer {
    /// ASCII tree on stdout, colored when stdout is a terminal.
    pub fn ascii_for_stdout() -> Self {
        Self::AsciiTree(AsciiTreeRenderer::new().with_colors(io::stdout().is_terminal()))
    }

    /// Image written to `output`.
    pub fn image(output: impl Into<PathBuf>) -> Self {
        Self::Image(ImageRenderer::new(output))
    }

    /// Produce the artifact for `graph`.
    pub fn render(&self, graph: &DependencyGraph) -> Result<(), RenderError> {
        match self {
            Self::AsciiTree(renderer) => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                renderer.render(graph, &mut handle)
            }
            Self::Image(renderer) => renderer.render(graph).map(|_| ()),
        }
    }

    /// Short description for log messages.
    pub fn describe(&self) -> String {
        match self {
            Self::AsciiTree(_) => "ASCII tree on stdout".to_string(),
            Self::Image(renderer) => format!("image {}", renderer.output().display()),
        }
    }
}
