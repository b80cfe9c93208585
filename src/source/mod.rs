//! Dependency sources for the resolver.
//!
//! A [`DependencySource`] answers one question: which packages does a given
//! package depend on directly? Two implementations are provided:
//!
//! - [`FixtureSource`] - a local text file with one `name: dep1 dep2` line
//!   per package (test mode)
//! - [`RepositorySource`] - a live repository `Packages` index fetched over
//!   HTTP(S) (real mode)

pub mod fixture;
pub mod index;
pub mod repository;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub use fixture::FixtureSource;
pub use index::parse_packages_index;
pub use repository::RepositorySource;

/// Errors that can occur while looking up a package's dependencies.
///
/// The resolver never propagates these; a failed lookup only degrades the
/// affected node to unresolved.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to read a local file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The repository URL or index file name is not usable.
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    /// The fetched index could not be parsed.
    #[error("failed to parse package index: {0}")]
    Parse(String),

    /// The package does not appear in the repository index.
    #[error("package '{0}' not found in repository index")]
    NotFound(String),

    /// The lookup did not finish in time.
    #[error("lookup of '{package}' timed out after {}s", .after.as_secs_f64())]
    Timeout { package: String, after: Duration },
}

/// Result type alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// A provider of direct dependency lists.
///
/// Implementations must be shareable across tasks: the resolver fetches
/// sibling packages concurrently through an `Arc<dyn DependencySource>`.
/// Names are returned in the order the source declares them; the resolver
/// preserves that order in the graph.
#[async_trait]
pub trait DependencySource: Send + Sync {
    /// Returns the direct dependencies of `package`.
    async fn direct_dependencies(&self, package: &str) -> SourceResult<Vec<String>>;

    /// Short human-readable description used in log output.
    fn describe(&self) -> String;
}

/// Appends `name` to `deps` unless it is empty or already present.
pub(crate) fn push_unique(deps: &mut Vec<String>, name: &str) {
    if !name.is_empty() && !deps.iter().any(|d| d == name) {
        deps.push(name.to_string());
    }
}
