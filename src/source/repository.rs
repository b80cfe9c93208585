//! Live repository dependency source.
//!
//! Fetches `<repo-url>/<index-file>` once per run, parses it as a
//! `Packages` index, and answers every lookup from the parsed index.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use super::index::parse_packages_index;
use super::{DependencySource, SourceError, SourceResult};

/// Dependency source backed by a remote package index.
#[derive(Debug)]
pub struct RepositorySource {
    index_url: Url,
    client: reqwest::Client,
    index: OnceCell<HashMap<String, Vec<String>>>,
}

impl RepositorySource {
    /// Creates a source for the index file at `repo_url/index_file`.
    ///
    /// `timeout` bounds each HTTP request.
    pub fn new(repo_url: &Url, index_file: &str, timeout: Duration) -> SourceResult<Self> {
        let index_url = index_url(repo_url, index_file)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SourceError::Http {
                url: index_url.to_string(),
                source,
            })?;

        Ok(Self {
            index_url,
            client,
            index: OnceCell::new(),
        })
    }

    /// The full URL of the index resource.
    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    /// Returns the parsed index, fetching it on first use.
    ///
    /// Concurrent callers share one in-flight fetch. A failed fetch is not
    /// cached, so the next lookup tries again.
    async fn index(&self) -> SourceResult<&HashMap<String, Vec<String>>> {
        self.index.get_or_try_init(|| self.fetch_index()).await
    }

    async fn fetch_index(&self) -> SourceResult<HashMap<String, Vec<String>>> {
        let url = self.index_url.to_string();
        debug!("Fetching package index from {}", url);

        let response = self
            .client
            .get(self.index_url.clone())
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Package index fetch failed: HTTP {}", status);
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;

        let packages = parse_packages_index(&body)?;
        info!("Loaded {} package(s) from {}", packages.len(), url);
        Ok(packages)
    }
}

#[async_trait]
impl DependencySource for RepositorySource {
    async fn direct_dependencies(&self, package: &str) -> SourceResult<Vec<String>> {
        let index = self.index().await?;
        index
            .get(package)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(package.to_string()))
    }

    fn describe(&self) -> String {
        format!("repository index {}", self.index_url)
    }
}

/// Joins the index file name onto the repository URL.
fn index_url(repo_url: &Url, index_file: &str) -> SourceResult<Url> {
    let index_file = index_file.trim_matches('/');
    if index_file.is_empty() {
        return Err(SourceError::InvalidUrl("index file name is empty".to_string()));
    }

    let joined = format!("{}/{}", repo_url.as_str().trim_end_matches('/'), index_file);
    Url::parse(&joined).map_err(|e| SourceError::InvalidUrl(format!("{joined}: {e}")))
}
