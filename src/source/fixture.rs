//! Fixture-file dependency source.
//!
//! The fixture format is line oriented:
//!
//! ```text
//! A: B C
//! B: C
//! C:
//! ```
//!
//! Blank lines and lines without a `:` are ignored. A package without a line
//! has no known dependencies; that is not an error.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{push_unique, DependencySource, SourceError, SourceResult};

/// Dependency source backed by a local fixture file.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    origin: Option<PathBuf>,
    packages: HashMap<String, Vec<String>>,
}

impl FixtureSource {
    /// Reads and parses a fixture file.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut fixture = Self::from_contents(&content);
        fixture.origin = Some(path.to_path_buf());
        debug!(
            "Loaded {} package(s) from fixture {}",
            fixture.len(),
            path.display()
        );
        Ok(fixture)
    }

    /// Parses fixture text held in memory.
    ///
    /// # Example
    ///
    /// ```
    /// use depviz::source::FixtureSource;
    ///
    /// let fixture = FixtureSource::from_contents("A: B C\nB: C\n");
    /// assert_eq!(fixture.dependencies_of("A"), vec!["B", "C"]);
    /// assert!(fixture.dependencies_of("C").is_empty());
    /// ```
    pub fn from_contents(content: &str) -> Self {
        Self {
            origin: None,
            packages: parse_fixture(content),
        }
    }

    /// Returns the declared dependencies of a package (empty when undeclared).
    pub fn dependencies_of(&self, package: &str) -> Vec<String> {
        self.packages.get(package).cloned().unwrap_or_default()
    }

    /// Number of packages with a declaration line.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if the fixture declares no packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[async_trait]
impl DependencySource for FixtureSource {
    async fn direct_dependencies(&self, package: &str) -> SourceResult<Vec<String>> {
        Ok(self.dependencies_of(package))
    }

    fn describe(&self) -> String {
        match &self.origin {
            Some(path) => format!("fixture {}", path.display()),
            None => "in-memory fixture".to_string(),
        }
    }
}

/// Parses fixture lines into a package -> dependencies map.
///
/// Repeated lines for the same package merge, keeping first-seen order and
/// dropping duplicates.
fn parse_fixture(content: &str) -> HashMap<String, Vec<String>> {
    let mut packages: HashMap<String, Vec<String>> = HashMap::new();

    for line in content.lines() {
        let Some((name, deps)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let entry = packages.entry(name.to_string()).or_default();
        for dep in deps.split_whitespace() {
            push_unique(entry, dep);
        }
    }

    packages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_lines() {
        let fixture = FixtureSource::from_contents("A: B C D\nB: C\nC:\n");
        assert_eq!(fixture.len(), 3);
        assert_eq!(fixture.dependencies_of("A"), vec!["B", "C", "D"]);
        assert_eq!(fixture.dependencies_of("B"), vec!["C"]);
        assert!(fixture.dependencies_of("C").is_empty());
    }

    #[test]
    fn test_ignores_blank_and_colonless_lines() {
        let fixture = FixtureSource::from_contents("\n   \nthis line is noise\nA: B\n");
        assert_eq!(fixture.len(), 1);
        assert_eq!(fixture.dependencies_of("A"), vec!["B"]);
    }

    #[test]
    fn test_undeclared_package_has_no_dependencies() {
        let fixture = FixtureSource::from_contents("A: B\n");
        assert!(fixture.dependencies_of("Z").is_empty());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let fixture = FixtureSource::from_contents("A: B\na: c\n");
        assert_eq!(fixture.dependencies_of("A"), vec!["B"]);
        assert_eq!(fixture.dependencies_of("a"), vec!["c"]);
    }

    #[test]
    fn test_repeated_lines_merge_without_duplicates() {
        let fixture = FixtureSource::from_contents("A: B C\nA: C D B\n");
        assert_eq!(fixture.dependencies_of("A"), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_whitespace_around_name() {
        let fixture = FixtureSource::from_contents("   A   :\tB   C  \n");
        assert_eq!(fixture.dependencies_of("A"), vec!["B", "C"]);
    }

    #[test]
    fn test_open_missing_file() {
        let err = FixtureSource::open("/nonexistent/fixture.txt").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/fixture.txt"));
    }

    #[tokio::test]
    async fn test_open_and_lookup() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "app: libfoo libbar").unwrap();
        writeln!(file, "libfoo: libbar").unwrap();

        let fixture = FixtureSource::open(file.path()).unwrap();
        assert_eq!(
            fixture.direct_dependencies("app").await.unwrap(),
            vec!["libfoo", "libbar"]
        );
        assert!(fixture.direct_dependencies("libbar").await.unwrap().is_empty());
        assert!(fixture.describe().starts_with("fixture "));
    }
}
