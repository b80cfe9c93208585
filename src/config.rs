//! Command-line configuration.
//!
//! [`Args`] is the raw clap surface. [`Args::validate`] checks every field
//! in one pass and either returns a [`Config`] or a [`ConfigError`] listing
//! all problems, so the user can fix them together.

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::graph::{ResolverConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH};
use crate::render::Renderer;
use crate::source::{DependencySource, FixtureSource, RepositorySource, SourceResult};

/// Where package metadata comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Live repository index over HTTP(S)
    #[default]
    Real,
    /// Local fixture file
    Test,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Real => write!(f, "real"),
            Mode::Test => write!(f, "test"),
        }
    }
}

/// Raw command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "depviz")]
#[command(version)]
#[command(about = "Resolve and visualize the transitive dependency graph of a package", long_about = None)]
pub struct Args {
    /// Name of the package to analyze
    #[arg(long)]
    pub package_name: String,

    /// Repository URL (real mode) or fixture file path (test mode)
    #[arg(long)]
    pub repo_url: String,

    /// Where package metadata comes from
    #[arg(long, value_enum, default_value_t = Mode::Real)]
    pub mode: Mode,

    /// Image file to write; the extension selects the format
    #[arg(long, default_value = "graph.png")]
    pub output_file: PathBuf,

    /// Print an ASCII tree to stdout instead of writing an image
    #[arg(long)]
    pub ascii_output: bool,

    /// Maximum resolution depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH as i64, allow_negative_numbers = true)]
    pub max_depth: i64,

    /// Index file name joined onto the repository URL (real mode)
    #[arg(long, default_value = "Packages")]
    pub index_file: String,

    /// Maximum number of concurrent lookups
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Timeout for each lookup, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Also write the resolved graph as JSON to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Invalid command-line input, with one message per problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Configuration errors:\n{}", format_messages(.messages))]
pub struct ConfigError {
    pub messages: Vec<String>,
}

fn format_messages(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!(" - {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The validated repository location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repository {
    /// Base URL of a live repository
    Remote(Url),
    /// Path of a fixture file
    Fixture(PathBuf),
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repository::Remote(url) => write!(f, "{url}"),
            Repository::Fixture(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub package_name: String,
    pub repository: Repository,
    pub mode: Mode,
    pub index_file: String,
    pub output_file: PathBuf,
    pub ascii_output: bool,
    pub max_depth: usize,
    pub concurrency: usize,
    pub fetch_timeout: Duration,
    pub json_output: Option<PathBuf>,
    pub verbose: bool,
}

impl Args {
    /// Check every argument and build a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] holding every validation message.
    pub fn validate(self) -> Result<Config, ConfigError> {
        let mut messages = Vec::new();

        let package_name = self.package_name.trim().to_string();
        if package_name.is_empty() {
            messages.push("package name must not be empty".to_string());
        }

        let repository = match self.mode {
            Mode::Real => match Url::parse(&self.repo_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    Some(Repository::Remote(url))
                }
                _ => {
                    messages.push(format!(
                        "in real mode --repo-url must be an http(s) URL, got '{}'",
                        self.repo_url
                    ));
                    None
                }
            },
            Mode::Test => {
                let path = PathBuf::from(&self.repo_url);
                if path.is_file() {
                    Some(Repository::Fixture(path))
                } else {
                    messages.push(format!(
                        "test repository file not found: {}",
                        self.repo_url
                    ));
                    None
                }
            }
        };

        let max_depth = match usize::try_from(self.max_depth) {
            Ok(depth) if depth > 0 => depth,
            _ => {
                messages.push(format!(
                    "maximum depth must be a positive number, got {}",
                    self.max_depth
                ));
                0
            }
        };

        if self.mode == Mode::Real && self.index_file.trim_matches('/').is_empty() {
            messages.push("index file name must not be empty".to_string());
        }
        if self.concurrency == 0 {
            messages.push("concurrency must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            messages.push("timeout must be at least 1 second".to_string());
        }

        match repository {
            Some(repository) if messages.is_empty() => Ok(Config {
                package_name,
                repository,
                mode: self.mode,
                index_file: self.index_file,
                output_file: self.output_file,
                ascii_output: self.ascii_output,
                max_depth,
                concurrency: self.concurrency,
                fetch_timeout: Duration::from_secs(self.timeout_secs),
                json_output: self.json_output,
                verbose: self.verbose,
            }),
            _ => Err(ConfigError { messages }),
        }
    }
}

impl Config {
    /// Resolver settings for this run.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_depth: self.max_depth,
            concurrency: self.concurrency,
            fetch_timeout: self.fetch_timeout,
        }
    }

    /// Build the dependency source the mode asks for.
    ///
    /// # Errors
    ///
    /// Fails if the fixture file cannot be read or the index URL is invalid.
    pub fn build_source(&self) -> SourceResult<Arc<dyn DependencySource>> {
        let source: Arc<dyn DependencySource> = match &self.repository {
            Repository::Remote(url) => Arc::new(RepositorySource::new(
                url,
                &self.index_file,
                self.fetch_timeout,
            )?),
            Repository::Fixture(path) => Arc::new(FixtureSource::open(path)?),
        };
        Ok(source)
    }

    /// The renderer selected by `--ascii-output`.
    pub fn renderer(&self) -> Renderer {
        if self.ascii_output {
            Renderer::ascii_for_stdout()
        } else {
            Renderer::image(&self.output_file)
        }
    }

    /// Effective parameters as label/value pairs, for the startup echo.
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = vec![
            ("package name", self.package_name.clone()),
            ("repository", self.repository.to_string()),
            ("mode", self.mode.to_string()),
            ("output file", self.output_file.display().to_string()),
            ("ASCII output", self.ascii_output.to_string()),
            ("max depth", self.max_depth.to_string()),
        ];
        if self.mode == Mode::Real {
            parameters.push(("index file", self.index_file.clone()));
        }
        parameters.push(("concurrency", self.concurrency.to_string()));
        parameters.push(("timeout", format!("{}s", self.fetch_timeout.as_secs())));
        if let Some(path) = &self.json_output {
            parameters.push(("JSON output", path.display().to_string()));
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["depviz"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    fn fixture_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "A: B").unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--package-name", "curl", "--repo-url", "https://deb.example.org/main"])
            .validate()
            .unwrap();

        assert_eq!(config.mode, Mode::Real);
        assert_eq!(config.output_file, PathBuf::from("graph.png"));
        assert!(!config.ascii_output);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.index_file, "Packages");
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert!(config.json_output.is_none());
        assert!(matches!(config.repository, Repository::Remote(_)));
    }

    #[test]
    fn test_required_arguments() {
        assert!(Args::try_parse_from(["depviz", "--repo-url", "x"]).is_err());
        assert!(Args::try_parse_from(["depviz", "--package-name", "x"]).is_err());
        assert!(Args::try_parse_from([
            "depviz",
            "--package-name",
            "x",
            "--repo-url",
            "y",
            "--mode",
            "fake"
        ])
        .is_err());
    }

    #[test]
    fn test_test_mode_with_fixture() {
        let file = fixture_file();
        let path = file.path().to_str().unwrap();
        let config = parse(&[
            "--package-name",
            "A",
            "--repo-url",
            path,
            "--mode",
            "test",
            "--ascii-output",
            "--max-depth",
            "5",
        ])
        .validate()
        .unwrap();

        assert_eq!(config.repository, Repository::Fixture(file.path().to_path_buf()));
        assert!(config.ascii_output);
        assert_eq!(config.resolver_config().max_depth, 5);
        assert!(matches!(config.renderer(), Renderer::AsciiTree(_)));
    }

    #[test]
    fn test_collects_every_error() {
        let err = parse(&[
            "--package-name",
            "  ",
            "--repo-url",
            "ftp://mirror",
            "--max-depth",
            "-1",
            "--concurrency",
            "0",
            "--timeout-secs",
            "0",
        ])
        .validate()
        .unwrap_err();

        assert_eq!(err.messages.len(), 5);
        assert!(err.messages[0].contains("package name"));
        assert!(err.messages[1].contains("http(s) URL"));
        assert!(err.messages[2].contains("got -1"));

        let text = err.to_string();
        assert!(text.starts_with("Configuration errors:\n - "));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = parse(&["--package-name", "a", "--repo-url", "http://x", "--max-depth", "0"])
            .validate()
            .unwrap_err();
        assert_eq!(err.messages.len(), 1);
        assert!(err.messages[0].contains("maximum depth"));
    }

    #[test]
    fn test_missing_fixture() {
        let err = parse(&[
            "--package-name",
            "a",
            "--repo-url",
            "/no/such/fixture.txt",
            "--mode",
            "test",
        ])
        .validate()
        .unwrap_err();
        assert_eq!(
            err.messages,
            vec!["test repository file not found: /no/such/fixture.txt".to_string()]
        );
    }

    #[test]
    fn test_url_without_scheme_rejected_in_real_mode() {
        let err = parse(&["--package-name", "a", "--repo-url", "deb.example.org"])
            .validate()
            .unwrap_err();
        assert!(err.messages[0].contains("deb.example.org"));
    }

    #[test]
    fn test_package_name_trimmed() {
        let config = parse(&["--package-name", " curl ", "--repo-url", "http://x"])
            .validate()
            .unwrap();
        assert_eq!(config.package_name, "curl");
    }

    #[test]
    fn test_parameters_echo() {
        let config = parse(&[
            "--package-name",
            "curl",
            "--repo-url",
            "http://deb.example.org/",
            "--json-output",
            "out.json",
        ])
        .validate()
        .unwrap();

        let parameters = config.parameters();
        assert_eq!(parameters[0], ("package name", "curl".to_string()));
        assert!(parameters.contains(&("index file", "Packages".to_string())));
        assert!(parameters.contains(&("JSON output", "out.json".to_string())));
        assert!(matches!(config.renderer(), Renderer::Image(_)));
    }

    #[tokio::test]
    async fn test_build_fixture_source() {
        let file = fixture_file();
        let config = parse(&[
            "--package-name",
            "A",
            "--repo-url",
            file.path().to_str().unwrap(),
            "--mode",
            "test",
        ])
        .validate()
        .unwrap();

        let source = config.build_source().unwrap();
        assert_eq!(source.direct_dependencies("A").await.unwrap(), vec!["B"]);
    }
}
