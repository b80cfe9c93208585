//! One end-to-end run: resolve, warn, render, export.

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::export::{export_to_file, ExportData, JsonExporter};
use crate::graph::{Resolution, Resolver};

/// Resolve the configured package and write the requested outputs.
///
/// Unresolved and truncated packages are reported in the output, not as
/// errors. Only setup, structural and rendering failures are returned.
pub async fn run(config: &Config, cancel: CancellationToken) -> anyhow::Result<Resolution> {
    let source = config
        .build_source()
        .context("failed to set up the dependency source")?;

    let resolver = Resolver::new(source, config.resolver_config()).with_cancellation(cancel);
    let resolution = resolver
        .resolve(&config.package_name)
        .await
        .context("resolution failed")?;

    if resolution.cancelled {
        warn!("Resolution was cancelled; the graph is incomplete");
    }
    if resolution.direct_dependencies_all_failed() {
        warn!(
            "No dependency of '{}' could be fetched; check the repository location",
            config.package_name
        );
    }

    let renderer = config.renderer();
    info!("Rendering {}", renderer.describe());
    renderer
        .render(&resolution.graph)
        .with_context(|| format!("failed to render {}", renderer.describe()))?;

    if let Some(path) = &config.json_output {
        export_to_file(&JsonExporter, &ExportData::new(&resolution), path)
            .with_context(|| format!("failed to export JSON to {}", path.display()))?;
        info!("Wrote JSON graph to {}", path.display());
    }

    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use clap::Parser;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn config_for(dir: &TempDir, fixture: &str, extra: &[&str]) -> Config {
        let fixture_path = dir.path().join("repo.txt");
        fs::write(&fixture_path, fixture).unwrap();

        let mut argv = vec![
            "depviz".to_string(),
            "--package-name".to_string(),
            "A".to_string(),
            "--repo-url".to_string(),
            fixture_path.display().to_string(),
            "--mode".to_string(),
            "test".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap().validate().unwrap()
    }

    #[tokio::test]
    async fn test_run_writes_dot_and_json() {
        let dir = tempdir().unwrap();
        let dot_path = dir.path().join("graph.dot");
        let json_path = dir.path().join("graph.json");
        let config = config_for(
            &dir,
            "A: B C\nB: A\n",
            &[
                "--output-file",
                dot_path.to_str().unwrap(),
                "--json-output",
                json_path.to_str().unwrap(),
            ],
        );

        let resolution = run(&config, CancellationToken::new()).await.unwrap();
        assert_eq!(resolution.graph.node_count(), 3);
        assert!(!resolution.cancelled);

        let dot = fs::read_to_string(&dot_path).unwrap();
        assert!(dot.starts_with("digraph {"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["root"], "A");
        assert_eq!(json["summary"]["edges"], 3);
    }

    #[tokio::test]
    async fn test_run_unsupported_format_fails() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("graph.txt");
        let config = config_for(&dir, "A: B\n", &["--output-file", output.to_str().unwrap()]);

        let err = run(&config, CancellationToken::new()).await.unwrap_err();
        assert!(format!("{err:#}").contains("unsupported output format"));
    }

    #[tokio::test]
    async fn test_run_cancelled_still_renders() {
        let dir = tempdir().unwrap();
        let dot_path = dir.path().join("graph.dot");
        let config = config_for(&dir, "A: B\n", &["--output-file", dot_path.to_str().unwrap()]);

        let token = CancellationToken::new();
        token.cancel();
        let resolution = run(&config, token).await.unwrap();

        assert!(resolution.cancelled);
        assert!(dot_path.exists());
    }
}
