use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use depviz::config::Args;
use depviz::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Usage errors exit 1 like validation errors; --help and --version exit 0
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            eprintln!("{err}");
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    };
    init_logging(args.verbose);

    let config = match args.validate() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    info!("Parameters:");
    for (label, value) in config.parameters() {
        info!("  {label} = {value}");
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the graph resolved so far");
            ctrl_c.cancel();
        }
    });

    let resolution = depviz::app::run(&config, cancel).await?;
    info!(
        "Done: {} package(s), {} failed lookup(s)",
        resolution.graph.node_count(),
        resolution.failures.len()
    );
    Ok(())
}
