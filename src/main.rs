use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ballbot_runtime::config::ControlConfig;
use ballbot_runtime::runtime::{self, RunOptions};

/// Ball-fetching robot control runtime
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON file overriding controller tuning
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the controller without publishing wheel/gripper actuation
    #[arg(long)]
    dry_run: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (RUST_LOG overrides --log-level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => match ControlConfig::load(path) {
            Ok(config) => {
                info!("Loaded controller config from {}", path.display());
                config
            }
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => ControlConfig::default(),
    };

    let options = RunOptions {
        config,
        dry_run: args.dry_run,
    };
    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
