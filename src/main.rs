//! media-dl server
//!
//! Loads a TOML configuration (or runs on defaults), starts the scheduler and
//! serves the REST API until SIGTERM/SIGINT.
//!
//! ```bash
//! media-dl --config /etc/media-dl.toml
//! RUST_LOG=media_dl=debug media-dl
//! ```

use clap::Parser;
use media_dl::{Config, MediaScheduler, run_with_shutdown};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "media-dl", version, about = "Multi-tenant media download scheduler")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    tracing::info!(
        bind_address = %config.api.bind_address,
        download_dir = %config.download_dir().display(),
        "starting media-dl"
    );

    let scheduler = MediaScheduler::new(config).await?;
    scheduler.start().await?;

    let api_handle = scheduler.spawn_api_server();

    run_with_shutdown(scheduler).await?;
    api_handle.abort();

    tracing::info!("media-dl stopped");
    Ok(())
}
