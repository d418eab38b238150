use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use floorwatch::AppConfig;

/// Stub HTTP service for card recognition and lookup.
#[derive(Parser, Debug)]
#[command(name = "floorwatch-api", version, about)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("floorwatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    config.validate()?;

    floorwatch::api::serve(&config.api).await?;
    Ok(())
}
