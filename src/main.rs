use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use spherebox::{config::SimConfig, web};

#[derive(Debug, Parser)]
#[command(author, version, about = "Colliding spheres in a box, served over HTTP")]
struct Cli {
    /// Optional YAML config file; defaults apply to anything it omits
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Seed for the randomly placed spheres
    #[arg(long)]
    seed: Option<u64>,

    /// Populate the world before serving instead of starting empty
    #[arg(long)]
    reset_on_start: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SimConfig::default(),
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.seed.is_some() {
        config.population.seed = cli.seed;
    }
    config.population.reset_on_start |= cli.reset_on_start;

    web::run(config).await
}
