mod cli;

use crate::cli::app::App;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leaderboards")]
#[command(about = "Console host for ranked metric leaderboards")]
struct Cli {
    /// Directory holding one `<name>.toml` per leaderboard
    #[arg(long, default_value = "leaderboards")]
    config_dir: PathBuf,

    /// Saved state goes to `<data-dir>/data/<name>.json`
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// JSON file with players and their metric values
    #[arg(long)]
    fixtures: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut app = App::new(
        cli.config_dir,
        cli.data_dir,
        cli.fixtures.as_deref(),
        Duration::from_millis(cli.tick_ms.max(1)),
    )
    .await?;
    app.run().await
}
