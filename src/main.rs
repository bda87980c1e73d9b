//! LLSD transcoding demo server.
//!
//! Serves a small JSON application behind the LLSD layer, so any client
//! can talk to it in LLSD XML, binary or notation.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!  LLSD request   │  ┌───────────┐    ┌──────────┐    ┌────────┐ │
//!  ───────────────┼─▶│ TraceLayer│───▶│ LlsdLayer│───▶│  JSON  │ │
//!                 │  └───────────┘    │ decode   │    │handlers│ │
//!  LLSD response  │                   │ encode   │    │        │ │
//!  ◀──────────────┼───────────────────┤          │◀───┤        │ │
//!                 │                   └──────────┘    └────────┘ │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use llsd_transcoder::config::{load_config, validate_config, AppConfig, ConfigError};
use llsd_transcoder::lifecycle::{signals, Shutdown};
use llsd_transcoder::observability::logging;
use llsd_transcoder::HttpServer;

#[derive(Parser)]
#[command(name = "llsd-transcoder")]
#[command(about = "JSON demo service speaking LLSD through the transcoding layer", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Answer clients without a precise accept header in LLSD XML
    #[arg(long)]
    quirks: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    config.transcoder.quirks |= cli.quirks;
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        quirks = config.transcoder.quirks,
        "llsd-transcoder starting"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    HttpServer::new(config).run(listener, shutdown.wait()).await?;
    Ok(())
}
