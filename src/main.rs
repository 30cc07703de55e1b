//! docstream server entry point.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docstream::config::Settings;
use docstream::server;

#[derive(Debug, Parser)]
#[command(name = "docstream", version, about = "Layout OCR result delivery service")]
struct Cli {
    /// Server host.
    #[arg(long, default_value = "127.0.0.1", env = "DOCSTREAM_HOST")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 8000, env = "DOCSTREAM_PORT")]
    port: u16,

    /// Path to a TOML settings file.
    #[arg(long, env = "DOCSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Base directory for per-job workspaces (overrides the settings file).
    #[arg(long, env = "DOCSTREAM_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Inference server base URL (overrides the settings file).
    #[arg(long, env = "DOCSTREAM_ENGINE_URL")]
    engine_url: Option<String>,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "docstream=debug"
    } else {
        "docstream=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(output_dir) = cli.output_dir {
        settings.output_dir = output_dir;
    }
    if let Some(engine_url) = cli.engine_url {
        settings.engine_url = engine_url;
    }

    server::serve(settings, &cli.host, cli.port).await
}
