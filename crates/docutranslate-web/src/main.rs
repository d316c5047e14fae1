//! DocuTranslate Web - rate-limited proxy for document fetch and translation.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use docutranslate_core::{AppConfig, Clock, LanguageMap, SystemClock, TranslationProvider, create_translator};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "docutranslate-web")]
#[command(author, version, about = "DocuTranslate proxy server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "DOCUTRANSLATE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Configuration file (defaults to the layered config lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path).context("Failed to load configuration")?,
        None => AppConfig::load(),
    };

    let languages = Arc::new(LanguageMap::default());
    let translator: Arc<dyn TranslationProvider> = Arc::new(
        create_translator(&config.providers, &languages).context("Failed to create translation providers")?,
    );
    info!("Translation chain: {}", translator.label());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(
        AppState::new(config, translator, languages, clock).context("Failed to initialize application state")?,
    );

    // Stale rate-limit windows are dropped once a minute
    let purge_state = Arc::clone(&state);
    tokio::spawn(async move {
        let interval = Duration::from_secs(60);
        loop {
            tokio::time::sleep(interval).await;
            purge_state.purge_rate_limits().await;
        }
    });

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
