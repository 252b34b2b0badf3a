//! Speakq Player - main entry point
//!
//! Queue-driven text-to-speech playback service with an HTTP/SSE control
//! interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use speakq_player::config::{Config, ConfigOverrides};
use speakq_player::playback::{Orchestrator, RodioEngineFactory};
use speakq_player::state::SharedState;
use speakq_player::synth::{
    ConsumptionNotifier, HttpConsumptionNotifier, HttpSynthesisClient, Lexicon,
    NullConsumptionNotifier,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "speakq-player")]
#[command(about = "Queue-driven text-to-speech playback service")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "speakq.toml", env = "SPEAKQ_CONFIG")]
    config: PathBuf,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "SPEAKQ_PORT")]
    port: Option<u16>,

    /// Database path (overrides config file)
    #[arg(short, long, env = "SPEAKQ_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing (env filter wins over config once loaded)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speakq_player=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Speakq Player");

    let config = Config::load(
        &args.config,
        ConfigOverrides {
            database_path: args.database,
            port: args.port,
        },
    )
    .await
    .context("Failed to load configuration")?;

    // Shared state seeded from persisted settings
    let state = Arc::new(SharedState::new());
    state.set_volume(config.runtime.volume_level).await;
    state.set_rate(config.runtime.playback_rate).await;
    state.set_voice(config.runtime.voice_id.clone()).await;

    // Collaborators
    let synth = Arc::new(
        HttpSynthesisClient::new(config.synthesis.base_url.clone())
            .context("Failed to create synthesis client")?,
    );
    let notifier: Arc<dyn ConsumptionNotifier> = match &config.consumed_url {
        Some(url) => Arc::new(
            HttpConsumptionNotifier::new(url.clone())
                .context("Failed to create consumption notifier")?,
        ),
        None => Arc::new(NullConsumptionNotifier),
    };
    let engines = Arc::new(RodioEngineFactory::new());

    let lexicon = match &config.lexicon_path {
        Some(path) => {
            let lexicon = Lexicon::from_json_file(path).context("Failed to load lexicon")?;
            info!("Loaded lexicon with {} entries", lexicon.len());
            Some(lexicon)
        }
        None => None,
    };

    let handle = Orchestrator::spawn(
        config.db_pool.clone(),
        Arc::clone(&state),
        synth,
        notifier,
        engines,
        lexicon,
        config.runtime.selected_item_id.clone(),
    );

    info!("Playback orchestrator ready");

    let server_handle = handle.clone();
    speakq_player::api::server::run(config.port, server_handle, shutdown_signal())
        .await
        .context("Server error")?;

    handle.shutdown().ok();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
