//! # Automix Mix Production Service (automix-mx)
//!
//! Analyzes uploaded tracks, plans phrase-coherent DJ sets, and renders
//! them to a single MP3 through an external transcoder filter graph.
//!
//! **Architecture:** tokio service; bounded in-process job queue drives
//! analyze → plan → render; axum HTTP surface; SQLite catalog.

use anyhow::Result;
use automix_common::EventBus;
use automix_mx::audio::FfmpegDecoder;
use automix_mx::config::{Config, ConfigOverrides};
use automix_mx::jobs::{JobQueue, Supervisor};
use automix_mx::render::Renderer;
use automix_mx::state::AppState;
use automix_mx::stems::{BandFilterEngine, RemoteStemEngine, StemEngine, StemSeparator};
use automix_mx::storage::{FsObjectStore, SharedStore};
use automix_mx::{api, db};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "automix-mx")]
#[command(about = "Automix mix production service - analysis, planning, rendering")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "automix-mx.toml")]
    config: PathBuf,

    /// Catalog database path (overrides config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// HTTP server port (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Object store root folder (overrides config file)
    #[arg(short, long)]
    store_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "automix_mx=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Automix Mix Production Service (automix-mx)");

    let args = Args::parse();
    let config = Config::load(
        &args.config,
        ConfigOverrides {
            database: args.database,
            port: args.port,
            store_root: args.store_root,
        },
    )?;
    info!(
        database = %config.database_path.display(),
        port = config.port,
        store_root = %config.store_root.display(),
        concurrency = config.queue_concurrency,
        "configuration loaded"
    );

    let db_pool = db::init_database_pool(&config.database_path).await?;
    info!("Connected to catalog");

    let store: SharedStore = Arc::new(FsObjectStore::new(&config.store_root));
    let bus = EventBus::new(1000);
    let queue = JobQueue::new();

    // Stem engines in configured priority order; the band filter sits
    // last and never fails
    let stem_decoder = FfmpegDecoder::new(
        &config.ffmpeg_path,
        &config.ffprobe_path,
        config.analysis_sample_rate,
        config.decode_timeout_seconds,
    );
    let mut engines: Vec<Arc<dyn StemEngine>> = Vec::new();
    for engine_id in &config.stem_engines {
        match engine_id.as_str() {
            "remote" => match &config.stem_service_url {
                Some(url) => match RemoteStemEngine::new(url) {
                    Ok(engine) => engines.push(Arc::new(engine)),
                    Err(e) => warn!(error = %e, "remote stem engine unavailable"),
                },
                None => info!("remote stem engine configured but no STEM_SERVICE_URL set"),
            },
            "band_filter" => engines.push(Arc::new(BandFilterEngine::new(stem_decoder.clone()))),
            other => warn!(engine = other, "unknown stem engine id, skipping"),
        }
    }
    if !engines.iter().any(|e| e.name() == "band_filter") {
        engines.push(Arc::new(BandFilterEngine::new(stem_decoder.clone())));
    }
    let separator = Arc::new(StemSeparator::new(engines));

    let renderer = Arc::new(Renderer::new(
        &config.ffmpeg_path,
        Arc::clone(&store),
        config.render_timeout_seconds,
    ));

    let supervisor = Supervisor::new(
        db_pool.clone(),
        Arc::clone(&store),
        bus.clone(),
        queue.clone(),
        separator,
        renderer,
        &config,
    );
    supervisor.register_handlers();
    queue.start(config.queue_concurrency);

    // Catalog status fields are the recovery point after a restart
    supervisor.recover_on_startup().await?;

    let state = AppState {
        db: db_pool,
        store,
        bus,
        queue: queue.clone(),
        supervisor,
        config: Arc::new(config),
    };

    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::run(state).await {
            error!("API server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    api_handle.abort();
    queue.shutdown(Duration::from_secs(30)).await;

    info!("Automix Mix Production Service shutting down");
    Ok(())
}
