mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirror_core::{
    create_client, load_config, validate_config, AcquisitionProtocol, BangumiClient,
    BiliupPublisher, Config, ContextEnricher, Discovery, DropCachesHook, FeedLister,
    FfmpegInspector, LiveCaptureBridge, LlmConfig, LlmTranslator, MaintenanceHook,
    NoopMaintenance, SourceMonitor, SourceRegistry, TaskPipeline, TaskQueue, TieredDiscovery,
    WorkerPool, YtDlpLister, YtDlpTransport,
};

use api::create_router;
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("MIRROR_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<()> {
    init_logging();

    let config_path = std::env::var("MIRROR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!(version = VERSION, "Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        sources = config.sources.len(),
        workers = config.workers.count,
        queue_capacity = config.workers.queue_capacity,
        "Configuration loaded successfully"
    );

    let discovery = build_discovery(&config)?;
    let pipeline = Arc::new(build_pipeline(&config)?);
    let maintenance: Arc<dyn MaintenanceHook> = if config.maintenance.drop_caches {
        info!("Page cache reclamation enabled after every task");
        Arc::new(DropCachesHook::new(Duration::from_secs(
            config.maintenance.timeout_secs,
        )))
    } else {
        Arc::new(NoopMaintenance)
    };

    let stop = Arc::new(AtomicBool::new(false));
    let queue = TaskQueue::new(config.workers.queue_capacity);

    let pool = Arc::new(
        WorkerPool::new(config.workers.clone(), &queue, pipeline, maintenance)
            .with_stop_flag(Arc::clone(&stop)),
    );
    pool.start().await.with_context(|| {
        format!(
            "Failed to prepare work directories under {:?}",
            config.workers.work_root
        )
    })?;

    let monitor = Arc::new(
        SourceMonitor::new(
            config.monitor.clone(),
            SourceRegistry::new(config.sources.iter().cloned()),
            discovery,
            queue.sender(),
        )
        .with_stop_flag(Arc::clone(&stop)),
    );
    let monitor_handle = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run().await })
    };

    let (server_tx, server_rx) = tokio::sync::oneshot::channel::<()>();
    let server_handle = if config.server.enabled {
        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::clone(&monitor),
            Arc::clone(&pool),
        ));
        let app = create_router(state);

        let addr = SocketAddr::new(config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        info!("Status server listening on {}", addr);

        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = server_rx.await;
                })
                .await
        }))
    } else {
        info!("Status server disabled in config");
        None
    };

    shutdown_signal().await;
    info!("Shutdown requested");

    monitor.stop();
    if let Err(e) = monitor_handle.await {
        warn!("Source monitor task ended abnormally: {}", e);
    }

    let shutdown = pool.stop().await;
    info!(
        joined = shutdown.joined,
        aborted = shutdown.aborted,
        "Workers stopped"
    );

    let _ = server_tx.send(());
    if let Some(handle) = server_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Status server error: {}", e),
            Err(e) => warn!("Status server task ended abnormally: {}", e),
        }
    }

    info!("Agent stopped");
    Ok(())
}

/// Listing tier first, Atom feed second when enabled.
fn build_discovery(config: &Config) -> Result<Arc<dyn Discovery>> {
    let timeout = config.monitor.discovery_timeout();
    let mut tiers: Vec<Arc<dyn Discovery>> = vec![Arc::new(YtDlpLister::new(
        config.acquisition.clone(),
        timeout,
    ))];
    if config.monitor.feed_fallback {
        let feed = FeedLister::new(Duration::from_secs(config.monitor.feed_timeout_secs))
            .context("Failed to create feed client")?;
        tiers.push(Arc::new(feed));
    }

    let tiered = TieredDiscovery::new(tiers);
    info!(tiers = ?tiered.tier_names(), "Discovery tiers configured");
    Ok(Arc::new(tiered))
}

fn build_pipeline(config: &Config) -> Result<TaskPipeline> {
    let transport = Arc::new(YtDlpTransport::new(config.acquisition.clone()));
    let inspector = Arc::new(FfmpegInspector::new(config.media.clone()));
    let protocol = Arc::new(AcquisitionProtocol::new(
        transport,
        inspector,
        config.acquisition.clone(),
    ));
    let acquirer = Arc::new(LiveCaptureBridge::new(protocol));

    let llm_config = config.llm.clone().unwrap_or_else(|| {
        info!("No [llm] section, using the default provider");
        LlmConfig::default()
    });
    let llm = create_client(&llm_config);
    info!(provider = llm.provider(), model = llm.model(), "LLM client configured");

    let bangumi = if config.bangumi.enabled {
        match BangumiClient::new(config.bangumi.clone()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("Bangumi lookups disabled: {}", e);
                None
            }
        }
    } else {
        info!("Bangumi lookups disabled in config");
        None
    };

    let enricher = Arc::new(ContextEnricher::new(Some(Arc::clone(&llm)), bangumi));
    let translator = Arc::new(LlmTranslator::new(llm));
    let publisher = Arc::new(BiliupPublisher::new(config.publish.clone()));

    Ok(TaskPipeline::new(acquirer, enricher, translator, publisher).with_timeouts(
        Duration::from_secs(config.workers.enrichment_timeout_secs),
        Duration::from_secs(config.workers.translation_timeout_secs),
    ))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
