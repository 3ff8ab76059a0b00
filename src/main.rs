//! Pool Sniper - new liquidity pool detection and purchase pipeline for Solana
//!
//! This is the main entry point. It wires the selected transport to the
//! ingestion engine and serves health and metrics over HTTP.

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use pool_sniper::config::{AppConfig, TransportMode};
use pool_sniper::constants::BASE_MINT;
use pool_sniper::engine::{ActionDispatcher, Buyer, Engine, Evaluator, HttpBuyer, OrderTemplate};
use pool_sniper::gate::AdmissionGate;
use pool_sniper::handlers::{self, StatusState};
use pool_sniper::metrics::MetricsState;
use pool_sniper::normalizer::{Normalizer, RawEvent};
use pool_sniper::notifications::{CompositeNotifier, NotificationEvent, TelegramNotifier};
use pool_sniper::pipeline::DecisionPipeline;
use pool_sniper::token::{
    RpcAuthorityLookup, RpcSignatureResolver, RugCheckClient, SignatureResolver, TokenAgeHeuristic,
};
use pool_sniper::transport::{
    ConnectionManager, ConnectionState, GrpcTransport, StateChange, TransportError, WsTransport,
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const STATE_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Pool Sniper v{}", env!("CARGO_PKG_VERSION"));

    // Configuration errors exit with code 1 before any connection is attempted
    let config = load_config()?;
    let mode = config.pipeline.mode();
    tracing::info!(
        transport = %config.transport.mode,
        mode = %mode,
        concurrency_limit = config.pipeline.concurrency_limit,
        simulation_mode = config.swap.simulation_mode,
        "Configuration loaded"
    );

    let metrics = Arc::new(MetricsState::new()?);

    let rpc_client = Arc::new(RpcClient::new_with_timeout_and_commitment(
        config.rpc.url.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
        CommitmentConfig::confirmed(),
    ));

    let notifier = Arc::new(build_notifier(&config)?);

    // Gate, pipeline and dispatcher
    let gate = Arc::new(AdmissionGate::new(config.pipeline.concurrency_limit));
    let pipeline = DecisionPipeline::new(
        mode,
        config.pipeline.check_policy(),
        Arc::new(RpcAuthorityLookup::new(rpc_client.clone())),
        Arc::new(RugCheckClient::new(&config.rugcheck)?),
        Arc::new(TokenAgeHeuristic::new(
            rpc_client.clone(),
            Duration::from_secs(config.pipeline.rug_pull_threshold_secs),
        )),
    );
    let dispatcher = ActionDispatcher::new(
        config.swap.simulation_mode,
        build_buyer(&config)?,
        OrderTemplate::from_config(&config.swap),
        notifier.clone(),
    );
    let evaluator = Arc::new(Evaluator::new(
        gate.clone(),
        pipeline,
        dispatcher,
        metrics.clone(),
        notifier.clone(),
    ));

    let spec = Arc::new(config.subscription_spec());
    let resolver: Option<Arc<dyn SignatureResolver>> = match config.transport.mode {
        TransportMode::Wss => Some(Arc::new(RpcSignatureResolver::new(
            rpc_client.clone(),
            BASE_MINT,
        ))),
        TransportMode::Grpc => None,
    };
    let engine = Engine::new(
        Normalizer::new(spec.clone(), BASE_MINT),
        resolver,
        config.pipeline.concurrency_limit,
        evaluator,
        metrics.clone(),
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    // Connection state fan-out
    let (state_tx, _) = broadcast::channel::<StateChange>(STATE_CHANNEL_CAPACITY);
    let status = Arc::new(StatusState::new(
        config.transport.mode,
        mode,
        config.swap.simulation_mode,
        gate,
    ));
    spawn_status_task(state_tx.subscribe(), status.clone(), metrics.clone());

    if config.server.enabled {
        spawn_server(&config, status, metrics.clone(), shutdown.clone()).await?;
    }

    let (event_tx, event_rx) = mpsc::channel::<RawEvent>(EVENT_CHANNEL_CAPACITY);
    let engine_task = tokio::spawn(engine.run(event_rx, shutdown.clone()));

    let policy = config.transport.backoff.policy();
    let result = match config.transport.mode {
        TransportMode::Wss => {
            let transport = WsTransport::new(
                config.transport.wss_url.clone(),
                spec,
                Duration::from_secs(config.transport.ping_interval_secs),
            );
            ConnectionManager::new(transport, policy, state_tx)
                .run(event_tx, shutdown.clone())
                .await
        }
        TransportMode::Grpc => {
            let transport = GrpcTransport::new(
                config.transport.grpc_url.clone(),
                config.transport.grpc_token.clone(),
                spec,
            );
            ConnectionManager::new(transport, policy, state_tx)
                .run(event_tx, shutdown.clone())
                .await
        }
    };

    // In-flight evaluations are not drained
    shutdown.cancel();
    if let Err(e) = engine_task.await {
        tracing::warn!(error = %e, "Engine task ended abnormally");
    }

    finish(result, &config, &notifier).await
}

async fn finish(
    result: Result<(), TransportError>,
    config: &AppConfig,
    notifier: &CompositeNotifier,
) -> anyhow::Result<()> {
    match result {
        Ok(()) => {
            tracing::info!("Pool Sniper stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Transport closed with fatal error");
            notifier
                .notify(NotificationEvent::TransportClosed {
                    transport: config.transport.mode.to_string(),
                    reason: e.to_string(),
                })
                .await;
            Err(e.into())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pool_sniper=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<CompositeNotifier> {
    let mut notifier = CompositeNotifier::new();
    if config.notifications.telegram.enabled {
        let telegram = &config.notifications.telegram;
        if telegram.bot_token.is_none() || telegram.chat_id.is_empty() {
            tracing::warn!("Telegram enabled but bot token or chat id missing");
        }
        notifier.add_service(Arc::new(TelegramNotifier::new(telegram)?));
        tracing::info!("Telegram notifications enabled");
    }
    Ok(notifier)
}

fn build_buyer(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn Buyer>>> {
    let Some(ref provider_url) = config.swap.provider_url else {
        if !config.swap.simulation_mode {
            tracing::warn!("No purchase provider configured; accepted assets will not be bought");
        }
        return Ok(None);
    };

    let Some(ref api_key) = config.swap.api_key else {
        tracing::warn!("Purchase provider configured without API key, buyer disabled");
        return Ok(None);
    };

    let buyer = HttpBuyer::new(provider_url, api_key.clone(), &config.swap)?;
    tracing::info!(provider = %provider_url, "Purchase provider configured");
    Ok(Some(Arc::new(buyer)))
}

/// Log transitions, update the gauge and the status snapshot
fn spawn_status_task(
    mut changes: broadcast::Receiver<StateChange>,
    status: Arc<StatusState>,
    metrics: Arc<MetricsState>,
) {
    tokio::spawn(async move {
        loop {
            let change = match changes.recv().await {
                Ok(change) => change,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Status task lagged behind state changes");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            tracing::info!(
                from = %change.from,
                to = %change.to,
                attempt = change.attempt,
                "Connection state changed"
            );

            metrics.connection_state.set(change.to.as_gauge());
            if change.to == ConnectionState::Reconnecting {
                metrics.reconnects.inc();
            }
            status.set_connection_state(change.to);
        }
    });
}

async fn spawn_server(
    config: &AppConfig,
    status: Arc<StatusState>,
    metrics: Arc<MetricsState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Health and metrics server listening");

    let app = handlers::router(status, metrics);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            tracing::error!(error = %e, "HTTP server failed");
        }
    });
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C (and SIGTERM on Unix)
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to register SIGTERM handler");
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Received Ctrl-C, shutting down");
                    }
                    shutdown.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl-C, shutting down"),
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Received Ctrl-C, shutting down");
        }

        shutdown.cancel();
    });
}
