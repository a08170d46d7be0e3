// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chowkidar serve` command implementation.
//!
//! Wires the data root, store, event bus, stage engines, orchestrator, and
//! gateway, then runs until a shutdown signal arrives. Providers are
//! short-circuited to degraded mode when `DISABLE_MODELS=1`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chowkidar_agents::{
    ActionExecutor, CommandTts, DecisionEngine, DisabledPerception, DisabledStt,
    HttpReplyProvider, InferenceGate, IntelligenceEngine, NullTts, PerceptionStage, VocabSet,
};
use chowkidar_assets::DataDir;
use chowkidar_bus::EventBus;
use chowkidar_config::ChowkidarConfig;
use chowkidar_core::traits::reply::ReplyProvider;
use chowkidar_core::traits::tts::TtsSynthesizer;
use chowkidar_gateway::{start_server, GatewayState, ServerConfig};
use chowkidar_orchestrator::{Orchestrator, Stages};
use chowkidar_store::Database;

/// Startup/runtime failures, mapped onto process exit codes.
#[derive(Debug)]
pub enum ServeError {
    /// Invalid configuration or environment (exit 1).
    Config(String),
    /// The store failed its integrity check at startup (exit 2).
    StoreCorruption(String),
    /// Fatal crash past startup (exit 3).
    Fatal(String),
}

impl ServeError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ServeError::Config(_) => 1,
            ServeError::StoreCorruption(_) => 2,
            ServeError::Fatal(_) => 3,
        }
    }
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Config(msg) => write!(f, "configuration error: {msg}"),
            ServeError::StoreCorruption(msg) => write!(f, "store corruption: {msg}"),
            ServeError::Fatal(msg) => write!(f, "fatal error: {msg}"),
        }
    }
}

/// Runs the `chowkidar serve` command.
pub async fn run_serve(config: ChowkidarConfig) -> Result<(), ServeError> {
    let data = DataDir::new(&config.assets.data_dir);
    data.ensure()
        .await
        .map_err(|e| ServeError::Config(format!("cannot prepare data dir: {e}")))?;

    let _log_guard = init_tracing(&config.log_level, &data);
    info!("starting chowkidar serve");

    // Open the store and detect corruption before anything else runs.
    let db_path = config.storage.resolved_database_path(&config.assets.data_dir);
    let db = Database::open(&db_path)
        .await
        .map_err(|e| ServeError::StoreCorruption(e.to_string()))?;
    db.integrity_check()
        .await
        .map_err(|e| ServeError::StoreCorruption(e.to_string()))?;

    let bus = EventBus::new();
    let vocab = Arc::new(VocabSet::from_config(&config.vocab));
    let gate = Arc::new(InferenceGate::new(config.pipeline.worker_pool_size));

    // Providers: degraded mode short-circuits everything pluggable.
    let disable_models = config.providers.disable_models;
    if disable_models {
        warn!("DISABLE_MODELS=1: all providers run in degraded mode");
    }

    let reply_provider: Option<Arc<dyn ReplyProvider>> = if disable_models {
        None
    } else {
        match &config.providers.reply_endpoint {
            Some(endpoint) => {
                let provider = HttpReplyProvider::new(
                    endpoint.clone(),
                    config.providers.reply_key.as_deref(),
                )
                .map_err(|e| ServeError::Config(e.to_string()))?;
                Some(Arc::new(provider))
            }
            None => None,
        }
    };

    let tts: Arc<dyn TtsSynthesizer> = if disable_models {
        Arc::new(NullTts)
    } else {
        Arc::new(CommandTts::new(&config.tts))
    };

    let stages = Stages {
        perception: PerceptionStage::new(
            Arc::new(DisabledPerception),
            vocab.clone(),
            gate.clone(),
            config.pipeline.provider_timeout(),
        ),
        intelligence: IntelligenceEngine::new(
            vocab,
            reply_provider,
            config.pipeline.provider_timeout(),
        ),
        decision: DecisionEngine::new(config.policy.clone()),
        action: ActionExecutor::new(
            data.clone(),
            tts.clone(),
            gate,
            config.pipeline.action_timeout(),
        ),
    };

    let orchestrator = Orchestrator::new(
        db,
        bus,
        data,
        stages,
        config.pipeline.clone(),
    );

    let state = GatewayState {
        orchestrator: orchestrator.clone(),
        stt: Arc::new(DisabledStt),
        tts,
    };

    // Shutdown: first signal drains the gateway, then the pipeline tasks.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let server_result = start_server(
        &server_config,
        state,
        shutdown.clone().cancelled_owned(),
    )
    .await;

    orchestrator.shutdown().await;

    match server_result {
        Ok(()) => {
            info!("chowkidar stopped");
            Ok(())
        }
        Err(chowkidar_core::ChowkidarError::Config(msg)) => Err(ServeError::Config(msg)),
        Err(e) => Err(ServeError::Fatal(e.to_string())),
    }
}

/// Console logging plus an append-only operational log under
/// `<data>/logs/`. The returned guard must be held for the process
/// lifetime so buffered lines flush.
fn init_tracing(
    level: &str,
    data: &DataDir,
) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender =
        tracing_appender::rolling::never(data.root().join("logs"), "chowkidar.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}
