use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use aval_core::CaseStateMachine;
use aval_db::PgCaseStore;
use aval_documents::{
    ArtifactStore, HttpFetch, HttpRenderer, LocalArtifactStore, RemoteFetch, RendererConfig,
    S3ArtifactStore, S3Config,
};
use aval_events::{EventBus, EventLogger, NoopNotifier, Notifier, PushConfig, PushNotifier};
use aval_workflow::{Collaborators, WorkflowEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ArtifactBackend, WorkerConfig};

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;

    // --- Tracing ---
    let (json_layer, text_layer) = if config.log_json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aval_worker=debug,aval_workflow=debug".into()),
        )
        .with(json_layer)
        .with(text_layer)
        .init();

    // --- Database ---
    let pool = aval_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(max_connections = config.max_connections, "Database connection pool created");

    aval_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    aval_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let renderer_config = RendererConfig::from_env();
    tracing::info!(url = %renderer_config.base_url, "Report renderer configured");
    let renderer = Arc::new(HttpRenderer::new(&renderer_config)?);

    let (artifacts, fetch): (Arc<dyn ArtifactStore>, Arc<dyn RemoteFetch>) = match &config.artifacts
    {
        ArtifactBackend::S3 => {
            let s3 = S3Config::from_env().context("ARTIFACT_BACKEND=s3 requires S3_BUCKET")?;
            tracing::info!(bucket = %s3.bucket, region = %s3.region, "Using S3 artifact store");
            (
                Arc::new(S3ArtifactStore::connect(s3).await),
                Arc::new(HttpFetch::new(None)?),
            )
        }
        ArtifactBackend::Local { root } => {
            tracing::info!(root = %root.display(), "Using local artifact store");
            let local = Arc::new(LocalArtifactStore::new(root.clone()));
            (local.clone(), local)
        }
    };

    let notifier: Arc<dyn Notifier> = match PushConfig::from_env() {
        Some(push) => {
            tracing::info!(gateway = %push.gateway_url, "Push notifications enabled");
            Arc::new(PushNotifier::new(push)?)
        }
        None => {
            tracing::warn!("PUSH_GATEWAY_URL not set, notifications are disabled");
            Arc::new(NoopNotifier)
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    // --- Engine ---
    let machine = CaseStateMachine::new(Arc::new(PgCaseStore::new(pool.clone())));
    let engine = WorkflowEngine::new(
        machine,
        Collaborators {
            renderer,
            artifacts,
            fetch,
            notifier,
        },
        Arc::clone(&event_bus),
    );
    tracing::info!("Aval workflow engine ready");

    shutdown_signal().await;

    // --- Post-shutdown cleanup ---
    let in_flight = engine.in_flight();
    tracing::info!(in_flight, "Draining side effects");
    if tokio::time::timeout(config.drain_timeout, engine.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            in_flight = engine.in_flight(),
            timeout_secs = config.drain_timeout.as_secs(),
            "Side effects still running at drain timeout"
        );
    }

    // Dropping every sender closes the channel and stops the logger.
    drop(engine);
    drop(event_bus);
    match tokio::time::timeout(Duration::from_secs(5), logger_handle).await {
        Ok(Ok(seen)) => tracing::info!(seen, "Event logger stopped"),
        _ => tracing::warn!("Event logger did not stop cleanly"),
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
