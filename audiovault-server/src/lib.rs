pub mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use audiovault_core::blob::{BlobWriter, S3BlobStore};
use audiovault_core::catalog::{CatalogWriter, PgCatalog};
use audiovault_core::health::HealthProber;
use audiovault_core::ingest::{Coordinator, Pipeline, WorkerPool};
use audiovault_core::metrics::{MetricsEmitter, PushGateway};
use audiovault_core::Settings;

/// Shared handles for the HTTP handlers. Everything inside is constructed
/// once at startup.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub prober: Arc<HealthProber>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/create", post(routes::create))
        .route("/health", get(routes::health))
        .with_state(state)
}

pub fn setup_tracing() {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
}

/// Builds the real clients, serves until a shutdown signal, then drains the
/// ingestion pool and closes the database pool.
pub async fn run(settings: Settings) -> Result<()> {
    let pipeline_settings = &settings.pipeline;
    let sink_timeout = pipeline_settings.sink_timeout();

    let catalog = PgCatalog::connect_lazy(
        &settings.postgres.pg_config(sink_timeout),
        settings.postgres.table.clone(),
    )?;
    if settings.postgres.auto_migrate {
        // The database may still be starting; health reports it until then.
        match catalog.ensure_schema().await {
            Ok(()) => info!(table = %settings.postgres.table, "Catalog schema ready"),
            Err(e) => warn!(error = %e, "Catalog schema check failed"),
        }
    }
    let catalog = Arc::new(catalog);

    let blob = Arc::new(
        S3BlobStore::connect(settings.minio.s3_config(sink_timeout))
            .await
            .context("Failed to configure blob store client")?,
    );
    let gateway = Arc::new(PushGateway::new(
        settings.pushgateway.url.clone(),
        pipeline_settings.metrics_timeout(),
    )?);

    let pipeline = Pipeline::new(
        BlobWriter::new(
            blob.clone(),
            settings.minio.bucket.clone(),
            settings.minio.region.clone(),
            sink_timeout,
        ),
        CatalogWriter::new(catalog.clone(), sink_timeout),
        MetricsEmitter::new(gateway.clone(), pipeline_settings.metrics_timeout()),
        settings.pushgateway.job.clone(),
        settings.pushgateway.service.clone(),
    );
    let pool = WorkerPool::new(
        pipeline_settings.max_in_flight,
        pipeline_settings.queue_timeout(),
    );
    let coordinator = Arc::new(Coordinator::new(pipeline, pool));
    let prober = Arc::new(HealthProber::new(
        catalog.clone(),
        blob,
        gateway,
        pipeline_settings.probe_timeout(),
    ));

    let app = router(AppState {
        coordinator: coordinator.clone(),
        prober,
    });

    let listener = tokio::net::TcpListener::bind(&settings.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.bind))?;
    info!(
        bind = %settings.server.bind,
        max_in_flight = pipeline_settings.max_in_flight,
        "audiovault listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    let report = coordinator
        .shutdown(pipeline_settings.shutdown_grace())
        .await;
    if !report.abandoned.is_empty() {
        error!(
            abandoned = report.abandoned.len(),
            ids = ?report.abandoned,
            "Shutdown abandoned in-flight ingestions; reconcile these ids"
        );
    }
    catalog.close().await;
    info!("audiovault stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for ctrl-c");
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
                error!(?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
