//! OCPP Central System
//!
//! OCPP 1.6 WebSocket endpoint plus REST façade. Reads configuration from
//! `$OCPP_CONFIG` or `<config_dir>/ocpp-cpms/config.toml`.

use std::sync::Arc;

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ocpp_cpms::application::{
    AuditLogger, CommandDispatcher, CommandSender, SessionManager, SessionRegistry,
    TransactionIdAllocator,
};
use ocpp_cpms::config::{default_config_path, AppConfig, LogFormat, LoggingConfig};
use ocpp_cpms::domain::SharedStateStore;
use ocpp_cpms::infrastructure::database::migrator::Migrator;
use ocpp_cpms::infrastructure::{init_database, DatabaseConfig, DeadlineStore, SeaOrmStateStore};
use ocpp_cpms::interfaces::http::{create_api_router, ApiState};
use ocpp_cpms::interfaces::ws::OcppServer;
use ocpp_cpms::shared::shutdown::ShutdownCoordinator;

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Configuration & logging ────────────────────────────────
    let config_path = std::env::var("OCPP_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let (app_cfg, config_error) = AppConfig::load_or_default(&config_path);
    init_tracing(&app_cfg.logging);
    match config_error {
        None => info!(path = %config_path.display(), "Configuration loaded"),
        Some(e) => error!(path = %config_path.display(), error = %e, "Failed to load config, using defaults"),
    }

    info!("Starting OCPP Central System...");

    // Installed before anything records a metric.
    let prometheus_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed, /metrics disabled");
            None
        }
    };

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url(),
        max_connections: app_cfg.database.max_connections,
    };
    let db = init_database(&db_config).await.map_err(|e| {
        error!(error = %e, "Failed to connect to database");
        e
    })?;

    info!("Running database migrations...");
    Migrator::up(&db, None).await.map_err(|e| {
        error!(error = %e, "Failed to run migrations");
        e
    })?;
    info!("Migrations completed");

    let store: SharedStateStore = Arc::new(DeadlineStore::new(
        Arc::new(SeaOrmStateStore::new(db.clone())),
        app_cfg.ocpp.store_timeout(),
    ));

    // Nothing is connected before the listener starts.
    match store.reset_connections(Utc::now()).await {
        Ok(0) => {}
        Ok(count) => info!(count, "Cleared connection flags left by the previous run"),
        Err(e) => warn!(error = %e, "Failed to clear stale connection flags"),
    }

    // ── Session engine ─────────────────────────────────────────
    let allocator =
        TransactionIdAllocator::seeded(store.as_ref(), app_cfg.ocpp.transaction_id_start).await?;
    info!(last_issued = allocator.last_issued(), "Transaction id allocator seeded");

    let audit = AuditLogger::spawn(store.clone(), app_cfg.ocpp.audit_queue_capacity);

    let session_manager = Arc::new(
        SessionManager::new(store.clone(), audit.clone(), Arc::new(allocator))
            .with_policy(app_cfg.ocpp.registration_policy())
            .with_heartbeat_interval(app_cfg.ocpp.heartbeat_interval),
    );

    let session_registry = SessionRegistry::shared();
    let command_sender = Arc::new(CommandSender::new(
        session_registry.clone(),
        audit.clone(),
        app_cfg.ocpp.command_timeout(),
    ));
    let command_dispatcher = Arc::new(CommandDispatcher::new(command_sender.clone()));

    // ── Shutdown ───────────────────────────────────────────────
    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    let server = OcppServer::new(
        app_cfg.server.clone(),
        session_registry.clone(),
        session_manager,
        command_sender,
    )
    .with_shutdown(shutdown_signal.clone());

    // ── REST API ───────────────────────────────────────────────
    let api_state = ApiState::new(store, session_registry, command_dispatcher)
        .with_database(db.clone());
    let api_router = create_api_router(api_state, prometheus_handle);

    let api_addr = app_cfg.server.api_address();
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    let api_shutdown = shutdown_signal.clone();
    let api_server = axum::serve(
        listener,
        api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        api_shutdown.wait().await;
        info!("REST API server received shutdown signal");
    });

    info!("All servers started. Press Ctrl+C to shutdown gracefully.");

    let ws_result = tokio::spawn(async move { server.run().await });
    let api_result = tokio::spawn(async move { api_server.await });

    tokio::select! {
        result = ws_result => {
            match result {
                Ok(Ok(())) => info!("WebSocket server stopped"),
                Ok(Err(e)) => error!(error = %e, "WebSocket server error"),
                Err(e) => error!(error = %e, "WebSocket server task panicked"),
            }
        }
        result = api_result => {
            match result {
                Ok(Ok(())) => info!("REST API server stopped"),
                Ok(Err(e)) => error!(error = %e, "REST API server error"),
                Err(e) => error!(error = %e, "REST API server task panicked"),
            }
        }
    }
    // Either server stopping on its own takes the other one down too.
    shutdown_signal.trigger();

    // ── Cleanup ────────────────────────────────────────────────
    let audit_drained = shutdown
        .run_cleanup(|| async {
            audit.shutdown().await;
        })
        .await;
    if !audit_drained {
        warn!(dropped = audit.dropped_count(), "Audit queue not fully drained");
    }

    if let Err(e) = db.close().await {
        warn!(error = %e, "Error closing database connection");
    } else {
        info!("Database connection closed");
    }

    info!("OCPP Central System shutdown complete");
    Ok(())
}
