//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::modules::charge_points::{self, ChargePointDto, ConnectorDto};
use super::modules::commands::{self, dto::*};
use super::modules::health::{self, ComponentHealth, HealthResponse};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::transactions::{self, TransactionDto};
use crate::application::{SharedCommandDispatcher, SharedSessionRegistry};
use crate::domain::SharedStateStore;

/// Everything the REST façade needs. Each handler extracts its own slice
/// through `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub store: SharedStateStore,
    pub session_registry: SharedSessionRegistry,
    pub command_dispatcher: SharedCommandDispatcher,
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

impl ApiState {
    pub fn new(
        store: SharedStateStore,
        session_registry: SharedSessionRegistry,
        command_dispatcher: SharedCommandDispatcher,
    ) -> Self {
        Self {
            store,
            session_registry,
            command_dispatcher,
            db: None,
            started_at: Arc::new(Instant::now()),
        }
    }

    /// Let `/health` ping the database.
    pub fn with_database(mut self, db: DatabaseConnection) -> Self {
        self.db = Some(db);
        self
    }
}

impl FromRef<ApiState> for charge_points::AppState {
    fn from_ref(s: &ApiState) -> Self {
        charge_points::AppState {
            store: Arc::clone(&s.store),
            session_registry: s.session_registry.clone(),
        }
    }
}

impl FromRef<ApiState> for transactions::TransactionAppState {
    fn from_ref(s: &ApiState) -> Self {
        transactions::TransactionAppState {
            store: Arc::clone(&s.store),
        }
    }
}

impl FromRef<ApiState> for commands::CommandAppState {
    fn from_ref(s: &ApiState) -> Self {
        commands::CommandAppState {
            command_dispatcher: Arc::clone(&s.command_dispatcher),
        }
    }
}

impl FromRef<ApiState> for health::HealthState {
    fn from_ref(s: &ApiState) -> Self {
        health::HealthState {
            db: s.db.clone(),
            session_registry: s.session_registry.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        charge_points::list_charge_points,
        charge_points::get_charge_point,
        charge_points::list_connectors,
        transactions::get_transaction,
        commands::reset,
        commands::change_availability,
        commands::unlock_connector,
        commands::remote_start,
        commands::remote_stop,
        commands::trigger_heartbeat,
        commands::get_diagnostics,
        commands::update_firmware,
        commands::clear_cache,
        commands::get_configuration,
        commands::change_configuration,
    ),
    components(
        schemas(
            HealthResponse,
            ComponentHealth,
            ChargePointDto,
            ConnectorDto,
            TransactionDto,
            ResetType,
            AvailabilityType,
            ResetRequest,
            ChangeAvailabilityRequest,
            UnlockConnectorRequest,
            RemoteStartRequest,
            RemoteStopRequest,
            GetDiagnosticsRequest,
            UpdateFirmwareRequest,
            GetConfigurationRequest,
            ChangeConfigurationRequest,
            CommandResponse,
            DiagnosticsResponse,
            ConfigValue,
            ConfigurationResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Charge Points", description = "Registered charge points and their connectors"),
        (name = "Transactions", description = "Charging sessions"),
        (name = "Commands", description = "OCPP 1.6 commands sent to connected charge points"),
    ),
    info(
        title = "OCPP Central System API",
        version = "1.0.0",
        description = "REST façade over the OCPP 1.6 session and state engine"
    )
)]
pub struct ApiDoc;

/// Build the REST router. `/metrics` is only mounted when a Prometheus
/// recorder handle is supplied.
pub fn create_api_router(state: ApiState, metrics: Option<PrometheusHandle>) -> Router {
    let charge_point_routes = Router::new()
        .route("/", get(charge_points::list_charge_points))
        .route("/{charge_point_id}", get(charge_points::get_charge_point))
        .route(
            "/{charge_point_id}/connectors",
            get(charge_points::list_connectors),
        )
        .route("/{charge_point_id}/reset", post(commands::reset))
        .route(
            "/{charge_point_id}/availability",
            post(commands::change_availability),
        )
        .route("/{charge_point_id}/unlock", post(commands::unlock_connector))
        .route(
            "/{charge_point_id}/starttransaction",
            post(commands::remote_start),
        )
        .route(
            "/{charge_point_id}/stoptransaction",
            post(commands::remote_stop),
        )
        .route(
            "/{charge_point_id}/heartbeat",
            post(commands::trigger_heartbeat),
        )
        .route(
            "/{charge_point_id}/diagnostics",
            post(commands::get_diagnostics),
        )
        .route("/{charge_point_id}/firmware", post(commands::update_firmware))
        .route("/{charge_point_id}/clearcache", post(commands::clear_cache))
        .route(
            "/{charge_point_id}/configuration",
            post(commands::get_configuration).put(commands::change_configuration),
        );

    let transaction_routes =
        Router::new().route("/{transaction_id}", get(transactions::get_transaction));

    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/chargepoints", charge_point_routes)
        .nest("/api/v1/transactions", transaction_routes)
        .route_layer(middleware::from_fn(http_metrics_middleware))
        .with_state(state);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(api);

    if let Some(handle) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}
