//! Charge point API handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use super::dto::{ChargePointDto, ConnectorDto};
use crate::application::SharedSessionRegistry;
use crate::domain::SharedStateStore;
use crate::interfaces::http::common::{api_error, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStateStore,
    pub session_registry: SharedSessionRegistry,
}

#[utoipa::path(
    get,
    path = "/api/v1/chargepoints",
    tag = "Charge Points",
    responses(
        (status = 200, description = "All known charge points", body = ApiResponse<Vec<ChargePointDto>>)
    )
)]
pub async fn list_charge_points(State(state): State<AppState>) -> ApiResult<Vec<ChargePointDto>> {
    let charge_points = state.store.list_charge_points().await.map_err(|e| {
        error!(error = %e, "Failed to list charge points");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load charge points")
    })?;

    let dtos = charge_points
        .into_iter()
        .map(|cp| {
            let is_online = state.session_registry.is_connected(&cp.id);
            ChargePointDto::from_domain(cp, is_online)
        })
        .collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/chargepoints/{charge_point_id}",
    tag = "Charge Points",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    responses(
        (status = 200, description = "Charge point details", body = ApiResponse<ChargePointDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_charge_point(
    State(state): State<AppState>,
    Path(charge_point_id): Path<String>,
) -> ApiResult<ChargePointDto> {
    match state.store.get_charge_point(&charge_point_id).await {
        Ok(Some(cp)) => {
            let is_online = state.session_registry.is_connected(&cp.id);
            Ok(Json(ApiResponse::success(ChargePointDto::from_domain(cp, is_online))))
        }
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Charge point '{}' not found", charge_point_id),
        )),
        Err(e) => {
            error!(charge_point_id = charge_point_id.as_str(), error = %e, "Failed to load charge point");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load charge point",
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/chargepoints/{charge_point_id}/connectors",
    tag = "Charge Points",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    responses(
        (status = 200, description = "Connectors ordered by id", body = ApiResponse<Vec<ConnectorDto>>),
        (status = 404, description = "Charge point not found")
    )
)]
pub async fn list_connectors(
    State(state): State<AppState>,
    Path(charge_point_id): Path<String>,
) -> ApiResult<Vec<ConnectorDto>> {
    let load = async {
        if state.store.get_charge_point(&charge_point_id).await?.is_none() {
            return Ok(None);
        }
        state.store.list_connectors(&charge_point_id).await.map(Some)
    };

    match load.await {
        Ok(Some(connectors)) => Ok(Json(ApiResponse::success(
            connectors.into_iter().map(ConnectorDto::from).collect(),
        ))),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Charge point '{}' not found", charge_point_id),
        )),
        Err(e) => {
            error!(charge_point_id = charge_point_id.as_str(), error = %e, "Failed to list connectors");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load connectors",
            ))
        }
    }
}
