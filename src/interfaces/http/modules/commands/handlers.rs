//! Remote command API handlers
//!
//! Each handler issues one command through the [`CommandDispatcher`] and
//! waits for the charge point's confirmation.
//!
//! [`CommandDispatcher`]: crate::application::CommandDispatcher

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use super::dto::{
    ChangeAvailabilityRequest, ChangeConfigurationRequest, CommandResponse,
    ConfigurationResponse, DiagnosticsResponse, GetConfigurationRequest, GetDiagnosticsRequest,
    RemoteStartRequest, RemoteStopRequest, ResetRequest, UnlockConnectorRequest,
    UpdateFirmwareRequest,
};
use crate::application::{CommandError, PendingCommand, SharedCommandDispatcher, TriggerType};
use crate::interfaces::http::common::{api_error, ApiError, ApiResponse, ApiResult, ValidatedJson};

const SEND_FAILED: &str = "Failed to send command to charge point";

#[derive(Clone)]
pub struct CommandAppState {
    pub command_dispatcher: SharedCommandDispatcher,
}

/// Offline devices answer 404; every other failure gets a generic message
/// and the cause goes to the log.
fn command_failure<R>(charge_point_id: &str, action: &str, err: CommandError) -> ApiError<R> {
    match err {
        CommandError::NotConnected(_) => api_error(
            StatusCode::NOT_FOUND,
            format!("Charge point '{}' is not connected", charge_point_id),
        ),
        other => {
            error!(charge_point_id, action, error = %other, "Command failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, SEND_FAILED)
        }
    }
}

async fn complete<T, R>(
    charge_point_id: &str,
    issued: Result<PendingCommand<T>, CommandError>,
    respond: impl FnOnce(T) -> R,
) -> ApiResult<R>
where
    T: Send + 'static,
{
    let pending = match issued {
        Ok(pending) => pending,
        Err(e) => return Err(command_failure(charge_point_id, "issue", e)),
    };
    let action = pending.action();
    pending
        .wait()
        .await
        .map(|outcome| Json(ApiResponse::success(respond(outcome))))
        .map_err(|e| command_failure(charge_point_id, action, e))
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/reset",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn reset(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ResetRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state
        .command_dispatcher
        .reset(&charge_point_id, request.reset_type.into());
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/availability",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = ChangeAvailabilityRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn change_availability(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangeAvailabilityRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state.command_dispatcher.change_availability(
        &charge_point_id,
        request.connector_id,
        request.availability_type.into(),
    );
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/unlock",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = UnlockConnectorRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn unlock_connector(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UnlockConnectorRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state
        .command_dispatcher
        .unlock_connector(&charge_point_id, request.connector_id);
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/starttransaction",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = RemoteStartRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn remote_start(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<RemoteStartRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state.command_dispatcher.remote_start(
        &charge_point_id,
        request.connector_id,
        &request.id_tag,
    );
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/stoptransaction",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = RemoteStopRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn remote_stop(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<RemoteStopRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state
        .command_dispatcher
        .remote_stop(&charge_point_id, request.transaction_id);
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

/// Ask the charge point to send a Heartbeat now.
#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/heartbeat",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected")
    )
)]
pub async fn trigger_heartbeat(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
) -> ApiResult<CommandResponse> {
    let issued =
        state
            .command_dispatcher
            .trigger_message(&charge_point_id, TriggerType::Heartbeat, None);
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/diagnostics",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = GetDiagnosticsRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<DiagnosticsResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn get_diagnostics(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<GetDiagnosticsRequest>,
) -> ApiResult<DiagnosticsResponse> {
    let issued = state.command_dispatcher.get_diagnostics(
        &charge_point_id,
        &request.location,
        request.start_time,
        request.stop_time,
    );
    complete(&charge_point_id, issued, |file_name| DiagnosticsResponse {
        file_name,
    })
    .await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/firmware",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = UpdateFirmwareRequest,
    responses(
        (status = 200, description = "Charge point acknowledged", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_firmware(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateFirmwareRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state.command_dispatcher.update_firmware(
        &charge_point_id,
        &request.location,
        request.retrieve_date,
    );
    complete(&charge_point_id, issued, |()| CommandResponse {
        status: "Accepted".to_string(),
        message: Some("Firmware update scheduled".to_string()),
    })
    .await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/clearcache",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected")
    )
)]
pub async fn clear_cache(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
) -> ApiResult<CommandResponse> {
    let issued = state.command_dispatcher.clear_cache(&charge_point_id);
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}

#[utoipa::path(
    post,
    path = "/api/v1/chargepoints/{charge_point_id}/configuration",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = GetConfigurationRequest,
    responses(
        (status = 200, description = "Configuration keys", body = ApiResponse<ConfigurationResponse>),
        (status = 404, description = "Not connected")
    )
)]
pub async fn get_configuration(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<GetConfigurationRequest>,
) -> ApiResult<ConfigurationResponse> {
    let issued = state
        .command_dispatcher
        .get_configuration(&charge_point_id, request.keys);
    complete(&charge_point_id, issued, ConfigurationResponse::from).await
}

#[utoipa::path(
    put,
    path = "/api/v1/chargepoints/{charge_point_id}/configuration",
    tag = "Commands",
    params(("charge_point_id" = String, Path, description = "Charge point ID")),
    request_body = ChangeConfigurationRequest,
    responses(
        (status = 200, description = "Charge point answered", body = ApiResponse<CommandResponse>),
        (status = 404, description = "Not connected"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn change_configuration(
    State(state): State<CommandAppState>,
    Path(charge_point_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangeConfigurationRequest>,
) -> ApiResult<CommandResponse> {
    let issued = state.command_dispatcher.change_configuration(
        &charge_point_id,
        &request.key,
        &request.value,
    );
    complete(&charge_point_id, issued, CommandResponse::from_status).await
}
