//! Transaction API handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use super::dto::TransactionDto;
use crate::domain::SharedStateStore;
use crate::interfaces::http::common::{api_error, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct TransactionAppState {
    pub store: SharedStateStore,
}

#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "Transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction details", body = ApiResponse<TransactionDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_transaction(
    State(state): State<TransactionAppState>,
    Path(transaction_id): Path<i32>,
) -> ApiResult<TransactionDto> {
    match state.store.get_transaction(transaction_id).await {
        Ok(Some(tx)) => Ok(Json(ApiResponse::success(tx.into()))),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Transaction {} not found", transaction_id),
        )),
        Err(e) => {
            error!(transaction_id, error = %e, "Failed to load transaction");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load transaction",
            ))
        }
    }
}
