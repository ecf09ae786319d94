//! Authorize handler

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{confirmation, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};

/// Id tags are not checked; every tag is accepted.
pub async fn handle_authorize(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: AuthorizeRequest = parse_request(ctx, InboundAction::Authorize, payload)?;

    info!(
        charge_point_id = ctx.charge_point_id,
        id_tag = req.id_tag.as_str(),
        "Authorize"
    );

    Ok(confirmation(&AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        },
    }))
}
