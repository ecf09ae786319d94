//! v1.6 ClearCache

use rust_ocpp::v1_6::messages::clear_cache::{ClearCacheRequest, ClearCacheResponse};
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand,
};

pub fn clear_cache(
    sender: &CommandSender,
    charge_point_id: &str,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, "v1.6 ClearCache");

    let payload = encode(&ClearCacheRequest {})?;

    sender.call(charge_point_id, "ClearCache", payload, |value| {
        decode::<ClearCacheResponse>(value).map(|r| status_text(&r.status))
    })
}
