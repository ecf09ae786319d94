//! Command dispatcher: the single entry point for issuing commands.
//!
//! Every operation returns synchronously: `Err(NotConnected)` when the
//! device is offline (nothing is sent), otherwise a [`PendingCommand`] the
//! caller can await or hand a continuation. Nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    v16, Availability, CommandError, ConfigurationResult, PendingCommand, ResetKind,
    SharedCommandSender, TriggerType,
};

fn record_command(action: &'static str, issued: &Result<impl Sized, CommandError>) {
    let outcome = match issued {
        Ok(_) => "sent",
        Err(CommandError::NotConnected(_)) => "offline",
        Err(_) => "failed",
    };
    metrics::counter!("ocpp_commands_total", "action" => action, "outcome" => outcome)
        .increment(1);
}

pub struct CommandDispatcher {
    command_sender: SharedCommandSender,
}

pub type SharedCommandDispatcher = Arc<CommandDispatcher>;

impl CommandDispatcher {
    pub fn new(command_sender: SharedCommandSender) -> Self {
        Self { command_sender }
    }

    pub fn command_sender(&self) -> &SharedCommandSender {
        &self.command_sender
    }

    fn issue<T>(
        &self,
        action: &'static str,
        charge_point_id: &str,
        build: impl FnOnce() -> Result<PendingCommand<T>, CommandError>,
    ) -> Result<PendingCommand<T>, CommandError> {
        debug!(charge_point_id, action, "Dispatching command");
        let issued = build();
        record_command(action, &issued);
        issued
    }

    pub fn reset(
        &self,
        charge_point_id: &str,
        reset_type: ResetKind,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("Reset", charge_point_id, || {
            v16::reset::reset(&self.command_sender, charge_point_id, reset_type)
        })
    }

    pub fn change_availability(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        availability: Availability,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("ChangeAvailability", charge_point_id, || {
            v16::change_availability::change_availability(
                &self.command_sender,
                charge_point_id,
                connector_id,
                availability,
            )
        })
    }

    pub fn unlock_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("UnlockConnector", charge_point_id, || {
            v16::unlock_connector::unlock_connector(
                &self.command_sender,
                charge_point_id,
                connector_id,
            )
        })
    }

    pub fn remote_start(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        id_tag: &str,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("RemoteStartTransaction", charge_point_id, || {
            v16::remote_start::remote_start_transaction(
                &self.command_sender,
                charge_point_id,
                connector_id,
                id_tag,
            )
        })
    }

    pub fn remote_stop(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("RemoteStopTransaction", charge_point_id, || {
            v16::remote_stop::remote_stop_transaction(
                &self.command_sender,
                charge_point_id,
                transaction_id,
            )
        })
    }

    pub fn trigger_message(
        &self,
        charge_point_id: &str,
        requested_message: TriggerType,
        connector_id: Option<u32>,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("TriggerMessage", charge_point_id, || {
            v16::trigger_message::trigger_message(
                &self.command_sender,
                charge_point_id,
                requested_message,
                connector_id,
            )
        })
    }

    pub fn get_diagnostics(
        &self,
        charge_point_id: &str,
        location: &str,
        start_time: Option<DateTime<Utc>>,
        stop_time: Option<DateTime<Utc>>,
    ) -> Result<PendingCommand<Option<String>>, CommandError> {
        self.issue("GetDiagnostics", charge_point_id, || {
            v16::get_diagnostics::get_diagnostics(
                &self.command_sender,
                charge_point_id,
                location,
                start_time,
                stop_time,
            )
        })
    }

    pub fn update_firmware(
        &self,
        charge_point_id: &str,
        location: &str,
        retrieve_date: DateTime<Utc>,
    ) -> Result<PendingCommand<()>, CommandError> {
        self.issue("UpdateFirmware", charge_point_id, || {
            v16::update_firmware::update_firmware(
                &self.command_sender,
                charge_point_id,
                location,
                retrieve_date,
            )
        })
    }

    pub fn clear_cache(&self, charge_point_id: &str) -> Result<PendingCommand<String>, CommandError> {
        self.issue("ClearCache", charge_point_id, || {
            v16::clear_cache::clear_cache(&self.command_sender, charge_point_id)
        })
    }

    pub fn get_configuration(
        &self,
        charge_point_id: &str,
        keys: Option<Vec<String>>,
    ) -> Result<PendingCommand<ConfigurationResult>, CommandError> {
        self.issue("GetConfiguration", charge_point_id, || {
            v16::get_configuration::get_configuration(&self.command_sender, charge_point_id, keys)
        })
    }

    pub fn change_configuration(
        &self,
        charge_point_id: &str,
        key: &str,
        value: &str,
    ) -> Result<PendingCommand<String>, CommandError> {
        self.issue("ChangeConfiguration", charge_point_id, || {
            v16::change_configuration::change_configuration(
                &self.command_sender,
                charge_point_id,
                key,
                value,
            )
        })
    }
}
