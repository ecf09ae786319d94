//! SeaORM implementation of [`StateStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::domain::{
    ChargePoint, Connector, ConnectorStatus, MeterValue, OcppMessage, RegistrationStatus,
    StateStore, StopOutcome, StoreError, StoreResult, Transaction, TransactionStatus,
};
use crate::infrastructure::database::entities::{
    charge_point, connector, meter_value, ocpp_message, transaction,
};

pub struct SeaOrmStateStore {
    db: DatabaseConnection,
}

impl SeaOrmStateStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn cp_from_model(m: charge_point::Model) -> ChargePoint {
    ChargePoint {
        id: m.id,
        vendor: m.vendor,
        model: m.model,
        serial_number: m.serial_number,
        firmware_version: m.firmware_version,
        registration_status: RegistrationStatus::from(m.registration_status.as_str()),
        is_connected: m.is_connected,
        connected_since: m.connected_since,
        last_heartbeat: m.last_heartbeat,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn cp_to_active(cp: ChargePoint) -> charge_point::ActiveModel {
    charge_point::ActiveModel {
        id: Set(cp.id),
        vendor: Set(cp.vendor),
        model: Set(cp.model),
        serial_number: Set(cp.serial_number),
        firmware_version: Set(cp.firmware_version),
        last_heartbeat: Set(cp.last_heartbeat),
        registration_status: Set(cp.registration_status.to_string()),
        connected_since: Set(cp.connected_since),
        is_connected: Set(cp.is_connected),
        created_at: Set(cp.created_at),
        updated_at: Set(cp.updated_at),
    }
}

fn connector_from_model(m: connector::Model) -> Connector {
    Connector {
        charge_point_id: m.charge_point_id,
        connector_id: m.id,
        status: ConnectorStatus::from(m.status.as_str()),
        error_code: m.error_code,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn tx_from_model(m: transaction::Model) -> Transaction {
    Transaction {
        id: m.id,
        charge_point_id: m.charge_point_id,
        connector_id: m.connector_id,
        id_tag: m.id_tag,
        start_time: m.start_time,
        meter_start: m.meter_start,
        end_time: m.end_time,
        meter_stop: m.meter_stop,
        status: TransactionStatus::from(m.status.as_str()),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

/// `connected_since` on an upsert conflict: the incoming value only wins on a
/// disconnected → connected transition. Both SQLite and PostgreSQL expose the
/// rejected row as `excluded`.
const CONNECTED_SINCE_ON_CONFLICT: &str = "CASE WHEN NOT charge_points.is_connected \
     AND excluded.is_connected THEN excluded.connected_since \
     ELSE charge_points.connected_since END";

fn charge_point_not_found(id: &str) -> StoreError {
    StoreError::not_found("charge_point", "id", id)
}

#[async_trait]
impl StateStore for SeaOrmStateStore {
    async fn upsert_charge_point(&self, cp: ChargePoint) -> StoreResult<()> {
        charge_point::Entity::insert(cp_to_active(cp))
            .on_conflict(
                OnConflict::column(charge_point::Column::Id)
                    .update_columns([
                        charge_point::Column::Vendor,
                        charge_point::Column::Model,
                        charge_point::Column::SerialNumber,
                        charge_point::Column::FirmwareVersion,
                        charge_point::Column::LastHeartbeat,
                        charge_point::Column::RegistrationStatus,
                        charge_point::Column::IsConnected,
                        charge_point::Column::UpdatedAt,
                    ])
                    .value(
                        charge_point::Column::ConnectedSince,
                        Expr::cust(CONNECTED_SINCE_ON_CONFLICT),
                    )
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn get_charge_point(&self, id: &str) -> StoreResult<Option<ChargePoint>> {
        Ok(charge_point::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(cp_from_model))
    }

    async fn list_charge_points(&self) -> StoreResult<Vec<ChargePoint>> {
        let models = charge_point::Entity::find()
            .order_by_desc(charge_point::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(cp_from_model).collect())
    }

    async fn upsert_connector(&self, c: Connector) -> StoreResult<()> {
        let active = connector::ActiveModel {
            id: Set(c.connector_id),
            charge_point_id: Set(c.charge_point_id),
            status: Set(c.status.to_string()),
            error_code: Set(c.error_code),
            created_at: Set(c.created_at),
            updated_at: Set(c.updated_at),
        };
        connector::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([connector::Column::ChargePointId, connector::Column::Id])
                    .update_columns([
                        connector::Column::Status,
                        connector::Column::ErrorCode,
                        connector::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn get_connector(
        &self,
        charge_point_id: &str,
        connector_id: i32,
    ) -> StoreResult<Option<Connector>> {
        Ok(connector::Entity::find()
            .filter(connector::Column::ChargePointId.eq(charge_point_id))
            .filter(connector::Column::Id.eq(connector_id))
            .one(&self.db)
            .await?
            .map(connector_from_model))
    }

    async fn list_connectors(&self, charge_point_id: &str) -> StoreResult<Vec<Connector>> {
        let models = connector::Entity::find()
            .filter(connector::Column::ChargePointId.eq(charge_point_id))
            .order_by_asc(connector::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(connector_from_model).collect())
    }

    async fn insert_transaction(&self, tx: Transaction) -> StoreResult<()> {
        let id = tx.id;
        let active = transaction::ActiveModel {
            id: Set(tx.id),
            charge_point_id: Set(tx.charge_point_id),
            connector_id: Set(tx.connector_id),
            id_tag: Set(tx.id_tag),
            start_time: Set(tx.start_time),
            end_time: Set(tx.end_time),
            meter_start: Set(tx.meter_start),
            meter_stop: Set(tx.meter_stop),
            status: Set(tx.status.to_string()),
            created_at: Set(tx.created_at),
            updated_at: Set(tx.updated_at),
        };

        match transaction::Entity::insert(active).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(StoreError::Conflict(format!("transaction {}", id)))
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn complete_transaction(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
    ) -> StoreResult<StopOutcome> {
        let txn = self.db.begin().await?;

        let model = transaction::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| StoreError::not_found("transaction", "id", id))?;

        let mut tx = tx_from_model(model.clone());
        if !tx.complete(end_time, meter_stop) {
            txn.commit().await?;
            return Ok(StopOutcome::AlreadyCompleted(tx));
        }

        let mut active: transaction::ActiveModel = model.into();
        active.end_time = Set(tx.end_time);
        active.meter_stop = Set(tx.meter_stop);
        active.status = Set(tx.status.to_string());
        active.updated_at = Set(tx.updated_at);
        active.update(&txn).await?;

        txn.commit().await?;
        debug!(transaction_id = id, "Transaction completed");
        Ok(StopOutcome::Completed(tx))
    }

    async fn get_transaction(&self, id: i32) -> StoreResult<Option<Transaction>> {
        Ok(transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(tx_from_model))
    }

    async fn max_transaction_id(&self) -> StoreResult<Option<i32>> {
        let max: Option<Option<i32>> = transaction::Entity::find()
            .select_only()
            .column_as(transaction::Column::Id.max(), "max_id")
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(max.flatten())
    }

    async fn append_meter_value(&self, mv: MeterValue) -> StoreResult<()> {
        let active = meter_value::ActiveModel {
            transaction_id: Set(mv.transaction_id),
            charge_point_id: Set(mv.charge_point_id),
            connector_id: Set(mv.connector_id),
            timestamp: Set(mv.timestamp),
            value: Set(mv.value),
            unit: Set(mv.unit),
            measurand: Set(mv.measurand),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        meter_value::Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn append_message(&self, msg: OcppMessage) -> StoreResult<()> {
        let active = ocpp_message::ActiveModel {
            charge_point_id: Set(msg.charge_point_id),
            message_type: Set(msg.kind.as_str().to_string()),
            action: Set(msg.action),
            request_id: Set(msg.request_id),
            payload: Set(msg.payload),
            direction: Set(msg.direction.as_str().to_string()),
            timestamp: Set(msg.timestamp),
            ..Default::default()
        };
        ocpp_message::Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn set_connected(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let txn = self.db.begin().await?;

        let model = charge_point::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| charge_point_not_found(id))?;

        let mut cp = cp_from_model(model.clone());
        cp.set_connected(connected, at);

        let mut active: charge_point::ActiveModel = model.into();
        active.is_connected = Set(cp.is_connected);
        active.connected_since = Set(cp.connected_since);
        active.updated_at = Set(cp.updated_at);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn update_heartbeat(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let result = charge_point::Entity::update_many()
            .col_expr(charge_point::Column::LastHeartbeat, Expr::value(at))
            .col_expr(charge_point::Column::UpdatedAt, Expr::value(at))
            .filter(charge_point::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(charge_point_not_found(id));
        }
        Ok(())
    }

    async fn reset_connections(&self, at: DateTime<Utc>) -> StoreResult<u64> {
        let result = charge_point::Entity::update_many()
            .col_expr(charge_point::Column::IsConnected, Expr::value(false))
            .col_expr(charge_point::Column::UpdatedAt, Expr::value(at))
            .filter(charge_point::Column::IsConnected.eq(true))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
