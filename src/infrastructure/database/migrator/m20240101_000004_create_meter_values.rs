//! Create meter_values table

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_connectors::Connectors;
use super::m20240101_000003_create_transactions::Transactions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MeterValues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeterValues::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MeterValues::TransactionId).integer())
                    .col(
                        ColumnDef::new(MeterValues::ChargePointId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MeterValues::ConnectorId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MeterValues::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MeterValues::Value).double().not_null())
                    .col(ColumnDef::new(MeterValues::Unit).string().not_null())
                    .col(ColumnDef::new(MeterValues::Measurand).string().not_null())
                    .col(
                        ColumnDef::new(MeterValues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meter_values_transaction")
                            .from(MeterValues::Table, MeterValues::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meter_values_connector")
                            .from(
                                MeterValues::Table,
                                (MeterValues::ChargePointId, MeterValues::ConnectorId),
                            )
                            .to(Connectors::Table, (Connectors::ChargePointId, Connectors::Id)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meter_values_transaction")
                    .table(MeterValues::Table)
                    .col(MeterValues::TransactionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MeterValues::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MeterValues {
    Table,
    Id,
    TransactionId,
    ChargePointId,
    ConnectorId,
    Timestamp,
    Value,
    Unit,
    Measurand,
    CreatedAt,
}
