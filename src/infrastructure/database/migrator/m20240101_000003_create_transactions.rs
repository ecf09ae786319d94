//! Create transactions table

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_charge_points::ChargePoints;
use super::m20240101_000002_create_connectors::Connectors;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::ChargePointId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::ConnectorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::IdTag).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::EndTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Transactions::MeterStart)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::MeterStop).integer())
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .default("InProgress"),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_charge_point")
                            .from(Transactions::Table, Transactions::ChargePointId)
                            .to(ChargePoints::Table, ChargePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_connector")
                            .from(
                                Transactions::Table,
                                (Transactions::ChargePointId, Transactions::ConnectorId),
                            )
                            .to(Connectors::Table, (Connectors::ChargePointId, Connectors::Id)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_charge_point")
                    .table(Transactions::Table)
                    .col(Transactions::ChargePointId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Transactions {
    Table,
    Id,
    ChargePointId,
    ConnectorId,
    IdTag,
    StartTime,
    EndTime,
    MeterStart,
    MeterStop,
    Status,
    CreatedAt,
    UpdatedAt,
}
