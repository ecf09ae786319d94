//! Create ocpp_messages table (append-only audit trail)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OcppMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OcppMessages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OcppMessages::ChargePointId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OcppMessages::MessageType).string().not_null())
                    .col(ColumnDef::new(OcppMessages::Action).string().not_null())
                    .col(ColumnDef::new(OcppMessages::RequestId).string().not_null())
                    .col(ColumnDef::new(OcppMessages::Payload).text().not_null())
                    .col(ColumnDef::new(OcppMessages::Direction).string().not_null())
                    .col(
                        ColumnDef::new(OcppMessages::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ocpp_messages_charge_point")
                    .table(OcppMessages::Table)
                    .col(OcppMessages::ChargePointId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ocpp_messages_timestamp")
                    .table(OcppMessages::Table)
                    .col(OcppMessages::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OcppMessages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum OcppMessages {
    Table,
    Id,
    ChargePointId,
    MessageType,
    Action,
    RequestId,
    Payload,
    Direction,
    Timestamp,
}
