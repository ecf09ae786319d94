//! Protocol audit log entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ocpp_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub charge_point_id: String,
    /// Request or Response
    pub message_type: String,
    pub action: String,
    pub request_id: String,
    /// Raw JSON text
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    /// Inbound or Outbound
    pub direction: String,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
