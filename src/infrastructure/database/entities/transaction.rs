//! Transaction entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Assigned by the central system, never auto-incremented by the database
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub charge_point_id: String,
    pub connector_id: i32,
    pub id_tag: String,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,

    pub meter_start: i32,

    #[sea_orm(nullable)]
    pub meter_stop: Option<i32>,

    /// InProgress, Completed, Stopped
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charge_point::Entity",
        from = "Column::ChargePointId",
        to = "super::charge_point::Column::Id"
    )]
    ChargePoint,
    #[sea_orm(
        belongs_to = "super::connector::Entity",
        from = "(Column::ChargePointId, Column::ConnectorId)",
        to = "(super::connector::Column::ChargePointId, super::connector::Column::Id)"
    )]
    Connector,
    #[sea_orm(has_many = "super::meter_value::Entity")]
    MeterValues,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl Related<super::connector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connector.def()
    }
}

impl Related<super::meter_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeterValues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
