//! Connector entity, keyed by (charge_point_id, id)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connectors")]
pub struct Model {
    /// Connector number on the charge point (0 addresses the whole station)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub charge_point_id: String,

    /// OCPP ChargePointStatus: Available, Preparing, Charging, SuspendedEVSE,
    /// SuspendedEV, Finishing, Reserved, Unavailable, Faulted
    pub status: String,

    /// OCPP ChargePointErrorCode
    pub error_code: String,

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
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
