use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Ceremony kind, derived from the submitted ceremony type
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceType {
    #[sea_orm(string_value = "BURIAL")]
    Burial,
    #[sea_orm(string_value = "CREMATION")]
    Cremation,
}

impl ServiceType {
    /// Uppercases the ceremony type and matches; anything that is not
    /// explicitly a cremation is treated as a burial.
    pub fn from_ceremony_type(ceremony_type: Option<&str>) -> Self {
        match ceremony_type.map(|s| s.trim().to_uppercase()) {
            Some(ref t) if t == "CREMATION" => ServiceType::Cremation,
            _ => ServiceType::Burial,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Public-facing identifier, distinct from the internal key
    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    pub customer_id: Uuid,
    pub service_type: ServiceType,
    pub status: OrderStatus,
    /// Total in minor currency units (hundredths)
    pub total_amount: i64,
    pub currency: String,
    /// Full submitted intake payload, kept for audit/replay
    #[sea_orm(column_type = "Json")]
    pub payload: Json,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
