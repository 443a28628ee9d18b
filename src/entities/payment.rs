use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    /// Duplicates the order's public identifier for convenient lookup
    pub order_number: String,
    /// Payment provider name; only "mock" today
    pub provider: String,
    /// Provider-assigned identifier, unique, generated at intent creation
    #[sea_orm(unique)]
    pub provider_payment_id: String,
    /// Amount due for THIS payment in minor units; less than the order
    /// total under deposit/split plans
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: String,
    pub pay_plan: String,
    /// Mock checkout URL handed to the client
    pub pay_url: String,
    /// Raw snapshot of the creation request and computed schedule
    #[sea_orm(column_type = "Json")]
    pub request_payload: Json,
    /// Most recent confirmation/webhook payload, timestamped
    #[sea_orm(column_type = "Json", nullable)]
    pub webhook_payload: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
