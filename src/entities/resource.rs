use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stock lot materialized from a position of an accepted inbound document.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub document_id: Uuid,
    pub position_id: Option<Uuid>,
    pub location_id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 5)))")]
    pub quantity: Decimal,
    pub given_unit: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 5)))", nullable)]
    pub conversion: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 5)))", nullable)]
    pub price: Option<Decimal>,
    pub batch: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub storage_location_id: Option<Uuid>,
    pub pallet_number_id: Option<Uuid>,
    pub type_of_pallet: Option<String>,
    pub waste: bool,
    pub time: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id"
    )]
    Document,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
