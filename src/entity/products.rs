use chrono::Utc;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Product, Variant};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Variants(pub Vec<Variant>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub brand: String,
    pub model_name: String,
    pub gender: Option<String>,
    pub category: Option<String>,
    pub width: Option<String>,
    pub material: Option<String>,
    pub price: i64,
    pub photo: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub variants: Variants,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Product {
            id: model.id,
            brand: model.brand,
            model_name: model.model_name,
            gender: model.gender,
            category: model.category,
            width: model.width,
            material: model.material,
            price: model.price,
            photo: model.photo,
            variants: model.variants.0,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
