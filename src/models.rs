use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::entity::orders::OrderStatus;

/// Public view of an account; the password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub blocked: bool,
    pub online: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A purchasable color/size combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    pub color: String,
    pub size: String,
    pub stock: i32,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub brand: String,
    pub model_name: String,
    pub gender: Option<String>,
    pub category: Option<String>,
    pub width: Option<String>,
    pub material: Option<String>,
    /// Price in minor currency units.
    pub price: i64,
    pub photo: Option<String>,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Looks up the variant a shopper addresses by color and size.
    pub fn variant(&self, color: Option<&str>, size: Option<&str>) -> Option<&Variant> {
        let (color, size) = (color?, size?);
        self.variants
            .iter()
            .find(|v| v.color == color && v.size == size)
    }
}

/// Snapshot of a cart line taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub brand: String,
    pub model_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLine>,
    pub total_amount: i64,
    pub address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
