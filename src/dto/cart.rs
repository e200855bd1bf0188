use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cart::LineKey;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    /// Defaults to 1 when omitted.
    pub quantity: Option<i32>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl AddToCartRequest {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.color.as_deref(), self.size.as_deref())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl UpdateCartItemRequest {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.color.as_deref(), self.size.as_deref())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub product_id: Uuid,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl RemoveFromCartRequest {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.color.as_deref(), self.size.as_deref())
    }
}
