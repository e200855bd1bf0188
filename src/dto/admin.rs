use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::User, routes::params::Pagination};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Defaults to the configured low-stock threshold.
    pub threshold: Option<i32>,
}

impl LowStockQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Adjusts the stock of the variant addressed by color and size.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub color: String,
    pub size: String,
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCount {
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BlockStatus {
    pub id: Uuid,
    pub blocked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreStats {
    pub registered_user_count: u64,
    pub online_user_count: u64,
    pub product_count: u64,
    pub order_count: u64,
    pub orders_by_status: BTreeMap<String, u64>,
    /// Sum of order totals, excluding cancelled orders.
    pub revenue: i64,
}
