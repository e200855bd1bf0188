//! Storage seams used by the Cart Engine: a read-only catalog and whole-document cart storage.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{cart::Cart, models::Product};

mod memory;
mod orm;

pub use memory::MemoryStore;
pub use orm::OrmStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("cart {0} does not exist")]
    MissingCart(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Resolve a product by id; `None` when it has been deleted or never existed.
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>>;

    /// Create an empty cart for the user.
    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart>;

    /// Overwrite the stored line list and `updated_at` of an existing cart.
    async fn save_cart(&self, cart: &Cart) -> StoreResult<()>;
}
