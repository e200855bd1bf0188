use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    cart::Cart,
    models::Product,
    store::{CartStore, CatalogStore, StoreError, StoreResult},
};

/// In-process store implementing both seams; counts cart writes so callers
/// can observe when a read path persisted anything.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    carts: RwLock<HashMap<Uuid, Cart>>,
    cart_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn remove_product(&self, id: Uuid) -> Option<Product> {
        self.products.write().await.remove(&id)
    }

    /// Direct load of the stored cart, bypassing any reconciliation.
    pub async fn stored_cart(&self, user_id: Uuid) -> Option<Cart> {
        self.carts.read().await.get(&user_id).cloned()
    }

    /// Number of cart creates plus saves performed so far.
    pub fn cart_writes(&self) -> usize {
        self.cart_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        Ok(self.carts.read().await.get(&user_id).cloned())
    }

    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        let cart = Cart::empty(user_id);
        self.carts.write().await.insert(user_id, cart.clone());
        self.cart_writes.fetch_add(1, Ordering::SeqCst);
        Ok(cart)
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        let mut carts = self.carts.write().await;
        match carts.get_mut(&cart.user_id) {
            Some(stored) if stored.id == cart.id => {
                stored.items = cart.items.clone();
                stored.updated_at = cart.updated_at;
            }
            _ => return Err(StoreError::MissingCart(cart.id)),
        }
        self.cart_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
