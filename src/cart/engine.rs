use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    cart::{
        Cart, CartError, CartLine, CartResult, CartView, LineKey, ProductRef, Reconciled,
        ResolvedCartLine, UserLocks,
    },
    models::Product,
    store::{CartStore, CatalogStore},
};

/// Turns (user, product, color, size, quantity) requests into a consistent cart.
///
/// Every read-modify-write on one user's cart runs under that user's lock, so
/// concurrent additions accumulate instead of overwriting each other.
#[derive(Clone)]
pub struct CartEngine {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
    locks: Arc<UserLocks>,
}

impl CartEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, carts: Arc<dyn CartStore>) -> Self {
        Self {
            catalog,
            carts,
            locks: Arc::new(UserLocks::new()),
        }
    }

    /// Returns the user's reconciled cart. Orphaned lines are purged from storage,
    /// which only ever writes when something was actually purged.
    pub async fn get_cart(&self, user_id: Uuid) -> CartResult<CartView> {
        let _guard = self.locks.acquire(user_id).await;

        let Some(mut cart) = self.carts.find_cart_by_user(user_id).await? else {
            return Ok(CartView::default());
        };

        let Reconciled {
            clean,
            populated,
            orphaned,
        } = self.reconcile(&cart.items).await?;

        if orphaned > 0 {
            tracing::info!(%user_id, orphaned, "purging orphaned cart lines");
            cart.items = clean;
            cart.updated_at = Utc::now();
            self.carts.save_cart(&cart).await?;
        }

        Ok(CartView { items: populated })
    }

    /// Adds `quantity` (default 1) of a product variant, accumulating onto an
    /// existing line with the same key.
    pub async fn add_to_cart(
        &self,
        user_id: Uuid,
        key: LineKey,
        quantity: Option<i32>,
    ) -> CartResult<CartView> {
        let quantity = match quantity {
            None => 1,
            Some(q) if q > 0 => q,
            Some(_) => return Err(CartError::validation("quantity must be greater than 0")),
        };

        if self.catalog.find_product(key.product.id()).await?.is_none() {
            return Err(CartError::not_found("Product not found"));
        }

        let _guard = self.locks.acquire(user_id).await;

        let mut cart = match self.carts.find_cart_by_user(user_id).await? {
            Some(cart) => cart,
            None => self.carts.create_cart(user_id).await?,
        };

        match cart.find_line_mut(&key) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| CartError::validation("quantity too large"))?;
            }
            None => cart.items.push(CartLine::new(key.clone(), quantity)),
        }
        self.persist(&mut cart).await?;

        tracing::debug!(%user_id, product_id = %key.product.id(), quantity, "cart line added");
        self.refetch(user_id).await
    }

    /// Sets the quantity of an existing line. This is an absolute set, not an increment.
    pub async fn update_line(
        &self,
        user_id: Uuid,
        key: LineKey,
        quantity: i32,
    ) -> CartResult<CartView> {
        if quantity <= 0 {
            return Err(CartError::validation("quantity must be greater than 0"));
        }

        let _guard = self.locks.acquire(user_id).await;

        let mut cart = self.load_existing(user_id).await?;
        let line = cart
            .find_line_mut(&key)
            .ok_or_else(|| CartError::not_found("Item not found"))?;
        line.quantity = quantity;
        self.persist(&mut cart).await?;

        tracing::debug!(%user_id, product_id = %key.product.id(), quantity, "cart line updated");
        self.refetch(user_id).await
    }

    /// Removes the line with exactly this key. A key that matches nothing is a no-op.
    pub async fn remove_line(&self, user_id: Uuid, key: LineKey) -> CartResult<CartView> {
        let _guard = self.locks.acquire(user_id).await;

        let mut cart = self.load_existing(user_id).await?;
        let before = cart.items.len();
        cart.items.retain(|line| !line.matches(&key));

        if cart.items.len() != before {
            self.persist(&mut cart).await?;
            tracing::debug!(%user_id, product_id = %key.product.id(), "cart line removed");
        }

        self.refetch(user_id).await
    }

    /// Empties the cart but keeps the cart record.
    pub async fn clear_cart(&self, user_id: Uuid) -> CartResult<Cart> {
        let _guard = self.locks.acquire(user_id).await;

        let mut cart = self.load_existing(user_id).await?;
        cart.items.clear();
        self.persist(&mut cart).await?;

        tracing::debug!(%user_id, "cart cleared");
        Ok(cart)
    }

    /// Hands the reconciled cart to `place` and empties the stored cart once it
    /// succeeds, all under the user's lock. Lines added meanwhile wait for the
    /// lock and land in the emptied cart. A failed `place` leaves the cart as it was.
    pub async fn checkout_with<F, Fut, T, E>(&self, user_id: Uuid, place: F) -> Result<T, E>
    where
        F: FnOnce(CartView) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CartError>,
    {
        let _guard = self.locks.acquire(user_id).await;

        let Some(mut cart) = self
            .carts
            .find_cart_by_user(user_id)
            .await
            .map_err(CartError::from)?
        else {
            return place(CartView::default()).await;
        };

        let populated = self.reconcile(&cart.items).await?.populated;
        let placed = place(CartView { items: populated }).await?;

        cart.items.clear();
        if let Err(err) = self.persist(&mut cart).await {
            // the order already exists; stale lines are all a failed clear leaves
            tracing::warn!(%user_id, error = %err, "failed to clear cart after checkout");
        }

        tracing::debug!(%user_id, "cart checked out");
        Ok(placed)
    }

    /// Resolves every line against the catalog and splits them into valid and orphaned.
    pub async fn reconcile(&self, lines: &[CartLine]) -> CartResult<Reconciled> {
        let mut resolved: HashMap<ProductRef, Option<Product>> = HashMap::new();
        let mut out = Reconciled::default();

        for line in lines {
            let product = match resolved.get(&line.product) {
                Some(product) => product.clone(),
                None => {
                    let product = self.catalog.find_product(line.product.id()).await?;
                    resolved.insert(line.product, product.clone());
                    product
                }
            };

            match product {
                Some(product) if product.id == line.product.id() => {
                    out.populated.push(ResolvedCartLine::new(line, product));
                    out.clean.push(line.clone());
                }
                _ => out.orphaned += 1,
            }
        }

        Ok(out)
    }

    async fn load_existing(&self, user_id: Uuid) -> CartResult<Cart> {
        self.carts
            .find_cart_by_user(user_id)
            .await?
            .ok_or_else(|| CartError::not_found("Cart not found"))
    }

    async fn persist(&self, cart: &mut Cart) -> CartResult<()> {
        cart.updated_at = Utc::now();
        self.carts.save_cart(cart).await?;
        Ok(())
    }

    /// Reloads the stored cart and resolves it. Orphans are filtered from the
    /// response but left in storage; only `get_cart` writes them back.
    async fn refetch(&self, user_id: Uuid) -> CartResult<CartView> {
        let items = match self.carts.find_cart_by_user(user_id).await? {
            Some(cart) => self.reconcile(&cart.items).await?.populated,
            None => Vec::new(),
        };
        Ok(CartView { items })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::Variant,
        store::MemoryStore,
    };

    fn shoe(variants: &[(&str, &str, i32)]) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            brand: "Acme".into(),
            model_name: "Runner".into(),
            gender: Some("unisex".into()),
            category: Some("running".into()),
            width: Some("D".into()),
            material: Some("mesh".into()),
            price: 4_500,
            photo: None,
            variants: variants
                .iter()
                .enumerate()
                .map(|(i, (color, size, stock))| Variant {
                    color: (*color).into(),
                    size: (*size).into(),
                    stock: *stock,
                    sku: format!("ACME-RUN-{i}"),
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup(products: &[Product]) -> (CartEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for product in products {
            store.insert_product(product.clone()).await;
        }
        let engine = CartEngine::new(store.clone(), store.clone());
        (engine, store)
    }

    fn red9(product: &Product) -> LineKey {
        LineKey::new(product.id, Some("Red"), Some("9"))
    }

    #[tokio::test]
    async fn repeated_adds_accumulate_into_one_line() {
        let p1 = shoe(&[("Red", "9", 4)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();

        engine.add_to_cart(user, red9(&p1), None).await.unwrap();
        engine.add_to_cart(user, red9(&p1), Some(2)).await.unwrap();
        let view = engine.add_to_cart(user, red9(&p1), Some(4)).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 7);
        assert_eq!(view.items[0].product.id, p1.id);
        assert_eq!(view.items[0].variant.as_ref().map(|v| v.stock), Some(4));
    }

    #[tokio::test]
    async fn variantless_key_is_its_own_line() {
        let p1 = shoe(&[]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();

        engine.add_to_cart(user, LineKey::plain(p1.id), None).await.unwrap();
        let view = engine
            .add_to_cart(user, LineKey::new(p1.id, Some(""), Some("")), None)
            .await
            .unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 2);
        assert!(view.items[0].variant.is_none());
    }

    #[tokio::test]
    async fn distinct_variants_are_independent_lines() {
        let p1 = shoe(&[("Red", "9", 3), ("Blue", "9", 1)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        let blue9 = LineKey::new(p1.id, Some("Blue"), Some("9"));

        engine.add_to_cart(user, red9(&p1), None).await.unwrap();
        engine.add_to_cart(user, blue9.clone(), None).await.unwrap();
        let view = engine.update_line(user, blue9, 5).await.unwrap();

        assert_eq!(view.items.len(), 2);
        let red = view.items.iter().find(|l| l.color.as_deref() == Some("Red")).unwrap();
        let blue = view.items.iter().find(|l| l.color.as_deref() == Some("Blue")).unwrap();
        assert_eq!(red.quantity, 1);
        assert_eq!(blue.quantity, 5);
    }

    #[tokio::test]
    async fn update_sets_absolute_quantity() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();

        engine.add_to_cart(user, red9(&p1), Some(6)).await.unwrap();
        let view = engine.update_line(user, red9(&p1), 2).await.unwrap();

        assert_eq!(view.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn update_rejects_non_positive_quantity() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), None).await.unwrap();

        let zero = engine.update_line(user, red9(&p1), 0).await;
        let negative = engine.update_line(user, red9(&p1), -3).await;

        assert!(matches!(zero, Err(CartError::Validation(_))));
        assert!(matches!(negative, Err(CartError::Validation(_))));
    }

    #[tokio::test]
    async fn update_missing_cart_or_line_is_not_found() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();

        let no_cart = engine.update_line(user, red9(&p1), 1).await;
        assert!(matches!(no_cart, Err(CartError::NotFound(ref m)) if m == "Cart not found"));

        engine.add_to_cart(user, red9(&p1), None).await.unwrap();
        let no_line = engine
            .update_line(user, LineKey::new(p1.id, Some("Red"), Some("10")), 1)
            .await;
        assert!(matches!(no_line, Err(CartError::NotFound(ref m)) if m == "Item not found"));
    }

    #[tokio::test]
    async fn add_unknown_product_is_not_found_and_creates_nothing() {
        let (engine, store) = setup(&[]).await;
        let user = Uuid::new_v4();

        let result = engine.add_to_cart(user, LineKey::plain(Uuid::new_v4()), None).await;

        assert!(matches!(result, Err(CartError::NotFound(_))));
        assert!(store.stored_cart(user).await.is_none());
        assert_eq!(store.cart_writes(), 0);
    }

    #[tokio::test]
    async fn add_rejects_explicit_non_positive_quantity() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, _) = setup(&[p1.clone()]).await;

        let result = engine.add_to_cart(Uuid::new_v4(), red9(&p1), Some(0)).await;

        assert!(matches!(result, Err(CartError::Validation(_))));
    }

    #[tokio::test]
    async fn remove_only_touches_the_exact_key() {
        let p1 = shoe(&[("Red", "9", 3), ("Red", "10", 3)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        let red10 = LineKey::new(p1.id, Some("Red"), Some("10"));

        engine.add_to_cart(user, red9(&p1), None).await.unwrap();
        engine.add_to_cart(user, red10.clone(), Some(2)).await.unwrap();

        // omitting color/size does not match a line that has them
        let view = engine.remove_line(user, LineKey::plain(p1.id)).await.unwrap();
        assert_eq!(view.items.len(), 2);

        let view = engine.remove_line(user, red10).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].size.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn remove_miss_does_not_write() {
        let p1 = shoe(&[("Red", "9", 3)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), None).await.unwrap();
        let writes = store.cart_writes();

        let view = engine
            .remove_line(user, LineKey::new(p1.id, Some("Green"), Some("9")))
            .await
            .unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(store.cart_writes(), writes);
    }

    #[tokio::test]
    async fn remove_and_clear_without_cart_are_not_found() {
        let (engine, _) = setup(&[]).await;
        let user = Uuid::new_v4();

        let removed = engine.remove_line(user, LineKey::plain(Uuid::new_v4())).await;
        let cleared = engine.clear_cart(user).await;

        assert!(matches!(removed, Err(CartError::NotFound(_))));
        assert!(matches!(cleared, Err(CartError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_without_cart_is_empty_and_creates_nothing() {
        let (engine, store) = setup(&[]).await;
        let user = Uuid::new_v4();

        let view = engine.get_cart(user).await.unwrap();

        assert!(view.items.is_empty());
        assert!(store.stored_cart(user).await.is_none());
        assert_eq!(store.cart_writes(), 0);
    }

    #[tokio::test]
    async fn get_purges_orphans_once_then_is_a_fixed_point() {
        let p1 = shoe(&[("Red", "9", 3)]);
        let p2 = shoe(&[("Black", "11", 2)]);
        let (engine, store) = setup(&[p1.clone(), p2.clone()]).await;
        let user = Uuid::new_v4();

        engine.add_to_cart(user, red9(&p1), Some(3)).await.unwrap();
        engine
            .add_to_cart(user, LineKey::new(p2.id, Some("Black"), Some("11")), None)
            .await
            .unwrap();
        store.remove_product(p2.id).await;

        let writes = store.cart_writes();
        let first = engine.get_cart(user).await.unwrap();
        assert_eq!(store.cart_writes(), writes + 1);

        let second = engine.get_cart(user).await.unwrap();
        assert_eq!(store.cart_writes(), writes + 1);
        assert_eq!(first, second);

        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].quantity, 3);
        assert_eq!(first.items[0].color.as_deref(), Some("Red"));

        let stored = store.stored_cart(user).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].product, ProductRef(p1.id));
    }

    #[tokio::test]
    async fn get_with_nothing_orphaned_never_writes() {
        let p1 = shoe(&[("Red", "9", 3)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), None).await.unwrap();
        let writes = store.cart_writes();

        engine.get_cart(user).await.unwrap();
        engine.get_cart(user).await.unwrap();

        assert_eq!(store.cart_writes(), writes);
    }

    #[tokio::test]
    async fn mutation_paths_filter_orphans_without_writing_them_back() {
        let p1 = shoe(&[("Red", "9", 3)]);
        let p2 = shoe(&[]);
        let (engine, store) = setup(&[p1.clone(), p2.clone()]).await;
        let user = Uuid::new_v4();

        engine.add_to_cart(user, LineKey::plain(p2.id), None).await.unwrap();
        store.remove_product(p2.id).await;

        let view = engine.add_to_cart(user, red9(&p1), None).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product.id, p1.id);
        assert_eq!(store.stored_cart(user).await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn clear_keeps_an_empty_cart_record() {
        let p1 = shoe(&[("Red", "9", 3)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), Some(2)).await.unwrap();

        let cart = engine.clear_cart(user).await.unwrap();

        assert!(cart.items.is_empty());
        assert_eq!(cart.user_id, user);
        let stored = store.stored_cart(user).await.unwrap();
        assert!(stored.items.is_empty());
        assert_eq!(stored.id, cart.id);
    }

    #[tokio::test]
    async fn reconcile_resolves_each_product_once() {
        let p1 = shoe(&[("Red", "9", 3), ("Red", "10", 1)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let gone = Uuid::new_v4();
        let lines = vec![
            CartLine::new(red9(&p1), 1),
            CartLine::new(LineKey::new(p1.id, Some("Red"), Some("10")), 2),
            CartLine::new(LineKey::plain(gone), 1),
        ];

        let reconciled = engine.reconcile(&lines).await.unwrap();

        assert_eq!(reconciled.orphaned, 1);
        assert_eq!(reconciled.clean, lines[..2].to_vec());
        assert_eq!(reconciled.populated.len(), 2);
        assert!(reconciled.populated.iter().all(|l| l.product.id == p1.id));
    }

    #[tokio::test]
    async fn accumulation_overflow_is_rejected_without_writing() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), Some(i32::MAX)).await.unwrap();
        let writes = store.cart_writes();

        let result = engine.add_to_cart(user, red9(&p1), Some(1)).await;

        assert!(matches!(result, Err(CartError::Validation(ref m)) if m == "quantity too large"));
        assert_eq!(store.cart_writes(), writes);
        let stored = store.stored_cart(user).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].quantity, i32::MAX);
    }

    #[tokio::test]
    async fn checkout_hands_over_the_cart_and_empties_it() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), Some(2)).await.unwrap();

        let ordered = engine
            .checkout_with(user, |cart| async move { Ok::<_, CartError>(cart) })
            .await
            .unwrap();

        assert_eq!(ordered.items.len(), 1);
        assert_eq!(ordered.items[0].quantity, 2);
        assert!(store.stored_cart(user).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn failed_checkout_keeps_the_cart() {
        let p1 = shoe(&[("Red", "9", 10)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        engine.add_to_cart(user, red9(&p1), Some(2)).await.unwrap();
        let writes = store.cart_writes();

        let result: Result<(), CartError> = engine
            .checkout_with(user, |_| async { Err(CartError::Internal("insert failed".into())) })
            .await;

        assert!(result.is_err());
        assert_eq!(store.cart_writes(), writes);
        assert_eq!(store.stored_cart(user).await.unwrap().items[0].quantity, 2);
    }

    #[tokio::test]
    async fn add_during_checkout_lands_in_the_emptied_cart() {
        let p1 = shoe(&[("Red", "9", 10), ("Blue", "9", 10)]);
        let (engine, store) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();
        let blue9 = LineKey::new(p1.id, Some("Blue"), Some("9"));
        engine.add_to_cart(user, red9(&p1), Some(1)).await.unwrap();

        let (ordered, late_add) = engine
            .checkout_with(user, |cart| {
                let engine = engine.clone();
                let blue9 = blue9.clone();
                async move {
                    let late_add =
                        tokio::spawn(async move { engine.add_to_cart(user, blue9, Some(1)).await });
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok::<_, CartError>((cart, late_add))
                }
            })
            .await
            .unwrap();
        late_add.await.unwrap().unwrap();

        assert_eq!(ordered.items.len(), 1);
        assert_eq!(ordered.items[0].color.as_deref(), Some("Red"));
        let stored = store.stored_cart(user).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert!(stored.items[0].matches(&blue9));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_for_one_user_are_additive() {
        let p1 = shoe(&[("Red", "9", 100)]);
        let (engine, _) = setup(&[p1.clone()]).await;
        let user = Uuid::new_v4();

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let engine = engine.clone();
                let key = red9(&p1);
                tokio::spawn(async move { engine.add_to_cart(user, key, Some(2)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let view = engine.get_cart(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 50);
    }
}
