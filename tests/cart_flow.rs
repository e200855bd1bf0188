use std::sync::Arc;

use chrono::Utc;
use footwear_storefront::{
    cart::{CartEngine, CartError, LineKey},
    models::{Product, Variant},
    store::MemoryStore,
};
use uuid::Uuid;

fn shoe(price: i64) -> Product {
    let now = Utc::now();
    let variant = |color: &str, size: &str| Variant {
        color: color.into(),
        size: size.into(),
        stock: 10,
        sku: format!("TR-{color}-{size}"),
    };
    Product {
        id: Uuid::new_v4(),
        brand: "Stride".into(),
        model_name: "Trail Runner".into(),
        gender: Some("men".into()),
        category: Some("running".into()),
        width: None,
        material: None,
        price,
        photo: None,
        variants: vec![variant("Red", "9"), variant("Blue", "9")],
        created_at: now,
        updated_at: now,
    }
}

async fn engine_with(products: &[Product]) -> (CartEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    for product in products {
        store.insert_product(product.clone()).await;
    }
    (CartEngine::new(store.clone(), store.clone()), store)
}

#[tokio::test]
async fn shopper_walkthrough() -> anyhow::Result<()> {
    let p1 = shoe(12_999);
    let (engine, store) = engine_with(&[p1.clone()]).await;
    let u1 = Uuid::new_v4();
    let red9 = LineKey::new(p1.id, Some("Red"), Some("9"));
    let blue9 = LineKey::new(p1.id, Some("Blue"), Some("9"));

    let view = engine.add_to_cart(u1, red9.clone(), Some(1)).await?;
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 1);
    assert_eq!(view.items[0].product.id, p1.id);
    assert_eq!(
        view.items[0].variant.as_ref().map(|v| v.sku.as_str()),
        Some("TR-Red-9")
    );

    let view = engine.add_to_cart(u1, red9.clone(), Some(2)).await?;
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 3);

    let view = engine.add_to_cart(u1, blue9.clone(), None).await?;
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.subtotal(), Some(4 * 12_999));

    let view = engine.remove_line(u1, blue9).await?;
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].color.as_deref(), Some("Red"));

    let view = engine.update_line(u1, red9.clone(), 2).await?;
    assert_eq!(view.items[0].quantity, 2);

    let cleared = engine.clear_cart(u1).await?;
    assert!(cleared.items.is_empty());
    assert!(engine.get_cart(u1).await?.is_empty());

    let stored = store.stored_cart(u1).await.expect("cart persisted");
    assert!(stored.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn reading_an_absent_cart_creates_nothing() -> anyhow::Result<()> {
    let (engine, store) = engine_with(&[]).await;
    let user = Uuid::new_v4();

    let view = engine.get_cart(user).await?;

    assert!(view.is_empty());
    assert!(store.stored_cart(user).await.is_none());
    assert_eq!(store.cart_writes(), 0);
    Ok(())
}

#[tokio::test]
async fn deleted_products_are_purged_once() -> anyhow::Result<()> {
    let keep = shoe(5_000);
    let gone = shoe(7_000);
    let (engine, store) = engine_with(&[keep.clone(), gone.clone()]).await;
    let user = Uuid::new_v4();

    engine.add_to_cart(user, LineKey::plain(keep.id), Some(1)).await?;
    engine.add_to_cart(user, LineKey::plain(gone.id), Some(2)).await?;
    store.remove_product(gone.id).await;
    let writes_before = store.cart_writes();

    let view = engine.get_cart(user).await?;
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].product.id, keep.id);
    assert_eq!(store.cart_writes(), writes_before + 1);

    let stored = store.stored_cart(user).await.expect("cart persisted");
    assert_eq!(stored.items.len(), 1);

    engine.get_cart(user).await?;
    assert_eq!(store.cart_writes(), writes_before + 1);
    Ok(())
}

#[tokio::test]
async fn errors_surface_with_their_kind() -> anyhow::Result<()> {
    let p = shoe(9_000);
    let (engine, _store) = engine_with(&[p.clone()]).await;
    let user = Uuid::new_v4();

    let missing = engine
        .add_to_cart(user, LineKey::plain(Uuid::new_v4()), Some(1))
        .await;
    assert!(matches!(missing, Err(CartError::NotFound(_))));

    let no_cart = engine.update_line(user, LineKey::plain(p.id), 2).await;
    assert!(matches!(no_cart, Err(CartError::NotFound(m)) if m == "Cart not found"));

    engine.add_to_cart(user, LineKey::plain(p.id), Some(1)).await?;
    let no_line = engine
        .update_line(user, LineKey::new(p.id, Some("Red"), Some("9")), 2)
        .await;
    assert!(matches!(no_line, Err(CartError::NotFound(m)) if m == "Item not found"));

    let bad_qty = engine.add_to_cart(user, LineKey::plain(p.id), Some(0)).await;
    assert!(matches!(bad_qty, Err(CartError::Validation(_))));
    Ok(())
}
