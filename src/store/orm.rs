use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::Expr,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    cart::Cart,
    db::OrmConn,
    entity::{
        carts::{ActiveModel as CartActive, CartLines, Column as CartCol, Entity as Carts},
        products::Entity as Products,
    },
    models::Product,
    store::{CartStore, CatalogStore, StoreError, StoreResult},
};

/// Postgres-backed store over SeaORM.
#[derive(Debug, Clone)]
pub struct OrmStore {
    conn: OrmConn,
}

impl OrmStore {
    pub fn new(conn: OrmConn) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CatalogStore for OrmStore {
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let product = Products::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(Product::from);
        Ok(product)
    }
}

#[async_trait]
impl CartStore for OrmStore {
    async fn find_cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        let cart = Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .one(&self.conn)
            .await?
            .map(Cart::from);
        Ok(cart)
    }

    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        let cart = CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            items: Set(CartLines::default()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(Cart::from(cart))
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        let updated_at = cart.updated_at.fixed_offset();
        let result = Carts::update_many()
            .col_expr(CartCol::Items, Expr::value(CartLines(cart.items.clone())))
            .col_expr(CartCol::UpdatedAt, Expr::value(updated_at))
            .filter(CartCol::Id.eq(cart.id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::MissingCart(cart.id));
        }
        Ok(())
    }
}
