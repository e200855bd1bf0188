use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            BlockStatus, InventoryAdjustRequest, LowStockQuery, StoreStats, UpdateOrderStatusRequest,
            UserCount, UserList,
        },
        orders::OrderList,
        products::ProductList,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Variants},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::order_service::parse_status_filter,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = parse_status_filter(query.status.as_deref())? {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Order::from)
        .ok_or_else(|| AppError::not_found("Order"))?;

    Ok(ApiResponse::success("Order found", order, Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let mut active: OrderActive = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": status.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Order"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({ "success": true }),
        Some(Meta::empty()),
    ))
}

/// Products with at least one variant at or below the threshold.
pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(state.config.low_stock_threshold);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(Expr::cust_with_values(
            "EXISTS (SELECT 1 FROM jsonb_array_elements(variants) AS v WHERE (v->>'stock')::int <= $1)",
            [threshold],
        ))
        .order_by_asc(ProdCol::Brand)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let mut variants = product.variants.0.clone();
    apply_stock_delta(&mut variants, &payload)?;

    let mut active: ProductActive = product.into();
    active.variants = Set(Variants(variants));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({
            "product_id": updated.id,
            "color": payload.color,
            "size": payload.size,
            "delta": payload.delta,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Product::from(updated),
        Some(Meta::empty()),
    ))
}

fn apply_stock_delta(
    variants: &mut [crate::models::Variant],
    payload: &InventoryAdjustRequest,
) -> AppResult<()> {
    let variant = variants
        .iter_mut()
        .find(|v| v.color == payload.color && v.size == payload.size)
        .ok_or_else(|| AppError::not_found("Variant"))?;

    let new_stock = variant
        .stock
        .checked_add(payload.delta)
        .ok_or_else(|| AppError::BadRequest("stock out of range".into()))?;
    if new_stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }
    variant.stock = new_stock;
    Ok(())
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn user_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserCount>> {
    ensure_admin(user)?;
    let count = Users::find().count(&state.orm).await?;
    Ok(ApiResponse::success("User count", UserCount { count }, Some(Meta::empty())))
}

/// Sets the blocked flag; `None` flips the current value.
pub async fn set_blocked(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    blocked: Option<bool>,
) -> AppResult<ApiResponse<BlockStatus>> {
    ensure_admin(user)?;
    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if existing.id == user.user_id {
        return Err(AppError::BadRequest("Admins cannot block themselves".into()));
    }

    let blocked = blocked.unwrap_or(!existing.blocked);
    let mut active: UserActive = existing.into();
    active.blocked = Set(blocked);
    if blocked {
        active.online = Set(false);
    }
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        if blocked { "user_block" } else { "user_unblock" },
        "users",
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User updated",
        BlockStatus {
            id: updated.id,
            blocked: updated.blocked,
        },
        Some(Meta::empty()),
    ))
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<StoreStats>> {
    ensure_admin(user)?;

    let registered_user_count = Users::find().count(&state.orm).await?;
    let online_user_count = Users::find()
        .filter(UserCol::Online.eq(true))
        .count(&state.orm)
        .await?;
    let product_count = Products::find().count(&state.orm).await?;
    let order_count = Orders::find().count(&state.orm).await?;

    let mut orders_by_status = BTreeMap::new();
    for status in OrderStatus::ALL {
        let count = Orders::find()
            .filter(OrderCol::Status.eq(status))
            .count(&state.orm)
            .await?;
        orders_by_status.insert(status.as_str().to_string(), count);
    }

    let revenue = Orders::find()
        .select_only()
        .column_as(Expr::cust("COALESCE(SUM(total_amount), 0)::BIGINT"), "revenue")
        .filter(OrderCol::Status.ne(OrderStatus::Cancelled))
        .into_tuple::<i64>()
        .one(&state.orm)
        .await?
        .unwrap_or(0);

    Ok(ApiResponse::success(
        "Stats",
        StoreStats {
            registered_user_count,
            online_user_count,
            product_count,
            order_count,
            orders_by_status,
            revenue,
        },
        Some(Meta::empty()),
    ))
}
