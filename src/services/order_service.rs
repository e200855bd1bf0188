use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    cart::{CartView, ResolvedCartLine},
    dto::orders::{CheckoutRequest, OrderList},
    entity::orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderLines, OrderStatus,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderLine},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Turns the caller's reconciled cart into a pending order and empties the cart.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    let address = payload.address.trim();
    if address.is_empty() {
        return Err(AppError::BadRequest(
            "Please enter a shipping address".into(),
        ));
    }

    let orm = &state.orm;
    let order = state
        .carts
        .checkout_with(user.user_id, |cart| async move {
            if cart.is_empty() {
                return Err(AppError::BadRequest("Cart is empty".into()));
            }
            let (items, total_amount) = order_lines(&cart)?;

            let order = OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                items: Set(OrderLines(items)),
                total_amount: Set(total_amount),
                address: Set(address.to_string()),
                status: Set(OrderStatus::Pending),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(orm)
            .await?;
            Ok::<_, AppError>(order)
        })
        .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, "order placed");

    Ok(ApiResponse::success(
        "Order placed",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = parse_status_filter(query.status.as_deref())? {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    Ok(ApiResponse::success(
        "OK",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

/// Empty or absent filters mean "any status"; unknown values are rejected.
pub fn parse_status_filter(status: Option<&str>) -> AppResult<Option<OrderStatus>> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => OrderStatus::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Invalid order status".into())),
    }
}

/// Snapshots each resolved line at its current price and totals the order.
pub fn order_lines(cart: &CartView) -> AppResult<(Vec<OrderLine>, i64)> {
    let total = cart
        .subtotal()
        .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
    let items = cart.items.iter().map(order_line).collect();
    Ok((items, total))
}

fn order_line(line: &ResolvedCartLine) -> OrderLine {
    OrderLine {
        product_id: line.product.id,
        brand: line.product.brand.clone(),
        model_name: line.product.model_name.clone(),
        color: line.color.clone(),
        size: line.size.clone(),
        quantity: line.quantity,
        unit_price: line.product.price,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        cart::{CartLine, LineKey},
        models::Product,
    };

    fn product(price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            brand: "Acme".into(),
            model_name: "Trail".into(),
            gender: None,
            category: None,
            width: None,
            material: None,
            price,
            photo: None,
            variants: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn order_lines_snapshot_live_prices_and_total() {
        let a = product(1_000);
        let b = product(2_500);
        let cart = CartView {
            items: vec![
                ResolvedCartLine::new(
                    &CartLine::new(LineKey::new(a.id, Some("Red"), Some("9")), 3),
                    a.clone(),
                ),
                ResolvedCartLine::new(&CartLine::new(LineKey::plain(b.id), 1), b.clone()),
            ],
        };

        let (lines, total) = order_lines(&cart).unwrap();

        assert_eq!(total, 5_500);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].unit_price, 1_000);
        assert_eq!(lines[0].color.as_deref(), Some("Red"));
        assert_eq!(lines[1].product_id, b.id);
    }

    #[test]
    fn order_total_overflow_is_rejected() {
        let pricey = product(5_000_000_000_000);
        let cart = CartView {
            items: vec![ResolvedCartLine::new(
                &CartLine::new(LineKey::plain(pricey.id), i32::MAX),
                pricey.clone(),
            )],
        };

        assert!(matches!(order_lines(&cart), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn order_total_sum_overflow_is_rejected() {
        let a = product(i64::MAX / 2 + 1);
        let b = product(i64::MAX / 2 + 1);
        let cart = CartView {
            items: vec![
                ResolvedCartLine::new(&CartLine::new(LineKey::plain(a.id), 1), a.clone()),
                ResolvedCartLine::new(&CartLine::new(LineKey::plain(b.id), 1), b.clone()),
            ],
        };

        assert!(matches!(order_lines(&cart), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn status_filter_parsing() {
        assert!(matches!(parse_status_filter(None), Ok(None)));
        assert!(matches!(parse_status_filter(Some("  ")), Ok(None)));
        assert!(matches!(
            parse_status_filter(Some("processing")),
            Ok(Some(OrderStatus::Processing))
        ));
        assert!(matches!(
            parse_status_filter(Some("paid")),
            Err(AppError::BadRequest(_))
        ));
    }
}
