use crate::{
    audit,
    cart::{Cart, CartView},
    dto::cart::{AddToCartRequest, RemoveFromCartRequest, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let view = state.carts.get_cart(user.user_id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let view = state
        .carts
        .add_to_cart(user.user_id, payload.key(), payload.quantity)
        .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "carts",
        serde_json::json!({
            "product_id": payload.product_id,
            "quantity": payload.quantity.unwrap_or(1),
            "color": payload.color,
            "size": payload.size,
        }),
    )
    .await;

    Ok(ApiResponse::success("Added to cart", view, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let view = state
        .carts
        .update_line(user.user_id, payload.key(), payload.quantity)
        .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        "carts",
        serde_json::json!({
            "product_id": payload.product_id,
            "quantity": payload.quantity,
            "color": payload.color,
            "size": payload.size,
        }),
    )
    .await;

    Ok(ApiResponse::success("Cart updated", view, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    payload: RemoveFromCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let view = state
        .carts
        .remove_line(user.user_id, payload.key())
        .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "carts",
        serde_json::json!({
            "product_id": payload.product_id,
            "color": payload.color,
            "size": payload.size,
        }),
    )
    .await;

    Ok(ApiResponse::success("Removed from cart", view, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let cart = state.carts.clear_cart(user.user_id).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_clear",
        "carts",
        serde_json::json!({ "cart_id": cart.id }),
    )
    .await;

    Ok(ApiResponse::success("Cart cleared", cart, Some(Meta::empty())))
}
