use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    cart::{Cart, CartLine, CartView, ProductRef, ResolvedCartLine},
    dto::{
        admin::{
            BlockStatus, InventoryAdjustRequest, LowStockQuery, StoreStats,
            UpdateOrderStatusRequest, UserCount, UserList,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, RemoveFromCartRequest, UpdateCartItemRequest},
        orders::{CheckoutRequest, OrderList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Order, OrderLine, OrderStatus, Product, User, Variant},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products as product_routes},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::login,
        auth::logout,
        auth::ping,
        auth::me,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::delete_order,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_users,
        admin::user_count,
        admin::block_user,
        admin::unblock_user,
        admin::toggle_block,
        admin::stats
    ),
    components(
        schemas(
            User,
            Product,
            Variant,
            Order,
            OrderLine,
            OrderStatus,
            Cart,
            CartLine,
            CartView,
            ProductRef,
            ResolvedCartLine,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            UpdateCartItemRequest,
            RemoveFromCartRequest,
            CheckoutRequest,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateOrderStatusRequest,
            InventoryAdjustRequest,
            LowStockQuery,
            BlockStatus,
            StoreStats,
            UserCount,
            UserList,
            OrderList,
            ProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<StoreStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Products", description = "Footwear catalog"),
        (name = "Cart", description = "Per-user shopping cart"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Admin", description = "Store administration"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
