use std::collections::HashSet;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Variants},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, Variant},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Brand).ilike(pattern.clone()))
                .add(Expr::col(Column::ModelName).ilike(pattern)),
        );
    }

    if let Some(brand) = query.brand.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Brand).ilike(brand.clone()));
    }

    if let Some(gender) = query.gender.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Gender).ilike(gender.clone()));
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Category).ilike(category.clone()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Brand => Column::Brand,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

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
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_new_product(&payload)?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        brand: Set(payload.brand.trim().to_string()),
        model_name: Set(payload.model_name.trim().to_string()),
        gender: Set(payload.gender),
        category: Set(payload.category),
        width: Set(payload.width),
        material: Set(payload.material),
        price: Set(payload.price),
        photo: Set(payload.photo),
        variants: Set(Variants(payload.variants)),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_product_update(&payload)?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let mut active: ActiveModel = existing.into();
    if let Some(brand) = payload.brand {
        active.brand = Set(brand);
    }
    if let Some(model_name) = payload.model_name {
        active.model_name = Set(model_name);
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(Some(gender));
    }
    if let Some(category) = payload.category {
        active.category = Set(Some(category));
    }
    if let Some(width) = payload.width {
        active.width = Set(Some(width));
    }
    if let Some(material) = payload.material {
        active.material = Set(Some(material));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(photo) = payload.photo {
        active.photo = Set(Some(photo));
    }
    if let Some(variants) = payload.variants {
        active.variants = Set(Variants(variants));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Deleting a product leaves cart lines pointing at it; carts purge them on their next read.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// New products must carry a non-empty, unique SKU on every variant.
pub fn validate_new_product(payload: &CreateProductRequest) -> Result<(), AppError> {
    if payload.brand.trim().is_empty() || payload.model_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "brand and model_name are required".into(),
        ));
    }
    if payload.price <= 0 {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }

    let mut skus = HashSet::new();
    for variant in &payload.variants {
        if variant.sku.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Each variant must have a non-empty SKU".into(),
            ));
        }
        if !skus.insert(variant.sku.as_str()) {
            return Err(AppError::BadRequest("Duplicate SKU found in variants".into()));
        }
    }
    validate_stock(&payload.variants)
}

/// Variant edits are not SKU-checked; only price and stock bounds apply.
pub fn validate_product_update(payload: &UpdateProductRequest) -> Result<(), AppError> {
    if payload.price.is_some_and(|price| price <= 0) {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    match &payload.variants {
        Some(variants) => validate_stock(variants),
        None => Ok(()),
    }
}

fn validate_stock(variants: &[Variant]) -> Result<(), AppError> {
    if variants.iter().any(|v| v.stock < 0) {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(sku: &str, stock: i32) -> Variant {
        Variant {
            color: "White".into(),
            size: "8".into(),
            stock,
            sku: sku.into(),
        }
    }

    fn request(variants: Vec<Variant>) -> CreateProductRequest {
        CreateProductRequest {
            brand: "Acme".into(),
            model_name: "Court".into(),
            gender: None,
            category: None,
            width: None,
            material: None,
            price: 7_999,
            photo: None,
            variants,
        }
    }

    #[test]
    fn accepts_unique_skus() {
        let payload = request(vec![variant("A-1", 3), variant("A-2", 0)]);
        assert!(validate_new_product(&payload).is_ok());
    }

    #[test]
    fn rejects_blank_and_duplicate_skus() {
        let blank = request(vec![variant("  ", 1)]);
        let duplicate = request(vec![variant("A-1", 1), variant("A-1", 2)]);

        assert!(matches!(validate_new_product(&blank), Err(AppError::BadRequest(m)) if m.contains("non-empty SKU")));
        assert!(matches!(validate_new_product(&duplicate), Err(AppError::BadRequest(m)) if m.contains("Duplicate SKU")));
    }

    #[test]
    fn rejects_non_positive_price_and_negative_stock() {
        let mut free = request(vec![]);
        free.price = 0;
        let negative = request(vec![variant("A-1", -1)]);

        assert!(validate_new_product(&free).is_err());
        assert!(validate_new_product(&negative).is_err());
    }

    #[test]
    fn updates_skip_sku_checks() {
        let payload = UpdateProductRequest {
            variants: Some(vec![variant("", 1), variant("", 2)]),
            ..Default::default()
        };
        assert!(validate_product_update(&payload).is_ok());

        let payload = UpdateProductRequest {
            price: Some(-5),
            ..Default::default()
        };
        assert!(validate_product_update(&payload).is_err());
    }
}
