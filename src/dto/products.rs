use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, Variant};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub brand: String,
    pub model_name: String,
    pub gender: Option<String>,
    pub category: Option<String>,
    pub width: Option<String>,
    pub material: Option<String>,
    pub price: i64,
    pub photo: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub gender: Option<String>,
    pub category: Option<String>,
    pub width: Option<String>,
    pub material: Option<String>,
    pub price: Option<i64>,
    pub photo: Option<String>,
    pub variants: Option<Vec<Variant>>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
