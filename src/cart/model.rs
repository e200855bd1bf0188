use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, Variant};

/// Weak reference to a catalog product; the cart never owns the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProductRef(pub Uuid);

impl ProductRef {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ProductRef {
    fn from(id: Uuid) -> Self {
        ProductRef(id)
    }
}

/// A stored cart line. Price and stock are never stored here; they are read live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product: ProductRef,
    pub quantity: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl CartLine {
    pub fn new(key: LineKey, quantity: i32) -> Self {
        CartLine {
            product: key.product,
            quantity,
            color: key.color,
            size: key.size,
        }
    }

    /// Exact composite-key match. Empty and absent color/size are the same key.
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product == key.product
            && normalize(self.color.as_deref()) == key.color.as_deref()
            && normalize(self.size.as_deref()) == key.size.as_deref()
    }
}

/// Identifies at most one line per cart: (product, color, size).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product: ProductRef,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl LineKey {
    pub fn new(product_id: Uuid, color: Option<&str>, size: Option<&str>) -> Self {
        LineKey {
            product: ProductRef(product_id),
            color: normalize(color).map(str::to_owned),
            size: normalize(size).map(str::to_owned),
        }
    }

    /// Key of a product sold without variants.
    pub fn plain(product_id: Uuid) -> Self {
        Self::new(product_id, None, None)
    }
}

fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// The per-user cart document as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4(),
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn find_line_mut(&mut self, key: &LineKey) -> Option<&mut CartLine> {
        self.items.iter_mut().find(|line| line.matches(key))
    }
}

/// A cart line with its product resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResolvedCartLine {
    pub product: Product,
    /// Live variant for the selected color/size, when the product still offers it.
    pub variant: Option<Variant>,
    pub quantity: i32,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl ResolvedCartLine {
    pub fn new(line: &CartLine, product: Product) -> Self {
        let variant = product
            .variant(line.color.as_deref(), line.size.as_deref())
            .cloned();
        ResolvedCartLine {
            product,
            variant,
            quantity: line.quantity,
            color: line.color.clone(),
            size: line.size.clone(),
        }
    }

    /// `None` when price times quantity does not fit in an `i64`.
    pub fn line_total(&self) -> Option<i64> {
        self.product.price.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<ResolvedCartLine>,
}

impl CartView {
    pub fn subtotal(&self) -> Option<i64> {
        self.items
            .iter()
            .try_fold(0_i64, |total, line| total.checked_add(line.line_total()?))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of resolving a line list against the catalog.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Lines whose product still resolves, unchanged.
    pub clean: Vec<CartLine>,
    /// The same lines with their products embedded.
    pub populated: Vec<ResolvedCartLine>,
    /// Number of lines whose product no longer exists.
    pub orphaned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_match_absent_color_and_size() {
        let id = Uuid::new_v4();
        let line = CartLine {
            product: ProductRef(id),
            quantity: 1,
            color: Some(String::new()),
            size: None,
        };

        assert!(line.matches(&LineKey::plain(id)));
        assert!(line.matches(&LineKey::new(id, None, Some(""))));
        assert_eq!(LineKey::new(id, Some(""), Some(" ")), LineKey::plain(id));
    }

    #[test]
    fn key_match_is_exact_on_all_three_parts() {
        let id = Uuid::new_v4();
        let line = CartLine::new(LineKey::new(id, Some("Red"), Some("9")), 2);

        assert!(line.matches(&LineKey::new(id, Some("Red"), Some("9"))));
        assert!(!line.matches(&LineKey::new(id, Some("red"), Some("9"))));
        assert!(!line.matches(&LineKey::new(id, Some("Red"), None)));
        assert!(!line.matches(&LineKey::plain(id)));
        assert!(!line.matches(&LineKey::new(Uuid::new_v4(), Some("Red"), Some("9"))));
    }

    #[test]
    fn stored_line_serializes_product_as_bare_id() {
        let id = Uuid::new_v4();
        let line = CartLine::new(LineKey::new(id, Some("Blue"), Some("10")), 1);

        let json = serde_json::to_value(&line).expect("serialize line");
        assert_eq!(json["product"], serde_json::json!(id.to_string()));
        assert_eq!(json["color"], "Blue");
    }
}
