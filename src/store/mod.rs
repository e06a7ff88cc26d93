//! Store snapshot consumed by the assistant.
//!
//! The storefront builder owns products, cart and routing. The assistant only
//! reads a [`StoreSnapshot`] and mutates state through [`StoreAccessors`].

pub mod accessors;
pub mod image;
pub mod memory;
pub mod product;
pub mod search;

pub use accessors::{StoreAccessors, ThemeMode};
pub use image::resolve_image_url;
pub use memory::{CartLine, InMemoryStore};
pub use product::{ProductRecord, ProductSummary};
pub use search::find_product;

use serde::{Deserialize, Serialize};

/// Read-only view of the current store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Store identifier, used in navigation paths and cart calls.
    pub id: String,
    /// Catalog in source order. Order matters for search tie-breaking.
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub theme: StoreTheme,
    /// Merchant account used when creating checkout sessions.
    #[serde(default, alias = "merchantId")]
    pub merchant_id: Option<String>,
    /// Display name, used when building the system instruction.
    #[serde(default)]
    pub name: Option<String>,
}

/// Theme fields the assistant cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTheme {
    #[serde(default, alias = "primaryColor")]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub mode: ThemeMode,
}

impl StoreSnapshot {
    /// Create an empty snapshot for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builder: set the product catalog.
    pub fn with_products(mut self, products: Vec<ProductRecord>) -> Self {
        self.products = products;
        self
    }

    /// Builder: set the merchant account.
    pub fn with_merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// Look up a product in the snapshot by exact id.
    pub fn product(&self, product_id: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Route of a product detail page in this store.
    pub fn product_path(&self, product_id: &str) -> String {
        format!("/store/{}/product/{product_id}", self.id)
    }

    /// Route of a named page (`cart`, `checkout`, ...) in this store.
    ///
    /// `home` and the empty page map to the store root.
    pub fn page_path(&self, page: &str) -> String {
        let page = page.trim().trim_matches('/').to_ascii_lowercase();
        if page.is_empty() || page == "home" {
            format!("/store/{}", self.id)
        } else {
            format!("/store/{}/{page}", self.id)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn deserializes_builder_json() {
        let json = serde_json::json!({
            "id": "s1",
            "merchantId": "acct_123",
            "theme": { "primaryColor": "#ff0000" },
            "products": [
                { "id": "p1", "name": "Mug", "price": "12.50" },
                { "id": 7, "name": "Tee", "price": 20 }
            ]
        });
        let store: StoreSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(store.merchant_id.as_deref(), Some("acct_123"));
        assert_eq!(store.theme.primary_color.as_deref(), Some("#ff0000"));
        assert_eq!(store.theme.mode, ThemeMode::Light);
        assert_eq!(store.products.len(), 2);
        assert_eq!(store.products[1].id, "7");
        assert!((store.products[0].price - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn paths() {
        let store = StoreSnapshot::new("s1");
        assert_eq!(store.product_path("p9"), "/store/s1/product/p9");
        assert_eq!(store.page_path("Cart"), "/store/s1/cart");
        assert_eq!(store.page_path("/checkout/"), "/store/s1/checkout");
        assert_eq!(store.page_path("home"), "/store/s1");
        assert_eq!(store.page_path(""), "/store/s1");
    }
}
