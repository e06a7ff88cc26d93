//! Imperative callbacks into the host storefront.

use serde::{Deserialize, Serialize};

use super::product::ProductRecord;

/// Light or dark storefront theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse a mode name case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read/write operations the assistant may perform on the host store.
///
/// Implementations own their consistency; the assistant never touches store
/// state except through these calls. `add_to_cart` must increment an
/// existing line rather than create a second one.
pub trait StoreAccessors: Send + Sync {
    /// Fetch the live product record, which may be fresher than the snapshot.
    fn get_product_by_id(&self, store_id: &str, product_id: &str) -> Option<ProductRecord>;

    /// Add one unit of `product` to the cart.
    fn add_to_cart(&self, product: &ProductRecord, store_id: &str);

    /// Add `quantity` units of `product` to the cart as one cart change.
    ///
    /// The default repeats [`add_to_cart`](Self::add_to_cart); hosts with a
    /// bulk add should override it.
    fn add_quantity_to_cart(&self, product: &ProductRecord, store_id: &str, quantity: u32) {
        for _ in 0..quantity {
            self.add_to_cart(product, store_id);
        }
    }

    /// Set the quantity of a cart line. `0` removes the line.
    fn update_quantity(&self, product_id: &str, store_id: &str, quantity: u32);

    /// Current quantity of a cart line, `0` when absent.
    fn cart_quantity(&self, product_id: &str, store_id: &str) -> u32;

    /// Route the storefront to `path`.
    fn navigate(&self, path: &str);

    fn theme_mode(&self) -> ThemeMode;

    fn set_theme_mode(&self, mode: ThemeMode);
}
