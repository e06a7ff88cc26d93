//! Tool kinds and their model-facing declarations.

use serde_json::json;

use super::types::ToolDeclaration;

/// Every tool the assistant knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    FindAndOpenProduct,
    NavigateToPage,
    AddToCart,
    UpdateCartQuantity,
    InitiatePurchase,
    ToggleTheme,
    CompareProducts,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        Self::FindAndOpenProduct,
        Self::NavigateToPage,
        Self::AddToCart,
        Self::UpdateCartQuantity,
        Self::InitiatePurchase,
        Self::ToggleTheme,
        Self::CompareProducts,
    ];

    /// Wire name used in declarations and calls.
    pub fn name(self) -> &'static str {
        match self {
            Self::FindAndOpenProduct => "find_and_open_product",
            Self::NavigateToPage => "navigate_to_page",
            Self::AddToCart => "add_to_cart",
            Self::UpdateCartQuantity => "update_cart_quantity",
            Self::InitiatePurchase => "initiate_purchase",
            Self::ToggleTheme => "toggle_theme",
            Self::CompareProducts => "compare_products",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn declaration(self) -> ToolDeclaration {
        match self {
            Self::FindAndOpenProduct => ToolDeclaration::new(
                self.name(),
                "Search the store catalog for a product by name, keywords or id and open its \
                 detail page. Use this whenever the shopper asks about a specific product.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "query": {
                            "type": "STRING",
                            "description": "Product name, keywords or product id."
                        }
                    },
                    "required": ["query"]
                }),
            ),
            Self::NavigateToPage => ToolDeclaration::new(
                self.name(),
                "Navigate the storefront to a page such as home, products, cart or checkout.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "page": {
                            "type": "STRING",
                            "description": "Page name, for example \"home\", \"cart\" or \"checkout\"."
                        }
                    },
                    "required": ["page"]
                }),
            ),
            Self::AddToCart => ToolDeclaration::new(
                self.name(),
                "Add a product to the shopping cart. Adding a product already in the cart \
                 increases its quantity.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "product_id": {
                            "type": "STRING",
                            "description": "Id of the product to add."
                        },
                        "quantity": {
                            "type": "INTEGER",
                            "description": "Number of units to add. Defaults to 1."
                        }
                    },
                    "required": ["product_id"]
                }),
            ),
            Self::UpdateCartQuantity => ToolDeclaration::new(
                self.name(),
                "Set the quantity of a product already in the cart. A quantity of 0 removes it.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "product_id": {
                            "type": "STRING",
                            "description": "Id of the product in the cart."
                        },
                        "quantity": {
                            "type": "INTEGER",
                            "description": "New quantity."
                        }
                    },
                    "required": ["product_id", "quantity"]
                }),
            ),
            Self::InitiatePurchase => ToolDeclaration::new(
                self.name(),
                "Start checkout. With a product id, begins a purchase of that product; \
                 otherwise opens the checkout page for the current cart.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "product_id": {
                            "type": "STRING",
                            "description": "Optional id of a product to buy directly."
                        }
                    }
                }),
            ),
            Self::ToggleTheme => ToolDeclaration::new(
                self.name(),
                "Switch the storefront between light and dark mode.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "mode": {
                            "type": "STRING",
                            "enum": ["light", "dark"],
                            "description": "Target mode. Omit to toggle."
                        }
                    }
                }),
            ),
            Self::CompareProducts => ToolDeclaration::new(
                self.name(),
                "Compare two or more products side by side.",
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "product_ids": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "Ids of the products to compare."
                        }
                    },
                    "required": ["product_ids"]
                }),
            ),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
