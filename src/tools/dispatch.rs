//! Name → kind → executor dispatch.

use std::sync::Arc;

use tracing::Instrument;

use crate::observability::SPAN_TOOL_EXECUTE;
use crate::store::{ProductRecord, StoreAccessors, StoreSnapshot};

use super::declarations::ToolKind;
use super::purchase::CheckoutService;
use super::registry::ToolRegistry;
use super::types::{ToolCall, ToolResult};
use super::{cart, compare, find_product, navigation, purchase, theme};

/// Everything an executor may read or touch.
#[derive(Clone)]
pub struct ToolContext {
    store: Option<Arc<StoreSnapshot>>,
    accessors: Arc<dyn StoreAccessors>,
    checkout: Option<Arc<dyn CheckoutService>>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("store_id", &self.store.as_ref().map(|s| s.id.as_str()))
            .field("checkout", &self.checkout.is_some())
            .finish()
    }
}

impl ToolContext {
    pub fn new(store: StoreSnapshot, accessors: Arc<dyn StoreAccessors>) -> Self {
        Self {
            store: Some(Arc::new(store)),
            accessors,
            checkout: None,
        }
    }

    /// A context with no store loaded. Store-dependent tools fail gracefully.
    pub fn without_store(accessors: Arc<dyn StoreAccessors>) -> Self {
        Self {
            store: None,
            accessors,
            checkout: None,
        }
    }

    pub fn with_checkout(mut self, checkout: Arc<dyn CheckoutService>) -> Self {
        self.checkout = Some(checkout);
        self
    }

    pub fn store(&self) -> Option<&StoreSnapshot> {
        self.store.as_deref()
    }

    pub fn accessors(&self) -> &dyn StoreAccessors {
        self.accessors.as_ref()
    }

    pub fn checkout(&self) -> Option<&dyn CheckoutService> {
        self.checkout.as_deref()
    }

    /// Live record from the accessors, falling back to the snapshot.
    pub fn lookup_product(&self, store: &StoreSnapshot, product_id: &str) -> Option<ProductRecord> {
        self.accessors
            .get_product_by_id(&store.id, product_id)
            .or_else(|| store.product(product_id).cloned())
    }
}

/// Result returned when a store-bound tool runs without a store.
pub(crate) fn no_store() -> ToolResult {
    ToolResult::failure("No store is loaded")
}

/// Execute `call` if its name is in `registry`.
///
/// Never fails: unknown names produce `Unknown function <name>`.
pub async fn execute(registry: &ToolRegistry, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let span = tracing::info_span!(SPAN_TOOL_EXECUTE, tool_name = %call.name, call_id = %call.id);
    async {
        let Some(kind) = registry.kind(&call.name) else {
            tracing::warn!(tool_name = %call.name, "model requested an unregistered tool");
            return ToolResult::failure(format!("Unknown function {}", call.name));
        };
        let result = execute_kind(kind, call, ctx).await;
        tracing::debug!(success = result.success, detail = %result.detail, "tool finished");
        result
    }
    .instrument(span)
    .await
}

/// Execute `call` as `kind`, bypassing registry membership.
pub async fn execute_kind(kind: ToolKind, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    match kind {
        ToolKind::FindAndOpenProduct => find_product::find_and_open_product(call, ctx),
        ToolKind::NavigateToPage => navigation::navigate_to_page(call, ctx),
        ToolKind::AddToCart => cart::add_to_cart(call, ctx),
        ToolKind::UpdateCartQuantity => cart::update_cart_quantity(call, ctx),
        ToolKind::InitiatePurchase => purchase::initiate_purchase(call, ctx).await,
        ToolKind::ToggleTheme => theme::toggle_theme(call, ctx),
        ToolKind::CompareProducts => compare::compare_products(call, ctx),
    }
}
