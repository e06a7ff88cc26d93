//! `add_to_cart` and `update_cart_quantity`.

use super::dispatch::{ToolContext, no_store};
use super::types::{ToolCall, ToolPayload, ToolResult};

/// Parse a quantity argument. `Ok(None)` when absent.
fn quantity_arg(call: &ToolCall, min: u32) -> Result<Option<u32>, ToolResult> {
    if call.args.get("quantity").is_none_or(serde_json::Value::is_null) {
        return Ok(None);
    }
    call.arg_i64("quantity")
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| *q >= min)
        .map(Some)
        .ok_or_else(|| {
            ToolResult::failure(format!("Quantity must be a whole number of at least {min}"))
        })
}

/// Add a product to the cart.
///
/// Exactly one cart change per call: quantity 1 goes through the host's
/// `add_to_cart`, larger quantities through `add_quantity_to_cart`. Both
/// increment an existing line.
pub fn add_to_cart(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(store) = ctx.store() else {
        return no_store();
    };
    let Some(product_id) = call.arg_str("product_id") else {
        return ToolResult::failure("Missing required argument: product_id");
    };
    let quantity = match quantity_arg(call, 1) {
        Ok(q) => q.unwrap_or(1),
        Err(failure) => return failure,
    };
    let Some(product) = ctx.lookup_product(store, &product_id) else {
        return ToolResult::failure(format!("Product {product_id} not found"));
    };

    let accessors = ctx.accessors();
    if quantity == 1 {
        accessors.add_to_cart(&product, &store.id);
    } else {
        accessors.add_quantity_to_cart(&product, &store.id, quantity);
    }
    let now = accessors.cart_quantity(&product.id, &store.id);

    tracing::info!(product_id = %product.id, quantity, cart_quantity = now, "added to cart");
    ToolResult::success(format!("Added {quantity} of {} to the cart", product.name)).with_payload(
        ToolPayload::Cart {
            product_id: product.id,
            quantity: now,
        },
    )
}

/// Set the quantity of an existing cart line. `0` removes it.
pub fn update_cart_quantity(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(store) = ctx.store() else {
        return no_store();
    };
    let Some(product_id) = call.arg_str("product_id") else {
        return ToolResult::failure("Missing required argument: product_id");
    };
    let quantity = match quantity_arg(call, 0) {
        Ok(Some(q)) => q,
        Ok(None) => return ToolResult::failure("Missing required argument: quantity"),
        Err(failure) => return failure,
    };

    let accessors = ctx.accessors();
    if accessors.cart_quantity(&product_id, &store.id) == 0 {
        return ToolResult::failure(format!("Product {product_id} is not in the cart"));
    }
    accessors.update_quantity(&product_id, &store.id, quantity);

    let detail = if quantity == 0 {
        format!("Removed {product_id} from the cart")
    } else {
        format!("Set the quantity of {product_id} to {quantity}")
    };
    ToolResult::success(detail).with_payload(ToolPayload::Cart {
        product_id,
        quantity,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::store::{InMemoryStore, ProductRecord, StoreAccessors, StoreSnapshot, ThemeMode};
    use serde_json::json;

    fn setup() -> (Arc<InMemoryStore>, ToolContext) {
        let snapshot = StoreSnapshot::new("s1").with_products(vec![
            ProductRecord::new("p1", "Mug").with_price(12.0),
            ProductRecord::new("p2", "Lamp").with_price(30.0),
        ]);
        let store = Arc::new(InMemoryStore::new(snapshot.clone()));
        (store.clone(), ToolContext::new(snapshot, store))
    }

    fn add(args: serde_json::Value) -> ToolCall {
        ToolCall::new("c", "add_to_cart", args)
    }

    #[test]
    fn adding_twice_yields_one_line_of_two() {
        let (store, ctx) = setup();
        assert!(add_to_cart(&add(json!({"product_id": "p1", "quantity": 1})), &ctx).success);
        let second = add_to_cart(&add(json!({"product_id": "p1", "quantity": 1})), &ctx);
        assert!(second.success);

        let lines = store.cart_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(
            second.payload,
            Some(ToolPayload::Cart {
                product_id: "p1".into(),
                quantity: 2
            })
        );
    }

    #[test]
    fn default_quantity_is_one() {
        let (store, ctx) = setup();
        add_to_cart(&add(json!({"product_id": "p2"})), &ctx);
        assert_eq!(store.cart_quantity("p2", "s1"), 1);
    }

    #[test]
    fn larger_quantity_on_new_and_existing_lines() {
        let (store, ctx) = setup();
        add_to_cart(&add(json!({"product_id": "p1", "quantity": 3})), &ctx);
        assert_eq!(store.cart_quantity("p1", "s1"), 3);
        add_to_cart(&add(json!({"product_id": "p1", "quantity": 2})), &ctx);
        assert_eq!(store.cart_quantity("p1", "s1"), 5);
        assert_eq!(store.cart_lines().len(), 1);
    }

    /// Wraps the in-memory store and counts cart mutations.
    struct CountingStore {
        inner: InMemoryStore,
        mutations: Mutex<Vec<&'static str>>,
    }

    impl CountingStore {
        fn record(&self, op: &'static str) {
            self.mutations.lock().unwrap().push(op);
        }
    }

    impl StoreAccessors for CountingStore {
        fn get_product_by_id(&self, store_id: &str, product_id: &str) -> Option<ProductRecord> {
            self.inner.get_product_by_id(store_id, product_id)
        }

        fn add_to_cart(&self, product: &ProductRecord, store_id: &str) {
            self.record("add_to_cart");
            self.inner.add_to_cart(product, store_id);
        }

        fn add_quantity_to_cart(&self, product: &ProductRecord, store_id: &str, quantity: u32) {
            self.record("add_quantity_to_cart");
            self.inner.add_quantity_to_cart(product, store_id, quantity);
        }

        fn update_quantity(&self, product_id: &str, store_id: &str, quantity: u32) {
            self.record("update_quantity");
            self.inner.update_quantity(product_id, store_id, quantity);
        }

        fn cart_quantity(&self, product_id: &str, store_id: &str) -> u32 {
            self.inner.cart_quantity(product_id, store_id)
        }

        fn navigate(&self, path: &str) {
            self.inner.navigate(path);
        }

        fn theme_mode(&self) -> ThemeMode {
            self.inner.theme_mode()
        }

        fn set_theme_mode(&self, mode: ThemeMode) {
            self.inner.set_theme_mode(mode);
        }
    }

    #[test]
    fn multi_unit_add_is_one_cart_change() {
        let snapshot = StoreSnapshot::new("s1").with_products(vec![ProductRecord::new("p1", "Mug")]);
        let store = Arc::new(CountingStore {
            inner: InMemoryStore::new(snapshot.clone()),
            mutations: Mutex::new(Vec::new()),
        });
        let ctx = ToolContext::new(snapshot, store.clone());

        let result = add_to_cart(&add(json!({"product_id": "p1", "quantity": 3})), &ctx);
        assert!(result.success);
        assert_eq!(*store.mutations.lock().unwrap(), vec!["add_quantity_to_cart"]);
        assert_eq!(store.cart_quantity("p1", "s1"), 3);

        store.mutations.lock().unwrap().clear();
        add_to_cart(&add(json!({"product_id": "p1"})), &ctx);
        assert_eq!(*store.mutations.lock().unwrap(), vec!["add_to_cart"]);
        assert_eq!(store.cart_quantity("p1", "s1"), 4);
    }

    #[test]
    fn missing_product_id_fails_without_side_effect() {
        let (store, ctx) = setup();
        let result = add_to_cart(&add(json!({"quantity": 1})), &ctx);
        assert!(!result.success);
        assert!(result.detail.contains("product_id"));
        assert!(store.cart_lines().is_empty());
    }

    #[test]
    fn unknown_product_and_bad_quantity() {
        let (store, ctx) = setup();
        assert!(!add_to_cart(&add(json!({"product_id": "nope"})), &ctx).success);
        assert!(!add_to_cart(&add(json!({"product_id": "p1", "quantity": 0})), &ctx).success);
        assert!(!add_to_cart(&add(json!({"product_id": "p1", "quantity": -4})), &ctx).success);
        assert!(!add_to_cart(&add(json!({"product_id": "p1", "quantity": "lots"})), &ctx).success);
        assert!(store.cart_lines().is_empty());
    }

    #[test]
    fn update_existing_line() {
        let (store, ctx) = setup();
        add_to_cart(&add(json!({"product_id": "p1"})), &ctx);
        let call = ToolCall::new("c", "update_cart_quantity", json!({"product_id": "p1", "quantity": 4}));
        assert!(update_cart_quantity(&call, &ctx).success);
        assert_eq!(store.cart_quantity("p1", "s1"), 4);

        let call = ToolCall::new("c", "update_cart_quantity", json!({"product_id": "p1", "quantity": 0}));
        let result = update_cart_quantity(&call, &ctx);
        assert!(result.success);
        assert!(result.detail.starts_with("Removed"));
        assert!(store.cart_lines().is_empty());
    }

    #[test]
    fn update_absent_line_fails() {
        let (_, ctx) = setup();
        let call = ToolCall::new("c", "update_cart_quantity", json!({"product_id": "p2", "quantity": 2}));
        let result = update_cart_quantity(&call, &ctx);
        assert!(!result.success);

        let call = ToolCall::new("c", "update_cart_quantity", json!({"product_id": "p2"}));
        assert!(update_cart_quantity(&call, &ctx).detail.contains("quantity"));
    }
}
