//! In-memory [`StoreAccessors`] for embedding and tests.

use std::sync::Mutex;

use super::accessors::{StoreAccessors, ThemeMode};
use super::product::ProductRecord;
use super::StoreSnapshot;

/// One cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub store_id: String,
    pub product: ProductRecord,
    pub quantity: u32,
}

#[derive(Debug, Default)]
struct State {
    cart: Vec<CartLine>,
    navigation: Vec<String>,
    theme: ThemeMode,
}

/// Store backed by a snapshot plus a mutex-guarded cart and router history.
#[derive(Debug)]
pub struct InMemoryStore {
    snapshot: StoreSnapshot,
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        let theme = snapshot.theme.mode;
        Self {
            snapshot,
            state: Mutex::new(State {
                theme,
                ..State::default()
            }),
        }
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    /// Cart lines in insertion order.
    pub fn cart_lines(&self) -> Vec<CartLine> {
        self.lock().cart.clone()
    }

    /// Every path passed to `navigate`, oldest first.
    pub fn navigation_history(&self) -> Vec<String> {
        self.lock().navigation.clone()
    }

    pub fn current_path(&self) -> Option<String> {
        self.lock().navigation.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StoreAccessors for InMemoryStore {
    fn get_product_by_id(&self, store_id: &str, product_id: &str) -> Option<ProductRecord> {
        if store_id != self.snapshot.id {
            return None;
        }
        self.snapshot.product(product_id).cloned()
    }

    fn add_to_cart(&self, product: &ProductRecord, store_id: &str) {
        self.add_quantity_to_cart(product, store_id, 1);
    }

    fn add_quantity_to_cart(&self, product: &ProductRecord, store_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let mut state = self.lock();
        if let Some(line) = state
            .cart
            .iter_mut()
            .find(|l| l.store_id == store_id && l.product.id == product.id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }
        state.cart.push(CartLine {
            store_id: store_id.to_owned(),
            product: product.clone(),
            quantity,
        });
    }

    fn update_quantity(&self, product_id: &str, store_id: &str, quantity: u32) {
        let mut state = self.lock();
        if quantity == 0 {
            state
                .cart
                .retain(|l| !(l.store_id == store_id && l.product.id == product_id));
            return;
        }
        if let Some(line) = state
            .cart
            .iter_mut()
            .find(|l| l.store_id == store_id && l.product.id == product_id)
        {
            line.quantity = quantity;
        }
    }

    fn cart_quantity(&self, product_id: &str, store_id: &str) -> u32 {
        self.lock()
            .cart
            .iter()
            .find(|l| l.store_id == store_id && l.product.id == product_id)
            .map_or(0, |l| l.quantity)
    }

    fn navigate(&self, path: &str) {
        self.lock().navigation.push(path.to_owned());
    }

    fn theme_mode(&self) -> ThemeMode {
        self.lock().theme
    }

    fn set_theme_mode(&self, mode: ThemeMode) {
        self.lock().theme = mode;
    }
}
