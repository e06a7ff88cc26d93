//! System instruction assembly.
//!
//! The instruction is fixed for the lifetime of a chat or live session. It is
//! built from a core prompt, a catalog digest of the current store and the
//! merchant's own knowledge base.

use crate::store::StoreSnapshot;

/// Behavioural rules shared by every assistant variant.
pub const CORE_PROMPT: &str = "\
You are a friendly shopping assistant embedded in an online store.
- Keep answers short and conversational.
- Only talk about products that exist in the catalog below.
- When the shopper asks about a specific product, call find_and_open_product.
- Use the product ids from the catalog when calling cart or purchase tools.
- Never invent prices, stock levels or policies.";

/// Maximum number of products listed in the catalog digest.
pub const MAX_CATALOG_ENTRIES: usize = 200;

/// One line per product: `- <id>: <name> (<price>)`.
pub fn catalog_digest(store: &StoreSnapshot) -> String {
    let mut lines = Vec::with_capacity(store.products.len().min(MAX_CATALOG_ENTRIES) + 1);
    let heading = match store.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("Catalog of {name}:"),
        _ => "Catalog:".to_owned(),
    };
    lines.push(heading);
    for product in store.products.iter().take(MAX_CATALOG_ENTRIES) {
        lines.push(format!(
            "- {}: {} ({:.2})",
            product.id,
            product.name.trim(),
            product.price
        ));
    }
    if store.products.len() > MAX_CATALOG_ENTRIES {
        lines.push(format!(
            "- ... and {} more products",
            store.products.len() - MAX_CATALOG_ENTRIES
        ));
    }
    lines.join("\n")
}

/// Join the core prompt, catalog digest and knowledge base, skipping blanks.
pub fn assemble_instruction(store: Option<&StoreSnapshot>, knowledge_base: &str) -> String {
    let catalog = store.map(catalog_digest).unwrap_or_default();
    let knowledge_base = knowledge_base.trim();

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    parts.push(CORE_PROMPT);
    if !catalog.is_empty() {
        parts.push(&catalog);
    }
    if !knowledge_base.is_empty() {
        parts.push(knowledge_base);
    }
    parts.join("\n\n")
}
