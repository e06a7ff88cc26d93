//! Product lookup for free-text queries.
//!
//! The policy is deterministic:
//!
//! 1. exact case-insensitive name match (trimmed), first in catalog order;
//! 2. token-overlap scoring, highest score above zero wins;
//! 3. a bare identifier-like query falls back to an id match.
//!
//! Scoring: every query token present among the name tokens adds
//! [`NAME_TOKEN_WEIGHT`], among the description tokens adds
//! [`DESCRIPTION_TOKEN_WEIGHT`]. The whole query appearing inside the name adds
//! [`NAME_SUBSTRING_BONUS`], inside the description [`DESCRIPTION_SUBSTRING_BONUS`].
//! Ties keep the earlier product.

use std::collections::HashSet;

use super::product::ProductRecord;

pub const NAME_TOKEN_WEIGHT: u32 = 2;
pub const DESCRIPTION_TOKEN_WEIGHT: u32 = 1;
pub const NAME_SUBSTRING_BONUS: u32 = 5;
pub const DESCRIPTION_SUBSTRING_BONUS: u32 = 2;

/// Find the product best matching `query`, if any.
pub fn find_product<'a>(products: &'a [ProductRecord], query: &str) -> Option<&'a ProductRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(exact) = products
        .iter()
        .find(|p| p.name.trim().to_lowercase() == needle)
    {
        return Some(exact);
    }

    let query_tokens = tokenize(&needle);
    let mut best: Option<(&ProductRecord, u32)> = None;
    for product in products {
        let score = score(product, &needle, &query_tokens);
        if score == 0 {
            continue;
        }
        // Strictly greater keeps the first product on ties.
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((product, score));
        }
    }
    if let Some((product, _)) = best {
        return Some(product);
    }

    if is_bare_token(query.trim()) {
        return products
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(query.trim()));
    }
    None
}

/// Relevance of `product` for an already lower-cased query.
pub fn score(product: &ProductRecord, needle: &str, query_tokens: &[String]) -> u32 {
    let name = product.name.to_lowercase();
    let description = product.description.to_lowercase();
    let name_tokens: HashSet<String> = tokenize(&name).into_iter().collect();
    let description_tokens: HashSet<String> = tokenize(&description).into_iter().collect();

    let mut score = 0;
    for token in query_tokens {
        if name_tokens.contains(token) {
            score += NAME_TOKEN_WEIGHT;
        }
        if description_tokens.contains(token) {
            score += DESCRIPTION_TOKEN_WEIGHT;
        }
    }
    if name.contains(needle) {
        score += NAME_SUBSTRING_BONUS;
    }
    if description.contains(needle) {
        score += DESCRIPTION_SUBSTRING_BONUS;
    }
    score
}

/// Split lower-cased text on anything that is not alphanumeric.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_bare_token(query: &str) -> bool {
    !query.is_empty()
        && query
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
