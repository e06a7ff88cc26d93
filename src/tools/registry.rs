//! Tool registries.
//!
//! A [`ToolRegistry`] is an ordered, immutable-after-construction set of
//! declarations. It is handed verbatim to the model configuration and is
//! consulted at dispatch time so a model cannot invoke a tool outside the
//! registry it was given.

use std::collections::HashMap;

use crate::error::{AssistantError, Result};

use super::declarations::ToolKind;
use super::types::ToolDeclaration;

/// Ordered set of tools exposed to one assistant variant.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
    kinds: HashMap<String, ToolKind>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from kinds, in order.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::ConfigError`] if a kind appears twice.
    pub fn from_kinds(kinds: &[ToolKind]) -> Result<Self> {
        let mut registry = Self::new();
        for kind in kinds {
            registry.register(*kind)?;
        }
        Ok(registry)
    }

    /// Tools of the shopping assistant.
    pub fn shopping() -> Self {
        Self::from_static(&[
            ToolKind::FindAndOpenProduct,
            ToolKind::NavigateToPage,
            ToolKind::AddToCart,
            ToolKind::UpdateCartQuantity,
            ToolKind::InitiatePurchase,
            ToolKind::ToggleTheme,
        ])
    }

    /// Tools of the product comparison assistant.
    pub fn comparison() -> Self {
        Self::from_static(&[
            ToolKind::FindAndOpenProduct,
            ToolKind::CompareProducts,
            ToolKind::NavigateToPage,
        ])
    }

    // Static lists above are duplicate-free.
    fn from_static(kinds: &[ToolKind]) -> Self {
        let mut registry = Self::new();
        for kind in kinds {
            let decl = kind.declaration();
            registry.kinds.insert(decl.name.clone(), *kind);
            registry.declarations.push(decl);
        }
        registry
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::ConfigError`] if a tool with the same name
    /// is already registered.
    pub fn register(&mut self, kind: ToolKind) -> Result<()> {
        let decl = kind.declaration();
        if self.kinds.contains_key(&decl.name) {
            return Err(AssistantError::ConfigError(format!(
                "tool {} is already registered",
                decl.name
            )));
        }
        self.kinds.insert(decl.name.clone(), kind);
        self.declarations.push(decl);
        Ok(())
    }

    /// Kind registered under `name`.
    pub fn kind(&self, name: &str) -> Option<ToolKind> {
        self.kinds.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Export declarations for the model's `function_declarations` field.
    pub fn function_declarations(&self) -> Vec<serde_json::Value> {
        self.declarations
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "description": d.description,
                    "parameters": d.parameters,
                })
            })
            .collect()
    }
}
