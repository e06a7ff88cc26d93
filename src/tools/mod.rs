//! Client-side tools the model can invoke.
//!
//! - [`ToolRegistry`]: the declarations given to the model
//! - [`execute`]: dispatch a [`ToolCall`] to its executor
//! - executors: one module per tool family, each returning a [`ToolResult`]

pub mod cart;
pub mod compare;
pub mod declarations;
pub mod dispatch;
pub mod find_product;
pub mod navigation;
pub mod purchase;
pub mod registry;
pub mod theme;
pub mod types;

pub use declarations::ToolKind;
pub use dispatch::{ToolContext, execute, execute_kind};
pub use purchase::{CheckoutItem, CheckoutRequest, CheckoutService};
pub use registry::ToolRegistry;
pub use types::{ToolCall, ToolDeclaration, ToolPayload, ToolResult};
