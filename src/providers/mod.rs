//! Network adapters: Gemini chat and image generation, checkout sessions.
//!
//! The live WebSocket connector lives with the rest of the live session in
//! [`crate::live::transport`].

pub mod checkout;
pub mod gemini;
pub mod gemini_image;
pub mod sse;

pub use checkout::HttpCheckoutService;
pub use gemini::GeminiChatProvider;
pub use gemini_image::GeminiImageGenerator;
