//! Product visualization side-channel.
//!
//! The shopper supplies a photo; it is sent with the product's canonical
//! image to an [`ImageGenerator`] and the result lands in the transcript as
//! an assistant turn carrying a `data:` URL. One attempt per request.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::error::{AssistantError, Result};
use crate::observability::SPAN_VISUALIZE;
use crate::store::{ProductRecord, resolve_image_url};
use crate::transcript::{Role, SharedTranscript, Turn};

/// Text of the system turn appended when visualization fails.
pub const VISUALIZE_FAILURE_TEXT: &str = "Sorry, the product preview could not be created";

/// Photo supplied by the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Generated image, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: String,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Composes a reference photo with a product image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, reference: &ReferenceImage, product_image_url: &str) -> Result<GeneratedImage>;
}

/// Runs visualizations and records their outcome in a transcript.
pub struct Visualizer {
    generator: Arc<dyn ImageGenerator>,
    transcript: SharedTranscript,
}

impl Visualizer {
    pub fn new(generator: Arc<dyn ImageGenerator>, transcript: SharedTranscript) -> Self {
        Self { generator, transcript }
    }

    pub fn transcript(&self) -> &SharedTranscript {
        &self.transcript
    }

    /// Generate a preview of `product` in the shopper's photo.
    ///
    /// On success the appended assistant turn is returned. On failure a
    /// system turn with a generic message and the error code is appended and
    /// the error is returned; the raw error text only goes to the log.
    pub async fn visualize(&self, reference: &ReferenceImage, product: &ProductRecord) -> Result<Turn> {
        let span = tracing::info_span!(SPAN_VISUALIZE, product_id = %product.id);
        let result = self.attempt(reference, product).instrument(span).await;

        match result {
            Ok(image) => {
                let turn = Turn::new(Role::Assistant, format!("Here is {} in your photo.", product.name))
                    .with_image_data_url(image.data_url());
                self.transcript.append(turn.clone());
                tracing::info!(product_id = %product.id, "visualization ready");
                Ok(turn)
            }
            Err(e) => {
                tracing::error!(
                    product_id = %product.id,
                    error_code = e.code(),
                    error = %e,
                    "visualization failed"
                );
                self.transcript.append(Turn::new(
                    Role::System,
                    format!("{VISUALIZE_FAILURE_TEXT} ({}).", e.code()),
                ));
                Err(e)
            }
        }
    }

    async fn attempt(&self, reference: &ReferenceImage, product: &ProductRecord) -> Result<GeneratedImage> {
        if reference.bytes.is_empty() {
            return Err(AssistantError::RequestError("reference image is empty".into()));
        }
        let Some(image_url) = resolve_image_url(product) else {
            return Err(AssistantError::GenerationError(format!(
                "product {} has no image",
                product.id
            )));
        };
        self.generator.generate(reference, &image_url).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;

    struct FakeGenerator {
        result: Mutex<Option<Result<GeneratedImage>>>,
        seen_urls: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn returning(result: Result<GeneratedImage>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                seen_urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn generate(&self, _reference: &ReferenceImage, product_image_url: &str) -> Result<GeneratedImage> {
            self.seen_urls.lock().unwrap().push(product_image_url.to_owned());
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(AssistantError::GenerationError("called twice".into())))
        }
    }

    fn photo() -> ReferenceImage {
        ReferenceImage::new(vec![1, 2, 3], "image/png")
    }

    #[tokio::test]
    async fn success_appends_image_turn() {
        let generator = FakeGenerator::returning(Ok(GeneratedImage {
            mime_type: "image/png".into(),
            data: "QUJD".into(),
        }));
        let visualizer = Visualizer::new(generator.clone(), SharedTranscript::new());
        let product = ProductRecord::new("p1", "Lamp").with_image_url("https://cdn/lamp.png");

        let turn = visualizer.visualize(&photo(), &product).await.unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.image_data_url.as_deref(), Some("data:image/png;base64,QUJD"));
        assert_eq!(visualizer.transcript().len(), 1);
        assert_eq!(generator.seen_urls.lock().unwrap().as_slice(), ["https://cdn/lamp.png"]);
    }

    #[tokio::test]
    async fn failure_appends_generic_system_turn() {
        let generator = FakeGenerator::returning(Err(AssistantError::GenerationError(
            "upstream said: quota exhausted for project 1234".into(),
        )));
        let visualizer = Visualizer::new(generator, SharedTranscript::new());
        let product = ProductRecord::new("p1", "Lamp").with_image_url("lamp.png");

        let err = visualizer.visualize(&photo(), &product).await.unwrap_err();
        assert_eq!(err.code(), "GENERATION_FAILED");

        let turn = visualizer.transcript().last().unwrap();
        assert_eq!(turn.role, Role::System);
        assert!(turn.text.contains("GENERATION_FAILED"));
        assert!(!turn.text.contains("quota"));
    }

    #[tokio::test]
    async fn product_without_image_never_calls_generator() {
        let generator = FakeGenerator::returning(Err(AssistantError::GenerationError("unused".into())));
        let visualizer = Visualizer::new(generator.clone(), SharedTranscript::new());
        let product = ProductRecord::new("p1", "Mystery box");

        assert!(visualizer.visualize(&photo(), &product).await.is_err());
        assert!(generator.seen_urls.lock().unwrap().is_empty());
        assert_eq!(visualizer.transcript().last().unwrap().role, Role::System);
    }
}
