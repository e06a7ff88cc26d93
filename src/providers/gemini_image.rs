//! Gemini image generation for product visualization.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use crate::config::{ChatConfig, DEFAULT_API_BASE, VisualizeConfig};
use crate::error::{AssistantError, Result};
use crate::visualize::{GeneratedImage, ImageGenerator, ReferenceImage};

use super::gemini::API_KEY_HEADER;

/// Mime type assumed when the product image response has none.
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Composes the user's photo with a product image via `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiImageGenerator {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    prompt: String,
}

impl GeminiImageGenerator {
    pub fn new(api_key: impl Into<String>, config: &VisualizeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_owned(),
            model: config.model.clone(),
            api_key: api_key.into(),
            prompt: config.prompt.clone(),
        }
    }

    /// Build using the chat section's endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::AuthError`] when the key variable is unset.
    pub fn from_config(chat: &ChatConfig, visualize: &VisualizeConfig) -> Result<Self> {
        Ok(Self::new(chat.api_key()?, visualize).with_api_base(chat.api_base.clone()))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    async fn fetch_product_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssistantError::GenerationError(format!("product image fetch failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::GenerationError(format!(
                "product image fetch returned HTTP {}",
                status.as_u16()
            )));
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_owned())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| FALLBACK_IMAGE_MIME.to_owned());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssistantError::GenerationError(format!("product image read failed: {e}")))?;
        Ok((bytes.to_vec(), mime))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(&self, reference: &ReferenceImage, product_image_url: &str) -> Result<GeneratedImage> {
        let (product_bytes, product_mime) = self.fetch_product_image(product_image_url).await?;

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": self.prompt },
                    { "inlineData": { "mimeType": reference.mime_type, "data": BASE64.encode(&reference.bytes) } },
                    { "inlineData": { "mimeType": product_mime, "data": BASE64.encode(&product_bytes) } },
                ],
            }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::RequestError(format!("image request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::GenerationError(format!(
                "image generation HTTP {}: {text}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::GenerationError(format!("malformed image response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
            .map(|inline| GeneratedImage {
                mime_type: inline.mime_type,
                data: inline.data,
            })
            .ok_or_else(|| AssistantError::GenerationError("response contained no image".into()))
    }
}
