//! Product records as stored by the builder, and the display-safe summary
//! handed to the model and the UI.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::image::resolve_image_url;

/// A product as it appears in the store snapshot.
///
/// Imported catalogs disagree on where images live, so every known shape is
/// accepted and resolved later by [`resolve_image_url`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(
        default,
        rename = "imageUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url_camel: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRef>,
    #[serde(
        default,
        rename = "featuredImage",
        skip_serializing_if = "Option::is_none"
    )]
    pub featured_image: Option<FeaturedImage>,
}

/// The `image` field: either a URL or a set of sized variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageField {
    Url(String),
    Sized {
        #[serde(default)]
        large: Option<String>,
        #[serde(default)]
        medium: Option<String>,
        #[serde(default)]
        small: Option<String>,
    },
    Other(Value),
}

/// One entry of `images[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        #[serde(default)]
        src: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturedImage {
    #[serde(default)]
    pub url: Option<String>,
}

impl ProductRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Resolved canonical image, if any.
    pub fn canonical_image_url(&self) -> Option<String> {
        resolve_image_url(self)
    }

    /// Narrow this record to the fields the chat UI renders.
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            image_url: self.canonical_image_url(),
        }
    }
}

/// Display-safe projection of a product.
///
/// `image_url` is either a non-empty trimmed URL or `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "product id must be a string or number, got {other}"
        ))),
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn lenient_price<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let price = match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse::<f64>()
            .unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(price)
}
