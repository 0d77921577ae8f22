//! Catalog records as seen by the ranking pipeline.
//!
//! The upstream API returns loosely-typed JSON. Extraction here is defensive:
//! a missing or mistyped field becomes an empty value and never aborts the
//! batch.

use serde::Serialize;
use serde_json::{Map, Value};

/// Image fields probed in order of preference.
const IMAGE_FIELDS: &[&str] = &["largeImageUrl", "mediumImageUrl", "smallImageUrl", "imageUrl"];

/// A single catalog record with every field defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub image_urls: Vec<String>,
    pub item_url: String,
    pub sales_date: String,
}

impl CatalogItem {
    /// Convenience constructor used by callers that already have a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Extract an item from an untyped record.
    ///
    /// Accepts both the wrapped `{"Item": {...}}` shape and a flat object.
    /// Non-object records yield an empty item.
    pub fn from_record(record: &Value) -> Self {
        let object = match record.get("Item").unwrap_or(record) {
            Value::Object(object) => object,
            _ => return Self::default(),
        };

        Self {
            // A non-string title is treated as absent rather than stringified.
            title: object
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            author: text_field(object, &["author", "authors"]),
            publisher: text_field(object, &["publisherName", "publisher"]),
            isbn: text_field(object, &["isbn", "isbn13"]),
            image_urls: image_urls(object),
            item_url: text_field(object, &["itemUrl", "url"]),
            sales_date: text_field(object, &["salesDate", "published"]),
        }
    }
}

/// First present field among `names`, rendered leniently as text.
fn text_field(object: &Map<String, Value>, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| match object.get(*name)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(values) => {
                let joined = values
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(joined)
            }
            _ => None,
        })
        .unwrap_or_default()
}

fn image_urls(object: &Map<String, Value>) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    let listed = object
        .get("imageUrls")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    let named = IMAGE_FIELDS
        .iter()
        .filter_map(|field| object.get(*field).and_then(Value::as_str));

    for url in named.chain(listed) {
        let url = url.trim();
        if !url.is_empty() && !urls.iter().any(|seen| seen == url) {
            urls.push(url.to_string());
        }
    }

    urls
}
