//! Flattening raw pages into one collection

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Flatten pages into one collection using a per-resource extractor.
///
/// Page order and within-page order are preserved.
pub fn assemble<T, I, F>(pages: &[Value], mut extract: F) -> Vec<T>
where
    F: FnMut(&Value) -> I,
    I: IntoIterator<Item = T>,
{
    pages.iter().flat_map(|page| extract(page)).collect()
}

/// Deserialize every page's `items` array into `T` and concatenate.
///
/// A page without an `items` array, or an item that does not match `T`,
/// fails the whole collection with [`Error::MalformedPage`].
pub fn assemble_items<T: DeserializeOwned>(pages: &[Value]) -> Result<Vec<T>> {
    let mut collection = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let items = page
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::MalformedPage {
                index,
                reason: "missing items array".into(),
            })?;
        for item in items {
            let item = T::deserialize(item).map_err(|e| Error::MalformedPage {
                index,
                reason: e.to_string(),
            })?;
            collection.push(item);
        }
    }
    Ok(collection)
}
