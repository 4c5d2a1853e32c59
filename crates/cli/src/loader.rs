//! Reading cluster objects from files
//!
//! Accepts the output of `kubectl get <kind> -o json` (a `List` with an
//! `items` array) as well as a bare JSON array of objects.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use snapshot_lib::{list_all, VecLister};
use std::path::Path;
use tracing::debug;

/// Read every object in `path`, paging through them like an API listing
pub async fn load_items(path: &Path, page_size: u32) -> Result<Vec<Value>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut list) => match list.remove("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => bail!("{}: `items` is not an array", path.display()),
        },
        _ => bail!("{}: expected a list of objects", path.display()),
    };
    debug!(path = %path.display(), count = items.len(), "Loaded objects");

    let lister = VecLister::new(items);
    Ok(list_all(&lister, page_size).await?)
}

/// Decode raw objects into typed API objects
pub fn decode<T: DeserializeOwned>(items: &[Value]) -> Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item.clone()).with_context(|| format!("Invalid object at index {}", i))
        })
        .collect()
}

/// Read a single JSON document
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
