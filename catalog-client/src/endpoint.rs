//! Decoding of `/v1/health/service/<name>` entries into [`ObservedRecord`]s.

use serde::Deserialize;
use serde_json::Value;
use shared::types::ObservedRecord;
use crate::error::{CatalogError, CatalogResult};

/// The slice of a health entry we care about. Checks and the rest of the
/// node metadata are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: NodeView,
    service: ServiceView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeView {
    node: String,
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceView {
    #[serde(rename = "ID")]
    id: String,
    service: String,
    #[serde(default)]
    address: Option<String>,
    // Null and missing both mean no tags
    #[serde(default)]
    tags: Option<Vec<String>>,
    port: u16,
}

impl From<HealthEntry> for ObservedRecord {
    fn from(entry: HealthEntry) -> Self {
        let mut tags = entry.service.tags.unwrap_or_default();
        tags.sort();

        Self {
            node: entry.node.node,
            address: entry.node.address,
            service: entry.service.service,
            service_id: entry.service.id,
            service_address: entry.service.address,
            tags,
            port: entry.service.port,
        }
    }
}

/// Decode one raw health entry
pub fn decode(raw: Value) -> CatalogResult<ObservedRecord> {
    let entry: HealthEntry = serde_json::from_value(raw)
        .map_err(|e| CatalogError::decode("catalog endpoint", e))?;
    Ok(entry.into())
}

/// Decode a full endpoint list; the first malformed entry fails the lot
pub fn decode_all(raw: Value) -> CatalogResult<Vec<ObservedRecord>> {
    let entries: Vec<Value> = serde_json::from_value(raw)
        .map_err(|e| CatalogError::decode("catalog endpoint list", e))?;
    entries.into_iter().map(decode).collect()
}
