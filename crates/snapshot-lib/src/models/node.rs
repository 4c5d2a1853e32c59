//! Node snapshots

use super::meta::{labels_of, SnapshotMeta};
use crate::error::Result;
use crate::hash::{self, Snapshot};
use crate::resources::{parse_resource_list, resources_as_string, ResourceList};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Node, Taint};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Observation of an active node.
///
/// A new `NodeInfo` is only captured when its hash changes. Deletion sets
/// `deletion_timestamp` on the latest observation and leaves the hash alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    pub provider_id: String,
    pub allocatable_volumes: i64,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    pub allocatable: ResourceList,
    pub capacity: ResourceList,
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub hash: String,
}

impl NodeInfo {
    /// Build a hashed snapshot from an API node
    pub fn from_node(node: &Node, snapshot_timestamp: DateTime<Utc>) -> Result<Self> {
        let spec = node.spec.as_ref();
        let status = node.status.as_ref();
        let allocatable = match status.and_then(|s| s.allocatable.as_ref()) {
            Some(raw) => parse_resource_list(raw)?,
            None => ResourceList::new(),
        };
        let capacity = match status.and_then(|s| s.capacity.as_ref()) {
            Some(raw) => parse_resource_list(raw)?,
            None => ResourceList::new(),
        };

        Ok(hash::hashed(Self {
            meta: SnapshotMeta::from_object_meta(&node.metadata, snapshot_timestamp),
            provider_id: spec.and_then(|s| s.provider_id.clone()).unwrap_or_default(),
            allocatable_volumes: 0,
            labels: labels_of(&node.metadata),
            taints: spec.and_then(|s| s.taints.clone()).unwrap_or_default(),
            allocatable,
            capacity,
            deletion_timestamp: None,
            hash: String::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

impl Snapshot for NodeInfo {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.meta.name);
        hash::hash_str(&mut h, &self.meta.namespace);
        hash::hash_str(&mut h, &self.provider_id);
        hash::hash_int(&mut h, self.allocatable_volumes);
        hash::hash_labels(&mut h, &self.labels);
        hash::hash_taints(&mut h, &self.taints);
        hash::hash_resources(&mut h, &self.allocatable);
        hash::hash_resources(&mut h, &self.capacity);
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let taints: Vec<String> = self
            .taints
            .iter()
            .map(|t| format!("{}={}:{}", t.key, t.value.as_deref().unwrap_or_default(), t.effect))
            .collect();
        write!(
            f,
            "{}, ProviderID={}, Labels={:?}, Taints=[{}], Allocatable={}, Capacity={}, Hash={})",
            self.meta.header("NodeInfo"),
            self.provider_id,
            self.labels,
            taints.join(","),
            resources_as_string(&self.allocatable),
            resources_as_string(&self.capacity),
            self.hash
        )
    }
}

/// Newest first, by creation time
pub fn cmp_node_info_descending(a: &NodeInfo, b: &NodeInfo) -> Ordering {
    b.meta.creation_timestamp.cmp(&a.meta.creation_timestamp)
}
