//! Metadata shared by every snapshot entity

use crate::error::{Result, SnapshotError};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and timing of one observation.
///
/// `row_id` is assigned by the persistence layer and never hashed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotMeta {
    pub row_id: i64,
    /// Creation time of the underlying cluster object
    pub creation_timestamp: DateTime<Utc>,
    /// When this observation was taken
    pub snapshot_timestamp: DateTime<Utc>,
    pub name: String,
    pub namespace: String,
}

impl SnapshotMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Metadata for an API object observed at `snapshot_timestamp`
    pub fn from_object_meta(meta: &ObjectMeta, snapshot_timestamp: DateTime<Utc>) -> Self {
        Self {
            row_id: 0,
            creation_timestamp: meta
                .creation_timestamp
                .as_ref()
                .map(|t| t.0)
                .unwrap_or_default(),
            snapshot_timestamp,
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone().unwrap_or_default(),
        }
    }

    /// An observation cannot predate the object it observes
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_timestamp < self.creation_timestamp {
            return Err(SnapshotError::InvalidTimestamps {
                name: self.qualified_name(),
                creation: self.creation_timestamp.to_rfc3339(),
                snapshot: self.snapshot_timestamp.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// `namespace/name`, or `name` for cluster-scoped objects
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub(crate) fn header(&self, prefix: &str) -> String {
        format!(
            "{}(RowID={}, CreationTimestamp={}, SnapshotTimestamp={}, Name={}, Namespace={}",
            prefix,
            self.row_id,
            self.creation_timestamp,
            self.snapshot_timestamp,
            self.name,
            self.namespace
        )
    }
}

pub(crate) fn labels_of(meta: &ObjectMeta) -> BTreeMap<String, String> {
    meta.labels.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    #[test]
    fn test_from_object_meta() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let observed = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let object = ObjectMeta {
            name: Some("web-0".to_string()),
            namespace: Some("shop".to_string()),
            creation_timestamp: Some(Time(created)),
            ..Default::default()
        };
        let meta = SnapshotMeta::from_object_meta(&object, observed);
        assert_eq!(meta.name, "web-0");
        assert_eq!(meta.qualified_name(), "shop/web-0");
        assert_eq!(meta.creation_timestamp, created);
        assert_eq!(meta.row_id, 0);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_snapshot_before_creation_is_invalid() {
        let meta = SnapshotMeta {
            creation_timestamp: Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
            snapshot_timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            ..SnapshotMeta::new("node-a", "")
        };
        assert!(matches!(
            meta.validate(),
            Err(SnapshotError::InvalidTimestamps { .. })
        ));
    }
}
