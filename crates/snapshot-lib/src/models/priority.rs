//! Priority class snapshots

use crate::hash::{self, Snapshot};
use chrono::{DateTime, Utc};
use k8s_openapi::api::scheduling::v1::PriorityClass;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityClassInfo {
    pub row_id: i64,
    pub snapshot_timestamp: DateTime<Utc>,
    pub hash: String,
    pub priority_class: PriorityClass,
}

impl PriorityClassInfo {
    pub fn from_priority_class(pc: &PriorityClass, snapshot_timestamp: DateTime<Utc>) -> Self {
        hash::hashed(Self {
            row_id: 0,
            snapshot_timestamp,
            hash: String::new(),
            priority_class: pc.clone(),
        })
    }

    pub fn name(&self) -> &str {
        self.priority_class.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn uid(&self) -> &str {
        self.priority_class.metadata.uid.as_deref().unwrap_or_default()
    }

    pub fn creation_timestamp(&self) -> DateTime<Utc> {
        self.priority_class
            .metadata
            .creation_timestamp
            .as_ref()
            .map(|t| t.0)
            .unwrap_or_default()
    }
}

impl Snapshot for PriorityClassInfo {
    fn compute_hash(&self) -> String {
        let pc = &self.priority_class;
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, self.name());
        hash::hash_timestamp(&mut h, &self.creation_timestamp());
        hash::hash_i32(&mut h, pc.value);
        hash::hash_bool(&mut h, pc.global_default.unwrap_or(false));
        hash::hash_opt_str(&mut h, pc.preemption_policy.as_deref());
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

impl fmt::Display for PriorityClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PriorityClassInfo(RowID={}, CreationTimestamp={}, SnapshotTimestamp={}, Name={}, Value={}, PreemptionPolicy={}, GlobalDefault={})",
            self.row_id,
            self.creation_timestamp(),
            self.snapshot_timestamp,
            self.name(),
            self.priority_class.value,
            self.priority_class.preemption_policy.as_deref().unwrap_or("<nil>"),
            self.priority_class.global_default.unwrap_or(false)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn class(value: i32, policy: Option<&str>) -> PriorityClass {
        PriorityClass {
            metadata: ObjectMeta {
                name: Some("critical".to_string()),
                uid: Some("pc-1".to_string()),
                ..Default::default()
            },
            value,
            preemption_policy: policy.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_tracks_value_and_policy() {
        let base = PriorityClassInfo::from_priority_class(&class(1000, None), Utc::now());
        let raised = PriorityClassInfo::from_priority_class(&class(2000, None), Utc::now());
        let never = PriorityClassInfo::from_priority_class(&class(1000, Some("Never")), Utc::now());
        assert!(!base.is_same(&raised));
        assert!(!base.is_same(&never));
        assert_eq!(base.uid(), "pc-1");
    }

    #[test]
    fn test_description_and_snapshot_time_are_not_hashed() {
        let a = PriorityClassInfo::from_priority_class(&class(1000, None), Utc::now());
        let mut pc = class(1000, None);
        pc.description = Some("for system pods".to_string());
        let mut b = PriorityClassInfo::from_priority_class(&pc, Utc::now());
        b.row_id = 12;
        assert!(a.is_same(&b));
    }
}
