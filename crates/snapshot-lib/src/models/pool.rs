//! Scaling group snapshots: worker pools and machine deployments

use super::meta::SnapshotMeta;
use crate::hash::{self, Snapshot};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Taint;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label carrying the worker pool a node belongs to
pub const POOL_LABEL: &str = "worker.gardener.cloud/pool";

/// Marks nodes created by a simulated scale-up
pub const LABEL_VIRTUAL_SCALED: &str = "virtual-scaled";

/// Observation of a shoot worker pool
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolInfo {
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    pub machine_type: String,
    pub architecture: String,
    pub minimum: i64,
    pub maximum: i64,
    pub max_surge: IntOrString,
    pub max_unavailable: IntOrString,
    pub zones: Vec<String>,
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub hash: String,
}

impl Snapshot for WorkerPoolInfo {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.meta.name);
        hash::hash_timestamp(&mut h, &self.meta.creation_timestamp);
        hash::hash_str(&mut h, &self.machine_type);
        hash::hash_str(&mut h, &self.architecture);
        hash::hash_int(&mut h, self.minimum);
        hash::hash_int(&mut h, self.maximum);
        hash::hash_int_or_string(&mut h, &self.max_surge);
        hash::hash_int_or_string(&mut h, &self.max_unavailable);
        hash::hash_slice(&mut h, self.zones.as_slice());
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

impl fmt::Display for WorkerPoolInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, MachineType={}, Architecture={}, Minimum={}, Maximum={}, MaxSurge={}, MaxUnavailable={}, Zones={:?}, Hash={})",
            self.meta.header("WorkerPoolInfo"),
            self.machine_type,
            self.architecture,
            self.minimum,
            self.maximum,
            int_or_string_text(&self.max_surge),
            int_or_string_text(&self.max_unavailable),
            self.zones,
            self.hash
        )
    }
}

/// Observation of a machine deployment in the shoot control plane
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineDeploymentInfo {
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    pub replicas: i64,
    pub pool_name: String,
    pub zone: String,
    pub max_surge: IntOrString,
    pub max_unavailable: IntOrString,
    pub machine_class_name: String,
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    pub hash: String,
}

impl Snapshot for MachineDeploymentInfo {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.meta.name);
        hash::hash_str(&mut h, &self.meta.namespace);
        hash::hash_str(&mut h, &self.pool_name);
        hash::hash_str(&mut h, &self.zone);
        hash::hash_int(&mut h, self.replicas);
        hash::hash_int_or_string(&mut h, &self.max_surge);
        hash::hash_int_or_string(&mut h, &self.max_unavailable);
        hash::hash_str(&mut h, &self.machine_class_name);
        hash::hash_labels(&mut h, &self.labels);
        hash::hash_taints(&mut h, &self.taints);
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

impl fmt::Display for MachineDeploymentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Replicas={}, PoolName={}, Zone={}, MaxSurge={}, MaxUnavailable={}, MachineClassName={}, Labels={:?}, Hash={})",
            self.meta.header("MachineDeployment"),
            self.replicas,
            self.pool_name,
            self.zone,
            int_or_string_text(&self.max_surge),
            int_or_string_text(&self.max_unavailable),
            self.machine_class_name,
            self.labels,
            self.hash
        )
    }
}

pub(crate) fn int_or_string_text(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(i) => i.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}
