//! Cluster-autoscaler configuration snapshots

use super::node::NodeInfo;
use crate::error::{Result, SnapshotError};
use crate::hash::{self, Snapshot};
use crate::resources::ResourceList;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Taint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// How the autoscaler consumes snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutoscalerMode {
    /// Replays recorded snapshots
    #[default]
    #[serde(rename = "replay-mode")]
    Replay,
    /// Runs against a standalone virtual cluster
    #[serde(rename = "standalone-mode")]
    Standalone,
}

impl fmt::Display for AutoscalerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replay => f.write_str("replay-mode"),
            Self::Standalone => f.write_str("standalone-mode"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinMax {
    pub min: i64,
    pub max: i64,
}

impl fmt::Display for MinMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.min, self.max)
    }
}

/// Autoscaler options configurable through the shoot spec.
///
/// The hash doubles as the primary key of stored settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CASettingsInfo {
    pub snapshot_timestamp: DateTime<Utc>,
    pub expander: String,
    pub node_groups_min_max: BTreeMap<String, MinMax>,
    pub max_node_provision_time: Duration,
    pub scan_interval: Duration,
    pub max_graceful_termination_seconds: i64,
    pub new_pod_scale_up_delay: Duration,
    pub max_empty_bulk_delete: i64,
    pub ignore_daemon_set_utilization: bool,
    pub max_nodes_total: i64,
    /// Value of the `priorities` key in the priority expander config map
    pub priorities: String,
    pub hash: String,
}

impl CASettingsInfo {
    pub fn primary_key(&self) -> std::borrow::Cow<'_, str> {
        self.effective_hash()
    }
}

impl Snapshot for CASettingsInfo {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.expander);
        for (name, mm) in &self.node_groups_min_max {
            hash::hash_str(&mut h, name);
            hash::hash_int(&mut h, mm.min);
            hash::hash_int(&mut h, mm.max);
        }
        hash::hash_duration(&mut h, self.max_node_provision_time);
        hash::hash_duration(&mut h, self.scan_interval);
        hash::hash_int(&mut h, self.max_graceful_termination_seconds);
        hash::hash_duration(&mut h, self.new_pod_scale_up_delay);
        hash::hash_int(&mut h, self.max_empty_bulk_delete);
        hash::hash_bool(&mut h, self.ignore_daemon_set_utilization);
        hash::hash_int(&mut h, self.max_nodes_total);
        hash::hash_str(&mut h, &self.priorities);
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

/// Capacity template for nodes of one scaling group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub name: String,
    pub instance_type: String,
    pub region: String,
    pub zone: String,
    pub capacity: ResourceList,
    pub allocatable: ResourceList,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    pub hash: String,
}

impl Snapshot for NodeTemplate {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.name);
        hash::hash_str(&mut h, &self.instance_type);
        hash::hash_str(&mut h, &self.region);
        hash::hash_str(&mut h, &self.zone);
        hash::hash_resources(&mut h, &self.capacity);
        hash::hash_resources(&mut h, &self.allocatable);
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

/// Live state of one node group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeGroupInfo {
    pub name: String,
    pub pool_name: String,
    pub zone: String,
    pub target_size: i64,
    pub min_size: i64,
    pub max_size: i64,
    pub hash: String,
}

impl Snapshot for NodeGroupInfo {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.name);
        hash::hash_int(&mut h, self.target_size);
        hash::hash_int(&mut h, self.min_size);
        hash::hash_int(&mut h, self.max_size);
        hash::hash_str(&mut h, &self.zone);
        hash::hash_str(&mut h, &self.pool_name);
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

impl fmt::Display for NodeGroupInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeGroupInfo(Name: {}, PoolName: {}, Zone: {}, TargetSize: {}, MinSize: {}, MaxSize: {})",
            self.name, self.pool_name, self.zone, self.target_size, self.min_size, self.max_size
        )
    }
}

/// Everything the autoscaler needs to start against a snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalerConfig {
    pub node_templates: BTreeMap<String, NodeTemplate>,
    pub node_groups: BTreeMap<String, NodeGroupInfo>,
    pub existing_nodes: Vec<NodeInfo>,
    pub ca_settings: CASettingsInfo,
    pub mode: AutoscalerMode,
    pub success_signal_path: String,
    pub error_signal_path: String,
    pub hash: String,
}

impl AutoscalerConfig {
    /// Copy every min/max bound from the CA settings onto its node group.
    ///
    /// Fails when a bound names a node group that does not exist; in that case
    /// no group has been modified.
    pub fn init(&mut self) -> Result<()> {
        if let Some(unknown) = self
            .ca_settings
            .node_groups_min_max
            .keys()
            .find(|name| !self.node_groups.contains_key(*name))
        {
            return Err(SnapshotError::UnknownNodeGroup(unknown.clone()));
        }

        for (name, mm) in &self.ca_settings.node_groups_min_max {
            if let Some(group) = self.node_groups.get_mut(name) {
                group.min_size = mm.min;
                group.max_size = mm.max;
                group.rehash();
                debug!(node_group = %name, bounds = %mm, "Applied node group bounds");
            }
        }
        Ok(())
    }
}

impl Snapshot for AutoscalerConfig {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        for (name, template) in &self.node_templates {
            hash::hash_str(&mut h, name);
            hash::hash_str(&mut h, &template.effective_hash());
        }
        for (name, group) in &self.node_groups {
            hash::hash_str(&mut h, name);
            hash::hash_str(&mut h, &group.effective_hash());
        }
        let mut nodes: Vec<&NodeInfo> = self.existing_nodes.iter().collect();
        nodes.sort_by(|a, b| a.meta.name.cmp(&b.meta.name));
        for node in nodes {
            hash::hash_str(&mut h, &node.effective_hash());
        }
        hash::hash_str(&mut h, &self.ca_settings.effective_hash());
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}
