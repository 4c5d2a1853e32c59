//! Whole-cluster snapshots

use super::autoscaler::AutoscalerConfig;
use super::node::NodeInfo;
use super::pod::{PodInfo, PodScheduleStatus};
use super::pool::WorkerPoolInfo;
use super::priority::PriorityClassInfo;
use crate::hash::{self, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Captured autoscaling-relevant state of one cluster.
///
/// Holds copies of every entity; nothing refers back into another snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSnapshot {
    pub id: String,
    /// Increases by one with every captured snapshot
    pub number: i64,
    pub snapshot_time: DateTime<Utc>,
    pub autoscaler_config: AutoscalerConfig,
    pub worker_pools: Vec<WorkerPoolInfo>,
    pub priority_classes: Vec<PriorityClassInfo>,
    pub pods: Vec<PodInfo>,
    pub nodes: Vec<NodeInfo>,
    pub hash: String,
}

impl ClusterSnapshot {
    pub fn pod_uids(&self) -> BTreeSet<String> {
        self.pods.iter().map(|p| p.uid.clone()).collect()
    }

    /// Pods with `status`, in snapshot order
    pub fn pods_with_schedule_status(&self, status: PodScheduleStatus) -> Vec<&PodInfo> {
        self.pods
            .iter()
            .filter(|p| p.schedule_status == status)
            .collect()
    }

    pub fn pod_namespaces(&self) -> BTreeSet<String> {
        self.pods.iter().map(|p| p.meta.namespace.clone()).collect()
    }

    pub fn priority_class_uids(&self) -> BTreeSet<String> {
        self.priority_classes
            .iter()
            .map(|pc| pc.uid().to_string())
            .collect()
    }

    /// Whether both snapshots hold the same unscheduled pods, by UID.
    ///
    /// The comparison is positional: both snapshots must list their pods in
    /// the same order (callers sort them before capture). Differently ordered
    /// but otherwise equal pod lists compare as different.
    pub fn has_same_unscheduled_pods(&self, other: &ClusterSnapshot) -> bool {
        let ours = self.pods_with_schedule_status(PodScheduleStatus::Unscheduled);
        let theirs = other.pods_with_schedule_status(PodScheduleStatus::Unscheduled);
        ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(p, q)| p.uid == q.uid)
    }
}

impl Snapshot for ClusterSnapshot {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.autoscaler_config.effective_hash());

        let mut pools: Vec<&WorkerPoolInfo> = self.worker_pools.iter().collect();
        pools.sort_by(|a, b| a.meta.name.cmp(&b.meta.name));
        for pool in pools {
            hash::hash_str(&mut h, &pool.effective_hash());
        }

        let mut classes: Vec<&PriorityClassInfo> = self.priority_classes.iter().collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        for pc in classes {
            hash::hash_str(&mut h, &pc.effective_hash());
        }

        let mut pods: Vec<&PodInfo> = self.pods.iter().collect();
        pods.sort_by(|a, b| (a.namespace(), a.name()).cmp(&(b.namespace(), b.name())));
        for pod in pods {
            hash::hash_str(&mut h, &pod.effective_hash());
        }

        let mut nodes: Vec<&NodeInfo> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| a.name().cmp(b.name()));
        for node in nodes {
            hash::hash_str(&mut h, &node.effective_hash());
        }
        hash::finish(h)
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn set_stored_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::meta::SnapshotMeta;

    fn pod(uid: &str, name: &str, status: PodScheduleStatus) -> PodInfo {
        hash::hashed(PodInfo {
            meta: SnapshotMeta::new(name, "default"),
            uid: uid.to_string(),
            schedule_status: status,
            ..Default::default()
        })
    }

    fn snapshot(pods: Vec<PodInfo>) -> ClusterSnapshot {
        ClusterSnapshot {
            id: "snap".to_string(),
            pods,
            ..Default::default()
        }
    }

    #[test]
    fn test_has_same_unscheduled_pods_ignores_scheduled_ones() {
        let a = snapshot(vec![
            pod("u1", "a", PodScheduleStatus::Unscheduled),
            pod("u2", "b", PodScheduleStatus::Committed),
            pod("u3", "c", PodScheduleStatus::Unscheduled),
        ]);
        let b = snapshot(vec![
            pod("u1", "a", PodScheduleStatus::Unscheduled),
            pod("u3", "c", PodScheduleStatus::Unscheduled),
        ]);
        assert!(a.has_same_unscheduled_pods(&b));
    }

    #[test]
    fn test_has_same_unscheduled_pods_is_positional() {
        let a = snapshot(vec![
            pod("u1", "a", PodScheduleStatus::Unscheduled),
            pod("u2", "b", PodScheduleStatus::Unscheduled),
        ]);
        let b = snapshot(vec![
            pod("u2", "b", PodScheduleStatus::Unscheduled),
            pod("u1", "a", PodScheduleStatus::Unscheduled),
        ]);
        assert!(!a.has_same_unscheduled_pods(&b));

        let shorter = snapshot(vec![pod("u1", "a", PodScheduleStatus::Unscheduled)]);
        assert!(!a.has_same_unscheduled_pods(&shorter));
    }

    #[test]
    fn test_hash_ignores_pod_order_and_snapshot_number() {
        let mut a = snapshot(vec![
            pod("u1", "a", PodScheduleStatus::Committed),
            pod("u2", "b", PodScheduleStatus::Pending),
        ]);
        let mut b = snapshot(vec![
            pod("u2", "b", PodScheduleStatus::Pending),
            pod("u1", "a", PodScheduleStatus::Committed),
        ]);
        a.number = 1;
        b.number = 2;
        b.snapshot_time = Utc::now();
        assert_eq!(a.compute_hash(), b.compute_hash());

        b.pods[0].schedule_status = PodScheduleStatus::Committed;
        b.pods[0].rehash();
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_collections() {
        let mut a = snapshot(vec![
            pod("u1", "a", PodScheduleStatus::Committed),
            pod("u2", "b", PodScheduleStatus::Pending),
        ]);
        a.pods[1].meta.namespace = "kube-system".to_string();
        assert_eq!(a.pod_uids().len(), 2);
        assert_eq!(
            a.pod_namespaces().into_iter().collect::<Vec<_>>(),
            vec!["default".to_string(), "kube-system".to_string()]
        );
        assert_eq!(a.pods_with_schedule_status(PodScheduleStatus::Pending).len(), 1);
        assert!(a.priority_class_uids().is_empty());
    }
}
