//! Pod snapshots

use super::meta::{labels_of, SnapshotMeta};
use crate::error::Result;
use crate::hash::{self, Snapshot};
use crate::resources::{cumulate_pod_requests, resources_as_string, ResourceList};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, Toleration, TopologySpreadConstraint};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scheduling progress of a pod at observation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PodScheduleStatus {
    /// Not yet considered by the scheduler
    Pending = -2,
    /// Preemption nominated a node for it
    Nominated = -1,
    /// The scheduler found no fitting node
    #[default]
    Unscheduled = 0,
    /// Bound to a node
    Committed = 1,
}

impl PodScheduleStatus {
    /// Derive the status from the pod's binding and conditions
    pub fn of(pod: &Pod) -> Self {
        let bound = pod
            .spec
            .as_ref()
            .and_then(|s| s.node_name.as_deref())
            .is_some_and(|n| !n.is_empty());
        if bound {
            return Self::Committed;
        }

        let status = pod.status.as_ref();
        let nominated = status
            .and_then(|s| s.nominated_node_name.as_deref())
            .is_some_and(|n| !n.is_empty());
        if nominated {
            return Self::Nominated;
        }

        let unschedulable = status
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .any(|c| {
                c.type_ == "PodScheduled"
                    && c.status == "False"
                    && c.reason.as_deref() == Some("Unschedulable")
            });
        if unschedulable {
            Self::Unscheduled
        } else {
            Self::Pending
        }
    }
}

/// Observation of a pod.
///
/// When the pod is deleted only its `deletion_timestamp` is updated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodInfo {
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    pub uid: String,
    pub node_name: String,
    pub nominated_node_name: String,
    pub labels: BTreeMap<String, String>,
    /// Sum of the container requests
    pub requests: ResourceList,
    pub spec: PodSpec,
    pub schedule_status: PodScheduleStatus,
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub hash: String,
}

impl PodInfo {
    /// Build a hashed snapshot from an API pod
    pub fn from_pod(pod: &Pod, snapshot_timestamp: DateTime<Utc>) -> Result<Self> {
        let spec = pod.spec.clone().unwrap_or_default();
        Ok(hash::hashed(Self {
            meta: SnapshotMeta::from_object_meta(&pod.metadata, snapshot_timestamp),
            uid: pod.metadata.uid.clone().unwrap_or_default(),
            node_name: spec.node_name.clone().unwrap_or_default(),
            nominated_node_name: pod
                .status
                .as_ref()
                .and_then(|s| s.nominated_node_name.clone())
                .unwrap_or_default(),
            labels: labels_of(&pod.metadata),
            requests: cumulate_pod_requests(pod)?,
            spec,
            schedule_status: PodScheduleStatus::of(pod),
            deletion_timestamp: None,
            hash: String::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }
}

impl Snapshot for PodInfo {
    fn compute_hash(&self) -> String {
        let mut h = hash::new_hasher();
        hash::hash_str(&mut h, &self.meta.name);
        hash::hash_str(&mut h, &self.meta.namespace);
        hash::hash_str(&mut h, &self.node_name);
        hash::hash_str(&mut h, &self.nominated_node_name);
        hash::hash_labels(&mut h, &self.labels);
        hash::hash_opt_str(&mut h, self.spec.scheduler_name.as_deref());
        hash::hash_int(&mut h, self.schedule_status as i64);

        let mut containers: Vec<&Container> = self.spec.containers.iter().collect();
        containers.sort_by(|a, b| a.name.cmp(&b.name));
        for c in containers {
            hash::hash_str(&mut h, &c.name);
            hash::hash_slice(&mut h, c.args.as_deref().unwrap_or_default());
            hash::hash_slice(&mut h, c.command.as_deref().unwrap_or_default());
            hash::hash_opt_str(&mut h, c.image.as_deref());
            for e in c.env.iter().flatten() {
                hash::hash_str(&mut h, &e.name);
                hash::hash_opt_str(&mut h, e.value.as_deref());
            }
        }

        hash::hash_resources(&mut h, &self.requests);

        let mut tolerations: Vec<&Toleration> = self.spec.tolerations.iter().flatten().collect();
        tolerations.sort_by(|a, b| {
            (&a.key, &a.operator, &a.value, &a.effect).cmp(&(&b.key, &b.operator, &b.value, &b.effect))
        });
        for t in tolerations {
            hash::hash_opt_str(&mut h, t.key.as_deref());
            hash::hash_opt_str(&mut h, t.operator.as_deref());
            hash::hash_opt_str(&mut h, t.value.as_deref());
            hash::hash_opt_str(&mut h, t.effect.as_deref());
        }

        let mut constraints: Vec<&TopologySpreadConstraint> =
            self.spec.topology_spread_constraints.iter().flatten().collect();
        constraints.sort_by(|a, b| a.topology_key.cmp(&b.topology_key));
        for tsc in constraints {
            hash::hash_int(&mut h, i64::from(tsc.max_skew));
            hash::hash_str(&mut h, &tsc.topology_key);
            hash::hash_str(&mut h, &tsc.when_unsatisfiable);
            if let Some(selector) = &tsc.label_selector {
                hash::hash_str(&mut h, &format_label_selector(selector));
            }
            if let Some(min_domains) = tsc.min_domains {
                hash::hash_int(&mut h, i64::from(min_domains));
            }
            hash::hash_opt_str(&mut h, tsc.node_affinity_policy.as_deref());
            hash::hash_opt_str(&mut h, tsc.node_taints_policy.as_deref());
            hash::hash_slice(&mut h, tsc.match_label_keys.as_deref().unwrap_or_default());
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

impl fmt::Display for PodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, UID={}, NodeName={}, NominatedNodeName={}, Labels={:?}, Requests={}, Hash={})",
            self.meta.header("PodInfo"),
            self.uid,
            self.node_name,
            self.nominated_node_name,
            self.labels,
            resources_as_string(&self.requests),
            self.hash
        )
    }
}

/// Selector in `kubectl` notation: `app=web,tier in (a,b),!legacy`.
///
/// Label pairs come first in key order, then expressions in their given order
/// with values sorted, so one selector always renders the same way.
pub fn format_label_selector(selector: &LabelSelector) -> String {
    let mut parts: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    for expr in selector.match_expressions.iter().flatten() {
        let mut values: Vec<&str> = expr.values.iter().flatten().map(String::as_str).collect();
        values.sort_unstable();
        let part = match expr.operator.as_str() {
            "In" => format!("{} in ({})", expr.key, values.join(",")),
            "NotIn" => format!("{} notin ({})", expr.key, values.join(",")),
            "Exists" => expr.key.clone(),
            "DoesNotExist" => format!("!{}", expr.key),
            other => format!("{} {} ({})", expr.key, other, values.join(",")),
        };
        parts.push(part);
    }

    if parts.is_empty() {
        "<none>".to_string()
    } else {
        parts.join(",")
    }
}

/// Whether any of `pods` carries `uid`
pub fn contains_pod(uid: &str, pods: &[PodInfo]) -> bool {
    pods.iter().any(|p| p.uid == uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EnvVar, PodCondition, PodStatus, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity as RawQuantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelectorRequirement, ObjectMeta};

    fn container(name: &str, image: &str, cpu: &str) -> Container {
        Container {
            name: name.to_string(),
            image: Some(image.to_string()),
            args: Some(vec!["--port".to_string(), "8080".to_string()]),
            env: Some(vec![EnvVar {
                name: "MODE".to_string(),
                value: Some("prod".to_string()),
                ..Default::default()
            }]),
            resources: Some(ResourceRequirements {
                requests: Some(
                    [("cpu".to_string(), RawQuantity(cpu.to_string()))]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn api_pod(containers: Vec<Container>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                namespace: Some("shop".to_string()),
                uid: Some("uid-web-0".to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers,
                scheduler_name: Some("default-scheduler".to_string()),
                ..Default::default()
            }),
            status: None,
        }
    }

    fn toleration(key: &str) -> Toleration {
        Toleration {
            key: Some(key.to_string()),
            operator: Some("Exists".to_string()),
            effect: Some("NoSchedule".to_string()),
            ..Default::default()
        }
    }

    fn spread(key: &str, min_domains: Option<i32>) -> TopologySpreadConstraint {
        TopologySpreadConstraint {
            max_skew: 1,
            topology_key: key.to_string(),
            when_unsatisfiable: "DoNotSchedule".to_string(),
            min_domains,
            ..Default::default()
        }
    }

    #[test]
    fn test_container_order_does_not_matter() {
        let a = api_pod(vec![container("app", "web:1", "200m"), container("proxy", "envoy:1", "50m")]);
        let b = api_pod(vec![container("proxy", "envoy:1", "50m"), container("app", "web:1", "200m")]);
        let a = PodInfo::from_pod(&a, Utc::now()).unwrap();
        let b = PodInfo::from_pod(&b, Utc::now()).unwrap();
        assert!(a.is_same(&b));
        assert_eq!(a.requests["cpu"].milli_value(), 250);
    }

    #[test]
    fn test_toleration_and_constraint_order_does_not_matter() {
        let mut a = PodInfo::from_pod(&api_pod(vec![]), Utc::now()).unwrap();
        a.spec.tolerations = Some(vec![toleration("gpu"), toleration("spot")]);
        a.spec.topology_spread_constraints = Some(vec![spread("zone", None), spread("host", Some(2))]);
        let mut b = a.clone();
        b.spec.tolerations = Some(vec![toleration("spot"), toleration("gpu")]);
        b.spec.topology_spread_constraints = Some(vec![spread("host", Some(2)), spread("zone", None)]);
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_optional_constraint_fields_are_hashed_when_present() {
        let mut a = PodInfo::from_pod(&api_pod(vec![]), Utc::now()).unwrap();
        a.spec.topology_spread_constraints = Some(vec![spread("zone", None)]);
        let mut b = a.clone();
        b.spec.topology_spread_constraints = Some(vec![spread("zone", Some(3))]);
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_image_change_changes_hash() {
        let a = PodInfo::from_pod(&api_pod(vec![container("app", "web:1", "200m")]), Utc::now()).unwrap();
        let b = PodInfo::from_pod(&api_pod(vec![container("app", "web:2", "200m")]), Utc::now()).unwrap();
        assert!(!a.is_same(&b));
    }

    #[test]
    fn test_uid_and_timestamps_are_not_hashed() {
        let a = PodInfo::from_pod(&api_pod(vec![]), Utc::now()).unwrap();
        let mut b = a.clone();
        b.uid = "another".to_string();
        b.meta.row_id = 7;
        b.deletion_timestamp = Some(Utc::now());
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_schedule_status() {
        let mut pod = api_pod(vec![]);
        assert_eq!(PodScheduleStatus::of(&pod), PodScheduleStatus::Pending);

        pod.status = Some(PodStatus {
            conditions: Some(vec![PodCondition {
                type_: "PodScheduled".to_string(),
                status: "False".to_string(),
                reason: Some("Unschedulable".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });
        assert_eq!(PodScheduleStatus::of(&pod), PodScheduleStatus::Unscheduled);

        pod.status.as_mut().unwrap().nominated_node_name = Some("node-b".to_string());
        assert_eq!(PodScheduleStatus::of(&pod), PodScheduleStatus::Nominated);

        pod.spec.as_mut().unwrap().node_name = Some("node-a".to_string());
        assert_eq!(PodScheduleStatus::of(&pod), PodScheduleStatus::Committed);

        let info = PodInfo::from_pod(&pod, Utc::now()).unwrap();
        assert_eq!(info.node_name, "node-a");
        assert_eq!(info.nominated_node_name, "node-b");
    }

    #[test]
    fn test_format_label_selector() {
        let selector = LabelSelector {
            match_labels: Some(
                [("tier", "web"), ("app", "shop")]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "zone".to_string(),
                    operator: "In".to_string(),
                    values: Some(vec!["b".to_string(), "a".to_string()]),
                },
                LabelSelectorRequirement {
                    key: "legacy".to_string(),
                    operator: "DoesNotExist".to_string(),
                    values: None,
                },
            ]),
        };
        assert_eq!(
            format_label_selector(&selector),
            "app=shop,tier=web,zone in (a,b),!legacy"
        );
        assert_eq!(format_label_selector(&LabelSelector::default()), "<none>");
    }

    #[test]
    fn test_contains_pod() {
        let pod = PodInfo::from_pod(&api_pod(vec![]), Utc::now()).unwrap();
        assert!(contains_pod("uid-web-0", &[pod.clone()]));
        assert!(!contains_pod("uid-other", &[pod]));
    }
}
