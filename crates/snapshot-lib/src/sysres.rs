//! System overhead estimation and allocatable revision
//!
//! Estimates per-node overhead from the reserved namespace's pods, then
//! subtracts it (plus the kubelet reservation) from a node's allocatable.

use crate::error::Result;
use crate::models::PodInfo;
use crate::quantity::{must_parse_quantity, Format, Quantity};
use crate::resources::{cumulate_pod_requests, sum_resources, ResourceList, RESOURCE_CPU, RESOURCE_MEMORY};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Namespace holding the cluster's system components
pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";

/// Fixed reservation for kubelet and OS overhead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeReserved {
    pub cpu: Quantity,
    pub memory: Quantity,
}

impl Default for KubeReserved {
    fn default() -> Self {
        Self {
            cpu: must_parse_quantity("80m"),
            memory: must_parse_quantity("1Gi"),
        }
    }
}

impl KubeReserved {
    pub fn as_resource_list(&self) -> ResourceList {
        let mut list = ResourceList::new();
        list.insert(RESOURCE_CPU.to_string(), self.cpu);
        list.insert(RESOURCE_MEMORY.to_string(), self.memory);
        list
    }
}

/// Reserved-namespace load on the busiest node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedLoad {
    pub node_name: String,
    pub pod_count: usize,
    pub requests: ResourceList,
}

/// Pick the node hosting the most entries of `placements`.
///
/// Ties go to the lexicographically smallest node name. Empty node names
/// (unbound pods) are ignored.
fn busiest_node<'a>(placements: impl IntoIterator<Item = &'a str>) -> Option<(&'a str, usize)> {
    let mut counts: BTreeMap<&'a str, usize> = BTreeMap::new();
    for node in placements.into_iter().filter(|n| !n.is_empty()) {
        *counts.entry(node).or_default() += 1;
    }
    // Ascending name order plus a strict comparison keeps the first maximum.
    counts
        .into_iter()
        .fold(None::<(&'a str, usize)>, |best, (node, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((node, count)),
        })
}

/// Reserved-namespace requests on the node hosting the most such pods.
///
/// Returns `None` when no pod of `namespace` is bound to a node.
pub fn get_kube_system_pods_requests(pods: &[PodInfo], namespace: &str) -> Option<ReservedLoad> {
    let reserved: Vec<&PodInfo> = pods
        .iter()
        .filter(|p| p.meta.namespace == namespace)
        .collect();
    let (node, pod_count) = busiest_node(reserved.iter().map(|p| p.node_name.as_str()))?;
    let requests = sum_resources(
        reserved
            .iter()
            .filter(|p| p.node_name == node)
            .map(|p| &p.requests),
    );
    debug!(node = %node, pod_count, namespace, "Selected node with most reserved pods");
    Some(ReservedLoad {
        node_name: node.to_string(),
        pod_count,
        requests,
    })
}

/// Like [`get_kube_system_pods_requests`], over raw API pods
pub fn compute_kube_system_resources(pods: &[Pod], namespace: &str) -> Result<Option<ReservedLoad>> {
    let reserved: Vec<&Pod> = pods
        .iter()
        .filter(|p| p.metadata.namespace.as_deref() == Some(namespace))
        .collect();
    let node_of = |p: &Pod| -> String {
        p.spec
            .as_ref()
            .and_then(|s| s.node_name.clone())
            .unwrap_or_default()
    };
    let placements: Vec<String> = reserved.iter().map(|p| node_of(p)).collect();
    let Some((node, pod_count)) = busiest_node(placements.iter().map(String::as_str)) else {
        return Ok(None);
    };

    let mut per_pod = Vec::with_capacity(pod_count);
    for (pod, placed) in reserved.iter().zip(&placements) {
        if placed == node {
            per_pod.push(cumulate_pod_requests(pod)?);
        }
    }
    Ok(Some(ReservedLoad {
        node_name: node.to_string(),
        pod_count,
        requests: sum_resources(per_pod),
    }))
}

/// Subtract system and kubelet reservations from `allocatable`.
///
/// Only cpu and memory are revised, and both are always present in the
/// result. Other resources pass through. Results are not floored at zero, so
/// an over-subscribed node shows up as a negative value.
pub fn compute_revised_allocatable(
    allocatable: &ResourceList,
    system_components: &ResourceList,
    kube_reserved: Option<&ResourceList>,
) -> ResourceList {
    let mut revised = allocatable.clone();

    let mut cpu = allocatable
        .get(RESOURCE_CPU)
        .copied()
        .unwrap_or_else(|| Quantity::from_units(0, Format::DecimalSI));
    let mut memory = allocatable
        .get(RESOURCE_MEMORY)
        .copied()
        .unwrap_or_else(|| Quantity::from_units(0, Format::BinarySI));

    for reservation in std::iter::once(system_components).chain(kube_reserved) {
        if let Some(q) = reservation.get(RESOURCE_CPU) {
            cpu -= *q;
        }
        if let Some(q) = reservation.get(RESOURCE_MEMORY) {
            memory -= *q;
        }
    }

    revised.insert(RESOURCE_CPU.to_string(), cpu);
    revised.insert(RESOURCE_MEMORY.to_string(), memory);
    revised
}

/// Revise with the default kubelet reservation (80m cpu, 1Gi memory)
pub fn compute_revised_resources(original: &ResourceList, system_components: &ResourceList) -> ResourceList {
    compute_revised_resources_with(original, system_components, &KubeReserved::default())
}

pub fn compute_revised_resources_with(
    original: &ResourceList,
    system_components: &ResourceList,
    kube_reserved: &KubeReserved,
) -> ResourceList {
    compute_revised_allocatable(original, system_components, Some(&kube_reserved.as_resource_list()))
}
