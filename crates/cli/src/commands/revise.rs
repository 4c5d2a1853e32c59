//! Allocatable revision command

use anyhow::Result;
use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use snapshot_lib::resources::{ResourceList, RESOURCE_CPU, RESOURCE_MEMORY};
use snapshot_lib::sysres::compute_revised_resources_with;
use snapshot_lib::{compute_kube_system_resources, KubeReserved, NodeInfo, ReservedLoad};
use std::path::Path;
use tabled::Tabled;
use tracing::info;

use crate::commands::nodes::build_nodes;
use crate::config::CliConfig;
use crate::loader::{decode, load_items};
use crate::output::{color_quantity, print_rows, print_warning, OutputFormat};

/// Row for the revised allocatable table
#[derive(Tabled)]
struct RevisedRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU (revised)")]
    revised_cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Memory (revised)")]
    revised_memory: String,
}

/// Revised allocatable of one node
#[derive(Debug, Serialize)]
pub struct RevisedNode {
    pub node: String,
    pub allocatable: ResourceList,
    pub revised: ResourceList,
}

/// Full result of a revision run
#[derive(Debug, Serialize)]
pub struct Revision {
    pub system_load: Option<ReservedLoad>,
    pub kube_reserved: KubeReserved,
    pub nodes: Vec<RevisedNode>,
}

/// Revise every node for the system load and kubelet reservation
pub fn revise(
    nodes: &[NodeInfo],
    pods: &[Pod],
    namespace: &str,
    kube_reserved: &KubeReserved,
) -> Result<Revision> {
    let system_load = compute_kube_system_resources(pods, namespace)?;
    let empty = ResourceList::new();
    let system = system_load.as_ref().map_or(&empty, |load| &load.requests);

    let nodes = nodes
        .iter()
        .map(|node| RevisedNode {
            node: node.name().to_string(),
            allocatable: node.allocatable.clone(),
            revised: compute_revised_resources_with(&node.allocatable, system, kube_reserved),
        })
        .collect();

    Ok(Revision {
        system_load,
        kube_reserved: kube_reserved.clone(),
        nodes,
    })
}

/// Show revised allocatable for the nodes in `nodes_path`
pub async fn show_revised(
    nodes_path: &Path,
    pods_path: &Path,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let nodes: Vec<NodeInfo> = build_nodes(&load_items(nodes_path, config.page_size).await?, Utc::now())?
        .into_iter()
        .map(|n| n.info)
        .collect();
    let pods: Vec<Pod> = decode(&load_items(pods_path, config.page_size).await?)?;

    let revision = revise(&nodes, &pods, &config.reserved_namespace, &config.kube_reserved)?;
    match &revision.system_load {
        Some(load) => info!(
            node = %load.node_name,
            pod_count = load.pod_count,
            namespace = %config.reserved_namespace,
            "Estimated system load"
        ),
        None if format == OutputFormat::Table => print_warning(&format!(
            "No bound pods in namespace {}; only the kubelet reservation applies",
            config.reserved_namespace
        )),
        None => {}
    }

    let rows: Vec<RevisedRow> = revision
        .nodes
        .iter()
        .map(|n| RevisedRow {
            node: n.node.clone(),
            cpu: color_quantity(n.allocatable.get(RESOURCE_CPU)),
            revised_cpu: color_quantity(n.revised.get(RESOURCE_CPU)),
            memory: color_quantity(n.allocatable.get(RESOURCE_MEMORY)),
            revised_memory: color_quantity(n.revised.get(RESOURCE_MEMORY)),
        })
        .collect();
    print_rows(&rows, &revision, format)
}
