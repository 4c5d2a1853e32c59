//! Node snapshot commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Node;
use serde_json::Value;
use snapshot_lib::resources::{RESOURCE_CPU, RESOURCE_MEMORY};
use snapshot_lib::{cmp_node_info_descending, get_inner_map, get_zone, NodeInfo, POOL_LABEL};
use std::path::Path;
use tabled::Tabled;

use crate::config::CliConfig;
use crate::loader::{decode, load_items};
use crate::output::{color_quantity, print_rows, short_hash, OutputFormat};

/// Row for the nodes table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Taints")]
    taints: usize,
    #[tabled(rename = "Hash")]
    hash: String,
}

/// A node snapshot plus the zone read from its raw labels
pub struct ObservedNode {
    pub info: NodeInfo,
    pub zone: String,
}

fn zone_of(item: &Value) -> String {
    item.as_object()
        .and_then(|obj| get_inner_map(obj, &["metadata", "labels"]).ok())
        .map(get_zone)
        .unwrap_or_default()
}

/// Snapshot raw node objects, newest first
pub fn build_nodes(items: &[Value], observed_at: DateTime<Utc>) -> Result<Vec<ObservedNode>> {
    let nodes: Vec<Node> = decode(items)?;
    let mut observed = nodes
        .iter()
        .zip(items)
        .map(|(node, raw)| -> Result<ObservedNode> {
            let info = NodeInfo::from_node(node, observed_at).with_context(|| {
                format!("Node {}", node.metadata.name.as_deref().unwrap_or("<unnamed>"))
            })?;
            info.meta.validate()?;
            Ok(ObservedNode {
                info,
                zone: zone_of(raw),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    observed.sort_by(|a, b| cmp_node_info_descending(&a.info, &b.info));
    Ok(observed)
}

/// Show node snapshots from a node list file
pub async fn show_nodes(path: &Path, config: &CliConfig, format: OutputFormat) -> Result<()> {
    let items = load_items(path, config.page_size).await?;
    let nodes = build_nodes(&items, Utc::now())?;

    let rows: Vec<NodeRow> = nodes
        .iter()
        .map(|n| NodeRow {
            name: n.info.name().to_string(),
            pool: n.info.labels.get(POOL_LABEL).cloned().unwrap_or_default(),
            zone: n.zone.clone(),
            cpu: color_quantity(n.info.allocatable.get(RESOURCE_CPU)),
            memory: color_quantity(n.info.allocatable.get(RESOURCE_MEMORY)),
            taints: n.info.taints.len(),
            hash: short_hash(&n.info.hash),
        })
        .collect();
    let infos: Vec<&NodeInfo> = nodes.iter().map(|n| &n.info).collect();
    print_rows(&rows, &infos, format)
}
