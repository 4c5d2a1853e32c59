//! Pod snapshot commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use serde_json::Value;
use snapshot_lib::resources::resources_as_string;
use snapshot_lib::{PodInfo, PodScheduleStatus};
use std::path::Path;
use tabled::Tabled;

use crate::config::CliConfig;
use crate::loader::{decode, load_items};
use crate::output::{color_status, print_info, print_rows, short_hash, OutputFormat};

/// Row for the pods table
#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Requests")]
    requests: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

/// Snapshot raw pod objects, ordered by namespace and name
pub fn build_pods(items: &[Value], observed_at: DateTime<Utc>) -> Result<Vec<PodInfo>> {
    let pods: Vec<Pod> = decode(items)?;
    let mut infos = pods
        .iter()
        .map(|pod| -> Result<PodInfo> {
            let info = PodInfo::from_pod(pod, observed_at).with_context(|| {
                format!(
                    "Pod {}/{}",
                    pod.metadata.namespace.as_deref().unwrap_or_default(),
                    pod.metadata.name.as_deref().unwrap_or_default()
                )
            })?;
            info.meta.validate()?;
            Ok(info)
        })
        .collect::<Result<Vec<_>>>()?;
    infos.sort_by(|a, b| (a.namespace(), a.name()).cmp(&(b.namespace(), b.name())));
    Ok(infos)
}

/// Show pod snapshots from a pod list file
pub async fn show_pods(
    path: &Path,
    namespace: Option<&str>,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let items = load_items(path, config.page_size).await?;
    let mut pods = build_pods(&items, Utc::now())?;
    if let Some(ns) = namespace {
        pods.retain(|p| p.namespace() == ns);
    }

    let rows: Vec<PodRow> = pods
        .iter()
        .map(|p| PodRow {
            namespace: p.namespace().to_string(),
            name: p.name().to_string(),
            node: p.node_name.clone(),
            status: color_status(p.schedule_status),
            requests: resources_as_string(&p.requests),
            hash: short_hash(&p.hash),
        })
        .collect();
    print_rows(&rows, &pods, format)?;

    if format == OutputFormat::Table {
        let unscheduled = pods
            .iter()
            .filter(|p| p.schedule_status == PodScheduleStatus::Unscheduled)
            .count();
        if unscheduled > 0 {
            print_info(&format!("{} pod(s) could not be scheduled", unscheduled));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_pods_orders_and_classifies() {
        let items = vec![
            json!({
                "metadata": {"name": "b", "namespace": "default", "uid": "2"},
                "spec": {"containers": [{"name": "c", "resources": {"requests": {"cpu": "100m"}}}]},
                "status": {"nominatedNodeName": "n1"}
            }),
            json!({
                "metadata": {"name": "a", "namespace": "default", "uid": "1"},
                "spec": {"nodeName": "n1", "containers": [{"name": "c"}]}
            }),
        ];
        let pods = build_pods(&items, Utc::now()).unwrap();
        assert_eq!(pods[0].name(), "a");
        assert_eq!(pods[0].schedule_status, PodScheduleStatus::Committed);
        assert_eq!(pods[1].schedule_status, PodScheduleStatus::Nominated);
        assert_eq!(resources_as_string(&pods[1].requests), "(cpu:100m)");
    }
}
