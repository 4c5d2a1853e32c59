//! Snapshot comparison command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use snapshot_lib::{detect_changes, ChangeSet, ClusterSnapshot, Snapshot, Tracked};
use std::path::Path;
use tabled::Tabled;

use crate::loader::load_json;
use crate::output::{print_rows, print_success, print_warning, short_hash, OutputFormat};

/// Row for the per-kind change table
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct KindChanges {
    #[tabled(rename = "Kind")]
    pub kind: &'static str,
    #[tabled(rename = "Added")]
    pub added: usize,
    #[tabled(rename = "Changed")]
    pub changed: usize,
    #[tabled(rename = "Unchanged")]
    pub unchanged: usize,
    #[tabled(rename = "Deleted")]
    pub deleted: usize,
}

impl KindChanges {
    fn from_changes<T>(kind: &'static str, changes: &ChangeSet<T>) -> Self {
        Self {
            kind,
            added: changes.added.len(),
            changed: changes.changed.len(),
            unchanged: changes.unchanged.len(),
            deleted: changes.deleted.len(),
        }
    }
}

/// Comparison of two snapshots
#[derive(Debug, Serialize)]
pub struct SnapshotDiff {
    pub old_hash: String,
    pub new_hash: String,
    pub same_unscheduled_pods: bool,
    pub kinds: Vec<KindChanges>,
}

impl SnapshotDiff {
    pub fn is_identical(&self) -> bool {
        self.old_hash == self.new_hash
    }
}

fn compare<T: Tracked>(kind: &'static str, old: &[T], new: &[T], new_snapshot: &ClusterSnapshot) -> KindChanges {
    KindChanges::from_changes(kind, &detect_changes(old, new, new_snapshot.snapshot_time))
}

/// Compare two snapshots entity by entity
pub fn diff_snapshots(old: &ClusterSnapshot, new: &ClusterSnapshot) -> SnapshotDiff {
    SnapshotDiff {
        old_hash: old.effective_hash().into_owned(),
        new_hash: new.effective_hash().into_owned(),
        same_unscheduled_pods: old.has_same_unscheduled_pods(new),
        kinds: vec![
            compare("nodes", &old.nodes, &new.nodes, new),
            compare("pods", &old.pods, &new.pods, new),
            compare("worker pools", &old.worker_pools, &new.worker_pools, new),
            compare("priority classes", &old.priority_classes, &new.priority_classes, new),
            compare(
                "existing nodes",
                &old.autoscaler_config.existing_nodes,
                &new.autoscaler_config.existing_nodes,
                new,
            ),
        ],
    }
}

/// Show the differences between two serialized snapshots
pub async fn show_diff(old_path: &Path, new_path: &Path, format: OutputFormat) -> Result<()> {
    let old: ClusterSnapshot = load_json(old_path).await?;
    let new: ClusterSnapshot = load_json(new_path).await?;
    let diff = diff_snapshots(&old, &new);

    if format == OutputFormat::Json {
        return print_rows(&diff.kinds, &diff, format);
    }

    println!("{}", "Snapshot Diff".bold());
    println!("{}", "=".repeat(50));
    println!("Old:  #{} {} {}", old.number, old.id, short_hash(&diff.old_hash).dimmed());
    println!("New:  #{} {} {}", new.number, new.id, short_hash(&diff.new_hash).dimmed());
    println!();
    print_rows(&diff.kinds, &diff, format)?;
    println!();

    if diff.is_identical() {
        print_success("Snapshots are identical");
    }
    if diff.same_unscheduled_pods {
        print_success("Unscheduled pods are the same");
    } else {
        print_warning("Unscheduled pods differ");
    }
    Ok(())
}
