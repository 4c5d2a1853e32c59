//! Snapshot entity model
//!
//! Every entity is an immutable observation. Hashed entities implement
//! [`Snapshot`](crate::hash::Snapshot); the only mutation allowed after
//! capture is setting a deletion timestamp, which is never hashed.

mod autoscaler;
mod cluster;
mod event;
mod meta;
mod node;
mod pod;
mod pool;
mod priority;

pub use autoscaler::{
    AutoscalerConfig, AutoscalerMode, CASettingsInfo, MinMax, NodeGroupInfo, NodeTemplate,
};
pub use cluster::ClusterSnapshot;
pub use event::{compare_events_by_event_time, EventInfo};
pub use meta::SnapshotMeta;
pub use node::{cmp_node_info_descending, NodeInfo};
pub use pod::{contains_pod, format_label_selector, PodInfo, PodScheduleStatus};
pub use pool::{MachineDeploymentInfo, WorkerPoolInfo, LABEL_VIRTUAL_SCALED, POOL_LABEL};
pub use priority::PriorityClassInfo;

/// Pod equality by hash
pub fn is_equal_pod_info(a: &PodInfo, b: &PodInfo) -> bool {
    use crate::hash::Snapshot;
    a.is_same(b)
}
