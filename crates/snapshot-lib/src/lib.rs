//! Deterministic snapshots of cluster autoscaling state
//!
//! This crate provides:
//! - Content hashing of nodes, pods, worker pools and autoscaler settings
//! - Kubernetes quantity parsing and resource arithmetic
//! - Revision of node allocatable for kube-system reservations
//! - Change detection between successive observations
//! - Paginated listing and nested config lookups

pub mod change;
pub mod error;
pub mod hash;
pub mod models;
pub mod nested;
pub mod quantity;
pub mod resources;
pub mod source;
pub mod sysres;


pub use change::{detect_changes, ChangeSet, Tracked};
pub use error::{Result, SnapshotError};
pub use hash::Snapshot;
pub use models::*;
pub use nested::{as_int_or_string, get_inner_map, get_inner_map_value, get_zone};
pub use quantity::{must_parse_quantity, normalize_quantity, Format, Quantity};
pub use resources::{cumulate_pod_requests, sum_resources, ResourceList};
pub use source::{list_all, Page, PagedLister, VecLister};
pub use sysres::{
    compute_kube_system_resources, compute_revised_allocatable, compute_revised_resources,
    get_kube_system_pods_requests, KubeReserved, ReservedLoad,
};
