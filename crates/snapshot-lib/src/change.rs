//! Change detection between successive observations
//!
//! A new observation of an entity is only worth storing when its hash differs
//! from the latest stored one. Entities that disappeared are not removed;
//! their latest observation gets a deletion timestamp instead.

use crate::hash::Snapshot;
use crate::models::{
    MachineDeploymentInfo, NodeInfo, PodInfo, PriorityClassInfo, WorkerPoolInfo,
};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A hashed entity with a stable identity across observations
pub trait Tracked: Snapshot + Clone {
    /// Key identifying the same object in successive observations
    fn identity(&self) -> String;

    fn deletion_timestamp(&self) -> Option<DateTime<Utc>>;

    /// Record that the object was gone at `at`. Never touches the hash.
    fn mark_deleted(&mut self, at: DateTime<Utc>);
}

impl Tracked for NodeInfo {
    fn identity(&self) -> String {
        self.meta.name.clone()
    }

    fn deletion_timestamp(&self) -> Option<DateTime<Utc>> {
        self.deletion_timestamp
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deletion_timestamp = Some(at);
    }
}

impl Tracked for PodInfo {
    fn identity(&self) -> String {
        self.meta.qualified_name()
    }

    fn deletion_timestamp(&self) -> Option<DateTime<Utc>> {
        self.deletion_timestamp
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deletion_timestamp = Some(at);
    }
}

impl Tracked for WorkerPoolInfo {
    fn identity(&self) -> String {
        self.meta.name.clone()
    }

    fn deletion_timestamp(&self) -> Option<DateTime<Utc>> {
        self.deletion_timestamp
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deletion_timestamp = Some(at);
    }
}

impl Tracked for MachineDeploymentInfo {
    fn identity(&self) -> String {
        self.meta.qualified_name()
    }

    fn deletion_timestamp(&self) -> Option<DateTime<Utc>> {
        self.deletion_timestamp
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deletion_timestamp = Some(at);
    }
}

impl Tracked for PriorityClassInfo {
    fn identity(&self) -> String {
        self.name().to_string()
    }

    fn deletion_timestamp(&self) -> Option<DateTime<Utc>> {
        self.priority_class
            .metadata
            .deletion_timestamp
            .as_ref()
            .map(|t| t.0)
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.priority_class.metadata.deletion_timestamp = Some(Time(at));
    }
}

/// Outcome of comparing an observation against stored history
#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    /// Objects seen for the first time, or again after being deleted
    pub added: Vec<T>,
    /// Objects whose content hash moved
    pub changed: Vec<T>,
    /// Identities whose latest observation is still current
    pub unchanged: Vec<String>,
    /// Latest stored observation of vanished objects, now tombstoned
    pub deleted: Vec<T>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            changed: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> ChangeSet<T> {
    /// Whether anything needs to be written
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty())
    }
}

/// Compare `observed` against `prior` history.
///
/// When `prior` holds several observations of one identity the later entry
/// wins. A prior entry that is already tombstoned and still absent is not
/// reported again. Identities must be unique within `observed`; repeats after
/// the first are ignored.
pub fn detect_changes<T: Tracked>(
    prior: &[T],
    observed: &[T],
    observed_at: DateTime<Utc>,
) -> ChangeSet<T> {
    let mut latest: BTreeMap<String, &T> = BTreeMap::new();
    for entity in prior {
        latest.insert(entity.identity(), entity);
    }

    let mut changes = ChangeSet::default();
    let mut seen = BTreeSet::new();
    for entity in observed {
        let identity = entity.identity();
        if !seen.insert(identity.clone()) {
            warn!(identity = %identity, "Duplicate identity in observation, keeping the first");
            continue;
        }
        match latest.remove(&identity) {
            Some(previous) if previous.deletion_timestamp().is_none() => {
                if previous.is_same(entity) {
                    changes.unchanged.push(identity);
                } else {
                    debug!(identity = %identity, "Entity changed");
                    changes.changed.push(entity.clone());
                }
            }
            _ => {
                debug!(identity = %identity, "Entity added");
                changes.added.push(entity.clone());
            }
        }
    }

    for (identity, previous) in latest {
        if previous.deletion_timestamp().is_some() {
            continue;
        }
        debug!(identity = %identity, "Entity deleted");
        let mut tombstone = previous.clone();
        tombstone.mark_deleted(observed_at);
        changes.deleted.push(tombstone);
    }
    changes
}
