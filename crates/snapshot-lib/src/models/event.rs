//! Cluster events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An event emitted in the cluster. Events are append-only and not hashed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventInfo {
    pub uid: String,
    pub event_time: DateTime<Utc>,
    pub reporting_controller: String,
    pub reason: String,
    pub message: String,
    pub involved_object_kind: String,
    pub involved_object_name: String,
    pub involved_object_namespace: String,
    pub involved_object_uid: String,
}

impl fmt::Display for EventInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventInfo(UID={}, EventTime={}, ReportingController={}, Reason={}, Message={}, InvolvedObjectName={}, InvolvedObjectNamespace={}, InvolvedObjectUID={})",
            self.uid,
            self.event_time,
            self.reporting_controller,
            self.reason,
            self.message,
            self.involved_object_name,
            self.involved_object_namespace,
            self.involved_object_uid
        )
    }
}

/// Oldest first
pub fn compare_events_by_event_time(a: &EventInfo, b: &EventInfo) -> Ordering {
    a.event_time.cmp(&b.event_time)
}
