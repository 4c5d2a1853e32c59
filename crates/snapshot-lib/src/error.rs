//! Error types for the snapshot library

use thiserror::Error;

/// Errors raised while building or validating snapshot state.
///
/// Hashing and resource aggregation never fail; every variant here comes from
/// parsing untrusted input or from a consistency check on assembled entities.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot parse quantity {input:?}: {reason}")]
    InvalidQuantity { input: String, reason: String },

    #[error("key not found under path {path:?}")]
    KeyNotFound { path: Vec<String> },

    #[error("value under path {path:?} is not a nested mapping")]
    NotAMap { path: Vec<String> },

    #[error("cannot parse value {value} as {target}")]
    UnparseableValue { value: String, target: &'static str },

    #[error("no nodegroup with the name {0}")]
    UnknownNodeGroup(String),

    #[error("snapshot timestamp {snapshot} of {name} precedes creation timestamp {creation}")]
    InvalidTimestamps {
        name: String,
        creation: String,
        snapshot: String,
    },

    #[error("listing failed after {pages} page(s): {source}")]
    Listing {
        pages: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl SnapshotError {
    pub(crate) fn invalid_quantity(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
