//! Lookups in loosely typed configuration documents
//!
//! Shoot specs and machine deployments are often read as untyped JSON. These
//! helpers walk a key path through nested objects and convert leaf values.

use crate::error::{Result, SnapshotError};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::{Map, Value};

/// Labels that carry a node's zone, in lookup order
pub const ZONE_LABELS: &[&str] = &["topology.gke.io/zone", "topology.ebs.csi.aws.com/zone"];

/// Walk `keys` through nested objects and return the object at the end
pub fn get_inner_map<'a>(parent: &'a Map<String, Value>, keys: &[&str]) -> Result<&'a Map<String, Value>> {
    let mut path = Vec::with_capacity(keys.len());
    let mut current = parent;
    for key in keys {
        path.push(key.to_string());
        let child = current
            .get(*key)
            .ok_or_else(|| SnapshotError::KeyNotFound { path: path.clone() })?;
        current = child
            .as_object()
            .ok_or_else(|| SnapshotError::NotAMap { path: path.clone() })?;
    }
    Ok(current)
}

/// Value under the last of `keys`, walking the others as nested objects
pub fn get_inner_map_value<'a>(parent: &'a Map<String, Value>, keys: &[&str]) -> Result<&'a Value> {
    let Some((last, parents)) = keys.split_last() else {
        return Err(SnapshotError::KeyNotFound { path: Vec::new() });
    };
    let map = get_inner_map(parent, parents)?;
    map.get(*last).ok_or_else(|| SnapshotError::KeyNotFound {
        path: keys.iter().map(|k| k.to_string()).collect(),
    })
}

/// Read an int-or-string leaf such as `maxSurge: 1` or `maxSurge: "25%"`
pub fn as_int_or_string(value: &Value) -> Result<IntOrString> {
    let unparseable = || SnapshotError::UnparseableValue {
        value: value.to_string(),
        target: "IntOrString",
    };
    match value {
        Value::String(s) => Ok(IntOrString::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(IntOrString::Int)
            .ok_or_else(unparseable),
        _ => Err(unparseable()),
    }
}

/// Zone from the first zone label present, empty when none is
pub fn get_zone(labels: &Map<String, Value>) -> String {
    ZONE_LABELS
        .iter()
        .find_map(|label| labels.get(*label).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}
