//! Canonical hashing engine
//!
//! Primitives that feed entity fields into a streaming digest in a fixed,
//! order-normalized way. Every entity hash is built from these:
//! - strings are written as raw bytes, with no length prefix or separator
//! - maps are written key then value, keys in sorted order
//! - integers are written as 8 byte big-endian
//! - durations are written as whole milliseconds
//! - bools are one byte, `1` for true and `0` for false
//! - optional fields are written only when present
//!
//! The digest is SHA-256, rendered as lowercase hex.

use crate::quantity::Quantity;
use crate::resources::ResourceList;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Taint;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

/// Start a new digest
pub fn new_hasher() -> Sha256 {
    Sha256::new()
}

/// Finish a digest as lowercase hex
pub fn finish<D: Digest>(hasher: D) -> String {
    hex::encode(hasher.finalize())
}

pub fn hash_str<D: Digest>(hasher: &mut D, value: &str) {
    hasher.update(value.as_bytes());
}

/// Write `value` only when present; absence writes nothing
pub fn hash_opt_str<D: Digest>(hasher: &mut D, value: Option<&str>) {
    if let Some(v) = value {
        hasher.update(v.as_bytes());
    }
}

/// Write every element in order
pub fn hash_slice<D: Digest, S: AsRef<str>>(hasher: &mut D, values: &[S]) {
    for v in values {
        hasher.update(v.as_ref().as_bytes());
    }
}

/// Write key/value pairs in sorted key order
pub fn hash_labels<D: Digest>(hasher: &mut D, labels: &BTreeMap<String, String>) {
    for (k, v) in labels {
        hasher.update(k.as_bytes());
        hasher.update(v.as_bytes());
    }
}

pub fn bool_to_bytes(value: bool) -> [u8; 1] {
    [u8::from(value)]
}

pub fn hash_bool<D: Digest>(hasher: &mut D, value: bool) {
    hasher.update(bool_to_bytes(value));
}

pub fn hash_int<D: Digest>(hasher: &mut D, value: i64) {
    hasher.update(value.to_be_bytes());
}

pub fn hash_i32<D: Digest>(hasher: &mut D, value: i32) {
    hasher.update(value.to_be_bytes());
}

pub fn hash_duration<D: Digest>(hasher: &mut D, value: Duration) {
    hash_int(hasher, i64::try_from(value.as_millis()).unwrap_or(i64::MAX));
}

pub fn hash_timestamp<D: Digest>(hasher: &mut D, value: &DateTime<Utc>) {
    hash_int(hasher, value.timestamp_millis());
}

pub fn hash_int_or_string<D: Digest>(hasher: &mut D, value: &IntOrString) {
    match value {
        IntOrString::Int(i) => hasher.update(i.to_string().as_bytes()),
        IntOrString::String(s) => hasher.update(s.as_bytes()),
    }
}

/// Write a resource name followed by the quantity's canonical bytes
pub fn hash_resource<D: Digest>(hasher: &mut D, name: &str, quantity: &Quantity) {
    hasher.update(name.as_bytes());
    hasher.update(quantity.canonical_bytes());
}

/// Write every resource in sorted name order
pub fn hash_resources<D: Digest>(hasher: &mut D, resources: &ResourceList) {
    for (name, quantity) in resources {
        hash_resource(hasher, name, quantity);
    }
}

/// Write taints after sorting them by key, effect and value, so the order the
/// API returned them in does not matter.
pub fn hash_taints<D: Digest>(hasher: &mut D, taints: &[Taint]) {
    let mut sorted: Vec<&Taint> = taints.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.key, &a.effect, &a.value).cmp(&(&b.key, &b.effect, &b.value))
    });
    for t in sorted {
        hasher.update(t.key.as_bytes());
        hash_opt_str(hasher, t.value.as_deref());
        hasher.update(t.effect.as_bytes());
    }
}

/// A snapshot entity that carries its own content hash.
///
/// Two snapshots of the same type are semantically equal iff their hashes
/// match; this is the only equality used for change detection.
pub trait Snapshot {
    /// Hash the entity's content from scratch
    fn compute_hash(&self) -> String;

    /// Hash currently stored on the entity, empty if never computed
    fn stored_hash(&self) -> &str;

    fn set_stored_hash(&mut self, hash: String);

    /// Recompute and store the hash
    fn rehash(&mut self) {
        let hash = self.compute_hash();
        self.set_stored_hash(hash);
    }

    /// Stored hash, or a freshly computed one when nothing is stored.
    ///
    /// Composite entities fold in their children through this, so a child
    /// hashed once is never hashed again.
    fn effective_hash(&self) -> Cow<'_, str> {
        let stored = self.stored_hash();
        if stored.is_empty() {
            Cow::Owned(self.compute_hash())
        } else {
            Cow::Borrowed(stored)
        }
    }

    /// Hash-based equality
    fn is_same(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.effective_hash() == other.effective_hash()
    }
}

/// Return `entity` with its hash populated
pub fn hashed<T: Snapshot>(mut entity: T) -> T {
    entity.rehash();
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::must_parse_quantity;

    fn digest(f: impl FnOnce(&mut Sha256)) -> String {
        let mut h = new_hasher();
        f(&mut h);
        finish(h)
    }

    fn taint(key: &str, value: Option<&str>, effect: &str) -> Taint {
        Taint {
            key: key.to_string(),
            value: value.map(str::to_string),
            effect: effect.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_digest_is_lowercase_hex_sha256() {
        let h = digest(|h| hash_str(h, "abc"));
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_labels_ignore_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("zone".to_string(), "a".to_string());
        a.insert("arch".to_string(), "amd64".to_string());
        let mut b = BTreeMap::new();
        b.insert("arch".to_string(), "amd64".to_string());
        b.insert("zone".to_string(), "a".to_string());
        assert_eq!(digest(|h| hash_labels(h, &a)), digest(|h| hash_labels(h, &b)));
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(bool_to_bytes(true), [1]);
        assert_eq!(bool_to_bytes(false), [0]);
        assert_eq!(digest(|h| hash_bool(h, true)), digest(|h| h.update([1u8])));
        assert_eq!(digest(|h| hash_bool(h, false)), digest(|h| h.update([0u8])));
    }

    #[test]
    fn test_absent_optional_writes_nothing() {
        assert_eq!(digest(|h| hash_opt_str(h, None)), digest(|_| {}));
        assert_ne!(digest(|h| hash_opt_str(h, Some("x"))), digest(|_| {}));
    }

    #[test]
    fn test_taints_are_order_insensitive() {
        let a = vec![
            taint("dedicated", Some("gpu"), "NoSchedule"),
            taint("spot", None, "NoExecute"),
        ];
        let b = vec![a[1].clone(), a[0].clone()];
        assert_eq!(digest(|h| hash_taints(h, &a)), digest(|h| hash_taints(h, &b)));
    }

    #[test]
    fn test_taint_value_changes_digest() {
        let a = vec![taint("dedicated", Some("gpu"), "NoSchedule")];
        let b = vec![taint("dedicated", Some("cpu"), "NoSchedule")];
        assert_ne!(digest(|h| hash_taints(h, &a)), digest(|h| hash_taints(h, &b)));
    }

    #[test]
    fn test_equivalent_quantities_hash_identically() {
        let mut a = ResourceList::new();
        a.insert("memory".to_string(), must_parse_quantity("1024Mi"));
        let mut b = ResourceList::new();
        b.insert("memory".to_string(), must_parse_quantity("1073741824"));
        assert_eq!(digest(|h| hash_resources(h, &a)), digest(|h| hash_resources(h, &b)));
    }

    #[test]
    fn test_int_or_string_uses_text_form() {
        assert_eq!(
            digest(|h| hash_int_or_string(h, &IntOrString::Int(25))),
            digest(|h| hash_str(h, "25"))
        );
        assert_eq!(
            digest(|h| hash_int_or_string(h, &IntOrString::String("25%".into()))),
            digest(|h| hash_str(h, "25%"))
        );
    }

    #[test]
    fn test_duration_hashes_millis() {
        assert_eq!(
            digest(|h| hash_duration(h, Duration::from_secs(2))),
            digest(|h| hash_int(h, 2000))
        );
    }
}
