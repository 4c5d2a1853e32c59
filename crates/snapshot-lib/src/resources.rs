//! Resource lists and request aggregation

use crate::error::Result;
use crate::quantity::Quantity;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as RawQuantity;
use std::borrow::Borrow;
use std::collections::BTreeMap;

pub const RESOURCE_CPU: &str = "cpu";
pub const RESOURCE_MEMORY: &str = "memory";
pub const RESOURCE_EPHEMERAL_STORAGE: &str = "ephemeral-storage";

/// Resource name to quantity. Always iterates in sorted name order.
pub type ResourceList = BTreeMap<String, Quantity>;

/// Parse a raw API resource map
pub fn parse_resource_list(raw: &BTreeMap<String, RawQuantity>) -> Result<ResourceList> {
    raw.iter()
        .map(|(name, q)| Ok((name.clone(), Quantity::try_from(q)?)))
        .collect()
}

/// Add `quantity` to `name` in `list`, inserting it when absent
fn accumulate(list: &mut ResourceList, name: &str, quantity: Quantity) {
    match list.get_mut(name) {
        Some(sum) => *sum += quantity,
        None => {
            list.insert(name.to_string(), quantity);
        }
    }
}

/// Sum resource lists name by name.
///
/// Names missing from an input contribute nothing, so the result holds the
/// union of names. The fold is commutative and associative.
pub fn sum_resources<I, R>(lists: I) -> ResourceList
where
    I: IntoIterator<Item = R>,
    R: Borrow<ResourceList>,
{
    let mut sum = ResourceList::new();
    for list in lists {
        for (name, quantity) in list.borrow() {
            accumulate(&mut sum, name, *quantity);
        }
    }
    sum
}

/// Sum the container requests of one pod.
///
/// Containers without a request for some resource add nothing for it. Fails
/// only when a request is not a valid quantity.
pub fn cumulate_pod_requests(pod: &Pod) -> Result<ResourceList> {
    let mut sum = ResourceList::new();
    let containers = pod.spec.iter().flat_map(|spec| spec.containers.iter());
    for container in containers {
        let requests = container
            .resources
            .as_ref()
            .and_then(|r| r.requests.as_ref());
        if let Some(requests) = requests {
            for (name, raw) in requests {
                accumulate(&mut sum, name, Quantity::try_from(raw)?);
            }
        }
    }
    Ok(sum)
}

/// Value-based equality of two resource lists
pub fn is_resource_list_equal(a: &ResourceList, b: &ResourceList) -> bool {
    a.len() == b.len() && a.iter().all(|(name, q)| b.get(name) == Some(q))
}

/// Render as `(cpu:2,memory:4Gi)`, empty for an empty list
pub fn resources_as_string(resources: &ResourceList) -> String {
    if resources.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = resources
        .iter()
        .map(|(name, q)| format!("{}:{}", name, q))
        .collect();
    format!("({})", parts.join(","))
}
