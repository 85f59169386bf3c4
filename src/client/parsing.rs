//! Conversions between `key=value` strings and upstream label, taint and tag structs.
//!
//! The resource stores labels, taints and tags as `key=value` strings. Only the
//! first `=` separates key from value, and entries without one are dropped
//! when building upstream requests.

use super::types::{Label, RemoteDisk, Tag, TagSpecification, Taint};
use crate::crd::{DataDisk, SystemDisk};

/// Resource type used for cluster tag specifications.
pub const RESOURCE_TYPE_CLUSTER: &str = "cluster";

/// Split `key=value` on the first `=`.
pub fn split_pair(entry: &str) -> Option<(&str, &str)> {
    entry.split_once('=')
}

fn join_pair(key: Option<&str>, value: Option<&str>) -> String {
    format!("{}={}", key.unwrap_or_default(), value.unwrap_or_default())
}

pub fn labels_to_strings(labels: &[Label]) -> Vec<String> {
    labels
        .iter()
        .map(|l| join_pair(l.name.as_deref(), l.value.as_deref()))
        .collect()
}

pub fn strings_to_labels(entries: &[String]) -> Vec<Label> {
    entries
        .iter()
        .filter_map(|e| split_pair(e))
        .map(|(name, value)| Label {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
        })
        .collect()
}

pub fn taints_to_strings(taints: &[Taint]) -> Vec<String> {
    taints
        .iter()
        .map(|t| join_pair(t.key.as_deref(), t.value.as_deref()))
        .collect()
}

pub fn strings_to_taints(entries: &[String]) -> Vec<Taint> {
    entries
        .iter()
        .filter_map(|e| split_pair(e))
        .map(|(key, value)| Taint {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            effect: None,
        })
        .collect()
}

pub fn tags_to_strings(tags: &[Tag]) -> Vec<String> {
    tags.iter()
        .map(|t| join_pair(t.key.as_deref(), t.value.as_deref()))
        .collect()
}

pub fn strings_to_tags(entries: &[String]) -> Vec<Tag> {
    entries
        .iter()
        .filter_map(|e| split_pair(e))
        .map(|(key, value)| Tag {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        })
        .collect()
}

/// Cluster tags from the `cluster` tag specification only.
pub fn tag_specifications_to_strings(specs: &[TagSpecification]) -> Vec<String> {
    specs
        .iter()
        .filter(|s| s.resource_type.as_deref() == Some(RESOURCE_TYPE_CLUSTER))
        .flat_map(|s| tags_to_strings(s.tags.as_deref().unwrap_or_default()))
        .collect()
}

/// One `cluster` tag specification, or none when there are no usable tags.
pub fn strings_to_tag_specifications(entries: &[String]) -> Vec<TagSpecification> {
    let tags = strings_to_tags(entries);
    if tags.is_empty() {
        return Vec::new();
    }
    vec![TagSpecification {
        resource_type: Some(RESOURCE_TYPE_CLUSTER.to_string()),
        tags: Some(tags),
    }]
}

/// Copy an upstream ID list, sorted.
pub fn sorted_ids(ids: Option<&[String]>) -> Vec<String> {
    let mut ids = ids.map(<[String]>::to_vec).unwrap_or_default();
    ids.sort();
    ids
}

/// Compare two `key=value` lists ignoring order.
pub fn same_pairs(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

pub fn system_disk_from_remote(disk: Option<&RemoteDisk>) -> SystemDisk {
    disk.map(|d| SystemDisk {
        disk_type: d.disk_type.clone().unwrap_or_default(),
        disk_size: d.disk_size.unwrap_or_default(),
    })
    .unwrap_or_default()
}

pub fn data_disks_from_remote(disks: Option<&[RemoteDisk]>) -> Vec<DataDisk> {
    disks
        .unwrap_or_default()
        .iter()
        .map(|d| DataDisk {
            disk_type: d.disk_type.clone().unwrap_or_default(),
            disk_size: d.disk_size.unwrap_or_default(),
        })
        .collect()
}
