//! Labels
//!
//! Ownership and protection are stored on remote objects as labels with
//! reserved `KONGCTL-` keys. Mutations always merge into the existing
//! label map.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const LABEL_PREFIX: &str = "KONGCTL-";
pub const NAMESPACE_KEY: &str = "KONGCTL-namespace";
pub const PROTECTED_KEY: &str = "KONGCTL-protected";
pub const MANAGED_KEY: &str = "KONGCTL-managed";
pub const LAST_UPDATED_KEY: &str = "KONGCTL-last-updated";

pub const TRUE_VALUE: &str = "true";
pub const FALSE_VALUE: &str = "false";

const MAX_LABEL_LENGTH: usize = 63;
const FORBIDDEN_PREFIXES: &[&str] = &["kong", "konnect", "mesh", "kic", "_"];

pub type Labels = BTreeMap<String, String>;

/// Read a label map from a remote payload's `labels` field.
pub fn from_payload(item: &Value) -> Labels {
    item.get("labels")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Existing labels with `additions` layered on top.
pub fn merge(existing: &Labels, additions: &Labels) -> Labels {
    let mut merged = existing.clone();
    merged.extend(additions.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

pub fn namespace_of(labels: &Labels) -> Option<&str> {
    labels
        .get(NAMESPACE_KEY)
        .map(String::as_str)
        .filter(|ns| !ns.is_empty())
}

pub fn is_protected(labels: &Labels) -> bool {
    labels.get(PROTECTED_KEY).map(String::as_str) == Some(TRUE_VALUE)
}

pub fn is_managed(labels: &Labels) -> bool {
    labels.get(MANAGED_KEY).map(String::as_str) == Some(TRUE_VALUE)
}

/// Drop reserved keys, leaving only user labels.
pub fn user_labels(labels: &Labels) -> Labels {
    labels
        .iter()
        .filter(|(k, _)| !k.starts_with(LABEL_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Validate a user label key.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_LABEL_LENGTH {
        return Err(Error::config(format!(
            "label key '{}' must be between 1 and {} characters",
            key, MAX_LABEL_LENGTH
        )));
    }
    if key.starts_with(LABEL_PREFIX) {
        return Ok(());
    }
    let lower = key.to_lowercase();
    if let Some(prefix) = FORBIDDEN_PREFIXES.iter().find(|p| lower.starts_with(*p)) {
        return Err(Error::config(format!(
            "label key '{}' cannot start with '{}'",
            key, prefix
        )));
    }
    Ok(())
}

pub fn validate_labels(labels: &Labels) -> Result<()> {
    for (key, value) in labels {
        validate_key(key)?;
        if value.len() > MAX_LABEL_LENGTH {
            return Err(Error::config(format!(
                "label '{}' value must be at most {} characters",
                key, MAX_LABEL_LENGTH
            )));
        }
    }
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y%m%d-%H%M%SZ").to_string()
}

/// Labels for a newly created managed resource.
pub fn build_create_labels(user: &Labels, namespace: &str, protected: bool) -> Labels {
    let mut labels = user_labels(user);
    labels.insert(MANAGED_KEY.to_string(), TRUE_VALUE.to_string());
    labels.insert(LAST_UPDATED_KEY.to_string(), timestamp());
    labels.insert(NAMESPACE_KEY.to_string(), namespace.to_string());
    let protected = if protected { TRUE_VALUE } else { FALSE_VALUE };
    labels.insert(PROTECTED_KEY.to_string(), protected.to_string());
    labels
}

/// Label patch for an update: desired labels plus `null` for user keys
/// that exist remotely but are no longer declared.
pub fn build_update_labels(
    desired: &Labels,
    current: &Labels,
    namespace: &str,
    protected: bool,
) -> Map<String, Value> {
    let mut patch: Map<String, Value> = build_create_labels(desired, namespace, protected)
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    for key in current.keys() {
        if !key.starts_with(LABEL_PREFIX) && !desired.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    patch
}
