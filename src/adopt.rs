//! Adoption
//!
//! Brings an existing, unmanaged remote resource under namespace
//! management: resolve it by ID or name, refuse if it is already
//! namespaced, then write the merged label set in a single update.

use crate::error::{Error, Result};
use crate::identity::{RemoteMatchable, RemoteObject};
use crate::inventory::RemoteInventory;
use crate::labels::{self, Labels, NAMESPACE_KEY};
use crate::namespace::validate_namespace;
use crate::pagination::{CancelToken, Paginator, DEFAULT_PAGE_SIZE};
use crate::resource::{LookupFilter, ResourceKind};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Outcome of a successful adoption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdoptResult {
    pub resource_type: ResourceKind,
    pub id: String,
    pub name: String,
    pub namespace: String,
}

impl fmt::Display for AdoptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Adopted {} \"{}\" ({}) into namespace \"{}\"",
            self.resource_type, self.name, self.id, self.namespace
        )
    }
}

pub struct Adopter<'a> {
    inventory: &'a dyn RemoteInventory,
    page_size: usize,
    cancel: CancelToken,
}

impl<'a> Adopter<'a> {
    pub fn new(inventory: &'a dyn RemoteInventory) -> Self {
        Self {
            inventory,
            page_size: DEFAULT_PAGE_SIZE,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Adopt the resource identified by a remote ID or name into `namespace`.
    pub async fn adopt(
        &self,
        kind: ResourceKind,
        identifier: &str,
        namespace: &str,
    ) -> Result<AdoptResult> {
        validate_namespace(namespace)?;
        if let Some(parent) = kind.parent() {
            return Err(Error::config(format!(
                "{} resources cannot be adopted directly; adopt the owning {} instead",
                kind, parent
            )));
        }

        let item = self.resolve(kind, identifier).await?;
        let embedded = kind.embedded_field();
        let object = RemoteObject::with_embedded(&item, embedded);
        let id = object.id().ok_or_else(|| Error::NotFound {
            kind,
            identifier: identifier.to_string(),
        })?;
        let name = object
            .field("name")
            .unwrap_or_else(|| identifier.to_string());

        let existing = payload_labels(&item, embedded);
        if let Some(current) = labels::namespace_of(&existing) {
            return Err(Error::config(format!(
                "{} \"{}\" already has namespace label \"{}\"",
                kind, name, current
            )));
        }

        let addition: Labels = [(NAMESPACE_KEY.to_string(), namespace.to_string())].into();
        let merged = labels::merge(&existing, &addition);
        tracing::info!(
            "Adopting {} '{}' ({}) into namespace '{}' ({} existing labels)",
            kind,
            name,
            id,
            namespace,
            existing.len()
        );

        let updated = self
            .inventory
            .update(kind, &id, &json!({ "labels": merged }))
            .await
            .map_err(|e| Error::remote("update", kind, e))?;

        let updated_labels = payload_labels(&updated, embedded);
        let namespace = labels::namespace_of(&updated_labels)
            .unwrap_or(namespace)
            .to_string();

        Ok(AdoptResult {
            resource_type: kind,
            id,
            name,
            namespace,
        })
    }

    async fn resolve(&self, kind: ResourceKind, identifier: &str) -> Result<Value> {
        let not_found = || Error::NotFound {
            kind,
            identifier: identifier.to_string(),
        };

        if uuid::Uuid::parse_str(identifier).is_ok() {
            tracing::debug!("Fetching {} {} by ID", kind, identifier);
            return self
                .inventory
                .fetch(kind, None, identifier)
                .await
                .map_err(|e| Error::remote("get", kind, e))?
                .filter(|item| !is_empty_payload(item))
                .ok_or_else(not_found);
        }

        let embedded = kind.embedded_field();
        Paginator::new(self.inventory, kind, self.page_size)
            .with_filter(LookupFilter::eq("name", identifier))
            .with_cancel(self.cancel.clone())
            .find_first(|item| {
                let object = RemoteObject::with_embedded(item, embedded);
                object.id().is_some() && object.field("name").as_deref() == Some(identifier)
            })
            .await?
            .ok_or_else(not_found)
    }
}

fn payload_labels(item: &Value, embedded: Option<&'static str>) -> Labels {
    let outer = labels::from_payload(item);
    if !outer.is_empty() {
        return outer;
    }
    embedded
        .and_then(|field| item.get(field))
        .map(labels::from_payload)
        .unwrap_or_default()
}

fn is_empty_payload(item: &Value) -> bool {
    match item {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ListQuery, Page};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records updates; listings return the configured items
    #[derive(Default)]
    struct RecordingInventory {
        items: Vec<Value>,
        updates: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl RemoteInventory for RecordingInventory {
        async fn list(&self, _kind: ResourceKind, _query: &ListQuery) -> anyhow::Result<Page> {
            Ok(Page {
                items: self.items.clone(),
                next: None,
            })
        }

        async fn fetch(
            &self,
            _kind: ResourceKind,
            _parent_id: Option<&str>,
            id: &str,
        ) -> anyhow::Result<Option<Value>> {
            Ok(self.items.iter().find(|i| i["id"] == id).cloned())
        }

        async fn update(&self, _kind: ResourceKind, id: &str, fields: &Value) -> anyhow::Result<Value> {
            self.updates
                .lock()
                .unwrap()
                .push((id.to_string(), fields.clone()));
            let mut item = self
                .items
                .iter()
                .find(|i| i["id"] == id)
                .cloned()
                .unwrap_or_default();
            item["labels"] = fields["labels"].clone();
            Ok(item)
        }
    }

    #[tokio::test]
    async fn test_adopt_by_id_preserves_labels() {
        let id = "2b7c1f3e-8d4a-4c55-9e21-6f0a1b2c3d4e";
        let inventory = RecordingInventory {
            items: vec![json!({"id": id, "name": "payments", "labels": {"tier": "gold"}})],
            ..Default::default()
        };

        let result = Adopter::new(&inventory)
            .adopt(ResourceKind::Api, id, "team-alpha")
            .await
            .unwrap();

        assert_eq!(result.name, "payments");
        assert_eq!(result.namespace, "team-alpha");
        let updates = inventory.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].1,
            json!({"labels": {"tier": "gold", NAMESPACE_KEY: "team-alpha"}})
        );
    }

    #[tokio::test]
    async fn test_rejects_before_any_remote_call() {
        let inventory = RecordingInventory::default();
        let adopter = Adopter::new(&inventory);

        let err = adopter
            .adopt(ResourceKind::Portal, "dev", "Team_A")
            .await
            .unwrap_err();
        assert!(err.is_configuration(), "{err}");

        let err = adopter
            .adopt(ResourceKind::PortalPage, "home", "team-a")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("adopt the owning portal"), "{err}");

        let err = adopter
            .adopt(ResourceKind::Portal, "missing", "team-a")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(inventory.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_result_text() {
        let result = AdoptResult {
            resource_type: ResourceKind::Portal,
            id: "p-1".to_string(),
            name: "dev".to_string(),
            namespace: "team-a".to_string(),
        };
        assert_eq!(
            result.to_string(),
            "Adopted portal \"dev\" (p-1) into namespace \"team-a\""
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["resource_type"], "portal");
        assert_eq!(json["namespace"], "team-a");
    }

    #[test]
    fn test_embedded_labels_are_read() {
        let item = serde_json::json!({
            "id": "eg-1",
            "eventGatewayInfo": {"name": "events", "labels": {"tier": "gold"}}
        });
        let found = payload_labels(&item, Some("eventGatewayInfo"));
        assert_eq!(found.get("tier").map(String::as_str), Some("gold"));
    }
}
