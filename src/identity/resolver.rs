//! Identity resolution
//!
//! Matching priority: direct ID for external resources, then selector
//! for external resources, then moniker equality for managed ones. A
//! candidate without an ID never matches.

use super::matchable::{RemoteMatchable, RemoteObject};
use crate::error::{Error, Result};
use crate::inventory::RemoteInventory;
use crate::pagination::{CancelToken, Paginator, DEFAULT_PAGE_SIZE};
use crate::resource::{is_remote_id, Resource, ResourceKind, ResourceRef, ResourceSet};
use serde::Serialize;
use std::ops::ControlFlow;

/// Remote ID of `candidate` if it is the counterpart of `resource`.
pub fn match_candidate<R>(resource: &R, candidate: &dyn RemoteMatchable) -> Option<String>
where
    R: Resource + ?Sized,
{
    let id = candidate.id()?;
    let matched = match resource.external() {
        Some(external) => match (&external.id, &external.selector) {
            (Some(expected), _) => *expected == id,
            (None, Some(selector)) => selector.matches(candidate),
            (None, None) => false,
        },
        None => {
            candidate.field(resource.moniker_field()).as_deref() == Some(resource.moniker().as_str())
        }
    };
    matched.then_some(id)
}

/// What to do when more than one remote object matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Accept the first match in listing order
    #[default]
    FirstMatch,
    /// Scan everything and reject more than one match
    Strict,
}

/// Outcome of resolving one resource of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub resource: ResourceRef,
    pub remote_id: Option<String>,
}

/// Resolves declared resources against the remote inventory.
pub struct Resolver<'a> {
    inventory: &'a dyn RemoteInventory,
    page_size: usize,
    policy: MatchPolicy,
    cancel: CancelToken,
}

impl<'a> Resolver<'a> {
    pub fn new(inventory: &'a dyn RemoteInventory) -> Self {
        Self {
            inventory,
            page_size: DEFAULT_PAGE_SIZE,
            policy: MatchPolicy::default(),
            cancel: CancelToken::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve one resource, recording the remote ID on it.
    ///
    /// `Ok(None)` means the remote has no counterpart.
    pub async fn resolve(
        &self,
        resource: &mut dyn Resource,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        let kind = resource.kind();

        if let Some(id) = resource.external().and_then(|e| e.id.clone()) {
            tracing::debug!("Fetching external {} '{}' by ID {}", kind, resource.reference(), id);
            let item = self
                .inventory
                .fetch(kind, parent_id, &id)
                .await
                .map_err(|e| Error::remote("get", kind, e))?;
            let Some(item) = item else {
                return Ok(None);
            };
            let object = RemoteObject::with_embedded(&item, kind.embedded_field());
            return Ok(resource.try_match(&object).then_some(id));
        }

        let mut paginator = Paginator::new(self.inventory, kind, self.page_size)
            .with_cancel(self.cancel.clone());
        if !resource.is_external() {
            if let Some(filter) = resource.remote_lookup_filter() {
                paginator = paginator.with_filter(filter);
            }
        }
        if let Some(parent_id) = parent_id {
            paginator = paginator.with_parent(parent_id);
        }

        let embedded = kind.embedded_field();
        let candidate = &*resource;
        let mut matches: Vec<String> = Vec::new();
        let policy = self.policy;
        paginator
            .scan(|item| {
                match match_candidate(candidate, &RemoteObject::with_embedded(item, embedded)) {
                    Some(id) => {
                        matches.push(id);
                        if policy == MatchPolicy::FirstMatch {
                            ControlFlow::Break(())
                        } else {
                            ControlFlow::Continue(())
                        }
                    }
                    None => ControlFlow::Continue(()),
                }
            })
            .await?;

        if matches.len() > 1 {
            return Err(Error::Ambiguous {
                kind,
                identifier: resource.moniker(),
                count: matches.len(),
            });
        }

        let matched = matches.pop();
        match &matched {
            Some(id) => {
                tracing::info!("Resolved {} '{}' to {}", kind, resource.reference(), id);
                resource.set_resolved_remote_id(id.clone());
            }
            None => tracing::debug!("No remote {} matches '{}'", kind, resource.moniker()),
        }
        Ok(matched)
    }

    /// Like `resolve`, but a missing counterpart is an error.
    pub async fn require(
        &self,
        resource: &mut dyn Resource,
        parent_id: Option<&str>,
    ) -> Result<String> {
        match self.resolve(resource, parent_id).await? {
            Some(id) => Ok(id),
            None => Err(Error::NotFound {
                kind: resource.kind(),
                identifier: resource
                    .external()
                    .and_then(|e| e.id.clone())
                    .unwrap_or_else(|| resource.moniker()),
            }),
        }
    }

    /// Resolve resources one at a time in the given order.
    ///
    /// Parents must precede children in `order`; a child whose parent has
    /// no remote counterpart cannot exist remotely and is skipped.
    pub async fn resolve_set(
        &self,
        set: &mut ResourceSet,
        order: &[ResourceRef],
    ) -> Result<Vec<Resolution>> {
        let mut resolutions = Vec::with_capacity(order.len());

        for target in order {
            let Some(resource) = set.find_by_ref(&target.reference) else {
                continue;
            };

            let parent_id = match resource.parent_ref() {
                Some(parent) => match remote_id_of(set, &parent.reference) {
                    Some(id) => Some(id),
                    None => {
                        tracing::debug!(
                            "Skipping {}: parent {} has no remote counterpart",
                            target,
                            parent
                        );
                        resolutions.push(Resolution {
                            resource: target.clone(),
                            remote_id: None,
                        });
                        continue;
                    }
                },
                None => None,
            };

            let bindings: Vec<(ResourceKind, String, String)> = resource
                .reference_fields()
                .into_iter()
                .filter_map(|field| {
                    let id = remote_id_of(set, &field.value)?;
                    Some((field.target, field.value, id))
                })
                .collect();

            let Some(resource) = set.find_by_ref_mut(&target.reference) else {
                continue;
            };
            resource.bind_remote_references(&bindings);
            let remote_id = self.resolve(resource, parent_id.as_deref()).await?;
            resolutions.push(Resolution {
                resource: target.clone(),
                remote_id,
            });
        }

        Ok(resolutions)
    }
}

/// Remote ID behind a ref value, or the value itself if it already is one.
fn remote_id_of(set: &ResourceSet, value: &str) -> Option<String> {
    if is_remote_id(value) {
        return Some(value.to_string());
    }
    set.find_by_ref(value)
        .and_then(|r| r.resolved_remote_id())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ListQuery, Page};
    use crate::resource::{Common, EventGateway, ExternalBlock, Portal};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One page of fixed items; counts list calls
    struct FixedInventory {
        items: Vec<Value>,
        lists: AtomicUsize,
    }

    impl FixedInventory {
        fn new(items: Vec<Value>) -> Self {
            Self {
                items,
                lists: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteInventory for FixedInventory {
        async fn list(&self, _kind: ResourceKind, _query: &ListQuery) -> anyhow::Result<Page> {
            self.lists.fetch_add(1, Ordering::SeqCst);
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

        async fn update(&self, _kind: ResourceKind, _id: &str, fields: &Value) -> anyhow::Result<Value> {
            Ok(fields.clone())
        }
    }

    fn duplicates() -> FixedInventory {
        FixedInventory::new(vec![
            json!({"id": "p-1", "name": "dev"}),
            json!({"id": "p-2", "name": "dev"}),
        ])
    }

    fn external_portal(external: ExternalBlock) -> Portal {
        Portal {
            common: Common {
                reference: "shared".to_string(),
                external: Some(external),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_name_match_requires_id() {
        let mut portal = Portal::new("dev");
        portal.set_defaults();

        let no_id = json!({"name": "dev"});
        assert_eq!(match_candidate(&portal, &RemoteObject::new(&no_id)), None);

        let empty_id = json!({"id": "", "name": "dev"});
        assert_eq!(match_candidate(&portal, &RemoteObject::new(&empty_id)), None);

        let good = json!({"id": "p-1", "name": "dev"});
        assert_eq!(
            match_candidate(&portal, &RemoteObject::new(&good)).as_deref(),
            Some("p-1")
        );
    }

    #[test]
    fn test_direct_id_ignores_name() {
        let portal = external_portal(ExternalBlock::by_id("p-42"));
        let candidate = json!({"id": "p-42", "name": "something-else"});
        assert_eq!(
            match_candidate(&portal, &RemoteObject::new(&candidate)).as_deref(),
            Some("p-42")
        );

        let other = json!({"id": "p-43", "name": "shared"});
        assert_eq!(match_candidate(&portal, &RemoteObject::new(&other)), None);
    }

    #[test]
    fn test_selector_match() {
        let portal = external_portal(ExternalBlock::by_selector([("name", "x"), ("env", "y")]));
        let wrong = json!({"id": "1", "name": "x", "env": "z"});
        let right = json!({"id": "1", "name": "x", "env": "y"});
        assert_eq!(match_candidate(&portal, &RemoteObject::new(&wrong)), None);
        assert!(match_candidate(&portal, &RemoteObject::new(&right)).is_some());
    }

    #[test]
    fn test_try_match_records_id() {
        let mut gateway = EventGateway {
            common: Common::new("events"),
            ..Default::default()
        };
        gateway.set_defaults();
        let candidate = json!({"id": "eg-1", "eventGatewayInfo": {"name": "events"}});
        let object = RemoteObject::with_embedded(&candidate, ResourceKind::EventGateway.embedded_field());

        assert!(gateway.try_match(&object));
        assert_eq!(gateway.resolved_remote_id(), Some("eg-1"));
    }

    #[tokio::test]
    async fn test_first_match_takes_listing_order() {
        let inventory = duplicates();
        let mut portal = Portal::new("dev");
        portal.set_defaults();

        let id = Resolver::new(&inventory).resolve(&mut portal, None).await.unwrap();
        assert_eq!(id.as_deref(), Some("p-1"));
        assert_eq!(portal.resolved_remote_id(), Some("p-1"));
    }

    #[tokio::test]
    async fn test_strict_rejects_multiple_matches() {
        let inventory = duplicates();
        let mut portal = Portal::new("dev");
        portal.set_defaults();

        let err = Resolver::new(&inventory)
            .with_policy(MatchPolicy::Strict)
            .resolve(&mut portal, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ambiguous { count: 2, .. }), "{err}");
        assert_eq!(portal.resolved_remote_id(), None);
    }

    #[tokio::test]
    async fn test_external_id_uses_fetch() {
        let inventory = duplicates();
        let mut portal = external_portal(ExternalBlock::by_id("p-2"));

        let id = Resolver::new(&inventory).require(&mut portal, None).await.unwrap();
        assert_eq!(id, "p-2");
        assert_eq!(inventory.lists.load(Ordering::SeqCst), 0);

        let mut missing = external_portal(ExternalBlock::by_id("p-9"));
        let err = Resolver::new(&inventory)
            .require(&mut missing, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }
}
