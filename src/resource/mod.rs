//! Resource Module
//!
//! Declared resource kinds, the capability trait they share, and the
//! type-erased `ResourceSet` that holds a loaded configuration.

mod api;
mod auth_strategy;
mod control_plane;
mod event_gateway;
pub mod external;
pub mod kind;
pub mod meta;
mod portal;
pub mod registry;
mod set;
mod team;

pub use api::{Api, ApiPublication, ApiVersion};
pub use auth_strategy::ApplicationAuthStrategy;
pub use control_plane::{ControlPlane, GatewayService};
pub use event_gateway::EventGateway;
pub use external::{ExternalBlock, Selector, SelectorPolicy};
pub use kind::{PaginationStyle, ResourceKind};
pub use meta::{validate_ref, Common, KongctlMeta, Origin, ResourceRef};
pub use portal::{Portal, PortalPage};
pub use set::ResourceSet;
pub use team::Team;

use crate::error::{Error, Result};
use crate::identity::{self, RemoteMatchable};
use std::fmt;

/// A field on a resource that points at another declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceField {
    pub field: &'static str,
    pub target: ResourceKind,
    pub value: String,
}

impl ReferenceField {
    pub fn new(field: &'static str, target: ResourceKind, value: impl Into<String>) -> Self {
        Self {
            field,
            target,
            value: value.into(),
        }
    }
}

/// Server-side filter used to narrow a name lookup, e.g. `name[eq]=billing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFilter {
    pub field: &'static str,
    pub value: String,
}

impl LookupFilter {
    pub fn eq(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl fmt::Display for LookupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[eq]={}", self.field, self.value)
    }
}

/// Values that are already remote IDs rather than refs.
pub fn is_remote_id(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// Capabilities every declared resource exposes.
pub trait Resource: fmt::Debug + Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn common(&self) -> &Common;

    fn common_mut(&mut self) -> &mut Common;

    /// Human-facing identifier used for display and name matching.
    fn moniker(&self) -> String;

    /// Remote field compared against the moniker.
    fn moniker_field(&self) -> &'static str {
        "name"
    }

    fn parent_ref(&self) -> Option<ResourceRef> {
        None
    }

    fn reference_fields(&self) -> Vec<ReferenceField> {
        Vec::new()
    }

    /// Parent first, then referenced resources; remote IDs and duplicates are dropped.
    fn dependencies(&self) -> Vec<ResourceRef> {
        let mut deps: Vec<ResourceRef> = self.parent_ref().into_iter().collect();
        for field in self.reference_fields() {
            if field.value.is_empty() || is_remote_id(&field.value) {
                continue;
            }
            let dep = ResourceRef::new(field.target, field.value);
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }

    fn validate(&self) -> Result<()>;

    fn set_defaults(&mut self) {}

    fn remote_lookup_filter(&self) -> Option<LookupFilter> {
        None
    }

    /// Receive remote IDs of referenced resources as `(kind, ref, remote_id)`.
    fn bind_remote_references(&mut self, _bindings: &[(ResourceKind, String, String)]) {}

    fn reference(&self) -> &str {
        &self.common().reference
    }

    fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(self.kind(), self.reference())
    }

    fn meta(&self) -> Option<&KongctlMeta> {
        self.common().kongctl.as_ref()
    }

    fn external(&self) -> Option<&ExternalBlock> {
        self.common().external.as_ref()
    }

    fn is_external(&self) -> bool {
        self.external().is_some()
    }

    fn resolved_remote_id(&self) -> Option<&str> {
        self.common().remote_id.as_deref()
    }

    fn set_resolved_remote_id(&mut self, id: String) {
        self.common_mut().remote_id = Some(id);
    }

    /// Record the candidate's ID if it is this resource's remote counterpart.
    fn try_match(&mut self, candidate: &dyn RemoteMatchable) -> bool {
        match identity::match_candidate(&*self, candidate) {
            Some(id) => {
                self.set_resolved_remote_id(id);
                true
            }
            None => false,
        }
    }
}

/// Checks shared by every kind: ref syntax and `_external` consistency.
pub(crate) fn validate_common(resource: &dyn Resource) -> Result<()> {
    let kind = resource.kind();
    validate_ref(resource.reference())
        .map_err(|e| Error::config(format!("invalid {} ref: {}", kind, e)))?;

    if let Some(external) = resource.external() {
        external.validate().map_err(|e| match e {
            Error::AmbiguousMetadata(msg) => {
                Error::AmbiguousMetadata(format!("{} '{}': {}", kind, resource.reference(), msg))
            }
            other => Error::config(format!("{} '{}': {}", kind, resource.reference(), other)),
        })?;
        if resource.meta().is_some() {
            return Err(Error::AmbiguousMetadata(format!(
                "{} '{}' is marked as external and cannot use kongctl metadata",
                kind,
                resource.reference()
            )));
        }
    }
    Ok(())
}

pub(crate) fn require_non_empty(
    kind: ResourceKind,
    reference: &str,
    field: &str,
    value: Option<&str>,
) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(Error::config(format!(
            "{} '{}' must specify {}",
            kind, reference, field
        ))),
    }
}
