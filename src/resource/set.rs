//! ResourceSet - all declared resources of one configuration

use super::registry::{self, get_registry, Registered};
use super::{
    Api, ApiPublication, ApiVersion, ApplicationAuthStrategy, ControlPlane, EventGateway,
    GatewayService, Portal, PortalPage, Resource, Team,
};

/// Declared resources grouped by kind, each list in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    pub portals: Vec<Portal>,
    pub portal_pages: Vec<PortalPage>,
    pub apis: Vec<Api>,
    pub api_versions: Vec<ApiVersion>,
    pub api_publications: Vec<ApiPublication>,
    pub control_planes: Vec<ControlPlane>,
    pub gateway_services: Vec<GatewayService>,
    pub application_auth_strategies: Vec<ApplicationAuthStrategy>,
    pub teams: Vec<Team>,
    pub event_gateways: Vec<EventGateway>,
    /// `_defaults.kongctl.namespace` of every loaded file that declared one
    pub default_namespaces: Vec<String>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: Registered>(&mut self, resource: T) {
        T::slice_mut(self).push(resource);
    }

    /// Every resource, kind by kind in registry order.
    pub fn all_resources(&self) -> Vec<&dyn Resource> {
        let mut all = Vec::with_capacity(self.resource_count());
        for ops in get_registry() {
            all.extend((ops.all)(self));
        }
        all
    }

    /// Visit every resource without collecting them; returns false if the visitor stopped early.
    pub fn for_each_resource(&self, mut visit: impl FnMut(&dyn Resource) -> bool) -> bool {
        get_registry()
            .iter()
            .all(|ops| (ops.for_each)(self, &mut visit))
    }

    pub fn for_each_resource_mut(
        &mut self,
        mut visit: impl FnMut(&mut dyn Resource) -> bool,
    ) -> bool {
        for ops in get_registry() {
            if !(ops.for_each_mut)(self, &mut visit) {
                return false;
            }
        }
        true
    }

    pub fn resource_count(&self) -> usize {
        get_registry().iter().map(|ops| (ops.count)(self)).sum()
    }

    pub fn is_empty(&self) -> bool {
        get_registry().iter().all(|ops| (ops.count)(self) == 0)
    }

    /// Move every resource of `other` into this set.
    pub fn append_all(&mut self, mut other: ResourceSet) {
        for ops in get_registry() {
            (ops.append)(self, &mut other);
        }
        for namespace in other.default_namespaces {
            if !self.default_namespaces.contains(&namespace) {
                self.default_namespaces.push(namespace);
            }
        }
    }

    /// Resources of a kind given by tag; `None` for unregistered tags.
    pub fn resources_by_kind(&self, kind: &str) -> Option<Vec<&dyn Resource>> {
        registry::lookup(kind).map(|ops| (ops.all)(self))
    }

    pub fn count_of(&self, kind: &str) -> Option<usize> {
        registry::lookup(kind).map(|ops| (ops.count)(self))
    }

    /// Find a resource by its (globally unique) ref.
    pub fn find_by_ref(&self, reference: &str) -> Option<&dyn Resource> {
        self.all_resources()
            .into_iter()
            .find(|r| r.reference() == reference)
    }

    pub fn find_by_ref_mut(&mut self, reference: &str) -> Option<&mut dyn Resource> {
        let kind = self.find_by_ref(reference)?.kind();
        let ops = registry::get_ops(kind)?;
        (ops.all_mut)(self)
            .into_iter()
            .find(|r| r.reference() == reference)
    }

    /// Resources that own their metadata (not children of another kind).
    pub fn parent_resources(&self) -> Vec<&dyn Resource> {
        self.all_resources()
            .into_iter()
            .filter(|r| r.kind().parent().is_none())
            .collect()
    }
}
