//! Control planes and gateway services

use super::registry::Registered;
use super::{
    require_non_empty, validate_common, Common, LookupFilter, Resource, ResourceKind,
    ResourceRef, ResourceSet,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

const CLUSTER_TYPE_GROUP: &str = "CLUSTER_TYPE_CONTROL_PLANE_GROUP";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlPlane {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cluster_type: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub gateway_services: Vec<GatewayService>,
}

impl ControlPlane {
    pub fn is_group(&self) -> bool {
        self.cluster_type.as_deref() == Some(CLUSTER_TYPE_GROUP)
    }
}

impl Resource for ControlPlane {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ControlPlane
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn moniker(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.common.reference.clone())
    }

    fn validate(&self) -> Result<()> {
        validate_common(self)?;
        if !self.is_external() {
            require_non_empty(self.kind(), self.reference(), "a name", self.name.as_deref())?;
        }
        if self.is_group() && !self.gateway_services.is_empty() {
            return Err(Error::config(format!(
                "control plane group '{}' cannot define gateway_services",
                self.reference()
            )));
        }
        Ok(())
    }

    fn set_defaults(&mut self) {
        if self.name.is_none() {
            self.name = Some(self.common.reference.clone());
        }
    }

    fn remote_lookup_filter(&self) -> Option<LookupFilter> {
        Some(LookupFilter::eq("name", self.moniker()))
    }
}

impl Registered for ControlPlane {
    const KIND: ResourceKind = ResourceKind::ControlPlane;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.control_planes
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.control_planes
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayService {
    #[serde(flatten)]
    pub common: Common,
    /// Owning control plane ref; set by the loader for nested services
    #[serde(default)]
    pub control_plane: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl Resource for GatewayService {
    fn kind(&self) -> ResourceKind {
        ResourceKind::GatewayService
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn moniker(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.common.reference.clone())
    }

    fn parent_ref(&self) -> Option<ResourceRef> {
        self.control_plane
            .as_ref()
            .map(|cp| ResourceRef::new(ResourceKind::ControlPlane, cp.clone()))
    }

    fn validate(&self) -> Result<()> {
        validate_common(self)?;
        require_non_empty(
            self.kind(),
            self.reference(),
            "a control_plane",
            self.control_plane.as_deref(),
        )?;
        if !self.is_external() {
            require_non_empty(self.kind(), self.reference(), "a host", self.host.as_deref())?;
        }
        Ok(())
    }

    fn set_defaults(&mut self) {
        if self.name.is_none() {
            self.name = Some(self.common.reference.clone());
        }
    }
}

impl Registered for GatewayService {
    const KIND: ResourceKind = ResourceKind::GatewayService;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.gateway_services
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.gateway_services
    }
}
