//! Event gateways
//!
//! Listed through cursor pagination; list payloads wrap the gateway in
//! an `eventGatewayInfo` object, so name matching falls back to it.

use super::registry::Registered;
use super::{require_non_empty, validate_common, Common, Resource, ResourceKind, ResourceSet};
use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventGateway {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Resource for EventGateway {
    fn kind(&self) -> ResourceKind {
        ResourceKind::EventGateway
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
        if self.is_external() {
            return Ok(());
        }
        require_non_empty(self.kind(), self.reference(), "a name", self.name.as_deref())
    }

    fn set_defaults(&mut self) {
        if self.name.is_none() {
            self.name = Some(self.common.reference.clone());
        }
    }
}

impl Registered for EventGateway {
    const KIND: ResourceKind = ResourceKind::EventGateway;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.event_gateways
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.event_gateways
    }
}
