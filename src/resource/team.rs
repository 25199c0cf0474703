//! Teams

use super::registry::Registered;
use super::{
    require_non_empty, validate_common, Common, LookupFilter, Resource, ResourceKind,
    ResourceSet,
};
use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Team {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Resource for Team {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Team
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

    fn remote_lookup_filter(&self) -> Option<LookupFilter> {
        Some(LookupFilter::eq("name", self.moniker()))
    }
}

impl Registered for Team {
    const KIND: ResourceKind = ResourceKind::Team;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.teams
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.teams
    }
}
