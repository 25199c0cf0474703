//! APIs and their child resources

use super::registry::Registered;
use super::{
    require_non_empty, validate_common, Common, LookupFilter, ReferenceField, Resource,
    ResourceKind, ResourceRef, ResourceSet,
};
use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: Vec<ApiVersion>,
    #[serde(default)]
    pub publications: Vec<ApiPublication>,
}

impl Api {
    pub fn new(reference: &str) -> Self {
        Self {
            common: Common::new(reference),
            ..Default::default()
        }
    }
}

impl Resource for Api {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Api
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

impl Registered for Api {
    const KIND: ResourceKind = ResourceKind::Api;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.apis
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.apis
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiVersion {
    #[serde(flatten)]
    pub common: Common,
    /// Owning API ref; set by the loader for nested versions
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub spec: Option<String>,
}

impl Resource for ApiVersion {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ApiVersion
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn moniker(&self) -> String {
        self.version.clone()
    }

    fn moniker_field(&self) -> &'static str {
        "version"
    }

    fn parent_ref(&self) -> Option<ResourceRef> {
        self.api
            .as_ref()
            .map(|api| ResourceRef::new(ResourceKind::Api, api.clone()))
    }

    fn validate(&self) -> Result<()> {
        validate_common(self)?;
        require_non_empty(self.kind(), self.reference(), "an api", self.api.as_deref())?;
        require_non_empty(self.kind(), self.reference(), "a version", Some(&self.version))
    }
}

impl Registered for ApiVersion {
    const KIND: ResourceKind = ResourceKind::ApiVersion;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.api_versions
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.api_versions
    }
}

/// Publication of an API to a portal.
///
/// Identified remotely by the portal it is published to, so matching
/// compares `portal_id` against the resolved portal ID when one is known.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPublication {
    #[serde(flatten)]
    pub common: Common,
    /// Owning API ref; set by the loader for nested publications
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub portal_id: String,
    #[serde(default)]
    pub auth_strategy_ids: Vec<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(skip)]
    pub resolved_portal_id: Option<String>,
}

impl Resource for ApiPublication {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ApiPublication
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn moniker(&self) -> String {
        self.resolved_portal_id
            .clone()
            .unwrap_or_else(|| self.portal_id.clone())
    }

    fn moniker_field(&self) -> &'static str {
        "portal_id"
    }

    fn parent_ref(&self) -> Option<ResourceRef> {
        self.api
            .as_ref()
            .map(|api| ResourceRef::new(ResourceKind::Api, api.clone()))
    }

    fn reference_fields(&self) -> Vec<ReferenceField> {
        let mut fields = vec![ReferenceField::new(
            "portal_id",
            ResourceKind::Portal,
            self.portal_id.clone(),
        )];
        fields.extend(self.auth_strategy_ids.iter().map(|id| {
            ReferenceField::new(
                "auth_strategy_ids",
                ResourceKind::ApplicationAuthStrategy,
                id.clone(),
            )
        }));
        fields
    }

    fn validate(&self) -> Result<()> {
        validate_common(self)?;
        require_non_empty(self.kind(), self.reference(), "an api", self.api.as_deref())?;
        require_non_empty(self.kind(), self.reference(), "a portal_id", Some(&self.portal_id))
    }

    fn bind_remote_references(&mut self, bindings: &[(ResourceKind, String, String)]) {
        if let Some((_, _, id)) = bindings
            .iter()
            .find(|(kind, reference, _)| *kind == ResourceKind::Portal && *reference == self.portal_id)
        {
            self.resolved_portal_id = Some(id.clone());
        }
    }

    fn remote_lookup_filter(&self) -> Option<LookupFilter> {
        self.resolved_portal_id
            .as_ref()
            .map(|id| LookupFilter::eq("portal_id", id.clone()))
    }
}

impl Registered for ApiPublication {
    const KIND: ResourceKind = ResourceKind::ApiPublication;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.api_publications
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.api_publications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication() -> ApiPublication {
        ApiPublication {
            common: Common::new("pub-1"),
            api: Some("payments".to_string()),
            portal_id: "dev-portal".to_string(),
            auth_strategy_ids: vec!["key-auth".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_publication_dependencies() {
        assert_eq!(
            publication().dependencies(),
            vec![
                ResourceRef::new(ResourceKind::Api, "payments"),
                ResourceRef::new(ResourceKind::Portal, "dev-portal"),
                ResourceRef::new(ResourceKind::ApplicationAuthStrategy, "key-auth"),
            ]
        );
    }

    #[test]
    fn test_publication_filter_needs_resolved_portal() {
        let mut publication = publication();
        assert!(publication.remote_lookup_filter().is_none());

        publication.bind_remote_references(&[(
            ResourceKind::Portal,
            "dev-portal".to_string(),
            "abc".to_string(),
        )]);
        assert_eq!(
            publication.remote_lookup_filter().unwrap().to_string(),
            "portal_id[eq]=abc"
        );
        assert_eq!(publication.moniker(), "abc");
    }

    #[test]
    fn test_version_requires_api() {
        let version = ApiVersion {
            common: Common::new("v1"),
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        assert!(version.validate().unwrap_err().to_string().contains("an api"));
    }
}
