//! Portals and portal pages

use super::registry::Registered;
use super::{
    require_non_empty, validate_common, Common, LookupFilter, ReferenceField, Resource,
    ResourceKind, ResourceRef, ResourceSet,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Portal {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_application_auth_strategy_id: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Nested pages; moved into the set's flat page list by the loader
    #[serde(default)]
    pub pages: Vec<PortalPage>,
}

impl Portal {
    pub fn new(reference: &str) -> Self {
        Self {
            common: Common::new(reference),
            ..Default::default()
        }
    }
}

impl Resource for Portal {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Portal
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

    fn reference_fields(&self) -> Vec<ReferenceField> {
        self.default_application_auth_strategy_id
            .iter()
            .map(|id| {
                ReferenceField::new(
                    "default_application_auth_strategy_id",
                    ResourceKind::ApplicationAuthStrategy,
                    id.clone(),
                )
            })
            .collect()
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

impl Registered for Portal {
    const KIND: ResourceKind = ResourceKind::Portal;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.portals
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.portals
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortalPage {
    #[serde(flatten)]
    pub common: Common,
    /// Owning portal ref; set by the loader for nested pages
    #[serde(default)]
    pub portal: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub parent_page_ref: Option<String>,
    #[serde(default)]
    pub children: Vec<PortalPage>,
}

impl PortalPage {
    pub fn new(reference: &str, portal: &str, slug: &str) -> Self {
        Self {
            common: Common::new(reference),
            portal: Some(portal.to_string()),
            slug: slug.to_string(),
            ..Default::default()
        }
    }
}

fn title_from_slug(slug: &str) -> String {
    let words = slug
        .trim_matches('/')
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(crate::identity::capitalize_first)
        .collect::<Vec<_>>();
    words.join(" ")
}

impl Resource for PortalPage {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PortalPage
    }

    fn common(&self) -> &Common {
        &self.common
    }

    fn common_mut(&mut self) -> &mut Common {
        &mut self.common
    }

    fn moniker(&self) -> String {
        self.slug.clone()
    }

    fn moniker_field(&self) -> &'static str {
        "slug"
    }

    fn parent_ref(&self) -> Option<ResourceRef> {
        self.portal
            .as_ref()
            .map(|portal| ResourceRef::new(ResourceKind::Portal, portal.clone()))
    }

    fn reference_fields(&self) -> Vec<ReferenceField> {
        self.parent_page_ref
            .iter()
            .map(|page| ReferenceField::new("parent_page_ref", ResourceKind::PortalPage, page.clone()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        validate_common(self)?;
        require_non_empty(self.kind(), self.reference(), "a portal", self.portal.as_deref())?;
        if self.slug.trim().is_empty() {
            return Err(Error::config(format!(
                "portal_page '{}' must specify a slug",
                self.reference()
            )));
        }
        if self.parent_page_ref.as_deref() == Some(self.reference()) {
            return Err(Error::config(format!(
                "portal_page '{}' cannot be its own parent page",
                self.reference()
            )));
        }
        Ok(())
    }

    fn set_defaults(&mut self) {
        if self.title.is_none() && !self.slug.is_empty() {
            self.title = Some(title_from_slug(&self.slug));
        }
        if self.visibility.is_none() {
            self.visibility = Some("public".to_string());
        }
        if self.status.is_none() {
            self.status = Some("published".to_string());
        }
    }

    fn remote_lookup_filter(&self) -> Option<LookupFilter> {
        Some(LookupFilter::eq("slug", self.slug.clone()))
    }
}

impl Registered for PortalPage {
    const KIND: ResourceKind = ResourceKind::PortalPage;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.portal_pages
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.portal_pages
    }
}
