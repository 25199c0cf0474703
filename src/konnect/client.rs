//! Konnect Client
//!
//! Maps resource kinds to Konnect REST collections and implements the
//! remote inventory on top of the HTTP wrapper.

use super::http::KonnectHttpClient;
use crate::inventory::{ListQuery, Page, PageRequest, RemoteInventory};
use crate::resource::ResourceKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://us.api.konghq.com";

#[derive(Clone)]
pub struct KonnectClient {
    pub http: KonnectHttpClient,
    base_url: Url,
    token: String,
}

impl KonnectClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Konnect base URL '{}'", base_url))?;
        Ok(Self {
            http: KonnectHttpClient::new()?,
            base_url,
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Collection path for a kind; child kinds need the owning object's ID.
    pub fn collection_path(kind: ResourceKind, parent_id: Option<&str>) -> Result<String> {
        let parent = || {
            parent_id
                .filter(|id| !id.is_empty())
                .map(urlencoding::encode)
                .ok_or_else(|| anyhow::anyhow!("{} requires a parent ID", kind))
        };

        let path = match kind {
            ResourceKind::Portal => "/v3/portals".to_string(),
            ResourceKind::PortalPage => format!("/v3/portals/{}/pages", parent()?),
            ResourceKind::Api => "/v3/apis".to_string(),
            ResourceKind::ApiVersion => format!("/v3/apis/{}/versions", parent()?),
            ResourceKind::ApiPublication => format!("/v3/apis/{}/publications", parent()?),
            ResourceKind::ControlPlane => "/v2/control-planes".to_string(),
            ResourceKind::GatewayService => {
                format!("/v2/control-planes/{}/core-entities/services", parent()?)
            }
            ResourceKind::ApplicationAuthStrategy => "/v2/application-auth-strategies".to_string(),
            ResourceKind::Team => "/v3/teams".to_string(),
            ResourceKind::EventGateway => "/v1/event-gateways".to_string(),
        };
        Ok(path)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {}", path))
    }

    /// Build the listing URL for one page of a query.
    pub fn list_url(&self, kind: ResourceKind, query: &ListQuery) -> Result<Url> {
        let path = Self::collection_path(kind, query.parent_id.as_deref())?;
        let mut url = self.url(&path)?;
        {
            let mut pairs = url.query_pairs_mut();
            match &query.page {
                PageRequest::Number { size, number } => {
                    pairs.append_pair("page[size]", &size.to_string());
                    pairs.append_pair("page[number]", &number.to_string());
                }
                PageRequest::Cursor { size, after } => {
                    pairs.append_pair("page[size]", &size.to_string());
                    if let Some(after) = after {
                        pairs.append_pair("page[after]", after);
                    }
                }
            }
            if let Some(filter) = &query.filter {
                pairs.append_pair(&format!("filter[{}][eq]", filter.field), &filter.value);
            }
        }
        Ok(url)
    }

    fn item_url(&self, kind: ResourceKind, parent_id: Option<&str>, id: &str) -> Result<Url> {
        let path = Self::collection_path(kind, parent_id)?;
        self.url(&format!("{}/{}", path, urlencoding::encode(id)))
    }
}

/// Read items and the next-page link from a listing response.
fn parse_page(body: Value) -> Page {
    let next = body
        .pointer("/meta/page/next")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let items = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Page { items, next }
}

#[async_trait]
impl RemoteInventory for KonnectClient {
    async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<Page> {
        let url = self.list_url(kind, query)?;
        let body = self.http.get(url.as_str(), &self.token).await?;
        let page = parse_page(body);
        tracing::debug!("Listed {} {} items", page.items.len(), kind);
        Ok(page)
    }

    async fn fetch(
        &self,
        kind: ResourceKind,
        parent_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Value>> {
        let url = self.item_url(kind, parent_id, id)?;
        self.http.get_optional(url.as_str(), &self.token).await
    }

    async fn update(&self, kind: ResourceKind, id: &str, fields: &Value) -> Result<Value> {
        let url = self.item_url(kind, None, id)?;
        self.http.patch(url.as_str(), &self.token, fields).await
    }
}
