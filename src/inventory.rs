//! Remote inventory interface
//!
//! The engine reads and labels remote objects only through this trait;
//! the Konnect HTTP client is one implementation, tests provide others.

use crate::resource::{LookupFilter, ResourceKind};
use async_trait::async_trait;
use serde_json::Value;

/// Which page to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    Number { size: usize, number: usize },
    Cursor { size: usize, after: Option<String> },
}

impl PageRequest {
    pub fn size(&self) -> usize {
        match self {
            PageRequest::Number { size, .. } | PageRequest::Cursor { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: Option<LookupFilter>,
    /// Remote ID of the owning object for child kinds
    pub parent_id: Option<String>,
    pub page: PageRequest,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Full URL of the next page (cursor listings only)
    pub next: Option<String>,
}

#[async_trait]
pub trait RemoteInventory: Send + Sync {
    async fn list(&self, kind: ResourceKind, query: &ListQuery) -> anyhow::Result<Page>;

    /// `Ok(None)` when the remote returned an empty payload. Child kinds
    /// are addressed under `parent_id`.
    async fn fetch(
        &self,
        kind: ResourceKind,
        parent_id: Option<&str>,
        id: &str,
    ) -> anyhow::Result<Option<Value>>;

    async fn update(&self, kind: ResourceKind, id: &str, fields: &Value) -> anyhow::Result<Value>;
}
