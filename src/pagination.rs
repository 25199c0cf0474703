//! Pagination
//!
//! Walks a remote listing page by page over either protocol, checking a
//! cancellation flag before every request and stopping as soon as the
//! visitor asks it to.

use crate::error::{Error, Result};
use crate::inventory::{ListQuery, PageRequest, RemoteInventory};
use crate::resource::{LookupFilter, PaginationStyle, ResourceKind};
use serde_json::Value;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Page size used when the configured one is not positive
pub const DEFAULT_PAGE_SIZE: usize = 10;

pub fn effective_page_size(configured: i64) -> usize {
    if configured < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        configured as usize
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Extract the `page[after]` cursor from a next-page URL.
pub fn cursor_from_next(next: &str) -> Option<String> {
    let parsed = url::Url::parse(next)
        .or_else(|_| url::Url::parse("http://localhost").and_then(|base| base.join(next)))
        .ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page[after]")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Sequential scan over one kind's remote listing.
pub struct Paginator<'a> {
    inventory: &'a dyn RemoteInventory,
    kind: ResourceKind,
    filter: Option<LookupFilter>,
    parent_id: Option<String>,
    page_size: usize,
    cancel: CancelToken,
}

impl<'a> Paginator<'a> {
    pub fn new(inventory: &'a dyn RemoteInventory, kind: ResourceKind, page_size: usize) -> Self {
        Self {
            inventory,
            kind,
            filter: None,
            parent_id: None,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            cancel: CancelToken::default(),
        }
    }

    pub fn with_filter(mut self, filter: LookupFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Visit items in order until the visitor breaks or the listing is exhausted.
    ///
    /// Returns the number of pages requested.
    pub async fn scan<F>(&self, mut visit: F) -> Result<usize>
    where
        F: FnMut(&Value) -> ControlFlow<()>,
    {
        let style = self.kind.pagination();
        let mut number = 1;
        let mut after: Option<String> = None;
        let mut pages = 0;

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Listing {} cancelled after {} pages", self.kind, pages);
                return Err(Error::Cancelled);
            }

            let page = match style {
                PaginationStyle::PageNumber => PageRequest::Number {
                    size: self.page_size,
                    number,
                },
                PaginationStyle::Cursor => PageRequest::Cursor {
                    size: self.page_size,
                    after: after.clone(),
                },
            };
            let query = ListQuery {
                filter: self.filter.clone(),
                parent_id: self.parent_id.clone(),
                page,
            };

            pages += 1;
            let result = self
                .inventory
                .list(self.kind, &query)
                .await
                .map_err(|e| {
                    Error::remote(
                        "list",
                        self.kind,
                        e.context(format!("pagination failed on page {}", pages)),
                    )
                })?;

            let count = result.items.len();
            tracing::debug!("Listed {} page {}: {} items", self.kind, pages, count);

            for item in &result.items {
                if visit(item).is_break() {
                    return Ok(pages);
                }
            }

            if count == 0 {
                break;
            }

            match style {
                PaginationStyle::PageNumber => {
                    if count < self.page_size {
                        break;
                    }
                    number += 1;
                }
                PaginationStyle::Cursor => match result.next.as_deref().and_then(cursor_from_next) {
                    Some(cursor) => after = Some(cursor),
                    None => break,
                },
            }
        }

        Ok(pages)
    }

    /// First item the predicate accepts, stopping the scan there.
    pub async fn find_first<F>(&self, mut accept: F) -> Result<Option<Value>>
    where
        F: FnMut(&Value) -> bool,
    {
        let mut found = None;
        self.scan(|item| {
            if accept(item) {
                found = Some(item.clone());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await?;
        Ok(found)
    }

    pub async fn collect_all(&self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        self.scan(|item| {
            items.push(item.clone());
            ControlFlow::Continue(())
        })
        .await?;
        Ok(items)
    }
}
