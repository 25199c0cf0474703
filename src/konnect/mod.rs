//! Konnect API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Token resolution
//! - [`client`] - Kind-to-collection mapping and the [`RemoteInventory`] implementation
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use konctl::konnect::client::KonnectClient;
//! use konctl::pagination::Paginator;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = KonnectClient::new("https://us.api.konghq.com", "kpat_...")?;
//!     let portals = Paginator::new(&client, ResourceKind::Portal, 50).collect_all().await?;
//!     Ok(())
//! }
//! ```
//!
//! [`RemoteInventory`]: crate::inventory::RemoteInventory

pub mod auth;
pub mod client;
pub mod http;

pub use client::KonnectClient;
