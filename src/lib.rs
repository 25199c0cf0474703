//! konctl
//!
//! Reconciliation core for declarative Kong Konnect configuration:
//! a typed resource model, identity resolution against the remote
//! inventory, namespace enforcement, protection, and adoption of
//! unmanaged remote objects.

pub mod adopt;
pub mod config;
pub mod error;
pub mod graph;
pub mod identity;
pub mod inventory;
pub mod konnect;
pub mod labels;
pub mod loader;
pub mod namespace;
pub mod pagination;
pub mod protection;
pub mod resource;

pub use error::{Error, Result};

/// Version injected at compile time via KONCTL_VERSION env var,
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("KONCTL_VERSION") {
    Some(v) => v,
    None => "dev",
};
