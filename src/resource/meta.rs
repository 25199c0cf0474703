//! Per-resource metadata
//!
//! Refs, `kongctl` ownership metadata with origin tracking, and the
//! fields every declared resource shares.

use super::external::ExternalBlock;
use super::kind::ResourceKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a ref
pub const MAX_REF_LENGTH: usize = 63;

/// Typed pointer to another declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    #[serde(rename = "ref")]
    pub reference: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.reference)
    }
}

/// Where a metadata value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Set on the resource itself
    Explicit,
    /// Inherited from `_defaults.kongctl`
    FileDefault,
    /// Hardcoded fallback
    ImplicitDefault,
    #[default]
    Unset,
}

impl Origin {
    /// True when the user declared the value, directly or through file defaults.
    pub fn is_declared(&self) -> bool {
        matches!(self, Origin::Explicit | Origin::FileDefault)
    }
}

/// `kongctl` block on a resource.
///
/// `namespace` and `protected` hold the decoded values until the loader
/// resolves them; afterwards they hold the effective values and the
/// matching origin is set exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KongctlMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(skip)]
    pub namespace_origin: Origin,
    #[serde(skip)]
    pub protected_origin: Origin,
}

impl KongctlMeta {
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_protected(&self) -> bool {
        self.protected.unwrap_or(false)
    }

    /// Namespace only if it was declared (not fallen back to the default).
    pub fn declared_namespace(&self) -> Option<&str> {
        if self.namespace_origin.is_declared() {
            self.namespace()
        } else {
            None
        }
    }
}

/// Fields shared by every declared resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Common {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub kongctl: Option<KongctlMeta>,
    #[serde(default, rename = "_external")]
    pub external: Option<ExternalBlock>,
    /// Remote ID once identity has been resolved
    #[serde(skip)]
    pub remote_id: Option<String>,
}

impl Common {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }
}

/// Validate ref syntax: `[a-zA-Z0-9][a-zA-Z0-9_-]*`, 1 to 63 characters.
pub fn validate_ref(reference: &str) -> Result<()> {
    if reference.is_empty() {
        return Err(Error::config("ref cannot be empty"));
    }
    if reference.contains(':') {
        return Err(Error::config("ref cannot contain colons (:)"));
    }
    if reference.chars().any(char::is_whitespace) {
        return Err(Error::config("ref cannot contain spaces"));
    }
    if reference.chars().count() > MAX_REF_LENGTH {
        return Err(Error::config(format!(
            "ref must be between 1 and {} characters long",
            MAX_REF_LENGTH
        )));
    }

    let mut chars = reference.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return Err(Error::config("ref must start with a letter or number")),
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-')) {
        return Err(Error::config(format!(
            "ref contains invalid character '{}'",
            bad
        )));
    }

    Ok(())
}
