//! Protection guard
//!
//! Protected resources may not be updated or deleted unless the pending
//! change only flips the protection flag itself.

use crate::error::{Error, Result};
use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Update,
    Delete,
    ExternalTool,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Create => "created",
            Action::Update => "updated",
            Action::Delete => "deleted",
            Action::ExternalTool => "changed",
        }
    }
}

/// A change of the protected flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionChange {
    pub old: bool,
    pub new: bool,
}

impl ProtectionChange {
    /// Read a change from its generic form; both fields must be booleans.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            old: map.get("old")?.as_bool()?,
            new: map.get("new")?.as_bool()?,
        })
    }
}

/// A planned action on one resource as the guard sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub kind: ResourceKind,
    pub name: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<ProtectionChange>,
}

impl PlannedChange {
    pub fn new(kind: ResourceKind, name: impl Into<String>, action: Action) -> Self {
        Self {
            kind,
            name: name.into(),
            action,
            protection: None,
        }
    }

    /// Attach a protection change given in its generic form.
    pub fn with_protection_value(mut self, value: &Value) -> Self {
        self.protection = ProtectionChange::from_value(value);
        self
    }

    /// An update whose only effect on protection is flipping the flag.
    pub fn is_protection_change(&self) -> bool {
        self.action == Action::Update && matches!(self.protection, Some(p) if p.old != p.new)
    }
}

/// Reject an update or delete of a protected resource. Deletes are always
/// rejected; updates pass only when they flip the protection flag.
pub fn check(change: &PlannedChange, is_protected: bool) -> Result<()> {
    let blocked = matches!(change.action, Action::Update | Action::Delete);
    if is_protected && blocked && !change.is_protection_change() {
        tracing::warn!(
            "Blocked {:?} of protected {} '{}'",
            change.action,
            change.kind,
            change.name
        );
        return Err(Error::Protected {
            kind: change.kind,
            name: change.name.clone(),
            verb: change.action.verb(),
        });
    }
    Ok(())
}
