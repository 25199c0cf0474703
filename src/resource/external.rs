//! `_external` blocks
//!
//! Marks a declared resource as reference-only: it is resolved by direct
//! remote ID or by a field selector, and never created or mutated.

use crate::error::{Error, Result};
use crate::identity::RemoteMatchable;
use serde::Deserialize;
use std::collections::BTreeMap;

/// deck flags the engine sets itself and users may not pass through
const RESERVED_DECK_FLAGS: &[&str] = &[
    "--konnect-token",
    "--konnect-control-plane-name",
    "--konnect-addr",
    "--json-output",
    "--output",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBlock {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub selector: Option<Selector>,
    #[serde(default)]
    pub requires: Option<Requires>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Selector {
    #[serde(rename = "matchFields", default)]
    pub match_fields: BTreeMap<String, String>,
}

/// Prerequisite steps run before the resource can be resolved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requires {
    #[serde(default)]
    pub deck: Option<DeckRequires>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckRequires {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Selector fields allowed when prerequisite steps are declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPolicy {
    pub allowed_fields: Vec<String>,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self {
            allowed_fields: vec!["name".to_string()],
        }
    }
}

impl Selector {
    /// Every `(field, value)` pair must match the candidate.
    pub fn matches(&self, candidate: &dyn RemoteMatchable) -> bool {
        if self.match_fields.is_empty() {
            return false;
        }
        self.match_fields
            .iter()
            .all(|(field, expected)| candidate.field(field).as_deref() == Some(expected.as_str()))
    }
}

impl ExternalBlock {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_selector<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            selector: Some(Selector {
                match_fields: fields
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            }),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_with(&SelectorPolicy::default())
    }

    pub fn validate_with(&self, policy: &SelectorPolicy) -> Result<()> {
        match (&self.id, &self.selector) {
            (Some(_), Some(_)) => {
                return Err(Error::AmbiguousMetadata(
                    "_external block cannot have both 'id' and 'selector'".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::config(
                    "_external block must have either 'id' or 'selector'",
                ))
            }
            (Some(id), None) if id.trim().is_empty() => {
                return Err(Error::config("_external id cannot be empty"))
            }
            (None, Some(selector)) if selector.match_fields.is_empty() => {
                return Err(Error::config(
                    "_external selector must have at least one matchField",
                ))
            }
            _ => {}
        }

        if let Some(deck) = self.requires.as_ref().and_then(|r| r.deck.as_ref()) {
            self.validate_deck(deck, policy)?;
        }

        Ok(())
    }

    fn validate_deck(&self, deck: &DeckRequires, policy: &SelectorPolicy) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::config(
                "_external.requires.deck cannot be combined with 'id'; use a selector",
            ));
        }
        if let Some(selector) = &self.selector {
            if let Some(field) = selector
                .match_fields
                .keys()
                .find(|f| !policy.allowed_fields.iter().any(|a| a == *f))
            {
                return Err(Error::config(format!(
                    "_external.requires.deck selector only supports [{}] (found '{}')",
                    policy.allowed_fields.join(", "),
                    field
                )));
            }
        }
        if deck.files.is_empty() {
            return Err(Error::config(
                "_external.requires.deck must list at least one file",
            ));
        }
        for (idx, file) in deck.files.iter().enumerate() {
            let file = file.trim();
            if file.is_empty() {
                return Err(Error::config(format!(
                    "_external.requires.deck.files[{}] cannot be empty",
                    idx
                )));
            }
            if file.starts_with('-') {
                return Err(Error::config(format!(
                    "_external.requires.deck.files[{}] looks like a flag: {}",
                    idx, file
                )));
            }
        }
        for (idx, flag) in deck.flags.iter().enumerate() {
            let flag = flag.trim();
            if !flag.starts_with('-') {
                return Err(Error::config(format!(
                    "_external.requires.deck.flags[{}] must start with '-': {}",
                    idx, flag
                )));
            }
            let name = flag.split('=').next().unwrap_or(flag);
            if RESERVED_DECK_FLAGS.contains(&name) {
                return Err(Error::config(format!(
                    "_external.requires.deck.flags[{}] cannot set {}; it is managed automatically",
                    idx, name
                )));
            }
        }
        Ok(())
    }
}
