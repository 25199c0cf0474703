//! Application auth strategies

use super::registry::Registered;
use super::{
    require_non_empty, validate_common, Common, LookupFilter, Resource, ResourceKind,
    ResourceSet,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

const STRATEGY_TYPES: &[&str] = &["key_auth", "openid_connect"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationAuthStrategy {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub strategy_type: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Resource for ApplicationAuthStrategy {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ApplicationAuthStrategy
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
        if self.is_external() {
            return Ok(());
        }
        require_non_empty(self.kind(), self.reference(), "a name", self.name.as_deref())?;
        match self.strategy_type.as_deref() {
            Some(t) if STRATEGY_TYPES.contains(&t) => Ok(()),
            Some(t) => Err(Error::config(format!(
                "application_auth_strategy '{}' has unsupported strategy_type '{}' (expected one of [{}])",
                self.reference(),
                t,
                STRATEGY_TYPES.join(", ")
            ))),
            None => Err(Error::config(format!(
                "application_auth_strategy '{}' must specify a strategy_type",
                self.reference()
            ))),
        }
    }

    fn set_defaults(&mut self) {
        if self.name.is_none() {
            self.name = Some(self.common.reference.clone());
        }
        if self.display_name.is_none() {
            self.display_name = self.name.clone();
        }
    }

    fn remote_lookup_filter(&self) -> Option<LookupFilter> {
        Some(LookupFilter::eq("name", self.moniker()))
    }
}

impl Registered for ApplicationAuthStrategy {
    const KIND: ResourceKind = ResourceKind::ApplicationAuthStrategy;

    fn slice(set: &ResourceSet) -> &Vec<Self> {
        &set.application_auth_strategies
    }

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
        &mut set.application_auth_strategies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_type_is_checked() {
        let mut strategy = ApplicationAuthStrategy {
            common: Common::new("key-auth"),
            strategy_type: Some("basic".to_string()),
            ..Default::default()
        };
        strategy.set_defaults();
        assert_eq!(strategy.display_name.as_deref(), Some("key-auth"));
        assert!(strategy.validate().unwrap_err().to_string().contains("unsupported"));

        strategy.strategy_type = Some("key_auth".to_string());
        assert!(strategy.validate().is_ok());
    }
}
