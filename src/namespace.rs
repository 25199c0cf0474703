//! Namespaces
//!
//! Namespace syntax validation, requirement parsing, and enforcement of a
//! requirement across a loaded `ResourceSet`. Enforcement reports every
//! violation at once.

use crate::error::{Error, Result};
use crate::resource::{Resource, ResourceSet};

/// Maximum namespace length
pub const MAX_NAMESPACE_LENGTH: usize = 63;

/// Namespace used when neither the resource nor its file declares one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Names no configuration may claim
const RESERVED_NAMESPACES: &[&str] = &[];

/// Validate namespace syntax.
///
/// Lowercase alphanumerics and internal single hyphens, starting and
/// ending with an alphanumeric, at most 63 characters.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::config("namespace cannot be empty"));
    }

    if namespace.len() > MAX_NAMESPACE_LENGTH {
        return Err(Error::config(format!(
            "namespace '{}' exceeds maximum length of {} characters",
            namespace, MAX_NAMESPACE_LENGTH
        )));
    }

    if let Some(bad) = namespace
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(Error::config(format!(
            "namespace '{}' is invalid: must consist of lowercase alphanumeric characters or '-' (found '{}')",
            namespace, bad
        )));
    }

    if namespace.starts_with('-') {
        return Err(Error::config(format!(
            "namespace '{}' is invalid: must start with an alphanumeric character",
            namespace
        )));
    }

    if namespace.ends_with('-') {
        return Err(Error::config(format!(
            "namespace '{}' is invalid: must end with an alphanumeric character",
            namespace
        )));
    }

    if RESERVED_NAMESPACES.contains(&namespace) {
        return Err(Error::config(format!(
            "namespace '{}' is reserved and cannot be used",
            namespace
        )));
    }

    if namespace.contains("--") {
        return Err(Error::config(format!(
            "namespace '{}' is invalid: cannot contain consecutive hyphens",
            namespace
        )));
    }

    Ok(())
}

/// Which namespaces a run requires resources to declare.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceRequirement {
    #[default]
    None,
    /// Every resource must declare some namespace
    Any,
    /// Every resource must declare one of these namespaces
    Specific(Vec<String>),
}

impl NamespaceRequirement {
    /// Parse a single flag value: empty/false/off/no, true/any, or a namespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim();
        match value.to_lowercase().as_str() {
            "" | "false" | "off" | "no" => Ok(NamespaceRequirement::None),
            "true" | "any" => Ok(NamespaceRequirement::Any),
            _ => {
                validate_namespace(value)?;
                Ok(NamespaceRequirement::Specific(vec![value.to_string()]))
            }
        }
    }

    /// Parse a repeated flag. An empty list means `Any`.
    pub fn parse_list(values: &[String]) -> Result<Self> {
        let mut namespaces: Vec<String> = Vec::new();
        for raw in values {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            if value.starts_with('-') {
                return Err(Error::config(format!(
                    "'{}' looks like a flag but was interpreted as a namespace value.\n\
                     If you meant to require any namespace, use --require-any-namespace instead.\n\
                     If you meant to specify a namespace, use --require-namespace=<namespace> or place --require-namespace values before other flags",
                    value
                )));
            }
            validate_namespace(value)?;
            if !namespaces.iter().any(|ns| ns == value) {
                namespaces.push(value.to_string());
            }
        }

        if namespaces.is_empty() {
            Ok(NamespaceRequirement::Any)
        } else {
            Ok(NamespaceRequirement::Specific(namespaces))
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, NamespaceRequirement::None)
    }

    fn allowed(&self) -> &[String] {
        match self {
            NamespaceRequirement::Specific(namespaces) => namespaces,
            _ => &[],
        }
    }

    /// Check every resource of the set, collecting all violations.
    pub fn enforce(&self, set: &ResourceSet) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let owners: Vec<&dyn Resource> = set
            .parent_resources()
            .into_iter()
            .filter(|r| !r.is_external())
            .collect();

        if owners.is_empty() {
            return self.enforce_file_defaults(set);
        }

        let violations: Vec<String> = owners
            .iter()
            .filter_map(|resource| self.violation(*resource))
            .collect();

        if violations.is_empty() {
            tracing::debug!("Namespace requirement satisfied by {} resources", owners.len());
            Ok(())
        } else {
            tracing::warn!("{} namespace violations", violations.len());
            Err(Error::NamespaceEnforcement(violations))
        }
    }

    fn violation(&self, resource: &dyn Resource) -> Option<String> {
        let label = format!("{} '{}'", resource.kind(), resource.reference());
        let declared = resource.meta().and_then(|meta| meta.declared_namespace());

        match (self, declared) {
            (NamespaceRequirement::Any, None) => Some(format!(
                "{}: missing explicit namespace; add kongctl.namespace or set _defaults.kongctl.namespace",
                label
            )),
            (NamespaceRequirement::Specific(allowed), None) => Some(format!(
                "{}: missing explicit namespace; expected one of [{}] via kongctl.namespace or _defaults.kongctl.namespace",
                label,
                allowed.join(", ")
            )),
            (NamespaceRequirement::Specific(allowed), Some(namespace))
                if !allowed.iter().any(|ns| ns == namespace) =>
            {
                Some(format!(
                    "{}: uses namespace '{}' (expected one of [{}])",
                    label,
                    namespace,
                    allowed.join(", ")
                ))
            }
            _ => None,
        }
    }

    fn enforce_file_defaults(&self, set: &ResourceSet) -> Result<()> {
        let defaults = &set.default_namespaces;
        let allowed = self.allowed();

        if defaults.is_empty() {
            return Err(Error::config(if allowed.is_empty() {
                "namespace enforcement requires resources or _defaults.kongctl.namespace to be set"
                    .to_string()
            } else {
                format!(
                    "namespace enforcement requires one of [{}] but no resources or _defaults.kongctl.namespace were provided",
                    allowed.join(", ")
                )
            }));
        }

        if !allowed.is_empty() {
            if let Some(bad) = defaults.iter().find(|ns| !allowed.contains(ns)) {
                return Err(Error::config(format!(
                    "namespace enforcement requires one of [{}] but _defaults.kongctl.namespace is '{}'",
                    allowed.join(", "),
                    bad
                )));
            }
        }

        Ok(())
    }
}
