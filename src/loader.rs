//! Configuration loader
//!
//! Decodes YAML configuration files into a `ResourceSet`: nested children
//! are flattened with their parent links, namespace and protection
//! defaults are resolved with their origin, refs are checked for global
//! uniqueness, and cross references are validated.

use crate::error::{Error, Result};
use crate::namespace::{validate_namespace, DEFAULT_NAMESPACE};
use crate::resource::{
    is_remote_id, Api, ApiPublication, ApiVersion, ApplicationAuthStrategy, ControlPlane,
    EventGateway, GatewayService, KongctlMeta, Origin, Portal, PortalPage, Resource,
    ResourceKind, ResourceSet, Team,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `_defaults` block of a file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileDefaults {
    #[serde(default)]
    kongctl: Option<KongctlMeta>,
}

/// One configuration file as written
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default, rename = "_defaults")]
    defaults: Option<FileDefaults>,
    #[serde(default)]
    portals: Vec<Portal>,
    #[serde(default)]
    portal_pages: Vec<PortalPage>,
    #[serde(default)]
    apis: Vec<Api>,
    #[serde(default)]
    api_versions: Vec<ApiVersion>,
    #[serde(default)]
    api_publications: Vec<ApiPublication>,
    #[serde(default)]
    control_planes: Vec<ControlPlane>,
    #[serde(default)]
    gateway_services: Vec<GatewayService>,
    #[serde(default)]
    application_auth_strategies: Vec<ApplicationAuthStrategy>,
    #[serde(default)]
    teams: Vec<Team>,
    #[serde(default)]
    event_gateways: Vec<EventGateway>,
}

/// Load, merge, and validate several files.
pub fn load_files(paths: &[PathBuf]) -> Result<ResourceSet> {
    let mut set = ResourceSet::new();
    let mut seen: HashMap<String, ResourceKind> = HashMap::new();

    for path in paths {
        let file_set = load_file(path)?;
        check_unique_refs(&mut seen, &file_set, &path.display().to_string())?;
        set.append_all(file_set);
    }

    finalize(&mut set)?;
    tracing::info!(
        "Loaded {} resources from {} files",
        set.resource_count(),
        paths.len()
    );
    Ok(set)
}

/// Decode one file without the set-wide validation passes.
pub fn load_file(path: &Path) -> Result<ResourceSet> {
    tracing::debug!("Loading {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_str(&content, &path.display().to_string())
}

/// Decode configuration text; `source` names it in error messages.
pub fn parse_str(content: &str, source: &str) -> Result<ResourceSet> {
    let file: ConfigFile = if content.trim().is_empty() {
        ConfigFile::default()
    } else {
        serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse {}: {}", source, e)))?
    };

    let defaults = file
        .defaults
        .as_ref()
        .and_then(|d| d.kongctl.clone())
        .unwrap_or_default();

    let mut set = ResourceSet::new();
    extract(file, &mut set)?;
    reject_child_metadata(&set)?;
    apply_metadata_defaults(&mut set, &defaults)?;

    if let Some(namespace) = defaults.namespace {
        set.default_namespaces.push(namespace);
    }

    Ok(set)
}

/// Flatten nested children into the set, linking each to its parent.
fn extract(file: ConfigFile, set: &mut ResourceSet) -> Result<()> {
    for mut portal in file.portals {
        let portal_ref = portal.common.reference.clone();
        for page in std::mem::take(&mut portal.pages) {
            extract_page(page, &portal_ref, None, set)?;
        }
        set.push(portal);
    }
    for mut page in file.portal_pages {
        let portal_ref = page.portal.clone().unwrap_or_default();
        let page_ref = page.common.reference.clone();
        let children = std::mem::take(&mut page.children);
        set.push(page);
        for child in children {
            extract_page(child, &portal_ref, Some(&page_ref), set)?;
        }
    }

    for mut api in file.apis {
        let api_ref = api.common.reference.clone();
        for mut version in std::mem::take(&mut api.versions) {
            inherit(
                ResourceKind::ApiVersion,
                &version.common.reference,
                "api",
                &mut version.api,
                ResourceKind::Api,
                &api_ref,
            )?;
            set.push(version);
        }
        for mut publication in std::mem::take(&mut api.publications) {
            inherit(
                ResourceKind::ApiPublication,
                &publication.common.reference,
                "api",
                &mut publication.api,
                ResourceKind::Api,
                &api_ref,
            )?;
            set.push(publication);
        }
        set.push(api);
    }
    file.api_versions.into_iter().for_each(|v| set.push(v));
    file.api_publications.into_iter().for_each(|p| set.push(p));

    for mut control_plane in file.control_planes {
        let cp_ref = control_plane.common.reference.clone();
        for mut service in std::mem::take(&mut control_plane.gateway_services) {
            inherit(
                ResourceKind::GatewayService,
                &service.common.reference,
                "control_plane",
                &mut service.control_plane,
                ResourceKind::ControlPlane,
                &cp_ref,
            )?;
            set.push(service);
        }
        set.push(control_plane);
    }
    file.gateway_services.into_iter().for_each(|s| set.push(s));

    file.application_auth_strategies
        .into_iter()
        .for_each(|s| set.push(s));
    file.teams.into_iter().for_each(|t| set.push(t));
    file.event_gateways.into_iter().for_each(|g| set.push(g));
    Ok(())
}

fn extract_page(
    mut page: PortalPage,
    portal_ref: &str,
    parent_page: Option<&str>,
    set: &mut ResourceSet,
) -> Result<()> {
    let page_ref = page.common.reference.clone();
    inherit(
        ResourceKind::PortalPage,
        &page_ref,
        "portal",
        &mut page.portal,
        ResourceKind::Portal,
        portal_ref,
    )?;
    if let Some(parent_page) = parent_page {
        inherit(
            ResourceKind::PortalPage,
            &page_ref,
            "parent_page_ref",
            &mut page.parent_page_ref,
            ResourceKind::PortalPage,
            parent_page,
        )?;
    }
    let children = std::mem::take(&mut page.children);
    set.push(page);
    for child in children {
        extract_page(child, portal_ref, Some(&page_ref), set)?;
    }
    Ok(())
}

/// Set a nested child's parent field, rejecting a child that declares it itself.
fn inherit(
    kind: ResourceKind,
    reference: &str,
    field: &str,
    slot: &mut Option<String>,
    parent_kind: ResourceKind,
    parent: &str,
) -> Result<()> {
    if slot.is_some() {
        return Err(Error::AmbiguousMetadata(format!(
            "{} '{}' should not define {} (inherited from parent {} '{}')",
            kind, reference, field, parent_kind, parent
        )));
    }
    *slot = Some(parent.to_string());
    Ok(())
}

fn reject_child_metadata(set: &ResourceSet) -> Result<()> {
    let offender = set
        .all_resources()
        .into_iter()
        .find(|r| r.kind().parent().is_some() && r.meta().is_some());
    match offender {
        Some(r) => Err(Error::AmbiguousMetadata(format!(
            "kongctl metadata is not supported on child resources ({} '{}')",
            r.kind(),
            r.reference()
        ))),
        None => Ok(()),
    }
}

/// Resolve namespace and protection on parent resources, recording origins.
fn apply_metadata_defaults(set: &mut ResourceSet, defaults: &KongctlMeta) -> Result<()> {
    if let Some(namespace) = &defaults.namespace {
        if namespace.trim().is_empty() {
            return Err(Error::config("namespace in _defaults.kongctl cannot be empty"));
        }
        validate_namespace(namespace)?;
    }

    let mut failure: Option<Error> = None;
    set.for_each_resource_mut(|resource| {
        if resource.kind().parent().is_some() {
            return true;
        }
        match resolve_meta(resource, defaults) {
            Ok(()) => true,
            Err(e) => {
                failure = Some(e);
                false
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn resolve_meta(resource: &mut dyn Resource, defaults: &KongctlMeta) -> Result<()> {
    let kind = resource.kind();
    let reference = resource.reference().to_string();

    if resource.is_external() {
        if resource.meta().is_some() {
            return Err(Error::AmbiguousMetadata(format!(
                "{} '{}' is marked as external and cannot use kongctl metadata",
                kind, reference
            )));
        }
        return Ok(());
    }

    let mut meta = resource.meta().cloned().unwrap_or_default();

    match meta.namespace.as_deref() {
        Some(namespace) => {
            if namespace.trim().is_empty() {
                return Err(Error::config(format!(
                    "{} '{}' cannot have an empty namespace",
                    kind, reference
                )));
            }
            validate_namespace(namespace)
                .map_err(|e| Error::config(format!("{} '{}': {}", kind, reference, e)))?;
            meta.namespace_origin = Origin::Explicit;
        }
        None => match &defaults.namespace {
            Some(namespace) => {
                meta.namespace = Some(namespace.clone());
                meta.namespace_origin = Origin::FileDefault;
            }
            None => {
                meta.namespace = Some(DEFAULT_NAMESPACE.to_string());
                meta.namespace_origin = Origin::ImplicitDefault;
            }
        },
    }

    match (meta.protected, defaults.protected) {
        (Some(_), _) => meta.protected_origin = Origin::Explicit,
        (None, Some(protected)) => {
            meta.protected = Some(protected);
            meta.protected_origin = Origin::FileDefault;
        }
        (None, None) => {
            meta.protected = Some(false);
            meta.protected_origin = Origin::ImplicitDefault;
        }
    }

    resource.common_mut().kongctl = Some(meta);
    Ok(())
}

fn check_unique_refs(
    seen: &mut HashMap<String, ResourceKind>,
    set: &ResourceSet,
    source: &str,
) -> Result<()> {
    for resource in set.all_resources() {
        let reference = resource.reference();
        if let Some(existing) = seen.get(reference) {
            return Err(Error::config(format!(
                "duplicate ref '{}' found in {} (already defined as {})",
                reference, source, existing
            )));
        }
        seen.insert(reference.to_string(), resource.kind());
    }
    Ok(())
}

/// Apply defaults, validate every resource, then validate cross references.
pub fn finalize(set: &mut ResourceSet) -> Result<()> {
    set.for_each_resource_mut(|resource| {
        resource.set_defaults();
        true
    });

    let mut seen: HashMap<String, ResourceKind> = HashMap::new();
    check_unique_refs(&mut seen, set, "configuration")?;

    for resource in set.all_resources() {
        resource.validate()?;
    }
    validate_references(set)
}

/// Every ref-valued field must name a declared resource of the expected kind.
pub fn validate_references(set: &ResourceSet) -> Result<()> {
    for resource in set.all_resources() {
        let parent = resource.parent_ref().map(|p| {
            let field = p.kind.as_str();
            (field, p.kind, p.reference)
        });
        let fields = resource
            .reference_fields()
            .into_iter()
            .map(|f| (f.field, f.target, f.value));

        for (field, expected, value) in parent.into_iter().chain(fields) {
            if value.is_empty() || is_remote_id(&value) {
                continue;
            }
            match set.find_by_ref(&value) {
                None => {
                    return Err(Error::config(format!(
                        "resource \"{}\" references unknown {}: {} (field: {})",
                        resource.reference(),
                        expected,
                        value,
                        field
                    )))
                }
                Some(found) if found.kind() != expected => {
                    return Err(Error::config(format!(
                        "resource \"{}\" references {} but expected {}: {} (field: {})",
                        resource.reference(),
                        found.kind(),
                        expected,
                        value,
                        field
                    )))
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
_defaults:
  kongctl:
    namespace: team-a
portals:
  - ref: dev-portal
    default_application_auth_strategy_id: key-auth
    pages:
      - ref: home
        slug: home
        children:
          - ref: home-intro
            slug: intro
  - ref: public-portal
    kongctl:
      namespace: team-b
      protected: true
application_auth_strategies:
  - ref: key-auth
    strategy_type: key_auth
apis:
  - ref: payments
    versions:
      - ref: payments-v1
        version: 1.0.0
    publications:
      - ref: payments-pub
        portal_id: dev-portal
"#;

    fn load(content: &str) -> Result<ResourceSet> {
        let mut set = parse_str(content, "test.yaml")?;
        finalize(&mut set)?;
        Ok(set)
    }

    #[test]
    fn test_nested_children_are_flattened() {
        let set = load(CONFIG).unwrap();
        assert_eq!(set.portal_pages.len(), 2);
        let intro = &set.portal_pages[1];
        assert_eq!(intro.portal.as_deref(), Some("dev-portal"));
        assert_eq!(intro.parent_page_ref.as_deref(), Some("home"));
        assert_eq!(set.api_versions[0].api.as_deref(), Some("payments"));
        assert_eq!(set.api_publications[0].api.as_deref(), Some("payments"));
        assert!(set.portals[0].pages.is_empty());
    }

    #[test]
    fn test_namespace_origins() {
        let set = load(CONFIG).unwrap();
        let dev = set.portals[0].common.kongctl.as_ref().unwrap();
        assert_eq!(dev.namespace(), Some("team-a"));
        assert_eq!(dev.namespace_origin, Origin::FileDefault);
        assert_eq!(dev.protected_origin, Origin::ImplicitDefault);
        assert!(!dev.is_protected());

        let public = set.portals[1].common.kongctl.as_ref().unwrap();
        assert_eq!(public.namespace(), Some("team-b"));
        assert_eq!(public.namespace_origin, Origin::Explicit);
        assert!(public.is_protected());

        assert_eq!(set.default_namespaces, vec!["team-a"]);
        assert!(set.portal_pages[0].common.kongctl.is_none());
    }

    #[test]
    fn test_implicit_default_namespace() {
        let set = load("teams:\n  - ref: platform\n").unwrap();
        let meta = set.teams[0].common.kongctl.as_ref().unwrap();
        assert_eq!(meta.namespace(), Some(DEFAULT_NAMESPACE));
        assert_eq!(meta.namespace_origin, Origin::ImplicitDefault);
        assert!(set.default_namespaces.is_empty());
    }

    #[test]
    fn test_child_redeclaring_parent_is_rejected() {
        let content = r#"
portals:
  - ref: dev-portal
    pages:
      - ref: home
        slug: home
        portal: other-portal
"#;
        let err = parse_str(content, "test.yaml").unwrap_err();
        assert!(matches!(err, Error::AmbiguousMetadata(_)));
        assert!(err.to_string().contains("should not define portal"));
    }

    #[test]
    fn test_child_metadata_is_rejected() {
        let content = r#"
apis:
  - ref: payments
    versions:
      - ref: v1
        version: "1"
        kongctl:
          namespace: team-a
"#;
        let err = parse_str(content, "test.yaml").unwrap_err();
        assert!(err.to_string().contains("not supported on child resources"));
    }

    #[test]
    fn test_external_with_metadata_is_rejected() {
        let content = r#"
portals:
  - ref: shared
    _external:
      id: 6f1b9a52-7c1e-4b8e-9a55-0d6a1f3c2b10
    kongctl:
      namespace: team-a
"#;
        let err = parse_str(content, "test.yaml").unwrap_err();
        assert!(err.to_string().contains("is marked as external"));
    }

    #[test]
    fn test_empty_namespaces_are_rejected() {
        let err = parse_str("portals:\n  - ref: p\n    kongctl:\n      namespace: \"\"\n", "t.yaml")
            .unwrap_err();
        assert!(err.to_string().contains("cannot have an empty namespace"));

        let err = parse_str("_defaults:\n  kongctl:\n    namespace: \"\"\n", "t.yaml").unwrap_err();
        assert!(err.to_string().contains("_defaults.kongctl cannot be empty"));
    }

    #[test]
    fn test_duplicate_refs_across_kinds() {
        let dir = std::env::temp_dir().join(format!("konctl-loader-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let first = dir.join("a.yaml");
        let second = dir.join("b.yaml");
        std::fs::write(&first, "portals:\n  - ref: shared\n").unwrap();
        std::fs::write(&second, "teams:\n  - ref: shared\n").unwrap();

        let err = load_files(&[first, second.clone()]).unwrap_err().to_string();
        assert!(err.contains("duplicate ref 'shared'"), "{err}");
        assert!(err.contains(&second.display().to_string()), "{err}");
        assert!(err.contains("already defined as portal"), "{err}");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unknown_reference() {
        let content = r#"
portals:
  - ref: dev-portal
    default_application_auth_strategy_id: missing
"#;
        let err = load(content).unwrap_err().to_string();
        assert_eq!(
            err,
            "resource \"dev-portal\" references unknown application_auth_strategy: missing (field: default_application_auth_strategy_id)"
        );
    }

    #[test]
    fn test_reference_to_wrong_kind() {
        let content = r#"
teams:
  - ref: platform
apis:
  - ref: payments
    publications:
      - ref: pub
        portal_id: platform
"#;
        let err = load(content).unwrap_err().to_string();
        assert!(err.contains("references team but expected portal"), "{err}");
    }

    #[test]
    fn test_unknown_top_level_key() {
        assert!(parse_str("widgets: []\n", "t.yaml").is_err());
    }
}
