//! Dependency graph
//!
//! Orders declared resources so that every resource comes after the
//! resources it depends on, and resolves inherited metadata through
//! parent links.

use crate::error::{Error, Result};
use crate::resource::{KongctlMeta, Resource, ResourceRef, ResourceSet};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in declaration order
    nodes: Vec<ResourceRef>,
    index: HashMap<ResourceRef, usize>,
    /// `deps[i]` are the node indices node `i` must come after
    deps: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build from explicit references and parent links of every resource.
    ///
    /// Dependencies on resources outside the set are left to reference
    /// validation and do not appear as edges.
    pub fn build(set: &ResourceSet) -> Self {
        let resources = set.all_resources();
        let nodes: Vec<ResourceRef> = resources.iter().map(|r| r.resource_ref()).collect();
        let index: HashMap<ResourceRef, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.clone(), i))
            .collect();

        let deps = resources
            .iter()
            .map(|resource| {
                let mut targets: Vec<usize> = Vec::new();
                for dep in resource.dependencies() {
                    if let Some(&target) = index.get(&dep) {
                        if !targets.contains(&target) {
                            targets.push(target);
                        }
                    }
                }
                targets
            })
            .collect();

        Self { nodes, index, deps }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dependencies_of(&self, node: &ResourceRef) -> Vec<&ResourceRef> {
        self.index
            .get(node)
            .map(|&i| self.deps[i].iter().map(|&d| &self.nodes[d]).collect())
            .unwrap_or_default()
    }

    /// Topological order; ties keep declaration order.
    pub fn order(&self) -> Result<Vec<ResourceRef>> {
        let n = self.nodes.len();
        let mut pending: Vec<usize> = self.deps.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (node, targets) in self.deps.iter().enumerate() {
            for &target in targets {
                dependents[target].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut ordered = Vec::with_capacity(n);

        while let Some(next) = ready.pop_first() {
            ordered.push(self.nodes[next].clone());
            for &dependent in &dependents[next] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if ordered.len() < n {
            return Err(Error::CircularDependency(self.describe_cycle(&pending)));
        }
        Ok(ordered)
    }

    /// Follow unresolved edges from the first stuck node until one repeats.
    fn describe_cycle(&self, pending: &[usize]) -> String {
        let Some(start) = pending.iter().position(|&p| p > 0) else {
            return String::new();
        };

        let mut path = vec![start];
        let mut seen: HashSet<usize> = HashSet::from([start]);
        let mut current = start;
        while let Some(&next) = self.deps[current].iter().find(|&&d| pending[d] > 0) {
            path.push(next);
            if !seen.insert(next) {
                let begin = path.iter().position(|&p| p == next).unwrap_or(0);
                return path[begin..]
                    .iter()
                    .map(|&i| self.nodes[i].to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
            }
            current = next;
        }

        path.iter()
            .map(|&i| self.nodes[i].to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Metadata a resource inherits: its own, else the nearest ancestor's.
pub fn effective_meta<'a>(set: &'a ResourceSet, resource: &'a dyn Resource) -> Option<&'a KongctlMeta> {
    let mut current = resource;
    let mut visited: HashSet<String> = HashSet::new();
    loop {
        if let Some(meta) = current.meta() {
            return Some(meta);
        }
        if !visited.insert(current.reference().to_string()) {
            return None;
        }
        let parent = current.parent_ref()?;
        current = set.find_by_ref(&parent.reference)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        Api, ApiPublication, ApplicationAuthStrategy, Common, Origin, Portal, PortalPage,
        ResourceKind,
    };

    fn strategy(reference: &str) -> ApplicationAuthStrategy {
        ApplicationAuthStrategy {
            common: Common::new(reference),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_puts_dependencies_first() {
        let mut set = ResourceSet::new();
        let mut portal = Portal::new("dev-portal");
        portal.default_application_auth_strategy_id = Some("key-auth".to_string());
        set.push(portal);
        set.push(PortalPage::new("home", "dev-portal", "home"));
        set.push(Api::new("payments"));
        set.push(ApiPublication {
            common: Common::new("payments-pub"),
            api: Some("payments".to_string()),
            portal_id: "dev-portal".to_string(),
            ..Default::default()
        });
        set.push(strategy("key-auth"));

        let graph = DependencyGraph::build(&set);
        let order = graph.order().unwrap();
        let pos = |r: &str| order.iter().position(|n| n.reference == r).unwrap();

        assert_eq!(order.len(), 5);
        assert!(pos("key-auth") < pos("dev-portal"));
        assert!(pos("dev-portal") < pos("home"));
        assert!(pos("dev-portal") < pos("payments-pub"));
        assert!(pos("payments") < pos("payments-pub"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut set = ResourceSet::new();
        let mut a = PortalPage::new("a", "dev-portal", "a");
        a.parent_page_ref = Some("b".to_string());
        let mut b = PortalPage::new("b", "dev-portal", "b");
        b.parent_page_ref = Some("a".to_string());
        set.push(Portal::new("dev-portal"));
        set.push(a);
        set.push(b);

        let err = DependencyGraph::build(&set).order().unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("circular dependency detected"), "{message}");
        assert!(message.contains("portal_page:a"), "{message}");
        assert!(message.contains("portal_page:b"), "{message}");
    }

    #[test]
    fn test_children_inherit_parent_meta() {
        let mut set = ResourceSet::new();
        let mut portal = Portal::new("dev-portal");
        portal.common.kongctl = Some(KongctlMeta {
            namespace: Some("team-a".to_string()),
            protected: Some(true),
            namespace_origin: Origin::Explicit,
            protected_origin: Origin::Explicit,
        });
        set.push(portal);
        set.push(PortalPage::new("home", "dev-portal", "home"));

        let page = set.find_by_ref("home").unwrap();
        let meta = effective_meta(&set, page).unwrap();
        assert_eq!(meta.namespace(), Some("team-a"));
        assert!(meta.is_protected());

        let graph = DependencyGraph::build(&set);
        assert_eq!(
            graph.dependencies_of(&ResourceRef::new(ResourceKind::PortalPage, "home")),
            vec![&ResourceRef::new(ResourceKind::Portal, "dev-portal")]
        );
    }
}
