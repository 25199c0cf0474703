//! Resource Registry - per-kind operations over a `ResourceSet`
//!
//! Each kind implements `Registered`, and the registry turns that into a
//! table of plain function pointers built once on first access. Callers
//! iterate the table instead of matching on kinds.

use super::{
    Api, ApiPublication, ApiVersion, ApplicationAuthStrategy, ControlPlane, EventGateway,
    GatewayService, Portal, PortalPage, Resource, ResourceKind, ResourceSet, Team,
};
use std::sync::OnceLock;

/// A resource kind stored in its own typed list inside `ResourceSet`.
pub trait Registered: Resource + Sized + 'static {
    const KIND: ResourceKind;

    fn slice(set: &ResourceSet) -> &Vec<Self>;

    fn slice_mut(set: &mut ResourceSet) -> &mut Vec<Self>;
}

/// Type-erased operations for one kind.
pub struct ResourceOps {
    pub kind: ResourceKind,
    /// Every resource of this kind, in declaration order
    pub all: fn(&ResourceSet) -> Vec<&dyn Resource>,
    pub all_mut: fn(&mut ResourceSet) -> Vec<&mut dyn Resource>,
    /// Move every resource of this kind from `src` into `dst`
    pub append: fn(dst: &mut ResourceSet, src: &mut ResourceSet),
    /// Visit until the visitor returns false; returns whether iteration completed
    pub for_each: fn(&ResourceSet, &mut dyn FnMut(&dyn Resource) -> bool) -> bool,
    pub for_each_mut: fn(&mut ResourceSet, &mut dyn FnMut(&mut dyn Resource) -> bool) -> bool,
    pub count: fn(&ResourceSet) -> usize,
}

impl ResourceOps {
    pub fn of<T: Registered>() -> Self {
        Self {
            kind: T::KIND,
            all: all_of::<T>,
            all_mut: all_mut_of::<T>,
            append: append_of::<T>,
            for_each: for_each_of::<T>,
            for_each_mut: for_each_mut_of::<T>,
            count: count_of::<T>,
        }
    }
}

fn all_of<T: Registered>(set: &ResourceSet) -> Vec<&dyn Resource> {
    T::slice(set).iter().map(|r| r as &dyn Resource).collect()
}

fn all_mut_of<T: Registered>(set: &mut ResourceSet) -> Vec<&mut dyn Resource> {
    T::slice_mut(set)
        .iter_mut()
        .map(|r| r as &mut dyn Resource)
        .collect()
}

fn append_of<T: Registered>(dst: &mut ResourceSet, src: &mut ResourceSet) {
    let items = std::mem::take(T::slice_mut(src));
    T::slice_mut(dst).extend(items);
}

fn for_each_of<T: Registered>(
    set: &ResourceSet,
    visit: &mut dyn FnMut(&dyn Resource) -> bool,
) -> bool {
    T::slice(set).iter().all(|r| visit(r as &dyn Resource))
}

fn for_each_mut_of<T: Registered>(
    set: &mut ResourceSet,
    visit: &mut dyn FnMut(&mut dyn Resource) -> bool,
) -> bool {
    T::slice_mut(set)
        .iter_mut()
        .all(|r| visit(r as &mut dyn Resource))
}

fn count_of<T: Registered>(set: &ResourceSet) -> usize {
    T::slice(set).len()
}

/// Global registry, populated on first access and read-only afterwards
static REGISTRY: OnceLock<Vec<ResourceOps>> = OnceLock::new();

/// Get the registry (parents are listed before their children)
pub fn get_registry() -> &'static [ResourceOps] {
    REGISTRY.get_or_init(|| {
        let table = vec![
            ResourceOps::of::<Portal>(),
            ResourceOps::of::<PortalPage>(),
            ResourceOps::of::<Api>(),
            ResourceOps::of::<ApiVersion>(),
            ResourceOps::of::<ApiPublication>(),
            ResourceOps::of::<ControlPlane>(),
            ResourceOps::of::<GatewayService>(),
            ResourceOps::of::<ApplicationAuthStrategy>(),
            ResourceOps::of::<Team>(),
            ResourceOps::of::<EventGateway>(),
        ];
        tracing::debug!("Registered {} resource kinds", table.len());
        table
    })
}

/// Get operations for a kind
pub fn get_ops(kind: ResourceKind) -> Option<&'static ResourceOps> {
    get_registry().iter().find(|ops| ops.kind == kind)
}

/// Get operations by kind tag; unknown tags yield `None`
pub fn lookup(kind: &str) -> Option<&'static ResourceOps> {
    get_registry().iter().find(|ops| ops.kind.as_str() == kind)
}

pub fn is_registered(kind: &str) -> bool {
    lookup(kind).is_some()
}

/// Get all registered kinds in registry order
pub fn registered_kinds() -> Vec<ResourceKind> {
    get_registry().iter().map(|ops| ops.kind).collect()
}
