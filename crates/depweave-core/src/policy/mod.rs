//! Per-branch collection policies.
//!
//! Three hooks steer the collector:
//! - [`DependencySelector`]: include or drop a dependency
//! - [`DependencyManager`]: override version, scope, optionality, exclusions
//! - [`DependencyTraverser`]: decide whether to descend into a dependency
//!
//! Each hook derives the instance used one level further down through
//! `derive_child`. Policy instances are part of the subtree cache key, so
//! their identity is structural: two instances compare equal when they are
//! the same type with equal fields (see [`PolicyKey`]).

pub mod manager;
pub mod selector;
pub mod traverser;

use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::artifact::{Coordinate, Dependency, Exclusion};

pub use manager::{ClassicManager, NoopManager};
pub use selector::{
    standard_selector, AndSelector, ExclusionSelector, OptionalSelector, ScopeSelector,
    StaticSelector,
};
pub use traverser::StaticTraverser;

/// Object-safe equality and hashing for policy instances.
///
/// Implemented for every `Eq + Hash` type; policy types only need to derive
/// those traits.
pub trait PolicyKey: Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    /// Equal to `other` (same concrete type, equal value).
    fn key_eq(&self, other: &dyn Any) -> bool;

    /// Feed the concrete type and value into `state`.
    fn key_hash(&self, state: &mut dyn Hasher);
}

impl<T> PolicyKey for T
where
    T: Any + Eq + Hash + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| other == self)
    }

    fn key_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// What the collector knows at the point a child policy is derived.
#[derive(Debug, Clone, Copy)]
pub struct CollectionContext<'a> {
    /// The request's root artifact, if any
    pub root_artifact: Option<&'a Coordinate>,
    /// The artifact whose dependencies are about to be processed
    pub artifact: Option<&'a Coordinate>,
    /// The dependency that led to `artifact`; `None` at the root unless the
    /// request carried a root dependency
    pub dependency: Option<&'a Dependency>,
    /// Management entries declared at this level
    pub managed_dependencies: &'a [Dependency],
}

/// Overrides a manager applies to one dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManagement {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub exclusions: Option<Vec<Exclusion>>,
}

impl DependencyManagement {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.scope.is_none()
            && self.optional.is_none()
            && self.exclusions.is_none()
    }
}

/// Decides whether a dependency is included in the graph.
pub trait DependencySelector: PolicyKey {
    fn select(&self, dependency: &Dependency) -> bool;

    /// The selector for the children of `context.artifact`.
    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>)
        -> Arc<dyn DependencySelector>;
}

/// Applies dependency management.
pub trait DependencyManager: PolicyKey {
    /// Overrides for `dependency`, or `None` to leave it untouched.
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement>;

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencyManager>;
}

/// Decides whether a dependency's own dependencies are collected.
pub trait DependencyTraverser: PolicyKey {
    fn traverse(&self, dependency: &Dependency) -> bool;

    fn derive_child(
        self: Arc<Self>,
        context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencyTraverser>;
}

macro_rules! structural_identity {
    ($($policy:ident),+ $(,)?) => {$(
        impl PartialEq for dyn $policy {
            fn eq(&self, other: &Self) -> bool {
                self.key_eq(other.as_any())
            }
        }

        impl Eq for dyn $policy {}

        impl Hash for dyn $policy {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.key_hash(state);
            }
        }
    )+};
}

structural_identity!(DependencySelector, DependencyManager, DependencyTraverser);

/// The policy triple active at one recursion level.
#[derive(Debug, Clone, Eq, Hash)]
pub struct Policies {
    pub selector: Arc<dyn DependencySelector>,
    pub manager: Arc<dyn DependencyManager>,
    pub traverser: Arc<dyn DependencyTraverser>,
}

impl PartialEq for Policies {
    fn eq(&self, other: &Self) -> bool {
        PartialEq::eq(&self.selector, &other.selector)
            && PartialEq::eq(&self.manager, &other.manager)
            && PartialEq::eq(&self.traverser, &other.traverser)
    }
}

impl Policies {
    pub fn new(
        selector: Arc<dyn DependencySelector>,
        manager: Arc<dyn DependencyManager>,
        traverser: Arc<dyn DependencyTraverser>,
    ) -> Self {
        Self {
            selector,
            manager,
            traverser,
        }
    }

    /// Accept everything, manage nothing, descend everywhere.
    pub fn permissive() -> Self {
        Self::new(
            Arc::new(StaticSelector::new(true)),
            Arc::new(NoopManager),
            Arc::new(StaticTraverser::new(true)),
        )
    }

    /// Derive all three policies for the next level.
    pub fn derive(&self, context: &CollectionContext<'_>) -> Self {
        Self {
            selector: Arc::clone(&self.selector).derive_child(context),
            manager: Arc::clone(&self.manager).derive_child(context),
            traverser: Arc::clone(&self.traverser).derive_child(context),
        }
    }
}

impl Default for Policies {
    fn default() -> Self {
        Self::permissive()
    }
}
