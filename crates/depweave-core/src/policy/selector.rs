//! Standard dependency selectors.

use std::sync::Arc;

use crate::artifact::{Dependency, Exclusion};

use super::{CollectionContext, DependencySelector};

/// Selects everything or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticSelector {
    accept: bool,
}

impl StaticSelector {
    pub fn new(accept: bool) -> Self {
        Self { accept }
    }
}

impl DependencySelector for StaticSelector {
    fn select(&self, _dependency: &Dependency) -> bool {
        self.accept
    }

    fn derive_child(
        self: Arc<Self>,
        _context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencySelector> {
        self
    }
}

/// Filters transitive dependencies by scope.
///
/// Direct dependencies of the request are never filtered; the selector
/// becomes active once a dependency has been descended into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeSelector {
    transitive: bool,
    included: Vec<String>,
    excluded: Vec<String>,
}

impl ScopeSelector {
    /// Drop transitive dependencies whose scope is in `excluded`.
    pub fn excluding<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Vec::<String>::new(), excluded)
    }

    /// Keep only transitive dependencies whose scope is in `included` (all if
    /// empty) and not in `excluded`.
    pub fn new<I, E, S, T>(included: I, excluded: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            transitive: false,
            included: sorted(included),
            excluded: sorted(excluded),
        }
    }
}

fn sorted<I, S>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
    scopes.sort();
    scopes.dedup();
    scopes
}

impl DependencySelector for ScopeSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        if !self.transitive {
            return true;
        }
        let scope = dependency.scope().to_string();
        (self.included.is_empty() || self.included.binary_search(&scope).is_ok())
            && self.excluded.binary_search(&scope).is_err()
    }

    fn derive_child(
        self: Arc<Self>,
        context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencySelector> {
        if self.transitive || context.dependency.is_none() {
            return self;
        }
        Arc::new(Self {
            transitive: true,
            ..(*self).clone()
        })
    }
}

/// Drops optional dependencies that are not direct dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OptionalSelector {
    depth: u8,
}

impl OptionalSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DependencySelector for OptionalSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        self.depth < 2 || !dependency.is_optional()
    }

    fn derive_child(
        self: Arc<Self>,
        _context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencySelector> {
        if self.depth >= 2 {
            return self;
        }
        Arc::new(Self {
            depth: self.depth + 1,
        })
    }
}

/// Applies the exclusions declared by every dependency on the current path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExclusionSelector {
    /// Sorted and deduplicated
    exclusions: Vec<Exclusion>,
}

impl ExclusionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusions(mut exclusions: Vec<Exclusion>) -> Self {
        exclusions.sort();
        exclusions.dedup();
        Self { exclusions }
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }
}

impl DependencySelector for ExclusionSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        !self
            .exclusions
            .iter()
            .any(|e| e.matches(dependency.artifact()))
    }

    fn derive_child(
        self: Arc<Self>,
        context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencySelector> {
        let Some(dependency) = context.dependency else {
            return self;
        };
        let added: Vec<&Exclusion> = dependency
            .exclusions()
            .iter()
            .filter(|e| self.exclusions.binary_search(e).is_err())
            .collect();
        if added.is_empty() {
            return self;
        }
        let mut merged = self.exclusions.clone();
        merged.extend(added.into_iter().cloned());
        Arc::new(Self::with_exclusions(merged))
    }
}

/// Selects a dependency only if every inner selector does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AndSelector {
    selectors: Vec<Arc<dyn DependencySelector>>,
}

impl AndSelector {
    pub fn new(selectors: Vec<Arc<dyn DependencySelector>>) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &[Arc<dyn DependencySelector>] {
        &self.selectors
    }
}

impl DependencySelector for AndSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        self.selectors.iter().all(|s| s.select(dependency))
    }

    fn derive_child(
        self: Arc<Self>,
        context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencySelector> {
        let derived: Vec<Arc<dyn DependencySelector>> = self
            .selectors
            .iter()
            .map(|s| Arc::clone(s).derive_child(context))
            .collect();
        let unchanged = derived
            .iter()
            .zip(&self.selectors)
            .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            return self;
        }
        Arc::new(Self::new(derived))
    }
}

/// Scope filtering, optional filtering (when `exclude_optionals`) and
/// path exclusions combined.
pub fn standard_selector(
    excluded_scopes: &[String],
    exclude_optionals: bool,
) -> Arc<dyn DependencySelector> {
    let mut selectors: Vec<Arc<dyn DependencySelector>> =
        vec![Arc::new(ScopeSelector::excluding(excluded_scopes.iter().cloned()))];
    if exclude_optionals {
        selectors.push(Arc::new(OptionalSelector::new()));
    }
    selectors.push(Arc::new(ExclusionSelector::new()));
    Arc::new(AndSelector::new(selectors))
}
