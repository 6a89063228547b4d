//! Dependency managers.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::artifact::{Dependency, Exclusion};

use super::{CollectionContext, DependencyManagement, DependencyManager};

/// Never manages anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoopManager;

impl DependencyManager for NoopManager {
    fn manage(&self, _dependency: &Dependency) -> Option<DependencyManagement> {
        None
    }

    fn derive_child(
        self: Arc<Self>,
        _context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencyManager> {
        self
    }
}

/// Root-level dependency management.
///
/// Management entries are collected from the root context only. Versions
/// and scopes apply from depth 2 on, so direct dependencies keep what they
/// declare; exclusions apply at every depth. When the same key is managed
/// twice the entry closer to the root wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassicManager {
    depth: u8,
    /// Keyed by management key
    versions: BTreeMap<String, String>,
    scopes: BTreeMap<String, String>,
    exclusions: BTreeMap<String, Vec<Exclusion>>,
}

impl ClassicManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, managed: &[Dependency]) -> Self {
        let mut next = Self {
            depth: self.depth + 1,
            ..self.clone()
        };
        for dependency in managed {
            let artifact = dependency.artifact();
            let key = artifact.management_key();
            if !artifact.version().is_empty() {
                next.versions
                    .entry(key.clone())
                    .or_insert_with(|| artifact.version().to_string());
            }
            if !dependency.scope().is_empty() {
                next.scopes
                    .entry(key.clone())
                    .or_insert_with(|| dependency.scope().to_string());
            }
            if !dependency.exclusions().is_empty() {
                let entry = next.exclusions.entry(key).or_default();
                for exclusion in dependency.exclusions() {
                    if !entry.contains(exclusion) {
                        entry.push(exclusion.clone());
                    }
                }
            }
        }
        next
    }
}

impl DependencyManager for ClassicManager {
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        let key = dependency.artifact().management_key();
        let mut management = DependencyManagement::default();

        if self.depth >= 2 {
            management.version = self.versions.get(&key).cloned();
            management.scope = self.scopes.get(&key).cloned();
        }

        if let Some(managed) = self.exclusions.get(&key) {
            let mut merged = dependency.exclusions().to_vec();
            for exclusion in managed {
                if !merged.contains(exclusion) {
                    merged.push(exclusion.clone());
                }
            }
            management.exclusions = Some(merged);
        }

        (!management.is_empty()).then_some(management)
    }

    fn derive_child(self: Arc<Self>, context: &CollectionContext<'_>) -> Arc<dyn DependencyManager> {
        match self.depth {
            0 => Arc::new(self.collect(context.managed_dependencies)),
            1 => Arc::new(Self {
                depth: 2,
                ..(*self).clone()
            }),
            _ => self,
        }
    }
}
