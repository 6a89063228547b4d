//! Dependency traversers.

use std::sync::Arc;

use crate::artifact::Dependency;

use super::{CollectionContext, DependencyTraverser};

/// Descends into every dependency or into none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticTraverser {
    traverse: bool,
}

impl StaticTraverser {
    pub fn new(traverse: bool) -> Self {
        Self { traverse }
    }
}

impl Default for StaticTraverser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DependencyTraverser for StaticTraverser {
    fn traverse(&self, _dependency: &Dependency) -> bool {
        self.traverse
    }

    fn derive_child(
        self: Arc<Self>,
        _context: &CollectionContext<'_>,
    ) -> Arc<dyn DependencyTraverser> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Coordinate;

    #[test]
    fn test_static_traverser() {
        let dep = Dependency::new(Coordinate::new("g", "a", "1"), "compile");
        assert!(StaticTraverser::default().traverse(&dep));
        assert!(!StaticTraverser::new(false).traverse(&dep));
    }
}
