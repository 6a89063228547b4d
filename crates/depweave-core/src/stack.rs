//! Ancestor stack used for cycle detection.

use std::sync::Arc;

use petgraph::stable_graph::NodeIndex;

use crate::artifact::Coordinate;

/// One node on the path from the root to the current recursion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorEntry {
    pub node: NodeIndex,
    pub artifact: Option<Arc<Coordinate>>,
}

/// The chain of nodes from the root to the node whose dependencies are being
/// processed.
#[derive(Debug, Default)]
pub struct AncestorStack {
    entries: Vec<AncestorEntry>,
}

impl AncestorStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeIndex, artifact: Option<Arc<Coordinate>>) {
        self.entries.push(AncestorEntry { node, artifact });
    }

    pub fn pop(&mut self) -> Option<AncestorEntry> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<&AncestorEntry> {
        self.entries.last()
    }

    pub fn get(&self, index: usize) -> Option<&AncestorEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `f` with `node` pushed, popping it again on return.
    pub fn with_pushed<R>(
        &mut self,
        node: NodeIndex,
        artifact: Option<Arc<Coordinate>>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let depth = self.entries.len();
        self.push(node, artifact);
        let result = f(self);
        self.entries.truncate(depth);
        result
    }

    /// Position of the nearest ancestor naming the same artifact.
    ///
    /// Scans from the top down and stops at an entry without an artifact,
    /// which only a bare root has.
    pub fn find(&self, artifact: &Coordinate) -> Option<usize> {
        for (i, entry) in self.entries.iter().enumerate().rev() {
            let Some(ancestor) = &entry.artifact else {
                break;
            };
            if ancestor.same_identity(artifact) {
                return Some(i);
            }
        }
        None
    }

    /// Artifacts on the stack, root first.
    pub fn path(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| e.artifact.as_ref().map(|a| a.to_string()))
            .collect()
    }

    /// Artifacts from `start` to the top.
    pub fn path_from(&self, start: usize) -> Vec<String> {
        self.entries
            .iter()
            .skip(start)
            .filter_map(|e| e.artifact.as_ref().map(|a| a.to_string()))
            .collect()
    }
}
