//! Dependency graph model.
//!
//! Nodes and edges live in a [`StableGraph`] arena and are addressed by
//! index. A node keeps its outgoing edges in declaration order; a node
//! reached through the subtree cache is shared by every edge pointing at it,
//! so the graph is a DAG rather than a tree.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use crate::artifact::{Coordinate, Dependency, Exclusion, RemoteRepository};
use crate::version::{Version, VersionConstraint};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one collected graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Node
// ============================================================================

/// A resolved artifact and the ordered list of its outgoing edges.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    artifact: Option<Arc<Coordinate>>,
    aliases: Vec<Arc<Coordinate>>,
    repositories: Arc<[RemoteRepository]>,
    children: Vec<EdgeIndex>,
}

impl DependencyNode {
    pub fn new(artifact: Option<Arc<Coordinate>>, repositories: Arc<[RemoteRepository]>) -> Self {
        Self {
            artifact,
            aliases: Vec::new(),
            repositories,
            children: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<Arc<Coordinate>>) -> Self {
        self.aliases = aliases;
        self
    }

    /// The node's artifact; `None` only for a root without an artifact.
    pub fn artifact(&self) -> Option<&Arc<Coordinate>> {
        self.artifact.as_ref()
    }

    /// Alternate coordinates considered equivalent for conflict purposes.
    pub fn aliases(&self) -> &[Arc<Coordinate>] {
        &self.aliases
    }

    /// Repositories the node's artifact is resolved from.
    ///
    /// Narrowed to the single repository the version was found in when the
    /// version listing reported one.
    pub fn repositories(&self) -> &Arc<[RemoteRepository]> {
        &self.repositories
    }

    /// Outgoing edges in declaration order.
    pub fn children(&self) -> &[EdgeIndex] {
        &self.children
    }
}

// ============================================================================
// Edge
// ============================================================================

/// How processing of an edge's dependency ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOutcome {
    /// Resolved; the target may have children or share a cached subtree
    Expanded,
    /// The artifact is already an ancestor; never expanded
    Cycle,
    /// The descriptor could not be read; the target has no children
    Failed,
}

impl EdgeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeOutcome::Expanded => "expanded",
            EdgeOutcome::Cycle => "cycle",
            EdgeOutcome::Failed => "failed",
        }
    }
}

/// Values a dependency carried before management overrode them.
///
/// A field is `Some` only if the corresponding override was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Premanaged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<Vec<Exclusion>>,
}

impl Premanaged {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.scope.is_none()
            && self.optional.is_none()
            && self.exclusions.is_none()
    }
}

/// A resolved dependency connecting a parent node to its child.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    /// The dependency after management; its artifact carries `version`
    pub dependency: Arc<Dependency>,
    pub version: Version,
    /// The constraint `version` was chosen from
    pub constraint: Arc<VersionConstraint>,
    pub premanaged: Premanaged,
    /// Coordinates followed through relocation, oldest first
    pub relocations: Vec<Arc<Coordinate>>,
    pub request_context: String,
    pub outcome: EdgeOutcome,
}

impl DependencyEdge {
    pub fn artifact(&self) -> &Coordinate {
        self.dependency.artifact()
    }

    pub fn is_cycle(&self) -> bool {
        self.outcome == EdgeOutcome::Cycle
    }

    fn label(&self) -> String {
        let mut label = format!("{} ({}", self.dependency.artifact(), self.dependency.scope());
        if self.dependency.is_optional() {
            label.push_str(", optional");
        }
        label.push(')');
        if let Some(version) = &self.premanaged.version {
            let _ = write!(label, " [version managed from {version}]");
        }
        if let Some(scope) = &self.premanaged.scope {
            let _ = write!(label, " [scope managed from {scope}]");
        }
        if !self.relocations.is_empty() {
            let chain: Vec<String> = self.relocations.iter().map(|c| c.to_string()).collect();
            let _ = write!(label, " [relocated from {}]", chain.join(" -> "));
        }
        match self.outcome {
            EdgeOutcome::Expanded => {}
            EdgeOutcome::Cycle => label.push_str(" [cycle]"),
            EdgeOutcome::Failed => label.push_str(" [failed]"),
        }
        label
    }
}

/// Borrowed view of one edge with its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    pub id: EdgeIndex,
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub edge: &'a DependencyEdge,
}

// ============================================================================
// Graph
// ============================================================================

/// The raw (pre-mediation) dependency graph produced by one collection.
#[derive(Debug)]
pub struct DependencyGraph {
    id: GraphId,
    graph: StableGraph<DependencyNode, DependencyEdge>,
    root: NodeIndex,
    root_dependency: Option<DependencyEdge>,
}

impl DependencyGraph {
    /// Create a graph containing only `root`.
    pub fn new(root: DependencyNode) -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(root);
        Self {
            id: GraphId::next(),
            graph,
            root,
            root_dependency: None,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Resolution details of the root when the request carried a root
    /// dependency.
    pub fn root_dependency(&self) -> Option<&DependencyEdge> {
        self.root_dependency.as_ref()
    }

    pub fn set_root_dependency(&mut self, edge: DependencyEdge) {
        self.root_dependency = Some(edge);
    }

    /// Replace the root node, e.g. from a graph transformer.
    pub fn set_root(&mut self, root: NodeIndex) {
        self.root = root;
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&DependencyNode> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut DependencyNode> {
        self.graph.node_weight_mut(idx)
    }

    pub fn edge(&self, idx: EdgeIndex) -> Option<&DependencyEdge> {
        self.graph.edge_weight(idx)
    }

    pub fn edge_mut(&mut self, idx: EdgeIndex) -> Option<&mut DependencyEdge> {
        self.graph.edge_weight_mut(idx)
    }

    /// The node an edge points at.
    pub fn target(&self, idx: EdgeIndex) -> Option<NodeIndex> {
        self.graph.edge_endpoints(idx).map(|(_, target)| target)
    }

    pub fn add_node(&mut self, node: DependencyNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Add an edge and append it to the source's child list.
    ///
    /// Returns `None` if either endpoint does not exist.
    pub fn add_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        edge: DependencyEdge,
    ) -> Option<EdgeIndex> {
        if !self.graph.contains_node(source) || !self.graph.contains_node(target) {
            return None;
        }
        let idx = self.graph.add_edge(source, target, edge);
        if let Some(node) = self.graph.node_weight_mut(source) {
            node.children.push(idx);
        }
        Some(idx)
    }

    /// Detach an edge from its source. The target node is left in place.
    pub fn remove_edge(&mut self, idx: EdgeIndex) -> Option<DependencyEdge> {
        let (source, _) = self.graph.edge_endpoints(idx)?;
        if let Some(node) = self.graph.node_weight_mut(source) {
            node.children.retain(|&e| e != idx);
        }
        self.graph.remove_edge(idx)
    }

    /// Outgoing edges of `node` in declaration order.
    pub fn children(&self, node: NodeIndex) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        self.graph
            .node_weight(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| {
                let (source, target) = self.graph.edge_endpoints(id)?;
                let edge = self.graph.edge_weight(id)?;
                Some(EdgeView {
                    id,
                    source,
                    target,
                    edge,
                })
            })
    }

    /// All edges in storage order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        self.graph.edge_references().map(|r| EdgeView {
            id: r.id(),
            source: r.source(),
            target: r.target(),
            edge: r.weight(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes reachable from the root, each once, depth-first in declaration
    /// order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            graph: self,
            stack: vec![self.root],
            visited: HashSet::new(),
        }
    }

    /// Every node reachable from the root paired with the number of edges
    /// leading into it, in preorder.
    pub fn shared_nodes(&self) -> Vec<(NodeIndex, usize)> {
        self.preorder()
            .map(|idx| {
                let incoming = self
                    .graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .count();
                (idx, incoming)
            })
            .filter(|&(_, incoming)| incoming > 1)
            .collect()
    }

    /// Render in dependency-tree style.
    ///
    /// A shared node's subtree is printed at its first occurrence only.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        let root_label = match (&self.root_dependency, self.node(self.root)) {
            (Some(edge), _) => edge.label(),
            (None, Some(node)) => node
                .artifact()
                .map_or_else(|| "(root)".to_string(), |a| a.to_string()),
            (None, None) => "(root)".to_string(),
        };
        out.push_str(&root_label);
        out.push('\n');

        let mut rendered = HashSet::new();
        rendered.insert(self.root);
        self.render_children(self.root, "", &mut rendered, &mut out);
        out
    }

    fn render_children(
        &self,
        node: NodeIndex,
        prefix: &str,
        rendered: &mut HashSet<NodeIndex>,
        out: &mut String,
    ) {
        let children: Vec<EdgeView<'_>> = self.children(node).collect();
        let last = children.len().saturating_sub(1);
        for (i, view) in children.iter().enumerate() {
            let (branch, indent) = if i == last {
                ("\\- ", "   ")
            } else {
                ("+- ", "|  ")
            };
            let has_children = self
                .node(view.target)
                .is_some_and(|n| !n.children.is_empty());
            let first_visit = rendered.insert(view.target);
            let _ = write!(out, "{prefix}{branch}{}", view.edge.label());
            if has_children && !first_visit {
                out.push_str(" [see above]");
            }
            out.push('\n');
            if has_children && first_visit {
                self.render_children(view.target, &format!("{prefix}{indent}"), rendered, out);
            }
        }
    }

    /// Serialisable copy of the reachable graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for idx in self.preorder() {
            let Some(node) = self.node(idx) else { continue };
            nodes.push(NodeSnapshot {
                id: idx.index(),
                artifact: node.artifact().map(|a| a.to_string()),
                aliases: node.aliases.iter().map(|a| a.to_string()).collect(),
                repositories: node.repositories.iter().map(|r| r.id.clone()).collect(),
            });
            for view in self.children(idx) {
                edges.push(EdgeSnapshot::from_view(&view));
            }
        }
        GraphSnapshot {
            graph_id: self.id.as_u64(),
            root: self.root.index(),
            root_dependency: self.root_dependency.as_ref().map(|edge| {
                EdgeSnapshot::from_edge(self.root.index(), self.root.index(), edge)
            }),
            nodes,
            edges,
        }
    }

    /// JSON rendering of [`snapshot`](Self::snapshot).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

/// Pre-order iterator over reachable nodes.
pub struct Preorder<'a> {
    graph: &'a DependencyGraph,
    stack: Vec<NodeIndex>,
    visited: HashSet<NodeIndex>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.stack.pop() {
            if !self.visited.insert(idx) {
                continue;
            }
            if let Some(node) = self.graph.node(idx) {
                for &edge in node.children.iter().rev() {
                    if let Some(target) = self.graph.target(edge) {
                        if !self.visited.contains(&target) {
                            self.stack.push(target);
                        }
                    }
                }
            }
            return Some(idx);
        }
        None
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Plain-data form of a [`DependencyGraph`] for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub graph_id: u64,
    pub root: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dependency: Option<EdgeSnapshot>,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphSnapshot {
    /// Edges whose branch failed or closed a cycle.
    pub fn unresolved(&self) -> impl Iterator<Item = &EdgeSnapshot> {
        self.edges
            .iter()
            .filter(|e| e.outcome != EdgeOutcome::Expanded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub repositories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub source: usize,
    pub target: usize,
    pub artifact: String,
    pub scope: String,
    pub optional: bool,
    pub version: String,
    pub constraint: String,
    pub outcome: EdgeOutcome,
    #[serde(default, skip_serializing_if = "Premanaged::is_empty")]
    pub premanaged: Premanaged,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relocations: Vec<String>,
    pub request_context: String,
}

impl EdgeSnapshot {
    fn from_view(view: &EdgeView<'_>) -> Self {
        Self::from_edge(view.source.index(), view.target.index(), view.edge)
    }

    fn from_edge(source: usize, target: usize, edge: &DependencyEdge) -> Self {
        Self {
            source,
            target,
            artifact: edge.artifact().to_string(),
            scope: edge.dependency.scope().to_string(),
            optional: edge.dependency.is_optional(),
            version: edge.version.to_string(),
            constraint: edge.constraint.to_string(),
            outcome: edge.outcome,
            premanaged: edge.premanaged.clone(),
            relocations: edge.relocations.iter().map(|c| c.to_string()).collect(),
            request_context: edge.request_context.clone(),
        }
    }
}
