//! Dependency collection.
//!
//! [`Collector::collect`] walks a request's dependencies depth-first and
//! builds the raw dependency graph. Each dependency goes through:
//!
//! ```text
//! select -> manage -> resolve range -> read descriptor -+-> expand
//!             ^                                        |
//!             +------------- relocation ---------------+-> cycle
//!                                                      +-> failed
//! ```
//!
//! Failures are confined to the branch they occur in and accumulated in the
//! result; the request only fails once the whole tree has been attempted.

use std::fmt;
use std::sync::Arc;

use depweave_config::{CollectorConfig, DepweaveConfig, DescriptorPolicy, RepositoryConfig};
use tracing::{debug, trace, warn};

use crate::artifact::{merge_dependencies, Coordinate, Dependency, RemoteRepository};
use crate::cache::{ConstraintKey, DescriptorKey, NodeKey};
use crate::descriptor::Descriptor;
use crate::error::{
    CollectionError, DependencyCollectionError, DescriptorError, RangeResolutionError,
};
use crate::graph::{DependencyEdge, DependencyGraph, DependencyNode, EdgeOutcome, Premanaged};
use crate::policy::{
    standard_selector, ClassicManager, CollectionContext, DependencyManager, DependencySelector,
    DependencyTraverser, Policies, StaticTraverser,
};
use crate::resolver::{
    DefaultRepositoryAggregator, DescriptorReader, GraphTransformer, NoopTransformer,
    RepositoryAggregator, VersionRangeResolver, VersionRangeResult,
};
use crate::session::CollectionSession;
use crate::stack::AncestorStack;
use crate::version::Version;

use petgraph::stable_graph::NodeIndex;

// ============================================================================
// Request / Result
// ============================================================================

/// What to collect.
#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    /// Root dependency; resolved, and its declared dependencies collected
    /// beneath the request's own
    pub root: Option<Dependency>,
    /// Root artifact label, used when there is no root dependency
    pub root_artifact: Option<Coordinate>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    /// Repositories to search; the collector's defaults when empty
    pub repositories: Vec<RemoteRepository>,
    /// Context tag; the collector's default when empty
    pub request_context: String,
}

impl CollectRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: Dependency) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_root_artifact(mut self, artifact: Coordinate) -> Self {
        self.root_artifact = Some(artifact);
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn with_managed_dependency(mut self, dependency: Dependency) -> Self {
        self.managed_dependencies.push(dependency);
        self
    }

    pub fn with_repository(mut self, repository: RemoteRepository) -> Self {
        self.repositories.push(repository);
        self
    }

    pub fn with_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories.extend(repositories);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.request_context = context.into();
        self
    }
}

/// A dependency that would have closed a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    /// Ancestors from the first occurrence of the artifact down to the
    /// parent of `dependency`
    pub path: Vec<String>,
    pub dependency: Dependency,
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.path {
            write!(f, "{entry} -> ")?;
        }
        write!(f, "{}", self.dependency.artifact())
    }
}

/// The collected graph plus everything that went wrong on the way.
///
/// `exceptions` and `cycles` are capped; the `dropped_*` counters hold what
/// did not fit.
#[derive(Debug)]
pub struct CollectResult {
    pub graph: DependencyGraph,
    pub exceptions: Vec<CollectionError>,
    pub cycles: Vec<DependencyCycle>,
    pub dropped_exceptions: usize,
    pub dropped_cycles: usize,
}

impl CollectResult {
    pub fn root(&self) -> NodeIndex {
        self.graph.root()
    }

    /// Failures encountered, including those past the cap.
    pub fn failure_count(&self) -> usize {
        self.exceptions.len() + self.dropped_exceptions
    }

    /// Cycles encountered, including those past the cap.
    pub fn cycle_count(&self) -> usize {
        self.cycles.len() + self.dropped_cycles
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn has_cycles(&self) -> bool {
        self.cycle_count() > 0
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Builds raw dependency graphs from requests.
pub struct Collector {
    range_resolver: Arc<dyn VersionRangeResolver>,
    descriptor_reader: Arc<dyn DescriptorReader>,
    aggregator: Arc<dyn RepositoryAggregator>,
    transformer: Arc<dyn GraphTransformer>,
    policies: Policies,
    repositories: Vec<RemoteRepository>,
    config: CollectorConfig,
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("policies", &self.policies)
            .field("repositories", &self.repositories)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Start building a collector on the given collaborators. Defaults:
    /// accept-all policies, no mirrors, no transformation.
    pub fn builder(
        range_resolver: Arc<dyn VersionRangeResolver>,
        descriptor_reader: Arc<dyn DescriptorReader>,
    ) -> CollectorBuilder {
        CollectorBuilder {
            range_resolver,
            descriptor_reader,
            aggregator: Arc::new(DefaultRepositoryAggregator::new()),
            transformer: Arc::new(NoopTransformer),
            policies: Policies::permissive(),
            repositories: Vec::new(),
            config: CollectorConfig::default(),
        }
    }

    /// A collector with the standard policies configured from `config`.
    pub fn from_config(
        config: &DepweaveConfig,
        range_resolver: Arc<dyn VersionRangeResolver>,
        descriptor_reader: Arc<dyn DescriptorReader>,
    ) -> Self {
        Self::builder(range_resolver, descriptor_reader)
            .selector(standard_selector(
                &config.collector.excluded_scopes,
                config.collector.exclude_transitive_optionals,
            ))
            .manager(Arc::new(ClassicManager::new()))
            .traverser(Arc::new(StaticTraverser::new(true)))
            .aggregator(Arc::new(DefaultRepositoryAggregator::from_config(
                &config.repositories,
            )))
            .repositories(configured_repositories(&config.repositories))
            .config(config.collector.clone())
            .build()
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect the dependency graph for `request`.
    ///
    /// Returns the graph when every branch resolved. Otherwise the error
    /// carries the partial result.
    pub fn collect(
        &self,
        session: &CollectionSession,
        request: CollectRequest,
    ) -> Result<CollectResult, DependencyCollectionError> {
        let context = if request.request_context.is_empty() {
            self.config.request_context.clone()
        } else {
            request.request_context
        };
        let mut repositories = if request.repositories.is_empty() {
            self.repositories.clone()
        } else {
            request.repositories
        };
        let mut dependencies = request.dependencies;
        let mut managed = request.managed_dependencies;

        debug!(
            "Collecting {} dependencies (root: {}, context: {})",
            dependencies.len(),
            request
                .root
                .as_ref()
                .map(|d| d.artifact().to_string())
                .or_else(|| request.root_artifact.as_ref().map(|a| a.to_string()))
                .unwrap_or_else(|| "none".to_string()),
            context
        );

        let mut root_edge = None;
        let mut root_aliases = Vec::new();
        let root_artifact = match &request.root {
            Some(root) => {
                match self.resolve_root(session, root, &repositories, &context) {
                    Ok((edge, descriptor)) => {
                        if !self.config.ignore_descriptor_repositories {
                            repositories = self
                                .aggregator
                                .aggregate_repositories(&repositories, &descriptor.repositories);
                        }
                        dependencies = merge_dependencies(dependencies, &descriptor.dependencies);
                        managed = merge_dependencies(managed, &descriptor.managed_dependencies);
                        root_aliases = descriptor
                            .aliases
                            .iter()
                            .map(|a| session.pool().intern_artifact(a.clone()))
                            .collect();
                        let artifact = Arc::clone(edge.dependency.artifact_arc());
                        root_edge = Some(edge);
                        Some(artifact)
                    }
                    Err(err) => {
                        warn!("Failed to resolve root {}: {}", root.artifact(), err);
                        let node = DependencyNode::new(
                            Some(session.pool().intern_artifact(root.artifact().clone())),
                            Arc::from(repositories),
                        );
                        return Err(DependencyCollectionError::new(CollectResult {
                            graph: DependencyGraph::new(node),
                            exceptions: vec![err],
                            cycles: Vec::new(),
                            dropped_exceptions: 0,
                            dropped_cycles: 0,
                        }));
                    }
                }
            }
            None => request
                .root_artifact
                .map(|a| session.pool().intern_artifact(a)),
        };

        let repositories: Arc<[RemoteRepository]> = Arc::from(repositories);
        let root_node = DependencyNode::new(root_artifact.clone(), Arc::clone(&repositories))
            .with_aliases(root_aliases);
        let mut graph = DependencyGraph::new(root_node);
        let root_dependency = root_edge.as_ref().map(|e| Arc::clone(&e.dependency));
        if let Some(edge) = root_edge {
            graph.set_root_dependency(edge);
        }

        let root_context = CollectionContext {
            root_artifact: root_artifact.as_deref(),
            artifact: root_artifact.as_deref(),
            dependency: root_dependency.as_deref(),
            managed_dependencies: &managed,
        };
        let policies = self.policies.derive(&root_context);

        let mut run = CollectionRun {
            collector: self,
            session,
            context: &context,
            root_artifact: root_artifact.clone(),
            graph,
            exceptions: Vec::new(),
            cycles: Vec::new(),
            dropped_exceptions: 0,
            dropped_cycles: 0,
        };
        let root = run.graph.root();
        let mut stack = AncestorStack::new();
        stack.with_pushed(root, root_artifact, |stack| {
            run.process_dependencies(stack, root, &dependencies, &policies, &repositories);
        });

        let CollectionRun {
            mut graph,
            mut exceptions,
            cycles,
            dropped_exceptions,
            dropped_cycles,
            ..
        } = run;

        if let Err(err) = self.transformer.transform(&mut graph) {
            warn!("Graph transformation failed: {}", err);
            exceptions.push(err);
        }

        let released = session.cache().release_graph(graph.id());
        debug!(
            "Collected {} nodes, {} edges, {} exceptions ({} dropped), {} cycles ({} dropped); released {} cached subtrees",
            graph.node_count(),
            graph.edge_count(),
            exceptions.len(),
            dropped_exceptions,
            cycles.len(),
            dropped_cycles,
            released
        );

        let result = CollectResult {
            graph,
            exceptions,
            cycles,
            dropped_exceptions,
            dropped_cycles,
        };
        if result.is_success() {
            Ok(result)
        } else {
            Err(DependencyCollectionError::new(result))
        }
    }

    /// Resolve the root dependency's version and descriptor.
    fn resolve_root(
        &self,
        session: &CollectionSession,
        root: &Dependency,
        repositories: &[RemoteRepository],
        context: &str,
    ) -> Result<(DependencyEdge, Arc<Descriptor>), CollectionError> {
        let repositories: Arc<[RemoteRepository]> = Arc::from(repositories);
        let artifact = session.pool().intern_artifact(root.artifact().clone());

        let range = self
            .resolve_range(session, &artifact, &repositories, context)
            .map_err(|source| CollectionError::RangeResolution {
                dependency: root.clone(),
                path: Vec::new(),
                source,
            })?;
        let version = select_version(&range).ok_or_else(|| CollectionError::RangeResolution {
            dependency: root.clone(),
            path: Vec::new(),
            source: RangeResolutionError::no_versions(&artifact, range.constraint.to_string()),
        })?;

        let resolved = session
            .pool()
            .intern_dependency(root.with_artifact(artifact.with_version(version.as_str())));
        let descriptor = self
            .read_descriptor(session, resolved.artifact_arc(), &repositories, context)
            .map_err(|source| CollectionError::Descriptor {
                dependency: (*resolved).clone(),
                path: Vec::new(),
                source,
            })?;

        let edge = DependencyEdge {
            dependency: resolved,
            version,
            constraint: Arc::new(range.constraint.clone()),
            premanaged: Premanaged::default(),
            relocations: Vec::new(),
            request_context: context.to_string(),
            outcome: EdgeOutcome::Expanded,
        };
        Ok((edge, descriptor))
    }

    /// Version-range resolution through the session cache.
    fn resolve_range(
        &self,
        session: &CollectionSession,
        artifact: &Arc<Coordinate>,
        repositories: &Arc<[RemoteRepository]>,
        context: &str,
    ) -> Result<Arc<VersionRangeResult>, RangeResolutionError> {
        let key = ConstraintKey::new(Arc::clone(artifact), Arc::clone(repositories), context);
        if let Some(cached) = session.cache().get_constraint(&key) {
            return Ok(cached);
        }
        let result = Arc::new(
            self.range_resolver
                .resolve_version_range(artifact, repositories, context)?,
        );
        session.cache().put_constraint(key, Arc::clone(&result));
        Ok(result)
    }

    /// Descriptor read through the session cache. Local artifacts get an
    /// empty descriptor without consulting the reader.
    fn read_descriptor(
        &self,
        session: &CollectionSession,
        artifact: &Arc<Coordinate>,
        repositories: &Arc<[RemoteRepository]>,
        context: &str,
    ) -> Result<Arc<Descriptor>, DescriptorError> {
        if artifact.is_local() {
            return Ok(Arc::new(Descriptor::empty((**artifact).clone())));
        }
        let key = DescriptorKey::new(Arc::clone(artifact), Arc::clone(repositories), context);
        if let Some(cached) = session.cache().get_descriptor(&key) {
            return cached;
        }
        let entry = self
            .descriptor_reader
            .read_descriptor(artifact, repositories, context)
            .map(Arc::new);
        session.cache().put_descriptor(key, entry.clone());
        entry
    }

    fn ignores(&self, err: &DescriptorError) -> bool {
        match self.config.descriptor_policy {
            DescriptorPolicy::Strict => false,
            DescriptorPolicy::IgnoreMissing => err.is_missing(),
            DescriptorPolicy::IgnoreErrors => true,
        }
    }
}

/// Highest listed version the constraint accepts.
fn select_version(range: &VersionRangeResult) -> Option<Version> {
    range
        .versions
        .iter()
        .rev()
        .find(|v| range.constraint.contains(v))
        .cloned()
}

/// Repositories listed under `[repositories] remote`.
pub fn configured_repositories(config: &RepositoryConfig) -> Vec<RemoteRepository> {
    config
        .remote
        .iter()
        .map(|r| RemoteRepository::new(r.id.clone(), r.url.clone()))
        .collect()
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Collector`].
pub struct CollectorBuilder {
    range_resolver: Arc<dyn VersionRangeResolver>,
    descriptor_reader: Arc<dyn DescriptorReader>,
    aggregator: Arc<dyn RepositoryAggregator>,
    transformer: Arc<dyn GraphTransformer>,
    policies: Policies,
    repositories: Vec<RemoteRepository>,
    config: CollectorConfig,
}

impl CollectorBuilder {
    pub fn selector(mut self, selector: Arc<dyn DependencySelector>) -> Self {
        self.policies.selector = selector;
        self
    }

    pub fn manager(mut self, manager: Arc<dyn DependencyManager>) -> Self {
        self.policies.manager = manager;
        self
    }

    pub fn traverser(mut self, traverser: Arc<dyn DependencyTraverser>) -> Self {
        self.policies.traverser = traverser;
        self
    }

    pub fn aggregator(mut self, aggregator: Arc<dyn RepositoryAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn transformer(mut self, transformer: Arc<dyn GraphTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Repositories used for requests that name none.
    pub fn repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Collector {
        Collector {
            range_resolver: self.range_resolver,
            descriptor_reader: self.descriptor_reader,
            aggregator: self.aggregator,
            transformer: self.transformer,
            policies: self.policies,
            repositories: self.repositories,
            config: self.config,
        }
    }
}

// ============================================================================
// Algorithm
// ============================================================================

/// Mutable state of one `collect` call.
struct CollectionRun<'a> {
    collector: &'a Collector,
    session: &'a CollectionSession,
    context: &'a str,
    root_artifact: Option<Arc<Coordinate>>,
    graph: DependencyGraph,
    exceptions: Vec<CollectionError>,
    cycles: Vec<DependencyCycle>,
    dropped_exceptions: usize,
    dropped_cycles: usize,
}

/// A dependency whose version and descriptor are settled.
struct Resolved {
    dependency: Arc<Dependency>,
    version: Version,
    range: Arc<VersionRangeResult>,
    premanaged: Premanaged,
    relocations: Vec<Arc<Coordinate>>,
}

impl Resolved {
    fn into_edge(self, context: &str, outcome: EdgeOutcome) -> DependencyEdge {
        DependencyEdge {
            dependency: self.dependency,
            version: self.version,
            constraint: Arc::new(self.range.constraint.clone()),
            premanaged: self.premanaged,
            relocations: self.relocations,
            request_context: context.to_string(),
            outcome,
        }
    }
}

impl CollectionRun<'_> {
    fn process_dependencies(
        &mut self,
        stack: &mut AncestorStack,
        parent: NodeIndex,
        dependencies: &[Dependency],
        policies: &Policies,
        repositories: &Arc<[RemoteRepository]>,
    ) {
        for dependency in dependencies {
            self.process_dependency(stack, parent, dependency, policies, repositories);
        }
    }

    fn process_dependency(
        &mut self,
        stack: &mut AncestorStack,
        parent: NodeIndex,
        dependency: &Dependency,
        policies: &Policies,
        repositories: &Arc<[RemoteRepository]>,
    ) {
        if !policies.selector.select(dependency) {
            trace!("Skipped {}", dependency);
            return;
        }

        let pool = self.session.pool().clone();
        let mut dependency = dependency.clone();
        let mut relocations: Vec<Arc<Coordinate>> = Vec::new();
        let mut disable_version_management = false;

        let (resolved, descriptor) = loop {
            let (managed, premanaged) =
                manage(&dependency, &*policies.manager, disable_version_management);
            dependency = managed;

            let artifact = pool.intern_artifact_arc(Arc::clone(dependency.artifact_arc()));
            let range = match self.collector.resolve_range(
                self.session,
                &artifact,
                repositories,
                self.context,
            ) {
                Ok(range) => range,
                Err(source) => {
                    self.record_range_failure(stack, dependency, source);
                    return;
                }
            };
            let Some(version) = select_version(&range) else {
                let source =
                    RangeResolutionError::no_versions(&artifact, range.constraint.to_string());
                self.record_range_failure(stack, dependency, source);
                return;
            };

            let dependency_arc = pool
                .intern_dependency(dependency.with_artifact(artifact.with_version(version.as_str())));
            let resolved = Resolved {
                dependency: dependency_arc,
                version,
                range,
                premanaged,
                relocations: relocations.clone(),
            };

            let descriptor = match self.collector.read_descriptor(
                self.session,
                resolved.dependency.artifact_arc(),
                repositories,
                self.context,
            ) {
                Ok(descriptor) => descriptor,
                Err(err) if self.collector.ignores(&err) => {
                    trace!("Ignoring descriptor failure for {}: {}", resolved.dependency, err);
                    Arc::new(Descriptor::empty(resolved.dependency.artifact().clone()))
                }
                Err(err) => {
                    self.record_descriptor_failure(stack, parent, resolved, repositories, err);
                    return;
                }
            };

            let Some(target) = descriptor.relocation() else {
                break (resolved, descriptor);
            };

            // A target given as a range only matches once resolved, so the
            // resolved artifact is checked against the chain as well.
            let current = resolved.dependency.artifact();
            let revisited = relocations.iter().any(|r| current.same_identity(r))
                || target.same_identity(current)
                || relocations.iter().any(|r| target.same_identity(r));
            if revisited {
                let mut chain: Vec<String> = relocations.iter().map(|r| r.to_string()).collect();
                chain.push(current.to_string());
                chain.push(target.to_string());
                let err = DescriptorError::RelocationCycle {
                    artifact: current.to_string(),
                    chain,
                };
                if self.collector.ignores(&err) {
                    break (resolved, descriptor);
                }
                self.record_descriptor_failure(stack, parent, resolved, repositories, err);
                return;
            }

            trace!("Relocated {} to {}", current, target);
            disable_version_management =
                target.group() == current.group() && target.name() == current.name();
            relocations.push(Arc::clone(resolved.dependency.artifact_arc()));
            dependency = resolved.dependency.with_artifact(target.clone());
        };

        let artifact = Arc::clone(resolved.dependency.artifact_arc());

        if let Some(position) = stack.find(&artifact) {
            trace!("Cycle at {}", artifact);
            let node = self.graph.add_node(DependencyNode::new(
                Some(Arc::clone(&artifact)),
                narrowed(&resolved, repositories),
            ));
            let cycle = DependencyCycle {
                path: stack.path_from(position),
                dependency: (*resolved.dependency).clone(),
            };
            let edge = resolved.into_edge(self.context, EdgeOutcome::Cycle);
            self.graph.add_edge(parent, node, edge);
            self.record_cycle(cycle);
            return;
        }

        let child_repositories: Arc<[RemoteRepository]> =
            if self.collector.config.ignore_descriptor_repositories
                || descriptor.repositories.is_empty()
            {
                Arc::clone(repositories)
            } else {
                Arc::from(
                    self.collector
                        .aggregator
                        .aggregate_repositories(repositories, &descriptor.repositories),
                )
            };

        let child_context = CollectionContext {
            root_artifact: self.root_artifact.as_deref(),
            artifact: Some(artifact.as_ref()),
            dependency: Some(resolved.dependency.as_ref()),
            managed_dependencies: &descriptor.managed_dependencies,
        };
        let child_policies = policies.derive(&child_context);
        let traverse = !artifact.is_local()
            && !descriptor.dependencies.is_empty()
            && policies.traverser.traverse(&resolved.dependency);

        let key = NodeKey::new(
            self.graph.id(),
            Arc::clone(&artifact),
            Arc::clone(&child_repositories),
            child_policies.clone(),
        );
        if let Some(cached) = self.session.cache().get_node(&key) {
            if self.graph.node(cached).is_some() {
                trace!("Reusing subtree of {}", artifact);
                let edge = resolved.into_edge(self.context, EdgeOutcome::Expanded);
                self.graph.add_edge(parent, cached, edge);
                return;
            }
        }

        let aliases = descriptor
            .aliases
            .iter()
            .map(|a| pool.intern_artifact(a.clone()))
            .collect();
        let node = self.graph.add_node(
            DependencyNode::new(Some(Arc::clone(&artifact)), narrowed(&resolved, repositories))
                .with_aliases(aliases),
        );
        self.session.cache().put_node(key, node);
        let edge = resolved.into_edge(self.context, EdgeOutcome::Expanded);
        self.graph.add_edge(parent, node, edge);

        if traverse {
            stack.with_pushed(node, Some(artifact), |stack| {
                self.process_dependencies(
                    stack,
                    node,
                    &descriptor.dependencies,
                    &child_policies,
                    &child_repositories,
                );
            });
        }
    }

    fn record_range_failure(
        &mut self,
        stack: &AncestorStack,
        dependency: Dependency,
        source: RangeResolutionError,
    ) {
        warn!("Failed to resolve version of {}: {}", dependency, source);
        self.record(CollectionError::RangeResolution {
            dependency,
            path: stack.path(),
            source,
        });
    }

    /// Record the failure and attach the dependency as a childless edge.
    fn record_descriptor_failure(
        &mut self,
        stack: &AncestorStack,
        parent: NodeIndex,
        resolved: Resolved,
        repositories: &Arc<[RemoteRepository]>,
        source: DescriptorError,
    ) {
        warn!("Failed to read descriptor of {}: {}", resolved.dependency, source);
        self.record(CollectionError::Descriptor {
            dependency: (*resolved.dependency).clone(),
            path: stack.path(),
            source,
        });
        let node = self.graph.add_node(DependencyNode::new(
            Some(Arc::clone(resolved.dependency.artifact_arc())),
            narrowed(&resolved, repositories),
        ));
        let edge = resolved.into_edge(self.context, EdgeOutcome::Failed);
        self.graph.add_edge(parent, node, edge);
    }

    fn record(&mut self, err: CollectionError) {
        if self.exceptions.len() < self.collector.config.max_exceptions {
            self.exceptions.push(err);
        } else {
            if self.dropped_exceptions == 0 {
                warn!(
                    "Exception limit of {} reached, further failures are not recorded",
                    self.collector.config.max_exceptions
                );
            }
            self.dropped_exceptions += 1;
        }
    }

    fn record_cycle(&mut self, cycle: DependencyCycle) {
        if self.cycles.len() < self.collector.config.max_cycles {
            self.cycles.push(cycle);
        } else {
            self.dropped_cycles += 1;
        }
    }
}

/// Apply management overrides, returning the managed dependency and the
/// values it replaced.
fn manage(
    dependency: &Dependency,
    manager: &dyn DependencyManager,
    disable_version_management: bool,
) -> (Dependency, Premanaged) {
    let mut premanaged = Premanaged::default();
    let Some(management) = manager.manage(dependency) else {
        return (dependency.clone(), premanaged);
    };

    let mut managed = dependency.clone();
    if let Some(version) = management.version {
        if !disable_version_management && version != managed.artifact().version() {
            trace!("Managed version of {} to {}", managed, version);
            premanaged.version = Some(managed.artifact().version().to_string());
            managed = managed.with_artifact(managed.artifact().with_version(version));
        }
    }
    if let Some(scope) = management.scope {
        if scope != managed.scope() {
            premanaged.scope = Some(managed.scope().to_string());
            managed = managed.with_scope(scope);
        }
    }
    if let Some(optional) = management.optional {
        if optional != managed.is_optional() {
            premanaged.optional = Some(managed.is_optional());
            managed = managed.with_optional(optional);
        }
    }
    if let Some(exclusions) = management.exclusions {
        if exclusions.as_slice() != managed.exclusions() {
            premanaged.exclusions = Some(managed.exclusions().to_vec());
            managed = managed.with_exclusions(exclusions);
        }
    }
    (managed, premanaged)
}

/// The repository list of a resolved node.
fn narrowed(resolved: &Resolved, repositories: &Arc<[RemoteRepository]>) -> Arc<[RemoteRepository]> {
    match resolved.range.repository_of(&resolved.version) {
        Some(repository) => Arc::from(vec![repository.clone()]),
        None => Arc::clone(repositories),
    }
}
