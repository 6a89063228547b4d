//! Collection behaviour tests for depweave-core.
//!
//! These tests drive [`Collector::collect`] against in-memory repositories
//! and check graph shape, failure accumulation and collaborator traffic:
//! - Subtree sharing and cycle handling
//! - Dependency management and relocation
//! - Selector short-circuiting and descriptor policies
//! - Session cache reuse across calls
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package depweave-core --test collection
//! ```

mod common;

use std::sync::Arc;

use common::{coord, counting_builder, dep, dep_scoped, request, session, CountingRepository};
use depweave_core::error::{CollectionError, DescriptorError};
use depweave_core::memory::InMemoryRepository;
use depweave_core::policy::{standard_selector, ClassicManager, StaticSelector};
use depweave_core::resolver::GraphTransformer;
use depweave_core::{
    CollectRequest, Collector, Dependency, DependencyGraph, Descriptor, EdgeOutcome, InternPool,
    RemoteRepository,
};
use depweave_config::{CollectorConfig, DescriptorPolicy};
use pretty_assertions::assert_eq;

// ============================================================================
// Test Helpers
// ============================================================================

fn collector(repo: InMemoryRepository) -> Collector {
    let repo = Arc::new(repo);
    Collector::builder(repo.clone(), repo).build()
}

fn collector_with(repo: InMemoryRepository, config: CollectorConfig) -> Collector {
    let repo = Arc::new(repo);
    Collector::builder(repo.clone(), repo).config(config).build()
}

/// Edges whose artifact has the given name, in insertion order.
fn edges_named<'a>(
    graph: &'a DependencyGraph,
    name: &'a str,
) -> impl Iterator<Item = depweave_core::EdgeView<'a>> + 'a {
    graph.edges().filter(move |e| e.edge.artifact().name() == name)
}

fn managed(text: &str) -> Dependency {
    Dependency::new(coord(text), "")
}

// ============================================================================
// Dedup
// ============================================================================

#[test]
fn test_equal_keys_share_one_node() {
    let repo = CountingRepository::new(
        InMemoryRepository::new()
            .with_artifact(coord("g:a:1"), vec![dep("g:c:1")])
            .with_artifact(coord("g:b:1"), vec![dep("g:c:1")])
            .with_artifact(coord("g:c:1"), vec![dep("g:d:1")])
            .with_artifact(coord("g:d:1"), Vec::new()),
    );
    let result = counting_builder(&repo)
        .build()
        .collect(&session(), request(vec![dep("g:a:1"), dep("g:b:1")]))
        .unwrap();
    let graph = &result.graph;

    let targets: Vec<_> = edges_named(graph, "c").map(|e| e.target).collect();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0], targets[1]);
    assert_eq!(graph.shared_nodes(), vec![(targets[0], 2)]);

    // One range resolution and one descriptor read each; the shared subtree
    // below c is never revisited.
    assert_eq!(repo.calls_for("g:c"), 2);
    assert_eq!(repo.calls_for("g:d"), 2);

    let expected = "\
test:app:jar:1.0
+- g:a:jar:1 (compile)
|  \\- g:c:jar:1 (compile)
|     \\- g:d:jar:1 (compile)
\\- g:b:jar:1 (compile)
   \\- g:c:jar:1 (compile) [see above]
";
    assert_eq!(graph.render_tree(), expected);
}

#[test]
fn test_different_policies_do_not_share() {
    // The exclusion declared on the first path changes the child selector,
    // so the two occurrences of c get separate subtrees.
    let repo = InMemoryRepository::new()
        .with_artifact(
            coord("g:a:1"),
            vec![dep("g:c:1").with_exclusions(vec!["g:d".parse().unwrap()])],
        )
        .with_artifact(coord("g:b:1"), vec![dep("g:c:1")])
        .with_artifact(coord("g:c:1"), vec![dep("g:d:1")])
        .with_artifact(coord("g:d:1"), Vec::new());
    let repo = Arc::new(repo);
    let collector = Collector::builder(repo.clone(), repo)
        .selector(standard_selector(&[], false))
        .build();
    let result = collector
        .collect(&session(), request(vec![dep("g:a:1"), dep("g:b:1")]))
        .unwrap();

    let targets: Vec<_> = edges_named(&result.graph, "c").map(|e| e.target).collect();
    assert_eq!(targets.len(), 2);
    assert_ne!(targets[0], targets[1]);
    assert_eq!(result.graph.children(targets[0]).count(), 0);
    assert_eq!(result.graph.children(targets[1]).count(), 1);
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_cycle_terminates_with_back_edge() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:b:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:a:1")]);
    let result = collector(repo)
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap();

    assert!(result.has_cycles());
    assert_eq!(result.cycles.len(), 1);
    assert_eq!(
        result.cycles[0].to_string(),
        "g:a:jar:1 -> g:b:jar:1 -> g:a:jar:1"
    );

    let back: Vec<_> = result.graph.edges().filter(|e| e.edge.is_cycle()).collect();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].edge.artifact().name(), "a");
    assert_eq!(result.graph.children(back[0].target).count(), 0);

    let expected = "\
test:app:jar:1.0
\\- g:a:jar:1 (compile)
   \\- g:b:jar:1 (compile)
      \\- g:a:jar:1 (compile) [cycle]
";
    assert_eq!(result.graph.render_tree(), expected);
}

#[test]
fn test_cycles_are_capped() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:b:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:a:1")])
        .with_artifact(coord("g:c:1"), vec![dep("g:d:1")])
        .with_artifact(coord("g:d:1"), vec![dep("g:c:1")]);
    let config = CollectorConfig {
        max_cycles: 1,
        ..CollectorConfig::default()
    };
    let result = collector_with(repo, config)
        .collect(&session(), request(vec![dep("g:a:1"), dep("g:c:1")]))
        .unwrap();

    assert_eq!(result.cycles.len(), 1);
    // The graph still marks both back-edges.
    assert_eq!(result.graph.edges().filter(|e| e.edge.is_cycle()).count(), 2);
}

// ============================================================================
// Management
// ============================================================================

fn managed_repo() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:x:1.0")])
        .with_artifact(coord("g:x:1.0"), Vec::new())
        .with_artifact(coord("g:x:2.0"), Vec::new())
}

fn managed_collector(repo: InMemoryRepository) -> Collector {
    let repo = Arc::new(repo);
    Collector::builder(repo.clone(), repo)
        .manager(Arc::new(ClassicManager::new()))
        .build()
}

#[test]
fn test_managed_version_overrides_transitive_declaration() {
    let result = managed_collector(managed_repo())
        .collect(
            &session(),
            request(vec![dep("g:a:1")]).with_managed_dependency(managed("g:x:2.0")),
        )
        .unwrap();

    let x = edges_named(&result.graph, "x").next().unwrap();
    assert_eq!(x.edge.version.as_str(), "2.0");
    assert_eq!(x.edge.artifact().version(), "2.0");
    assert_eq!(x.edge.premanaged.version.as_deref(), Some("1.0"));
    assert_eq!(x.edge.premanaged.scope, None);
    assert!(result
        .graph
        .render_tree()
        .contains("g:x:jar:2.0 (compile) [version managed from 1.0]"));
}

#[test]
fn test_direct_dependency_keeps_declared_version() {
    let result = managed_collector(managed_repo())
        .collect(
            &session(),
            request(vec![dep("g:x:1.0")]).with_managed_dependency(managed("g:x:2.0")),
        )
        .unwrap();

    let x = edges_named(&result.graph, "x").next().unwrap();
    assert_eq!(x.edge.version.as_str(), "1.0");
    assert!(x.edge.premanaged.is_empty());
}

#[test]
fn test_managed_exclusions_prune_subtree() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:b:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:c:1")])
        .with_artifact(coord("g:c:1"), Vec::new());
    let repo = Arc::new(repo);
    let collector = Collector::builder(repo.clone(), repo)
        .selector(standard_selector(&[], false))
        .manager(Arc::new(ClassicManager::new()))
        .build();
    let exclusion = managed("g:b:1").with_exclusions(vec!["g:c".parse().unwrap()]);
    let result = collector
        .collect(
            &session(),
            request(vec![dep("g:a:1")]).with_managed_dependency(exclusion),
        )
        .unwrap();

    let b = edges_named(&result.graph, "b").next().unwrap();
    assert_eq!(b.edge.premanaged.exclusions, Some(Vec::new()));
    assert_eq!(result.graph.children(b.target).count(), 0);
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_rejected_dependency_is_never_resolved() {
    let repo = CountingRepository::new(
        InMemoryRepository::new()
            .with_artifact(
                coord("g:a:1"),
                vec![dep_scoped("g:t:1", "test"), dep("g:c:1")],
            )
            .with_artifact(coord("g:c:1"), Vec::new()),
    );
    let result = counting_builder(&repo)
        .selector(standard_selector(&["test".to_string()], false))
        .build()
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap();

    assert_eq!(repo.calls_for("g:t"), 0);
    assert_eq!(edges_named(&result.graph, "t").count(), 0);
    assert_eq!(edges_named(&result.graph, "c").count(), 1);
}

#[test]
fn test_rejecting_selector_makes_no_calls() {
    let repo = CountingRepository::new(
        InMemoryRepository::new().with_artifact(coord("g:a:1"), Vec::new()),
    );
    let result = counting_builder(&repo)
        .selector(Arc::new(StaticSelector::new(false)))
        .build()
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap();

    assert_eq!(repo.range_calls(), 0);
    assert_eq!(repo.descriptor_calls(), 0);
    assert_eq!(result.graph.edge_count(), 0);
}

#[test]
fn test_scope_filter_spares_direct_dependencies() {
    let repo = InMemoryRepository::new().with_artifact(coord("g:t:1"), Vec::new());
    let repo = Arc::new(repo);
    let collector = Collector::builder(repo.clone(), repo)
        .selector(standard_selector(&["test".to_string()], true))
        .build();
    let result = collector
        .collect(&session(), request(vec![dep_scoped("g:t:1", "test")]))
        .unwrap();
    assert_eq!(edges_named(&result.graph, "t").count(), 1);
}

// ============================================================================
// Relocation
// ============================================================================

#[test]
fn test_relocation_chain_yields_single_edge() {
    let repo = InMemoryRepository::new()
        .with_descriptor(Descriptor::empty(coord("g:a:1")).with_relocation(coord("g:a2:1")))
        .with_descriptor(Descriptor::empty(coord("g:a2:1")).with_relocation(coord("g:a3:1")))
        .with_artifact(coord("g:a3:1"), Vec::new());
    let result = collector(repo)
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap();

    let edges: Vec<_> = result.graph.children(result.root()).collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].edge.artifact().name(), "a3");
    let chain: Vec<String> = edges[0]
        .edge
        .relocations
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(chain, vec!["g:a:jar:1", "g:a2:jar:1"]);
}

#[test]
fn test_relocation_cycle_is_a_descriptor_failure() {
    let repo = InMemoryRepository::new()
        .with_descriptor(Descriptor::empty(coord("g:a:1")).with_relocation(coord("g:b:1")))
        .with_descriptor(Descriptor::empty(coord("g:b:1")).with_relocation(coord("g:a:1")));
    let err = collector(repo)
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap_err();
    let result = err.into_result();

    assert_eq!(result.exceptions.len(), 1);
    match &result.exceptions[0] {
        CollectionError::Descriptor {
            source: DescriptorError::RelocationCycle { chain, .. },
            ..
        } => assert_eq!(chain, &vec!["g:a:jar:1", "g:b:jar:1", "g:a:jar:1"]),
        other => panic!("unexpected failure: {other}"),
    }
    let edge = result.graph.children(result.root()).next().unwrap();
    assert_eq!(edge.edge.outcome, EdgeOutcome::Failed);
}

#[test]
fn test_relocation_to_own_range_is_a_descriptor_failure() {
    // The target only matches once its range resolves back to g:a:1.
    let repo = InMemoryRepository::new()
        .with_descriptor(Descriptor::empty(coord("g:a:1")).with_relocation(coord("g:a:[1,2)")));
    let result = collector(repo)
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap_err()
        .into_result();

    assert_eq!(result.exceptions.len(), 1);
    assert!(matches!(
        &result.exceptions[0],
        CollectionError::Descriptor {
            source: DescriptorError::RelocationCycle { .. },
            ..
        }
    ));
    let edges: Vec<_> = result.graph.children(result.root()).collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].edge.outcome, EdgeOutcome::Failed);
    assert_eq!(edges[0].edge.relocations.len(), 1);
}

#[test]
fn test_relocation_within_same_name_bypasses_management() {
    // Managing a back to 3 after the 3 -> 4 relocation would loop; the
    // relocation target's version must win instead.
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:p:1"), vec![dep("g:a:1")])
        .with_descriptor(Descriptor::empty(coord("g:a:3")).with_relocation(coord("g:a:4")))
        .with_artifact(coord("g:a:4"), Vec::new());
    let result = managed_collector(repo)
        .collect(
            &session(),
            request(vec![dep("g:p:1")]).with_managed_dependency(managed("g:a:3")),
        )
        .unwrap();

    let a = edges_named(&result.graph, "a").next().unwrap();
    assert_eq!(a.edge.version.as_str(), "4");
    assert_eq!(a.edge.relocations.len(), 1);
    assert_eq!(a.edge.relocations[0].version(), "3");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failed_branch_does_not_stop_siblings() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:b:1.0"), Vec::new())
        .with_artifact(coord("g:c:1"), vec![dep("g:d:1")])
        .with_artifact(coord("g:d:1"), Vec::new());
    let err = collector(repo)
        .collect(
            &session(),
            request(vec![dep("g:b:[5,6)"), dep("g:c:1")]),
        )
        .unwrap_err();
    assert!(err.to_string().contains("g:b"));

    let result = err.into_result();
    assert!(!result.is_success());
    assert_eq!(result.exceptions.len(), 1);
    assert_eq!(
        result.exceptions[0].dependency().map(|d| d.artifact().name()),
        Some("b")
    );

    let expected = "\
test:app:jar:1.0
\\- g:c:jar:1 (compile)
   \\- g:d:jar:1 (compile)
";
    assert_eq!(result.graph.render_tree(), expected);
}

#[test]
fn test_failure_path_names_ancestors() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:b:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:gone:[2,)")]);
    let err = collector(repo)
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap_err();
    match &err.result().exceptions[0] {
        CollectionError::RangeResolution { path, .. } => {
            assert_eq!(path, &vec!["test:app:jar:1.0", "g:a:jar:1", "g:b:jar:1"]);
        }
        other => panic!("unexpected failure: {other}"),
    }
}

#[test]
fn test_exceptions_are_capped() {
    let config = CollectorConfig {
        max_exceptions: 2,
        ..CollectorConfig::default()
    };
    let err = collector_with(InMemoryRepository::new(), config)
        .collect(
            &session(),
            request(vec![dep("g:x:[9,)"), dep("g:y:[9,)"), dep("g:z:[9,)")]),
        )
        .unwrap_err();
    assert_eq!(err.result().exceptions.len(), 2);
}

#[test]
fn test_transformer_failure_is_reported() {
    struct Rejecting;

    impl GraphTransformer for Rejecting {
        fn transform(&self, graph: &mut DependencyGraph) -> Result<(), CollectionError> {
            Err(CollectionError::transform(format!(
                "{} edges is too many",
                graph.edge_count()
            )))
        }
    }

    let repo = Arc::new(InMemoryRepository::new().with_artifact(coord("g:a:1"), Vec::new()));
    let collector = Collector::builder(repo.clone(), repo)
        .transformer(Arc::new(Rejecting))
        .build();
    let err = collector
        .collect(&session(), request(vec![dep("g:a:1")]))
        .unwrap_err();
    assert_eq!(
        err.result().exceptions,
        vec![CollectionError::transform("1 edges is too many")]
    );
}

#[test]
fn test_failures_past_the_cap_still_fail_the_request() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:b:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:a:1")]);
    let config = CollectorConfig {
        max_exceptions: 0,
        max_cycles: 0,
        ..CollectorConfig::default()
    };
    let err = collector_with(repo, config)
        .collect(&session(), request(vec![dep("g:a:1"), dep("g:gone:[5,6)")]))
        .unwrap_err();
    assert!(err.to_string().contains("1 problem(s)"));

    let result = err.into_result();
    assert!(!result.is_success());
    assert!(result.exceptions.is_empty());
    assert_eq!(result.failure_count(), 1);
    assert!(result.cycles.is_empty());
    assert!(result.has_cycles());
    assert_eq!(result.cycle_count(), 1);
}

#[test]
fn test_cached_descriptor_failure_is_reported_per_branch() {
    let repo = CountingRepository::new(
        InMemoryRepository::new()
            .with_artifact(coord("g:a:1"), vec![dep("g:m:1")])
            .with_artifact(coord("g:b:1"), vec![dep("g:m:1")])
            .with_missing_descriptor(coord("g:m:1")),
    );
    let result = counting_builder(&repo)
        .build()
        .collect(&session(), request(vec![dep("g:a:1"), dep("g:b:1")]))
        .unwrap_err()
        .into_result();

    // a, b and a single read of m
    assert_eq!(repo.descriptor_calls(), 3);
    assert_eq!(result.exceptions.len(), 2);
    for exception in &result.exceptions {
        assert_eq!(exception.dependency().map(|d| d.artifact().name()), Some("m"));
    }
    let failed: Vec<_> = edges_named(&result.graph, "m")
        .map(|e| e.edge.outcome)
        .collect();
    assert_eq!(failed, vec![EdgeOutcome::Failed, EdgeOutcome::Failed]);
}

// ============================================================================
// Descriptor policy
// ============================================================================

fn policy_repo() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_missing_descriptor(coord("g:m:1"))
        .with_invalid_descriptor(coord("g:i:1"), "truncated")
}

fn with_policy(policy: DescriptorPolicy) -> Collector {
    collector_with(
        policy_repo(),
        CollectorConfig {
            descriptor_policy: policy,
            ..CollectorConfig::default()
        },
    )
}

#[test]
fn test_strict_policy_records_missing_descriptor() {
    let err = with_policy(DescriptorPolicy::Strict)
        .collect(&session(), request(vec![dep("g:m:1")]))
        .unwrap_err();
    let result = err.into_result();
    match &result.exceptions[0] {
        CollectionError::Descriptor { source, .. } => assert!(source.is_missing()),
        other => panic!("unexpected failure: {other}"),
    }
    let edge = result.graph.children(result.root()).next().unwrap();
    assert_eq!(edge.edge.outcome, EdgeOutcome::Failed);
    assert!(result.graph.render_tree().contains("g:m:jar:1 (compile) [failed]"));
    assert_eq!(result.graph.snapshot().unresolved().count(), 1);
}

#[test]
fn test_ignore_missing_tolerates_only_missing() {
    let collector = with_policy(DescriptorPolicy::IgnoreMissing);
    let result = collector
        .collect(&session(), request(vec![dep("g:m:1")]))
        .unwrap();
    let edge = result.graph.children(result.root()).next().unwrap();
    assert_eq!(edge.edge.outcome, EdgeOutcome::Expanded);

    assert!(collector
        .collect(&session(), request(vec![dep("g:i:1")]))
        .is_err());
}

#[test]
fn test_ignore_errors_tolerates_invalid() {
    let result = with_policy(DescriptorPolicy::IgnoreErrors)
        .collect(&session(), request(vec![dep("g:m:1"), dep("g:i:1")]))
        .unwrap();
    assert_eq!(result.graph.edge_count(), 2);
}

// ============================================================================
// Repository widening
// ============================================================================

fn corp() -> RemoteRepository {
    RemoteRepository::new("corp", "https://repo.example/corp")
}

#[test]
fn test_descriptor_failure_is_not_reused_under_wider_repositories() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:x:1"), vec![dep("g:lib:1")])
        .with_descriptor(
            Descriptor::empty(coord("g:y:1"))
                .with_dependencies(vec![dep("g:lib:1")])
                .with_repositories(vec![corp()]),
        )
        .with_descriptor_in(corp(), Descriptor::empty(coord("g:lib:1")));
    let result = collector(repo)
        .collect(&session(), request(vec![dep("g:x:1"), dep("g:y:1")]))
        .unwrap_err()
        .into_result();

    assert_eq!(result.exceptions.len(), 1);
    match &result.exceptions[0] {
        CollectionError::Descriptor { path, .. } => {
            assert_eq!(path.last().map(String::as_str), Some("g:x:jar:1"));
        }
        other => panic!("unexpected failure: {other}"),
    }
    let outcomes: Vec<_> = edges_named(&result.graph, "lib")
        .map(|e| e.edge.outcome)
        .collect();
    assert_eq!(outcomes, vec![EdgeOutcome::Failed, EdgeOutcome::Expanded]);
}

#[test]
fn test_wider_repositories_do_not_reuse_narrower_subtree() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:x:1"), vec![dep("g:lib:1")])
        .with_descriptor(
            Descriptor::empty(coord("g:y:1"))
                .with_dependencies(vec![dep("g:lib:1")])
                .with_repositories(vec![corp()]),
        )
        .with_artifact(coord("g:lib:1"), vec![dep("g:util:1")])
        .with_descriptor_in(corp(), Descriptor::empty(coord("g:util:1")));
    let result = collector(repo)
        .collect(&session(), request(vec![dep("g:x:1"), dep("g:y:1")]))
        .unwrap_err()
        .into_result();
    let graph = &result.graph;

    let libs: Vec<_> = edges_named(graph, "lib").map(|e| e.target).collect();
    assert_eq!(libs.len(), 2);
    assert_ne!(libs[0], libs[1]);

    let util_under = |i: usize| graph.children(libs[i]).next().map(|e| e.edge.outcome);
    assert_eq!(util_under(0), Some(EdgeOutcome::Failed));
    assert_eq!(util_under(1), Some(EdgeOutcome::Expanded));
    assert_eq!(result.exceptions.len(), 1);
}

// ============================================================================
// Root handling
// ============================================================================

#[test]
fn test_root_dependency_declarations_merge_under_request() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:lib:1"), vec![dep("g:x:1"), dep("g:y:1")])
        .with_artifact(coord("g:x:1"), Vec::new())
        .with_artifact(coord("g:x:2"), Vec::new())
        .with_artifact(coord("g:y:1"), Vec::new());
    let request = CollectRequest::new()
        .with_root(dep("g:lib:1"))
        .with_dependency(dep("g:x:2"))
        .with_repository(common::central());
    let result = collector(repo).collect(&session(), request).unwrap();

    let root = result.graph.root_dependency().unwrap();
    assert_eq!(root.version.as_str(), "1");
    let expected = "\
g:lib:jar:1 (compile)
+- g:x:jar:2 (compile)
\\- g:y:jar:1 (compile)
";
    assert_eq!(result.graph.render_tree(), expected);
}

#[test]
fn test_root_failure_is_immediate_and_strict() {
    let repo = CountingRepository::new(
        InMemoryRepository::new().with_artifact(coord("g:a:1"), Vec::new()),
    );
    let config = CollectorConfig {
        descriptor_policy: DescriptorPolicy::IgnoreErrors,
        ..CollectorConfig::default()
    };
    let request = CollectRequest::new()
        .with_root(dep("g:ghost:1"))
        .with_dependency(dep("g:a:1"))
        .with_repository(common::central());
    let err = counting_builder(&repo)
        .config(config)
        .build()
        .collect(&session(), request)
        .unwrap_err();

    let result = err.into_result();
    assert_eq!(result.graph.node_count(), 1);
    assert_eq!(result.graph.edge_count(), 0);
    assert_eq!(result.exceptions.len(), 1);
    assert_eq!(repo.calls_for("g:a"), 0);
}

#[test]
fn test_request_without_repositories_uses_defaults() {
    let scoped = common::central();
    let repo = InMemoryRepository::new()
        .with_descriptor_in(scoped.clone(), Descriptor::empty(coord("g:a:1")));
    let repo = Arc::new(repo);
    let collector = Collector::builder(repo.clone(), repo)
        .repositories(vec![scoped.clone()])
        .build();

    let request = CollectRequest::new().with_dependency(dep("g:a:1"));
    let result = collector.collect(&session(), request).unwrap();
    let edge = result.graph.children(result.root()).next().unwrap();
    let node = result.graph.node(edge.target).unwrap();
    assert_eq!(node.repositories().to_vec(), vec![scoped]);
}

// ============================================================================
// Session reuse
// ============================================================================

#[test]
fn test_session_cache_serves_second_collection() {
    let repo = CountingRepository::new(
        InMemoryRepository::new()
            .with_artifact(coord("g:a:1"), vec![dep("g:b:[1,)")])
            .with_artifact(coord("g:b:1.0"), Vec::new())
            .with_artifact(coord("g:b:1.1"), Vec::new()),
    );
    let collector = counting_builder(&repo).build();
    let session = session();

    let first = collector
        .collect(&session, request(vec![dep("g:a:1")]))
        .unwrap();
    let (ranges, descriptors) = (repo.range_calls(), repo.descriptor_calls());
    assert_eq!((ranges, descriptors), (2, 2));
    assert_eq!(session.cache().node_count(), 0);

    session.cache().reset_metrics();
    let second = collector
        .collect(&session, request(vec![dep("g:a:1")]))
        .unwrap();
    assert_eq!(repo.range_calls(), ranges);
    assert_eq!(repo.descriptor_calls(), descriptors);
    assert_ne!(first.graph.id(), second.graph.id());
    assert_eq!(first.graph.render_tree(), second.graph.render_tree());

    let metrics = session.cache().metrics();
    assert_eq!(metrics.constraints.hits, 2);
    assert_eq!(metrics.descriptors.hits, 2);
}

#[test]
fn test_concurrent_collections_share_a_session() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:c:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:c:1")])
        .with_artifact(coord("g:c:1"), Vec::new());
    let collector = collector(repo);
    let session = session();

    let trees: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                let collector = &collector;
                scope.spawn(move || {
                    collector
                        .collect(&session, request(vec![dep("g:a:1"), dep("g:b:1")]))
                        .map(|r| r.graph.render_tree())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    assert!(trees.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(session.cache().node_count(), 0);
}

// ============================================================================
// Pool
// ============================================================================

#[test]
fn test_pool_returns_first_instance() {
    let pool = InternPool::new();
    let first = pool.intern_artifact(coord("g:a:1.0"));
    let second = pool.intern_artifact(coord("g:a:1.0"));
    assert!(Arc::ptr_eq(&first, &second));

    let later = pool.intern_artifact(coord("g:a:1.0"));
    assert!(Arc::ptr_eq(&first, &later));
    assert_eq!(pool.artifact_count(), 1);

    drop((first, second, later));
    pool.purge();
    assert_eq!(pool.artifact_count(), 0);
}

#[test]
fn test_graph_artifacts_come_from_session_pool() {
    let repo = InMemoryRepository::new()
        .with_artifact(coord("g:a:1"), vec![dep("g:c:1")])
        .with_artifact(coord("g:b:1"), vec![dep("g:c:1")])
        .with_artifact(coord("g:c:1"), Vec::new());
    let session = session();
    let result = collector(repo)
        .collect(&session, request(vec![dep("g:a:1"), dep("g:b:1")]))
        .unwrap();

    let c = edges_named(&result.graph, "c").next().unwrap();
    let pooled = session.pool().intern_artifact(coord("g:c:1"));
    assert!(Arc::ptr_eq(c.edge.dependency.artifact_arc(), &pooled));
}
