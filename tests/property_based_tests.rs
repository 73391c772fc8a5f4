//! Property-Based Tests for genforge
//!
//! Scheduler invariants over random graphs:
//! - Completeness: the flattened layers are a permutation of the input
//! - Topological validity: on acyclic graphs every dependency sits in a
//!   strictly earlier layer than its dependent
//! - Arbitrary (possibly cyclic) graphs never fail and never drop artifacts
//!
//! ## Configuration
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//! - `PROPTEST_MAX_SHRINK_ITERS`: Max shrinking iterations on failure (default: 1000)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::env;

use genforge::{Artifact, DependencyGraph, LayerScheduler, Schedule, plan};

/// Default number of test cases per property.
const DEFAULT_PROPTEST_CASES: u32 = 64;

/// Default max shrink iterations.
const DEFAULT_MAX_SHRINK_ITERS: u32 = 1000;

/// Creates a ProptestConfig that respects `PROPTEST_CASES` and
/// `PROPTEST_MAX_SHRINK_ITERS`.
fn proptest_config(max_cases: Option<u32>) -> ProptestConfig {
    let env_cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);

    let env_shrink_iters = env::var("PROPTEST_MAX_SHRINK_ITERS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_SHRINK_ITERS);

    let cases = match max_cases {
        Some(max) => env_cases.min(max),
        None => env_cases,
    };

    ProptestConfig {
        cases,
        max_shrink_iters: env_shrink_iters,
        max_shrink_time: 30000,
        ..ProptestConfig::default()
    }
}

fn node(i: usize) -> String {
    format!("node{i}.txt")
}

/// Random DAG: node `i` may only depend on nodes with a smaller index, and
/// the input order is shuffled so it does not match the topological order.
fn arb_dag() -> impl Strategy<Value = (Vec<String>, Vec<(usize, usize)>)> {
    (1usize..16).prop_flat_map(|n| {
        let edges = prop::collection::vec((1..n.max(2), any::<prop::sample::Index>()), 0..n * 2)
            .prop_map(move |raw| {
                raw.into_iter()
                    .filter(|(from, _)| *from < n)
                    .map(|(from, to)| (from, to.index(from)))
                    .collect::<Vec<_>>()
            });
        let order = Just((0..n).map(node).collect::<Vec<_>>()).prop_shuffle();
        (order, edges)
    })
}

/// Random directed graph with arbitrary edges, cycles included.
fn arb_graph() -> impl Strategy<Value = (Vec<String>, Vec<(usize, usize)>)> {
    (1usize..12).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..n * 3);
        let order = Just((0..n).map(node).collect::<Vec<_>>()).prop_shuffle();
        (order, edges)
    })
}

fn schedule_for(order: &[String], edges: &[(usize, usize)]) -> Schedule {
    let mut graph = DependencyGraph::new();
    for (from, to) in edges {
        graph.add_edge(&node(*from), &node(*to));
    }
    let artifacts: Vec<Artifact> = order.iter().map(Artifact::new).collect();
    LayerScheduler::new()
        .schedule(&graph, &artifacts)
        .expect("well-formed input schedules")
}

fn assert_permutation(schedule: &Schedule, order: &[String]) -> Result<(), TestCaseError> {
    let flat: Vec<&str> = schedule.flattened().collect();
    prop_assert_eq!(flat.len(), order.len());
    let unique: BTreeSet<&str> = flat.iter().copied().collect();
    prop_assert_eq!(unique.len(), order.len());
    for path in order {
        prop_assert!(unique.contains(path.as_str()), "missing {}", path);
    }
    prop_assert_eq!(schedule.order.len(), order.len());
    Ok(())
}

proptest! {
    #![proptest_config(proptest_config(None))]

    #[test]
    fn prop_dag_layers_are_complete_and_topological((order, edges) in arb_dag()) {
        let schedule = schedule_for(&order, &edges);

        assert_permutation(&schedule, &order)?;
        prop_assert!(schedule.warnings.is_empty());
        for (from, to) in &edges {
            let dependent = schedule.layer_of(&node(*from)).unwrap();
            let dependency = schedule.layer_of(&node(*to)).unwrap();
            prop_assert!(
                dependency < dependent,
                "{} (layer {}) must precede {} (layer {})",
                node(*to), dependency, node(*from), dependent
            );
        }
    }

    #[test]
    fn prop_dag_order_is_topological((order, edges) in arb_dag()) {
        let schedule = schedule_for(&order, &edges);

        let position = |path: &str| schedule.order.iter().position(|p| p == path).unwrap();
        for (from, to) in &edges {
            prop_assert!(position(&node(*to)) < position(&node(*from)));
        }
    }

    #[test]
    fn prop_arbitrary_graphs_never_drop_artifacts((order, edges) in arb_graph()) {
        let schedule = schedule_for(&order, &edges);

        assert_permutation(&schedule, &order)?;
        prop_assert!(schedule.layers.iter().all(|layer| !layer.is_empty()));
    }

    #[test]
    fn prop_scheduling_is_deterministic((order, edges) in arb_graph()) {
        let first = schedule_for(&order, &edges);
        let second = schedule_for(&order, &edges);
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(proptest_config(Some(32)))]

    #[test]
    fn prop_default_rules_on_web_batches(
        pages in 0usize..4,
        styles in 0usize..4,
        scripts in 0usize..4,
    ) {
        let mut artifacts = Vec::new();
        artifacts.extend((0..scripts).map(|i| Artifact::new(format!("app{i}.js"))));
        artifacts.extend((0..styles).map(|i| Artifact::new(format!("style{i}.css"))));
        artifacts.extend((0..pages).map(|i| Artifact::new(format!("page{i}.html"))));

        let schedule = plan(&artifacts).unwrap();

        let expected_layers =
            usize::from(pages > 0) + usize::from(styles > 0) + usize::from(scripts > 0);
        prop_assert_eq!(schedule.layers.len(), expected_layers);
        if pages > 0 {
            prop_assert!(schedule.layers[0].iter().all(|p| p.ends_with(".html")));
        }
        if let Some(last) = schedule.layers.last() && scripts > 0 {
            prop_assert!(last.iter().all(|p| p.ends_with(".js")));
        }
    }
}
