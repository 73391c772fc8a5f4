//! Layer scheduling
//!
//! Kahn's algorithm produces a total order; layering then groups artifacts
//! whose dependencies are all satisfied by earlier layers. Cycles never fail
//! the schedule: the cyclic remainder is appended in input order and reported
//! as a [`ScheduleWarning::CircularDependency`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::graph::DependencyGraph;
use genforge_utils::error::PlanError;

/// Non-fatal scheduling findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleWarning {
    /// These artifacts could not be topologically ordered and were appended
    /// in input order.
    CircularDependency { paths: Vec<String> },
    /// No artifact was ready, so this one was placed in its own layer.
    ForcedLayer { path: String },
}

/// Result of scheduling: a total order and the concurrency layers built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub order: Vec<String>,
    pub layers: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScheduleWarning>,
}

impl Schedule {
    /// Index of the layer containing `path`.
    #[must_use]
    pub fn layer_of(&self, path: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.iter().any(|p| p == path))
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ScheduleWarning::CircularDependency { .. }))
    }

    /// All layers flattened, in layer order.
    pub fn flattened(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().flatten().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayerScheduler;

impl LayerScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Schedule `artifacts` according to `graph`.
    ///
    /// Edges to paths outside `artifacts` are ignored.
    ///
    /// # Errors
    ///
    /// `PlanError::EmptyPath` or `PlanError::DuplicateArtifact` for malformed input.
    pub fn schedule(
        &self,
        graph: &DependencyGraph,
        artifacts: &[Artifact],
    ) -> Result<Schedule, PlanError> {
        let paths = validate(artifacts)?;
        let in_set: HashSet<&str> = paths.iter().copied().collect();

        let deps: HashMap<&str, Vec<&str>> = paths
            .iter()
            .map(|&path| {
                let local: Vec<&str> = graph
                    .dependencies(path)
                    .iter()
                    .map(String::as_str)
                    .filter(|d| *d != path && in_set.contains(d))
                    .collect();
                (path, local)
            })
            .collect();

        let mut warnings = Vec::new();
        let order = topological_order(&paths, &deps, &mut warnings);
        let layers = build_layers(&order, &paths, &deps, &mut warnings);
        let schedule = Schedule {
            order,
            layers,
            warnings,
        };

        debug!(
            artifacts = paths.len(),
            layers = schedule.layers.len(),
            "Scheduled artifacts"
        );

        Ok(schedule)
    }
}

fn validate(artifacts: &[Artifact]) -> Result<Vec<&str>, PlanError> {
    let mut seen = HashSet::with_capacity(artifacts.len());
    let mut paths = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = artifact.path.as_str();
        if path.trim().is_empty() {
            return Err(PlanError::EmptyPath);
        }
        if !seen.insert(path) {
            return Err(PlanError::DuplicateArtifact {
                path: path.to_string(),
            });
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Kahn's algorithm seeded in input order; the cyclic remainder is appended
/// in input order.
fn topological_order(
    paths: &[&str],
    deps: &HashMap<&str, Vec<&str>>,
    warnings: &mut Vec<ScheduleWarning>,
) -> Vec<String> {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(paths.len());
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::with_capacity(paths.len());

    for &path in paths {
        let local = deps.get(path).map_or(&[][..], Vec::as_slice);
        in_degree.insert(path, local.len());
        for &dep in local {
            dependents.entry(dep).or_default().push(path);
        }
    }

    let mut queue: VecDeque<&str> = paths
        .iter()
        .copied()
        .filter(|p| in_degree.get(p).copied().unwrap_or(0) == 0)
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(paths.len());
    let mut placed: HashSet<&str> = HashSet::with_capacity(paths.len());

    while let Some(path) = queue.pop_front() {
        order.push(path.to_string());
        placed.insert(path);

        if let Some(children) = dependents.get(path) {
            for &child in children {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
    }

    if order.len() < paths.len() {
        let remainder: Vec<String> = paths
            .iter()
            .filter(|p| !placed.contains(*p))
            .map(|p| (*p).to_string())
            .collect();
        warn!(
            count = remainder.len(),
            paths = ?remainder,
            "Circular dependency detected; appending remaining artifacts in input order"
        );
        order.extend(remainder.iter().cloned());
        warnings.push(ScheduleWarning::CircularDependency { paths: remainder });
    }

    order
}

/// Repeatedly take every unprocessed artifact whose dependencies are all
/// processed. When nothing qualifies, force the first unprocessed artifact in
/// input order into a singleton layer.
fn build_layers(
    order: &[String],
    paths: &[&str],
    deps: &HashMap<&str, Vec<&str>>,
    warnings: &mut Vec<ScheduleWarning>,
) -> Vec<Vec<String>> {
    let mut processed: HashSet<&str> = HashSet::with_capacity(order.len());
    let mut layers: Vec<Vec<String>> = Vec::new();

    while processed.len() < paths.len() {
        let layer: Vec<&str> = order
            .iter()
            .map(String::as_str)
            .filter(|p| !processed.contains(p))
            .filter(|p| {
                deps.get(p)
                    .is_none_or(|ds| ds.iter().all(|d| processed.contains(d)))
            })
            .collect();

        if layer.is_empty() {
            let Some(&forced) = paths.iter().find(|p| !processed.contains(*p)) else {
                break;
            };
            warn!(path = %forced, "No artifact ready; forcing singleton layer");
            warnings.push(ScheduleWarning::ForcedLayer {
                path: forced.to_string(),
            });
            processed.insert(forced);
            layers.push(vec![forced.to_string()]);
            continue;
        }

        for &path in &layer {
            processed.insert(path);
        }
        layers.push(layer.into_iter().map(str::to_string).collect());
    }

    layers
}

/// Build the default graph for `artifacts` and schedule it.
///
/// # Errors
///
/// Same as [`LayerScheduler::schedule`].
pub fn plan(artifacts: &[Artifact]) -> Result<Schedule, PlanError> {
    let graph = crate::graph::DependencyGraphBuilder::default().build(artifacts);
    LayerScheduler::new().schedule(&graph, artifacts)
}
