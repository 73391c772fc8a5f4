//! Dependency graph construction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::artifact::Artifact;
use crate::rules::{FoundationModules, IntraCategoryHeuristic, RuleTable};

/// Artifact path → paths it depends on.
///
/// Every artifact passed to [`DependencyGraphBuilder::build`] is a key, even
/// when it has no dependencies. Dependency lists are free of duplicates and
/// self-edges and keep the order edges were discovered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` with no dependencies if it is not already present.
    pub fn add_node(&mut self, path: impl Into<String>) {
        self.edges.entry(path.into()).or_default();
    }

    /// Record that `from` depends on `to`. Self-edges and repeats are dropped.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let deps = self.edges.entry(from.to_string()).or_default();
        if from != to && !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
    }

    /// Dependencies of `path`; empty for unknown paths.
    #[must_use]
    pub fn dependencies(&self, path: &str) -> &[String] {
        self.edges.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.edges.contains_key(path)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Builds a [`DependencyGraph`] from a rule table and intra-category heuristics.
pub struct DependencyGraphBuilder {
    rules: RuleTable,
    heuristics: Vec<Box<dyn IntraCategoryHeuristic>>,
}

impl Default for DependencyGraphBuilder {
    /// Web ordering rules plus the Python foundation-module heuristic.
    fn default() -> Self {
        Self::new(RuleTable::web()).with_heuristic(FoundationModules::python())
    }
}

impl DependencyGraphBuilder {
    #[must_use]
    pub fn new(rules: RuleTable) -> Self {
        Self {
            rules,
            heuristics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_heuristic(mut self, heuristic: impl IntraCategoryHeuristic + 'static) -> Self {
        self.heuristics.push(Box::new(heuristic));
        self
    }

    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Build the graph. Never fails: unknown categories have no prerequisites.
    #[must_use]
    pub fn build(&self, artifacts: &[Artifact]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        for artifact in artifacts {
            graph.add_node(artifact.path.clone());

            for prerequisite in self.rules.prerequisites(artifact.category) {
                for other in artifacts.iter().filter(|a| a.category == *prerequisite) {
                    graph.add_edge(&artifact.path, &other.path);
                }
            }

            for heuristic in self
                .heuristics
                .iter()
                .filter(|h| h.category() == artifact.category)
            {
                let peers: Vec<&Artifact> = artifacts
                    .iter()
                    .filter(|a| a.category == artifact.category)
                    .collect();
                for dependency in heuristic.dependencies(artifact, &peers) {
                    graph.add_edge(&artifact.path, &dependency);
                }
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Category;

    #[test]
    fn test_every_artifact_is_a_key() {
        let artifacts = vec![Artifact::new("README"), Artifact::new("notes.bin")];
        let graph = DependencyGraphBuilder::default().build(&artifacts);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains("README"));
        assert!(graph.dependencies("notes.bin").is_empty());
    }

    #[test]
    fn test_web_edges() {
        let artifacts = vec![
            Artifact::new("index.html"),
            Artifact::new("about.html"),
            Artifact::new("style.css"),
            Artifact::new("app.js"),
        ];
        let graph = DependencyGraphBuilder::default().build(&artifacts);

        assert!(graph.dependencies("index.html").is_empty());
        assert_eq!(graph.dependencies("style.css"), &["index.html", "about.html"]);
        assert_eq!(
            graph.dependencies("app.js"),
            &["index.html", "about.html", "style.css"]
        );
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn test_edges_are_deduplicated() {
        let rules = RuleTable::empty().rule(Category::Script, &[Category::Markup]);
        let builder = DependencyGraphBuilder::new(rules).with_heuristic(
            FoundationModules::new(Category::Script, &["index"]),
        );
        let artifacts = vec![
            Artifact::with_category("index.js", Category::Script),
            Artifact::new("main.js"),
            Artifact::new("page.html"),
        ];
        let graph = builder.build(&artifacts);
        assert_eq!(graph.dependencies("main.js"), &["page.html", "index.js"]);

        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        graph.add_edge("a", "a");
        assert_eq!(graph.dependencies("a"), &["b"]);
    }

    #[test]
    fn test_foundation_modules() {
        let artifacts = vec![
            Artifact::new("utils.py"),
            Artifact::new("config.py"),
            Artifact::new("service.py"),
        ];
        let graph = DependencyGraphBuilder::default().build(&artifacts);
        assert!(graph.dependencies("utils.py").is_empty());
        assert!(graph.dependencies("config.py").is_empty());
        assert_eq!(graph.dependencies("service.py"), &["utils.py", "config.py"]);
    }
}
