//! Dependency rules between artifacts
//!
//! Two sources of edges: a [`RuleTable`] mapping a category to the categories
//! that must exist before it, and [`IntraCategoryHeuristic`] implementations
//! that order artifacts inside one category.

use std::collections::BTreeMap;

use crate::artifact::{Artifact, Category};

/// Category → prerequisite categories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleTable {
    prerequisites: BTreeMap<Category, Vec<Category>>,
}

impl RuleTable {
    /// Empty table: no cross-category edges.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Markup first, then stylesheets, then scripts.
    #[must_use]
    pub fn web() -> Self {
        Self::empty()
            .rule(Category::Stylesheet, &[Category::Markup])
            .rule(Category::Script, &[Category::Markup, Category::Stylesheet])
    }

    /// Declare that `category` depends on every artifact of each of `prerequisites`.
    #[must_use]
    pub fn rule(mut self, category: Category, prerequisites: &[Category]) -> Self {
        let entry = self.prerequisites.entry(category).or_default();
        for prerequisite in prerequisites {
            if *prerequisite != category && !entry.contains(prerequisite) {
                entry.push(*prerequisite);
            }
        }
        self
    }

    #[must_use]
    pub fn prerequisites(&self, category: Category) -> &[Category] {
        self.prerequisites
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Orders artifacts within a single category.
pub trait IntraCategoryHeuristic: Send + Sync {
    /// Category this heuristic applies to
    fn category(&self) -> Category;

    /// Paths among `peers` that `artifact` depends on. `peers` holds every
    /// artifact of [`category`](Self::category), `artifact` included.
    fn dependencies(&self, artifact: &Artifact, peers: &[&Artifact]) -> Vec<String>;
}

/// Stems treated as foundation modules by default
pub const DEFAULT_FOUNDATION_STEMS: &[&str] = &["utils", "config", "models", "constants", "base"];

/// Foundation modules are leaves; every other module depends on all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundationModules {
    category: Category,
    stems: Vec<String>,
}

impl FoundationModules {
    #[must_use]
    pub fn new(category: Category, stems: &[&str]) -> Self {
        Self {
            category,
            stems: stems.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    /// The default allowlist applied to Python modules.
    #[must_use]
    pub fn python() -> Self {
        Self::new(Category::Python, DEFAULT_FOUNDATION_STEMS)
    }

    #[must_use]
    pub fn is_foundation(&self, artifact: &Artifact) -> bool {
        artifact
            .stem()
            .is_some_and(|stem| self.stems.iter().any(|s| s.eq_ignore_ascii_case(stem)))
    }
}

impl IntraCategoryHeuristic for FoundationModules {
    fn category(&self) -> Category {
        self.category
    }

    fn dependencies(&self, artifact: &Artifact, peers: &[&Artifact]) -> Vec<String> {
        if self.is_foundation(artifact) {
            return Vec::new();
        }
        peers
            .iter()
            .filter(|peer| peer.path != artifact.path && self.is_foundation(peer))
            .map(|peer| peer.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_rules() {
        let rules = RuleTable::web();
        assert_eq!(rules.prerequisites(Category::Stylesheet), &[Category::Markup]);
        assert_eq!(
            rules.prerequisites(Category::Script),
            &[Category::Markup, Category::Stylesheet]
        );
        assert!(rules.prerequisites(Category::Markup).is_empty());
        assert!(rules.prerequisites(Category::Unknown).is_empty());
    }

    #[test]
    fn test_rule_ignores_self_and_duplicates() {
        let rules = RuleTable::empty()
            .rule(Category::Data, &[Category::Data, Category::Markup])
            .rule(Category::Data, &[Category::Markup]);
        assert_eq!(rules.prerequisites(Category::Data), &[Category::Markup]);
    }

    #[test]
    fn test_foundation_heuristic() {
        let heuristic = FoundationModules::python();
        let utils = Artifact::new("pkg/utils.py");
        let config = Artifact::new("Config.py");
        let service = Artifact::new("service.py");
        let peers = vec![&utils, &config, &service];

        assert!(heuristic.dependencies(&utils, &peers).is_empty());
        assert_eq!(
            heuristic.dependencies(&service, &peers),
            vec!["pkg/utils.py".to_string(), "Config.py".to_string()]
        );
    }

    #[test]
    fn test_foundation_requires_exact_stem() {
        let heuristic = FoundationModules::python();
        assert!(!heuristic.is_foundation(&Artifact::new("string_utils.py")));
        assert!(heuristic.is_foundation(&Artifact::new("models.py")));
    }
}
