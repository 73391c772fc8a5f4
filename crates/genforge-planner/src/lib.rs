//! Artifact planning for genforge
//!
//! Turns a list of requested artifacts into dependency-respecting layers:
//! [`DependencyGraphBuilder`] derives "must exist before" edges from a typed
//! [`RuleTable`] and pluggable [`IntraCategoryHeuristic`]s, and
//! [`LayerScheduler`] orders and groups them.
//!
//! ```rust
//! use genforge_planner::{Artifact, plan};
//!
//! let schedule = plan(&[
//!     Artifact::new("index.html"),
//!     Artifact::new("style.css"),
//!     Artifact::new("app.js"),
//! ])
//! .unwrap();
//! assert_eq!(schedule.layers.len(), 3);
//! ```

pub mod artifact;
pub mod graph;
pub mod rules;
pub mod schedule;

pub use artifact::{Artifact, Category};
pub use graph::{DependencyGraph, DependencyGraphBuilder};
pub use rules::{DEFAULT_FOUNDATION_STEMS, FoundationModules, IntraCategoryHeuristic, RuleTable};
pub use schedule::{LayerScheduler, Schedule, ScheduleWarning, plan};
