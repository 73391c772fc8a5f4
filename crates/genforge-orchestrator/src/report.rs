use serde::{Deserialize, Serialize};

use genforge_llm::{ResponseEnvelope, Usage};
use genforge_planner::Schedule;
use genforge_utils::error::ExecutionError;

/// How one artifact ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Generated {
        response: ResponseEnvelope,
    },
    Failed {
        /// Display form of the execution error
        error: String,
        /// One line per attempted backend
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attempts: Vec<String>,
    },
}

impl ArtifactStatus {
    pub(crate) fn from_result(result: Result<ResponseEnvelope, ExecutionError>) -> Self {
        match result {
            Ok(response) => Self::Generated { response },
            Err(err) => Self::Failed {
                attempts: err.attempt_report(),
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub path: String,
    pub layer: usize,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

impl ArtifactOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ArtifactStatus::Generated { .. })
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.status {
            ArtifactStatus::Generated { response } => Some(&response.content),
            ArtifactStatus::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTiming {
    pub index: usize,
    pub size: usize,
    pub elapsed_ms: u64,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub artifacts: usize,
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Token usage summed over every generated artifact
    pub usage: Usage,
    pub layers: Vec<LayerTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub schedule: Schedule,
    /// Outcomes in layer order
    pub outcomes: Vec<ArtifactOutcome>,
    /// Artifacts never attempted because the run stopped early
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    pub summary: RunSummary,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.summary.skipped == 0
    }

    #[must_use]
    pub fn outcome(&self, path: &str) -> Option<&ArtifactOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}
