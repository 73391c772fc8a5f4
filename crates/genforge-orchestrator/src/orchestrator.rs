use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, warn};

use crate::prompter::{GenerationContext, Prompter};
use crate::report::{ArtifactOutcome, ArtifactStatus, LayerTiming, RunReport, RunSummary};
use genforge_config::GenerationConfig;
use genforge_llm::{ExecuteOptions, RequestExecutor, ResponseEnvelope};
use genforge_planner::{Artifact, DependencyGraph, DependencyGraphBuilder, LayerScheduler};
use genforge_utils::error::{ExecutionError, PlanError};
use genforge_utils::logging::{artifact_span, layer_span};

/// What to do after a layer in which some artifact failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep going; later artifacts are generated without the failed ones
    #[default]
    Continue,
    /// Finish the current layer, then skip everything after it
    StopAfterLayer,
}

/// Walks scheduled layers in order and generates each layer's artifacts
/// concurrently through a shared [`RequestExecutor`].
pub struct Orchestrator {
    executor: Arc<RequestExecutor>,
    prompter: Arc<dyn Prompter>,
    graph_builder: DependencyGraphBuilder,
    options: ExecuteOptions,
    limiter: Option<Arc<Semaphore>>,
    policy: FailurePolicy,
}

impl Orchestrator {
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            executor,
            prompter,
            graph_builder: DependencyGraphBuilder::default(),
            options: ExecuteOptions::default(),
            limiter: None,
            policy: FailurePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_graph_builder(mut self, builder: DependencyGraphBuilder) -> Self {
        self.graph_builder = builder;
        self
    }

    /// Options passed to every executor call.
    #[must_use]
    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    /// Cap in-flight generations per layer. `None` or `Some(0)` is unbounded.
    #[must_use]
    pub fn with_max_concurrency(mut self, cap: Option<usize>) -> Self {
        self.limiter = cap
            .filter(|&cap| cap > 0)
            .map(|cap| Arc::new(Semaphore::new(cap)));
        self
    }

    #[must_use]
    pub fn with_generation(self, generation: &GenerationConfig) -> Self {
        self.with_max_concurrency(generation.concurrency_cap())
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Schedule and generate `artifacts`.
    ///
    /// Per-artifact failures are recorded in the report, not returned.
    ///
    /// # Errors
    ///
    /// `PlanError` when the artifact list is malformed.
    pub async fn run(&self, artifacts: &[Artifact]) -> Result<RunReport, PlanError> {
        let graph = self.graph_builder.build(artifacts);
        let schedule = LayerScheduler::new().schedule(&graph, artifacts)?;

        let by_path: HashMap<&str, &Artifact> =
            artifacts.iter().map(|a| (a.path.as_str(), a)).collect();
        let mut completed: HashMap<String, String> = HashMap::new();
        let mut outcomes: Vec<ArtifactOutcome> = Vec::with_capacity(artifacts.len());
        let mut summary = RunSummary {
            artifacts: artifacts.len(),
            ..RunSummary::default()
        };
        let mut skipped: Vec<String> = Vec::new();

        for (index, layer) in schedule.layers.iter().enumerate() {
            let started = Instant::now();
            let span = layer_span(index, layer.len());
            info!(parent: &span, "Starting layer");

            let calls = layer
                .iter()
                .filter_map(|path| by_path.get(path.as_str()))
                .map(|artifact| {
                    let context = context_for(artifact, &graph, &completed);
                    self.generate(context)
                        .instrument(artifact_span(&artifact.path))
                });
            let results = join_all(calls).instrument(span.clone()).await;

            let mut layer_failed = false;
            for (path, result) in layer.iter().zip(results) {
                match &result {
                    Ok(response) => {
                        summary.generated += 1;
                        summary.usage.add(&response.usage);
                        completed.insert(path.clone(), response.content.clone());
                    }
                    Err(err) => {
                        summary.failed += 1;
                        layer_failed = true;
                        warn!(parent: &span, artifact = %path, error = %err, "Artifact failed");
                    }
                }
                outcomes.push(ArtifactOutcome {
                    path: path.clone(),
                    layer: index,
                    status: ArtifactStatus::from_result(result),
                });
            }

            summary.layers.push(LayerTiming {
                index,
                size: layer.len(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            });

            if layer_failed && self.policy == FailurePolicy::StopAfterLayer {
                let remaining: Vec<String> = schedule.layers[index + 1..]
                    .iter()
                    .flatten()
                    .cloned()
                    .collect();
                if !remaining.is_empty() {
                    warn!(
                        parent: &span,
                        skipped = remaining.len(),
                        "Stopping after failed layer"
                    );
                }
                skipped = remaining;
                break;
            }
        }

        summary.skipped = skipped.len();
        info!(
            generated = summary.generated,
            failed = summary.failed,
            skipped = summary.skipped,
            total_tokens = summary.usage.total_tokens,
            "Run finished"
        );

        Ok(RunReport {
            schedule,
            outcomes,
            skipped,
            summary,
        })
    }

    async fn generate(
        &self,
        context: GenerationContext<'_>,
    ) -> Result<ResponseEnvelope, ExecutionError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(|_| {
                ExecutionError::InvalidRequest("concurrency limiter closed".to_string())
            })?),
            None => None,
        };
        let envelope = self.prompter.envelope(&context);
        self.executor.execute(&envelope, &self.options).await
    }
}

fn context_for<'a>(
    artifact: &'a Artifact,
    graph: &'a DependencyGraph,
    completed: &'a HashMap<String, String>,
) -> GenerationContext<'a> {
    let mut seen = HashSet::new();
    let dependencies = graph
        .dependencies(&artifact.path)
        .iter()
        .filter(|dep| seen.insert(dep.as_str()))
        .filter_map(|dep| {
            completed
                .get(dep)
                .map(|content| (dep.as_str(), content.as_str()))
        })
        .collect();
    GenerationContext {
        artifact,
        dependencies,
    }
}
