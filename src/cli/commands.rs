//! Command implementations
//!
//! Each command prints its own output and returns the exit code for a
//! completed run; errors bubble up to `run` for reporting.

use anyhow::{Context, Result};
use std::sync::Arc;

use genforge_config::{BackendFamily, Config};
use genforge_llm::{BackendRegistry, BackendStatus, ExecuteOptions, executor_from_config};
use genforge_orchestrator::{
    ArtifactStatus, BasicPrompter, FailurePolicy, Orchestrator, RunReport,
};
use genforge_planner::{
    Artifact, Category, DependencyGraphBuilder, LayerScheduler, Schedule, ScheduleWarning,
};
use genforge_utils::error::GenforgeError;
use genforge_utils::exit_codes::ExitCode;
use std::str::FromStr;

/// Parse `path` or `path:category`. A suffix that is not a known category
/// stays part of the path.
fn artifact_from_arg(arg: &str) -> Artifact {
    match arg.rsplit_once(':') {
        Some((path, hint)) if !path.is_empty() && Category::from_str(hint).is_ok() => {
            Artifact::with_hint(path, hint)
        }
        _ => Artifact::new(arg),
    }
}

fn artifacts_from(args: &[String]) -> Vec<Artifact> {
    args.iter().map(|arg| artifact_from_arg(arg)).collect()
}

/// Execute `genforge plan`: schedule without calling any backend.
pub fn execute_plan_command(paths: &[String], json: bool) -> Result<ExitCode> {
    let artifacts = artifacts_from(paths);
    let graph = DependencyGraphBuilder::default().build(&artifacts);
    let schedule = LayerScheduler::new()
        .schedule(&graph, &artifacts)
        .map_err(GenforgeError::from)?;

    if json {
        let output =
            serde_json::to_string_pretty(&schedule).context("Failed to emit schedule JSON")?;
        println!("{output}");
    } else {
        print_schedule(&schedule);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_schedule(schedule: &Schedule) {
    for (index, layer) in schedule.layers.iter().enumerate() {
        println!("Layer {index}: {}", layer.join(", "));
    }
    for warning in &schedule.warnings {
        match warning {
            ScheduleWarning::CircularDependency { paths } => {
                println!("⚠ Circular dependency among: {}", paths.join(", "));
            }
            ScheduleWarning::ForcedLayer { path } => {
                println!("⚠ Forced into its own layer: {path}");
            }
        }
    }
}

/// Execute `genforge backends`: show every configured backend's health.
pub fn execute_backends_command(config: &Config, json: bool) -> Result<ExitCode> {
    let registry = BackendRegistry::from_config(config);
    let statuses = registry.snapshot();

    if json {
        let output =
            serde_json::to_string_pretty(&statuses).context("Failed to emit backends JSON")?;
        println!("{output}");
    } else {
        println!("Strategy: {}", registry.strategy());
        for status in &statuses {
            print_backend(status);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_backend(status: &BackendStatus) {
    let marker = if status.available { "✓" } else { "✗" };
    println!(
        "{marker} {} ({}, {}): {}",
        status.name, status.family, status.model, status.state
    );
    if let Some(error) = &status.last_error {
        println!("    last error: {error}");
    }
}

/// Options for `genforge generate` beyond the artifact list.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub provider: Option<BackendFamily>,
    pub model: Option<String>,
    pub on_failure: FailurePolicy,
    pub json: bool,
}

/// Execute `genforge generate`: run the orchestrator and print every artifact.
pub async fn execute_generate_command(
    config: &Config,
    paths: &[String],
    request: GenerateRequest,
) -> Result<ExitCode> {
    let executor = executor_from_config(config).map_err(GenforgeError::from)?;
    let prompter =
        BasicPrompter::new(request.prompt.clone()).with_generation(&config.generation);

    let mut options = ExecuteOptions::default();
    if let Some(provider) = request.provider {
        options = options.with_provider(provider);
    }
    if let Some(model) = &request.model {
        options = options.with_model(model.clone());
    }

    let report = Orchestrator::new(Arc::new(executor), Arc::new(prompter))
        .with_generation(&config.generation)
        .with_options(options)
        .with_failure_policy(request.on_failure)
        .run(&artifacts_from(paths))
        .await
        .map_err(GenforgeError::from)?;

    if request.json {
        let output =
            serde_json::to_string_pretty(&report).context("Failed to emit run report JSON")?;
        println!("{output}");
    } else {
        print_report(&report);
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::PARTIAL_FAILURE)
    }
}

fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            ArtifactStatus::Generated { response } => {
                println!("==> {} <==", outcome.path);
                println!("{}", response.content);
                for warning in &response.warnings {
                    eprintln!("⚠ {}: {warning}", outcome.path);
                }
            }
            ArtifactStatus::Failed { error, attempts } => {
                eprintln!("✗ {}: {error}", outcome.path);
                for attempt in attempts {
                    eprintln!("    {attempt}");
                }
            }
        }
    }
    for path in &report.skipped {
        eprintln!("- {path}: skipped");
    }

    let summary = &report.summary;
    eprintln!(
        "{} generated, {} failed, {} skipped ({} tokens)",
        summary.generated, summary.failed, summary.skipped, summary.usage.total_tokens
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_arg_with_category_hint() {
        let artifact = artifact_from_arg("layout.tpl:markup");
        assert_eq!(artifact.path, "layout.tpl");
        assert_eq!(artifact.category, Category::Markup);

        let artifact = artifact_from_arg("build/theme:Stylesheet");
        assert_eq!(artifact.path, "build/theme");
        assert_eq!(artifact.category, Category::Stylesheet);
    }

    #[test]
    fn test_artifact_arg_without_known_category() {
        assert_eq!(artifact_from_arg("app.js").category, Category::Script);

        let artifact = artifact_from_arg("C:notes.md");
        assert_eq!(artifact.path, "C:notes.md");
        assert_eq!(artifact.category, Category::Documentation);

        assert_eq!(artifact_from_arg(":markup").path, ":markup");
    }
}
