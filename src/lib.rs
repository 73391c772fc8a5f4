//! genforge - dependency-ordered multi-file generation over LLM backends
//!
//! genforge takes a batch of artifacts to generate (HTML pages, stylesheets,
//! scripts, Python modules), infers which ones must exist before others,
//! groups them into layers, and generates each layer concurrently through a
//! pool of completion backends with retries, cooldowns and failover.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Show the layers genforge would generate, without calling any backend
//! genforge plan index.html style.css app.js --json
//!
//! # Show configured backends and their health
//! genforge backends
//!
//! # Generate a small site
//! genforge generate index.html style.css app.js --prompt "A landing page for a bakery"
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use genforge::{Artifact, BasicPrompter, Config, Orchestrator, executor_from_config};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::discover(&Default::default())?;
//! let executor = Arc::new(executor_from_config(&config)?);
//! let prompter = Arc::new(BasicPrompter::new("A landing page").with_generation(&config.generation));
//! let report = Orchestrator::new(executor, prompter)
//!     .with_generation(&config.generation)
//!     .run(&[Artifact::new("index.html"), Artifact::new("style.css")])
//!     .await?;
//! println!("{} generated", report.summary.generated);
//! # Ok(())
//! # }
//! ```
//!
//! # Stable Public API
//!
//! - [`Config`], [`ConfigBuilder`] and [`CliArgs`] - configuration
//! - [`Artifact`], [`DependencyGraphBuilder`], [`LayerScheduler`], [`plan`] - planning
//! - [`BackendRegistry`], [`RequestExecutor`] - backend routing
//! - [`Orchestrator`] and [`RunReport`] - layered generation
//! - [`GenforgeError`] and [`ExitCode`] - errors and process exit codes
//!
//! Member crates are re-exported under `#[doc(hidden)]` module aliases and are
//! not covered by semver guarantees.

pub use genforge_config::{
    BackendConfig, BackendFamily, CliArgs, Config, ConfigBuilder, GenerationConfig,
    RoutingConfig, RoutingStrategy,
};

pub use genforge_llm::{
    Backend, BackendRegistry, BackendStatus, ExecuteOptions, FinishReason, HealthState, Message,
    RequestEnvelope, RequestExecutor, ResponseEnvelope, Role, Transport, Usage,
    executor_from_config,
};

pub use genforge_planner::{
    Artifact, Category, DependencyGraph, DependencyGraphBuilder, LayerScheduler, Schedule,
    ScheduleWarning, plan,
};

pub use genforge_orchestrator::{
    ArtifactOutcome, ArtifactStatus, BasicPrompter, FailurePolicy, Orchestrator, Prompter,
    RunReport, RunSummary,
};

/// Library-level error type.
///
/// Library code returns `GenforgeError` and does NOT call `std::process::exit()`.
pub use genforge_utils::error::GenforgeError;

/// Exit codes matching the documented exit code table.
pub use genforge_utils::exit_codes::ExitCode;

pub use genforge_utils::error::{ErrorCategory, UserFriendlyError};

#[doc(hidden)]
pub use genforge_utils::{clock, error, exit_codes, logging, redaction};

#[doc(hidden)]
pub use genforge_config as config;

#[doc(hidden)]
pub use genforge_llm as llm;

#[doc(hidden)]
pub use genforge_orchestrator as orchestrator;

#[doc(hidden)]
pub use genforge_planner as planner;

// CLI module - internal implementation detail, not part of stable public API
// Exported with #[doc(hidden)] to allow white-box testing of argument parsing
#[doc(hidden)]
pub mod cli;
