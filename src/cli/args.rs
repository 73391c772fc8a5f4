//! CLI argument definitions and parsing structures
//!
//! Defines the `Cli` struct and the subcommand enum using clap derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use genforge_config::{BackendFamily, RoutingStrategy};
use genforge_orchestrator::FailurePolicy;

/// genforge - dependency-ordered multi-file generation over LLM backends
#[derive(Parser, Debug)]
#[command(name = "genforge")]
#[command(about = "Generate interdependent files layer by layer across failover-aware LLM backends")]
#[command(long_about = r#"
genforge infers which artifacts must be generated before others, groups them
into layers, and generates each layer concurrently through a pool of
completion backends with retries, cooldowns and failover.

EXAMPLES:
  # Show the generation layers without calling any backend
  genforge plan index.html style.css app.js

  # Same, as JSON
  genforge plan index.html style.css app.js --json

  # Override the category of a file whose extension says nothing
  genforge plan layout.tpl:markup theme.css

  # Show configured backends and their health
  genforge backends --json

  # Generate a small site, preferring a specific backend
  genforge generate index.html style.css app.js --prompt "A bakery landing page" --primary openai

CONFIGURATION:
  Config file is discovered by searching upward from CWD for .genforge/config.toml
  GENFORGE_CONFIG or --config names an explicit file
  CLI flags override values from the file
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend routing strategy (failover, round-robin, random, least-errors)
    #[arg(long, global = true)]
    pub strategy: Option<RoutingStrategy>,

    /// Backend to rank first regardless of priority
    #[arg(long, global = true)]
    pub primary: Option<String>,

    /// Maximum number of distinct backends tried per request
    #[arg(long, global = true)]
    pub max_provider_retries: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the generation layers for a set of artifacts
    Plan {
        /// Artifact paths in request order; `path:category` overrides the extension
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output the schedule as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured backends and their current health
    Backends {
        /// Output backend status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate artifacts layer by layer
    Generate {
        /// Artifact paths in request order; `path:category` overrides the extension
        #[arg(required = true)]
        paths: Vec<String>,

        /// Instruction describing what to build
        #[arg(long)]
        prompt: String,

        /// Restrict requests to one backend family (chat or generate)
        #[arg(long)]
        provider: Option<BackendFamily>,

        /// Model name or tier (fast, strong) for every request
        #[arg(long)]
        model: Option<String>,

        /// What to do after a layer with failures (continue, stop-after-layer)
        #[arg(long, default_value_t = FailurePolicy::Continue)]
        on_failure: FailurePolicy,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Build the clap command, for help rendering and argument tests.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
