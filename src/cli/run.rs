//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, initializes tracing, loads configuration for
//! the commands that need it, creates the tokio runtime and reports errors.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, GenerateRequest};
use genforge_config::{CliArgs, Config, ConfigError};
use genforge_utils::error::{GenforgeError, UserFriendlyError};
use genforge_utils::exit_codes::ExitCode;
use genforge_utils::logging::init_tracing;
use genforge_utils::redaction::redact_error_message;

/// Main CLI execution function.
///
/// Handles ALL output including errors. main.rs only calls
/// `std::process::exit(code.as_i32())` on error.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        strategy: cli.strategy,
        primary: cli.primary.clone(),
        max_provider_retries: cli.max_provider_retries,
    };

    let result = match cli.command {
        Commands::Plan { paths, json } => commands::execute_plan_command(&paths, json),
        Commands::Backends { json } => load_config(&cli_args)
            .and_then(|config| commands::execute_backends_command(&config, json)),
        Commands::Generate {
            paths,
            prompt,
            provider,
            model,
            on_failure,
            json,
        } => load_config(&cli_args).and_then(|config| {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {e}"))?;
            let request = GenerateRequest {
                prompt,
                provider,
                model,
                on_failure,
                json,
            };
            rt.block_on(commands::execute_generate_command(&config, &paths, request))
        }),
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => Err(report_error(&error)),
    }
}

fn load_config(cli_args: &CliArgs) -> anyhow::Result<Config> {
    Config::discover(cli_args)
}

/// Print an error with context and suggestions, returning its exit code.
fn report_error(error: &anyhow::Error) -> ExitCode {
    if let Some(err) = error.downcast_ref::<GenforgeError>() {
        eprintln!("✗ {}", redact_error_message(&err.user_message()));
        if let Some(context) = err.context() {
            for line in context.lines() {
                eprintln!("    {}", redact_error_message(line));
            }
        }
        let suggestions = err.suggestions();
        if !suggestions.is_empty() {
            eprintln!("\n  Suggestions:");
            for (i, suggestion) in suggestions.iter().enumerate() {
                eprintln!("    {}. {}", i + 1, suggestion);
            }
        }
        return ExitCode::from(err);
    }

    let message = redact_error_message(&format!("{error:#}"));
    if error.chain().any(|cause| cause.is::<ConfigError>()) {
        eprintln!("✗ Configuration error: {message}");
        eprintln!("\n  Run with --config <file> or create .genforge/config.toml");
        return ExitCode::CLI_ARGS;
    }

    eprintln!("✗ Unexpected error: {message}");
    eprintln!("\n  Run with --verbose for more detailed output");
    ExitCode::INTERNAL
}
