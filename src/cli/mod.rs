//! Command-line interface for genforge
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point and command dispatch
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, build_cli};
pub use run::run;

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use genforge_config::{BackendFamily, RoutingStrategy};
    use genforge_orchestrator::FailurePolicy;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_plan_args() {
        let cli = Cli::try_parse_from(["genforge", "plan", "index.html", "style.css", "--json"])
            .unwrap();
        match cli.command {
            Commands::Plan { paths, json } => {
                assert_eq!(paths, vec!["index.html", "style.css"]);
                assert!(json);
            }
            other => panic!("Expected Plan, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_requires_paths() {
        assert!(Cli::try_parse_from(["genforge", "plan"]).is_err());
    }

    #[test]
    fn test_generate_args_and_global_flags() {
        let cli = Cli::try_parse_from([
            "genforge",
            "generate",
            "a.py",
            "--prompt",
            "build it",
            "--provider",
            "gemini",
            "--on-failure",
            "stop-after-layer",
            "--strategy",
            "round-robin",
            "--primary",
            "backup",
        ])
        .unwrap();

        assert_eq!(cli.strategy, Some(RoutingStrategy::RoundRobin));
        assert_eq!(cli.primary.as_deref(), Some("backup"));
        match cli.command {
            Commands::Generate {
                prompt,
                provider,
                on_failure,
                model,
                ..
            } => {
                assert_eq!(prompt, "build it");
                assert_eq!(provider, Some(BackendFamily::Generate));
                assert_eq!(on_failure, FailurePolicy::StopAfterLayer);
                assert!(model.is_none());
            }
            other => panic!("Expected Generate, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(Cli::try_parse_from(["genforge", "--strategy", "fastest", "backends"]).is_err());
    }
}
