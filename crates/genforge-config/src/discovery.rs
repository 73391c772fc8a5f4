use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Config, ConfigError, RoutingStrategy};

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV_VAR: &str = "GENFORGE_CONFIG";

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub strategy: Option<RoutingStrategy>,
    pub primary: Option<String>,
    pub max_provider_retries: Option<usize>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file.
    ///
    /// Uses the current working directory for discovery when no explicit
    /// path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// Lookup order: `cli_args.config_path`, then `GENFORGE_CONFIG`, then an
    /// upward search for `.genforge/config.toml`.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(path) => Some(PathBuf::from(path)),
                None => Self::discover_config_file_from(start_dir)?,
            },
        };

        let path = config_path.ok_or_else(|| ConfigError::NotFound {
            path: start_dir.join(".genforge").join("config.toml").display().to_string(),
        })?;

        let mut config = Self::load_file(&path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;

        if let Some(strategy) = cli_args.strategy {
            config.routing.strategy = strategy;
        }
        if let Some(primary) = &cli_args.primary {
            config.routing.primary = Some(primary.clone());
        }
        if let Some(max) = cli_args.max_provider_retries {
            config.routing.max_provider_retries = Some(max);
        }

        config.validate()?;

        debug!(
            path = %path.display(),
            backends = config.backends.len(),
            strategy = %config.routing.strategy,
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.genforge/config.toml`, stopping at
    /// repository root markers (.git, .hg, .svn) or the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".genforge").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load and parse a TOML config file without validating it.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidFile` when the text is not valid TOML or
    /// does not match the schema.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFile(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendFamily;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[routing]
strategy = "round-robin"
primary = "gemini"

[[backends]]
name = "openai"
family = "chat"
base_url = "https://api.openai.com/v1"
api_key = "inline"
model = "gpt-4o-mini"

[[backends]]
name = "gemini"
family = "gemini"
base_url = "https://generativelanguage.googleapis.com/v1beta"
api_key = "inline"
model = "gemini-1.5-flash"
timeout_secs = 30
"#;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let config_dir = dir.join(".genforge");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_from_toml_str_parses_backends() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.routing.strategy, RoutingStrategy::RoundRobin);
        assert_eq!(config.backends[1].family, BackendFamily::Generate);
        assert_eq!(config.backends[1].timeout_secs, Some(30));
    }

    #[test]
    fn test_from_toml_str_rejects_garbage() {
        let result = Config::from_toml_str("[[backends]]\nname = 3");
        assert!(matches!(result, Err(ConfigError::InvalidFile(_))));
    }

    #[test]
    fn test_discover_config_file_walks_upward() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        let expected = write_config(temp.path(), SAMPLE);
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_config_file_from(&nested).unwrap();
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn test_discover_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), SAMPLE);
        let repo = temp.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let found = Config::discover_config_file_from(&repo).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_cli_overrides_apply() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), SAMPLE);
        let cli_args = CliArgs {
            config_path: Some(path.clone()),
            strategy: Some(RoutingStrategy::LeastErrors),
            primary: Some("openai".to_string()),
            max_provider_retries: Some(1),
        };

        let config = Config::discover_from(temp.path(), &cli_args).unwrap();
        assert_eq!(config.routing.strategy, RoutingStrategy::LeastErrors);
        assert_eq!(config.routing.primary.as_deref(), Some("openai"));
        assert_eq!(config.routing.max_provider_retries, Some(1));
        assert_eq!(config.source, Some(path));
    }
}
