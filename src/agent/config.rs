use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::focus::{CommandEnforcer, EnforcementBoundary, LogOnlyEnforcer};

/// Minimum accepted tick interval
pub const MIN_TICK_INTERVAL: u64 = 5;

/// Agent configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agent settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSettings {
    /// Upper bound between evaluations when nothing else wakes the agent (seconds)
    #[serde(default = "default_tick_interval")]
    pub tick_interval: u64,

    /// Focus mode catalog (YAML)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Usage counters written by an activity tracker (JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_path: Option<PathBuf>,

    /// Agent runtime state (JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
}

/// Which enforcement boundary to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementBackend {
    /// Log decisions only
    #[default]
    Log,
    /// Run hook commands
    Command,
}

/// Enforcement settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EnforcementConfig {
    #[serde(default)]
    pub backend: EnforcementBackend,

    /// Argv run to apply restrictions; blocked apps are appended
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply_command: Vec<String>,

    /// Argv run to clear restrictions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear_command: Vec<String>,
}

/// Authorization settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthorizationConfig {
    /// Grant file written by `free-focus authorize`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_tick_interval() -> u64 {
    60 // 1 minute
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            catalog_path: None,
            usage_path: None,
            state_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Validate config
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Serialize to TOML
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // Write to file
        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        // Hook commands run with the agent's privileges
        crate::platform::common::set_file_permissions(path, 0o600)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.agent.tick_interval < MIN_TICK_INTERVAL {
            anyhow::bail!(
                "Tick interval must be at least {} seconds (got: {})",
                MIN_TICK_INTERVAL,
                self.agent.tick_interval
            );
        }

        if self.enforcement.backend == EnforcementBackend::Command {
            if self.enforcement.apply_command.is_empty() {
                anyhow::bail!("Command enforcement requires 'apply_command'");
            }
            if self.enforcement.clear_command.is_empty() {
                anyhow::bail!("Command enforcement requires 'clear_command'");
            }
        }

        Ok(())
    }

    pub fn catalog_path(&self) -> Result<PathBuf> {
        match &self.agent.catalog_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.config_dir().join("focus-modes.yaml")),
        }
    }

    pub fn usage_path(&self) -> Result<PathBuf> {
        match &self.agent.usage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_local_dir().join("usage.json")),
        }
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.agent.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_local_dir().join("state.json")),
        }
    }

    pub fn grant_path(&self) -> Result<PathBuf> {
        match &self.authorization.grant_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_local_dir().join("grant.json")),
        }
    }

    /// Enforcement boundary selected by `[enforcement]`
    pub fn build_enforcer(&self) -> Arc<dyn EnforcementBoundary> {
        match self.enforcement.backend {
            EnforcementBackend::Log => Arc::new(LogOnlyEnforcer),
            EnforcementBackend::Command => Arc::new(CommandEnforcer::new(
                self.enforcement.apply_command.clone(),
                self.enforcement.clear_command.clone(),
            )),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "free-focus")
        .context("Could not determine home directory for free-focus")
}

/// Get the default agent config file path
pub fn get_agent_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("agent.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_settings_default_values() {
        let config = AgentConfig::default();
        assert_eq!(config.agent.tick_interval, 60);
        assert_eq!(config.enforcement.backend, EnforcementBackend::Log);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn agent_config_parses_partial_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
            [agent]
            tick_interval = 30
            catalog_path = "/tmp/modes.yaml"

            [enforcement]
            backend = "command"
            apply_command = ["shieldctl", "block"]
            clear_command = ["shieldctl", "clear"]
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.tick_interval, 30);
        assert_eq!(config.catalog_path().unwrap(), PathBuf::from("/tmp/modes.yaml"));
        assert_eq!(config.enforcement.backend, EnforcementBackend::Command);
        assert_eq!(config.enforcement.apply_command, vec!["shieldctl", "block"]);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn agent_config_validates_tick_interval() {
        let config = AgentConfig {
            agent: AgentSettings {
                tick_interval: 1, // Too short
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn agent_config_command_backend_needs_hooks() {
        let config = AgentConfig {
            enforcement: EnforcementConfig {
                backend: EnforcementBackend::Command,
                apply_command: vec!["shieldctl".to_string()],
                clear_command: vec![],
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn agent_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("agent.toml");

        let mut config = AgentConfig::default();
        config.agent.tick_interval = 15;
        config.authorization.grant_path = Some(temp_dir.path().join("grant.json"));
        config.save(&path).unwrap();

        let loaded = AgentConfig::load(&path).unwrap();
        assert_eq!(loaded.agent.tick_interval, 15);
        assert_eq!(loaded.grant_path().unwrap(), temp_dir.path().join("grant.json"));
    }

    #[test]
    fn agent_config_missing_file_is_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.agent.tick_interval, 60);
    }
}
