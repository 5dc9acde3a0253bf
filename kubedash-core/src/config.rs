use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{DEFAULT_LOG_LINES, DEFAULT_PIPELINE_LOG_LINES, FetchLimits};
use crate::persona::Persona;

pub const CONFIG_ENV: &str = "KUBEDASH_CONFIG";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

const CONFIG_NAMES: [&str; 4] = [
    "kubedash.yaml",
    "kubedash.yml",
    ".kubedash.yaml",
    ".kubedash.yml",
];

/// Color palette for the terminal UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeChoice {
    #[default]
    Dark,
    HighContrast,
}

impl std::str::FromStr for ThemeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(ThemeChoice::Dark),
            "high-contrast" | "high_contrast" => Ok(ThemeChoice::HighContrast),
            other => Err(format!(
                "unknown theme '{}' (expected dark or high-contrast)",
                other
            )),
        }
    }
}

/// Dashboard configuration file
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Cluster CLI binary
    pub kubectl: String,

    /// Namespace filter; the current context namespace when unset
    pub namespace: Option<String>,

    /// Log tail per container in the Logs tab
    pub log_lines: usize,

    /// Log tail per TaskRun in the Logs tab
    pub pipeline_log_lines: usize,

    /// Resource list auto-refresh period; disabled when unset or zero
    pub refresh_interval_secs: Option<u64>,

    pub theme: ThemeChoice,

    /// Persona for `--explain`
    pub persona: Persona,

    /// Generative model for `--explain`
    pub model: String,

    /// Where tracing output goes while the dashboard owns the terminal
    pub log_file: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".into(),
            namespace: None,
            log_lines: DEFAULT_LOG_LINES,
            pipeline_log_lines: DEFAULT_PIPELINE_LOG_LINES,
            refresh_interval_secs: None,
            theme: ThemeChoice::Dark,
            persona: Persona::default(),
            model: DEFAULT_MODEL.into(),
            log_file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("kubectl binary must not be empty")]
    EmptyKubectl,
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },
}

impl DashboardConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: DashboardConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search for a config file in standard locations. No file is not an error.
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            return Ok(Some((path.clone(), Self::load(&path)?)));
        }

        for name in &CONFIG_NAMES {
            let path = start_dir.join(name);
            if path.exists() {
                return Ok(Some((path.clone(), Self::load(&path)?)));
            }
        }

        if let Some(path) = user_config_path() {
            if path.exists() {
                return Ok(Some((path.clone(), Self::load(&path)?)));
            }
        }

        Ok(None)
    }

    /// Checks applied after every load and after command-line overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kubectl.trim().is_empty() {
            return Err(ConfigError::EmptyKubectl);
        }
        if self.log_lines == 0 {
            return Err(ConfigError::NotPositive { field: "log_lines" });
        }
        if self.pipeline_log_lines == 0 {
            return Err(ConfigError::NotPositive {
                field: "pipeline_log_lines",
            });
        }
        Ok(())
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            log_lines: self.log_lines,
            pipeline_log_lines: self.pipeline_log_lines,
        }
    }

    pub fn refresh_interval(&self) -> Option<std::time::Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(std::time::Duration::from_secs)
    }
}

/// `$XDG_CONFIG_HOME/kubedash/config.yaml`, falling back to `~/.config`.
fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("kubedash").join("config.yaml"))
}
