//! Configuration system for SysOperator.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Environment variable that overrides the default inventory path.
pub const DEFAULT_INVENTORY_ENV: &str = "ANSIBLE_DEFAULT_INVENTORY";

/// Main configuration struct for SysOperator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Process execution settings
    pub execution: ExecutionConfig,
    /// Protocol resources
    pub resources: ResourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Look every executable up on PATH before spawning it
    pub probe_executables: bool,
    /// Require working AWS credentials before running cloud tools
    pub verify_aws_credentials: bool,
    /// Deadline for a single tool call, imposed by the server
    pub call_timeout_secs: Option<u64>,
    /// Parent directory for per-call workspaces (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            probe_executables: true,
            verify_aws_credentials: true,
            call_timeout_secs: None,
            workspace_root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Inventory file exposed as the default inventory resource
    pub default_inventory: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            default_inventory: PathBuf::from("/etc/ansible/hosts"),
        }
    }
}

/// Outcome of [`Config::validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no issue is an error. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.errors().is_empty()
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.with_severity(IssueSeverity::Error)
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.with_severity(IssueSeverity::Warning)
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(IssueSeverity::Error, field.into(), message.into());
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(IssueSeverity::Warning, field.into(), message.into());
    }

    /// Log warnings and fold any errors into one [`Error::Config`].
    pub fn into_result(self) -> Result<(), Error> {
        for warning in self.warnings() {
            tracing::warn!(field = %warning.field, "Config warning: {}", warning.message);
        }

        let errors: Vec<String> = self
            .errors()
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        Err(Error::Config(format!(
            "Configuration validation failed:\n  {}",
            errors.join("\n  ")
        )))
    }

    fn with_severity(&self, severity: IssueSeverity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .collect()
    }

    fn push(&mut self, severity: IssueSeverity, field: String, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            field,
            message,
        });
    }
}

/// One problem found in the configuration.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Dotted key, e.g. `execution.call_timeout_secs`.
    pub field: String,
    pub message: String,
}

/// Warnings are reported; errors stop a server or call from starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl Config {
    /// Build the layered figment.
    ///
    /// Precedence, lowest first: defaults, user config, project config, the
    /// explicit file, `SYSOPERATOR_*` variables, `ANSIBLE_DEFAULT_INVENTORY`.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            .merge(Toml::file(".sysoperator.toml"));

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("SYSOPERATOR_").split("__"))
            .merge(
                Env::raw()
                    .only(&[DEFAULT_INVENTORY_ENV])
                    .map(|_| "resources.default_inventory".into()),
            )
    }

    /// Extract the layered configuration without validating it.
    pub fn load(explicit: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(explicit).extract()
    }

    /// Check values figment cannot check by type alone.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            result.add_error(
                "general.log_level",
                format!(
                    "Invalid log level '{}'. Valid values: {:?}",
                    self.general.log_level, valid_levels
                ),
            );
        }

        if self.execution.call_timeout_secs == Some(0) {
            result.add_error(
                "execution.call_timeout_secs",
                "call_timeout_secs must be greater than 0 when set",
            );
        }

        if let Some(ref root) = self.execution.workspace_root {
            if !root.is_absolute() {
                result.add_error("execution.workspace_root", "workspace_root must be an absolute path");
            } else if !root.is_dir() {
                result.add_warning(
                    "execution.workspace_root",
                    format!("{} does not exist yet; workspaces will fail until it does", root.display()),
                );
            }
        }

        if !self.execution.probe_executables {
            result.add_warning(
                "execution.probe_executables",
                "executable probing is disabled; missing tools surface as spawn errors",
            );
        }

        result
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// `<platform config dir>/sysoperator`.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("sysoperator"))
            .unwrap_or_else(|| PathBuf::from("~/.config/sysoperator"))
    }
}
