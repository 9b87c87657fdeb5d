//! Configuration surface. Values come from an optional TOML file plus
//! `LOADTEST_*` environment variables; anything absent falls back to a
//! default, and the whole set is validated before the first phase starts.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File as ConfigFile};
use loadtest_metrics::{EndpointRules, RuleError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {0} not found")]
    FileNotFound(PathBuf),
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("at least one phase must be configured")]
    NoPhases,
    #[error("phase {index}: user count must be greater than zero")]
    ZeroUsers { index: usize },
    #[error("phase {index}: duration must be greater than zero minutes")]
    ZeroDuration { index: usize },
    #[error("iterations per user must be greater than zero")]
    ZeroIterations,
    #[error(transparent)]
    Rule(#[from] RuleError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseConfig {
    pub users: usize,
    pub duration_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointRuleConfig {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// Target service base address; opaque to the engine.
    pub base_url: String,
    /// Escalating load phases, executed strictly in order.
    pub phases: Vec<PhaseConfig>,
    pub iterations_per_user: usize,
    pub rest_duration_minutes: u64,
    /// Directory the timestamped Markdown report is written to.
    pub report_dir: PathBuf,
    /// Ordered endpoint-normalization rules; first match wins.
    pub endpoint_rules: Vec<EndpointRuleConfig>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            phases: vec![
                PhaseConfig {
                    users: 20,
                    duration_minutes: 10,
                },
                PhaseConfig {
                    users: 50,
                    duration_minutes: 10,
                },
                PhaseConfig {
                    users: 100,
                    duration_minutes: 10,
                },
                PhaseConfig {
                    users: 300,
                    duration_minutes: 10,
                },
            ],
            iterations_per_user: 10,
            rest_duration_minutes: 10,
            report_dir: PathBuf::from("."),
            endpoint_rules: default_endpoint_rules(),
        }
    }
}

fn default_endpoint_rules() -> Vec<EndpointRuleConfig> {
    [
        (r"/api/v1/forms/[a-fA-F0-9]{24}$", "/api/v1/forms/{id}"),
        (r"/api/v1/forms/[a-fA-F0-9-]{36}$", "/api/v1/forms/{id}"),
        (r"/api/v1/forms/[a-zA-Z0-9]+$", "/api/v1/forms/{id}"),
        (
            r"/api/v1/organizations/[a-fA-F0-9]{24}$",
            "/api/v1/organizations/{id}",
        ),
        (
            r"/api/v1/organizations/[a-fA-F0-9-]{36}$",
            "/api/v1/organizations/{id}",
        ),
        (
            r"/api/v1/organizations/[a-zA-Z0-9]+$",
            "/api/v1/organizations/{id}",
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| EndpointRuleConfig {
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
    })
    .collect()
}

impl LoadTestConfig {
    /// Load from an optional TOML file plus `LOADTEST_*` environment
    /// overrides, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            builder = builder.add_source(ConfigFile::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("LOADTEST"));

        let config: LoadTestConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        for (index, phase) in self.phases.iter().enumerate() {
            if phase.users == 0 {
                return Err(ConfigError::ZeroUsers { index });
            }
            if phase.duration_minutes == 0 {
                return Err(ConfigError::ZeroDuration { index });
            }
        }
        if self.iterations_per_user == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        self.endpoint_rules()?;
        Ok(())
    }

    /// Compile the configured rule list, preserving declaration order.
    pub fn endpoint_rules(&self) -> Result<EndpointRules, RuleError> {
        EndpointRules::new(
            self.endpoint_rules
                .iter()
                .map(|rule| (rule.pattern.as_str(), rule.replacement.clone())),
        )
    }
}
