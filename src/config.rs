//! Scenario settings, loaded from TOML.
//!
//! Every field has a default matching the reference kitchen, so an empty file
//! (or no file at all) reproduces the classic run.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::producer::PutMode;

/// Names the config file to load when set.
pub const CONFIG_ENV_VAR: &str = "SOUP_LINE_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub serving: ServingConfig,
    pub chopping: ChoppingConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationStyle {
    #[default]
    Sentinels,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PutStyle {
    #[default]
    Blocking,
    NonBlocking,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServingConfig {
    pub capacity: usize,
    pub bowls: usize,
    pub serve_delay_ms: u64,
    pub producers: usize,
    pub consumers: usize,
    pub work_units: u32,
    pub termination: TerminationStyle,
    pub put_style: PutStyle,
    /// Only used with `put_style = "blocking"`.
    pub put_timeout_ms: Option<u64>,
    pub get_timeout_ms: Option<u64>,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            bowls: 20,
            serve_delay_ms: 200,
            producers: 1,
            consumers: 2,
            work_units: 4,
            termination: TerminationStyle::Sentinels,
            put_style: PutStyle::Blocking,
            put_timeout_ms: None,
            get_timeout_ms: None,
        }
    }
}

impl ServingConfig {
    pub fn serve_delay(&self) -> Duration {
        Duration::from_millis(self.serve_delay_ms)
    }

    pub fn put_mode(&self) -> PutMode {
        match (self.put_style, self.put_timeout_ms) {
            (PutStyle::NonBlocking, _) => PutMode::NonBlocking,
            (PutStyle::Blocking, Some(ms)) => PutMode::Within(Duration::from_millis(ms)),
            (PutStyle::Blocking, None) => PutMode::Blocking,
        }
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.get_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid("serving.capacity", "must be at least 1"));
        }
        if self.producers == 0 {
            return Err(ConfigError::invalid("serving.producers", "must be at least 1"));
        }
        if self.consumers == 0 {
            return Err(ConfigError::invalid("serving.consumers", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChoppingConfig {
    pub workers: Vec<String>,
    pub run_ms: u64,
    /// How long workers get to notice the stop signal.
    pub grace_ms: u64,
}

impl Default for ChoppingConfig {
    fn default() -> Self {
        Self {
            workers: vec!["Sid".to_string(), "Bob".to_string()],
            run_ms: 1000,
            grace_ms: 500,
        }
    }
}

impl ChoppingConfig {
    pub fn run_for(&self) -> Duration {
        Duration::from_millis(self.run_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.is_empty() {
            return Err(ConfigError::invalid("chopping.workers", "needs at least one name"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    pub helper: String,
    pub task_ms: u64,
    pub check_after_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            helper: "Sid".to_string(),
            task_ms: 3000,
            check_after_ms: 500,
        }
    }
}

impl LifecycleConfig {
    pub fn task(&self) -> Duration {
        Duration::from_millis(self.task_ms)
    }

    pub fn check_after(&self) -> Duration {
        Duration::from_millis(self.check_after_ms)
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`], or the defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_var(CONFIG_ENV_VAR)
    }

    fn from_var(var: &str) -> Result<Self, ConfigError> {
        match env::var_os(var) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.serving.validate()?;
        self.chopping.validate()?;
        if self.lifecycle.helper.trim().is_empty() {
            return Err(ConfigError::invalid("lifecycle.helper", "must not be blank"));
        }
        Ok(())
    }
}
