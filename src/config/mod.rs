//! Runtime configuration.
//!
//! A single [`Config`] value is built at startup (from [`ConfigArgs`] on the
//! command line, with environment fallbacks) and handed to the engine and the
//! server. Nothing reads configuration from globals.
//!
//! Environment variables:
//! - `VERISOLVE_ENDPOINT` - Ollama base URL. Defaults to `http://127.0.0.1:11434`.
//! - `VERISOLVE_MODEL` - Model for solve and repair. Defaults to `deepseek-r1:1.5b`.
//! - `VERISOLVE_VERIFIER_MODEL` - Model for verification. Defaults to the solve model.
//! - `VERISOLVE_MAX_ATTEMPTS` - Attempts per request. Defaults to `3`.
//! - `VERISOLVE_TIMEOUT` - Per-call timeout in seconds. Defaults to `120`.
//! - `VERISOLVE_RETRY_DELAY_MS` - Pause before each repair. Defaults to `0`.

use std::time::Duration;

use clap::Args;
use thiserror::Error;

use crate::consts::{
    DEFAULT_ENDPOINT, DEFAULT_HOST, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_SEED,
    DEFAULT_TIMEOUT_SECS,
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Backend and loop settings shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Ollama base URL, without a trailing slash.
    pub endpoint: String,
    pub model: String,
    pub verifier_model: String,
    /// Upper bound on solve attempts (first solve + repairs).
    pub max_attempts: usize,
    /// Per-call backend timeout.
    pub timeout: Duration,
    /// Pause before each repair attempt.
    pub retry_delay: Duration,
    pub temperature: f32,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            verifier_model: DEFAULT_MODEL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_delay: Duration::ZERO,
            temperature: 0.0,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "endpoint",
                format!("{} (expected an http:// or https:// URL)", self.endpoint),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue("model", "must not be empty".into()));
        }
        if self.verifier_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "verifier_model",
                "must not be empty".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_attempts",
                "must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue("timeout", "must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue(
                "temperature",
                format!("{} (expected 0.0 to 2.0)", self.temperature),
            ));
        }
        Ok(())
    }
}

/// Command-line flags for [`Config`], each with an environment fallback.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Ollama endpoint
    #[arg(long, global = true, env = "VERISOLVE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Model for solving and repairing
    #[arg(short, long, global = true, env = "VERISOLVE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Model for verification (defaults to --model)
    #[arg(long, global = true, env = "VERISOLVE_VERIFIER_MODEL")]
    pub verifier_model: Option<String>,

    /// Maximum solve attempts per request
    #[arg(long, global = true, env = "VERISOLVE_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,

    /// Per-call backend timeout in seconds
    #[arg(short, long, global = true, env = "VERISOLVE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Delay before each repair attempt, in milliseconds
    #[arg(long, global = true, env = "VERISOLVE_RETRY_DELAY_MS", default_value_t = 0)]
    pub retry_delay_ms: u64,

    /// Sampling temperature
    #[arg(long, global = true, default_value_t = 0.0)]
    pub temperature: f32,

    /// Sampling seed
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl ConfigArgs {
    /// Build and validate the runtime configuration.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let config = Config {
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            verifier_model: self.verifier_model.unwrap_or_else(|| self.model.clone()),
            model: self.model,
            max_attempts: self.max_attempts,
            timeout: Duration::from_secs(self.timeout),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            temperature: self.temperature,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    #[arg(long, global = true, env = "VERISOLVE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(short, long, global = true, env = "VERISOLVE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}
