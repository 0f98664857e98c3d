//! Layered configuration loading and validation.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;

use crate::domain::errors::ConfigError;
use crate::domain::models::config::Config;

/// Primary config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "harness.yaml";

/// Optional local overrides, never committed
pub const LOCAL_CONFIG_FILE: &str = "harness.local.yaml";

/// Environment variable names the harness has always honoured
const LEGACY_ENV_VARS: [&str; 3] = ["GENESYS_DEPLOYMENT_ID", "GENESYS_REGION", "OPENAI_API_KEY"];

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Build the layered figment without extracting it.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `harness.yaml`, or `config_path` when given
    ///    (a missing file is skipped here; [`load`](Self::load) rejects a missing `config_path`)
    /// 3. `harness.local.yaml` (optional local overrides)
    /// 4. `GENESYS_DEPLOYMENT_ID`, `GENESYS_REGION`, `OPENAI_API_KEY`
    /// 5. Environment variables (HARNESS_* prefix, `__` for nesting)
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let primary = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(primary))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(
                Env::raw()
                    .only(&LEGACY_ENV_VARS)
                    .map(|key| legacy_key(key.as_str()).into()),
            )
            .merge(Env::prefixed("HARNESS_").split("__"))
    }

    /// Load and validate configuration.
    ///
    /// The default files are optional, but an explicit `config_path` must exist.
    pub fn load(config_path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = config_path {
            ensure_exists(path)?;
        }

        let config: Config = Self::figment(config_path)
            .extract()
            .map_err(|err| ConfigError::Extraction(err.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        ensure_exists(path)?;

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
            .map_err(|err| {
                ConfigError::Extraction(format!("{}: {err}", path.display()))
            })?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("session.deployment_id", &config.session.deployment_id),
            ("session.region", &config.session.region),
            ("completion.api_key", &config.completion.api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        let temperature = config.completion.temperature;
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }

        // Retry policy
        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(0));
        }
        if config.retry.multiplier.is_nan() || config.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidDelay(format!(
                "multiplier {} must be at least 1.0",
                config.retry.multiplier
            )));
        }
        if config.retry.base_delay_ms > config.retry.max_delay_ms {
            return Err(ConfigError::InvalidDelay(format!(
                "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                config.retry.base_delay_ms, config.retry.max_delay_ms
            )));
        }

        // Turn loop
        if config.conversation.reply_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(0));
        }
        if config.conversation.max_turns == 0 {
            return Err(ConfigError::InvalidMaxTurns(0));
        }
        if config.conversation.sentinel.token.trim().is_empty() {
            return Err(ConfigError::EmptySentinel);
        }

        if !VALID_LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

fn ensure_exists(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::FileNotFound(path.to_path_buf()))
    }
}

fn legacy_key(env_var: &str) -> &'static str {
    match env_var.to_ascii_uppercase().as_str() {
        "GENESYS_DEPLOYMENT_ID" => "session.deployment_id",
        "GENESYS_REGION" => "session.region",
        _ => "completion.api_key",
    }
}
