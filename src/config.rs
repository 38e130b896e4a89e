//! Engine Configuration
//!
//! Features:
//! - Strict and permissive profiles
//! - Environment variable overrides
//! - Configuration validation
//! - Builder for programmatic setup

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Behavior profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Malformed input and drops of missing tables are errors.
    #[default]
    Strict,
    /// Invalid characters are skipped, unterminated strings run to the end
    /// of input, and dropping a missing table succeeds.
    Permissive,
}

impl std::str::FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Profile::Strict),
            "permissive" | "lenient" => Ok(Profile::Permissive),
            _ => Err(Error::Config(format!("Invalid profile: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub profile: Profile,
    pub lexer: LexerConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexerConfig {
    /// Fail on unrecognized characters and unterminated strings
    pub reject_invalid_tokens: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// DROP TABLE of a missing table fails instead of succeeding
    pub error_on_missing_drop: bool,

    /// Offer SELECT plans to a registered execution backend first
    pub use_backend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,

    /// Emit one event per executed statement with its SQL text
    pub log_statements: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        EngineConfig::strict().execution
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        EngineConfig::strict().logging
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let profile = std::env::var("ROWSQL_PROFILE")
            .unwrap_or_else(|_| "strict".to_string())
            .parse()?;

        let mut config = Self::for_profile(profile);
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Strict => Self::strict(),
            Profile::Permissive => Self::permissive(),
        }
    }

    pub fn strict() -> Self {
        Self {
            profile: Profile::Strict,
            lexer: LexerConfig {
                reject_invalid_tokens: true,
            },
            execution: ExecutionConfig {
                error_on_missing_drop: true,
                use_backend: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
                log_statements: false,
            },
        }
    }

    pub fn permissive() -> Self {
        let mut config = Self::strict();
        config.profile = Profile::Permissive;
        config.lexer.reject_invalid_tokens = false;
        config.execution.error_on_missing_drop = false;
        config
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_bool("ROWSQL_REJECT_INVALID_TOKENS")? {
            self.lexer.reject_invalid_tokens = value;
        }
        if let Some(value) = env_bool("ROWSQL_ERROR_ON_MISSING_DROP")? {
            self.execution.error_on_missing_drop = value;
        }
        if let Some(value) = env_bool("ROWSQL_USE_BACKEND")? {
            self.execution.use_backend = value;
        }
        if let Ok(level) = std::env::var("ROWSQL_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Ok(format) = std::env::var("ROWSQL_LOG_FORMAT") {
            self.logging.format = format.to_lowercase();
        }
        if let Some(value) = env_bool("ROWSQL_LOG_STATEMENTS")? {
            self.logging.log_statements = value;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log format: {}. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid {}: {}", name, value))),
        Err(_) => Ok(None),
    }
}

/// Configuration builder for programmatic setup
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    pub fn new(profile: Profile) -> Self {
        Self {
            config: EngineConfig::for_profile(profile),
        }
    }

    pub fn reject_invalid_tokens(mut self, reject: bool) -> Self {
        self.config.lexer.reject_invalid_tokens = reject;
        self
    }

    pub fn error_on_missing_drop(mut self, error: bool) -> Self {
        self.config.execution.error_on_missing_drop = error;
        self
    }

    pub fn use_backend(mut self, enabled: bool) -> Self {
        self.config.execution.use_backend = enabled;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_log_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.config.logging.log_statements = enabled;
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.profile, Profile::Strict);
        assert!(config.lexer.reject_invalid_tokens);
        assert!(config.execution.error_on_missing_drop);
    }

    #[test]
    fn test_permissive_profile() {
        let config = EngineConfig::permissive();
        assert!(!config.lexer.reject_invalid_tokens);
        assert!(!config.execution.error_on_missing_drop);
        assert!(config.execution.use_backend);
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!("STRICT".parse::<Profile>().unwrap(), Profile::Strict);
        assert_eq!("lenient".parse::<Profile>().unwrap(), Profile::Permissive);
        assert!(matches!("loose".parse::<Profile>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new(Profile::Strict)
            .error_on_missing_drop(false)
            .with_log_level("debug")
            .with_log_format("json")
            .build()
            .unwrap();

        assert!(!config.execution.error_on_missing_drop);
        assert!(config.lexer.reject_invalid_tokens);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_unknown_level_and_format() {
        assert!(ConfigBuilder::new(Profile::Strict)
            .with_log_level("verbose")
            .build()
            .is_err());
        assert!(ConfigBuilder::new(Profile::Strict)
            .with_log_format("xml")
            .build()
            .is_err());
    }

    #[test]
    fn test_serde_round_trip_uses_lowercase_profile() {
        let json = serde_json::to_value(EngineConfig::permissive()).unwrap();
        assert_eq!(json["profile"], "permissive");
        let back: EngineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, EngineConfig::permissive());
    }
}
