//! Configuration types.

use std::fmt;

use gatehouse_auth::{
    AuthConfig, SigningKey, DEFAULT_ISSUER, DEFAULT_RENEW_AFTER_FRACTION, DEFAULT_TOKEN_TTL_SECS,
};
use gatehouse_telemetry::{create_env_filter, LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Gatehouse configuration.
///
/// # Example
///
/// ```
/// use gatehouse_config::GatehouseConfig;
///
/// let config = GatehouseConfig::default();
/// assert_eq!(config.auth.token_ttl_secs, 3600);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GatehouseConfig {
    /// Token service settings.
    #[serde(default)]
    pub auth: AuthSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl GatehouseConfig {
    /// Pretty debug logging, default auth settings.
    #[must_use]
    pub fn development() -> Self {
        Self {
            auth: AuthSection::default(),
            logging: LoggingSection::from(&LogConfig::development()),
        }
    }

    /// JSON info logging, default auth settings.
    #[must_use]
    pub fn production() -> Self {
        Self {
            auth: AuthSection::default(),
            logging: LoggingSection::from(&LogConfig::production()),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `auth.token_ttl_secs` is not positive
    /// - `auth.renew_after_fraction` is outside (0, 1]
    /// - `auth.issuer` is blank
    /// - `auth.signing_key` is not base64 or decodes to fewer than 32 bytes
    /// - `logging.filter` is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;
        self.logging.validate()
    }

    /// Settings for the token auth service.
    ///
    /// A missing signing key yields a freshly generated random key, so every
    /// call without one produces a different key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the auth section does not validate.
    pub fn to_auth_config(&self) -> Result<AuthConfig, ConfigError> {
        self.auth.to_auth_config()
    }

    /// Settings for [`gatehouse_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        self.logging.to_log_config()
    }
}

/// `[auth]` section.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct AuthSection {
    /// Token lifetime in seconds.
    pub token_ttl_secs: i64,

    /// Fraction of the validity window after which tokens are renewed.
    pub renew_after_fraction: f64,

    /// Base64 HS256 key of at least 32 bytes. Random when absent.
    pub signing_key: Option<String>,

    /// `iss` claim of issued tokens.
    pub issuer: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            renew_after_fraction: DEFAULT_RENEW_AFTER_FRACTION,
            signing_key: None,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

impl fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSection")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("renew_after_fraction", &self.renew_after_fraction)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl AuthSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_secs <= 0 {
            return Err(ConfigError::invalid_value(
                "auth.token_ttl_secs",
                format!("must be positive, got {}", self.token_ttl_secs),
            ));
        }
        if !(self.renew_after_fraction > 0.0 && self.renew_after_fraction <= 1.0) {
            return Err(ConfigError::invalid_value(
                "auth.renew_after_fraction",
                format!("must be in (0, 1], got {}", self.renew_after_fraction),
            ));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::invalid_value("auth.issuer", "must not be empty"));
        }
        self.configured_key().map(drop)
    }

    /// Decodes the configured key, if any.
    fn configured_key(&self) -> Result<Option<SigningKey>, ConfigError> {
        self.signing_key
            .as_deref()
            .map(|encoded| {
                SigningKey::from_base64(encoded)
                    .map_err(|e| ConfigError::invalid_value("auth.signing_key", e.to_string()))
            })
            .transpose()
    }

    fn to_auth_config(&self) -> Result<AuthConfig, ConfigError> {
        self.validate()?;
        let mut config = AuthConfig::default()
            .with_token_ttl(chrono::Duration::seconds(self.token_ttl_secs))
            .with_renew_after_fraction(self.renew_after_fraction)
            .with_issuer(self.issuer.clone());
        if let Some(key) = self.configured_key()? {
            config = config.with_signing_key(key);
        }
        config.validate()?;
        Ok(config)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingSection {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `"info,gatehouse_auth=debug"`.
    pub filter: String,

    /// `json` or `pretty`.
    pub format: LogFormat,

    /// Log span open/close events.
    pub span_events: bool,

    /// Include file and line.
    pub file_line_info: bool,

    /// Include the module path.
    pub include_target: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self::from(&LogConfig::default())
    }
}

impl From<&LogConfig> for LoggingSection {
    fn from(config: &LogConfig) -> Self {
        Self {
            enabled: config.enabled,
            filter: config.filter.clone(),
            format: config.format,
            span_events: config.span_events,
            file_line_info: config.file_line_info,
            include_target: config.include_target,
        }
    }
}

impl LoggingSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        create_env_filter(&self.filter)
            .map(drop)
            .map_err(|e| ConfigError::invalid_value("logging.filter", e.to_string()))
    }

    fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            filter: self.filter.clone(),
            format: self.format,
            span_events: self.span_events,
            file_line_info: self.file_line_info,
            include_target: self.include_target,
        }
    }
}
