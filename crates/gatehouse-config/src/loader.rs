//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. Preset values (`default`, `development` or `production`)
//! 2. A TOML or JSON file, or an inline string
//! 3. `PREFIX__SECTION__KEY` environment variables, optionally seeded from `.env`

use std::env;
use std::fs;
use std::path::Path;

use gatehouse_telemetry::LogFormat;

use crate::{ConfigError, GatehouseConfig};

/// Builds a [`GatehouseConfig`] from presets, files and the environment.
///
/// # Example
///
/// ```no_run
/// use gatehouse_config::ConfigLoader;
///
/// # fn main() -> Result<(), gatehouse_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("gatehouse.toml")?
///     .with_dotenv()?
///     .with_env_prefix("GATEHOUSE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: GatehouseConfig,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader starting from [`GatehouseConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatehouseConfig::default(),
            env_prefix: None,
            env_vars: None,
        }
    }

    /// Start from the development preset.
    ///
    /// ```
    /// use gatehouse_config::{ConfigLoader, LogFormat};
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = GatehouseConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = GatehouseConfig::production();
        self
    }

    /// Load a `.toml` or `.json` file, chosen by extension.
    ///
    /// Sections present in the file replace the current values; missing
    /// fields fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file is not valid TOML/JSON or has unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        self.config = match extension.as_deref() {
            Some(format @ ("toml" | "json")) => parse(&content, format)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat(
                    path.display().to_string(),
                ))
            }
        };

        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or `json`).
    ///
    /// ```
    /// use gatehouse_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[auth]\ntoken_ttl_secs = 900", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.auth.token_ttl_secs, 900);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Apply `PREFIX__SECTION__KEY` overrides at [`load`](Self::load) time.
    ///
    /// For example, with prefix `GATEHOUSE`:
    /// - `GATEHOUSE__AUTH__TOKEN_TTL_SECS=900`
    /// - `GATEHOUSE__LOGGING__FORMAT=pretty`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Load a `.env` file from the current directory or its parents into the
    /// process environment. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Load the given dotenv file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::Dotenv(e.to_string()))?;
        Ok(self)
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or the result
    /// does not validate.
    pub fn load(self) -> Result<GatehouseConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` if an override cannot be parsed.
    pub fn load_unvalidated(mut self) -> Result<GatehouseConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = match self.env_vars.take() {
                Some(vars) => vars,
                None => env::vars().collect(),
            };
            apply_env_overrides(&mut self.config, &prefix, vars)?;
        }
        Ok(self.config)
    }
}

fn parse(content: &str, format: &str) -> Result<GatehouseConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn apply_env_overrides(
    config: &mut GatehouseConfig,
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    let prefix = format!("{prefix}__");
    for (key, value) in vars {
        if let Some(path) = key.strip_prefix(&prefix) {
            apply_env_var(config, &key, path, &value)?;
        }
    }
    Ok(())
}

fn apply_env_var(
    config: &mut GatehouseConfig,
    key: &str,
    path: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let parts: Vec<&str> = path.split("__").collect();

    match parts.as_slice() {
        ["AUTH", "TOKEN_TTL_SECS"] => {
            config.auth.token_ttl_secs = value
                .parse()
                .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
        }
        ["AUTH", "RENEW_AFTER_FRACTION"] => {
            config.auth.renew_after_fraction = value
                .parse()
                .map_err(|_| ConfigError::env_parse_error(key, "expected float"))?;
        }
        ["AUTH", "SIGNING_KEY"] => {
            config.auth.signing_key = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        ["AUTH", "ISSUER"] => {
            config.auth.issuer = value.to_string();
        }

        ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool(key, value)?,
        ["LOGGING", "FILTER"] => {
            config.logging.filter = value.to_string();
        }
        ["LOGGING", "FORMAT"] => {
            config.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::env_parse_error(
                        key,
                        "expected 'json' or 'pretty'",
                    ))
                }
            };
        }
        ["LOGGING", "SPAN_EVENTS"] => config.logging.span_events = parse_bool(key, value)?,
        ["LOGGING", "FILE_LINE_INFO"] => config.logging.file_line_info = parse_bool(key, value)?,
        ["LOGGING", "INCLUDE_TARGET"] => config.logging.include_target = parse_bool(key, value)?,

        // Unknown keys under the prefix are ignored.
        _ => {}
    }

    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}
