//! Typed configuration for Gatehouse.
//!
//! - TOML and JSON files
//! - Strict parsing (unknown fields are errors)
//! - Layered loading: preset, then file, then environment
//! - Conversion into [`gatehouse_auth::AuthConfig`] and
//!   [`gatehouse_telemetry::LogConfig`]
//!
//! # Configuration File Format
//!
//! ```toml
//! [auth]
//! token_ttl_secs = 3600
//! renew_after_fraction = 0.5
//! # base64, at least 32 bytes; a random key is generated when omitted
//! signing_key = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKioq"
//! issuer = "gatehouse"
//!
//! [logging]
//! enabled = true
//! filter = "info,gatehouse_auth=debug"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Any field can be overridden as `PREFIX__SECTION__KEY`:
//!
//! - `GATEHOUSE__AUTH__TOKEN_TTL_SECS=900`
//! - `GATEHOUSE__LOGGING__FORMAT=pretty`
//!
//! # Example
//!
//! ```no_run
//! use gatehouse_config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("gatehouse.toml")?
//!     .with_env_prefix("GATEHOUSE")
//!     .load()?;
//!
//! gatehouse_telemetry::init_logging(&config.to_log_config())?;
//! let auth = config.to_auth_config()?;
//! # let _ = auth;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/gatehouse-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{AuthSection, GatehouseConfig, LoggingSection};
pub use error::ConfigError;
pub use loader::ConfigLoader;

pub use gatehouse_telemetry::LogFormat;
