//! Logging setup for Gatehouse.
//!
//! Gatehouse crates emit structured events through `tracing`; this crate
//! installs the subscriber that writes them out.
//!
//! ```text
//!  gatehouse-middleware ─┐
//!  gatehouse-auth ───────┼─► tracing ─► EnvFilter ─► fmt (json | pretty) ─► stdout
//!  host application ─────┘
//! ```
//!
//! Events never carry passwords or whole tokens: identities are logged as
//! `scheme:name` and tokens as a short prefix.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatehouse_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::development())?;
//!     tracing::info!("gatehouse starting");
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/gatehouse-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
