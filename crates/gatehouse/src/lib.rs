//! # Gatehouse
//!
//! Ordered async middleware pipelines with a token-based authentication
//! component.
//!
//! | Crate | Contents |
//! |---|---|
//! | [`core`] | identities, user records, the authentication error taxonomy |
//! | [`middleware`] | pipeline builder, copy-on-write properties, terminal handler |
//! | [`auth`] | auth service, token store, auth middleware |
//! | [`config`] | layered TOML/JSON/env configuration |
//! | [`telemetry`] | structured logging setup |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gatehouse::prelude::*;
//!
//! let config = GatehouseConfig::development();
//! let directory = InMemoryUserDirectory::from_users(gatehouse::core::fixtures::all_users());
//! let service = TokenAuthService::new(directory, config.to_auth_config().unwrap()).unwrap();
//!
//! let mut builder = PipelineBuilder::new();
//! builder.add(AuthMiddleware::new(Arc::new(service)));
//! let pipeline = builder.build();
//!
//! assert_eq!(pipeline.stage_names(), vec!["auth"]);
//! ```

#![doc(html_root_url = "https://docs.rs/gatehouse/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use gatehouse_core as core;

// Re-export pipeline types
pub use gatehouse_middleware as middleware;

// Re-export authentication types
pub use gatehouse_auth as auth;

// Re-export configuration types
pub use gatehouse_config as config;

// Re-export logging setup
pub use gatehouse_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use gatehouse::prelude::*;
/// ```
pub mod prelude {
    pub use gatehouse_core::{AuthError, AuthResult, AuthScheme, Identity, RequestId, UserRecord};

    pub use gatehouse_middleware::{
        Endpoint, Middleware, Next, Pipeline, PipelineBuilder, PipelineError, Request,
        RequestContext, Response, ResponseExt,
    };

    pub use gatehouse_auth::{
        AuthConfig, AuthMiddleware, AuthService, InMemoryUserDirectory, TokenAuthService,
        UserDirectory,
    };

    pub use gatehouse_config::{ConfigLoader, GatehouseConfig};

    pub use gatehouse_telemetry::{init_logging, LogConfig};
}
