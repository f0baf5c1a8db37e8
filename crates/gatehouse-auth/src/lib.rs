//! # Gatehouse Auth
//!
//! Authentication for Gatehouse pipelines.
//!
//! - [`AuthService`] - the contract: basic, bearer and API-key entry points,
//!   an active-user hook and the current bearer token for an identity
//! - [`TokenAuthService`] - in-memory implementation issuing HS256 bearer
//!   tokens that are renewed once part of their window has elapsed
//! - [`AuthMiddleware`] - pipeline component mapping the `Authorization`
//!   header to the service and denials to status codes
//!
//! ## Status codes
//!
//! | Outcome | Status |
//! |---|---|
//! | Unknown or malformed scheme | 400 |
//! | Invalid credential, invalid or expired 2FA, expired token | 401 |
//! | Unknown identity or token | 404 |
//! | Two-factor required | 426 (+ `x-2fa-required: true`) |
//! | Cancelled while authenticating | 408 |
//! | Success without a bearer token | 500 |
//!
//! ## Example
//!
//! ```
//! use gatehouse_auth::{AuthConfig, AuthService, InMemoryUserDirectory, TokenAuthService};
//! use gatehouse_core::{fixtures, AuthError};
//!
//! # tokio_test::block_on(async {
//! let directory = InMemoryUserDirectory::new().with_user(fixtures::alice_with_two_factor());
//! let service = TokenAuthService::new(directory, AuthConfig::default()).unwrap();
//!
//! let err = service.authenticate_basic("alice", "pw", None).await.unwrap_err();
//! assert!(matches!(err, AuthError::TwoFactorRequired { .. }));
//!
//! let identity = service
//!     .authenticate_basic("alice", "pw", Some("123456"))
//!     .await
//!     .unwrap();
//! assert!(identity.is_authenticated());
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/gatehouse-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod config;
mod directory;
mod middleware;
mod service;
mod store;
mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AuthConfig, AuthConfigError, DEFAULT_ISSUER, DEFAULT_RENEW_AFTER_FRACTION,
    DEFAULT_TOKEN_TTL_SECS,
};
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use middleware::{
    parse_authorization, AuthMiddleware, BadScheme, Credentials, TWO_FACTOR_CODE_HEADER,
    TWO_FACTOR_REQUIRED_HEADER,
};
pub use service::{AuthService, TokenAuthService};
pub use store::{StoredToken, TokenStore};
pub use token::{
    IssuedToken, SigningKey, TokenClaims, TokenCodec, TokenError, GENERATED_KEY_LEN, MIN_KEY_LEN,
};
