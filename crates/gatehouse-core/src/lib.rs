//! # Gatehouse Core
//!
//! Core value types shared by the Gatehouse pipeline and authentication crates.
//!
//! This crate provides the foundational types used throughout Gatehouse:
//!
//! - [`Identity`] - An authenticated principal: string claims plus a scheme tag
//! - [`AuthScheme`] - The credential schemes understood by the auth middleware
//! - [`UserRecord`] - The shape of a user as supplied by a user directory
//! - [`AuthError`] - The closed authentication error taxonomy
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/gatehouse-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod fixtures;
mod identity;
mod request_id;
mod user;

pub use error::{AuthError, AuthResult, ErrorCategory, ErrorDetail, ErrorEnvelope};
pub use identity::{claims, AuthScheme, Identity};
pub use request_id::RequestId;
pub use user::{TwoFactorType, UserRecord};
