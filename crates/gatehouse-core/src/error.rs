//! Authentication error taxonomy.
//!
//! Every denial produced by an authentication service is an [`AuthError`].
//! The taxonomy is closed: each variant belongs to exactly one
//! [`ErrorCategory`], and each category maps to exactly one HTTP status code.
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `UnknownIdentity`, `UnknownToken` | `NotFound` | 404 |
//! | `InvalidCredential`, `InvalidTwoFactor`, `ExpiredToken`, `ExpiredTwoFactor` | `Authentication` | 401 |
//! | `TwoFactorRequired` | `TwoFactorRequired` | 426 |
//! | `Unsupported`, `Internal` | `Authentication` | 401 |
//!
//! Variants carry what is needed to explain the denial (identification,
//! token, expiry, two-factor type). They never carry a password.

use crate::user::TwoFactorType;
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`AuthError`].
pub type AuthResult<T> = Result<T, AuthError>;

/// Categories of denial, each with a fixed status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The `Authorization` header could not be understood.
    BadScheme,
    /// Credentials were presented but are not acceptable.
    Authentication,
    /// The identity or token does not exist.
    NotFound,
    /// A second factor must be supplied.
    TwoFactorRequired,
    /// Authentication did not finish before the request was cancelled.
    Cancelled,
    /// The pipeline or service broke its own contract.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::BadScheme => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::TwoFactorRequired => StatusCode::UPGRADE_REQUIRED,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A typed authentication denial.
///
/// # Example
///
/// ```
/// use gatehouse_core::{AuthError, ErrorCategory};
/// use http::StatusCode;
///
/// let err = AuthError::UnknownIdentity { identification: "nobody".into() };
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Error)]
pub enum AuthError {
    /// No user exists with this identification.
    #[error("unknown identity '{identification}'")]
    UnknownIdentity {
        /// The identification that was looked up.
        identification: String,
    },

    /// The password (or API key) did not match.
    #[error("invalid credentials for '{identification}'")]
    InvalidCredential {
        /// The identification the credential was presented for.
        identification: String,
    },

    /// The bearer token is not in the store or failed validation.
    #[error("unknown bearer token {}", redact_token(.token))]
    UnknownToken {
        /// The presented token.
        token: String,
    },

    /// The bearer token is valid but past its expiry.
    #[error("bearer token {} expired at {expired_at}", redact_token(.token))]
    ExpiredToken {
        /// The presented token.
        token: String,
        /// When the token stopped being valid.
        expired_at: DateTime<Utc>,
    },

    /// The user has a second factor and no code was supplied.
    #[error("two-factor code ({kind}) required for '{identification}'")]
    TwoFactorRequired {
        /// The user being authenticated.
        identification: String,
        /// What kind of code is expected.
        kind: TwoFactorType,
    },

    /// The supplied two-factor code did not match.
    #[error("invalid two-factor code for '{identification}'")]
    InvalidTwoFactor {
        /// The user being authenticated.
        identification: String,
        /// What kind of code was expected.
        kind: TwoFactorType,
    },

    /// The supplied two-factor code is no longer accepted.
    #[error("two-factor code for '{identification}' has expired")]
    ExpiredTwoFactor {
        /// The user being authenticated.
        identification: String,
        /// What kind of code was expected.
        kind: TwoFactorType,
        /// When the code stopped being accepted, if known.
        expired_at: Option<DateTime<Utc>>,
    },

    /// The service does not implement this scheme.
    #[error("authentication scheme '{scheme}' is not supported")]
    Unsupported {
        /// The scheme that was requested.
        scheme: String,
    },

    /// The service failed for reasons unrelated to the credential.
    #[error("authentication failed: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AuthError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownIdentity { .. } | Self::UnknownToken { .. } => ErrorCategory::NotFound,
            Self::TwoFactorRequired { .. } => ErrorCategory::TwoFactorRequired,
            Self::InvalidCredential { .. }
            | Self::ExpiredToken { .. }
            | Self::InvalidTwoFactor { .. }
            | Self::ExpiredTwoFactor { .. }
            | Self::Unsupported { .. }
            | Self::Internal { .. } => ErrorCategory::Authentication,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Whether the response should tell the client to retry with a two-factor code.
    #[must_use]
    pub const fn requires_two_factor(&self) -> bool {
        matches!(
            self,
            Self::TwoFactorRequired { .. } | Self::ExpiredTwoFactor { .. }
        )
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownIdentity { .. } => "UNKNOWN_IDENTITY",
            Self::InvalidCredential { .. } => "INVALID_CREDENTIAL",
            Self::UnknownToken { .. } => "UNKNOWN_TOKEN",
            Self::ExpiredToken { .. } => "EXPIRED_TOKEN",
            Self::TwoFactorRequired { .. } => "TWO_FACTOR_REQUIRED",
            Self::InvalidTwoFactor { .. } => "INVALID_TWO_FACTOR",
            Self::ExpiredTwoFactor { .. } => "EXPIRED_TWO_FACTOR",
            Self::Unsupported { .. } => "UNSUPPORTED_SCHEME",
            Self::Internal { .. } => "AUTHENTICATION_ERROR",
        }
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// Internal errors are reported with a generic message so adopter
    /// failure details never reach the client.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self {
            Self::Internal { .. } => "authentication failed".to_string(),
            other => other.to_string(),
        };

        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::ExpiredToken { expired_at, .. } => Some(serde_json::json!({
                "expired_at": expired_at.to_rfc3339(),
            })),
            Self::TwoFactorRequired { kind, .. } | Self::InvalidTwoFactor { kind, .. } => {
                Some(serde_json::json!({ "two_factor_type": kind }))
            }
            Self::ExpiredTwoFactor {
                kind, expired_at, ..
            } => Some(serde_json::json!({
                "two_factor_type": kind,
                "expired_at": expired_at.map(|at| at.to_rfc3339()),
            })),
            _ => None,
        }
    }
}

// Token values are shortened here as in `Display`.
impl fmt::Debug for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIdentity { identification } => f
                .debug_struct("UnknownIdentity")
                .field("identification", identification)
                .finish(),
            Self::InvalidCredential { identification } => f
                .debug_struct("InvalidCredential")
                .field("identification", identification)
                .finish(),
            Self::UnknownToken { token } => f
                .debug_struct("UnknownToken")
                .field("token", &redact_token(token))
                .finish(),
            Self::ExpiredToken { token, expired_at } => f
                .debug_struct("ExpiredToken")
                .field("token", &redact_token(token))
                .field("expired_at", expired_at)
                .finish(),
            Self::TwoFactorRequired {
                identification,
                kind,
            } => f
                .debug_struct("TwoFactorRequired")
                .field("identification", identification)
                .field("kind", kind)
                .finish(),
            Self::InvalidTwoFactor {
                identification,
                kind,
            } => f
                .debug_struct("InvalidTwoFactor")
                .field("identification", identification)
                .field("kind", kind)
                .finish(),
            Self::ExpiredTwoFactor {
                identification,
                kind,
                expired_at,
            } => f
                .debug_struct("ExpiredTwoFactor")
                .field("identification", identification)
                .field("kind", kind)
                .field("expired_at", expired_at)
                .finish(),
            Self::Unsupported { scheme } => f
                .debug_struct("Unsupported")
                .field("scheme", scheme)
                .finish(),
            Self::Internal { message, source } => f
                .debug_struct("Internal")
                .field("message", message)
                .field("source", source)
                .finish(),
        }
    }
}

/// Shortens a token for messages and logs.
fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{prefix}…")
    } else {
        prefix
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
