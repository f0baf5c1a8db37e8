//! Authentication service settings.

use crate::token::SigningKey;
use chrono::Duration;
use thiserror::Error;

/// Default token lifetime: 60 minutes.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Default renewal threshold: half the validity window.
pub const DEFAULT_RENEW_AFTER_FRACTION: f64 = 0.5;

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "gatehouse";

/// Invalid [`AuthConfig`] values.
#[derive(Debug, Error, PartialEq)]
pub enum AuthConfigError {
    /// TTL must be positive.
    #[error("token TTL must be positive, got {seconds}s")]
    NonPositiveTtl {
        /// The configured TTL in seconds.
        seconds: i64,
    },

    /// Fraction must be in (0, 1].
    #[error("renew_after_fraction must be in (0, 1], got {fraction}")]
    RenewFractionOutOfRange {
        /// The configured fraction.
        fraction: f64,
    },

    /// Issuer must not be blank.
    #[error("token issuer must not be empty")]
    EmptyIssuer,
}

/// Settings for [`TokenAuthService`](crate::TokenAuthService).
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use gatehouse_auth::AuthConfig;
///
/// let config = AuthConfig::default().with_token_ttl(Duration::minutes(10));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.renewal_threshold(), Duration::minutes(5));
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long issued tokens stay valid.
    pub token_ttl: Duration,
    /// Fraction of the validity window after which a presented token is renewed.
    pub renew_after_fraction: f64,
    /// HS256 key. Defaults to a random key generated at construction.
    pub signing_key: SigningKey,
    /// `iss` claim written into and required from tokens.
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            renew_after_fraction: DEFAULT_RENEW_AFTER_FRACTION,
            signing_key: SigningKey::generate(),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

impl AuthConfig {
    /// Sets the token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Sets the renewal threshold.
    pub fn with_renew_after_fraction(mut self, fraction: f64) -> Self {
        self.renew_after_fraction = fraction;
        self
    }

    /// Sets the signing key.
    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = key;
        self
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Checks value ranges. Key length is enforced by [`SigningKey`] itself.
    pub fn validate(&self) -> Result<(), AuthConfigError> {
        if self.token_ttl <= Duration::zero() {
            return Err(AuthConfigError::NonPositiveTtl {
                seconds: self.token_ttl.num_seconds(),
            });
        }
        if !(self.renew_after_fraction > 0.0 && self.renew_after_fraction <= 1.0) {
            return Err(AuthConfigError::RenewFractionOutOfRange {
                fraction: self.renew_after_fraction,
            });
        }
        if self.issuer.trim().is_empty() {
            return Err(AuthConfigError::EmptyIssuer);
        }
        Ok(())
    }

    /// Elapsed time after which a presented token is renewed.
    #[must_use]
    pub fn renewal_threshold(&self) -> Duration {
        window_fraction(self.token_ttl, self.renew_after_fraction)
    }
}

/// `window * fraction`, at millisecond precision.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn window_fraction(window: Duration, fraction: f64) -> Duration {
    let millis = window.num_milliseconds() as f64 * fraction;
    Duration::milliseconds(millis.round() as i64)
}
