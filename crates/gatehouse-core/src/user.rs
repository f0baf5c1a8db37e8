//! User records as supplied by a user directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of second factor a denial refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoFactorType {
    /// A numeric code whose length is not disclosed to the client.
    NumericUnknown,
}

impl fmt::Display for TwoFactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumericUnknown => f.write_str("numeric"),
        }
    }
}

/// A user known to the authentication service.
///
/// The password is compared verbatim; whether it was hashed upstream is the
/// directory's concern. `Debug` output never includes the password or the
/// two-factor code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique key the user logs in with.
    pub identification: String,

    /// Password compared against the basic-auth credential.
    pub password: String,

    /// Numeric two-factor code; `0` disables the second factor.
    #[serde(default)]
    pub two_factor_code: u32,

    /// When set, a correct code supplied after this instant is rejected as expired.
    #[serde(default)]
    pub two_factor_valid_until: Option<DateTime<Utc>>,

    /// Optional human readable name.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Additional claims copied onto the identity.
    #[serde(default)]
    pub claims: BTreeMap<String, String>,
}

impl UserRecord {
    /// Creates a user without a second factor.
    #[must_use]
    pub fn new(identification: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identification: identification.into(),
            password: password.into(),
            two_factor_code: 0,
            two_factor_valid_until: None,
            display_name: None,
            claims: BTreeMap::new(),
        }
    }

    /// Enables the second factor with the given code.
    #[must_use]
    pub fn with_two_factor(mut self, code: u32) -> Self {
        self.two_factor_code = code;
        self
    }

    /// Limits how long the current two-factor code is accepted.
    #[must_use]
    pub fn with_two_factor_valid_until(mut self, deadline: DateTime<Utc>) -> Self {
        self.two_factor_valid_until = Some(deadline);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Adds an extra claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    /// Whether a second factor is required for this user.
    #[must_use]
    pub const fn two_factor_enabled(&self) -> bool {
        self.two_factor_code != 0
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("identification", &self.identification)
            .field("password", &"<redacted>")
            .field("two_factor_enabled", &self.two_factor_enabled())
            .field("two_factor_valid_until", &self.two_factor_valid_until)
            .field("display_name", &self.display_name)
            .field("claims", &self.claims)
            .finish()
    }
}
