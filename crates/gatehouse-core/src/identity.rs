//! Authenticated identities.
//!
//! An [`Identity`] is a set of string claims plus the tag of the scheme that
//! established it. Identities are immutable once built; the only way to get
//! a different identity is to construct a new one.

use crate::user::UserRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known claim keys.
pub mod claims {
    /// The principal's identification (user key).
    pub const NAME: &str = "name";

    /// Always `"true"` on identities built from a verified credential.
    pub const AUTHENTICATED: &str = "authenticated";

    /// Human readable display name, when the user record has one.
    pub const DISPLAY_NAME: &str = "display_name";
}

/// Credential schemes carried in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
    /// `Basic base64(identification:password)`
    Basic,
    /// `Bearer base64(token)`
    Bearer,
    /// `ApiKey base64(key)`
    ApiKey,
}

impl AuthScheme {
    /// Parses a scheme name, ignoring ASCII case.
    ///
    /// ```
    /// use gatehouse_core::AuthScheme;
    ///
    /// assert_eq!(AuthScheme::parse("basic"), Some(AuthScheme::Basic));
    /// assert_eq!(AuthScheme::parse("APIKEY"), Some(AuthScheme::ApiKey));
    /// assert_eq!(AuthScheme::parse("weird"), None);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("basic") {
            Some(Self::Basic)
        } else if name.eq_ignore_ascii_case("bearer") {
            Some(Self::Bearer)
        } else if name.eq_ignore_ascii_case("apikey") {
            Some(Self::ApiKey)
        } else {
            None
        }
    }

    /// The tag recorded on identities established through this scheme.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Bearer => "Bearer",
            Self::ApiKey => "ApiKey",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated principal.
///
/// # Example
///
/// ```
/// use gatehouse_core::{AuthScheme, Identity, UserRecord};
///
/// let user = UserRecord::new("alice", "pw").with_claim("role", "admin");
/// let identity = Identity::from_user(&user, AuthScheme::Basic);
///
/// assert_eq!(identity.name(), Some("alice"));
/// assert!(identity.is_authenticated());
/// assert_eq!(identity.claim("role"), Some("admin"));
/// assert_eq!(identity.scheme(), "Basic");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    scheme: String,
    claims: BTreeMap<String, String>,
}

impl Identity {
    /// Builds an identity from a user record.
    ///
    /// Extra claims on the record are copied first; `name` and
    /// `authenticated` are always set afterwards so a record cannot
    /// override them.
    #[must_use]
    pub fn from_user(user: &UserRecord, scheme: AuthScheme) -> Self {
        let mut claims = user.claims.clone();
        if let Some(display_name) = &user.display_name {
            claims.insert(claims::DISPLAY_NAME.to_string(), display_name.clone());
        }
        claims.insert(claims::NAME.to_string(), user.identification.clone());
        claims.insert(claims::AUTHENTICATED.to_string(), "true".to_string());

        Self {
            scheme: scheme.as_str().to_string(),
            claims,
        }
    }

    /// Rebuilds an identity from previously issued claims.
    #[must_use]
    pub fn from_claims(scheme: impl Into<String>, claims: BTreeMap<String, String>) -> Self {
        Self {
            scheme: scheme.into(),
            claims,
        }
    }

    /// The scheme tag, e.g. `"Basic"`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// All claims, sorted by key.
    #[must_use]
    pub fn claims(&self) -> &BTreeMap<String, String> {
        &self.claims
    }

    /// Looks up a single claim.
    #[must_use]
    pub fn claim(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(String::as_str)
    }

    /// The `name` claim.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.claim(claims::NAME)
    }

    /// Whether the `authenticated` claim is `"true"`.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.claim(claims::AUTHENTICATED) == Some("true")
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never contains secrets: only the scheme and the `name` claim.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!(
            "{}:{}",
            self.scheme.to_ascii_lowercase(),
            self.name().unwrap_or("unnamed")
        )
    }
}
