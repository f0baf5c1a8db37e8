//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the identity's claims, its scheme tag, a
//! unique token id and the issue/expiry instants. Expiry is checked against
//! the service [`Clock`](crate::Clock) rather than the wall clock, so it is
//! disabled in the JWT validation and enforced in [`TokenCodec::decode`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use gatehouse_core::Identity;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Minimum HS256 key length in bytes (256 bits).
pub const MIN_KEY_LEN: usize = 32;

/// Length of a generated key in bytes.
pub const GENERATED_KEY_LEN: usize = 64;

/// Errors from token handling and key material.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Key shorter than [`MIN_KEY_LEN`].
    #[error("signing key is {length} bytes; at least {minimum} bytes are required for HS256")]
    WeakKey {
        /// Supplied length.
        length: usize,
        /// Required length.
        minimum: usize,
    },

    /// The configured key is not valid base64.
    #[error("signing key is not valid base64: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    /// Signature, structure or issuer did not validate.
    #[error("token failed validation: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    /// A timestamp claim is out of range.
    #[error("token carries an out-of-range timestamp")]
    InvalidTimestamp,

    /// The token is authentic but past its expiry.
    #[error("token expired at {expired_at}")]
    Expired {
        /// The `exp` claim.
        expired_at: DateTime<Utc>,
    },

    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// Symmetric HS256 key material.
///
/// The bytes are never printed.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Arc<[u8]>,
}

impl SigningKey {
    /// Wraps raw key bytes, rejecting keys below [`MIN_KEY_LEN`].
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_LEN {
            return Err(TokenError::WeakKey {
                length: bytes.len(),
                minimum: MIN_KEY_LEN,
            });
        }
        Ok(Self {
            bytes: bytes.into(),
        })
    }

    /// Decodes a standard base64 key.
    pub fn from_base64(encoded: &str) -> Result<Self, TokenError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_bytes(bytes)
    }

    /// Generates a random [`GENERATED_KEY_LEN`]-byte key.
    ///
    /// Tokens signed with a generated key do not survive a restart.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0_u8; GENERATED_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            bytes: bytes.into(),
        }
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; keys are at least [`MIN_KEY_LEN`] bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Unique token id.
    pub jti: String,
    /// Issuer.
    pub iss: String,
    /// Scheme tag of the identity at issuance.
    pub scheme: String,
    /// Identity claims.
    pub claims: BTreeMap<String, String>,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expires at, seconds since the epoch.
    pub exp: i64,
}

impl TokenClaims {
    /// `iat` as a timestamp.
    pub fn issued_at(&self) -> Result<DateTime<Utc>, TokenError> {
        DateTime::from_timestamp(self.iat, 0).ok_or(TokenError::InvalidTimestamp)
    }

    /// `exp` as a timestamp.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        DateTime::from_timestamp(self.exp, 0).ok_or(TokenError::InvalidTimestamp)
    }

    /// Rebuilds the identity the token was issued for.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::from_claims(self.scheme.clone(), self.claims.clone())
    }
}

/// A freshly signed token.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The compact JWT.
    pub token: String,
    /// Exact issue instant. The `iat` claim holds it truncated to seconds.
    pub issued_at: DateTime<Utc>,
    /// The `exp` claim: the first instant the token is rejected.
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.token.chars().take(8).collect();
        f.debug_struct("IssuedToken")
            .field("token", &format_args!("{prefix}…"))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Signs and verifies bearer tokens with one key.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    issuer: String,
}

impl TokenCodec {
    /// Creates a codec for `issuer`.
    #[must_use]
    pub fn new(key: &SigningKey, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);

        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
            header: Header::new(Algorithm::HS256),
            validation,
            issuer,
        }
    }

    /// The `iss` value written into and required from every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs a token for `identity` valid from `now` for `ttl`.
    pub fn issue(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();
        let claims = TokenClaims {
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            scheme: identity.scheme().to_string(),
            claims: identity.claims().clone(),
            iat,
            exp,
        };

        let token = encode(&self.header, &claims, &self.encoding).map_err(TokenError::Encode)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: claims.expires_at()?,
        })
    }

    /// Verifies signature, issuer and expiry as of `now`.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::Malformed)?;
        let claims = data.claims;

        let expires_at = claims.expires_at()?;
        if now >= expires_at {
            return Err(TokenError::Expired { expired_at: expires_at });
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{fixtures, AuthScheme};

    fn codec() -> TokenCodec {
        TokenCodec::new(&SigningKey::generate(), "gatehouse-test")
    }

    fn identity() -> Identity {
        Identity::from_user(&fixtures::bob(), AuthScheme::Basic)
    }

    #[test]
    fn test_short_key_is_rejected() {
        let err = SigningKey::from_bytes(vec![7_u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            TokenError::WeakKey {
                length: 16,
                minimum: 32
            }
        ));
        assert!(SigningKey::from_bytes(vec![7_u8; 32]).is_ok());
    }

    #[test]
    fn test_key_from_base64() {
        let encoded = STANDARD.encode([1_u8; 48]);
        assert_eq!(SigningKey::from_base64(&encoded).unwrap().len(), 48);
        assert!(matches!(
            SigningKey::from_base64("not base64!"),
            Err(TokenError::KeyEncoding(_))
        ));
    }

    #[test]
    fn test_key_debug_hides_bytes() {
        let key = SigningKey::from_bytes(vec![0xAB_u8; 32]).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("len: 32"));
        assert!(!debug.contains("171"));
    }

    #[test]
    fn test_issue_then_decode() {
        let codec = codec();
        let now = Utc::now();
        let issued = codec.issue(&identity(), now, Duration::minutes(60)).unwrap();

        let claims = codec.decode(&issued.token, now).unwrap();
        assert_eq!(claims.identity(), identity());
        assert_eq!(claims.iss, "gatehouse-test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_issued_at_keeps_sub_second_precision() {
        let codec = codec();
        let now = DateTime::from_timestamp_millis(1_700_000_000_999).unwrap();
        let issued = codec.issue(&identity(), now, Duration::minutes(10)).unwrap();

        assert_eq!(issued.issued_at, now);
        assert_eq!(issued.expires_at.timestamp(), 1_700_000_600);
        assert_eq!(codec.decode(&issued.token, now).unwrap().iat, 1_700_000_000);
    }

    #[test]
    fn test_same_instant_tokens_differ() {
        let codec = codec();
        let now = Utc::now();
        let first = codec.issue(&identity(), now, Duration::minutes(1)).unwrap();
        let second = codec.issue(&identity(), now, Duration::minutes(1)).unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_expired_token_reports_expiry() {
        let codec = codec();
        let now = Utc::now();
        let issued = codec.issue(&identity(), now, Duration::minutes(10)).unwrap();

        let later = now + Duration::minutes(11);
        match codec.decode(&issued.token, later) {
            Err(TokenError::Expired { expired_at }) => assert_eq!(expired_at, issued.expires_at),
            other => panic!("expected expiry, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_key_is_malformed() {
        let now = Utc::now();
        let issued = codec().issue(&identity(), now, Duration::minutes(10)).unwrap();
        assert!(matches!(
            codec().decode(&issued.token, now),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            codec().decode("not-a-jwt", Utc::now()),
            Err(TokenError::Malformed(_))
        ));
    }
}
