//! The authentication service.
//!
//! [`AuthService`] is the contract the [`AuthMiddleware`](crate::AuthMiddleware)
//! consumes. [`TokenAuthService`] is the in-memory implementation: users come
//! from a [`UserDirectory`], bearer tokens are signed with the configured key
//! and kept in a [`TokenStore`] owned by the service.
//!
//! ## Basic
//!
//! 1. Unknown identification → `UnknownIdentity`
//! 2. Password mismatch → `InvalidCredential`
//! 3. Two-factor enabled: no code → `TwoFactorRequired`, wrong code →
//!    `InvalidTwoFactor`, right code past its deadline → `ExpiredTwoFactor`
//! 4. Identity tagged `Basic`, a new token is issued and stored
//!
//! ## Bearer
//!
//! 1. Token not in the store → `UnknownToken`
//! 2. Expired → `ExpiredToken`; any other validation failure → `UnknownToken`
//! 3. More than `renew_after_fraction` of the window elapsed → a new token is
//!    issued for the same identity; the old entry stays in the store
//! 4. Identity tagged `Bearer`

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, AuthConfigError};
use crate::directory::UserDirectory;
use crate::store::{StoredToken, TokenStore};
use crate::token::{IssuedToken, TokenCodec, TokenError};
use async_trait::async_trait;
use gatehouse_core::{AuthError, AuthResult, AuthScheme, Identity, TwoFactorType, UserRecord};
use std::fmt;
use std::sync::Arc;

/// Turns credentials into identities.
///
/// Denials are returned as [`AuthError`]; the middleware maps them to
/// responses. Implementations must not panic, but a panic is contained at
/// the middleware boundary and answered with 401.
#[async_trait]
pub trait AuthService: Send + Sync + 'static {
    /// Authenticates an identification and password, with an optional
    /// second-factor code.
    async fn authenticate_basic(
        &self,
        identification: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> AuthResult<Identity>;

    /// Authenticates a previously issued bearer token.
    async fn authenticate_bearer(&self, token: &str) -> AuthResult<Identity>;

    /// Authenticates an API key. Unsupported unless overridden.
    async fn authenticate_api_key(&self, api_key: &str) -> AuthResult<Identity> {
        let _ = api_key;
        Err(AuthError::Unsupported {
            scheme: AuthScheme::ApiKey.as_str().to_string(),
        })
    }

    /// Called once an identity is attached to the request.
    async fn on_active_user(&self, identity: &Identity) {
        let _ = identity;
    }

    /// The token the client should use from now on.
    async fn current_bearer_token(&self, identity: &Identity) -> Option<String>;
}

type ActiveUserHook = Arc<dyn Fn(&Identity) + Send + Sync>;

/// In-memory [`AuthService`] with signed, renewable bearer tokens.
///
/// # Example
///
/// ```
/// use gatehouse_auth::{AuthConfig, AuthService, InMemoryUserDirectory, TokenAuthService};
/// use gatehouse_core::fixtures;
///
/// # tokio_test::block_on(async {
/// let directory = InMemoryUserDirectory::from_users(fixtures::all_users());
/// let service = TokenAuthService::new(directory, AuthConfig::default()).unwrap();
///
/// let identity = service.authenticate_basic("alice", "pw", None).await.unwrap();
/// assert_eq!(identity.name(), Some("alice"));
/// assert!(service.current_bearer_token(&identity).await.is_some());
/// # });
/// ```
pub struct TokenAuthService {
    directory: Arc<dyn UserDirectory>,
    config: AuthConfig,
    codec: TokenCodec,
    store: TokenStore,
    clock: Arc<dyn Clock>,
    active_user_hook: Option<ActiveUserHook>,
}

impl TokenAuthService {
    /// Creates a service over `directory`.
    pub fn new(directory: impl UserDirectory, config: AuthConfig) -> Result<Self, AuthConfigError> {
        Self::with_directory(Arc::new(directory), config)
    }

    /// Creates a service over a shared directory.
    pub fn with_directory(
        directory: Arc<dyn UserDirectory>,
        config: AuthConfig,
    ) -> Result<Self, AuthConfigError> {
        config.validate()?;
        let codec = TokenCodec::new(&config.signing_key, config.issuer.clone());

        tracing::debug!(
            token_ttl_secs = config.token_ttl.num_seconds(),
            renew_after_fraction = config.renew_after_fraction,
            issuer = %config.issuer,
            "token auth service configured"
        );

        Ok(Self {
            directory,
            config,
            codec,
            store: TokenStore::new(),
            clock: Arc::new(SystemClock),
            active_user_hook: None,
        })
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a callback for [`AuthService::on_active_user`].
    #[must_use]
    pub fn with_active_user_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Identity) + Send + Sync + 'static,
    {
        self.active_user_hook = Some(Arc::new(hook));
        self
    }

    /// The service's token store.
    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// The service's settings.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Signs a token for `identity` and stores it.
    ///
    /// Signing completes before the store is touched, and nothing between
    /// the two awaits.
    pub fn issue_token(&self, identity: &Identity) -> AuthResult<IssuedToken> {
        let issued = self
            .codec
            .issue(identity, self.clock.now(), self.config.token_ttl)
            .map_err(|e| AuthError::internal_with_source("failed to sign bearer token", e))?;

        self.store.insert(
            issued.token.clone(),
            StoredToken {
                identity: identity.clone(),
                issued_at: issued.issued_at,
                expires_at: issued.expires_at,
            },
        );

        tracing::info!(
            identity = %identity.log_id(),
            expires_at = %issued.expires_at,
            "bearer token issued"
        );
        Ok(issued)
    }

    fn check_two_factor(&self, user: &UserRecord, supplied: Option<&str>) -> AuthResult<()> {
        if !user.two_factor_enabled() {
            return Ok(());
        }
        let kind = TwoFactorType::NumericUnknown;

        let Some(code) = supplied.map(str::trim).filter(|c| !c.is_empty()) else {
            return Err(AuthError::TwoFactorRequired {
                identification: user.identification.clone(),
                kind,
            });
        };

        let matches = code
            .parse::<u32>()
            .is_ok_and(|code| code == user.two_factor_code);
        if !matches {
            return Err(AuthError::InvalidTwoFactor {
                identification: user.identification.clone(),
                kind,
            });
        }

        if let Some(deadline) = user.two_factor_valid_until {
            if self.clock.now() > deadline {
                return Err(AuthError::ExpiredTwoFactor {
                    identification: user.identification.clone(),
                    kind,
                    expired_at: Some(deadline),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for TokenAuthService {
    async fn authenticate_basic(
        &self,
        identification: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> AuthResult<Identity> {
        let Some(user) = self.directory.find_user(identification).await? else {
            tracing::debug!(identification, "basic auth: unknown identity");
            return Err(AuthError::UnknownIdentity {
                identification: identification.to_string(),
            });
        };

        if user.password != password {
            tracing::debug!(identification, "basic auth: password mismatch");
            return Err(AuthError::InvalidCredential {
                identification: identification.to_string(),
            });
        }

        self.check_two_factor(&user, two_factor_code)?;

        let identity = Identity::from_user(&user, AuthScheme::Basic);
        self.issue_token(&identity)?;
        Ok(identity)
    }

    async fn authenticate_bearer(&self, token: &str) -> AuthResult<Identity> {
        let unknown = || AuthError::UnknownToken {
            token: token.to_string(),
        };

        let Some(stored) = self.store.get(token) else {
            tracing::debug!("bearer auth: token not in store");
            return Err(unknown());
        };

        let now = self.clock.now();
        match self.codec.decode(token, now) {
            Ok(_) => {}
            Err(TokenError::Expired { expired_at }) => {
                tracing::debug!(
                    identity = %stored.identity.log_id(),
                    %expired_at,
                    "bearer auth: token expired"
                );
                return Err(AuthError::ExpiredToken {
                    token: token.to_string(),
                    expired_at,
                });
            }
            Err(error) => {
                tracing::warn!(%error, "bearer auth: stored token failed validation");
                return Err(unknown());
            }
        }

        // Measured from the exact issue instant; `iat` is whole seconds.
        let elapsed = now - stored.issued_at;
        if elapsed > self.config.renewal_threshold() {
            tracing::debug!(
                identity = %stored.identity.log_id(),
                elapsed_secs = elapsed.num_seconds(),
                "bearer auth: renewing token"
            );
            self.issue_token(&stored.identity)?;
        }

        Ok(Identity::from_claims(
            AuthScheme::Bearer.as_str(),
            stored.identity.claims().clone(),
        ))
    }

    async fn authenticate_api_key(&self, api_key: &str) -> AuthResult<Identity> {
        let Some(user) = self.directory.find_user_by_api_key(api_key).await? else {
            tracing::debug!("api key auth: unknown key");
            return Err(AuthError::InvalidCredential {
                identification: "api key".to_string(),
            });
        };

        let identity = Identity::from_user(&user, AuthScheme::ApiKey);
        self.issue_token(&identity)?;
        Ok(identity)
    }

    async fn on_active_user(&self, identity: &Identity) {
        tracing::trace!(identity = %identity.log_id(), "active user");
        if let Some(hook) = &self.active_user_hook {
            hook(identity);
        }
    }

    async fn current_bearer_token(&self, identity: &Identity) -> Option<String> {
        self.store.current_token(identity)
    }
}

impl fmt::Debug for TokenAuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthService")
            .field("config", &self.config)
            .field("tokens", &self.store.len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
