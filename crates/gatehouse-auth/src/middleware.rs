//! Authentication pipeline component.
//!
//! Bridges the `Authorization` header to an [`AuthService`]:
//!
//! ```text
//! no header ─────────────────────────────────────────────► forward (anonymous)
//! header ─► parse ─┬─ bad ─────────────────────────────────► 400
//!                  └─ ok ─► dispatch ─┬─ denied ───────────► 401 / 404 / 426
//!                                     ├─ cancelled ────────► 408
//!                                     └─ identity ─► hook ─► token ─► forward
//!                                                             │
//!                                              no token ─► 500
//! ```
//!
//! A successful response carries `Authorization: Bearer <base64(token)>`.

use crate::service::AuthService;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::FutureExt;
use gatehouse_core::{AuthError, AuthResult, AuthScheme, ErrorCategory, Identity};
use gatehouse_middleware::{
    BoxFuture, Middleware, Next, Request, RequestContext, Response, ResponseExt,
};
use http::header::{HeaderValue, AUTHORIZATION};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Request header carrying the second-factor code for basic authentication.
pub const TWO_FACTOR_CODE_HEADER: &str = "x-2fa-code";

/// Response header set to `true` when the client should retry with a code.
pub const TWO_FACTOR_REQUIRED_HEADER: &str = "x-2fa-required";

/// Why an `Authorization` header could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BadScheme {
    /// The scheme is not basic, bearer or apikey.
    #[error("unknown authorization scheme '{0}'")]
    UnknownScheme(String),

    /// The scheme is known but the credentials are unusable.
    #[error("malformed authorization header: {0}")]
    Malformed(&'static str),
}

/// Credentials decoded from the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `basic base64(identification:password)`
    Basic {
        /// Everything before the first `:`.
        identification: String,
        /// Everything after it.
        password: String,
    },
    /// `bearer base64(token)`
    Bearer(String),
    /// `apikey base64(key)`
    ApiKey(String),
}

impl Credentials {
    /// The scheme these credentials belong to.
    #[must_use]
    pub const fn scheme(&self) -> AuthScheme {
        match self {
            Self::Basic { .. } => AuthScheme::Basic,
            Self::Bearer(_) => AuthScheme::Bearer,
            Self::ApiKey(_) => AuthScheme::ApiKey,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { identification, .. } => f
                .debug_struct("Basic")
                .field("identification", identification)
                .finish_non_exhaustive(),
            Self::Bearer(_) => f.write_str("Bearer(..)"),
            Self::ApiKey(_) => f.write_str("ApiKey(..)"),
        }
    }
}

/// Parses `<scheme> <base64-credentials>`.
///
/// ```
/// use gatehouse_auth::{parse_authorization, Credentials};
///
/// let credentials = parse_authorization("Basic YWxpY2U6cHc=").unwrap();
/// assert_eq!(
///     credentials,
///     Credentials::Basic { identification: "alice".into(), password: "pw".into() }
/// );
/// ```
pub fn parse_authorization(value: &str) -> Result<Credentials, BadScheme> {
    let value = value.trim();
    let (scheme_name, encoded) = value.split_once(' ').unwrap_or((value, ""));

    let scheme = AuthScheme::parse(scheme_name)
        .ok_or_else(|| BadScheme::UnknownScheme(scheme_name.to_string()))?;

    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(BadScheme::Malformed("missing credentials"));
    }
    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| BadScheme::Malformed("credentials are not valid base64"))?;
    let decoded =
        String::from_utf8(decoded).map_err(|_| BadScheme::Malformed("credentials are not UTF-8"))?;

    match scheme {
        AuthScheme::Basic => {
            let (identification, password) = decoded
                .split_once(':')
                .ok_or(BadScheme::Malformed("basic credentials have no ':' separator"))?;
            Ok(Credentials::Basic {
                identification: identification.to_string(),
                password: password.to_string(),
            })
        }
        AuthScheme::Bearer => Ok(Credentials::Bearer(decoded)),
        AuthScheme::ApiKey => Ok(Credentials::ApiKey(decoded)),
    }
}

enum Outcome {
    Authenticated(Identity),
    Denied(AuthError),
    Cancelled,
}

/// Pipeline component that authenticates requests through an [`AuthService`].
///
/// # Example
///
/// ```
/// use gatehouse_auth::{AuthConfig, AuthMiddleware, InMemoryUserDirectory, TokenAuthService};
/// use gatehouse_core::fixtures;
/// use gatehouse_middleware::PipelineBuilder;
/// use std::sync::Arc;
///
/// let service = TokenAuthService::new(
///     InMemoryUserDirectory::from_users(fixtures::all_users()),
///     AuthConfig::default(),
/// )
/// .unwrap();
///
/// let mut builder = PipelineBuilder::new();
/// builder.add(AuthMiddleware::new(Arc::new(service)));
/// assert_eq!(builder.component_names(), vec!["auth"]);
/// ```
#[derive(Clone)]
pub struct AuthMiddleware {
    service: Arc<dyn AuthService>,
}

impl AuthMiddleware {
    /// Creates the component over a shared service.
    #[must_use]
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self { service }
    }

    async fn dispatch(
        &self,
        credentials: &Credentials,
        two_factor_code: Option<&str>,
    ) -> AuthResult<Identity> {
        match credentials {
            Credentials::Basic {
                identification,
                password,
            } => {
                self.service
                    .authenticate_basic(identification, password, two_factor_code)
                    .await
            }
            Credentials::Bearer(token) => self.service.authenticate_bearer(token).await,
            Credentials::ApiKey(key) => self.service.authenticate_api_key(key).await,
        }
    }

    /// Runs the service call, racing cancellation and containing panics.
    async fn authenticate(
        &self,
        cancellation: &CancellationToken,
        credentials: &Credentials,
        two_factor_code: Option<&str>,
    ) -> Outcome {
        let attempt = AssertUnwindSafe(self.dispatch(credentials, two_factor_code)).catch_unwind();

        tokio::select! {
            biased;
            () = cancellation.cancelled() => Outcome::Cancelled,
            result = attempt => match result {
                Ok(Ok(identity)) => Outcome::Authenticated(identity),
                Ok(Err(error)) => Outcome::Denied(error),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(
                        scheme = %credentials.scheme(),
                        panic = %message,
                        "authentication service panicked"
                    );
                    Outcome::Denied(AuthError::internal(format!(
                        "authentication service panicked: {message}"
                    )))
                }
            },
        }
    }
}

impl fmt::Debug for AuthMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let parsed = request
                .headers()
                .get(AUTHORIZATION)
                .map(|value| match value.to_str() {
                    Ok(value) => parse_authorization(value),
                    Err(_) => Err(BadScheme::Malformed("header is not visible ASCII")),
                });

            let credentials = match parsed {
                None => {
                    tracing::trace!(request_id = %ctx.request_id(), "no authorization header");
                    return next.run(ctx, request).await;
                }
                Some(Err(error)) => {
                    tracing::debug!(request_id = %ctx.request_id(), %error, "bad authorization header");
                    return bad_scheme(ctx, &error);
                }
                Some(Ok(credentials)) => credentials,
            };

            let two_factor_code = match request.headers().get(TWO_FACTOR_CODE_HEADER) {
                None => None,
                Some(value) => match value.to_str() {
                    Ok(code) => Some(code.to_string()),
                    Err(_) => {
                        let error = BadScheme::Malformed("two-factor code is not visible ASCII");
                        tracing::debug!(request_id = %ctx.request_id(), %error, "bad two-factor header");
                        return bad_scheme(ctx, &error);
                    }
                },
            };

            let cancellation = ctx.cancellation().clone();
            let identity = match self
                .authenticate(&cancellation, &credentials, two_factor_code.as_deref())
                .await
            {
                Outcome::Authenticated(identity) => identity,
                Outcome::Denied(error) => return deny(ctx, &credentials, &error),
                Outcome::Cancelled => {
                    tracing::debug!(request_id = %ctx.request_id(), "authentication cancelled");
                    return Response::json_error(
                        ErrorCategory::Cancelled.default_status_code(),
                        "AUTHENTICATION_CANCELLED",
                        "the request was cancelled during authentication",
                    );
                }
            };

            tracing::debug!(
                request_id = %ctx.request_id(),
                identity = %identity.log_id(),
                "request authenticated"
            );
            ctx.set_identity(identity.clone());
            self.service.on_active_user(&identity).await;

            let Some(token) = self.service.current_bearer_token(&identity).await else {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    identity = %identity.log_id(),
                    "authentication succeeded but the service has no bearer token for the identity"
                );
                return Response::json_error(
                    ErrorCategory::Internal.default_status_code(),
                    "MISSING_BEARER_TOKEN",
                    "authentication succeeded without a bearer token",
                );
            };

            let mut response = next.run(ctx, request).await;
            match HeaderValue::from_str(&format!("Bearer {}", STANDARD.encode(token))) {
                Ok(value) => {
                    response.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(error) => {
                    tracing::error!(%error, "bearer token is not a valid header value");
                }
            }
            response
        })
    }
}

fn bad_scheme(ctx: &RequestContext, error: &BadScheme) -> Response {
    let body = serde_json::json!({
        "error": {
            "code": "BAD_SCHEME",
            "message": error.to_string(),
            "category": ErrorCategory::BadScheme,
        },
        "request_id": ctx.request_id().to_string(),
    });
    Response::json(ErrorCategory::BadScheme.default_status_code(), body.to_string())
}

fn deny(ctx: &RequestContext, credentials: &Credentials, error: &AuthError) -> Response {
    let status = error.status_code();
    match error {
        AuthError::Internal { .. } => tracing::warn!(
            request_id = %ctx.request_id(),
            scheme = %credentials.scheme(),
            %status,
            error = ?error,
            "authentication failed"
        ),
        _ => tracing::debug!(
            request_id = %ctx.request_id(),
            scheme = %credentials.scheme(),
            %status,
            code = error.error_code(),
            "authentication denied"
        ),
    }

    let envelope = error.to_envelope(Some(&ctx.request_id().to_string()));
    let mut response = match serde_json::to_string(&envelope) {
        Ok(body) => Response::json(status, body),
        Err(_) => Response::json_error(status, error.error_code(), "authentication failed"),
    };

    if error.requires_two_factor() {
        response.headers_mut().insert(
            TWO_FACTOR_REQUIRED_HEADER,
            HeaderValue::from_static("true"),
        );
    }
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
