//! End-to-end authentication tests.
//!
//! The service is exercised directly for the state machine and through a
//! built pipeline for the header and status-code mapping.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{Duration, Utc};
use gatehouse_auth::{
    AuthConfig, AuthMiddleware, AuthService, Clock, InMemoryUserDirectory, ManualClock,
    TokenAuthService, UserDirectory, TWO_FACTOR_CODE_HEADER, TWO_FACTOR_REQUIRED_HEADER,
};
use gatehouse_core::{fixtures, AuthError, Identity, UserRecord};
use gatehouse_middleware::{
    Pipeline, PipelineBuilder, Request, RequestContext, Response, ResponseExt,
};
use http::header::AUTHORIZATION;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Helpers
// =============================================================================

fn service(ttl: Duration) -> (Arc<TokenAuthService>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let directory = InMemoryUserDirectory::from_users(fixtures::all_users())
        .with_user(
            UserRecord::new("carol", "pw")
                .with_two_factor(fixtures::ALICE_TWO_FACTOR_CODE),
        )
        .with_api_key("k-bob", "bob");
    let service = TokenAuthService::new(directory, AuthConfig::default().with_token_ttl(ttl))
        .unwrap()
        .with_clock(clock.clone());
    (Arc::new(service), clock)
}

/// Auth followed by a component that counts requests reaching it.
fn pipeline(service: Arc<TokenAuthService>, reached: Arc<AtomicUsize>) -> Pipeline {
    let mut builder = PipelineBuilder::new();
    builder
        .add(AuthMiddleware::new(service))
        .add_fn("resource", move |ctx, _req, _next| {
            let reached = Arc::clone(&reached);
            Box::pin(async move {
                reached.fetch_add(1, Ordering::SeqCst);
                let name = ctx
                    .identity()
                    .and_then(Identity::name)
                    .unwrap_or("anonymous")
                    .to_string();
                Response::json(StatusCode::OK, format!(r#"{{"user":"{name}"}}"#))
            })
        });
    builder.build()
}

fn request(headers: &[(&str, String)]) -> Request {
    let mut builder = http::Request::builder().uri("/resource");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

fn basic(identification: &str, password: &str) -> (&'static str, String) {
    (
        "authorization",
        format!("Basic {}", STANDARD.encode(format!("{identification}:{password}"))),
    )
}

fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {}", STANDARD.encode(token)))
}

fn response_token(response: &Response) -> String {
    let value = response
        .headers()
        .get(AUTHORIZATION)
        .expect("authorization header")
        .to_str()
        .unwrap();
    let encoded = value.strip_prefix("Bearer ").expect("bearer prefix");
    String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Service state machine
// =============================================================================

#[tokio::test]
async fn test_basic_success_issues_retrievable_token() {
    let (service, _) = service(Duration::minutes(60));

    let identity = service.authenticate_basic("alice", "pw", None).await.unwrap();

    assert_eq!(identity.name(), Some("alice"));
    assert_eq!(identity.claim("authenticated"), Some("true"));
    assert_eq!(identity.scheme(), "Basic");
    assert!(service.current_bearer_token(&identity).await.is_some());
}

#[tokio::test]
async fn test_two_factor_required_then_satisfied_then_invalid() {
    let (service, _) = service(Duration::minutes(60));

    let err = service.authenticate_basic("carol", "pw", None).await.unwrap_err();
    assert!(matches!(err, AuthError::TwoFactorRequired { .. }));

    let identity = service
        .authenticate_basic("carol", "pw", Some("123456"))
        .await
        .unwrap();
    assert_eq!(identity.name(), Some("carol"));

    let err = service
        .authenticate_basic("carol", "pw", Some("000000"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidTwoFactor { .. }));
}

#[tokio::test]
async fn test_bearer_renewal_after_half_window() {
    let (service, clock) = service(Duration::minutes(10));
    let identity = service.authenticate_basic("alice", "pw", None).await.unwrap();
    let original = service.current_bearer_token(&identity).await.unwrap();

    clock.advance(Duration::minutes(6));
    service.authenticate_bearer(&original).await.unwrap();

    let renewed = service.current_bearer_token(&identity).await.unwrap();
    assert_ne!(renewed, original);
    assert_eq!(service.token_store().len(), 2);
    assert!(service.token_store().get(&original).is_some());

    // The original is still accepted until it expires.
    let again = service.authenticate_bearer(&original).await.unwrap();
    assert_eq!(again.name(), Some("alice"));
}

#[tokio::test]
async fn test_expired_bearer_carries_expiry() {
    let (service, clock) = service(Duration::minutes(10));
    let identity = service.authenticate_basic("alice", "pw", None).await.unwrap();
    let token = service.current_bearer_token(&identity).await.unwrap();
    let expected = service.token_store().get(&token).unwrap().expires_at;

    clock.advance(Duration::minutes(11));
    let err = service.authenticate_bearer(&token).await.unwrap_err();

    match err {
        AuthError::ExpiredToken { expired_at, .. } => assert_eq!(expired_at, expected),
        other => panic!("expected ExpiredToken, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_bearer_token() {
    let (service, _) = service(Duration::minutes(10));
    let err = service.authenticate_bearer("never-issued").await.unwrap_err();
    assert!(matches!(err, AuthError::UnknownToken { .. }));
}

#[tokio::test]
async fn test_issue_validate_round_trip_keeps_claims() {
    let (service, _) = service(Duration::minutes(60));
    let identity = service
        .authenticate_basic("bob", "correct horse", None)
        .await
        .unwrap();
    let token = service.current_bearer_token(&identity).await.unwrap();

    let validated = service.authenticate_bearer(&token).await.unwrap();

    assert_eq!(validated.claims(), identity.claims());
    assert_eq!(validated.claim("role"), Some("admin"));
    assert_eq!(validated.claim("tenant"), Some("acme"));
    assert_eq!(validated.claim("display_name"), Some("Bob Builder"));
}

#[tokio::test]
async fn test_evicting_expired_tokens() {
    let (service, clock) = service(Duration::minutes(10));
    let identity = service.authenticate_basic("alice", "pw", None).await.unwrap();
    let token = service.current_bearer_token(&identity).await.unwrap();

    clock.advance(Duration::minutes(11));
    assert_eq!(service.token_store().evict_expired(clock.now()), 1);

    let err = service.authenticate_bearer(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::UnknownToken { .. }));
}

// =============================================================================
// Through the pipeline
// =============================================================================

#[tokio::test]
async fn test_no_header_passes_through_anonymous() {
    let (service, _) = service(Duration::minutes(60));
    let reached = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(service, Arc::clone(&reached));

    let mut ctx = RequestContext::new();
    let response = pipeline.handle(&mut ctx, request(&[])).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(ctx.identity().is_none());
    assert!(response.headers().get(AUTHORIZATION).is_none());
    assert_eq!(body_json(response).await["user"], "anonymous");
    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_scheme_is_bad_request_and_stops() {
    let (service, _) = service(Duration::minutes(60));
    let reached = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(service, Arc::clone(&reached));

    let mut ctx = RequestContext::new();
    let response = pipeline
        .handle(&mut ctx, request(&[("authorization", "weird abc".into())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(reached.load(Ordering::SeqCst), 0);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_SCHEME");
}

#[tokio::test]
async fn test_basic_success_sets_bearer_header() {
    let (service, _) = service(Duration::minutes(60));
    let reached = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(Arc::clone(&service), Arc::clone(&reached));

    let mut ctx = RequestContext::new();
    let response = pipeline
        .handle(&mut ctx, request(&[basic("alice", "pw")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let token = response_token(&response);
    let identity = ctx.identity().expect("identity attached").clone();
    assert_eq!(service.current_bearer_token(&identity).await, Some(token));
    assert_eq!(body_json(response).await["user"], "alice");
}

#[tokio::test]
async fn test_bearer_from_response_header_authenticates_next_request() {
    let (service, _) = service(Duration::minutes(60));
    let pipeline = pipeline(service, Arc::new(AtomicUsize::new(0)));

    let mut ctx = RequestContext::new();
    let first = pipeline
        .handle(&mut ctx, request(&[basic("bob", "correct horse")]))
        .await
        .unwrap();
    let token = response_token(&first);

    let mut ctx = RequestContext::new();
    let second = pipeline
        .handle(&mut ctx, request(&[bearer(&token)]))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(ctx.identity().map(Identity::scheme), Some("Bearer"));
    assert_eq!(response_token(&second), token);
}

#[tokio::test]
async fn test_renewed_token_is_returned_to_client() {
    let (service, clock) = service(Duration::minutes(10));
    let pipeline = pipeline(service, Arc::new(AtomicUsize::new(0)));

    let mut ctx = RequestContext::new();
    let first = pipeline
        .handle(&mut ctx, request(&[basic("alice", "pw")]))
        .await
        .unwrap();
    let original = response_token(&first);

    clock.advance(Duration::minutes(6));
    let mut ctx = RequestContext::new();
    let second = pipeline
        .handle(&mut ctx, request(&[bearer(&original)]))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    assert_ne!(response_token(&second), original);
}

#[tokio::test]
async fn test_denials_map_to_status_codes() {
    let (service, clock) = service(Duration::minutes(10));
    let reached = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(Arc::clone(&service), Arc::clone(&reached));

    let identity = service.authenticate_basic("alice", "pw", None).await.unwrap();
    let expiring = service.current_bearer_token(&identity).await.unwrap();
    clock.advance(Duration::minutes(11));

    let cases = [
        (vec![basic("nobody", "pw")], StatusCode::NOT_FOUND),
        (vec![basic("alice", "wrong")], StatusCode::UNAUTHORIZED),
        (vec![bearer("never-issued")], StatusCode::NOT_FOUND),
        (vec![bearer(&expiring)], StatusCode::UNAUTHORIZED),
        (vec![basic("carol", "pw")], StatusCode::UPGRADE_REQUIRED),
        (
            vec![
                basic("carol", "pw"),
                (TWO_FACTOR_CODE_HEADER, "000000".into()),
            ],
            StatusCode::UNAUTHORIZED,
        ),
        (
            vec![("authorization", format!("ApiKey {}", STANDARD.encode("k-x")))],
            StatusCode::UNAUTHORIZED,
        ),
        (
            vec![("authorization", "Basic not-base64!".into())],
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (headers, expected) in cases {
        let mut ctx = RequestContext::new();
        let response = pipeline.handle(&mut ctx, request(&headers)).await.unwrap();
        assert_eq!(response.status(), expected, "headers: {headers:?}");
        assert!(ctx.identity().is_none());
    }
    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_two_factor_flow_over_http() {
    let (service, _) = service(Duration::minutes(60));
    let pipeline = pipeline(service, Arc::new(AtomicUsize::new(0)));

    let mut ctx = RequestContext::new();
    let challenge = pipeline
        .handle(&mut ctx, request(&[basic("carol", "pw")]))
        .await
        .unwrap();
    assert_eq!(challenge.status(), StatusCode::UPGRADE_REQUIRED);
    assert_eq!(
        challenge.headers().get(TWO_FACTOR_REQUIRED_HEADER).unwrap(),
        "true"
    );
    let body = body_json(challenge).await;
    assert_eq!(body["error"]["code"], "TWO_FACTOR_REQUIRED");
    assert_eq!(body["error"]["details"]["two_factor_type"], "numeric_unknown");

    let mut ctx = RequestContext::new();
    let accepted = pipeline
        .handle(
            &mut ctx,
            request(&[
                basic("carol", "pw"),
                (TWO_FACTOR_CODE_HEADER, "123456".into()),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    assert!(accepted.headers().get(TWO_FACTOR_REQUIRED_HEADER).is_none());
}

#[tokio::test]
async fn test_api_key_over_http() {
    let (service, _) = service(Duration::minutes(60));
    let pipeline = pipeline(service, Arc::new(AtomicUsize::new(0)));

    let mut ctx = RequestContext::new();
    let response = pipeline
        .handle(
            &mut ctx,
            request(&[("authorization", format!("apikey {}", STANDARD.encode("k-bob")))]),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.identity().map(Identity::scheme), Some("ApiKey"));
    assert!(response.headers().get(AUTHORIZATION).is_some());
}

#[tokio::test]
async fn test_missing_current_token_is_internal_error() {
    struct Forgetful;

    #[async_trait::async_trait]
    impl AuthService for Forgetful {
        async fn authenticate_basic(
            &self,
            identification: &str,
            _password: &str,
            _two_factor_code: Option<&str>,
        ) -> Result<Identity, AuthError> {
            Ok(Identity::from_user(
                &UserRecord::new(identification, ""),
                gatehouse_core::AuthScheme::Basic,
            ))
        }

        async fn authenticate_bearer(&self, token: &str) -> Result<Identity, AuthError> {
            Err(AuthError::UnknownToken {
                token: token.to_string(),
            })
        }

        async fn current_bearer_token(&self, _identity: &Identity) -> Option<String> {
            None
        }
    }

    let mut builder = PipelineBuilder::new();
    builder
        .add(AuthMiddleware::new(Arc::new(Forgetful)))
        .add_fn("resource", |_ctx, _req, _next| {
            Box::pin(async { Response::status_only(StatusCode::OK) })
        });
    let pipeline = builder.build();

    let mut ctx = RequestContext::new();
    let response = pipeline
        .handle(&mut ctx, request(&[basic("alice", "pw")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Cancellation and concurrency
// =============================================================================

/// Directory whose lookups wait until released.
struct GatedDirectory {
    inner: InMemoryUserDirectory,
    entered: Arc<tokio::sync::Notify>,
    release: Arc<tokio::sync::Notify>,
}

#[async_trait::async_trait]
impl UserDirectory for GatedDirectory {
    async fn find_user(&self, identification: &str) -> Result<Option<UserRecord>, AuthError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.find_user(identification).await
    }
}

#[tokio::test]
async fn test_cancelled_during_lookup_commits_no_token() {
    let entered = Arc::new(tokio::sync::Notify::new());
    let release = Arc::new(tokio::sync::Notify::new());
    let directory = GatedDirectory {
        inner: InMemoryUserDirectory::from_users(fixtures::all_users()),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    };
    let service = Arc::new(
        TokenAuthService::with_directory(Arc::new(directory), AuthConfig::default()).unwrap(),
    );
    let pipeline = pipeline(Arc::clone(&service), Arc::new(AtomicUsize::new(0)));

    let cancellation = CancellationToken::new();
    let token = cancellation.clone();
    let req = request(&[basic("alice", "pw")]);
    let task = tokio::spawn(async move {
        let mut ctx = RequestContext::new().with_cancellation(token);
        pipeline.handle(&mut ctx, req).await
    });

    entered.notified().await;
    cancellation.cancel();
    let response = task.await.unwrap().unwrap();
    release.notify_one();
    tokio::task::yield_now().await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(response.headers().get(AUTHORIZATION).is_none());
    assert!(service.token_store().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_basic_and_bearer_share_one_store() {
    let (service, _) = service(Duration::minutes(10));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let (name, password) = if i % 2 == 0 {
                    ("alice", "pw")
                } else {
                    ("bob", "correct horse")
                };
                let identity = service.authenticate_basic(name, password, None).await.unwrap();
                let token = service.current_bearer_token(&identity).await.unwrap();
                let bearer = service.authenticate_bearer(&token).await.unwrap();
                assert_eq!(bearer.name(), Some(name));
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    // One token per basic login; no bearer call crossed the renewal threshold.
    assert_eq!(service.token_store().len(), 32);
    for name in ["alice", "bob"] {
        let user = UserRecord::new(name, "");
        let identity = Identity::from_user(&user, gatehouse_core::AuthScheme::Basic);
        let current = service.current_bearer_token(&identity).await.unwrap();
        assert!(service.token_store().get(&current).is_some());
    }
}
