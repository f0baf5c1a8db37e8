//! Per-request context.
//!
//! The [`RequestContext`] is the only place request-scoped state lives while
//! a request travels through the pipeline. Components must not keep request
//! state on themselves; they read and write it here.

use crate::error::PipelineError;
use gatehouse_core::{Identity, RequestId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Marker left by a routing component naming the endpoint that should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
}

impl Endpoint {
    /// Creates an endpoint marker with a display name, e.g. `"GET /users"`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use gatehouse_core::{AuthScheme, Identity, UserRecord};
/// use gatehouse_middleware::RequestContext;
///
/// let mut ctx = RequestContext::new();
/// assert!(ctx.identity().is_none());
///
/// let identity = Identity::from_user(&UserRecord::new("alice", "pw"), AuthScheme::Basic);
/// ctx.set_identity(identity);
/// assert_eq!(ctx.identity().and_then(|i| i.name()), Some("alice"));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The authenticated identity, if any component established one.
    identity: Option<Identity>,

    /// Endpoint chosen by routing, if any.
    endpoint: Option<Endpoint>,

    /// Whether the routed endpoint has run.
    endpoint_executed: bool,

    /// Set by the terminal when nothing handled the request.
    unhandled: bool,

    /// Fatal pipeline fault recorded by the terminal.
    fault: Option<PipelineError>,

    /// Cancelled by the transport when the client goes away or times out.
    cancellation: CancellationToken,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates a new context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            identity: None,
            endpoint: None,
            endpoint_executed: false,
            unhandled: false,
            fault: None,
            cancellation: CancellationToken::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Attaches the transport's cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the authenticated identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Sets the authenticated identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Returns the routed endpoint, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Records the endpoint routing selected for this request.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = Some(endpoint);
        self.endpoint_executed = false;
    }

    /// Records that the routed endpoint ran.
    pub fn mark_endpoint_executed(&mut self) {
        self.endpoint_executed = true;
    }

    /// Whether the routed endpoint ran.
    #[must_use]
    pub fn endpoint_executed(&self) -> bool {
        self.endpoint_executed
    }

    /// Whether the request fell through to the pipeline terminal.
    #[must_use]
    pub fn is_unhandled(&self) -> bool {
        self.unhandled
    }

    pub(crate) fn mark_unhandled(&mut self) {
        self.unhandled = true;
    }

    pub(crate) fn record_fault(&mut self, fault: PipelineError) {
        self.fault = Some(fault);
    }

    pub(crate) fn take_fault(&mut self) -> Option<PipelineError> {
        self.fault.take()
    }

    /// The cancellation signal for this request.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// ```
    /// use gatehouse_middleware::RequestContext;
    ///
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = RequestContext::new();
    /// ctx.set_extension(Tenant("acme"));
    /// assert_eq!(ctx.get_extension::<Tenant>().map(|t| t.0), Some("acme"));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
