//! Pipeline builder and the assembled pipeline.
//!
//! Components run in the order they were added. Each one receives the rest
//! of the pipeline as [`Next`] and may forward to it or answer on its own.
//! When every component forwards, the terminal runs: it answers 404 and
//! flags the context as unhandled, unless routing selected an endpoint that
//! nothing executed, which is reported as a [`PipelineError`].
//!
//! ```text
//! Request → C1 → C2 → … → Cn → terminal
//!                                 ↓
//! Response ← C1 ← C2 ← … ← Cn ←──┘
//! ```

use crate::context::RequestContext;
use crate::error::PipelineError;
use crate::features::FeatureSet;
use crate::middleware::{BoxFuture, FnMiddleware, Middleware, Next};
use crate::properties::Properties;
use crate::types::{Request, Response};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased component that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Accumulates components and produces a [`Pipeline`].
///
/// # Example
///
/// ```
/// use gatehouse_middleware::{PipelineBuilder, RequestContext, Response, ResponseExt};
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let mut builder = PipelineBuilder::new();
/// builder.add_fn("health", |ctx, req, next| {
///     Box::pin(async move {
///         if req.uri().path() == "/health" {
///             return Response::status_only(StatusCode::OK);
///         }
///         next.run(ctx, req).await
///     })
/// });
///
/// let pipeline = builder.build();
/// let mut ctx = RequestContext::new();
/// let request = http::Request::builder()
///     .uri("/health")
///     .body(http_body_util::Full::new(bytes::Bytes::new()))
///     .unwrap();
///
/// let response = pipeline.handle(&mut ctx, request).await.unwrap();
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
pub struct PipelineBuilder {
    features: Arc<FeatureSet>,
    properties: Properties,
    components: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates a builder with no host features.
    #[must_use]
    pub fn new() -> Self {
        Self::with_features(Arc::new(FeatureSet::new()))
    }

    /// Creates a builder over the host's capability set.
    #[must_use]
    pub fn with_features(features: Arc<FeatureSet>) -> Self {
        Self {
            features,
            properties: Properties::new(),
            components: Vec::new(),
        }
    }

    /// Appends a component.
    pub fn add<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.add_arc(Arc::new(middleware))
    }

    /// Appends an already shared component.
    pub fn add_arc(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        tracing::trace!(
            component = middleware.name(),
            position = self.components.len(),
            "pipeline component added"
        );
        self.components.push(middleware);
        self
    }

    /// Appends a closure component.
    pub fn add_fn<F>(&mut self, name: &'static str, func: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, Response>
            + Send
            + Sync
            + 'static,
    {
        self.add(FnMiddleware::new(name, func))
    }

    /// Derives a builder that shares this one's features, starts with a
    /// copy-on-write view of its properties, and has no components.
    #[must_use]
    pub fn new_child(&self) -> Self {
        Self {
            features: Arc::clone(&self.features),
            properties: self.properties.fork(),
            components: Vec::new(),
        }
    }

    /// The host's capability set.
    #[must_use]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// The builder's properties.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Mutable access to the builder's properties.
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Sets a property. Chainable.
    pub fn set_property<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.properties.set(key, value);
        self
    }

    /// Reads a property of type `T`.
    #[must_use]
    pub fn property<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.properties.get(key)
    }

    /// Hides a property in this builder. Returns whether it was visible.
    pub fn remove_property(&mut self, key: &str) -> bool {
        self.properties.remove(key)
    }

    /// Names of the registered components, in order.
    #[must_use]
    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Assembles the registered components into a [`Pipeline`].
    ///
    /// The builder stays usable; components added later do not affect
    /// pipelines already built.
    #[must_use]
    pub fn build(&self) -> Pipeline {
        tracing::debug!(
            components = ?self.component_names(),
            "pipeline built"
        );
        Pipeline {
            components: self.components.iter().cloned().collect(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("components", &self.component_names())
            .field("properties", &self.properties)
            .field("features", &self.features)
            .finish()
    }
}

/// An assembled, immutable pipeline.
///
/// Cheap to clone and safe to share between concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    components: Arc<[BoxedMiddleware]>,
}

impl Pipeline {
    /// Runs a request through every component and, if all forward, the
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EndpointNotExecuted`] when the terminal finds
    /// a routed endpoint that no component executed.
    pub async fn handle(
        &self,
        ctx: &mut RequestContext,
        request: Request,
    ) -> Result<Response, PipelineError> {
        let response = self.build_chain().run(ctx, request).await;
        match ctx.take_fault() {
            Some(fault) => Err(fault),
            None => Ok(response),
        }
    }

    fn build_chain(&self) -> Next<'_> {
        let mut next = Next::terminal();
        for middleware in self.components.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Names of the components, in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the pipeline has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Endpoint;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    struct Trail(Vec<&'static str>);

    struct Record(&'static str);

    impl Middleware for Record {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut trail = ctx.remove_extension::<Trail>().unwrap_or(Trail(Vec::new()));
                trail.0.push(self.0);
                ctx.set_extension(trail);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/things")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn trail(ctx: &RequestContext) -> Vec<&'static str> {
        ctx.get_extension::<Trail>()
            .map(|t| t.0.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_components_run_in_registration_order() {
        let mut builder = PipelineBuilder::new();
        builder.add(Record("a")).add(Record("b")).add(Record("c"));
        let pipeline = builder.build();

        let mut ctx = RequestContext::new();
        let response = pipeline.handle(&mut ctx, request()).await.unwrap();

        assert_eq!(trail(&ctx), vec!["a", "b", "c"]);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.is_unhandled());
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_unhandled() {
        let pipeline = PipelineBuilder::new().build();
        assert!(pipeline.is_empty());

        let mut ctx = RequestContext::new();
        let response = pipeline.handle(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.is_unhandled());
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest_and_terminal() {
        let mut builder = PipelineBuilder::new();
        builder
            .add(Record("first"))
            .add_fn("stop", |_ctx, _req, _next| {
                Box::pin(async { Response::status_only(StatusCode::ACCEPTED) })
            })
            .add(Record("never"));
        let pipeline = builder.build();

        let mut ctx = RequestContext::new();
        let response = pipeline.handle(&mut ctx, request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(trail(&ctx), vec!["first"]);
        assert!(!ctx.is_unhandled());
    }

    #[tokio::test]
    async fn test_unexecuted_endpoint_is_an_error() {
        let mut builder = PipelineBuilder::new();
        builder.add_fn("router", |ctx, req, next| {
            Box::pin(async move {
                ctx.set_endpoint(Endpoint::new("GET /things"));
                next.run(ctx, req).await
            })
        });
        let pipeline = builder.build();

        let mut ctx = RequestContext::new();
        let err = pipeline.handle(&mut ctx, request()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::EndpointNotExecuted { ref endpoint, .. } if endpoint == "GET /things"
        ));
    }

    #[test]
    fn test_build_snapshots_components() {
        let mut builder = PipelineBuilder::new();
        builder.add(Record("a"));
        let first = builder.build();
        builder.add(Record("b"));

        assert_eq!(first.stage_names(), vec!["a"]);
        assert_eq!(builder.build().stage_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_new_child_starts_empty_and_shares_features() {
        struct Marker;

        let mut features = FeatureSet::new();
        features.insert(Marker);
        let mut parent = PipelineBuilder::with_features(Arc::new(features));
        parent.add(Record("a")).set_property("realm", "api");

        let child = parent.new_child();
        assert!(child.component_names().is_empty());
        assert!(child.features().contains::<Marker>());
        assert_eq!(child.property::<&str>("realm"), Some(&"api"));
    }

    #[test]
    fn test_child_property_writes_are_isolated() {
        let mut parent = PipelineBuilder::new();
        parent.set_property("limit", 10_u32);

        let mut child = parent.new_child();
        child.set_property("limit", 20_u32);
        assert!(child.remove_property("limit"));
        parent.set_property("limit", 30_u32);

        assert_eq!(parent.property::<u32>("limit"), Some(&30));
        assert!(child.property::<u32>("limit").is_none());
    }
}
