//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline component
//! implements. A component receives the request together with [`Next`], the
//! rest of the pipeline, and decides whether to forward to it.
//!
//! # Example
//!
//! ```
//! use gatehouse_middleware::{BoxFuture, Middleware, Next, Request, RequestContext, Response};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             tracing::debug!(request_id = %ctx.request_id(), "request");
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(status = %response.status(), "response");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::RequestContext;
use crate::terminal;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pipeline component.
///
/// # Invariants
///
/// - A component that forwards calls `next.run()` exactly once
/// - A component that does not forward short-circuits the rest of the
///   pipeline, including the terminal
/// - Components are shared between concurrent requests and keep no
///   request-scoped state on `self`
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this component, used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Process the request through this component.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The mutable request context
    /// * `request` - The incoming HTTP request
    /// * `next` - The rest of the pipeline
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The rest of the pipeline, as seen by one component.
///
/// Consumed by [`Next::run`], so it can be invoked at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More components to run
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// A caller-supplied final handler
    Handler(
        Box<dyn FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send + 'a>,
    ),
    /// The pipeline's unhandled-request terminal
    Terminal,
}

impl<'a> Next<'a> {
    /// Wraps `next` with `middleware`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a `Next` that ends in the given handler instead of the terminal.
    ///
    /// Useful for exercising a single component in isolation.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Creates a `Next` that ends in the unhandled-request terminal.
    pub fn terminal() -> Self {
        Self {
            inner: NextInner::Terminal,
        }
    }

    /// Invokes the next component, handler or terminal.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
            NextInner::Terminal => terminal::unhandled(ctx, &request),
        }
    }
}

/// A component built from a closure.
///
/// The closure receives the same arguments as [`Middleware::process`].
///
/// # Example
///
/// ```
/// use gatehouse_middleware::FnMiddleware;
///
/// let timing = FnMiddleware::new("timing", |ctx, req, next| {
///     Box::pin(async move {
///         let response = next.run(ctx, req).await;
///         tracing::debug!(elapsed = ?ctx.elapsed(), "request took");
///         response
///     })
/// });
/// # let _ = timing;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new closure-based component.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, Response>
            + Send
            + Sync
            + 'static,
    {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, Response>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        (self.func)(ctx, request, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;

    struct Visited(Vec<&'static str>);

    struct TestMiddleware {
        name: &'static str,
    }

    impl Middleware for TestMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut visited = ctx
                    .remove_extension::<Visited>()
                    .unwrap_or(Visited(Vec::new()));
                visited.0.push(self.name);
                ctx.set_extension(visited);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler(
    ) -> impl FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send {
        |_ctx, _req| Box::pin(async { Response::status_only(StatusCode::OK) })
    }

    #[test]
    fn test_middleware_name() {
        let mw = TestMiddleware { name: "test" };
        assert_eq!(mw.name(), "test");
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = RequestContext::new();
        let response = Next::handler(ok_handler()).run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_next_terminal_is_not_found() {
        let mut ctx = RequestContext::new();
        let response = Next::terminal().run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.is_unhandled());
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let mw1 = TestMiddleware { name: "first" };
        let mw2 = TestMiddleware { name: "second" };
        let mut ctx = RequestContext::new();

        let next = Next::new(&mw1, Next::new(&mw2, Next::handler(ok_handler())));
        let response = next.run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<Visited>().map(|v| v.0.clone()),
            Some(vec!["first", "second"])
        );
    }

    #[tokio::test]
    async fn test_fn_middleware_can_short_circuit() {
        let deny = FnMiddleware::new("deny", |_ctx, _req, _next| {
            Box::pin(async { Response::status_only(StatusCode::FORBIDDEN) })
        });
        let mut ctx = RequestContext::new();

        let response = Next::new(&deny, Next::terminal()).run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!ctx.is_unhandled());
    }
}
