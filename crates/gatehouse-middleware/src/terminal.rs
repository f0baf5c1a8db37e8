//! The innermost handler of every built pipeline.

use crate::context::RequestContext;
use crate::error::PipelineError;
use crate::types::{Request, Response, ResponseExt};
use http::StatusCode;

/// Runs when every component forwarded control.
///
/// An endpoint that routing selected but nobody executed is a pipeline
/// misconfiguration: the fault is recorded on the context (and surfaced by
/// [`Pipeline::handle`](crate::Pipeline::handle)) and the request is answered
/// with 500. Anything else is an ordinary unmatched request: 404, and the
/// context is flagged unhandled for outer layers.
pub(crate) fn unhandled(ctx: &mut RequestContext, request: &Request) -> Response {
    if let Some(endpoint) = ctx.endpoint() {
        if !ctx.endpoint_executed() {
            let fault = PipelineError::EndpointNotExecuted {
                endpoint: endpoint.name().to_string(),
                path: request.uri().path().to_string(),
            };
            tracing::error!(
                request_id = %ctx.request_id(),
                endpoint = endpoint.name(),
                error = %fault,
                "pipeline terminal reached with an unexecuted endpoint"
            );
            ctx.record_fault(fault);
            return Response::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PIPELINE_MISCONFIGURED",
                "the routed endpoint was never executed",
            );
        }
    }

    ctx.mark_unhandled();
    tracing::debug!(
        request_id = %ctx.request_id(),
        http.method = %request.method(),
        http.path = request.uri().path(),
        "request not handled by any component"
    );
    Response::json_error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "no handler matched the request",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Endpoint;
    use bytes::Bytes;
    use http_body_util::Full;

    fn request(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_unmatched_request_is_not_found() {
        let mut ctx = RequestContext::new();
        let response = unhandled(&mut ctx, &request("/missing"));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.is_unhandled());
        assert!(ctx.take_fault().is_none());
    }

    #[test]
    fn test_unexecuted_endpoint_is_a_fault() {
        let mut ctx = RequestContext::new();
        ctx.set_endpoint(Endpoint::new("GET /users"));

        let response = unhandled(&mut ctx, &request("/users"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!ctx.is_unhandled());
        assert_eq!(
            ctx.take_fault(),
            Some(PipelineError::EndpointNotExecuted {
                endpoint: "GET /users".to_string(),
                path: "/users".to_string(),
            })
        );
    }

    #[test]
    fn test_executed_endpoint_falls_through_to_not_found() {
        let mut ctx = RequestContext::new();
        ctx.set_endpoint(Endpoint::new("GET /users"));
        ctx.mark_endpoint_executed();

        let response = unhandled(&mut ctx, &request("/users"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.take_fault().is_none());
    }
}
