//! Pipeline error types.

use thiserror::Error;

/// Faults raised by the pipeline itself rather than by a component.
///
/// These indicate a misconfigured pipeline and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A routing component selected an endpoint, but nothing downstream ran it.
    #[error(
        "request for '{path}' was routed to endpoint '{endpoint}' but no component executed it; \
         register the endpoint-executing middleware after routing"
    )]
    EndpointNotExecuted {
        /// Display name of the routed endpoint.
        endpoint: String,
        /// Request path, for the diagnostic.
        path: String,
    },
}
