//! # Gatehouse Middleware
//!
//! Composable request pipeline for the Gatehouse framework.
//!
//! A [`PipelineBuilder`] collects components in registration order and
//! assembles them into an immutable [`Pipeline`]. Each component decides
//! whether to forward to the rest of the pipeline; if all of them do, the
//! terminal answers the request as unhandled.
//!
//! ```text
//! Request → Auth → Router → Endpoint → … → terminal (404)
//!                                             ↓
//! Response ← Auth ← Router ← Endpoint ← … ←──┘
//! ```
//!
//! ## Key Features
//!
//! - **Ordered**: components run in the order they were added
//! - **Short-circuit**: any component can answer without forwarding
//! - **Child builders**: [`PipelineBuilder::new_child`] derives a builder with
//!   copy-on-write [`Properties`] and shared [`FeatureSet`]
//! - **Async**: all components are async and run on Tokio
//!
//! ## Example
//!
//! ```
//! use gatehouse_middleware::PipelineBuilder;
//!
//! let mut root = PipelineBuilder::new();
//! root.set_property("realm", "public");
//!
//! let mut admin = root.new_child();
//! admin.set_property("realm", "admin");
//!
//! assert_eq!(root.property::<&str>("realm"), Some(&"public"));
//! assert_eq!(admin.property::<&str>("realm"), Some(&"admin"));
//! ```

#![doc(html_root_url = "https://docs.rs/gatehouse-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod features;
pub mod middleware;
pub mod pipeline;
pub mod properties;
mod terminal;
pub mod types;

// Re-export main types at crate root
pub use context::{Endpoint, RequestContext};
pub use error::PipelineError;
pub use features::FeatureSet;
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use properties::{Properties, PropertyValue};
pub use types::{Request, Response, ResponseExt};
