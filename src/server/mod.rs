//! HTTP surface: state container, pipeline, routes and server builder

pub mod builder;
pub mod handlers;
pub mod pipeline;
pub mod response;
pub mod router;
pub mod state;

pub use builder::{ServerBuilder, init_tracing};
pub use pipeline::{Endpoint, EndpointBuilder, RequestParts};
pub use response::{ApiResponse, Reply};
pub use router::build_router;
pub use state::AppState;
