//! HTTP surface of the IPD service
//!
//! Everything lives under `/api/v1` except the `/health` check. Handlers are
//! thin: they deserialize, call into [`Database`](crate::Database) and map
//! [`IpdError`](crate::IpdError) onto status codes.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::configure;
