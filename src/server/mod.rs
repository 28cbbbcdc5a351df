//! HTTP server for Conflagent.
//!
//! Routes live under `/endpoint/{endpoint}/`. The page routes are wrapped in
//! [`EndpointAuth`](crate::auth::EndpointAuth); `health` and `openapi.json`
//! are public.

pub mod http_server;
pub mod page_routes;
pub mod system_routes;

pub use http_server::{configure_app, AppState, ConflagentHttpServer};
