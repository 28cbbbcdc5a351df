//! # Conflagent
//!
//! A sandboxed, multi-tenant REST surface over subtrees of a Confluence space.
//! Callers address pages by title or title path instead of by id; every
//! operation is confined to the root page configured for the named endpoint.
//!
//! ## Components
//!
//! * `endpoint` - immutable per-tenant configuration and the registry holding it
//! * `auth` - bearer-token access gate and its actix middleware
//! * `confluence` - the transport seam and its reqwest-backed client
//! * `tree` - title and path resolution, breadcrumbs and tree listings
//! * `mutation` - create, update, rename and move with invariant checks
//! * `api` - request models, the response envelope and the OpenAPI document
//! * `metrics` - Prometheus request metrics and their middleware
//! * `server` - the actix-web route table and server bootstrap

pub mod api;
pub mod auth;
pub mod config;
pub mod confluence;
pub mod content;
pub mod endpoint;
pub mod error;
pub mod error_handling;
pub mod logging;
pub mod metrics;
pub mod mutation;
pub mod server;
pub mod testing_utils;
pub mod tree;

pub use api::ResponseEnvelope;
pub use config::{load_server_config, ServerConfig};
pub use confluence::{ConfluenceClient, ContentTransport, Page, PageRef, TransportError};
pub use endpoint::{Endpoint, EndpointRegistry};
pub use error::{ConflagentError, ConflagentResult, ErrorCode};
pub use mutation::MutationEngine;
pub use server::{AppState, ConflagentHttpServer};
pub use tree::TreeResolver;
