//! Actix error handlers that keep framework-level failures inside the
//! response envelope.

pub mod http_errors;

pub use http_errors::{
    json_error_handler, method_not_allowed_handler, not_found_handler, query_error_handler,
};
