//! Wire-level types of the REST surface: request models, the response
//! envelope and the OpenAPI document.

pub mod models;
pub mod openapi;
pub mod response;

pub use response::{ok, ResponseEnvelope};
