//! Per-tenant endpoint configuration.
//!
//! An [`Endpoint`] is the immutable tuple a named tenant is configured with.
//! Endpoints are validated completely when they are loaded and collected into
//! an [`EndpointRegistry`] that request handling only ever reads.

pub mod properties;
pub mod registry;

pub use registry::EndpointRegistry;

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// A named, isolated tenant configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Routing key, unique across the registry
    #[serde(default)]
    pub name: String,
    /// Base URL of the Confluence instance, e.g. `https://example.atlassian.net/wiki`
    pub base_url: String,
    /// Account used for outbound basic authentication
    pub email: String,
    /// API token for outbound basic authentication
    pub api_token: String,
    /// Space the sandbox lives in
    pub space_key: String,
    /// Page under which every operation is confined
    pub root_page_id: String,
    /// Bearer secret inbound callers must present
    #[serde(alias = "gpt_shared_secret")]
    pub shared_secret: String,
}

// Credentials stay out of logs.
impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("space_key", &self.space_key)
            .field("root_page_id", &self.root_page_id)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Check that every field is present and well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                name: self.name.clone(),
                reason: "endpoint name must not be empty".to_string(),
            });
        }
        if self.name.contains('/') {
            return Err(ConfigError::InvalidEndpoint {
                name: self.name.clone(),
                reason: "endpoint name must not contain '/'".to_string(),
            });
        }

        let required = [
            ("base_url", &self.base_url),
            ("email", &self.email),
            ("api_token", &self.api_token),
            ("space_key", &self.space_key),
            ("root_page_id", &self.root_page_id),
            ("gpt_shared_secret", &self.shared_secret),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingKey {
                    endpoint: self.name.clone(),
                    key: key.to_string(),
                });
            }
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint {
                name: self.name.clone(),
                reason: format!("base_url '{}' must be an http(s) URL", self.base_url),
            });
        }

        Ok(())
    }
}
