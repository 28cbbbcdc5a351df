use super::Endpoint;
use crate::config::ConfigError;
use crate::error::{ConflagentError, ConflagentResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable lookup table of endpoints, built once at process start.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Arc<Endpoint>>,
}

impl EndpointRegistry {
    /// Build a registry, validating every entry and rejecting duplicate names.
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Result<Self, ConfigError> {
        let mut table = BTreeMap::new();
        for endpoint in endpoints {
            endpoint.validate()?;
            if table.contains_key(&endpoint.name) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.name));
            }
            table.insert(endpoint.name.clone(), Arc::new(endpoint));
        }
        Ok(Self { endpoints: table })
    }

    /// Look up an endpoint by routing name.
    pub fn resolve(&self, name: &str) -> ConflagentResult<Arc<Endpoint>> {
        self.endpoints.get(name).cloned().ok_or_else(|| {
            ConflagentError::not_found(format!("Configuration for endpoint '{}' not found", name))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values().map(|e| e.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
