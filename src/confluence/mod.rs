//! Transport collaborator for the external Confluence service.
//!
//! [`ContentTransport`] is the seam between the tree resolver / mutation engine
//! and the upstream REST API. [`ConfluenceClient`] is the reqwest-backed
//! implementation; tests use the in-memory transport from
//! [`crate::testing_utils`].

pub mod client;
pub mod error;

pub use client::{ConfluenceClient, ConfluenceClients};
pub use error::{TransportError, TransportResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::{ConflagentError, ConflagentResult};

/// Lightweight reference to a page, as returned by child listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    pub title: String,
}

/// Page metadata fetched fresh from the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    /// Direct parent; `None` only for pages without ancestors.
    pub parent_id: Option<String>,
    /// Current version number, used as the optimistic-concurrency token.
    pub version: u64,
}

impl Page {
    pub fn to_ref(&self) -> PageRef {
        PageRef {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }
}

/// Calls the core needs from the external content service.
///
/// Every call hits the upstream service; nothing is cached. Mutating calls
/// take the *next* version number and must fail with
/// [`TransportError::Conflict`] when the upstream version moved on.
#[async_trait]
pub trait ContentTransport: Send + Sync {
    async fn get_page(&self, id: &str) -> TransportResult<Page>;

    async fn get_children(&self, id: &str) -> TransportResult<Vec<PageRef>>;

    async fn get_body(&self, id: &str) -> TransportResult<String>;

    /// Exact-title search across a space.
    async fn search_by_title(&self, space_key: &str, title: &str) -> TransportResult<Vec<Page>>;

    async fn create_page(
        &self,
        space_key: &str,
        parent_id: &str,
        title: &str,
        body: &str,
    ) -> TransportResult<Page>;

    /// Replace the full body. Returns the new version.
    async fn replace_body(&self, page: &Page, body: &str, next_version: u64)
        -> TransportResult<u64>;

    /// Change only the title; body and parent are kept. Returns the new version.
    async fn rename_page(
        &self,
        page: &Page,
        new_title: &str,
        body: &str,
        next_version: u64,
    ) -> TransportResult<u64>;

    /// Change only the parent linkage. Returns the new version.
    async fn reparent_page(
        &self,
        page: &Page,
        new_parent_id: &str,
        next_version: u64,
    ) -> TransportResult<u64>;
}

/// Hands out the transport bound to a given endpoint's credentials.
pub trait TransportProvider: Send + Sync {
    fn transport_for(&self, endpoint: &Endpoint) -> ConflagentResult<Arc<dyn ContentTransport>>;
}

impl TransportProvider for ConfluenceClients {
    fn transport_for(&self, endpoint: &Endpoint) -> ConflagentResult<Arc<dyn ContentTransport>> {
        self.get(&endpoint.name)
            .map(|client| client as Arc<dyn ContentTransport>)
            .ok_or_else(|| {
                ConflagentError::internal(format!(
                    "No transport client configured for endpoint '{}'",
                    endpoint.name
                ))
            })
    }
}
