//! Testing utilities shared by unit and integration tests
//!
//! [`InMemoryTransport`] stands in for the Confluence REST API. It keeps pages,
//! child lists and version numbers in memory, enforces the same version-token
//! rule as the real service and can inject concurrent writers, corrupted
//! parent links and upstream outages.

use crate::confluence::{ContentTransport, Page, PageRef, TransportError, TransportProvider, TransportResult};
use crate::endpoint::{Endpoint, EndpointRegistry};
use crate::error::{ConflagentError, ConflagentResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredPage {
    id: String,
    title: String,
    parent_id: Option<String>,
    version: u64,
    body: String,
    space_key: String,
}

impl StoredPage {
    fn to_page(&self) -> Page {
        Page {
            id: self.id.clone(),
            title: self.title.clone(),
            parent_id: self.parent_id.clone(),
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    pages: HashMap<String, StoredPage>,
    /// Child ids per parent, in upstream order
    children: HashMap<String, Vec<String>>,
    /// Page ids in creation order, used for search ordering
    order: Vec<String>,
    next_id: u64,
    /// Bodies written by a simulated second writer just before our next write
    concurrent_writes: HashMap<String, String>,
    failure: Option<TransportError>,
    writes: usize,
}

impl StoreState {
    fn check_available(&self) -> TransportResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn stored(&self, id: &str) -> TransportResult<&StoredPage> {
        self.pages
            .get(id)
            .ok_or_else(|| TransportError::NotFound(format!("No content found with id: {}", id)))
    }

    /// Apply a pending concurrent write, then check the caller's version token.
    fn begin_write(&mut self, id: &str, next_version: u64) -> TransportResult<&mut StoredPage> {
        let pending = self.concurrent_writes.remove(id);
        let page = self
            .pages
            .get_mut(id)
            .ok_or_else(|| TransportError::NotFound(format!("No content found with id: {}", id)))?;
        if let Some(body) = pending {
            page.body = body;
            page.version += 1;
        }
        if page.version + 1 != next_version {
            return Err(TransportError::Conflict(format!(
                "Version must be incremented on update. Current version is: {}",
                page.version
            )));
        }
        self.writes += 1;
        Ok(page)
    }

    fn insert(&mut self, page: StoredPage) {
        if let Some(parent) = &page.parent_id {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(page.id.clone());
        }
        self.order.push(page.id.clone());
        self.pages.insert(page.id.clone(), page);
    }
}

/// In-memory [`ContentTransport`] for tests.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    space_key: String,
    state: Mutex<StoreState>,
}

impl InMemoryTransport {
    /// Create a store holding a single root page.
    pub fn with_root(space_key: &str, root_id: &str, root_title: &str) -> Self {
        let transport = Self {
            space_key: space_key.to_string(),
            state: Mutex::new(StoreState {
                next_id: 1000,
                ..StoreState::default()
            }),
        };
        transport.insert_page(root_id, root_title, None, "");
        transport
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a page with an explicit id. The page is appended to its parent's children.
    pub fn insert_page(&self, id: &str, title: &str, parent_id: Option<&str>, body: &str) -> Page {
        let stored = StoredPage {
            id: id.to_string(),
            title: title.to_string(),
            parent_id: parent_id.map(str::to_string),
            version: 1,
            body: body.to_string(),
            space_key: self.space_key.clone(),
        };
        let page = stored.to_page();
        self.lock().insert(stored);
        page
    }

    /// Insert a page with a generated id and return that id.
    pub fn add_page(&self, title: &str, parent_id: &str, body: &str) -> String {
        let id = {
            let mut state = self.lock();
            state.next_id += 1;
            state.next_id.to_string()
        };
        self.insert_page(&id, title, Some(parent_id), body);
        id
    }

    /// List `child_id` under `parent_id` without touching the child's own parent link.
    pub fn inject_child_link(&self, parent_id: &str, child_id: &str) {
        self.lock()
            .children
            .entry(parent_id.to_string())
            .or_default()
            .push(child_id.to_string());
    }

    /// Overwrite a page's parent link without touching any child list.
    pub fn corrupt_parent(&self, id: &str, parent_id: &str) {
        if let Some(page) = self.lock().pages.get_mut(id) {
            page.parent_id = Some(parent_id.to_string());
        }
    }

    /// Simulate another client writing `body` right before our next write to `id`.
    pub fn schedule_concurrent_write(&self, id: &str, body: &str) {
        self.lock()
            .concurrent_writes
            .insert(id.to_string(), body.to_string());
    }

    /// Make every call fail with `error`, or restore normal operation with `None`.
    pub fn set_failure(&self, error: Option<TransportError>) {
        self.lock().failure = error;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        let error = unavailable.then(|| TransportError::failure(Some(503), "Service Unavailable"));
        self.set_failure(error);
    }

    pub fn page(&self, id: &str) -> Option<Page> {
        self.lock().pages.get(id).map(StoredPage::to_page)
    }

    pub fn body(&self, id: &str) -> Option<String> {
        self.lock().pages.get(id).map(|p| p.body.clone())
    }

    /// First page with the given title, in creation order.
    pub fn find_by_title(&self, title: &str) -> Option<Page> {
        let state = self.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.pages.get(id))
            .find(|p| p.title == title)
            .map(StoredPage::to_page)
    }

    pub fn child_titles(&self, id: &str) -> Vec<String> {
        let state = self.lock();
        state
            .children
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|c| state.pages.get(c))
                    .map(|p| p.title.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }
}

#[async_trait]
impl ContentTransport for InMemoryTransport {
    async fn get_page(&self, id: &str) -> TransportResult<Page> {
        let state = self.lock();
        state.check_available()?;
        state.stored(id).map(StoredPage::to_page)
    }

    async fn get_children(&self, id: &str) -> TransportResult<Vec<PageRef>> {
        let state = self.lock();
        state.check_available()?;
        state.stored(id)?;
        Ok(state
            .children
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|c| state.pages.get(c))
                    .map(|p| PageRef {
                        id: p.id.clone(),
                        title: p.title.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_body(&self, id: &str) -> TransportResult<String> {
        let state = self.lock();
        state.check_available()?;
        state.stored(id).map(|p| p.body.clone())
    }

    async fn search_by_title(&self, space_key: &str, title: &str) -> TransportResult<Vec<Page>> {
        let state = self.lock();
        state.check_available()?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.pages.get(id))
            .filter(|p| p.space_key == space_key && p.title == title)
            .map(StoredPage::to_page)
            .collect())
    }

    async fn create_page(
        &self,
        space_key: &str,
        parent_id: &str,
        title: &str,
        body: &str,
    ) -> TransportResult<Page> {
        let mut state = self.lock();
        state.check_available()?;
        state.stored(parent_id)?;
        state.next_id += 1;
        let stored = StoredPage {
            id: state.next_id.to_string(),
            title: title.to_string(),
            parent_id: Some(parent_id.to_string()),
            version: 1,
            body: body.to_string(),
            space_key: space_key.to_string(),
        };
        let page = stored.to_page();
        state.insert(stored);
        state.writes += 1;
        Ok(page)
    }

    async fn replace_body(&self, page: &Page, body: &str, next_version: u64) -> TransportResult<u64> {
        let mut state = self.lock();
        state.check_available()?;
        let stored = state.begin_write(&page.id, next_version)?;
        stored.body = body.to_string();
        stored.version = next_version;
        Ok(next_version)
    }

    async fn rename_page(
        &self,
        page: &Page,
        new_title: &str,
        body: &str,
        next_version: u64,
    ) -> TransportResult<u64> {
        let mut state = self.lock();
        state.check_available()?;
        let stored = state.begin_write(&page.id, next_version)?;
        stored.title = new_title.to_string();
        stored.body = body.to_string();
        stored.version = next_version;
        Ok(next_version)
    }

    async fn reparent_page(
        &self,
        page: &Page,
        new_parent_id: &str,
        next_version: u64,
    ) -> TransportResult<u64> {
        let mut state = self.lock();
        state.check_available()?;
        state.stored(new_parent_id)?;
        let stored = state.begin_write(&page.id, next_version)?;
        let old_parent = stored.parent_id.replace(new_parent_id.to_string());
        stored.version = next_version;

        if let Some(old) = old_parent {
            if let Some(siblings) = state.children.get_mut(&old) {
                siblings.retain(|c| c != &page.id);
            }
        }
        state
            .children
            .entry(new_parent_id.to_string())
            .or_default()
            .push(page.id.clone());
        Ok(next_version)
    }
}

/// Transport provider that hands out pre-built transports by endpoint name.
#[derive(Default, Clone)]
pub struct StaticTransportProvider {
    transports: HashMap<String, Arc<dyn ContentTransport>>,
}

impl StaticTransportProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, endpoint_name: &str, transport: Arc<dyn ContentTransport>) -> Self {
        self.transports.insert(endpoint_name.to_string(), transport);
        self
    }
}

impl TransportProvider for StaticTransportProvider {
    fn transport_for(&self, endpoint: &Endpoint) -> ConflagentResult<Arc<dyn ContentTransport>> {
        self.transports.get(&endpoint.name).cloned().ok_or_else(|| {
            ConflagentError::internal(format!("No transport for endpoint '{}'", endpoint.name))
        })
    }
}

/// Builders for endpoint fixtures.
pub struct TestEndpointFactory;

impl TestEndpointFactory {
    pub const SPACE_KEY: &'static str = "TEAM";
    pub const ROOT_ID: &'static str = "1";
    pub const ROOT_TITLE: &'static str = "Sandbox";

    pub fn endpoint(name: &str, secret: &str) -> Endpoint {
        Endpoint {
            name: name.to_string(),
            base_url: "https://wiki.example.com".to_string(),
            email: "bot@example.com".to_string(),
            api_token: "api-token".to_string(),
            space_key: Self::SPACE_KEY.to_string(),
            root_page_id: Self::ROOT_ID.to_string(),
            shared_secret: secret.to_string(),
        }
    }

    /// Transport holding only the sandbox root page.
    pub fn transport() -> Arc<InMemoryTransport> {
        Arc::new(InMemoryTransport::with_root(
            Self::SPACE_KEY,
            Self::ROOT_ID,
            Self::ROOT_TITLE,
        ))
    }

    /// Registry with a single endpoint.
    pub fn registry(name: &str, secret: &str) -> ConflagentResult<EndpointRegistry> {
        EndpointRegistry::new(vec![Self::endpoint(name, secret)])
            .map_err(|e| ConflagentError::internal(e.to_string()))
    }
}
