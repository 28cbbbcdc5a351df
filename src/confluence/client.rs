//! reqwest-backed client for the Confluence REST content API

use super::{ContentTransport, Page, PageRef, TransportError, TransportResult};
use crate::config::TransportConfig;
use crate::endpoint::{Endpoint, EndpointRegistry};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Page size used when listing children.
const CHILD_PAGE_LIMIT: usize = 200;
/// Upper bound on followed `next` links for a single child listing.
const MAX_CHILD_PAGES: usize = 50;

/// Client for one endpoint's Confluence credentials.
pub struct ConfluenceClient {
    client: Client,
    base_url: String,
    auth_header: String,
    max_read_retries: u32,
    retry_backoff: Duration,
}

/// Content object as returned by `/rest/api/content`
#[derive(Debug, Deserialize)]
struct ContentResponse {
    id: String,
    title: String,
    #[serde(default)]
    version: Option<VersionInfo>,
    #[serde(default)]
    ancestors: Vec<PageRef>,
    #[serde(default)]
    body: Option<BodyInfo>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct BodyInfo {
    storage: StorageValue,
}

#[derive(Debug, Deserialize)]
struct StorageValue {
    value: String,
}

/// Paged result list
#[derive(Debug, Deserialize)]
struct ContentList<T> {
    results: Vec<T>,
    #[serde(default, rename = "_links")]
    links: Option<ListLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct ListLinks {
    next: Option<String>,
}

impl ContentResponse {
    fn into_page(self) -> TransportResult<Page> {
        let version = self.version.map(|v| v.number).ok_or_else(|| {
            TransportError::invalid_response(format!("Page {} has no version information", self.id))
        })?;
        Ok(Page {
            parent_id: self.ancestors.last().map(|a| a.id.clone()),
            id: self.id,
            title: self.title,
            version,
        })
    }
}

impl ConfluenceClient {
    /// Create a client bound to the given endpoint's base URL and credentials.
    pub fn new(endpoint: &Endpoint, config: &TransportConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TransportError::failure(None, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            auth_header: Self::build_auth_header(&endpoint.email, &endpoint.api_token),
            max_read_retries: config.max_read_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Basic authorization header value for the outbound credential.
    pub fn build_auth_header(email: &str, api_token: &str) -> String {
        let token = STANDARD.encode(format!("{}:{}", email, api_token));
        format!("Basic {}", token)
    }

    /// URL of the content collection, optionally followed by a sub path.
    pub fn content_url(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("{}/rest/api/content", self.base_url)
        } else {
            format!("{}/rest/api/content/{}", self.base_url, suffix.trim_start_matches('/'))
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
    }

    /// Send a single request and decode a JSON success body.
    async fn send_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
        let response = self.authorized(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::from_status(status.as_u16(), error_text));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Idempotent GET with transparent retries on transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> TransportResult<T> {
        let attempts = self.max_read_retries + 1;
        let mut attempt = 1;
        loop {
            debug!("GET {} (attempt {} of {})", url, attempt, attempts);
            match self.send_once(self.client.get(url).query(query)).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self
                        .retry_backoff
                        .saturating_mul(2_u32.saturating_pow(attempt - 1));
                    warn!("GET {} failed: {}. Retrying in {:?}", url, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn storage_body(body: &str) -> Value {
        json!({"storage": {"value": body, "representation": "storage"}})
    }

    /// Mutating PUT, never retried.
    async fn put_content(&self, page_id: &str, payload: Value, next_version: u64) -> TransportResult<u64> {
        let url = self.content_url(page_id);
        info!("PUT {} (version {})", url, next_version);
        let response: ContentResponse = self.send_once(self.client.put(&url).json(&payload)).await?;
        Ok(response.version.map(|v| v.number).unwrap_or(next_version))
    }
}

/// `start` offset carried by a `_links.next` URL.
fn next_start(next: &str) -> Option<usize> {
    let (_, query) = next.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "start")
        .and_then(|(_, value)| value.parse().ok())
}

#[async_trait]
impl ContentTransport for ConfluenceClient {
    async fn get_page(&self, id: &str) -> TransportResult<Page> {
        let response: ContentResponse = self
            .get_json(&self.content_url(id), &[("expand", "ancestors,version".to_string())])
            .await?;
        response.into_page()
    }

    async fn get_children(&self, id: &str) -> TransportResult<Vec<PageRef>> {
        let url = self.content_url(&format!("{}/child/page", id));
        let mut children = Vec::new();
        let mut start = 0;

        for _ in 0..MAX_CHILD_PAGES {
            let list: ContentList<PageRef> = self
                .get_json(
                    &url,
                    &[
                        ("limit", CHILD_PAGE_LIMIT.to_string()),
                        ("start", start.to_string()),
                    ],
                )
                .await?;

            let received = list.results.len();
            children.extend(list.results);

            // The server may cap the page size below `limit`; only `next` ends the listing.
            let next = match list.links.and_then(|l| l.next) {
                Some(next) if received > 0 => next,
                _ => return Ok(children),
            };
            start = next_start(&next).unwrap_or(start + received);
        }

        warn!(
            "Child listing for {} truncated after {} pages",
            id, MAX_CHILD_PAGES
        );
        Ok(children)
    }

    async fn get_body(&self, id: &str) -> TransportResult<String> {
        let response: ContentResponse = self
            .get_json(&self.content_url(id), &[("expand", "body.storage".to_string())])
            .await?;
        response
            .body
            .map(|b| b.storage.value)
            .ok_or_else(|| TransportError::invalid_response(format!("Page {} has no storage body", id)))
    }

    async fn search_by_title(&self, space_key: &str, title: &str) -> TransportResult<Vec<Page>> {
        let list: ContentList<ContentResponse> = self
            .get_json(
                &self.content_url(""),
                &[
                    ("spaceKey", space_key.to_string()),
                    ("title", title.to_string()),
                    ("expand", "ancestors,version".to_string()),
                ],
            )
            .await?;
        list.results.into_iter().map(ContentResponse::into_page).collect()
    }

    async fn create_page(
        &self,
        space_key: &str,
        parent_id: &str,
        title: &str,
        body: &str,
    ) -> TransportResult<Page> {
        let payload = json!({
            "type": "page",
            "title": title,
            "ancestors": [{"id": parent_id}],
            "space": {"key": space_key},
            "body": Self::storage_body(body),
        });

        let url = self.content_url("");
        info!("POST {} (title '{}')", url, title);
        let response: ContentResponse = self.send_once(self.client.post(&url).json(&payload)).await?;

        Ok(Page {
            version: response.version.map(|v| v.number).unwrap_or(1),
            parent_id: Some(parent_id.to_string()),
            id: response.id,
            title: response.title,
        })
    }

    async fn replace_body(&self, page: &Page, body: &str, next_version: u64) -> TransportResult<u64> {
        let payload = json!({
            "id": page.id,
            "type": "page",
            "title": page.title,
            "version": {"number": next_version},
            "body": Self::storage_body(body),
        });
        self.put_content(&page.id, payload, next_version).await
    }

    async fn rename_page(
        &self,
        page: &Page,
        new_title: &str,
        body: &str,
        next_version: u64,
    ) -> TransportResult<u64> {
        let payload = json!({
            "id": page.id,
            "type": "page",
            "title": new_title,
            "version": {"number": next_version},
            "body": Self::storage_body(body),
        });
        self.put_content(&page.id, payload, next_version).await
    }

    async fn reparent_page(
        &self,
        page: &Page,
        new_parent_id: &str,
        next_version: u64,
    ) -> TransportResult<u64> {
        let payload = json!({
            "id": page.id,
            "type": "page",
            "title": page.title,
            "version": {"number": next_version},
            "ancestors": [{"id": new_parent_id}],
        });
        self.put_content(&page.id, payload, next_version).await
    }
}

/// One client per configured endpoint, built once at startup.
pub struct ConfluenceClients {
    clients: HashMap<String, Arc<ConfluenceClient>>,
}

impl ConfluenceClients {
    pub fn from_registry(registry: &EndpointRegistry, config: &TransportConfig) -> TransportResult<Self> {
        let mut clients = HashMap::new();
        for endpoint in registry.iter() {
            clients.insert(endpoint.name.clone(), Arc::new(ConfluenceClient::new(endpoint, config)?));
        }
        Ok(Self { clients })
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConfluenceClient>> {
        self.clients.get(name).cloned()
    }
}
