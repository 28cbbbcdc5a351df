use super::{split_title_path, Breadcrumb, ChildEntry, PageContent, TreeNode, MAX_ANCESTRY_DEPTH};
use crate::confluence::{ContentTransport, Page, PageRef, TransportError};
use crate::endpoint::Endpoint;
use crate::error::{ConflagentError, ConflagentResult};
use futures_util::future::BoxFuture;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of walking parent links upwards.
enum Ancestry {
    /// Root reached; ancestors strictly between the page and the root, nearest first
    UnderRoot(Vec<Page>),
    /// The walk met the page it was told to stop at
    Met,
    /// The chain ended, looped or ran too deep before reaching the root
    Outside,
}

/// Resolves titles against one endpoint's sandbox.
pub struct TreeResolver {
    endpoint: Arc<Endpoint>,
    transport: Arc<dyn ContentTransport>,
}

impl TreeResolver {
    pub fn new(endpoint: Arc<Endpoint>, transport: Arc<dyn ContentTransport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &dyn ContentTransport {
        self.transport.as_ref()
    }

    fn root_id(&self) -> &str {
        &self.endpoint.root_page_id
    }

    pub async fn root(&self) -> ConflagentResult<Page> {
        Ok(self.transport.get_page(self.root_id()).await?)
    }

    /// Direct children of the root.
    pub async fn list_children(&self) -> ConflagentResult<Vec<PageRef>> {
        Ok(self.transport.get_children(self.root_id()).await?)
    }

    /// First child of `parent_id` titled exactly `title`.
    pub async fn find_child(&self, parent_id: &str, title: &str) -> ConflagentResult<Option<PageRef>> {
        let children = self.transport.get_children(parent_id).await?;
        Ok(children.into_iter().find(|c| c.title == title))
    }

    /// Resolve a title or a `/`-separated title path to a page under the root.
    pub async fn resolve(&self, reference: &str) -> ConflagentResult<Page> {
        let segments = split_title_path(reference)?;
        if segments.len() == 1 {
            self.resolve_by_title(segments[0]).await
        } else {
            self.resolve_path(&segments).await
        }
    }

    /// Resolve a bare title.
    ///
    /// Direct children of the root win; otherwise the space is searched and the
    /// first hit lying under the root (or being the root) is taken.
    pub async fn resolve_by_title(&self, title: &str) -> ConflagentResult<Page> {
        if let Some(child) = self.find_child(self.root_id(), title).await? {
            return Ok(self.transport.get_page(&child.id).await?);
        }

        let hits = self
            .transport
            .search_by_title(&self.endpoint.space_key, title)
            .await?;
        for hit in hits {
            if hit.id == self.root_id() {
                return Ok(hit);
            }
            if let Ancestry::UnderRoot(_) = self.walk_up(&hit, None).await? {
                return Ok(hit);
            }
            debug!(
                "Ignoring '{}' ({}): not under root {} of endpoint '{}'",
                hit.title,
                hit.id,
                self.root_id(),
                self.endpoint.name
            );
        }
        Err(page_not_found(title))
    }

    /// Walk a title path from the root, first match per level.
    pub async fn resolve_path(&self, segments: &[&str]) -> ConflagentResult<Page> {
        let mut current = self.root_id().to_string();
        for segment in segments {
            match self.find_child(&current, segment).await? {
                Some(child) => current = child.id,
                None => return Err(page_not_found(&segments.join("/"))),
            }
        }
        Ok(self.transport.get_page(&current).await?)
    }

    /// Resolve a page and fetch its body.
    pub async fn read(&self, reference: &str) -> ConflagentResult<PageContent> {
        let page = self.resolve(reference).await?;
        let body = self.transport.get_body(&page.id).await?;
        Ok(PageContent {
            id: page.id,
            title: page.title,
            body,
        })
    }

    /// Children of the referenced page, each with its path from the root.
    pub async fn children(&self, reference: &str) -> ConflagentResult<Vec<ChildEntry>> {
        let page = self.resolve(reference).await?;
        let path = self.path_of(&page).await?;
        let children = self.transport.get_children(&page.id).await?;
        Ok(children
            .into_iter()
            .map(|child| {
                let mut child_path = path.clone();
                child_path.push(child.title.clone());
                ChildEntry {
                    id: child.id,
                    title: child.title,
                    path: child_path,
                }
            })
            .collect())
    }

    /// Parent and breadcrumb of the referenced page.
    pub async fn parent_and_breadcrumb(&self, reference: &str) -> ConflagentResult<Breadcrumb> {
        let page = self.resolve(reference).await?;
        if page.id == self.root_id() {
            return Ok(Breadcrumb {
                parent: None,
                path: Vec::new(),
            });
        }

        let ancestors = self.ancestors_of(&page).await?;
        let parent = match ancestors.first() {
            Some(parent) => parent.to_ref(),
            None => self.root().await?.to_ref(),
        };
        Ok(Breadcrumb {
            parent: Some(parent),
            path: breadcrumb(&ancestors, &page),
        })
    }

    /// Depth-limited tree rooted at the root or at `start_title`.
    ///
    /// Depth 0 lists the start page with its direct children unexpanded; each
    /// extra level expands one more generation.
    pub async fn tree(&self, max_depth: u32, start_title: Option<&str>) -> ConflagentResult<TreeNode> {
        let start = match start_title {
            Some(title) => self.resolve(title).await?,
            None => self.root().await?,
        };
        let path = self.path_of(&start).await?;
        let mut visited = HashSet::new();
        visited.insert(start.id.clone());
        self.build_node(start.to_ref(), path, max_depth, &mut visited)
            .await
    }

    fn build_node<'s>(
        &'s self,
        page: PageRef,
        path: Vec<String>,
        remaining: u32,
        visited: &'s mut HashSet<String>,
    ) -> BoxFuture<'s, ConflagentResult<TreeNode>> {
        Box::pin(async move {
            let listed = self.transport.get_children(&page.id).await?;
            let mut children = Vec::with_capacity(listed.len());
            for child in listed {
                if !visited.insert(child.id.clone()) {
                    warn!(
                        "Page {} listed again under {}; skipping to avoid a cycle",
                        child.id, page.id
                    );
                    continue;
                }
                let mut child_path = path.clone();
                child_path.push(child.title.clone());
                let node = if remaining == 0 {
                    TreeNode {
                        id: child.id,
                        title: child.title,
                        path: child_path,
                        children: Vec::new(),
                    }
                } else {
                    self.build_node(child, child_path, remaining - 1, &mut *visited)
                        .await?
                };
                children.push(node);
            }
            Ok(TreeNode {
                id: page.id,
                title: page.title,
                path,
                children,
            })
        })
    }

    /// Path from the root (exclusive) to `page` (inclusive).
    pub async fn path_of(&self, page: &Page) -> ConflagentResult<Vec<String>> {
        if page.id == self.root_id() {
            return Ok(Vec::new());
        }
        let ancestors = self.ancestors_of(page).await?;
        Ok(breadcrumb(&ancestors, page))
    }

    /// Ancestors strictly between `page` and the root, nearest first.
    ///
    /// A page whose chain does not reach the root is not found.
    pub async fn ancestors_of(&self, page: &Page) -> ConflagentResult<Vec<Page>> {
        match self.walk_up(page, None).await? {
            Ancestry::UnderRoot(ancestors) => Ok(ancestors),
            _ => Err(page_not_found(&page.title)),
        }
    }

    /// Whether `candidate` is `ancestor_id` or lies in its subtree.
    pub async fn is_within(&self, candidate: &Page, ancestor_id: &str) -> ConflagentResult<bool> {
        if candidate.id == ancestor_id {
            return Ok(true);
        }
        Ok(matches!(
            self.walk_up(candidate, Some(ancestor_id)).await?,
            Ancestry::Met
        ))
    }

    async fn walk_up(&self, page: &Page, stop_at: Option<&str>) -> ConflagentResult<Ancestry> {
        if page.id == self.root_id() {
            return Ok(Ancestry::UnderRoot(Vec::new()));
        }

        let mut ancestors = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(page.id.clone());
        let mut next = page.parent_id.clone();

        while let Some(parent_id) = next {
            if stop_at == Some(parent_id.as_str()) {
                return Ok(Ancestry::Met);
            }
            if parent_id == self.root_id() {
                return Ok(Ancestry::UnderRoot(ancestors));
            }
            if ancestors.len() >= MAX_ANCESTRY_DEPTH || !visited.insert(parent_id.clone()) {
                warn!(
                    "Abandoning ancestry walk for page {} at {}: chain too deep or cyclic",
                    page.id, parent_id
                );
                return Ok(Ancestry::Outside);
            }
            let parent = match self.transport.get_page(&parent_id).await {
                Ok(parent) => parent,
                Err(TransportError::NotFound(_)) => return Ok(Ancestry::Outside),
                Err(e) => return Err(e.into()),
            };
            next = parent.parent_id.clone();
            ancestors.push(parent);
        }
        Ok(Ancestry::Outside)
    }
}

fn breadcrumb(ancestors: &[Page], page: &Page) -> Vec<String> {
    ancestors
        .iter()
        .rev()
        .map(|p| p.title.clone())
        .chain(std::iter::once(page.title.clone()))
        .collect()
}

fn page_not_found(reference: &str) -> ConflagentError {
    ConflagentError::not_found(format!("Page '{}' not found", reference))
}
