use super::{CreatedPage, MovedPage, MutationPhase, RenamedPage, UpdatedPage};
use crate::confluence::{ContentTransport, Page};
use crate::content::to_storage_format;
use crate::endpoint::Endpoint;
use crate::error::{ConflagentError, ConflagentResult};
use crate::tree::{split_title_path, TreeResolver};
use log::{debug, info, warn};
use std::sync::Arc;

/// Tracks and logs the phase a mutation is in.
struct PhaseTracker<'a> {
    operation: &'static str,
    endpoint: &'a str,
    phase: MutationPhase,
}

impl<'a> PhaseTracker<'a> {
    fn start(operation: &'static str, endpoint: &'a str) -> Self {
        debug!("{} on '{}': {}", operation, endpoint, MutationPhase::Resolving);
        Self {
            operation,
            endpoint,
            phase: MutationPhase::Resolving,
        }
    }

    fn advance(&mut self, phase: MutationPhase) {
        debug!("{} on '{}': {} -> {}", self.operation, self.endpoint, self.phase, phase);
        self.phase = phase;
    }

    fn finish<T>(mut self, result: ConflagentResult<T>) -> ConflagentResult<T> {
        match &result {
            Ok(_) => {
                self.advance(MutationPhase::Succeeded);
                info!("{} on '{}' succeeded", self.operation, self.endpoint);
            }
            Err(err) => {
                let submitted = self.phase == MutationPhase::Submitting;
                self.advance(MutationPhase::Failed(err.code().to_string()));
                if submitted {
                    warn!("{} on '{}' rejected upstream: {}", self.operation, self.endpoint, err);
                }
            }
        }
        result
    }
}

/// Create, update, rename and move pages by title.
pub struct MutationEngine {
    resolver: TreeResolver,
}

impl MutationEngine {
    pub fn new(endpoint: Arc<Endpoint>, transport: Arc<dyn ContentTransport>) -> Self {
        Self {
            resolver: TreeResolver::new(endpoint, transport),
        }
    }

    pub fn resolver(&self) -> &TreeResolver {
        &self.resolver
    }

    fn transport(&self) -> &dyn ContentTransport {
        self.resolver.transport()
    }

    fn endpoint(&self) -> &Endpoint {
        self.resolver.endpoint()
    }

    /// Create a page.
    ///
    /// The parent defaults to the root. Without an explicit parent, a title
    /// such as `Guides/Setup` creates `Setup` under the existing page `Guides`.
    pub async fn create(
        &self,
        title: &str,
        parent_title: Option<&str>,
        body: Option<&str>,
    ) -> ConflagentResult<CreatedPage> {
        let mut tracker = PhaseTracker::start("create", &self.endpoint().name);
        let result = self.create_inner(&mut tracker, title, parent_title, body).await;
        tracker.finish(result)
    }

    async fn create_inner(
        &self,
        tracker: &mut PhaseTracker<'_>,
        title: &str,
        parent_title: Option<&str>,
        body: Option<&str>,
    ) -> ConflagentResult<CreatedPage> {
        let parent_title = parent_title.map(str::trim).filter(|p| !p.is_empty());
        let segments = split_title_path(title)?;
        let (parent, leaf) = match parent_title {
            Some(_) if segments.len() > 1 || title.contains('/') => {
                return Err(ConflagentError::invalid_input(
                    "Title must not contain '/' when parentTitle is given",
                ));
            }
            Some(parent_ref) => (self.resolver.resolve(parent_ref).await?, segments[0]),
            None => match segments.split_last() {
                Some((leaf, [])) => (self.resolver.root().await?, *leaf),
                Some((leaf, parents)) => (self.resolver.resolve_path(parents).await?, *leaf),
                None => return Err(ConflagentError::invalid_input("Title must not be empty")),
            },
        };

        tracker.advance(MutationPhase::Validating);
        if self.resolver.find_child(&parent.id, leaf).await?.is_some() {
            return Err(ConflagentError::invalid_operation(format!(
                "A page titled '{}' already exists under '{}'",
                leaf, parent.title
            )));
        }
        let storage = to_storage_format(body.unwrap_or_default());

        tracker.advance(MutationPhase::Submitting);
        let page = self
            .transport()
            .create_page(&self.endpoint().space_key, &parent.id, leaf, &storage)
            .await?;
        Ok(CreatedPage {
            id: page.id,
            title: page.title,
            version: page.version,
        })
    }

    /// Replace the full body of a page.
    pub async fn update(&self, title: &str, new_body: &str) -> ConflagentResult<UpdatedPage> {
        let mut tracker = PhaseTracker::start("update", &self.endpoint().name);
        let result = self.update_inner(&mut tracker, title, new_body).await;
        tracker.finish(result)
    }

    async fn update_inner(
        &self,
        tracker: &mut PhaseTracker<'_>,
        title: &str,
        new_body: &str,
    ) -> ConflagentResult<UpdatedPage> {
        let page = self.resolver.resolve(title).await?;

        tracker.advance(MutationPhase::Validating);
        let current = self.transport().get_page(&page.id).await?;
        let storage = to_storage_format(new_body);

        tracker.advance(MutationPhase::Submitting);
        let version = self
            .transport()
            .replace_body(&current, &storage, current.version + 1)
            .await?;
        Ok(UpdatedPage {
            title: current.title,
            version,
        })
    }

    /// Change a page's title, keeping its parent and body.
    pub async fn rename(&self, old_title: &str, new_title: &str) -> ConflagentResult<RenamedPage> {
        let mut tracker = PhaseTracker::start("rename", &self.endpoint().name);
        let result = self.rename_inner(&mut tracker, old_title, new_title).await;
        tracker.finish(result)
    }

    async fn rename_inner(
        &self,
        tracker: &mut PhaseTracker<'_>,
        old_title: &str,
        new_title: &str,
    ) -> ConflagentResult<RenamedPage> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(ConflagentError::invalid_input("New title must not be empty"));
        }
        if new_title.contains('/') {
            return Err(ConflagentError::invalid_input("New title must not contain '/'"));
        }
        let page = self.resolver.resolve(old_title).await?;

        tracker.advance(MutationPhase::Validating);
        let parent_id = self.parent_in_sandbox(&page, "renamed")?;
        let clash = self
            .transport()
            .get_children(parent_id)
            .await?
            .into_iter()
            .any(|sibling| sibling.title == new_title && sibling.id != page.id);
        if clash {
            return Err(ConflagentError::invalid_operation(format!(
                "A sibling page titled '{}' already exists",
                new_title
            )));
        }
        let current = self.transport().get_page(&page.id).await?;
        let body = self.transport().get_body(&page.id).await?;

        tracker.advance(MutationPhase::Submitting);
        let version = self
            .transport()
            .rename_page(&current, new_title, &body, current.version + 1)
            .await?;
        Ok(RenamedPage {
            old_title: current.title,
            new_title: new_title.to_string(),
            version,
        })
    }

    /// Re-parent a page under `new_parent_title`.
    pub async fn move_page(&self, title: &str, new_parent_title: &str) -> ConflagentResult<MovedPage> {
        let mut tracker = PhaseTracker::start("move", &self.endpoint().name);
        let result = self.move_inner(&mut tracker, title, new_parent_title).await;
        tracker.finish(result)
    }

    async fn move_inner(
        &self,
        tracker: &mut PhaseTracker<'_>,
        title: &str,
        new_parent_title: &str,
    ) -> ConflagentResult<MovedPage> {
        let page = self.resolver.resolve(title).await?;
        let new_parent = self.resolver.resolve(new_parent_title).await?;

        tracker.advance(MutationPhase::Validating);
        let old_parent_id = self.parent_in_sandbox(&page, "moved")?;
        if self.resolver.is_within(&new_parent, &page.id).await? {
            return Err(ConflagentError::invalid_operation(format!(
                "Cannot move '{}' into its own subtree",
                page.title
            )));
        }
        let clash = self
            .resolver
            .find_child(&new_parent.id, &page.title)
            .await?
            .map_or(false, |existing| existing.id != page.id);
        if clash {
            return Err(ConflagentError::invalid_operation(format!(
                "A page titled '{}' already exists under '{}'",
                page.title, new_parent.title
            )));
        }
        let old_parent_title = self.transport().get_page(old_parent_id).await?.title;
        let current = self.transport().get_page(&page.id).await?;

        tracker.advance(MutationPhase::Submitting);
        self.transport()
            .reparent_page(&current, &new_parent.id, current.version + 1)
            .await?;
        Ok(MovedPage {
            title: current.title,
            old_parent_title: Some(old_parent_title),
            new_parent_title: new_parent.title,
        })
    }

    /// Parent id of a page that is about to change; the root itself has none in the sandbox.
    fn parent_in_sandbox<'p>(&self, page: &'p Page, action: &str) -> ConflagentResult<&'p str> {
        if page.id == self.endpoint().root_page_id {
            return Err(ConflagentError::invalid_operation(format!(
                "The root page cannot be {}",
                action
            )));
        }
        page.parent_id.as_deref().ok_or_else(|| {
            ConflagentError::not_found(format!("Page '{}' not found", page.title))
        })
    }
}
