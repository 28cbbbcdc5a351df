//! Handlers for the authenticated page routes.

use super::http_server::AppState;
use crate::api::models::{
    require, CreatePageRequest, MovePageRequest, RenamePageRequest, TreeQuery, UpdatePageRequest,
};
use crate::api::ok;
use crate::auth::AuthorizedEndpoint;
use crate::error::{ConflagentError, ConflagentResult};
use crate::mutation::MutationEngine;
use crate::tree::TreeResolver;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

/// `{title}` path segment, possibly a `/`-separated title path.
#[derive(Debug, Deserialize)]
pub struct TitlePath {
    pub title: String,
}

fn resolver(auth: AuthorizedEndpoint) -> TreeResolver {
    TreeResolver::new(auth.endpoint, auth.transport)
}

fn engine(auth: AuthorizedEndpoint) -> MutationEngine {
    MutationEngine::new(auth.endpoint, auth.transport)
}

/// List the root's direct children
pub async fn list_pages(auth: AuthorizedEndpoint) -> ConflagentResult<HttpResponse> {
    let pages = resolver(auth).list_children().await?;
    Ok(ok(format!("Found {} pages", pages.len()), pages))
}

pub async fn get_tree(
    auth: AuthorizedEndpoint,
    state: web::Data<AppState>,
    query: web::Query<TreeQuery>,
) -> ConflagentResult<HttpResponse> {
    let depth = query.depth(state.tree.default_depth, state.tree.max_depth)?;
    let tree = resolver(auth).tree(depth, query.start_title()).await?;
    Ok(ok(format!("Page tree for '{}'", tree.title), tree))
}

pub async fn read_page(
    auth: AuthorizedEndpoint,
    path: web::Path<TitlePath>,
) -> ConflagentResult<HttpResponse> {
    let content = resolver(auth).read(&path.title).await?;
    Ok(ok("Page retrieved", content))
}

pub async fn list_children(
    auth: AuthorizedEndpoint,
    path: web::Path<TitlePath>,
) -> ConflagentResult<HttpResponse> {
    let children = resolver(auth).children(&path.title).await?;
    Ok(ok(format!("Found {} child pages", children.len()), children))
}

pub async fn get_parent(
    auth: AuthorizedEndpoint,
    path: web::Path<TitlePath>,
) -> ConflagentResult<HttpResponse> {
    let breadcrumb = resolver(auth).parent_and_breadcrumb(&path.title).await?;
    Ok(ok("Parent retrieved", breadcrumb))
}

pub async fn create_page(
    auth: AuthorizedEndpoint,
    payload: web::Json<CreatePageRequest>,
) -> ConflagentResult<HttpResponse> {
    let title = require(&payload.title, "title")?;
    let created = engine(auth)
        .create(
            title,
            payload.parent_title.as_deref(),
            payload.body.as_deref(),
        )
        .await?;
    Ok(ok(format!("Page '{}' created", created.title), created))
}

/// Replace the full body of a page
pub async fn update_page(
    auth: AuthorizedEndpoint,
    path: web::Path<TitlePath>,
    payload: web::Json<UpdatePageRequest>,
) -> ConflagentResult<HttpResponse> {
    let body = payload
        .body
        .as_deref()
        .ok_or_else(|| ConflagentError::invalid_input("Missing required field 'body'"))?;
    let updated = engine(auth).update(&path.title, body).await?;
    Ok(ok(format!("Page '{}' updated", updated.title), updated))
}

pub async fn rename_page(
    auth: AuthorizedEndpoint,
    payload: web::Json<RenamePageRequest>,
) -> ConflagentResult<HttpResponse> {
    let old_title = require(&payload.old_title, "old_title")?;
    let new_title = require(&payload.new_title, "new_title")?;
    let renamed = engine(auth).rename(old_title, new_title).await?;
    Ok(ok(
        format!("Page '{}' renamed to '{}'", renamed.old_title, renamed.new_title),
        renamed,
    ))
}

pub async fn move_page(
    auth: AuthorizedEndpoint,
    path: web::Path<TitlePath>,
    payload: web::Json<MovePageRequest>,
) -> ConflagentResult<HttpResponse> {
    let new_parent_title = require(&payload.new_parent_title, "newParentTitle")?;
    let moved = engine(auth).move_page(&path.title, new_parent_title).await?;
    Ok(ok(
        format!("Page '{}' moved under '{}'", moved.title, moved.new_parent_title),
        moved,
    ))
}
