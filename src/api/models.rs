//! Request bodies and query strings accepted by the page routes.
//!
//! Required fields are `Option`s so that a missing field is reported as
//! `INVALID_INPUT` naming the field rather than as a deserializer error.

use crate::error::{ConflagentError, ConflagentResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    pub title: Option<String>,
    #[serde(alias = "parent_title")]
    pub parent_title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePageRequest {
    #[serde(alias = "content")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenamePageRequest {
    #[serde(alias = "oldTitle")]
    pub old_title: Option<String>,
    #[serde(alias = "newTitle")]
    pub new_title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePageRequest {
    #[serde(alias = "new_parent_title")]
    pub new_parent_title: Option<String>,
}

/// Query string of `GET pages/tree`. Depth is parsed by hand so that bad
/// values are reported as `INVALID_INPUT`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    pub depth: Option<String>,
    #[serde(alias = "start_title")]
    pub start_title: Option<String>,
}

impl TreeQuery {
    /// Depth to use, bounded by `max_depth`.
    pub fn depth(&self, default_depth: u32, max_depth: u32) -> ConflagentResult<u32> {
        let raw = match self.depth.as_deref().map(str::trim) {
            None | Some("") => return Ok(default_depth),
            Some(raw) => raw,
        };
        let depth: i64 = raw.parse().map_err(|_| {
            ConflagentError::invalid_input(format!("depth must be an integer, got '{}'", raw))
        })?;
        if depth < 0 || depth > i64::from(max_depth) {
            return Err(ConflagentError::invalid_input(format!(
                "depth must be between 0 and {}",
                max_depth
            )));
        }
        Ok(depth as u32)
    }

    pub fn start_title(&self) -> Option<&str> {
        self.start_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Return a required string field, rejecting absent or blank values.
pub fn require<'a>(value: &'a Option<String>, field: &str) -> ConflagentResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConflagentError::invalid_input(format!(
            "Missing required field '{}'",
            field
        ))),
    }
}
