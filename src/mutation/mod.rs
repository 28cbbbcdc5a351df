//! Title-addressed writes against an endpoint's sandbox.
//!
//! Every write goes through the same phases: the target is resolved, tree
//! invariants are checked locally, and only then is anything submitted
//! upstream. A failed submission is reported as-is; nothing is rolled back.

pub mod engine;

pub use engine::MutationEngine;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationPhase {
    Resolving,
    Validating,
    Submitting,
    Succeeded,
    Failed(String),
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolving => write!(f, "resolving"),
            Self::Validating => write!(f, "validating"),
            Self::Submitting => write!(f, "submitting"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    pub title: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedPage {
    pub title: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedPage {
    pub old_title: String,
    pub new_title: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedPage {
    pub title: String,
    pub old_parent_title: Option<String>,
    pub new_parent_title: String,
}
