// src/error.rs
//! Typed errors for the callers that need to branch on failure kind.
//! Adapter fetch/parse and config loading stay on `anyhow` with context.

use thiserror::Error;

use crate::lifecycle::Lifecycle;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("listing already stored: title={title:?} link={link}")]
    Duplicate { title: String, link: String },

    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("repository io: {0}")]
    Io(#[from] std::io::Error),

    #[error("repository encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Why a raw candidate was dropped by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is empty after normalization")]
    EmptyTitle,
    #[error("link is empty or not resolvable to http(s)")]
    EmptyLink,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("moderator identity is required")]
    MissingModerator,

    #[error("listing {0} not found")]
    NotFound(String),

    #[error("cannot {action} a listing in state {from:?}")]
    InvalidTransition { from: Lifecycle, action: &'static str },

    #[error("listing {0} has inconsistent moderation flags")]
    Inconsistent(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures that abort a whole orchestrator run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no sources configured for {scope}")]
    NoSources { scope: String },

    #[error("repository unreachable: {0}")]
    Repository(#[source] StoreError),

    #[error("failed to record run log: {0}")]
    RunLog(#[source] StoreError),
}
