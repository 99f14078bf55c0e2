// src/error.rs
//
// Top-level `RunError` plus per-phase error enums not already owned by
// their module (`CascadeError` here because `cascade.rs` has no
// sub-errors of its own to wrap it with). Carried from the teacher's
// flat `RunError` + `#[from]` conversion style, extended with one
// variant per orchestrator phase (§4.1).

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::health::HealthError;
use crate::markdown::MarkdownError;
use crate::output::WriteError;
use crate::postprocess::PostprocessError;
use crate::xref::CrossRefError;

#[derive(Error, Debug)]
pub(crate) enum RunError {
    #[error("failed to load configuration")]
    Config(#[from] ConfigError),
    #[error("content discovery failed")]
    Discovery(#[from] DiscoveryError),
    #[error("cascade resolution failed")]
    Cascade(#[from] CascadeError),
    #[error("cross-reference indexing failed")]
    CrossRef(#[from] CrossRefError),
    #[error("markdown rendering failed")]
    Markdown(#[from] MarkdownError),
    #[error("failed to render template")]
    Template(#[from] minijinja::Error),
    #[error("failed to process static files")]
    Static(#[from] StaticError),
    #[error("failed to write content")]
    Write(#[from] WriteError),
    #[error("incremental cache error")]
    Cache(#[from] CacheError),
    #[error("post-processing failed")]
    Postprocess(#[from] PostprocessError),
    #[error("health check failed")]
    Health(#[from] HealthError),
    #[error("{0}")]
    IoError(String),
}

#[derive(Error, Debug)]
pub(crate) enum StaticError {
    #[error("I/O error processing static file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raised while resolving `cascade:` blocks down the section tree
/// (§4.3).
#[derive(Error, Debug)]
pub(crate) enum CascadeError {
    #[error("cascade cycle detected at section {0:?}")]
    Cycle(PathBuf),
    #[error("cascade in section {section:?} attempts to set protected key {key:?}")]
    ProtectedKey { section: PathBuf, key: String },
}
