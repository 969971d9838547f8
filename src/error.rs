//! Error types for the photo store and its collaborators
//!
//! Every failure is surfaced to the caller as a value. The UI decides
//! whether to log it, show it, or retry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the photo record store and its worker
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record table could not be created
    #[error("could not create the photo table: {0}")]
    Schema(#[source] rusqlite::Error),

    /// Any other database failure, including rows of unexpected shape
    #[error("photo storage unavailable: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("image path must not be empty")]
    EmptyImagePath,

    /// The image file could not be removed, so the record was kept
    #[error("could not remove image file {}: {source}", .path.display())]
    FileRemoval {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not prepare data directory {}: {source}", .path.display())]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not determine a data directory for the photo store")]
    NoDataDir,

    #[error("could not start the photo store worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("photo store is closed")]
    Closed,
}

/// Failures of the camera, import and sharing collaborators
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("could not copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a supported image: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("folder scan failed: {0}")]
    Scan(String),

    #[error("photo #{0} was deleted right after capture")]
    Vanished(i64),

    /// The capture succeeded but could not be recorded
    #[error(transparent)]
    Store(#[from] StoreError),
}
