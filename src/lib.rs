//! Local photo gallery: captured-photo records in SQLite, plus the
//! camera, import and sharing collaborators that feed them.

pub mod config;
pub mod error;
pub mod media;
pub mod state;
