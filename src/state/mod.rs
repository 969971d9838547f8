//! State management module
//!
//! This module handles all application state, including:
//! - Shared data structures (data.rs)
//! - The SQLite photo record store (store.rs)
//! - The background worker that owns the store connection (worker.rs)

pub mod data;
pub mod store;
pub mod worker;
