//! Hierarchical work-item tree library.
//!
//! Work items live as flat rows at four fixed depths (task, subtask, action
//! item, sub-action item). Every row carries denormalized ancestor pointers,
//! so a whole subtree is found with one indexed column scan and the nested
//! tree is rebuilt from the pointers alone.
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod server;
pub mod store;
pub mod types;
