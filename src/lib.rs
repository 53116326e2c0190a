//! Task Tree Library
//!
//! A hierarchical task store with cascading soft delete, restore and purge,
//! bulk sync, and task advice from an external text-generation provider.

pub mod advice;
pub mod cli;
pub mod clock;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod store;
pub mod tree;
pub mod types;
