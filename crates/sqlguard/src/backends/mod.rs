//! Executor Backends
//!
//! The [`SqlExecutor`] trait abstracts the database transport; guarded
//! queries reach the database only through it.

pub mod core;
pub mod mysql;

// Re-export core traits and types
pub use self::core::*;
pub use self::mysql::{MySqlExecutor, MySqlRows};
