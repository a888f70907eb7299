//! Bookshelf application library
//!
//! Application modules plus the startup and shutdown sequence that wires them
//! to the store and HTTP server.

pub mod app;
pub mod modules;

/// Re-export commonly used types
pub use modules::*;
