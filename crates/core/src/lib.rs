//! CELV Core - In-memory versioned virtual file system
//!
//! This crate provides the versioning engine and its collaborators:
//! - Append-only file record store
//! - Persistent directory tree with change-box node sharing
//! - Version registry, working-directory traversal and action history
//! - Edit-distance diff with annotated output
//! - Two-version tree merge
//! - Non-versioned filesystem facade hosting versioned subtrees

pub mod diff;
pub mod engine;
pub mod error;
pub mod facade;
pub mod file;
pub mod history;
pub mod import;
pub mod merge;
pub mod tree;

// Re-export main types for convenience
pub use engine::Engine;
pub use error::Error;
pub use facade::FileSystem;
pub use file::{listing_order, File, FileId, FileKind, FileStore};
pub use history::{Action, ActionKind};
pub use tree::{NodeId, Tree, Version};

/// Common result type used throughout celv-core
pub type Result<T> = std::result::Result<T, Error>;
