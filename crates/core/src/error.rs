//! Error kinds surfaced by the engine and facade

use thiserror::Error;

/// Every failure an operation can report. Messages are surfaced verbatim
/// by the shell, so their wording is part of the external interface.
#[derive(Debug, Error)]
pub enum Error {
    /// A sibling of any kind already carries the requested name
    #[error("File already exists")]
    NameConflict,

    /// No entry with the requested name in the working directory
    #[error("No such file or directory")]
    NotFound,

    /// `ir` into something that is not a directory
    #[error("Specified file is not a directory")]
    NotADirectory,

    /// `leer` applied to a directory
    #[error("File is not a document, can't read directories")]
    CannotReadDirectory,

    /// `escribir` applied to a directory
    #[error("File is not a document, can't write on directories")]
    CannotWriteDirectory,

    /// `ir` with no argument at the filesystem root
    #[error("Can't go up from filesystem root")]
    RootAscent,

    /// Requested version was never created
    #[error("Invalid version")]
    InvalidVersion,

    /// Merge of a version with itself
    #[error("Versions to merge must differ.")]
    MergeDegenerate,

    /// Version control already active at or below the current directory
    #[error("Can't init celv in this directory. Already initialized in subdirectory.")]
    CelvAlreadyInitialized,

    /// A `celv_*` query ran outside any versioned subtree
    #[error("Version control is not active in this directory")]
    CelvInactive,

    /// Import source is missing or not a directory
    #[error("Path to a directory '{0}' does not exist")]
    ImportPath(String),
}
