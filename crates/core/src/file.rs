//! File records and the append-only file store

use std::cmp::Ordering;

/// Dense identifier of a file record, assigned at insertion and never reused
pub type FileId = usize;

/// Kind of file record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Text-only file
    Document,
    /// Group of files
    Directory,
}

/// Immutable payload referenced by tree nodes via a file id.
///
/// Writing to a document never mutates a record: a new record with a new id
/// is pushed and the owning tree node is re-pointed at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    name: String,
    id: FileId,
    kind: FileKind,
    content: String,
}

impl File {
    /// Create a document record with the given content
    pub fn document(name: impl Into<String>, id: FileId, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id,
            kind: FileKind::Document,
            content: content.into(),
        }
    }

    /// Create a directory record (directories carry no content)
    pub fn directory(name: impl Into<String>, id: FileId) -> Self {
        Self {
            name: name.into(),
            id,
            kind: FileKind::Directory,
            content: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Content of this record. Asking a directory for content is a
    /// programmer error.
    pub fn content(&self) -> &str {
        debug_assert!(
            self.kind == FileKind::Document,
            "can't get content of a directory"
        );
        &self.content
    }
}

/// Display order shared by listings and the merge walk:
/// documents precede directories, then lexicographic by name.
pub fn listing_order(a: &File, b: &File) -> Ordering {
    match (a.kind, b.kind) {
        (FileKind::Document, FileKind::Directory) => Ordering::Less,
        (FileKind::Directory, FileKind::Document) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

/// Append-only table of file records. Ids equal the table length at push
/// time, so lookups are plain indexing.
#[derive(Debug, Default)]
pub struct FileStore {
    files: Vec<File>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id that `push` will assign
    pub fn next_id(&self) -> FileId {
        self.files.len()
    }

    /// Insert a record. The record's id must equal `next_id()`.
    pub fn push(&mut self, file: File) -> FileId {
        debug_assert_eq!(file.id, self.files.len(), "file ids must be dense");
        let id = self.files.len();
        self.files.push(file);
        id
    }

    pub fn get(&self, id: FileId) -> &File {
        &self.files[id]
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
