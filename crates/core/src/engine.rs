//! CELV engine: version registry, working directory and CRUD
//!
//! The engine owns the file store, the tree arena and one root per
//! version. Every successful mutation appends exactly one root slot (a
//! fresh clone, or a repeat of the previous root when the change was
//! absorbed by a change box) and bumps the version counters.
//!
//! The working directory is kept as a logical path of child file ids and
//! resolved against the current version's root on demand. Switching to a
//! version where part of the path never existed simply anchors the walk at
//! the deepest segment that does exist; switching back restores the full
//! path.

use crate::error::Error;
use crate::file::{File, FileId, FileKind, FileStore};
use crate::history::{Action, ActionKind};
use crate::tree::{NodeId, Tree, Update, Version};
use crate::Result;

pub struct Engine {
    pub(crate) store: FileStore,
    pub(crate) tree: Tree,
    /// Root node per version; slot `v` answers queries as of version `v`
    pub(crate) versions: Vec<NodeId>,
    pub(crate) current: Version,
    pub(crate) next: Version,
    /// Child file ids from the root down to the working directory
    pub(crate) cwd_path: Vec<FileId>,
    pub(crate) history: Vec<Action>,
}

impl Engine {
    pub fn new() -> Self {
        let mut store = FileStore::new();
        store.push(File::directory("/", 0));
        let mut tree = Tree::new();
        let root = tree.alloc(0, None, 0);
        Self {
            store,
            tree,
            versions: vec![root],
            current: 0,
            next: 1,
            cwd_path: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn version(&self) -> Version {
        self.current
    }

    pub fn history(&self) -> &[Action] {
        &self.history
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Resolve the working directory against the current version: descend
    /// from the root along the stored path, stopping at the first segment
    /// that does not exist in this version. Returns the node and how many
    /// segments were realized.
    pub(crate) fn resolve_cwd(&self) -> (NodeId, usize) {
        let mut walker = self.versions[self.current];
        let mut depth = 0;
        for id in &self.cwd_path {
            match self.tree.children_at(walker, self.current).get(id) {
                Some(&child) => {
                    walker = child;
                    depth += 1;
                }
                None => break,
            }
        }
        (walker, depth)
    }

    pub(crate) fn working_dir(&self) -> NodeId {
        self.resolve_cwd().0
    }

    /// Resolve the working directory for a mutation, re-pointing the
    /// parent links along the realized path. Nodes shared across versions
    /// keep the parent of whichever version cloned them last, so the chain
    /// the coming cascade will walk must be seated to this version first.
    pub(crate) fn seat_cwd(&mut self) -> NodeId {
        let mut walker = self.versions[self.current];
        for i in 0..self.cwd_path.len() {
            let id = self.cwd_path[i];
            match self.tree.children_at(walker, self.current).get(&id).copied() {
                Some(child) => {
                    self.tree.set_parent(child, Some(walker));
                    walker = child;
                }
                None => break,
            }
        }
        walker
    }

    /// Whether the working directory is the versioned subtree's root
    pub fn at_root(&self) -> bool {
        self.resolve_cwd().1 == 0
    }

    /// Name of the working directory's file record
    pub fn working_dir_name(&self) -> String {
        let wd = self.working_dir();
        self.store
            .get(self.tree.file_id_at(wd, self.current))
            .name()
            .to_string()
    }

    /// File records in the working directory at the current version
    pub fn list(&self) -> Vec<File> {
        let wd = self.working_dir();
        self.tree
            .children_at(wd, self.current)
            .values()
            .map(|&child| {
                self.store
                    .get(self.tree.file_id_at(child, self.current))
                    .clone()
            })
            .collect()
    }

    /// Child of the working directory with the given name, as
    /// (key in the child map, node)
    pub(crate) fn find_child(&self, name: &str) -> Option<(FileId, NodeId)> {
        let wd = self.working_dir();
        self.tree
            .children_at(wd, self.current)
            .iter()
            .map(|(&key, &node)| (key, node))
            .find(|&(_, node)| {
                self.store
                    .get(self.tree.file_id_at(node, self.current))
                    .name()
                    == name
            })
    }

    /// Enter the named subdirectory
    pub fn change_directory(&mut self, name: &str) -> Result<()> {
        let (key, node) = self.find_child(name).ok_or(Error::NotFound)?;
        let record = self.store.get(self.tree.file_id_at(node, self.current));
        if !record.is_directory() {
            return Err(Error::NotADirectory);
        }
        let depth = self.resolve_cwd().1;
        self.cwd_path.truncate(depth);
        self.cwd_path.push(key);
        Ok(())
    }

    /// Ascend to the parent directory
    pub fn change_directory_up(&mut self) -> Result<()> {
        let depth = self.resolve_cwd().1;
        if depth == 0 {
            return Err(Error::RootAscent);
        }
        self.cwd_path.truncate(depth - 1);
        Ok(())
    }

    /// Shared plumbing for every successful mutation: append the version's
    /// root (repeating the previous root when the change was absorbed),
    /// record the action and advance the counters.
    pub(crate) fn commit(&mut self, update: Update, kind: ActionKind, args: Vec<String>) {
        match update.new_root {
            Some(root) => self.versions.push(root),
            None => self.versions.push(self.versions[self.current]),
        }
        self.history.push(Action {
            kind,
            args,
            origin_version: self.current,
            new_version: self.next,
        });
        self.current = self.next;
        self.next += 1;
    }

    /// Create an empty document or a directory in the working directory
    pub fn create_file(&mut self, name: &str, kind: FileKind) -> Result<()> {
        if self.find_child(name).is_some() {
            return Err(Error::NameConflict);
        }
        let id = self.store.next_id();
        let record = match kind {
            FileKind::Document => File::document(name, id, ""),
            FileKind::Directory => File::directory(name, id),
        };
        self.store.push(record);

        let wd = self.seat_cwd();
        let child = self.tree.alloc(id, Some(wd), self.next);
        let update = self.tree.add_file(wd, child, self.current, self.next);

        let action = match kind {
            FileKind::Document => ActionKind::CreateDoc,
            FileKind::Directory => ActionKind::CreateDir,
        };
        self.commit(update, action, vec![name.to_string()]);
        Ok(())
    }

    /// Remove the named entry. The file record itself survives so older
    /// versions keep resolving.
    pub fn remove_file(&mut self, name: &str) -> Result<()> {
        let (key, _) = self.find_child(name).ok_or(Error::NotFound)?;
        let wd = self.seat_cwd();
        let update = self
            .tree
            .remove_file(wd, key, self.current, self.next)
            .ok_or(Error::NotFound)?;
        self.commit(update, ActionKind::Remove, vec![name.to_string()]);
        Ok(())
    }

    /// Replace the named document's content. Writes never touch the old
    /// record: a new one is pushed and the child node re-pointed at it.
    pub fn write_file(&mut self, name: &str, content: &str) -> Result<()> {
        let (_, node) = self.find_child(name).ok_or(Error::NotFound)?;
        let record = self.store.get(self.tree.file_id_at(node, self.current));
        if record.is_directory() {
            return Err(Error::CannotWriteDirectory);
        }

        let new_id = self.store.next_id();
        self.store.push(File::document(name, new_id, content));
        let wd = self.seat_cwd();
        self.tree.set_parent(node, Some(wd));
        let update = self.tree.update_file_id(node, new_id, self.current, self.next);
        self.commit(
            update,
            ActionKind::Write,
            vec![name.to_string(), content.to_string()],
        );
        Ok(())
    }

    /// Content of the named document
    pub fn read_file(&self, name: &str) -> Result<String> {
        let (_, node) = self.find_child(name).ok_or(Error::NotFound)?;
        let record = self.store.get(self.tree.file_id_at(node, self.current));
        if record.is_directory() {
            return Err(Error::CannotReadDirectory);
        }
        Ok(record.content().to_string())
    }

    /// Switch the presented view to an existing version. Pure view change:
    /// no node is mutated, and the stored working-directory path survives
    /// round trips through versions where it does not fully exist.
    pub fn set_version(&mut self, v: Version) -> Result<()> {
        if v >= self.next {
            return Err(Error::InvalidVersion);
        }
        self.current = v;
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
