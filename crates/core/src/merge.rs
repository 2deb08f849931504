//! Structural merge of two versions
//!
//! Walks two version trees in parallel and synthesizes a new version that
//! is their structural union. Documents present on both sides with
//! different contents are reconciled through the diff engine; everything
//! else is copied. Every emission goes through the engine's ordinary
//! create/write path, so the merge is itself a run of recorded version
//! bumps followed by a single trailing `Merge` entry.

use crate::diff;
use crate::engine::Engine;
use crate::error::Error;
use crate::file::{listing_order, File, FileKind};
use crate::history::{Action, ActionKind};
use crate::tree::{NodeId, Version};
use crate::Result;
use std::collections::VecDeque;

/// One side of a pending directory pair: a node fixed to the version it
/// was discovered in
type Side = (NodeId, Version);

/// Queue item: the two sides (either may be missing) and the name path of
/// the merged directory they land in
type PendingPair = (Option<Side>, Option<Side>, Vec<String>);

impl Engine {
    /// Merge two existing versions into a new one and return it.
    /// The view is left at the merged version's root.
    pub fn merge(&mut self, src: Version, dst: Version) -> Result<Version> {
        if src == dst {
            return Err(Error::MergeDegenerate);
        }
        if src >= self.next || dst >= self.next {
            return Err(Error::InvalidVersion);
        }

        // Build on top of the younger side, starting from its root
        let tracking = src.max(dst);
        self.current = tracking;
        self.cwd_path.clear();

        let mut queue: VecDeque<PendingPair> = VecDeque::new();
        queue.push_back((
            Some((self.versions[src], src)),
            Some((self.versions[dst], dst)),
            Vec::new(),
        ));

        while let Some((src_side, dst_side, path)) = queue.pop_front() {
            let src_entries = self.sorted_entries(src_side);
            let dst_entries = self.sorted_entries(dst_side);

            let mut i = 0;
            let mut j = 0;
            while i < src_entries.len() && j < dst_entries.len() {
                let (sf, sn) = &src_entries[i];
                let (df, dn) = &dst_entries[j];

                if sf.name() == df.name() && sf.kind() == df.kind() {
                    match sf.kind() {
                        // Documents differ iff they point at different records
                        FileKind::Document if sf.id() != df.id() => {
                            let merged = diff::diff(sf.content(), df.content());
                            self.emit_document(&path, sf.name(), &merged)?;
                        }
                        // Directories differ iff the two sides resolve to
                        // different nodes (a shared node means a shared map)
                        FileKind::Directory
                            if self.tree.effective(*sn, src) != self.tree.effective(*dn, dst) =>
                        {
                            if self.emit_directory(&path, sf.name())? {
                                let mut sub = path.clone();
                                sub.push(sf.name().to_string());
                                queue.push_back((Some((*sn, src)), Some((*dn, dst)), sub));
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                    j += 1;
                } else if sf.name() == df.name() {
                    // Same name, different kind: the document side goes
                    // first, the directory follows on the next step
                    if sf.kind() == FileKind::Document {
                        self.emit_one_sided(&path, sf, (*sn, src), &mut queue)?;
                        i += 1;
                    } else {
                        self.emit_one_sided(&path, df, (*dn, dst), &mut queue)?;
                        j += 1;
                    }
                } else if sf.name() < df.name() {
                    self.emit_one_sided(&path, sf, (*sn, src), &mut queue)?;
                    i += 1;
                } else {
                    self.emit_one_sided(&path, df, (*dn, dst), &mut queue)?;
                    j += 1;
                }
            }
            for (file, node) in &src_entries[i..] {
                self.emit_one_sided(&path, file, (*node, src), &mut queue)?;
            }
            for (file, node) in &dst_entries[j..] {
                self.emit_one_sided(&path, file, (*node, dst), &mut queue)?;
            }
        }

        self.history.push(Action {
            kind: ActionKind::Merge,
            args: vec![format!("{}::{}", src, dst)],
            origin_version: tracking,
            new_version: self.current,
        });
        self.cwd_path.clear();
        Ok(self.current)
    }

    /// Children of one side, read at that side's version and ordered
    /// documents first, then by name
    fn sorted_entries(&self, side: Option<Side>) -> Vec<(File, NodeId)> {
        let Some((node, v)) = side else {
            return Vec::new();
        };
        let mut entries: Vec<(File, NodeId)> = self
            .tree
            .children_at(node, v)
            .values()
            .map(|&child| (self.store.get(self.tree.file_id_at(child, v)).clone(), child))
            .collect();
        entries.sort_by(|a, b| listing_order(&a.0, &b.0));
        entries
    }

    /// Point the working directory at the merged directory named by `path`.
    /// Emissions clone nodes, so this always re-descends from the current
    /// version's root by name.
    fn goto(&mut self, path: &[String]) -> Result<()> {
        self.cwd_path.clear();
        for name in path {
            self.change_directory(name)?;
        }
        Ok(())
    }

    /// Create-if-missing, then write. A name held by a directory on the
    /// merged side cannot take a document and is skipped.
    fn emit_document(&mut self, path: &[String], name: &str, content: &str) -> Result<()> {
        self.goto(path)?;
        match self.find_child(name) {
            None => self.create_file(name, FileKind::Document)?,
            Some((_, node)) => {
                let record = self.store.get(self.tree.file_id_at(node, self.current));
                if record.is_directory() {
                    tracing::warn!("merge: '{}' already taken by a directory, skipping", name);
                    return Ok(());
                }
            }
        }
        if self.read_file(name)? != content {
            self.write_file(name, content)?;
        }
        Ok(())
    }

    /// Create-if-missing. Returns whether the directory is usable (false
    /// when the name is already taken by a document).
    fn emit_directory(&mut self, path: &[String], name: &str) -> Result<bool> {
        self.goto(path)?;
        match self.find_child(name) {
            None => {
                self.create_file(name, FileKind::Directory)?;
                Ok(true)
            }
            Some((_, node)) => {
                let record = self.store.get(self.tree.file_id_at(node, self.current));
                if record.is_directory() {
                    Ok(true)
                } else {
                    tracing::warn!("merge: '{}' already taken by a document, skipping", name);
                    Ok(false)
                }
            }
        }
    }

    /// Copy an entry that exists on one side only: documents verbatim,
    /// directories recursively through the queue
    fn emit_one_sided(
        &mut self,
        path: &[String],
        file: &File,
        side: Side,
        queue: &mut VecDeque<PendingPair>,
    ) -> Result<()> {
        match file.kind() {
            FileKind::Document => self.emit_document(path, file.name(), file.content()),
            FileKind::Directory => {
                if self.emit_directory(path, file.name())? {
                    let mut sub = path.to_vec();
                    sub.push(file.name().to_string());
                    queue.push_back((Some(side), None, sub));
                }
                Ok(())
            }
        }
    }
}
