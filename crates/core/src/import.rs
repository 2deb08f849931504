//! Mirroring of a host directory subtree into the engine
//!
//! The walk happens host-side; the engine only sees fresh records and one
//! `add_file` insertion, so a whole import is a single version bump with a
//! single history entry.

use crate::engine::Engine;
use crate::error::Error;
use crate::file::{File, FileId};
use crate::history::ActionKind;
use crate::tree::NodeId;
use crate::{Result, Version};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

impl Engine {
    /// Mirror the directory at `path` as a new child of the working
    /// directory. Entries that are neither regular files nor directories,
    /// and entries without read+write permission for owner or others, are
    /// skipped with a warning; the import itself never aborts over them.
    pub fn import_local_path(&mut self, path: &Path) -> Result<Version> {
        if !path.is_dir() {
            return Err(Error::ImportPath(path.display().to_string()));
        }

        let root_name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Err(Error::ImportPath(path.display().to_string())),
        };
        if self.find_child(&root_name).is_some() {
            return Err(Error::NameConflict);
        }

        let wd = self.seat_cwd();
        let sub_root = self.mirror_directory(&root_name, Some(wd));

        // Nodes under construction are invisible to every version, so they
        // are attached directly instead of through the update protocol
        let mut dirs: HashMap<PathBuf, NodeId> = HashMap::new();
        dirs.insert(path.to_path_buf(), sub_root);

        let mut walk = WalkDir::new(path)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walk.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("ignoring unreadable entry during import: {}", err);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                tracing::warn!(
                    "ignoring '{}': not a regular file nor a directory",
                    entry.path().display()
                );
                continue;
            }

            let permitted = match entry.metadata() {
                Ok(meta) => {
                    let ok = has_mirror_permissions(&meta);
                    if !ok {
                        tracing::warn!(
                            "ignoring '{}': not enough permissions",
                            entry.path().display()
                        );
                    }
                    ok
                }
                Err(err) => {
                    tracing::warn!("ignoring '{}': {}", entry.path().display(), err);
                    false
                }
            };
            if !permitted {
                if file_type.is_dir() {
                    walk.skip_current_dir();
                }
                continue;
            }

            // Entries whose parent was skipped have no node to hang from
            let Some(&parent_node) = entry.path().parent().and_then(|p| dirs.get(p)) else {
                continue;
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if file_type.is_dir() {
                let node = self.mirror_directory(&name, Some(parent_node));
                self.tree.attach_child(parent_node, node);
                dirs.insert(entry.path().to_path_buf(), node);
            } else {
                let content = match std::fs::read(entry.path()) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(err) => {
                        tracing::warn!("ignoring '{}': {}", entry.path().display(), err);
                        continue;
                    }
                };
                let id = self.store.next_id();
                self.store.push(File::document(name, id, content));
                let node = self.tree.alloc(id, Some(parent_node), self.next);
                self.tree.attach_child(parent_node, node);
            }
        }

        let update = self.tree.add_file(wd, sub_root, self.current, self.next);
        self.commit(
            update,
            ActionKind::Import,
            vec![path.display().to_string()],
        );
        Ok(self.current)
    }

    fn mirror_directory(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id: FileId = self.store.next_id();
        self.store.push(File::directory(name, id));
        self.tree.alloc(id, parent, self.next)
    }
}

/// Mirrorable iff readable and writable by owner, or by others
#[cfg(unix)]
fn has_mirror_permissions(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    const OWNER_RW: u32 = 0o600;
    const OTHERS_RW: u32 = 0o006;
    let mode = meta.permissions().mode();
    (mode & OWNER_RW) == OWNER_RW || (mode & OTHERS_RW) == OTHERS_RW
}

#[cfg(not(unix))]
fn has_mirror_permissions(meta: &std::fs::Metadata) -> bool {
    !meta.permissions().readonly()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileKind;
    use tempfile::TempDir;

    fn sorted_names(engine: &Engine) -> Vec<String> {
        let mut names: Vec<String> = engine.list().iter().map(|f| f.name().to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_import_missing_path_is_rejected() {
        let mut engine = Engine::new();
        let err = engine
            .import_local_path(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, Error::ImportPath(_)));
        assert_eq!(engine.version(), 0);
    }

    #[test]
    fn test_import_mirrors_nested_tree() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("readme"), "docs").unwrap();
        std::fs::create_dir(root.join("src")).unwrap();
        std::fs::write(root.join("src").join("main"), "fn main() {}").unwrap();

        let mut engine = Engine::new();
        engine.import_local_path(&root)?;

        // One version bump, one history entry for the whole subtree
        assert_eq!(engine.version(), 1);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history()[0].kind, ActionKind::Import);

        assert_eq!(sorted_names(&engine), vec!["proj"]);
        engine.change_directory("proj")?;
        assert_eq!(sorted_names(&engine), vec!["readme", "src"]);
        assert_eq!(engine.read_file("readme")?, "docs");

        engine.change_directory("src")?;
        assert_eq!(engine.read_file("main")?, "fn main() {}");
        Ok(())
    }

    #[test]
    fn test_import_is_invisible_to_older_versions() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("f"), "x").unwrap();

        let mut engine = Engine::new();
        engine.create_file("before", FileKind::Document)?;
        engine.import_local_path(&root)?;

        engine.set_version(1)?;
        assert_eq!(sorted_names(&engine), vec!["before"]);
        engine.set_version(2)?;
        assert_eq!(sorted_names(&engine), vec!["before", "data"]);
        Ok(())
    }

    #[test]
    fn test_import_name_conflict() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("taken");
        std::fs::create_dir(&root).unwrap();

        let mut engine = Engine::new();
        engine.create_file("taken", FileKind::Document)?;
        let err = engine.import_local_path(&root).unwrap_err();
        assert!(matches!(err, Error::NameConflict));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_import_skips_entries_without_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join("mixed");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("open"), "ok").unwrap();
        std::fs::write(root.join("locked"), "secret").unwrap();
        std::fs::set_permissions(root.join("locked"), std::fs::Permissions::from_mode(0o400))
            .unwrap();

        let mut engine = Engine::new();
        engine.import_local_path(&root)?;
        engine.change_directory("mixed")?;

        assert_eq!(sorted_names(&engine), vec!["open"]);
        Ok(())
    }
}
