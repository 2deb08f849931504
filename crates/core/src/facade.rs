//! Non-versioned filesystem facade
//!
//! The outer tree is a plain in-place arena of named nodes. Any directory
//! can host a CELV engine (`init_versioning`); while the working position
//! is at or below such a directory, every operation is delegated to the
//! engine, otherwise it mutates the outer tree directly.

use crate::engine::Engine;
use crate::error::Error;
use crate::file::{File, FileKind};
use crate::history::Action;
use crate::tree::Version;
use crate::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OuterId(usize);

struct OuterNode {
    name: String,
    kind: FileKind,
    content: String,
    parent: Option<OuterId>,
    children: Vec<OuterId>,
    /// Engine anchored at this directory, if versioning was initialized here
    celv: Option<Engine>,
}

/// The outer, non-versioned file system presented by the shell
pub struct FileSystem {
    nodes: Vec<OuterNode>,
    cwd: OuterId,
    /// Directory hosting the engine the working position currently lives in
    active: Option<OuterId>,
}

impl FileSystem {
    pub fn new() -> Self {
        let root = OuterNode {
            name: "/".to_string(),
            kind: FileKind::Directory,
            content: String::new(),
            parent: None,
            children: Vec::new(),
            celv: None,
        };
        Self {
            nodes: vec![root],
            cwd: OuterId(0),
            active: None,
        }
    }

    fn node(&self, id: OuterId) -> &OuterNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: OuterId) -> &mut OuterNode {
        &mut self.nodes[id.0]
    }

    fn engine(&self) -> Option<&Engine> {
        self.active.and_then(|a| self.node(a).celv.as_ref())
    }

    fn engine_mut(&mut self) -> Option<&mut Engine> {
        let anchor = self.active?;
        self.nodes[anchor.0].celv.as_mut()
    }

    fn require_engine(&mut self) -> Result<&mut Engine> {
        self.engine_mut().ok_or(Error::CelvInactive)
    }

    fn find_outer_child(&self, name: &str) -> Option<OuterId> {
        self.node(self.cwd)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).name == name)
    }

    /// Whether version control is active for the current position
    pub fn versioning_active(&self) -> bool {
        self.active.is_some()
    }

    /// Name shown in the prompt. At an engine's root this is the hosting
    /// outer directory's name.
    pub fn current_dir_name(&self) -> String {
        match self.engine() {
            Some(engine) if !engine.at_root() => engine.working_dir_name(),
            _ => self.node(self.cwd).name.clone(),
        }
    }

    /// Entries of the current directory
    pub fn list(&self) -> Vec<File> {
        match self.engine() {
            Some(engine) => engine.list(),
            None => self
                .node(self.cwd)
                .children
                .iter()
                .map(|&child| {
                    let node = self.node(child);
                    match node.kind {
                        FileKind::Document => {
                            File::document(node.name.as_str(), child.0, node.content.as_str())
                        }
                        FileKind::Directory => File::directory(node.name.as_str(), child.0),
                    }
                })
                .collect(),
        }
    }

    /// Enter the named subdirectory
    pub fn change_directory(&mut self, name: &str) -> Result<()> {
        if let Some(engine) = self.engine_mut() {
            return engine.change_directory(name);
        }
        let child = self.find_outer_child(name).ok_or(Error::NotFound)?;
        if self.node(child).kind != FileKind::Directory {
            return Err(Error::NotADirectory);
        }
        self.cwd = child;
        if self.node(child).celv.is_some() {
            self.active = Some(child);
        }
        Ok(())
    }

    /// Ascend to the parent directory. Leaving a versioned subtree through
    /// its root hands control back to the outer tree.
    pub fn change_directory_up(&mut self) -> Result<()> {
        if let Some(engine) = self.engine_mut() {
            if !engine.at_root() {
                return engine.change_directory_up();
            }
        }
        let parent = self.node(self.cwd).parent.ok_or(Error::RootAscent)?;
        self.active = None;
        self.cwd = parent;
        if self.node(parent).celv.is_some() {
            self.active = Some(parent);
        }
        Ok(())
    }

    /// Create a document or directory in the current directory
    pub fn create_file(&mut self, name: &str, kind: FileKind) -> Result<()> {
        if let Some(engine) = self.engine_mut() {
            return engine.create_file(name, kind);
        }
        if self.find_outer_child(name).is_some() {
            return Err(Error::NameConflict);
        }
        let id = OuterId(self.nodes.len());
        self.nodes.push(OuterNode {
            name: name.to_string(),
            kind,
            content: String::new(),
            parent: Some(self.cwd),
            children: Vec::new(),
            celv: None,
        });
        self.node_mut(self.cwd).children.push(id);
        Ok(())
    }

    /// Remove the named entry; outer directories are removed recursively
    pub fn remove_file(&mut self, name: &str) -> Result<()> {
        if let Some(engine) = self.engine_mut() {
            return engine.remove_file(name);
        }
        let child = self.find_outer_child(name).ok_or(Error::NotFound)?;
        self.node_mut(self.cwd).children.retain(|&c| c != child);
        Ok(())
    }

    /// Content of the named document
    pub fn read_file(&self, name: &str) -> Result<String> {
        if let Some(engine) = self.engine() {
            return engine.read_file(name);
        }
        let child = self.find_outer_child(name).ok_or(Error::NotFound)?;
        let node = self.node(child);
        if node.kind == FileKind::Directory {
            return Err(Error::CannotReadDirectory);
        }
        Ok(node.content.clone())
    }

    /// Replace the named document's content
    pub fn write_file(&mut self, name: &str, content: &str) -> Result<()> {
        if let Some(engine) = self.engine_mut() {
            return engine.write_file(name, content);
        }
        let child = self.find_outer_child(name).ok_or(Error::NotFound)?;
        if self.node(child).kind == FileKind::Directory {
            return Err(Error::CannotWriteDirectory);
        }
        self.node_mut(child).content = content.to_string();
        Ok(())
    }

    /// Activate version control in the current directory. Existing entries
    /// move into the fresh engine by replaying them as ordinary engine
    /// mutations, so they become part of the recorded history.
    pub fn init_versioning(&mut self) -> Result<()> {
        if self.active.is_some() || self.hosts_versioning(self.cwd) {
            return Err(Error::CelvAlreadyInitialized);
        }

        let mut engine = Engine::new();
        self.replay_into(&mut engine, self.cwd)?;

        self.node_mut(self.cwd).children.clear();
        self.node_mut(self.cwd).celv = Some(engine);
        self.active = Some(self.cwd);
        Ok(())
    }

    fn hosts_versioning(&self, dir: OuterId) -> bool {
        let node = self.node(dir);
        node.celv.is_some() || node.children.iter().any(|&c| self.hosts_versioning(c))
    }

    fn replay_into(&self, engine: &mut Engine, dir: OuterId) -> Result<()> {
        for &child in &self.node(dir).children {
            let node = self.node(child);
            engine.create_file(&node.name, node.kind)?;
            match node.kind {
                FileKind::Document => {
                    if !node.content.is_empty() {
                        engine.write_file(&node.name, &node.content)?;
                    }
                }
                FileKind::Directory => {
                    engine.change_directory(&node.name)?;
                    self.replay_into(engine, child)?;
                    engine.change_directory_up()?;
                }
            }
        }
        Ok(())
    }

    /// Current version of the active engine
    pub fn version(&mut self) -> Result<Version> {
        Ok(self.require_engine()?.version())
    }

    /// Recorded actions of the active engine
    pub fn history(&mut self) -> Result<Vec<Action>> {
        Ok(self.require_engine()?.history().to_vec())
    }

    /// Switch the active engine to an existing version
    pub fn set_version(&mut self, v: Version) -> Result<()> {
        self.require_engine()?.set_version(v)
    }

    /// Merge two versions of the active engine
    pub fn merge(&mut self, v1: Version, v2: Version) -> Result<Version> {
        self.require_engine()?.merge(v1, v2)
    }

    /// Mirror a host directory into the active engine
    pub fn import_local_path(&mut self, path: &Path) -> Result<Version> {
        self.require_engine()?.import_local_path(path)
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_names(fs: &FileSystem) -> Vec<String> {
        let mut names: Vec<String> = fs.list().iter().map(|f| f.name().to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_outer_tree_crud() -> Result<()> {
        let mut fs = FileSystem::new();
        fs.create_file("docs", FileKind::Directory)?;
        fs.create_file("note", FileKind::Document)?;
        fs.write_file("note", "hola")?;

        assert_eq!(fs.read_file("note")?, "hola");
        assert_eq!(sorted_names(&fs), vec!["docs", "note"]);
        assert!(!fs.versioning_active());

        fs.change_directory("docs")?;
        assert!(fs.list().is_empty());
        fs.change_directory_up()?;

        fs.remove_file("docs")?;
        assert_eq!(sorted_names(&fs), vec!["note"]);
        Ok(())
    }

    #[test]
    fn test_outer_errors_match_engine_vocabulary() -> Result<()> {
        let mut fs = FileSystem::new();
        fs.create_file("d", FileKind::Directory)?;

        assert!(matches!(
            fs.create_file("d", FileKind::Document).unwrap_err(),
            Error::NameConflict
        ));
        assert!(matches!(
            fs.read_file("d").unwrap_err(),
            Error::CannotReadDirectory
        ));
        assert!(matches!(
            fs.write_file("d", "x").unwrap_err(),
            Error::CannotWriteDirectory
        ));
        assert!(matches!(
            fs.change_directory_up().unwrap_err(),
            Error::RootAscent
        ));
        assert!(matches!(fs.read_file("nope").unwrap_err(), Error::NotFound));
        Ok(())
    }

    #[test]
    fn test_celv_queries_require_activation() {
        let mut fs = FileSystem::new();
        assert!(matches!(fs.version().unwrap_err(), Error::CelvInactive));
        assert!(matches!(fs.history().unwrap_err(), Error::CelvInactive));
        assert!(matches!(fs.set_version(0).unwrap_err(), Error::CelvInactive));
        assert!(matches!(fs.merge(0, 1).unwrap_err(), Error::CelvInactive));
    }

    #[test]
    fn test_init_delegates_operations() -> Result<()> {
        let mut fs = FileSystem::new();
        fs.init_versioning()?;
        assert!(fs.versioning_active());
        assert_eq!(fs.version()?, 0);

        fs.create_file("a", FileKind::Directory)?;
        fs.create_file("b", FileKind::Document)?;
        assert_eq!(fs.version()?, 2);

        fs.write_file("b", "hola")?;
        fs.write_file("b", "mundo")?;
        fs.set_version(3)?;
        assert_eq!(fs.read_file("b")?, "hola");
        fs.set_version(4)?;
        assert_eq!(fs.read_file("b")?, "mundo");
        Ok(())
    }

    #[test]
    fn test_init_replays_existing_entries() -> Result<()> {
        let mut fs = FileSystem::new();
        fs.create_file("keep", FileKind::Document)?;
        fs.write_file("keep", "payload")?;
        fs.create_file("sub", FileKind::Directory)?;
        fs.change_directory("sub")?;
        fs.create_file("inner", FileKind::Document)?;
        fs.change_directory_up()?;

        fs.init_versioning()?;
        assert_eq!(sorted_names(&fs), vec!["keep", "sub"]);
        assert_eq!(fs.read_file("keep")?, "payload");
        fs.change_directory("sub")?;
        assert_eq!(sorted_names(&fs), vec!["inner"]);
        Ok(())
    }

    #[test]
    fn test_init_rejected_inside_or_above_versioned_subtree() -> Result<()> {
        let mut fs = FileSystem::new();
        fs.create_file("a", FileKind::Directory)?;
        fs.change_directory("a")?;
        fs.init_versioning()?;

        // Inside the versioned subtree
        assert!(matches!(
            fs.init_versioning().unwrap_err(),
            Error::CelvAlreadyInitialized
        ));

        // Above it: a descendant already hosts an engine
        fs.change_directory_up()?;
        assert!(!fs.versioning_active());
        assert!(matches!(
            fs.init_versioning().unwrap_err(),
            Error::CelvAlreadyInitialized
        ));
        Ok(())
    }

    #[test]
    fn test_crossing_the_versioned_boundary() -> Result<()> {
        let mut fs = FileSystem::new();
        fs.create_file("outer", FileKind::Document)?;
        fs.create_file("repo", FileKind::Directory)?;
        fs.change_directory("repo")?;
        fs.init_versioning()?;
        fs.create_file("inner", FileKind::Directory)?;
        fs.change_directory("inner")?;

        // Two ups: engine root, then back into the outer tree
        fs.change_directory_up()?;
        assert!(fs.versioning_active());
        assert_eq!(fs.current_dir_name(), "repo");
        fs.change_directory_up()?;
        assert!(!fs.versioning_active());
        assert_eq!(fs.current_dir_name(), "/");
        assert_eq!(sorted_names(&fs), vec!["outer", "repo"]);

        // Re-entering resumes the same engine and its history
        fs.change_directory("repo")?;
        assert!(fs.versioning_active());
        assert_eq!(fs.version()?, 1);
        assert_eq!(sorted_names(&fs), vec!["inner"]);
        Ok(())
    }

    #[test]
    fn test_prompt_name_follows_position() -> Result<()> {
        let mut fs = FileSystem::new();
        assert_eq!(fs.current_dir_name(), "/");

        fs.create_file("repo", FileKind::Directory)?;
        fs.change_directory("repo")?;
        assert_eq!(fs.current_dir_name(), "repo");

        fs.init_versioning()?;
        assert_eq!(fs.current_dir_name(), "repo");

        fs.create_file("deep", FileKind::Directory)?;
        fs.change_directory("deep")?;
        assert_eq!(fs.current_dir_name(), "deep");
        Ok(())
    }
}
