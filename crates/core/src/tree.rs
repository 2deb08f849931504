//! Persistent directory tree with change-box node sharing
//!
//! Nodes live in an arena and are addressed by index; clones copy indices,
//! never storage, so shared subtrees cost nothing and no reference cycles
//! can form (every node is strictly younger than its parent).
//!
//! Each node owns at most one "change box": a one-slot, in-place next
//! version of itself. The first mutation of a node lands in the box for
//! free; the second forces a fresh clone that cascades up through the
//! parents until it is absorbed by an empty box or replaces the root.

use crate::file::FileId;
use std::collections::BTreeMap;

/// Snapshot counter. Lower numbers are older.
pub type Version = usize;

/// Arena index of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Children keyed by file id. `BTreeMap` keeps the ordering deterministic.
pub type ChildMap = BTreeMap<FileId, NodeId>;

#[derive(Debug)]
struct Node {
    /// Id of the file record this node represents
    file_id: FileId,
    parent: Option<NodeId>,
    children: ChildMap,
    /// The one deferred next-version of this node
    change_box: Option<NodeId>,
    /// Version at which this node was created
    version: Version,
}

/// Outcome of an update primitive. `new_self` is the freshly cloned node
/// when the change box was already taken; `new_root` is set when the
/// cascade reached and replaced the root.
#[derive(Debug, Clone, Copy)]
pub struct Update {
    pub new_self: Option<NodeId>,
    pub new_root: Option<NodeId>,
}

impl Update {
    const ABSORBED: Update = Update {
        new_self: None,
        new_root: None,
    };
}

/// Arena of versioned directory nodes
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh node with no children
    pub fn alloc(&mut self, file_id: FileId, parent: Option<NodeId>, version: Version) -> NodeId {
        self.alloc_with(file_id, parent, ChildMap::new(), version)
    }

    fn alloc_with(
        &mut self,
        file_id: FileId,
        parent: Option<NodeId>,
        children: ChildMap,
        version: Version,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            file_id,
            parent,
            children,
            change_box: None,
            version,
        });
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// The node whose data answers queries at version `v`: the change box
    /// iff it exists and was created at or before `v`, else the node itself.
    /// Two references resolving to the same node share their entire data.
    pub(crate) fn effective(&self, id: NodeId, v: Version) -> NodeId {
        match self.node(id).change_box {
            Some(boxed) if self.node(boxed).version <= v => boxed,
            _ => id,
        }
    }

    pub fn file_id_at(&self, id: NodeId, v: Version) -> FileId {
        self.node(self.effective(id, v)).file_id
    }

    pub fn children_at(&self, id: NodeId, v: Version) -> &ChildMap {
        &self.node(self.effective(id, v)).children
    }

    /// Id of the record this node was born with. This is also the node's
    /// key in its parent's child map.
    pub fn file_id(&self, id: NodeId) -> FileId {
        self.node(id).file_id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.node_mut(id).parent = parent;
    }

    pub fn version(&self, id: NodeId) -> Version {
        self.node(id).version
    }

    /// Directly attach a child to a node that is not yet visible to any
    /// version (used while building import subtrees). Published nodes must
    /// go through `add_file` instead.
    pub(crate) fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        let key = self.node(child).file_id;
        self.node_mut(parent).children.insert(key, child);
    }

    /// Replace this node's child map as of version `new_v`.
    ///
    /// If the change box is empty it absorbs the mutation and nothing else
    /// moves. Otherwise a fresh node carries the new map and the parent's
    /// child map is rewritten through a recursive `update_children`,
    /// splicing the possibly-new parent into the fresh node.
    pub fn update_children(
        &mut self,
        id: NodeId,
        new_children: ChildMap,
        cur: Version,
        new_v: Version,
    ) -> Update {
        if self.node(id).change_box.is_none() {
            let file_id = self.node(id).file_id;
            let parent = self.node(id).parent;
            let boxed = self.alloc_with(file_id, parent, new_children, new_v);
            self.node_mut(id).change_box = Some(boxed);
            return Update::ABSORBED;
        }

        let file_id = self.node(id).file_id;
        let fresh = self.alloc_with(file_id, None, new_children, new_v);
        self.adopt_children(fresh);

        let Some(parent) = self.node(id).parent else {
            // Root clone: the fresh node is the new version's root
            return Update {
                new_self: Some(fresh),
                new_root: Some(fresh),
            };
        };

        let mut parent_children = self.children_at(parent, cur).clone();
        parent_children.insert(file_id, fresh);
        let up = self.update_children(parent, parent_children, cur, new_v);
        self.node_mut(fresh).parent = Some(up.new_self.unwrap_or(parent));

        Update {
            new_self: Some(fresh),
            new_root: up.new_root,
        }
    }

    /// Re-point this node at a new file record as of version `new_v`.
    ///
    /// Mirror of `update_children`. The cloned path additionally rekeys
    /// this node in its parent's map from the old file id to the new one;
    /// the absorbed path leaves the parent untouched (readers resolve the
    /// effective file id through the box).
    pub fn update_file_id(
        &mut self,
        id: NodeId,
        new_file_id: FileId,
        cur: Version,
        new_v: Version,
    ) -> Update {
        if self.node(id).change_box.is_none() {
            let parent = self.node(id).parent;
            let children = self.node(id).children.clone();
            let boxed = self.alloc_with(new_file_id, parent, children, new_v);
            self.node_mut(id).change_box = Some(boxed);
            return Update::ABSORBED;
        }

        let children = self.children_at(id, cur).clone();
        let fresh = self.alloc_with(new_file_id, None, children, new_v);
        self.adopt_children(fresh);

        let old_key = self.node(id).file_id;
        let Some(parent) = self.node(id).parent else {
            return Update {
                new_self: Some(fresh),
                new_root: Some(fresh),
            };
        };

        let mut parent_children = self.children_at(parent, cur).clone();
        parent_children.remove(&old_key);
        parent_children.insert(new_file_id, fresh);
        let up = self.update_children(parent, parent_children, cur, new_v);
        self.node_mut(fresh).parent = Some(up.new_self.unwrap_or(parent));

        Update {
            new_self: Some(fresh),
            new_root: up.new_root,
        }
    }

    /// Re-point every child of a fresh clone at the clone. Cascades walk
    /// parent pointers against the current version, so siblings of an
    /// edited node must not keep referencing the superseded original.
    fn adopt_children(&mut self, fresh: NodeId) {
        let kids: Vec<NodeId> = self.node(fresh).children.values().copied().collect();
        for kid in kids {
            self.node_mut(kid).parent = Some(fresh);
        }
    }

    /// Insert `child` into this directory's child map as of `new_v`
    pub fn add_file(&mut self, dir: NodeId, child: NodeId, cur: Version, new_v: Version) -> Update {
        let mut children = self.children_at(dir, cur).clone();
        children.insert(self.node(child).file_id, child);
        let up = self.update_children(dir, children, cur, new_v);
        // The child must point at whichever node owns it in the new version
        self.node_mut(child).parent = Some(up.new_self.unwrap_or(dir));
        up
    }

    /// Erase `key` from this directory's child map as of `new_v`.
    /// An absent key is a no-op and returns nothing.
    pub fn remove_file(
        &mut self,
        dir: NodeId,
        key: FileId,
        cur: Version,
        new_v: Version,
    ) -> Option<Update> {
        let mut children = self.children_at(dir, cur).clone();
        children.remove(&key)?;
        Some(self.update_children(dir, children, cur, new_v))
    }
}
