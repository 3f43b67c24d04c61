/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! The node arena: allocation, linkage and teardown of namespace nodes.
//!
//! Parent/child/root links are [`NodeId`]s, non-owning indices into a single
//! [`NodeStore`] arena, rather than reference-counted pointers. A node is
//! live exactly as long as its slot in the arena is occupied; once freed, its
//! id can never resolve to a node again, so there is no stale-pointer hazard
//! to guard against.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use crate::backend::{BackendId, BackendRegistry};
use crate::error::VfsResult;

/// Opaque, backend-supplied per-node state. The core stores and returns it
/// but never inspects or downcasts it.
pub type Handle = Arc<dyn Any + Send + Sync>;

/// Non-owning index into a [`NodeStore`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a namespace node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Allocated but never hydrated from a backend.
    Unknown,
    Directory,
    Block,
    Stream,
    Symlink,
}

/// Metadata carried by every node, populated lazily from its owning backend.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub node_type: NodeType,
    pub size: u64,
    pub realsize: u64,
    pub create_time: u64,
    pub read_time: u64,
    pub write_time: u64,
    pub owner: u32,
    pub group: u32,
    pub permissions: u32,
    /// Id of the backend that owns this node.
    pub fsid: BackendId,
    /// Backend-supplied handle; `None` until the node is hydrated.
    pub handle: Option<Handle>,
    /// Top of this node's backend subtree. Equal to `self` at a mount point.
    pub root: NodeId,
}

impl NodeInfo {
    fn new(fsid: BackendId, root: NodeId) -> Self {
        Self {
            node_type: NodeType::Unknown,
            size: 0,
            realsize: 0,
            create_time: 0,
            read_time: 0,
            write_time: 0,
            owner: 0,
            group: 0,
            permissions: 0,
            fsid,
            handle: None,
            root,
        }
    }
}

/// One entry in the namespace tree: a single path component.
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Absolute target path, present only on symlink nodes.
    pub symlink_target: Option<String>,
    pub info: NodeInfo,
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self.info.node_type, NodeType::Directory)
    }

    pub fn is_symlink(&self) -> bool {
        self.symlink_target.is_some()
    }
}

/// Arena owning every live [`Node`]. Freed slots are tracked on a free list
/// so repeated mount/unmount cycles don't grow the arena unboundedly.
pub struct NodeStore {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl NodeStore {
    /// Builds a store containing only the root node, owned by the no-op
    /// backend (id 0) until something mounts over it.
    pub fn new() -> (Self, NodeId) {
        let mut store = Self {
            slots: Vec::new(),
            free: Vec::new(),
        };
        let root_id = NodeId(0);
        let info = NodeInfo::new(BackendId::NONE, root_id);
        store.slots.push(Some(Node {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            symlink_target: None,
            info,
        }));
        (store, root_id)
    }

    pub fn get(&self, id: NodeId) -> VfsResult<&Node> {
        self.slots
            .get(id.index())
            .and_then(|s| s.as_ref())
            .ok_or(crate::error::VfsError::NotFound)
    }

    pub fn get_mut(&mut self, id: NodeId) -> VfsResult<&mut Node> {
        self.slots
            .get_mut(id.index())
            .and_then(|s| s.as_mut())
            .ok_or(crate::error::VfsError::NotFound)
    }

    fn new_slot(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            id
        } else {
            let id = NodeId(self.slots.len() as u32);
            self.slots.push(Some(node));
            id
        }
    }

    /// Allocates a new, un-hydrated child node under `parent`, inheriting its
    /// `fsid`/`root`.
    pub fn alloc(&mut self, parent: NodeId, name: String) -> VfsResult<NodeId> {
        let (fsid, root) = {
            let p = self.get(parent)?;
            (p.info.fsid, p.info.root)
        };
        let info = NodeInfo::new(fsid, root);
        let id = self.new_slot(Node {
            name,
            parent: Some(parent),
            children: Vec::new(),
            symlink_target: None,
            info,
        });
        self.get_mut(parent)?.children.insert(0, id);
        Ok(id)
    }

    /// Recursively frees every descendant of `id`, closing each one's handle
    /// via its owning backend first, but leaves `id` itself in place.
    ///
    /// Used by unmount: the mount-point node survives, reassigned to the
    /// enclosing backend by the caller.
    pub fn free_children(&mut self, id: NodeId, backends: &BackendRegistry) -> VfsResult<()> {
        let children = core::mem::take(&mut self.get_mut(id)?.children);
        for child in children {
            self.free_subtree(child, backends)?;
        }
        Ok(())
    }

    /// Recursively frees `id` and everything beneath it, including `id`'s own
    /// slot. `id` must already be detached from its parent's child list by
    /// the caller (or be the caller's own subtree root).
    pub fn free_subtree(&mut self, id: NodeId, backends: &BackendRegistry) -> VfsResult<()> {
        let children = core::mem::take(&mut self.get_mut(id)?.children);
        for child in children {
            self.free_subtree(child, backends)?;
        }
        let node = self.get_mut(id)?;
        if let Some(handle) = node.info.handle.take() {
            if let Ok(backend) = backends.get(node.info.fsid) {
                backend.close(&handle);
            }
        }
        self.slots[id.index()] = None;
        self.free.push(id);
        Ok(())
    }

    /// Detaches `child` from `parent`'s child list without freeing it.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> VfsResult<()> {
        self.get_mut(parent)?.children.retain(|c| *c != child);
        Ok(())
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> VfsResult<Option<NodeId>> {
        let node = self.get(parent)?;
        Ok(node
            .children
            .iter()
            .copied()
            .find(|c| self.get(*c).map(|n| n.name == name).unwrap_or(false)))
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendRegistry;
    use alloc::string::ToString;

    #[test]
    fn alloc_links_parent_and_child() {
        let (mut store, root) = NodeStore::new();
        let child = store.alloc(root, "a".to_string()).unwrap();
        assert_eq!(store.get(child).unwrap().parent, Some(root));
        assert!(store.get(root).unwrap().children.contains(&child));
    }

    #[test]
    fn child_inherits_parent_fsid_and_root() {
        let (mut store, root) = NodeStore::new();
        store.get_mut(root).unwrap().info.fsid = BackendId::NONE;
        let child = store.alloc(root, "a".to_string()).unwrap();
        assert_eq!(store.get(child).unwrap().info.fsid, BackendId::NONE);
        assert_eq!(store.get(child).unwrap().info.root, root);
    }

    #[test]
    fn free_subtree_reclaims_slots() {
        let (mut store, root) = NodeStore::new();
        let a = store.alloc(root, "a".to_string()).unwrap();
        let _b = store.alloc(a, "b".to_string()).unwrap();
        store.detach(root, a).unwrap();
        let backends = BackendRegistry::new();
        store.free_subtree(a, &backends).unwrap();
        assert!(store.get(a).is_err());
        // the reclaimed slot is reused rather than growing the arena
        let c = store.alloc(root, "c".to_string()).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn find_child_is_name_based() {
        let (mut store, root) = NodeStore::new();
        let a = store.alloc(root, "a".to_string()).unwrap();
        assert_eq!(store.find_child(root, "a").unwrap(), Some(a));
        assert_eq!(store.find_child(root, "missing").unwrap(), None);
    }
}
