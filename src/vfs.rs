/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! The operation facade: the single type applications hold and call.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::marker::PhantomData;

use crate::backend::{Backend, BackendId, BackendRegistry};
use crate::error::{VfsError, VfsResult};
use crate::node::{NodeId, NodeInfo, NodeStore, NodeType};
use crate::path;

/// Bound on symlink chases per resolution.
pub const MAX_SYMLINK_DEPTH: usize = 40;

/// One independent namespace: its own node arena and backend registry.
///
/// Nothing here is global; a process that wants several isolated
/// namespaces (e.g. one per sandboxed guest) simply owns several `Vfs`
/// values.
pub struct Vfs {
    store: NodeStore,
    backends: BackendRegistry,
    root: NodeId,
    /// No data lives here; its only job is to make `Vfs` `!Sync` (every
    /// field above is, on its own, `Sync`), without also making it `!Send`.
    _not_sync: PhantomData<Cell<()>>,
}

impl Vfs {
    pub fn new() -> Self {
        let (store, root) = NodeStore::new();
        let mut vfs = Self {
            store,
            backends: BackendRegistry::new(),
            root,
            _not_sync: PhantomData,
        };
        // The root is a directory from the moment the namespace exists,
        // not something lazily hydrated from a backend.
        if let Ok(node) = vfs.store.get_mut(root) {
            node.info.node_type = NodeType::Directory;
        }
        vfs
    }

    /// Id of the always-present root directory node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn info(&self, node: NodeId) -> VfsResult<&NodeInfo> {
        Ok(&self.store.get(node)?.info)
    }

    pub fn name(&self, node: NodeId) -> VfsResult<&str> {
        Ok(&self.store.get(node)?.name)
    }

    /// Registers a backend, returning the id it was assigned.
    pub fn register(&mut self, name: &str, backend: Arc<dyn Backend>) -> VfsResult<BackendId> {
        self.backends.register(name, backend)
    }

    // ---- hydration -----------------------------------------------------

    /// Populates `id`'s metadata from its owning backend if it hasn't been
    /// observed yet, its handle was released, or it's a directory (which is
    /// refreshed on every visit so a backend may lazily enumerate children).
    ///
    /// A node with no backend assigned yet (`fsid == BackendId::NONE`, true
    /// only of the root before anything is mounted) is left alone: there is
    /// nothing to hydrate against.
    fn hydrate(&mut self, id: NodeId) -> VfsResult<()> {
        let (needs, fsid, is_mount_root, has_handle) = {
            let node = self.store.get(id)?;
            let needs = !node.is_symlink()
                && (matches!(node.info.node_type, NodeType::Unknown)
                    || node.info.handle.is_none()
                    || node.is_directory());
            (
                needs,
                node.info.fsid,
                node.info.root == id,
                node.info.handle.is_some(),
            )
        };
        if fsid == BackendId::NONE || !needs {
            return Ok(());
        }
        // The top of a backend's subtree was populated by `mount` itself and
        // has no parent to ask "what's your entry"; refresh it in place via
        // `stat` instead of re-`open`ing it through a parent that may not
        // exist (the root) or may belong to a different backend entirely.
        if is_mount_root && has_handle {
            self.do_stat(id)
        } else {
            self.do_open(id)
        }
    }

    fn do_open(&mut self, id: NodeId) -> VfsResult<()> {
        let (name, fsid, parent_handle) = {
            let node = self.store.get(id)?;
            let parent_handle = match node.parent {
                Some(p) => self.store.get(p)?.info.handle.clone(),
                None => None,
            };
            (node.name.clone(), node.info.fsid, parent_handle)
        };
        let backend = self.backends.get(fsid)?.clone();
        let node = self.store.get_mut(id)?;
        backend.open(parent_handle.as_ref(), &name, &mut node.info)
    }

    fn do_stat(&mut self, id: NodeId) -> VfsResult<()> {
        let (fsid, handle) = {
            let node = self.store.get(id)?;
            (node.info.fsid, node.info.handle.clone())
        };
        let handle = handle.ok_or(VfsError::NotFound)?;
        let backend = self.backends.get(fsid)?.clone();
        let node = self.store.get_mut(id)?;
        backend.stat(&handle, &mut node.info)
    }

    /// Forces a rehydration of `node`, bypassing the "already observed"
    /// check `hydrate` otherwise applies.
    pub fn update(&mut self, node: NodeId) -> VfsResult<()> {
        let is_mount_root_with_handle = {
            let n = self.store.get(node)?;
            n.info.root == node && n.info.handle.is_some()
        };
        if is_mount_root_with_handle {
            self.do_stat(node)
        } else {
            self.do_open(node)
        }
    }

    // ---- path resolution -------------------------------------------------

    /// Resolves `path` from the root, chasing symlinks at every
    /// intermediate component but returning the final component's node
    /// itself even if it is a symlink (callers that need the target, such
    /// as `read`/`write`, chase it themselves via [`Self::follow`]).
    pub fn open(&mut self, path: &str) -> VfsResult<NodeId> {
        let components = path::split(path)?;
        let mut depth = 0usize;
        self.resolve_from(self.root, &components, &mut depth)
    }

    fn resolve_from(
        &mut self,
        start: NodeId,
        components: &[&str],
        depth: &mut usize,
    ) -> VfsResult<NodeId> {
        let mut current = start;
        self.hydrate(current)?;
        for (i, comp) in components.iter().enumerate() {
            current = self.step(current, comp)?;
            self.hydrate(current)?;
            if i + 1 != components.len() {
                current = self.follow(current, depth)?;
                self.hydrate(current)?;
            }
        }
        Ok(current)
    }

    fn step(&mut self, current: NodeId, comp: &str) -> VfsResult<NodeId> {
        match comp {
            "." => Ok(current),
            ".." => {
                let node = self.store.get(current)?;
                if !node.is_directory() {
                    return Err(VfsError::NotADirectory);
                }
                node.parent.ok_or(VfsError::NoParent)
            }
            name => self
                .store
                .find_child(current, name)?
                .ok_or(VfsError::NotFound),
        }
    }

    /// Chases `node` through as many symlinks as necessary to reach a
    /// non-symlink, bounded by [`MAX_SYMLINK_DEPTH`] and a per-call visited
    /// set so a cycle terminates rather than looping forever.
    pub fn follow(&mut self, mut node: NodeId, depth: &mut usize) -> VfsResult<NodeId> {
        let mut visited: Vec<NodeId> = Vec::new();
        loop {
            let target = self.store.get(node)?.symlink_target.clone();
            let Some(target) = target else {
                return Ok(node);
            };
            *depth += 1;
            if *depth > MAX_SYMLINK_DEPTH || visited.contains(&node) {
                return Err(VfsError::LoopOrTooDeep);
            }
            visited.push(node);
            let components = path::split(&target)?;
            node = self.resolve_from(self.root, &components, depth)?;
        }
    }

    // ---- mount manager ---------------------------------------------------

    /// Binds `src` to the backend that accepts it, mounted at the existing
    /// directory `node`.
    pub fn mount(&mut self, src: &str, node: NodeId) -> VfsResult<BackendId> {
        {
            let n = self.store.get(node)?;
            if !n.is_directory() {
                return Err(VfsError::NotADirectory);
            }
        }
        let info = &mut self.store.get_mut(node)?.info;
        let id = self.backends.mount(src, info)?;
        info.fsid = id;
        info.root = node;
        log::info!("mounted '{src}' as {id:?}");
        Ok(id)
    }

    /// Tears down the subtree at `path`, which must be a genuine mount
    /// point (a directory that is its own `root` and has a non-null
    /// `fsid`). Every descendant's handle is closed before the backend's
    /// own `unmount` is invoked; the mount-point node itself survives,
    /// reassigned to the enclosing backend.
    pub fn unmount(&mut self, path: &str) -> VfsResult<()> {
        let node = self.open(path)?;
        let (is_dir, fsid, root, handle, parent) = {
            let n = self.store.get(node)?;
            (
                n.is_directory(),
                n.info.fsid,
                n.info.root,
                n.info.handle.clone(),
                n.parent,
            )
        };
        if !is_dir || fsid == BackendId::NONE || root != node {
            return Err(VfsError::NotAMountPoint);
        }
        self.store.free_children(node, &self.backends)?;
        if let Some(handle) = &handle {
            self.backends.get(fsid)?.unmount(handle);
        }
        let (new_fsid, new_root) = match parent {
            Some(p) => {
                let parent_node = self.store.get(p)?;
                (parent_node.info.fsid, parent_node.info.root)
            }
            None => (BackendId::NONE, node),
        };
        {
            let n = self.store.get_mut(node)?;
            n.info.fsid = new_fsid;
            n.info.root = new_root;
            n.info.handle = None;
        }
        log::info!("unmounted '{path}'");
        if new_fsid != BackendId::NONE {
            self.do_open(node)?;
        }
        Ok(())
    }

    // ---- create operations ------------------------------------------------

    /// Creates `path` and any missing intermediate directories, in the
    /// manner of `mkdir -p`. A failure partway through leaves the
    /// directories created before the failure in place.
    pub fn mkdir(&mut self, path: &str) -> VfsResult<()> {
        let components = path::split(path)?;
        let mut depth = 0usize;
        let mut current = self.root;
        self.hydrate(current)?;
        for comp in components {
            current = match self.step(current, comp) {
                Ok(existing) => {
                    self.hydrate(existing)?;
                    let existing = self.follow(existing, &mut depth)?;
                    self.hydrate(existing)?;
                    if !self.store.get(existing)?.is_directory() {
                        return Err(VfsError::NotADirectory);
                    }
                    existing
                }
                Err(VfsError::NotFound) => self.create_directory(current, comp)?,
                Err(e) => return Err(e),
            };
        }
        Ok(())
    }

    fn create_directory(&mut self, parent: NodeId, name: &str) -> VfsResult<NodeId> {
        let parent_handle = self
            .store
            .get(parent)?
            .info
            .handle
            .clone()
            .ok_or(VfsError::NoBackendAccepts)?;
        let fsid = self.store.get(parent)?.info.fsid;
        let backend = self.backends.get(fsid)?.clone();
        let id = self.store.alloc(parent, String::from(name))?;
        let info = &mut self.store.get_mut(id)?.info;
        if let Err(e) = backend.mkdir(&parent_handle, name, info) {
            self.store.detach(parent, id)?;
            self.store.free_subtree(id, &self.backends)?;
            return Err(e);
        }
        self.store.get_mut(id)?.info.node_type = NodeType::Directory;
        Ok(id)
    }

    /// Creates a new file at `path`. The parent directory must already
    /// exist.
    pub fn mkfile(&mut self, path: &str) -> VfsResult<NodeId> {
        let (parent_path, name) = path::split_parent(path)?;
        let mut depth = 0;
        let parent = self.open(&parent_path)?;
        let parent = self.follow(parent, &mut depth)?;
        self.hydrate(parent)?;
        if !self.store.get(parent)?.is_directory() {
            return Err(VfsError::NotADirectory);
        }
        if self.store.find_child(parent, name)?.is_some() {
            return Err(VfsError::AlreadyExists);
        }
        let parent_handle = self
            .store
            .get(parent)?
            .info
            .handle
            .clone()
            .ok_or(VfsError::NoBackendAccepts)?;
        let fsid = self.store.get(parent)?.info.fsid;
        let backend = self.backends.get(fsid)?.clone();
        let id = self.store.alloc(parent, String::from(name))?;
        let info = &mut self.store.get_mut(id)?.info;
        if let Err(e) = backend.mkfile(&parent_handle, name, info) {
            self.store.detach(parent, id)?;
            self.store.free_subtree(id, &self.backends)?;
            return Err(e);
        }
        let node = self.store.get_mut(id)?;
        if matches!(node.info.node_type, NodeType::Unknown) {
            node.info.node_type = NodeType::Block;
        }
        Ok(id)
    }

    /// Creates a symlink at `path` pointing at the absolute path `target`.
    ///
    /// Unlike `mkdir`/`mkfile`, this never calls into a backend: a symlink
    /// is purely a namespace-layer construct (its target is carried on the
    /// node itself, never on the backend-populated [`NodeInfo`]), so there
    /// is nothing for a backend to be told about.
    pub fn symlink(&mut self, path: &str, target: &str) -> VfsResult<NodeId> {
        let (parent_path, name) = path::split_parent(path)?;
        let mut depth = 0;
        let parent = self.open(&parent_path)?;
        let parent = self.follow(parent, &mut depth)?;
        self.hydrate(parent)?;
        if !self.store.get(parent)?.is_directory() {
            return Err(VfsError::NotADirectory);
        }
        if self.store.find_child(parent, name)?.is_some() {
            return Err(VfsError::AlreadyExists);
        }
        path::split(target)?;
        let id = self.store.alloc(parent, String::from(name))?;
        let node = self.store.get_mut(id)?;
        node.symlink_target = Some(String::from(target));
        node.info.node_type = NodeType::Symlink;
        Ok(id)
    }

    // ---- data operations ---------------------------------------------------

    pub fn read(&mut self, node: NodeId, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        let mut depth = 0;
        let target = self.follow(node, &mut depth)?;
        self.hydrate(target)?;
        let n = self.store.get(target)?;
        if n.is_directory() {
            return Err(VfsError::IsADirectory);
        }
        let handle = n.info.handle.clone().ok_or(VfsError::NotFound)?;
        let backend = self.backends.get(n.info.fsid)?.clone();
        backend.read(&handle, buf, offset)
    }

    pub fn write(&mut self, node: NodeId, buf: &[u8], offset: u64) -> VfsResult<usize> {
        let mut depth = 0;
        let target = self.follow(node, &mut depth)?;
        self.hydrate(target)?;
        let (handle, fsid, is_dir) = {
            let n = self.store.get(target)?;
            (n.info.handle.clone(), n.info.fsid, n.is_directory())
        };
        if is_dir {
            return Err(VfsError::IsADirectory);
        }
        let handle = handle.ok_or(VfsError::NotFound)?;
        let backend = self.backends.get(fsid)?.clone();
        let written = backend.write(&handle, buf, offset)?;
        if written > 0 {
            let n = self.store.get_mut(target)?;
            n.info.size = n.info.size.max(offset + written as u64);
        }
        Ok(written)
    }

    /// Releases `node`'s backend handle, if any. Idempotent; does not free
    /// the node.
    pub fn close(&mut self, node: NodeId) -> VfsResult<()> {
        let n = self.store.get_mut(node)?;
        if let Some(handle) = n.info.handle.take() {
            let fsid = n.info.fsid;
            self.backends.get(fsid)?.close(&handle);
        }
        Ok(())
    }

    /// Reconstructs the absolute path of `node` by walking its parent
    /// chain, truncated at [`path::PATH_MAX`].
    pub fn fullpath(&self, node: NodeId) -> VfsResult<String> {
        let mut names: Vec<&str> = Vec::new();
        let mut current = node;
        loop {
            let n = self.store.get(current)?;
            match n.parent {
                Some(p) => {
                    names.push(&n.name);
                    current = p;
                }
                None => break,
            }
        }
        names.reverse();
        Ok(path::join(&names))
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemBackend;

    fn mounted() -> Vfs {
        let mut vfs = Vfs::new();
        vfs.register("mem", Arc::new(MemBackend::with_prefix("ramdisk")))
            .unwrap();
        let root = vfs.root();
        vfs.mount("ramdisk", root).unwrap();
        vfs
    }

    #[test]
    fn root_resolves_before_any_mount() {
        let mut vfs = Vfs::new();
        let root = vfs.open("/").unwrap();
        assert_eq!(root, vfs.root());
    }

    #[test]
    fn mount_assigns_first_accepting_backend() {
        let mut vfs = mounted();
        assert_eq!(vfs.info(vfs.root()).unwrap().fsid.as_u32(), 1);
    }

    #[test]
    fn mkdir_is_idempotent() {
        let mut vfs = mounted();
        vfs.mkdir("/a/b").unwrap();
        vfs.mkdir("/a/b").unwrap();
        let node = vfs.open("/a/b").unwrap();
        assert_eq!(vfs.fullpath(node).unwrap(), "/a/b");
    }

    #[test]
    fn mkdir_over_a_file_fails() {
        let mut vfs = mounted();
        vfs.mkfile("/a").unwrap();
        assert_eq!(vfs.mkdir("/a").unwrap_err(), VfsError::NotADirectory);
    }

    #[test]
    fn bad_path_is_rejected() {
        let mut vfs = mounted();
        assert_eq!(vfs.mkdir("a").unwrap_err(), VfsError::BadPath);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut vfs = mounted();
        let file = vfs.mkfile("/hello").unwrap();
        let n = vfs.write(file, b"hello", 0).unwrap();
        assert_eq!(n, 5);
        let mut buf = [0u8; 5];
        let n = vfs.read(file, &mut buf, 0).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn short_read_at_eof() {
        let mut vfs = mounted();
        let file = vfs.mkfile("/hello").unwrap();
        vfs.write(file, b"hi", 0).unwrap();
        let mut buf = [0u8; 16];
        let n = vfs.read(file, &mut buf, 0).unwrap();
        assert_eq!(n, 2);
        let n = vfs.read(file, &mut buf, 100).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn write_to_directory_is_rejected() {
        let mut vfs = mounted();
        vfs.mkdir("/a").unwrap();
        let dir = vfs.open("/a").unwrap();
        assert_eq!(vfs.write(dir, b"x", 0).unwrap_err(), VfsError::IsADirectory);
    }

    #[test]
    fn unmount_restores_the_parent_directory() {
        let mut vfs = mounted();
        vfs.register("mem2", Arc::new(MemBackend::with_prefix("inner")))
            .unwrap();
        vfs.mkdir("/mnt").unwrap();
        let mnt = vfs.open("/mnt").unwrap();
        let inner = vfs.mount("inner:x", mnt).unwrap();
        assert_eq!(inner.as_u32(), 2);
        vfs.mkfile("/mnt/x").unwrap();

        vfs.unmount("/mnt").unwrap();

        let mnt_after = vfs.open("/mnt").unwrap();
        assert_eq!(mnt_after, mnt);
        assert!(vfs.info(mnt_after).unwrap().fsid.as_u32() < 2);
        assert_eq!(vfs.open("/mnt/x").unwrap_err(), VfsError::NotFound);
    }

    #[test]
    fn fullpath_roundtrips_through_open() {
        let mut vfs = mounted();
        vfs.mkdir("/a/b/c").unwrap();
        let node = vfs.open("/a/b/c").unwrap();
        assert_eq!(vfs.fullpath(node).unwrap(), "/a/b/c");
    }
}
