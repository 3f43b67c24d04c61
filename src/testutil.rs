/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! An in-memory [`Backend`] used to exercise the backend contract in tests.
//!
//! Not a supported storage backend: no persistence, no capacity limits
//! beyond available heap. It exists purely as test scaffolding.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use crate::backend::Backend;
use crate::error::{VfsError, VfsResult};
use crate::node::{Handle, NodeInfo, NodeType};

enum MemNode {
    Dir(Mutex<Vec<(String, Arc<MemNode>)>>),
    File(Mutex<Vec<u8>>),
}

impl MemNode {
    fn new_dir() -> Arc<Self> {
        Arc::new(MemNode::Dir(Mutex::new(Vec::new())))
    }

    fn new_file() -> Arc<Self> {
        Arc::new(MemNode::File(Mutex::new(Vec::new())))
    }
}

fn downcast(handle: &Handle) -> VfsResult<Arc<MemNode>> {
    handle
        .clone()
        .downcast::<MemNode>()
        .map_err(|_| VfsError::Backend(-1))
}

fn populate(node: &mut NodeInfo, mem: &Arc<MemNode>) {
    node.handle = Some(mem.clone() as Handle);
    match mem.as_ref() {
        MemNode::Dir(_) => node.node_type = NodeType::Directory,
        MemNode::File(data) => {
            node.node_type = NodeType::Block;
            node.size = data.lock().len() as u64;
            node.realsize = node.size;
        }
    }
}

/// An in-memory backend: every mount gets its own independent tree rooted
/// at a fresh empty directory, keyed by the mount's `src` string.
///
/// Claims a mount only when `src` starts with its configured `prefix`, so a
/// registry can hold several `MemBackend`s side by side and have `mount`
/// pick the right one, the way a real registry of distinct backends would.
pub struct MemBackend {
    prefix: String,
    mounts: Mutex<alloc::collections::BTreeMap<String, Arc<MemNode>>>,
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemBackend {
    /// A backend that claims every source (suitable when only one backend
    /// is registered).
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// A backend that claims only sources starting with `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            mounts: Mutex::new(alloc::collections::BTreeMap::new()),
        }
    }
}

impl Backend for MemBackend {
    fn mount(&self, src: &str, node: &mut NodeInfo) -> VfsResult<()> {
        if !src.starts_with(self.prefix.as_str()) {
            return Err(VfsError::NoBackendAccepts);
        }
        let mut mounts = self.mounts.lock();
        let root = mounts
            .entry(src.to_string())
            .or_insert_with(MemNode::new_dir)
            .clone();
        populate(node, &root);
        Ok(())
    }

    fn unmount(&self, _handle: &Handle) {}

    fn open(&self, parent: Option<&Handle>, name: &str, node: &mut NodeInfo) -> VfsResult<()> {
        let parent = parent.ok_or(VfsError::NotFound)?;
        let parent = downcast(parent)?;
        let MemNode::Dir(children) = parent.as_ref() else {
            return Err(VfsError::NotADirectory);
        };
        let children = children.lock();
        let (_, child) = children
            .iter()
            .find(|(n, _)| n == name)
            .ok_or(VfsError::NotFound)?;
        populate(node, child);
        Ok(())
    }

    fn close(&self, _handle: &Handle) {}

    fn read(&self, handle: &Handle, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        let mem = downcast(handle)?;
        let MemNode::File(data) = mem.as_ref() else {
            return Err(VfsError::IsADirectory);
        };
        let data = data.lock();
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = (data.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write(&self, handle: &Handle, buf: &[u8], offset: u64) -> VfsResult<usize> {
        let mem = downcast(handle)?;
        let MemNode::File(data) = mem.as_ref() else {
            return Err(VfsError::IsADirectory);
        };
        let mut data = data.lock();
        let offset = offset as usize;
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn mkdir(&self, parent: &Handle, name: &str, node: &mut NodeInfo) -> VfsResult<()> {
        let parent = downcast(parent)?;
        let MemNode::Dir(children) = parent.as_ref() else {
            return Err(VfsError::NotADirectory);
        };
        let mut children = children.lock();
        if children.iter().any(|(n, _)| n == name) {
            return Err(VfsError::AlreadyExists);
        }
        let dir = MemNode::new_dir();
        children.push((name.to_string(), dir.clone()));
        populate(node, &dir);
        Ok(())
    }

    fn mkfile(&self, parent: &Handle, name: &str, node: &mut NodeInfo) -> VfsResult<()> {
        let parent = downcast(parent)?;
        let MemNode::Dir(children) = parent.as_ref() else {
            return Err(VfsError::NotADirectory);
        };
        let mut children = children.lock();
        if children.iter().any(|(n, _)| n == name) {
            return Err(VfsError::AlreadyExists);
        }
        let file = MemNode::new_file();
        children.push((name.to_string(), file.clone()));
        populate(node, &file);
        Ok(())
    }

    fn stat(&self, handle: &Handle, node: &mut NodeInfo) -> VfsResult<()> {
        let mem = downcast(handle)?;
        populate(node, &mem);
        Ok(())
    }
}

