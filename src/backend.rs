/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! The backend contract and the registry that dispatches to it.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{VfsError, VfsResult};
use crate::node::{Handle, NodeInfo};

/// Id of a registered [`Backend`]. `0` is reserved for [`NullBackend`], the
/// backend every node is implicitly owned by before anything is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendId(u32);

impl BackendId {
    pub const NONE: BackendId = BackendId(0);

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Operations a storage provider implements to participate in the namespace.
///
/// Every method is required: supplying an impl of this trait *is* supplying a
/// complete operation table, in place of a null-checked function-pointer
/// array where every slot had to be validated at registration time.
pub trait Backend: Send + Sync {
    /// Claim `node` for this backend, populating its metadata from `src`.
    /// Returns `Err` if this backend doesn't recognize `src`; the registry
    /// tries the next one.
    fn mount(&self, src: &str, node: &mut NodeInfo) -> VfsResult<()>;

    /// Release whatever state this backend attached to a mount point.
    fn unmount(&self, handle: &Handle);

    /// Look up `name` under `parent` (or the backend root if `parent` is
    /// `None`) and populate `node`'s metadata. Returns `NotFound` if absent.
    fn open(&self, parent: Option<&Handle>, name: &str, node: &mut NodeInfo) -> VfsResult<()>;

    /// Release a handle previously produced by `open`/`mkdir`/`mkfile`.
    fn close(&self, handle: &Handle);

    fn read(&self, handle: &Handle, buf: &mut [u8], offset: u64) -> VfsResult<usize>;

    fn write(&self, handle: &Handle, buf: &[u8], offset: u64) -> VfsResult<usize>;

    /// Create a new directory named `name` under `parent`.
    fn mkdir(&self, parent: &Handle, name: &str, node: &mut NodeInfo) -> VfsResult<()>;

    /// Create a new file named `name` under `parent`.
    fn mkfile(&self, parent: &Handle, name: &str, node: &mut NodeInfo) -> VfsResult<()>;

    /// Refresh `node`'s metadata from backend-side state.
    fn stat(&self, handle: &Handle, node: &mut NodeInfo) -> VfsResult<()>;
}

/// The backend implicitly assigned to every node before anything is mounted.
/// Every operation reports `NotFound`; there is nothing to dispatch to yet.
pub struct NullBackend;

impl Backend for NullBackend {
    fn mount(&self, _src: &str, _node: &mut NodeInfo) -> VfsResult<()> {
        Err(VfsError::NoBackendAccepts)
    }

    fn unmount(&self, _handle: &Handle) {}

    fn open(&self, _parent: Option<&Handle>, _name: &str, _node: &mut NodeInfo) -> VfsResult<()> {
        Err(VfsError::NotFound)
    }

    fn close(&self, _handle: &Handle) {}

    fn read(&self, _handle: &Handle, _buf: &mut [u8], _offset: u64) -> VfsResult<usize> {
        Err(VfsError::NotFound)
    }

    fn write(&self, _handle: &Handle, _buf: &[u8], _offset: u64) -> VfsResult<usize> {
        Err(VfsError::NotFound)
    }

    fn mkdir(&self, _parent: &Handle, _name: &str, _node: &mut NodeInfo) -> VfsResult<()> {
        Err(VfsError::NotFound)
    }

    fn mkfile(&self, _parent: &Handle, _name: &str, _node: &mut NodeInfo) -> VfsResult<()> {
        Err(VfsError::NotFound)
    }

    fn stat(&self, _handle: &Handle, _node: &mut NodeInfo) -> VfsResult<()> {
        Err(VfsError::NotFound)
    }
}

/// Table of registered backends, indexed by [`BackendId`]. Slot 0 always
/// holds [`NullBackend`].
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: alloc::vec![Arc::new(NullBackend)],
        }
    }

    /// Registers a backend and returns the id it was assigned. Ids are
    /// handed out starting at 1 and are never reused.
    pub fn register(&mut self, name: &str, backend: Arc<dyn Backend>) -> VfsResult<BackendId> {
        let id = BackendId(self.backends.len() as u32);
        log::debug!("registering backend '{name}' as {id:?}");
        self.backends.push(backend);
        Ok(id)
    }

    pub fn get(&self, id: BackendId) -> VfsResult<&Arc<dyn Backend>> {
        self.backends.get(id.0 as usize).ok_or(VfsError::InvalidBackend)
    }

    /// Number of registered backends, including the null backend at slot 0.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Tries every registered backend (skipping the null one) in id order;
    /// the first to accept `src` claims `node`.
    pub fn mount(&self, src: &str, node: &mut NodeInfo) -> VfsResult<BackendId> {
        for (idx, backend) in self.backends.iter().enumerate().skip(1) {
            if backend.mount(src, node).is_ok() {
                return Ok(BackendId(idx as u32));
            }
        }
        Err(VfsError::NoBackendAccepts)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
