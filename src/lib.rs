/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! A pluggable virtual filesystem namespace core.
//!
//! This crate presents a single unified hierarchical namespace rooted at
//! `/`, while delegating storage semantics to one or more [`Backend`]
//! implementations registered at runtime. It is the namespace layer only:
//! path resolution, the node graph (mount points and symlinks included),
//! and the mount/unmount protocol. A [`Backend`] is how an in-memory store,
//! a disk-backed store, or a network store plugs in underneath it.
//!
//! The moving parts:
//!
//! - [`Vfs`]: the facade applications hold. [`Vfs::open`], [`Vfs::mkdir`],
//!   [`Vfs::mkfile`], [`Vfs::read`], [`Vfs::write`], [`Vfs::close`] and
//!   [`Vfs::mount`]/[`Vfs::unmount`] are its public operations.
//! - [`Backend`]: the trait a storage provider implements. Every node in
//!   the namespace is owned by exactly one backend at a time.
//! - [`NodeId`]: a non-owning handle into the namespace's node arena,
//!   returned by `open`/`mkfile` and passed back into `read`/`write`/`close`.
//!
//! ```
//! use pluggable_vfs::Vfs;
//!
//! let mut vfs = Vfs::new();
//! // `vfs.mount(..., vfs.root())` binds a backend before anything else
//! // can be created; see the crate tests for a full example with a
//! // concrete backend.
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod backend;
mod error;
mod node;
mod path;
mod vfs;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use backend::{Backend, BackendId, BackendRegistry, NullBackend};
pub use error::{VfsError, VfsResult};
pub use node::{Handle, NodeId, NodeInfo, NodeType};
pub use path::{FILENAME_MAX, PATH_MAX};
pub use vfs::{Vfs, MAX_SYMLINK_DEPTH};
