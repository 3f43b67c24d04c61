/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Errno-style error type shared by every operation in this crate.

use core::fmt;

/// Error type returned by namespace operations.
///
/// Mirrors the handful of POSIX-ish conditions a namespace layer can report;
/// backend-specific failures that don't map onto one of these are folded into
/// [`VfsError::Backend`] carrying the backend's own error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsError {
    /// A path failed the resolver's grammar (missing leading `/`, empty
    /// component, component longer than [`crate::FILENAME_MAX`]).
    BadPath,
    /// No node with the given name exists in its parent.
    NotFound,
    /// Expected a directory, found something else.
    NotADirectory,
    /// Expected a file, found a directory.
    IsADirectory,
    /// `..` was requested at the root.
    NoParent,
    /// Symlink chase revisited a node or exceeded the depth bound.
    LoopOrTooDeep,
    /// The target name is already occupied by an incompatible node.
    AlreadyExists,
    /// No registered backend accepted the mount.
    NoBackendAccepts,
    /// `unmount` was called on a node that is not a mount point.
    NotAMountPoint,
    /// A [`crate::BackendId`] has no registered backend.
    InvalidBackend,
    /// A backend reported a failure; the payload is the backend's own code.
    Backend(i32),
    /// A backend could not satisfy an allocation (out of blocks, etc.).
    OutOfMemory,
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            VfsError::BadPath => "bad path",
            VfsError::NotFound => "no such file or directory",
            VfsError::NotADirectory => "not a directory",
            VfsError::IsADirectory => "is a directory",
            VfsError::NoParent => "no parent directory",
            VfsError::LoopOrTooDeep => "too many levels of symbolic links",
            VfsError::AlreadyExists => "already exists",
            VfsError::NoBackendAccepts => "no backend accepted the mount",
            VfsError::NotAMountPoint => "not a mount point",
            VfsError::InvalidBackend => "invalid backend id",
            VfsError::Backend(code) => return write!(f, "backend error ({code})"),
            VfsError::OutOfMemory => "out of memory",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VfsError {}

/// Result alias used throughout this crate.
pub type VfsResult<T = ()> = Result<T, VfsError>;
