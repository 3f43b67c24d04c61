/* Copyright (c) [2023] [Syswonder Community]
 *   [Ruxos] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Path grammar: `/` | `/` component (`/` component)*. No normalization:
//! a double slash or a trailing slash (other than the root alone) is a
//! [`VfsError::BadPath`](crate::VfsError::BadPath), not silently collapsed.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{VfsError, VfsResult};

pub const PATH_MAX: usize = 4096;
pub const FILENAME_MAX: usize = 256;

/// Splits an absolute path into its components, rejecting anything that
/// doesn't match the grammar. `"/"` yields an empty component list.
pub fn split(path: &str) -> VfsResult<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(VfsError::BadPath);
    }
    if path.len() > PATH_MAX {
        return Err(VfsError::BadPath);
    }
    if path == "/" {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    for component in path[1..].split('/') {
        if component.is_empty() || component.len() > FILENAME_MAX {
            return Err(VfsError::BadPath);
        }
        parts.push(component);
    }
    Ok(parts)
}

/// Splits `path` into its parent directory and final component, e.g.
/// `"/a/b/c"` -> `("/a/b", "c")`. The root itself has no parent split.
pub fn split_parent(path: &str) -> VfsResult<(String, &str)> {
    let parts = split(path)?;
    let (last, init) = parts.split_last().ok_or(VfsError::BadPath)?;
    let last: &str = last;
    let parent = if init.is_empty() {
        String::from("/")
    } else {
        let mut s = String::from("/");
        s.push_str(&init.join("/"));
        s
    };
    Ok((parent, last))
}

/// Joins path components (already validated by [`split`]) back into an
/// absolute path string, truncating at [`PATH_MAX`].
pub fn join(components: &[&str]) -> String {
    if components.is_empty() {
        return String::from("/");
    }
    let mut out = String::new();
    for c in components {
        out.push('/');
        out.push_str(c);
        if out.len() > PATH_MAX {
            out.truncate(PATH_MAX);
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn root_has_no_components() {
        assert_eq!(split("/").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn splits_on_slash() {
        assert_eq!(split("/a/b/c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_relative_paths() {
        assert_eq!(split("a/b").unwrap_err(), VfsError::BadPath);
    }

    #[test]
    fn rejects_double_slash() {
        assert_eq!(split("/a//b").unwrap_err(), VfsError::BadPath);
    }

    #[test]
    fn rejects_trailing_slash() {
        assert_eq!(split("/a/b/").unwrap_err(), VfsError::BadPath);
    }

    #[test]
    fn splits_parent_and_name() {
        let (parent, name) = split_parent("/a/b/c").unwrap();
        assert_eq!(parent, "/a/b");
        assert_eq!(name, "c");
    }

    #[test]
    fn splits_parent_of_top_level() {
        let (parent, name) = split_parent("/a").unwrap();
        assert_eq!(parent, "/");
        assert_eq!(name, "a");
    }

    #[test]
    fn join_roundtrips_split() {
        assert_eq!(join(&split("/a/b/c").unwrap()), "/a/b/c");
        assert_eq!(join(&split("/").unwrap()), "/");
    }
}
