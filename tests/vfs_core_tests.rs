use std::sync::Arc;

use pluggable_vfs::testutil::MemBackend;
use pluggable_vfs::{Vfs, VfsError};

fn mounted() -> Vfs {
    let mut vfs = Vfs::new();
    vfs.register("mem", Arc::new(MemBackend::new())).unwrap();
    let root = vfs.root();
    vfs.mount("ramdisk", root).unwrap();
    vfs
}

#[test]
fn init_and_mount_assigns_backend_one() {
    let vfs = mounted();
    assert_eq!(vfs.info(vfs.root()).unwrap().fsid.as_u32(), 1);
}

#[test]
fn nested_mkdir_then_open_roundtrips_fullpath() {
    let mut vfs = mounted();
    vfs.mkdir("/a/b/c").unwrap();
    let node = vfs.open("/a/b/c").unwrap();
    assert_eq!(vfs.fullpath(node).unwrap(), "/a/b/c");
}

#[test]
fn symlink_read_and_write_are_transparent_to_the_target() {
    let mut vfs = mounted();
    let file = vfs.mkfile("/real").unwrap();
    vfs.write(file, b"payload", 0).unwrap();

    let link = vfs.symlink("/link", "/real").unwrap();
    let mut buf = [0u8; 7];
    let n = vfs.read(link, &mut buf, 0).unwrap();
    assert_eq!(&buf[..n], b"payload");

    vfs.write(link, b"changed", 0).unwrap();
    let n = vfs.read(file, &mut buf, 0).unwrap();
    assert_eq!(&buf[..n], b"changed");
}

#[test]
fn open_returns_the_symlink_node_itself_not_its_target() {
    let mut vfs = mounted();
    vfs.mkfile("/real").unwrap();
    let link = vfs.symlink("/link", "/real").unwrap();
    let opened = vfs.open("/link").unwrap();
    assert_eq!(opened, link);
    assert_eq!(vfs.fullpath(opened).unwrap(), "/link");
}

#[test]
fn symlink_cycle_is_rejected() {
    let mut vfs = mounted();
    vfs.symlink("/a", "/b").unwrap();
    vfs.symlink("/b", "/a").unwrap();
    let link = vfs.open("/a").unwrap();
    assert_eq!(
        vfs.read(link, &mut [0u8; 1], 0).unwrap_err(),
        VfsError::LoopOrTooDeep
    );
}

#[test]
fn traversal_follows_an_intermediate_symlinked_directory() {
    let mut vfs = mounted();
    vfs.mkdir("/real_dir").unwrap();
    vfs.mkfile("/real_dir/file").unwrap();
    vfs.symlink("/link_dir", "/real_dir").unwrap();

    let node = vfs.open("/link_dir/file").unwrap();
    assert_eq!(vfs.fullpath(node).unwrap(), "/real_dir/file");
}

#[test]
fn bad_path_without_leading_slash_is_rejected() {
    let mut vfs = mounted();
    assert_eq!(vfs.mkdir("relative").unwrap_err(), VfsError::BadPath);
}

#[test]
fn write_to_a_directory_is_rejected() {
    let mut vfs = mounted();
    vfs.mkdir("/dir").unwrap();
    let dir = vfs.open("/dir").unwrap();
    assert_eq!(
        vfs.write(dir, b"x", 0).unwrap_err(),
        VfsError::IsADirectory
    );
}

#[test]
fn unmount_restores_parent_and_drops_mounted_content() {
    let mut vfs = mounted();
    vfs.register("mem2", Arc::new(MemBackend::with_prefix("inner")))
        .unwrap();
    vfs.mkdir("/mnt").unwrap();
    let mnt = vfs.open("/mnt").unwrap();
    vfs.mount("inner:disk", mnt).unwrap();
    vfs.mkfile("/mnt/x").unwrap();

    vfs.unmount("/mnt").unwrap();

    let mnt_after = vfs.open("/mnt").unwrap();
    assert_eq!(mnt_after, mnt);
    assert_eq!(vfs.open("/mnt/x").unwrap_err(), VfsError::NotFound);
}

#[test]
fn mkfile_on_an_existing_name_fails() {
    let mut vfs = mounted();
    vfs.mkfile("/dup").unwrap();
    assert_eq!(vfs.mkfile("/dup").unwrap_err(), VfsError::AlreadyExists);
}

#[test]
fn partial_mkdir_failure_leaves_the_prefix_created() {
    let mut vfs = mounted();
    vfs.mkfile("/a").unwrap();
    assert_eq!(vfs.mkdir("/a/b").unwrap_err(), VfsError::NotADirectory);
    // "/a" exists (as the file it always was); nothing under it was created.
    let a = vfs.open("/a").unwrap();
    assert_eq!(vfs.fullpath(a).unwrap(), "/a");
}

#[test]
fn close_is_idempotent() {
    let mut vfs = mounted();
    let file = vfs.mkfile("/f").unwrap();
    vfs.close(file).unwrap();
    vfs.close(file).unwrap();
    // a closed node rehydrates transparently on next access
    vfs.write(file, b"x", 0).unwrap();
}
