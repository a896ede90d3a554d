use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use render_sandbox::vfs::{FileSystem, RelativeFileSystem, RootFileSystem, VfsError, normalize};

use crate::common::test_utils::MemoryFileSystem;

mod common;

#[test]
fn should_normalize_paths() {
    assert_eq!(normalize(Path::new("a/b/../c")), PathBuf::from("/a/c"));
    assert_eq!(normalize(Path::new("/a/./b/")), PathBuf::from("/a/b"));
    assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
}

#[test]
fn should_dispatch_to_mounted_file_system() {
    let mut root = RootFileSystem::new();
    root.mount_fs(
        "/media",
        Arc::new(MemoryFileSystem::new().with_file("/models/box.gltf", "box")),
    );

    assert_eq!(root.read_to_string(Path::new("/media/models/box.gltf")).unwrap(), "box");
    assert!(root.exists(Path::new("/media/models/box.gltf")));
    assert!(!root.exists(Path::new("/media/models/sphere.gltf")));
}

#[test]
fn should_report_unmounted_paths() {
    let root = RootFileSystem::new();
    let err = root.read_file(Path::new("/nowhere/file.txt")).unwrap_err();
    assert!(matches!(err, VfsError::NotMounted(_)));
}

#[test]
fn should_prefer_longest_mount_prefix() {
    let mut root = RootFileSystem::new();
    root.mount_fs("/shaders", Arc::new(MemoryFileSystem::new().with_file("/framework/a.wgsl", "outer")));
    root.mount_fs("/shaders/framework", Arc::new(MemoryFileSystem::new().with_file("/a.wgsl", "inner")));

    assert_eq!(root.read_to_string(Path::new("/shaders/framework/a.wgsl")).unwrap(), "inner");

    assert!(root.unmount("/shaders/framework"));
    assert_eq!(root.read_to_string(Path::new("/shaders/framework/a.wgsl")).unwrap(), "outer");
    assert!(!root.unmount("/shaders/framework"));
}

#[test]
fn should_replace_existing_mount() {
    let mut root = RootFileSystem::new();
    root.mount_fs("/data", Arc::new(MemoryFileSystem::new().with_file("/x", "first")));
    root.mount_fs("/data/", Arc::new(MemoryFileSystem::new().with_file("/x", "second")));
    assert_eq!(root.read_to_string(Path::new("/data/x")).unwrap(), "second");
}

#[test]
fn should_resolve_relative_file_system_below_base() {
    let inner: Arc<dyn FileSystem> = Arc::new(MemoryFileSystem::new().with_file("/assets/textures/a.png", [1u8, 2, 3]));
    let fs = RelativeFileSystem::new(inner, "/assets");
    assert_eq!(fs.read_file(Path::new("/textures/a.png")).unwrap(), vec![1, 2, 3]);
    assert!(fs.exists(Path::new("textures/a.png")));
}

#[test]
fn should_read_native_directories() {
    let mut root = RootFileSystem::new();
    root.mount("/shaders", Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders"));
    let source = root
        .read_to_string(Path::new("/shaders/triangle/shaders.wgsl"))
        .unwrap();
    assert!(source.contains("main_vs"));
}

#[test]
fn should_fail_on_invalid_utf8() {
    let fs = MemoryFileSystem::new().with_file("/bin", vec![0xffu8, 0xfe]);
    assert!(matches!(fs.read_to_string(Path::new("/bin")), Err(VfsError::Io { .. })));
}
