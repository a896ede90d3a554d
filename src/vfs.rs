//! Virtual file system used by the shader factory, texture cache and scene loader.
//!
//! Samples mount native directories under virtual prefixes (for instance the
//! framework shaders under `/shaders/framework`) and hand the resulting
//! [`RootFileSystem`] to the loaders. Loaders only ever see virtual paths.

use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("no file system is mounted for {0}")]
    NotMounted(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only access to a tree of files.
pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError>;

    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String, VfsError> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|e| VfsError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }
}

/// Plain OS file access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileSystem;

impl FileSystem for NativeFileSystem {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        std::fs::read(path).map_err(|source| VfsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Exposes the sub-tree of another file system below `base_path`.
pub struct RelativeFileSystem {
    inner: Arc<dyn FileSystem>,
    base_path: PathBuf,
}

impl RelativeFileSystem {
    pub fn new(inner: Arc<dyn FileSystem>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.base_path.join(relative)
    }
}

impl FileSystem for RelativeFileSystem {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        self.inner.read_file(&self.resolve(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(&self.resolve(path))
    }
}

/// Dispatches virtual paths to mounted file systems by longest matching prefix.
#[derive(Default)]
pub struct RootFileSystem {
    mounts: Vec<(PathBuf, Arc<dyn FileSystem>)>,
}

impl RootFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a native directory under a virtual prefix.
    pub fn mount(&mut self, prefix: impl AsRef<Path>, native_path: impl Into<PathBuf>) {
        let native: Arc<dyn FileSystem> = Arc::new(NativeFileSystem);
        self.mount_fs(prefix, Arc::new(RelativeFileSystem::new(native, native_path)));
    }

    pub fn mount_fs(&mut self, prefix: impl AsRef<Path>, fs: Arc<dyn FileSystem>) {
        let prefix = normalize(prefix.as_ref());
        self.mounts.retain(|(existing, _)| *existing != prefix);
        self.mounts.push((prefix, fs));
        // Longest prefix first so nested mounts win over their parents.
        self.mounts
            .sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.components().count()));
    }

    pub fn unmount(&mut self, prefix: impl AsRef<Path>) -> bool {
        let prefix = normalize(prefix.as_ref());
        let before = self.mounts.len();
        self.mounts.retain(|(existing, _)| *existing != prefix);
        before != self.mounts.len()
    }

    fn find(&self, path: &Path) -> Option<(&dyn FileSystem, PathBuf)> {
        let path = normalize(path);
        self.mounts.iter().find_map(|(prefix, fs)| {
            path.strip_prefix(prefix)
                .ok()
                .map(|rest| (fs.as_ref(), Path::new("/").join(rest)))
        })
    }
}

impl FileSystem for RootFileSystem {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        match self.find(path) {
            Some((fs, rest)) => fs.read_file(&rest),
            None => Err(VfsError::NotMounted(path.to_path_buf())),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.find(path).is_some_and(|(fs, rest)| fs.exists(&rest))
    }
}

/// Lexically normalize a virtual path: always absolute, `.` dropped and `..` folded.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => (),
        }
    }
    let mut normalized = PathBuf::from("/");
    normalized.extend(parts);
    normalized
}
