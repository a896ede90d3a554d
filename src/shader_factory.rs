//! WGSL shader loading.
//!
//! Shaders are read through the virtual file system below a base path, run
//! through a minimal `#include "file"` preprocessor and compiled into cached
//! [`wgpu::ShaderModule`]s.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::vfs::{self, FileSystem, VfsError};

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error("{file} does not declare a {stage} entry point named `{entry}`")]
    MissingEntryPoint {
        file: PathBuf,
        entry: String,
        stage: ShaderStage,
    },
    #[error("malformed include directive in {file}: {line}")]
    MalformedInclude { file: PathBuf, line: String },
    #[error("failed to compile {file}: {message}")]
    Compilation { file: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    fn attribute(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "@vertex",
            ShaderStage::Fragment => "@fragment",
            ShaderStage::Compute => "@compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        })
    }
}

/// A compiled module together with the entry point a pipeline should use.
#[derive(Debug, Clone)]
pub struct ShaderHandle {
    pub module: Arc<wgpu::ShaderModule>,
    pub entry_point: String,
    pub stage: ShaderStage,
}

impl ShaderHandle {
    pub fn entry(&self) -> Option<&str> {
        Some(self.entry_point.as_str())
    }
}

pub struct ShaderFactory {
    device: wgpu::Device,
    fs: Arc<dyn FileSystem>,
    base_path: PathBuf,
    modules: Mutex<HashMap<PathBuf, Arc<wgpu::ShaderModule>>>,
}

impl ShaderFactory {
    pub fn new(device: wgpu::Device, fs: Arc<dyn FileSystem>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            device,
            fs,
            base_path: base_path.into(),
            modules: Mutex::new(HashMap::new()),
        }
    }

    /// Factory reading from a native directory mounted at `/shaders`.
    pub fn from_directory(device: wgpu::Device, shader_dir: impl Into<PathBuf>) -> Self {
        let mut root = vfs::RootFileSystem::new();
        root.mount("/shaders", shader_dir);
        Self::new(device, Arc::new(root), "/shaders")
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    fn full_path(&self, file: &str) -> PathBuf {
        vfs::normalize(&self.base_path.join(file))
    }

    /// Read a shader with all its includes expanded.
    pub fn load_source(&self, file: &str) -> Result<String, ShaderError> {
        preprocess(self.fs.as_ref(), &self.full_path(file))
    }

    /// Load, validate and compile `entry` of the given stage from `file`.
    pub fn create_shader(
        &self,
        file: &str,
        entry: &str,
        stage: ShaderStage,
    ) -> Result<ShaderHandle, ShaderError> {
        let path = self.full_path(file);
        let source = preprocess(self.fs.as_ref(), &path)?;
        if !declares_entry_point(&source, entry, stage) {
            return Err(ShaderError::MissingEntryPoint {
                file: path,
                entry: entry.to_string(),
                stage,
            });
        }

        let module = self.module_for(&path, source)?;
        Ok(ShaderHandle {
            module,
            entry_point: entry.to_string(),
            stage,
        })
    }

    fn module_for(&self, path: &Path, source: String) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        let mut modules = self
            .modules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(module) = modules.get(path) {
            return Ok(module.clone());
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let label = path.to_string_lossy();
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label.as_ref()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = futures::executor::block_on(self.device.pop_error_scope()) {
            return Err(ShaderError::Compilation {
                file: path.to_path_buf(),
                message: error.to_string(),
            });
        }

        log::info!("compiled shader {}", label);
        let module = Arc::new(module);
        modules.insert(path.to_path_buf(), module.clone());
        Ok(module)
    }
}

/// Expand `#include "file"` lines. Paths resolve relative to the including file.
pub fn preprocess(fs: &dyn FileSystem, path: &Path) -> Result<String, ShaderError> {
    let mut visited = HashSet::new();
    let mut out = String::new();
    expand(fs, &vfs::normalize(path), &mut visited, &mut out)?;
    Ok(out)
}

fn expand(
    fs: &dyn FileSystem,
    path: &Path,
    visited: &mut HashSet<PathBuf>,
    out: &mut String,
) -> Result<(), ShaderError> {
    if !visited.insert(path.to_path_buf()) {
        return Ok(());
    }
    let source = fs.read_to_string(path)?;
    for line in source.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("#include") else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        let target = rest
            .trim()
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .filter(|target| !target.is_empty())
            .ok_or_else(|| ShaderError::MalformedInclude {
                file: path.to_path_buf(),
                line: line.to_string(),
            })?;
        let dir = path.parent().unwrap_or(Path::new("/"));
        expand(fs, &vfs::normalize(&dir.join(target)), visited, out)?;
    }
    Ok(())
}

/// Whether `source` declares `fn entry` directly behind the stage attribute.
///
/// Other attributes such as `@workgroup_size(8, 8)` may sit in between.
pub fn declares_entry_point(source: &str, entry: &str, stage: ShaderStage) -> bool {
    let source = &strip_comments(source);
    let attribute = stage.attribute();
    source.match_indices(attribute).any(|(idx, _)| {
        let after = &source[idx + attribute.len()..];
        // `@vertex` must not match `@vertex_foo`.
        if after.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            return false;
        }
        let Some(fn_pos) = after.find("fn") else {
            return false;
        };
        let between = &after[..fn_pos];
        if between.contains(';') || between.contains('{') {
            return false;
        }
        let name = after[fn_pos + 2..]
            .trim_start()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .next()
            .unwrap_or_default();
        name == entry
    })
}

/// Replace `//` line comments and (nested) `/* */` block comments with a space.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut depth = 0usize;
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                if depth == 0 {
                    out.push(' ');
                }
                depth += 1;
            }
            ('*', Some('/')) if depth > 0 => {
                chars.next();
                depth -= 1;
            }
            ('/', Some('/')) if depth == 0 => {
                out.push(' ');
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ if depth > 0 => {
                if c == '\n' {
                    out.push('\n');
                }
            }
            _ => out.push(c),
        }
    }
    out
}
