//! Command line options shared by every sample.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum GraphicsApi {
    /// Let wgpu pick the best primary backend.
    #[default]
    Auto,
    Vulkan,
    Dx12,
    Metal,
    Gl,
}

impl GraphicsApi {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            GraphicsApi::Auto => wgpu::Backends::PRIMARY,
            GraphicsApi::Vulkan => wgpu::Backends::VULKAN,
            GraphicsApi::Dx12 => wgpu::Backends::DX12,
            GraphicsApi::Metal => wgpu::Backends::METAL,
            GraphicsApi::Gl => wgpu::Backends::GL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GraphicsApi::Auto => "auto",
            GraphicsApi::Vulkan => "Vulkan",
            GraphicsApi::Dx12 => "D3D12",
            GraphicsApi::Metal => "Metal",
            GraphicsApi::Gl => "OpenGL",
        }
    }
}

/// Human readable name of the backend wgpu actually picked.
pub fn backend_name(backend: wgpu::Backend) -> &'static str {
    match backend {
        wgpu::Backend::Vulkan => "Vulkan",
        wgpu::Backend::Dx12 => "D3D12",
        wgpu::Backend::Metal => "Metal",
        wgpu::Backend::Gl => "OpenGL",
        wgpu::Backend::BrowserWebGpu => "WebGPU",
        _ => "unknown",
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(version, about)]
pub struct Args {
    /// Graphics backend to run on.
    #[arg(long, value_enum, default_value_t = GraphicsApi::Auto)]
    pub api: GraphicsApi,
    /// Back buffer width in pixels.
    #[arg(long)]
    pub width: Option<u32>,
    /// Back buffer height in pixels.
    #[arg(long)]
    pub height: Option<u32>,
    #[arg(long)]
    pub vsync: bool,
    /// Enable backend validation.
    #[arg(long)]
    pub debug: bool,
    /// glTF scene to load.
    #[arg(long)]
    pub scene: Option<PathBuf>,
    /// Directory containing the `framework/` and per-sample shader folders.
    #[arg(long)]
    pub shader_dir: Option<PathBuf>,
    /// Load the scene on a background task.
    #[arg(long)]
    pub async_load: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCreationParameters {
    pub window_title: String,
    pub back_buffer_width: u32,
    pub back_buffer_height: u32,
    pub swap_chain_sample_count: u32,
    pub vsync_enabled: bool,
    pub enable_debug_runtime: bool,
    pub api: GraphicsApi,
}

impl Default for DeviceCreationParameters {
    fn default() -> Self {
        Self {
            window_title: String::new(),
            back_buffer_width: 1280,
            back_buffer_height: 720,
            swap_chain_sample_count: 1,
            vsync_enabled: false,
            enable_debug_runtime: false,
            api: GraphicsApi::Auto,
        }
    }
}

impl DeviceCreationParameters {
    /// Combine command line options with a sample's title and default size.
    pub fn from_args(args: &Args, window_title: &str, default_size: Option<(u32, u32)>) -> Self {
        let defaults = Self::default();
        let (width, height) =
            default_size.unwrap_or((defaults.back_buffer_width, defaults.back_buffer_height));
        Self {
            window_title: window_title.to_string(),
            back_buffer_width: args.width.unwrap_or(width),
            back_buffer_height: args.height.unwrap_or(height),
            vsync_enabled: args.vsync,
            enable_debug_runtime: args.debug,
            api: args.api,
            ..defaults
        }
    }
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<exe dir>/../media/glTF-Sample-Assets/Models/Sponza/glTF/Sponza.gltf`
pub fn default_scene_path() -> PathBuf {
    exe_dir()
        .join("..")
        .join("media/glTF-Sample-Assets/Models/Sponza/glTF/Sponza.gltf")
}

/// `<exe dir>/shaders` when the build script copied them there, the crate's
/// `shaders/` directory otherwise.
pub fn default_shader_dir() -> PathBuf {
    let next_to_exe = exe_dir().join("shaders");
    if next_to_exe.is_dir() {
        next_to_exe
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders")
    }
}

impl Args {
    pub fn scene_path(&self) -> PathBuf {
        self.scene.clone().unwrap_or_else(default_scene_path)
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.shader_dir.clone().unwrap_or_else(default_shader_dir)
    }
}
