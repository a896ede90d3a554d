//! render-sandbox
//!
//! A small rendering framework on top of wgpu and winit plus three samples
//! that exercise it: a vertex-buffer-free triangle, a forward renderer and a
//! deferred renderer for glTF scenes.
//!
//! High-level modules
//! - `app`: scene loading and shared passes for the scene samples
//! - `binding_cache`: bind groups keyed by render target generation
//! - `camera`: first-person camera and the reverse-Z projection
//! - `cli`: command line options and device creation parameters
//! - `context`: GPU device, window surface and frame timing
//! - `data_structures`: meshes, materials, textures, lights and the scene graph
//! - `flow`: the render pass interface and the event loop driving it
//! - `pipelines`: pipeline helpers and the forward/deferred/blit passes
//! - `render`: draw strategies and geometry pass composition
//! - `render_targets`: offscreen target sets
//! - `resources`: glTF and texture loading
//! - `scene`: GPU scene with instancing data
//! - `shader_factory`: WGSL loading with `#include` support
//! - `vfs`: virtual file system
//! - `view`: planar view and its shader constants
//!

pub mod app;
pub mod binding_cache;
pub mod camera;
pub mod cli;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod render_targets;
pub mod resources;
pub mod scene;
pub mod shader_factory;
pub mod vfs;
pub mod view;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;
