//! Engine data structures: meshes, materials, textures, lights and the scene graph.
//!
//! - `model` contains vertex layouts, GPU meshes and materials
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds node transforms and per-instance GPU data
//! - `light` holds punctual light descriptions and their shader layout
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod light;
pub mod model;
pub mod scene_graph;
pub mod texture;
