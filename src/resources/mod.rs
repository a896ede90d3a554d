/**
 * This module contains all logic for loading meshes, materials and textures from external files.
 */
pub mod gltf;
pub mod mesh;
pub mod texture;
