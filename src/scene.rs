//! GPU scene built from a parsed glTF description.

use std::{
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{info, warn};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        light::LightConstants,
        model::{
            Material, MaterialConstants, MaterialTextures, Mesh, material_bind_group_layout,
        },
        scene_graph::SceneGraph,
        texture::{Texture, create_linear_sampler},
    },
    resources::{
        gltf::{ImageSource, MaterialDesc, SceneDescription, parse_gltf},
        texture::TextureCache,
    },
    vfs::{FileSystem, VfsError},
};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error("failed to parse {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: ::gltf::Error,
    },
    #[error("buffer {index} of {path} is missing or too short")]
    MissingBuffer { path: PathBuf, index: usize },
    #[error("unsupported uri {0}")]
    UnsupportedUri(String),
    #[error("{0} contains no scenes")]
    NoScene(PathBuf),
    #[error("scene loading was interrupted: {0}")]
    Interrupted(String),
}

/// A contiguous run of instances in the instance buffer that all draw `mesh`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshBatch {
    pub mesh: usize,
    pub instances: Range<u32>,
    /// Instances with a negative determinant, whose triangles wind the other way.
    pub mirrored: bool,
}

pub struct Scene {
    pub path: PathBuf,
    pub graph: SceneGraph,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    instance_buffer: Option<wgpu::Buffer>,
    batches: Vec<MeshBatch>,
    loaded_frame: Option<u64>,
}

impl Scene {
    /// Parse `path` and upload meshes and materials.
    ///
    /// Instances are not built until [`Scene::finished_loading`] runs.
    pub fn load(
        device: &wgpu::Device,
        textures: &TextureCache,
        fs: &dyn FileSystem,
        path: &Path,
    ) -> Result<Self, SceneError> {
        info!("loading scene {}", path.display());
        let desc = parse_gltf(fs, path)?;
        Ok(Self::from_description(device, textures, fs, desc))
    }

    pub fn from_description(
        device: &wgpu::Device,
        textures: &TextureCache,
        fs: &dyn FileSystem,
        desc: SceneDescription,
    ) -> Self {
        let layout = material_bind_group_layout(device);
        let sampler = create_linear_sampler(device, wgpu::AddressMode::Repeat);

        let materials: Vec<Material> = desc
            .materials
            .iter()
            .map(|material| upload_material(device, textures, fs, &desc.images, material, &sampler, &layout))
            .collect();

        let meshes = desc
            .meshes
            .iter()
            .map(|mesh| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} vertex buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} index buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                Mesh {
                    name: mesh.name.clone(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: mesh.indices.len() as u32,
                    material: mesh.material.min(materials.len().saturating_sub(1)),
                }
            })
            .collect::<Vec<_>>();

        info!(
            "scene {}: {} meshes, {} materials, {} nodes, {} lights",
            desc.path.display(),
            meshes.len(),
            materials.len(),
            desc.graph.len(),
            desc.graph.lights().len()
        );

        Self {
            path: desc.path,
            graph: desc.graph,
            meshes,
            materials,
            instance_buffer: None,
            batches: Vec::new(),
            loaded_frame: None,
        }
    }

    /// Propagate transforms and build the instance buffer.
    pub fn finished_loading(&mut self, device: &wgpu::Device, frame_index: u64) {
        self.graph.update_world_transforms();

        let mut instances: Vec<InstanceRaw> = Vec::new();
        self.batches.clear();
        for (mesh, worlds) in self.graph.mesh_instances() {
            if mesh >= self.meshes.len() {
                warn!("node references missing mesh {}", mesh);
                continue;
            }
            let (regular, flipped): (Vec<InstanceRaw>, Vec<InstanceRaw>) = worlds
                .iter()
                .map(InstanceRaw::from_world)
                .partition(|raw| raw.handedness >= 0.0);
            for (raws, mirrored) in [(regular, false), (flipped, true)] {
                if raws.is_empty() {
                    continue;
                }
                let start = instances.len() as u32;
                instances.extend(raws);
                self.batches.push(MeshBatch {
                    mesh,
                    instances: start..instances.len() as u32,
                    mirrored,
                });
            }
        }

        self.instance_buffer = if instances.is_empty() {
            warn!("scene {} has zero mesh instances", self.path.display());
            None
        } else {
            Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Instance Buffer"),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            }))
        };
        self.loaded_frame = Some(frame_index);
        info!(
            "scene {} ready at frame {} with {} instances",
            self.path.display(),
            frame_index,
            instances.len()
        );
    }

    pub fn is_ready(&self) -> bool {
        self.loaded_frame.is_some()
    }

    /// Frame index at which the scene finished loading.
    pub fn loaded_frame(&self) -> Option<u64> {
        self.loaded_frame
    }

    pub fn instance_buffer(&self) -> Option<&wgpu::Buffer> {
        self.instance_buffer.as_ref()
    }

    pub fn batches(&self) -> &[MeshBatch] {
        &self.batches
    }

    /// Punctual lights in world space.
    pub fn lights(&self) -> Vec<LightConstants> {
        self.graph
            .world_lights()
            .into_iter()
            .map(|(light, world)| LightConstants::from_desc(light, &world))
            .collect()
    }
}

fn upload_material(
    device: &wgpu::Device,
    textures: &TextureCache,
    fs: &dyn FileSystem,
    images: &[ImageSource],
    material: &MaterialDesc,
    sampler: &wgpu::Sampler,
    layout: &wgpu::BindGroupLayout,
) -> Material {
    let load = |image: Option<usize>, srgb: bool, fallback: Arc<Texture>| -> Arc<Texture> {
        let Some(index) = image else {
            return fallback;
        };
        let result = match images.get(index) {
            Some(ImageSource::File(path)) => textures.load_texture_from_file(fs, path, srgb),
            Some(ImageSource::Embedded {
                name,
                mime_type,
                bytes,
            }) => textures.load_texture_from_memory(bytes, name, mime_type.as_deref(), srgb),
            None => {
                warn!("material {} references missing image {}", material.name, index);
                return fallback;
            }
        };
        result.unwrap_or_else(|e| {
            warn!("{}, using a default texture for {}", e, material.name);
            fallback
        })
    };

    let material_textures = MaterialTextures {
        base_color: load(material.base_color_texture, true, textures.white()),
        metal_rough: load(material.metal_rough_texture, false, textures.white()),
        normal: load(material.normal_texture, false, textures.flat_normal()),
        emissive: load(material.emissive_texture, true, textures.white()),
    };
    let [er, eg, eb] = material.emissive_factor;
    let constants = MaterialConstants {
        base_color: material.base_color_factor,
        emissive: [er, eg, eb, 1.0],
        params: [
            material.metallic_factor,
            material.roughness_factor,
            material.alpha_cutoff,
            0.0,
        ],
    };
    Material::new(
        device,
        &material.name,
        material.alpha_mode,
        material.double_sided,
        constants,
        material_textures,
        sampler,
        layout,
    )
}
