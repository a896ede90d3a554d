//! glTF 2.0 parsing into a GPU-free [`SceneDescription`].
//!
//! Both `.gltf` (with external or `data:` buffers) and binary `.glb` files are
//! accepted. Only triangle primitives are imported; everything else is skipped
//! with a warning.

use std::path::{Path, PathBuf};

use base64::Engine;
use log::warn;

use crate::{
    data_structures::{
        instance::Transform,
        light::{LightDesc, LightKind},
        model::{AlphaMode, ModelVertex},
        scene_graph::SceneGraph,
    },
    resources::mesh::{compute_normals, compute_tangents},
    scene::SceneError,
    vfs::FileSystem,
};

/// Where a texture's encoded image lives.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    /// A file next to the scene (already resolved against the scene directory).
    File(PathBuf),
    /// Image bytes stored in a buffer view or a `data:` URI.
    Embedded {
        /// `<scene path>#image<index>`, followed by the authored name if any.
        name: String,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metal_rough_texture: Option<usize>,
    pub normal_texture: Option<usize>,
    pub emissive_factor: [f32; 3],
    pub emissive_texture: Option<usize>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        // glTF defaults for a material without any properties.
        Self {
            name: "default".to_string(),
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metal_rough_texture: None,
            normal_texture: None,
            emissive_factor: [0.0; 3],
            emissive_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MeshDesc {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: usize,
}

/// Everything needed to build a [`crate::scene::Scene`] on the GPU.
#[derive(Clone, Debug, Default)]
pub struct SceneDescription {
    pub path: PathBuf,
    pub images: Vec<ImageSource>,
    pub materials: Vec<MaterialDesc>,
    pub meshes: Vec<MeshDesc>,
    pub graph: SceneGraph,
}

pub fn parse_gltf(fs: &dyn FileSystem, path: &Path) -> Result<SceneDescription, SceneError> {
    let bytes = fs.read_file(path)?;
    let gltf = ::gltf::Gltf::from_slice(&bytes).map_err(|source| SceneError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or(Path::new(""));

    let buffers = load_buffers(fs, path, base, &gltf)?;
    let images = gltf
        .images()
        .map(|image| load_image_source(path, base, &buffers, image))
        .collect::<Result<Vec<_>, _>>()?;

    let mut materials: Vec<MaterialDesc> = gltf.materials().map(to_material_desc).collect();
    let default_material = materials.len();
    let mut needs_default_material = false;

    let mut meshes = Vec::new();
    // glTF mesh index -> indices of our meshes (one per primitive)
    let mut primitive_map: Vec<Vec<usize>> = Vec::new();
    for mesh in gltf.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let material = match primitive.material().index() {
                Some(idx) => idx,
                None => {
                    needs_default_material = true;
                    default_material
                }
            };
            match read_primitive(&mesh, &primitive, &buffers, material) {
                Some(desc) => {
                    primitives.push(meshes.len());
                    meshes.push(desc);
                }
                None => warn!(
                    "skipping primitive {} of mesh {:?} in {}",
                    primitive.index(),
                    mesh.name(),
                    path.display()
                ),
            }
        }
        primitive_map.push(primitives);
    }
    if needs_default_material {
        materials.push(MaterialDesc::default());
    }

    let mut graph = SceneGraph::new();
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| SceneError::NoScene(path.to_path_buf()))?;
    for node in scene.nodes() {
        add_node(&mut graph, None, &node, &primitive_map);
    }
    graph.update_world_transforms();

    Ok(SceneDescription {
        path: path.to_path_buf(),
        images,
        materials,
        meshes,
        graph,
    })
}

fn add_node(
    graph: &mut SceneGraph,
    parent: Option<usize>,
    node: &::gltf::Node,
    primitive_map: &[Vec<usize>],
) {
    let local = Transform::from_decomposed(node.transform().decomposed());
    let idx = graph.add_node(parent, local);
    if let Some(slot) = graph.node_mut(idx) {
        slot.name = node.name().map(str::to_string);
        if let Some(mesh) = node.mesh() {
            slot.meshes = primitive_map.get(mesh.index()).cloned().unwrap_or_default();
        }
    }
    if let Some(light) = node.light() {
        graph.attach_light(idx, to_light_desc(&light));
    }
    for child in node.children() {
        add_node(graph, Some(idx), &child, primitive_map);
    }
}

fn load_buffers(
    fs: &dyn FileSystem,
    path: &Path,
    base: &Path,
    gltf: &::gltf::Gltf,
) -> Result<Vec<Vec<u8>>, SceneError> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            ::gltf::buffer::Source::Bin => gltf.blob.clone().ok_or(SceneError::MissingBuffer {
                path: path.to_path_buf(),
                index: buffer.index(),
            })?,
            ::gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri)? {
                Some((_, bytes)) => bytes,
                None => fs.read_file(&base.join(percent_decode(uri)))?,
            },
        };
        if data.len() < buffer.length() {
            return Err(SceneError::MissingBuffer {
                path: path.to_path_buf(),
                index: buffer.index(),
            });
        }
        buffer_data.push(data);
    }
    Ok(buffer_data)
}

fn load_image_source(
    path: &Path,
    base: &Path,
    buffers: &[Vec<u8>],
    image: ::gltf::Image,
) -> Result<ImageSource, SceneError> {
    let key = format!("{}#image{}", path.display(), image.index());
    let name = match image.name() {
        Some(label) => format!("{} ({})", key, label),
        None => key,
    };
    match image.source() {
        ::gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let end = start + view.length();
            let bytes = buffers
                .get(view.buffer().index())
                .and_then(|buffer| buffer.get(start..end))
                .ok_or_else(|| SceneError::MissingBuffer {
                    path: path.to_path_buf(),
                    index: view.buffer().index(),
                })?;
            Ok(ImageSource::Embedded {
                name,
                mime_type: Some(mime_type.to_string()),
                bytes: bytes.to_vec(),
            })
        }
        ::gltf::image::Source::Uri { uri, mime_type } => match decode_data_uri(uri)? {
            Some((data_mime, bytes)) => Ok(ImageSource::Embedded {
                name,
                mime_type: mime_type.map(str::to_string).or(data_mime),
                bytes,
            }),
            None => Ok(ImageSource::File(base.join(percent_decode(uri)))),
        },
    }
}

fn to_material_desc(material: ::gltf::Material) -> MaterialDesc {
    let pbr = material.pbr_metallic_roughness();
    let image_index = |info: Option<::gltf::texture::Info>| info.map(|info| info.texture().source().index());
    MaterialDesc {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material{}", material.index().unwrap_or_default())),
        base_color_factor: pbr.base_color_factor(),
        base_color_texture: image_index(pbr.base_color_texture()),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        metal_rough_texture: image_index(pbr.metallic_roughness_texture()),
        normal_texture: material
            .normal_texture()
            .map(|normal| normal.texture().source().index()),
        emissive_factor: material.emissive_factor(),
        emissive_texture: image_index(material.emissive_texture()),
        alpha_mode: match material.alpha_mode() {
            ::gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            ::gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            ::gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
        double_sided: material.double_sided(),
    }
}

fn to_light_desc(light: &::gltf::khr_lights_punctual::Light) -> LightDesc {
    let kind = match light.kind() {
        ::gltf::khr_lights_punctual::Kind::Directional => LightKind::Directional,
        ::gltf::khr_lights_punctual::Kind::Point => LightKind::Point,
        ::gltf::khr_lights_punctual::Kind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => LightKind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        },
    };
    LightDesc {
        name: light.name().map(str::to_string),
        kind,
        color: light.color(),
        intensity: light.intensity(),
        range: light.range().unwrap_or(0.0),
    }
}

fn read_primitive(
    mesh: &::gltf::Mesh,
    primitive: &::gltf::Primitive,
    buffers: &[Vec<u8>],
    material: usize,
) -> Option<MeshDesc> {
    if primitive.mode() != ::gltf::mesh::Mode::Triangles {
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()?
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    match reader.read_normals() {
        Some(normals) => vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal),
        None => compute_normals(&mut vertices, &indices),
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, uv)| vertex.tex_coords = uv);
    }
    match reader.read_tangents() {
        Some(tangents) => vertices.iter_mut().zip(tangents).for_each(|(vertex, tangent)| {
            // glTF tangents are vec4, w holds the bitangent sign
            let tangent: cgmath::Vector4<f32> = tangent.into();
            let normal: cgmath::Vector3<f32> = vertex.normal.into();
            vertex.tangent = tangent.truncate().into();
            vertex.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
        }),
        None => compute_tangents(&mut vertices, &indices),
    }

    Some(MeshDesc {
        name: mesh
            .name()
            .map(|name| format!("{}#{}", name, primitive.index()))
            .unwrap_or_else(|| format!("mesh{}#{}", mesh.index(), primitive.index())),
        vertices,
        indices,
        material,
    })
}

/// Decode a base64 `data:` URI. Returns `None` for ordinary URIs.
pub fn decode_data_uri(uri: &str) -> Result<Option<(Option<String>, Vec<u8>)>, SceneError> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Ok(None);
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SceneError::UnsupportedUri(truncate_uri(uri)))?;
    let Some(mime) = header.strip_suffix(";base64") else {
        return Err(SceneError::UnsupportedUri(truncate_uri(uri)));
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| SceneError::UnsupportedUri(truncate_uri(uri)))?;
    let mime = (!mime.is_empty()).then(|| mime.to_string());
    Ok(Some((mime, bytes)))
}

fn truncate_uri(uri: &str) -> String {
    uri.chars().take(48).collect()
}

/// Undo `%XX` escapes in relative URIs (e.g. `%20` for spaces).
pub fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
