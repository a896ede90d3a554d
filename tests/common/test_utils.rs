use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use base64::Engine;
use render_sandbox::vfs::{self, FileSystem, VfsError};

/// In-memory file system for loader tests.
#[derive(Default)]
pub(crate) struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub(crate) fn insert(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap()
            .insert(vfs::normalize(Path::new(path)), contents.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        self.files
            .lock()
            .unwrap()
            .get(&vfs::normalize(path))
            .cloned()
            .ok_or_else(|| VfsError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(&vfs::normalize(path))
    }
}

pub(crate) const TRIANGLE_POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// Positions followed by u16 indices, as stored in the test buffer.
pub(crate) fn triangle_buffer() -> Vec<u8> {
    let mut bytes: Vec<u8> = bytemuck::cast_slice(&TRIANGLE_POSITIONS).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&[0u16, 1, 2]));
    bytes
}

pub(crate) fn data_uri(bytes: &[u8]) -> String {
    format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// A glTF document with one triangle mesh used by two nodes and a point light.
///
/// Node 0 sits at (1, 0, 0) and has child node 1 at local (0, 2, 0) that
/// draws the mesh. Node 2 draws the mesh mirrored along x. Node 3 holds the
/// light at (0, 5, 0).
pub(crate) fn triangle_scene_gltf(buffer_uri: &str) -> String {
    format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "extensionsUsed": ["KHR_lights_punctual"],
  "extensions": {{
    "KHR_lights_punctual": {{
      "lights": [
        {{ "name": "lamp", "type": "point", "color": [1.0, 0.5, 0.25], "intensity": 3.0, "range": 10.0 }}
      ]
    }}
  }},
  "scene": 0,
  "scenes": [{{ "nodes": [0, 2, 3] }}],
  "nodes": [
    {{ "name": "parent", "translation": [1.0, 0.0, 0.0], "children": [1] }},
    {{ "name": "child", "translation": [0.0, 2.0, 0.0], "mesh": 0 }},
    {{ "name": "mirrored", "scale": [-1.0, 1.0, 1.0], "mesh": 0 }},
    {{ "name": "light", "translation": [0.0, 5.0, 0.0], "extensions": {{ "KHR_lights_punctual": {{ "light": 0 }} }} }}
  ],
  "meshes": [
    {{ "name": "triangle", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}
  ],
  "buffers": [{{ "byteLength": 42, "uri": "{buffer_uri}" }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ]
}}"#
    )
}

/// The triangle scene with a non-metallic material, so ambient light shows.
pub(crate) fn matte_triangle_scene_gltf(buffer_uri: &str) -> String {
    triangle_scene_gltf(buffer_uri)
        .replace(r#""indices": 1 }"#, r#""indices": 1, "material": 0 }"#)
        .replace(
            r#""meshes": ["#,
            r#""materials": [{ "name": "matte", "pbrMetallicRoughness": { "metallicFactor": 0.0 } }],
  "meshes": ["#,
        )
}

pub(crate) fn assert_vec3_eq(actual: [f32; 3], expected: [f32; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-5, "expected {:?}, got {:?}", expected, actual);
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) mod gpu {
    use std::path::{Path, PathBuf};

    use render_sandbox::{
        cli::DeviceCreationParameters, context::Context, shader_factory::ShaderFactory,
    };

    pub(crate) const TEST_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub(crate) fn shader_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders")
    }

    pub(crate) fn headless_context(width: u32, height: u32) -> Context {
        let params = DeviceCreationParameters {
            window_title: "test".to_string(),
            back_buffer_width: width,
            back_buffer_height: height,
            ..Default::default()
        };
        futures::executor::block_on(Context::new_headless(params, TEST_FORMAT))
            .expect("no adapter available for integration tests")
    }

    pub(crate) fn shader_factory(ctx: &Context) -> ShaderFactory {
        ShaderFactory::from_directory(ctx.device.clone(), shader_dir())
    }

    pub(crate) fn render_target(ctx: &Context) -> wgpu::Texture {
        let (width, height) = ctx.back_buffer_size();
        ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEST_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Copy an RGBA8 texture back to the CPU.
    pub(crate) fn read_back(ctx: &Context, texture: &wgpu::Texture) -> image::RgbaImage {
        let width = texture.width();
        let height = texture.height();
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        ctx.device.poll(wgpu::PollType::Wait).unwrap();
        futures::executor::block_on(rx.receive()).unwrap().unwrap();

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels).unwrap()
    }
}
