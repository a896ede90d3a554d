use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use image::{ImageFormat, load_from_memory_with_format};

use crate::{
    data_structures::texture::Texture,
    vfs::{FileSystem, VfsError},
};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error("failed to decode texture {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/**
 * Loads textures once and hands out shared references.
 *
 * Textures are keyed by their source name (file path or embedded image name)
 * and colour space, so the same image used as sRGB base colour and as linear
 * data ends up as two GPU textures.
 */
pub struct TextureCache {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Mutex<HashMap<(String, bool), Arc<Texture>>>,
    white: Arc<Texture>,
    black: Arc<Texture>,
    flat_normal: Arc<Texture>,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = Texture::create_solid(
            device,
            queue,
            [255; 4],
            wgpu::TextureFormat::Rgba8UnormSrgb,
            "white texture",
        );
        let black = Texture::create_solid(
            device,
            queue,
            [0, 0, 0, 255],
            wgpu::TextureFormat::Rgba8UnormSrgb,
            "black texture",
        );
        let flat_normal = Texture::create_default_normal_map(device, queue);
        Self {
            device: device.clone(),
            queue: queue.clone(),
            textures: Mutex::new(HashMap::new()),
            white: Arc::new(white),
            black: Arc::new(black),
            flat_normal: Arc::new(flat_normal),
        }
    }

    pub fn white(&self) -> Arc<Texture> {
        self.white.clone()
    }

    pub fn black(&self) -> Arc<Texture> {
        self.black.clone()
    }

    pub fn flat_normal(&self) -> Arc<Texture> {
        self.flat_normal.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, bool), Arc<Texture>>> {
        self.textures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn load_texture_from_file(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        srgb: bool,
    ) -> Result<Arc<Texture>, TextureError> {
        let name = path.to_string_lossy().into_owned();
        if let Some(texture) = self.lock().get(&(name.clone(), srgb)) {
            return Ok(texture.clone());
        }
        let bytes = fs.read_file(path)?;
        let format = path
            .extension()
            .and_then(|ext| ImageFormat::from_extension(ext));
        self.insert(name, &bytes, format, srgb)
    }

    /// Decode an image embedded in a scene file. `mime_type` hints the format.
    pub fn load_texture_from_memory(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: Option<&str>,
        srgb: bool,
    ) -> Result<Arc<Texture>, TextureError> {
        if let Some(texture) = self.lock().get(&(name.to_string(), srgb)) {
            return Ok(texture.clone());
        }
        let format = mime_type.and_then(ImageFormat::from_mime_type);
        self.insert(name.to_string(), bytes, format, srgb)
    }

    fn insert(
        &self,
        name: String,
        bytes: &[u8],
        format: Option<ImageFormat>,
        srgb: bool,
    ) -> Result<Arc<Texture>, TextureError> {
        let img = match format {
            Some(format) => load_from_memory_with_format(bytes, format)
                .or_else(|_| image::load_from_memory(bytes)),
            None => image::load_from_memory(bytes),
        }
        .map_err(|source| TextureError::Decode {
            name: name.clone(),
            source,
        })?;
        let texture = Arc::new(Texture::from_image(
            &self.device,
            &self.queue,
            &img,
            Some(&name),
            srgb,
        ));
        log::debug!("loaded texture {} ({}x{})", name, texture.width(), texture.height());
        self.lock().insert((name, srgb), texture.clone());
        Ok(texture)
    }
}
