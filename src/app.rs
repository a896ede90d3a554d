//! Shared state for samples that render a glTF scene.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::oneshot;

use crate::{
    binding_cache::BindingCache,
    context::{ColorTarget, Context},
    data_structures::texture::Texture,
    pipelines::common::CommonRenderPasses,
    resources::texture::TextureCache,
    scene::{Scene, SceneError},
    shader_factory::{ShaderError, ShaderFactory},
    vfs::FileSystem,
};

type SceneResult = Result<Scene, SceneError>;

enum LoadState {
    Idle,
    /// Loaded synchronously, waiting for the next poll to be installed.
    Loaded(Box<Scene>),
    Pending(oneshot::Receiver<SceneResult>),
}

pub struct ApplicationBase {
    device: wgpu::Device,
    texture_cache: Arc<TextureCache>,
    common_passes: CommonRenderPasses,
    blit_cache: BindingCache<u64>,
    async_loading: bool,
    load_state: LoadState,
    scene: Option<Scene>,
    scene_path: Option<PathBuf>,
}

impl ApplicationBase {
    pub fn new(ctx: &Context, shader_factory: &ShaderFactory) -> Result<Self, ShaderError> {
        Ok(Self {
            device: ctx.device.clone(),
            texture_cache: Arc::new(TextureCache::new(&ctx.device, &ctx.queue)),
            common_passes: CommonRenderPasses::new(&ctx.device, shader_factory)?,
            blit_cache: BindingCache::new(),
            async_loading: false,
            load_state: LoadState::Idle,
            scene: None,
            scene_path: None,
        })
    }

    pub fn set_asynchronous_loading_enabled(&mut self, enabled: bool) {
        self.async_loading = enabled;
    }

    pub fn is_asynchronous_loading_enabled(&self) -> bool {
        self.async_loading
    }

    pub fn texture_cache(&self) -> &Arc<TextureCache> {
        &self.texture_cache
    }

    pub fn common_passes(&mut self) -> &mut CommonRenderPasses {
        &mut self.common_passes
    }

    pub fn scene_path(&self) -> Option<&Path> {
        self.scene_path.as_deref()
    }

    /// Start loading `path`. Synchronous loads report errors right away,
    /// background loads report them from [`ApplicationBase::poll_scene_loading`].
    pub fn begin_loading_scene(&mut self, fs: Arc<dyn FileSystem>, path: &Path) -> Result<(), SceneError> {
        self.scene = None;
        self.scene_path = Some(path.to_path_buf());

        if !self.async_loading {
            let scene = Scene::load(&self.device, &self.texture_cache, fs.as_ref(), path)?;
            self.load_state = LoadState::Loaded(Box::new(scene));
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        let device = self.device.clone();
        let textures = self.texture_cache.clone();
        let path = path.to_path_buf();
        let load = move || {
            let result = Scene::load(&device, &textures, fs.as_ref(), &path);
            // The receiver is gone when the sample shut down mid-load
            let _ = tx.send(result);
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(load);
            }
            Err(_) => {
                log::warn!("no async runtime available, loading the scene on a plain thread");
                std::thread::spawn(load);
            }
        }
        self.load_state = LoadState::Pending(rx);
        Ok(())
    }

    /// Install a finished scene. Returns `true` on the frame the scene became ready.
    pub fn poll_scene_loading(&mut self, ctx: &Context) -> Result<bool, SceneError> {
        let scene = match std::mem::replace(&mut self.load_state, LoadState::Idle) {
            LoadState::Idle => return Ok(false),
            LoadState::Loaded(scene) => *scene,
            LoadState::Pending(mut rx) => match rx.try_recv() {
                Ok(result) => result?,
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.load_state = LoadState::Pending(rx);
                    return Ok(false);
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    return Err(SceneError::Interrupted(
                        "the loading task ended without a result".to_string(),
                    ));
                }
            },
        };
        let mut scene = scene;
        scene.finished_loading(&ctx.device, ctx.frame_index());
        self.scene = Some(scene);
        Ok(true)
    }

    pub fn is_scene_loading(&self) -> bool {
        !matches!(self.load_state, LoadState::Idle)
    }

    /// The scene, once it finished loading.
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn blit(&mut self, encoder: &mut wgpu::CommandEncoder, target: &ColorTarget, source: &Texture) {
        self.common_passes
            .blit_texture(encoder, target, source, &mut self.blit_cache);
    }

    /// Drop bindings that reference render targets.
    pub fn reset_binding_cache(&mut self) {
        self.blit_cache.clear();
    }
}
