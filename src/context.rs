use std::sync::Arc;

use anyhow::Context as _;
use instant::Duration;
use winit::window::Window;

use crate::cli::{DeviceCreationParameters, backend_name};

/// A color attachment together with the format pipelines must target.
#[derive(Debug, Clone, Copy)]
pub struct ColorTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

/// The set of attachments a pass draws into.
#[derive(Debug, Clone)]
pub struct Framebuffer<'a> {
    pub color: Vec<ColorTarget<'a>>,
    pub depth: Option<&'a wgpu::TextureView>,
    pub width: u32,
    pub height: u32,
}

impl<'a> Framebuffer<'a> {
    pub fn color_formats(&self) -> Vec<wgpu::TextureFormat> {
        self.color.iter().map(|target| target.format).collect()
    }
}

/// Averages frame times over fixed windows so the displayed rate stays readable.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    interval: Duration,
    accumulated: Duration,
    frames: u32,
    average: Option<Duration>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl FrameTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
            frames: 0,
            average: None,
        }
    }

    pub fn tick(&mut self, dt: Duration) {
        self.accumulated += dt;
        self.frames += 1;
        if self.accumulated >= self.interval {
            self.average = Some(self.accumulated / self.frames);
            self.accumulated = Duration::ZERO;
            self.frames = 0;
        }
    }

    /// `None` until the first averaging window completed.
    pub fn average_frame_time(&self) -> Option<Duration> {
        self.average
    }

    pub fn fps(&self) -> Option<f64> {
        self.average
            .filter(|average| !average.is_zero())
            .map(|average| 1.0 / average.as_secs_f64())
    }
}

pub fn informative_title(title: &str, api: &str, fps: Option<f64>) -> String {
    match fps {
        Some(fps) => format!("{} ({}, {:.1} FPS)", title, api, fps),
        None => format!("{} ({})", title, api),
    }
}

/// Owns the GPU device and, when running windowed, the window and its surface.
#[derive(Debug)]
pub struct Context {
    pub window: Option<Arc<Window>>,
    pub surface: Option<wgpu::Surface<'static>>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub params: DeviceCreationParameters,
    pub frame_timer: FrameTimer,
    frame_index: u64,
}

impl Context {
    pub async fn new(window: Arc<Window>, params: DeviceCreationParameters) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = create_instance(&params);
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create a surface for the window")?;
        let (adapter, device, queue) = request_device(&instance, Some(&surface), &params).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear color and rely on an sRGB surface for encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no supported formats")?;
        let present_mode = if params.vsync_enabled {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "created {} device on {} ({}x{}, {:?})",
            backend_name(adapter.get_info().backend),
            adapter.get_info().name,
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            window: Some(window),
            surface: Some(surface),
            adapter,
            device,
            queue,
            config,
            params,
            frame_timer: FrameTimer::default(),
            frame_index: 0,
        })
    }

    /// A device without window or surface. The back buffer description uses
    /// `format` and the size from `params`, so passes can be driven offscreen.
    pub async fn new_headless(
        params: DeviceCreationParameters,
        format: wgpu::TextureFormat,
    ) -> anyhow::Result<Self> {
        let instance = create_instance(&params);
        let (adapter, device, queue) = request_device(&instance, None, &params).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format,
            width: params.back_buffer_width.max(1),
            height: params.back_buffer_height.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self {
            window: None,
            surface: None,
            adapter,
            device,
            queue,
            config,
            params,
            frame_timer: FrameTimer::default(),
            frame_index: 0,
        })
    }

    /// Reconfigure the surface. Zero sizes (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
        true
    }

    pub fn back_buffer_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn back_buffer_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn api_name(&self) -> &'static str {
        backend_name(self.adapter.get_info().backend)
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Called once a frame has been submitted and presented.
    pub fn end_frame(&mut self) {
        self.frame_index += 1;
    }

    pub fn set_informative_window_title(&self, title: &str) {
        let title = informative_title(title, self.api_name(), self.frame_timer.fps());
        if let Some(window) = &self.window {
            window.set_title(&title);
        }
    }

    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn create_instance(params: &DeviceCreationParameters) -> wgpu::Instance {
    let flags = if params.enable_debug_runtime {
        wgpu::InstanceFlags::debugging()
    } else {
        wgpu::InstanceFlags::default()
    };
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: params.api.backends(),
        flags,
        ..Default::default()
    })
}

async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
    params: &DeviceCreationParameters,
) -> anyhow::Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .with_context(|| format!("no {} adapter is available", params.api.name()))?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("render-sandbox device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create the device")?;
    device.on_uncaptured_error(Box::new(|error| {
        log::error!("wgpu error: {}", error);
    }));
    Ok((adapter, device, queue))
}
