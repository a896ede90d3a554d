//! Render-pass interface and the window event loop that drives it.
//!
//! A sample is a stack of [`GraphicsFlow`]s owned by the [`DeviceManager`].
//! Every frame the manager:
//! 1. Sends input to the flows back-to-front until one consumes it
//! 2. Calls `animate` on every flow
//! 3. Opens a command encoder and calls `render` on every flow front-to-back
//! 4. Submits the encoder and presents the back buffer
//!
//! Resizes call `back_buffer_resizing` on every flow, reconfigure the surface
//! and then call `back_buffer_resized`.

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    cli::DeviceCreationParameters,
    context::{ColorTarget, Context, Framebuffer},
};

/// A render pass in the device manager's list.
///
/// The input hooks return `true` when they consumed the event, which stops it
/// from reaching the flows in front of this one.
pub trait GraphicsFlow {
    fn animate(&mut self, _ctx: &Context, _dt: Duration) {}

    fn render(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        back_buffer: &Framebuffer,
    ) -> anyhow::Result<()>;

    fn back_buffer_resizing(&mut self, _ctx: &Context) {}

    fn back_buffer_resized(&mut self, _ctx: &Context, _width: u32, _height: u32, _sample_count: u32) {}

    fn keyboard_update(&mut self, _key: KeyCode, _pressed: bool) -> bool {
        false
    }

    fn mouse_pos_update(&mut self, _x: f64, _y: f64) -> bool {
        false
    }

    fn mouse_button_update(&mut self, _button: MouseButton, _pressed: bool) -> bool {
        false
    }

    fn mouse_scroll_update(&mut self, _dx: f64, _dy: f64) -> bool {
        false
    }
}

/// Builds a flow once the device exists. Errors abort start-up.
pub type FlowConstructor = Box<dyn FnOnce(&Context) -> anyhow::Result<Box<dyn GraphicsFlow>>>;

/// Ordered list of render passes.
#[derive(Default)]
pub struct FlowStack {
    flows: Vec<Box<dyn GraphicsFlow>>,
}

impl FlowStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_render_pass_to_back(&mut self, flow: Box<dyn GraphicsFlow>) {
        self.flows.push(flow);
    }

    pub fn add_render_pass_to_front(&mut self, flow: Box<dyn GraphicsFlow>) {
        self.flows.insert(0, flow);
    }

    pub fn remove_render_pass(&mut self, index: usize) -> Option<Box<dyn GraphicsFlow>> {
        (index < self.flows.len()).then(|| self.flows.remove(index))
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Offer an input event back-to-front. Returns whether a flow consumed it.
    pub fn dispatch(&mut self, mut handler: impl FnMut(&mut dyn GraphicsFlow) -> bool) -> bool {
        self.flows.iter_mut().rev().any(|flow| handler(flow.as_mut()))
    }

    pub fn animate(&mut self, ctx: &Context, dt: Duration) {
        self.flows.iter_mut().for_each(|flow| flow.animate(ctx, dt));
    }

    pub fn render(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        back_buffer: &Framebuffer,
    ) -> anyhow::Result<()> {
        for flow in self.flows.iter_mut() {
            flow.render(ctx, encoder, back_buffer)?;
        }
        Ok(())
    }

    pub fn back_buffer_resizing(&mut self, ctx: &Context) {
        self.flows.iter_mut().for_each(|flow| flow.back_buffer_resizing(ctx));
    }

    pub fn back_buffer_resized(&mut self, ctx: &Context, width: u32, height: u32, sample_count: u32) {
        self.flows
            .iter_mut()
            .for_each(|flow| flow.back_buffer_resized(ctx, width, height, sample_count));
    }
}

/// Render one frame of `flows` into an offscreen target of the context's
/// back-buffer format and size. Used by tests and tools without a window.
pub fn render_offscreen(ctx: &mut Context, flows: &mut FlowStack, target: &wgpu::TextureView) -> anyhow::Result<()> {
    let (width, height) = ctx.back_buffer_size();
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Offscreen Encoder"),
        });
    let back_buffer = Framebuffer {
        color: vec![ColorTarget {
            view: target,
            format: ctx.back_buffer_format(),
        }],
        depth: None,
        width,
        height,
    };
    flows.render(ctx, &mut encoder, &back_buffer)?;
    ctx.queue.submit(std::iter::once(encoder.finish()));
    ctx.end_frame();
    Ok(())
}

/// Owns the window, the GPU context and the flows. Created by [`run`].
pub struct DeviceManager {
    async_runtime: tokio::runtime::Runtime,
    params: DeviceCreationParameters,
    ctx: Option<Context>,
    flows: FlowStack,
    // Taken once the window exists
    constructors: Option<Vec<FlowConstructor>>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl DeviceManager {
    pub fn new(params: DeviceCreationParameters) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            params,
            ctx: None,
            flows: FlowStack::new(),
            constructors: Some(Vec::new()),
            last_time: Instant::now(),
            error: None,
        })
    }

    /// Queue a render pass. It is constructed once the device exists.
    pub fn add_render_pass_to_back(&mut self, constructor: FlowConstructor) {
        match &mut self.constructors {
            Some(constructors) => constructors.push(constructor),
            None => log::warn!("render passes can only be added before the message loop starts"),
        }
    }

    pub fn remove_render_pass(&mut self, index: usize) -> Option<Box<dyn GraphicsFlow>> {
        self.flows.remove_render_pass(index)
    }

    pub fn run_message_loop(mut self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(self.params.window_title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.params.back_buffer_width,
                self.params.back_buffer_height,
            ));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let ctx = self
            .async_runtime
            .block_on(Context::new(window, self.params.clone()))?;

        // Flows may spawn background work during construction
        let _guard = self.async_runtime.enter();
        for constructor in self.constructors.take().unwrap_or_default() {
            let flow = constructor(&ctx)?;
            self.flows.add_render_pass_to_back(flow);
        }
        let (width, height) = ctx.back_buffer_size();
        self.flows
            .back_buffer_resized(&ctx, width, height, self.params.swap_chain_sample_count);
        log::info!("initialized {} render passes", self.flows.len());
        ctx.request_redraw();
        self.ctx = Some(ctx);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(ctx) = &mut self.ctx else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        self.flows.back_buffer_resizing(ctx);
        ctx.resize(width, height);
        self.flows
            .back_buffer_resized(ctx, width, height, self.params.swap_chain_sample_count);
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let Some(ctx) = &mut self.ctx else {
            return Ok(());
        };
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        ctx.frame_timer.tick(dt);

        {
            let _guard = self.async_runtime.enter();
            self.flows.animate(ctx, dt);
        }

        let Some(surface) = &ctx.surface else {
            return Ok(());
        };
        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = ctx.back_buffer_size();
                log::warn!("surface lost or outdated, reconfiguring");
                self.resize(width, height);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring the back buffer, skipping frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("out of memory while acquiring the back buffer");
            }
            Err(e) => {
                log::error!("unable to acquire the back buffer: {}", e);
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        let (width, height) = ctx.back_buffer_size();
        let back_buffer = Framebuffer {
            color: vec![ColorTarget {
                view: &view,
                format: ctx.back_buffer_format(),
            }],
            depth: None,
            width,
            height,
        };
        self.flows.render(ctx, &mut encoder, &back_buffer)?;
        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        ctx.end_frame();
        Ok(())
    }
}

impl ApplicationHandler for DeviceManager {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.ctx.is_none() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(KeyCode::Escape) = event.physical_key {
                    event_loop.exit();
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    self.flows.dispatch(|flow| flow.keyboard_update(key, pressed));
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.flows
                    .dispatch(|flow| flow.mouse_pos_update(position.x, position.y));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state.is_pressed();
                self.flows
                    .dispatch(|flow| flow.mouse_button_update(button, pressed));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
                    MouseScrollDelta::PixelDelta(pos) => (pos.x, pos.y),
                };
                self.flows.dispatch(|flow| flow.mouse_scroll_update(dx, dy));
            }
            WindowEvent::RedrawRequested => {
                match self.render_frame() {
                    Ok(()) => {
                        if let Some(ctx) = &self.ctx {
                            ctx.request_redraw();
                        }
                    }
                    Err(e) => self.fail(event_loop, e),
                }
            }
            _ => {}
        }
    }
}

/// Initialize logging, open the window and run until it closes.
pub fn run(params: DeviceCreationParameters, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let mut manager = DeviceManager::new(params)?;
    for constructor in constructors {
        manager.add_render_pass_to_back(constructor);
    }
    manager.run_message_loop()
}
