use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use cgmath::{Point3, Rad, Vector3};
use clap::Parser;
use render_sandbox::{
    app::ApplicationBase,
    camera::{FirstPersonCamera, persp_proj_reverse},
    cli::{Args, DeviceCreationParameters},
    context::{Context, Framebuffer},
    flow::{self, GraphicsFlow},
    pipelines::forward::{ForwardShadingPass, ForwardShadingPassParams},
    render::{InstancedOpaqueDrawStrategy, render_composite_view},
    render_targets::ForwardRenderTargets,
    shader_factory::ShaderFactory,
    vfs::NativeFileSystem,
    view::{PlanarView, Viewport},
};
use winit::{event::MouseButton, keyboard::KeyCode};

const WINDOW_TITLE: &str = "Forward Shading Example";

struct ForwardRenderer {
    app: ApplicationBase,
    camera: FirstPersonCamera,
    view: PlanarView,
    forward_pass: ForwardShadingPass,
    strategy: InstancedOpaqueDrawStrategy,
    render_targets: Option<ForwardRenderTargets>,
}

impl ForwardRenderer {
    fn new(ctx: &Context, shader_dir: PathBuf, scene_path: PathBuf, async_load: bool) -> anyhow::Result<Self> {
        let shader_factory = ShaderFactory::from_directory(ctx.device.clone(), shader_dir);
        let mut app = ApplicationBase::new(ctx, &shader_factory)?;
        app.set_asynchronous_loading_enabled(async_load);
        app.begin_loading_scene(Arc::new(NativeFileSystem), &scene_path)
            .with_context(|| format!("failed to load {}", scene_path.display()))?;

        let mut camera = FirstPersonCamera::new();
        camera.look_at(Point3::new(0.0, 1.8, 0.0), Point3::new(1.0, 1.8, 0.0));
        camera.set_move_speed(3.0);

        let forward_pass = ForwardShadingPass::new(
            &ctx.device,
            &shader_factory,
            ForwardShadingPassParams {
                color_format: ForwardRenderTargets::COLOR_FORMAT,
                sample_count: 1,
                reverse_depth: true,
            },
        )?;

        Ok(Self {
            app,
            camera,
            view: PlanarView::new(),
            forward_pass,
            strategy: InstancedOpaqueDrawStrategy,
            render_targets: None,
        })
    }
}

impl GraphicsFlow for ForwardRenderer {
    fn keyboard_update(&mut self, key: KeyCode, pressed: bool) -> bool {
        self.camera.keyboard_update(key, pressed)
    }

    fn mouse_pos_update(&mut self, x: f64, y: f64) -> bool {
        self.camera.mouse_pos_update(x, y)
    }

    fn mouse_button_update(&mut self, button: MouseButton, pressed: bool) -> bool {
        self.camera.mouse_button_update(button, pressed)
    }

    fn animate(&mut self, ctx: &Context, dt: instant::Duration) {
        self.camera.animate(dt.as_secs_f32());
        ctx.set_informative_window_title(WINDOW_TITLE);
    }

    fn back_buffer_resizing(&mut self, _ctx: &Context) {
        self.render_targets = None;
        self.forward_pass.reset_binding_cache();
        self.app.reset_binding_cache();
    }

    fn render(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        back_buffer: &Framebuffer,
    ) -> anyhow::Result<()> {
        self.app.poll_scene_loading(ctx)?;
        if self.app.scene().is_none() {
            return Ok(());
        }
        let target = back_buffer.color.first().context("no back buffer to draw into")?;
        let size = [back_buffer.width, back_buffer.height];

        if self.render_targets.as_ref().map(|t| t.size()) != Some(size) {
            self.render_targets = Some(ForwardRenderTargets::new(&ctx.device, size, 1, true));
            self.forward_pass.reset_binding_cache();
            self.app.reset_binding_cache();
        }
        let (Some(targets), Some(scene)) = (&self.render_targets, self.app.scene()) else {
            return Ok(());
        };

        let width = size[0] as f32;
        let height = size[1] as f32;
        self.view.set_viewport(Viewport::new(width, height));
        self.view.set_matrices(
            self.camera.world_to_view(),
            persp_proj_reverse(Rad(std::f32::consts::FRAC_PI_4), width / height, 0.1),
        );
        self.view.update_cache();

        targets.clear(encoder);
        self.forward_pass.prepare_lights(
            &ctx.queue,
            &scene.lights(),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.3, 0.3, 0.3),
        );
        render_composite_view(
            encoder,
            &ctx.queue,
            &self.view,
            &targets.framebuffer(),
            scene,
            &mut self.strategy,
            &mut self.forward_pass,
            "Forward Opaque",
        );

        self.app.blit(encoder, target, &targets.color);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let params = DeviceCreationParameters::from_args(&args, WINDOW_TITLE, Some((1024, 1024)));
    let shader_dir = args.shader_dir();
    let scene_path = args.scene_path();
    let async_load = args.async_load;
    flow::run(
        params,
        vec![Box::new(move |ctx: &Context| {
            Ok(Box::new(ForwardRenderer::new(ctx, shader_dir, scene_path, async_load)?) as Box<dyn GraphicsFlow>)
        })],
    )
}
