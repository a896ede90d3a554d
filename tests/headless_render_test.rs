#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod support {
    use std::{path::Path, sync::Arc};

    use render_sandbox::{app::ApplicationBase, context::Context};

    use crate::common::test_utils::{MemoryFileSystem, data_uri, gpu, matte_triangle_scene_gltf, triangle_buffer};

    pub(crate) const SIZE: u32 = 64;

    pub(crate) fn scene_app(ctx: &Context, async_load: bool) -> ApplicationBase {
        let fs = MemoryFileSystem::new().with_file(
            "/scenes/triangle.gltf",
            matte_triangle_scene_gltf(&data_uri(&triangle_buffer())),
        );
        let mut app = ApplicationBase::new(ctx, &gpu::shader_factory(ctx)).unwrap();
        app.set_asynchronous_loading_enabled(async_load);
        app.begin_loading_scene(Arc::new(fs), Path::new("/scenes/triangle.gltf"))
            .unwrap();
        app
    }

    pub(crate) fn pixel_is_lit(image: &image::RgbaImage, x: u32, y: u32) -> bool {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        r > 0 || g > 0 || b > 0
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_triangle_offscreen() {
    use render_sandbox::{
        context::{Context, Framebuffer},
        flow::{FlowStack, GraphicsFlow, render_offscreen},
        pipelines::basic::{mk_pipeline_layout, mk_render_pipeline},
        shader_factory::ShaderStage,
    };

    use crate::common::test_utils::gpu;

    struct Triangle(wgpu::RenderPipeline);

    impl GraphicsFlow for Triangle {
        fn render(
            &mut self,
            _ctx: &Context,
            encoder: &mut wgpu::CommandEncoder,
            back_buffer: &Framebuffer,
        ) -> anyhow::Result<()> {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("test triangle"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: back_buffer.color[0].view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.0);
            pass.draw(0..3, 0..1);
            Ok(())
        }
    }

    let mut ctx = gpu::headless_context(support::SIZE, support::SIZE);
    let factory = gpu::shader_factory(&ctx);
    let vs = factory
        .create_shader("triangle/shaders.wgsl", "main_vs", ShaderStage::Vertex)
        .unwrap();
    let ps = factory
        .create_shader("triangle/shaders.wgsl", "main_ps", ShaderStage::Fragment)
        .unwrap();
    let layout = mk_pipeline_layout(&ctx.device, "test triangle layout", &[]);
    let pipeline = mk_render_pipeline(
        &ctx.device,
        "test triangle",
        &layout,
        &vs,
        &ps,
        &[],
        &[gpu::TEST_FORMAT],
        None,
        None,
        None,
        1,
    );

    let mut flows = FlowStack::new();
    flows.add_render_pass_to_back(Box::new(Triangle(pipeline)));
    let target = gpu::render_target(&ctx);
    let view = target.create_view(&Default::default());
    render_offscreen(&mut ctx, &mut flows, &view).unwrap();
    assert_eq!(ctx.frame_index(), 1);

    let image = gpu::read_back(&ctx, &target);
    assert_eq!(image.get_pixel(32, 32).0[3], 255);
    assert!(support::pixel_is_lit(&image, 32, 32));
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(image.get_pixel(63, 0).0, [0, 0, 0, 0]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_reject_shaders_that_do_not_compile() {
    use std::sync::Arc;

    use render_sandbox::shader_factory::{ShaderError, ShaderFactory, ShaderStage};

    use crate::common::test_utils::{MemoryFileSystem, gpu};

    let ctx = gpu::headless_context(8, 8);
    let fs = MemoryFileSystem::new().with_file(
        "/broken.wgsl",
        "@vertex fn main_vs() -> @builtin(position) vec4<f32> { return undefined_symbol; }",
    );
    let factory = ShaderFactory::new(ctx.device.clone(), Arc::new(fs), "/");
    let err = factory
        .create_shader("broken.wgsl", "main_vs", ShaderStage::Vertex)
        .unwrap_err();
    assert!(matches!(err, ShaderError::Compilation { .. }), "unexpected error: {err}");

    let err = factory
        .create_shader("broken.wgsl", "other_vs", ShaderStage::Vertex)
        .unwrap_err();
    assert!(matches!(err, ShaderError::MissingEntryPoint { .. }));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_ignore_zero_sized_resize() {
    use crate::common::test_utils::gpu;

    let mut ctx = gpu::headless_context(32, 16);
    assert!(!ctx.resize(0, 100));
    assert_eq!(ctx.back_buffer_size(), (32, 16));
    assert!(ctx.resize(48, 24));
    assert_eq!(ctx.back_buffer_size(), (48, 24));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_install_scene_on_poll() {
    use crate::common::test_utils::gpu;

    let ctx = gpu::headless_context(support::SIZE, support::SIZE);
    let mut app = support::scene_app(&ctx, false);
    assert!(app.is_scene_loading());
    assert!(app.scene().is_none());

    assert!(app.poll_scene_loading(&ctx).unwrap());
    assert!(!app.is_scene_loading());
    assert!(!app.poll_scene_loading(&ctx).unwrap());

    let scene = app.scene().unwrap();
    assert!(scene.is_ready());
    assert_eq!(scene.loaded_frame(), Some(ctx.frame_index()));
    assert_eq!(scene.meshes.len(), 1);
    assert_eq!(scene.lights().len(), 1);
    // One regular and one mirrored instance of the same mesh
    let batches = scene.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!((batches[0].instances.clone(), batches[0].mirrored), (0..1, false));
    assert_eq!((batches[1].instances.clone(), batches[1].mirrored), (1..2, true));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_load_scene_in_background() {
    use std::time::{Duration, Instant};

    use crate::common::test_utils::gpu;

    let ctx = gpu::headless_context(support::SIZE, support::SIZE);
    let mut app = support::scene_app(&ctx, true);
    assert!(app.is_asynchronous_loading_enabled());

    let deadline = Instant::now() + Duration::from_secs(10);
    while !app.poll_scene_loading(&ctx).unwrap() {
        assert!(Instant::now() < deadline, "scene did not finish loading");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(app.scene().is_some_and(|scene| scene.is_ready()));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_shade_scene_with_forward_pass() {
    use cgmath::{Point3, Rad, Vector3};
    use render_sandbox::{
        camera::{FirstPersonCamera, persp_proj_reverse},
        pipelines::forward::{ForwardShadingPass, ForwardShadingPassParams},
        render::{InstancedOpaqueDrawStrategy, render_composite_view},
        render_targets::ForwardRenderTargets,
        view::{PlanarView, Viewport},
    };

    use crate::common::test_utils::gpu;

    let ctx = gpu::headless_context(support::SIZE, support::SIZE);
    let mut app = support::scene_app(&ctx, false);
    app.poll_scene_loading(&ctx).unwrap();
    let scene = app.scene().unwrap();

    let mut pass = ForwardShadingPass::new(
        &ctx.device,
        &gpu::shader_factory(&ctx),
        ForwardShadingPassParams::default(),
    )
    .unwrap();
    let targets = ForwardRenderTargets::new(&ctx.device, [support::SIZE; 2], 1, true);

    let mut camera = FirstPersonCamera::new();
    camera.look_at(Point3::new(1.3, 2.3, 2.0), Point3::new(1.3, 2.3, 0.0));
    let mut view = PlanarView::new();
    view.set_viewport(Viewport::new(support::SIZE as f32, support::SIZE as f32));
    view.set_matrices(
        camera.world_to_view(),
        persp_proj_reverse(Rad(std::f32::consts::FRAC_PI_4), 1.0, 0.1),
    );
    view.update_cache();

    let mut encoder = ctx.device.create_command_encoder(&Default::default());
    targets.clear(&mut encoder);
    pass.prepare_lights(
        &ctx.queue,
        &scene.lights(),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(0.3, 0.3, 0.3),
    );
    render_composite_view(
        &mut encoder,
        &ctx.queue,
        &view,
        &targets.framebuffer(),
        scene,
        &mut InstancedOpaqueDrawStrategy,
        &mut pass,
        "test forward",
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let image = gpu::read_back(&ctx, &targets.color.texture);
    assert!(support::pixel_is_lit(&image, 32, 32));
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_shade_scene_with_deferred_passes() {
    use cgmath::{Point3, Rad, Vector3};
    use render_sandbox::{
        camera::{FirstPersonCamera, persp_proj_reverse},
        context::ColorTarget,
        pipelines::{
            deferred_lighting::{DeferredLightingInputs, DeferredLightingPass},
            gbuffer_fill::{GBufferFillPass, GBufferFillPassParams},
        },
        render::{InstancedOpaqueDrawStrategy, render_composite_view},
        render_targets::DeferredRenderTargets,
        view::{PlanarView, Viewport},
    };

    use crate::common::test_utils::gpu;

    let ctx = gpu::headless_context(support::SIZE, support::SIZE);
    let downlevel = ctx.adapter.get_downlevel_capabilities();
    if !downlevel.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        eprintln!("skipping: adapter has no compute shaders");
        return;
    }
    let mut app = support::scene_app(&ctx, false);
    app.poll_scene_loading(&ctx).unwrap();

    let factory = gpu::shader_factory(&ctx);
    let mut gbuffer_pass = GBufferFillPass::new(&ctx.device, &factory, GBufferFillPassParams::default()).unwrap();
    let mut lighting_pass = DeferredLightingPass::new(&ctx.device, &factory).unwrap();
    let targets = DeferredRenderTargets::new(&ctx.device, [support::SIZE; 2], 1, true);

    let mut camera = FirstPersonCamera::new();
    camera.look_at(Point3::new(1.3, 2.3, 2.0), Point3::new(1.3, 2.3, 0.0));
    let mut view = PlanarView::new();
    view.set_viewport(Viewport::new(support::SIZE as f32, support::SIZE as f32));
    view.set_matrices(
        camera.world_to_view(),
        persp_proj_reverse(Rad(std::f32::consts::FRAC_PI_4), 1.0, 0.1),
    );
    view.update_cache();

    let output = gpu::render_target(&ctx);
    let output_view = output.create_view(&Default::default());
    let mut encoder = ctx.device.create_command_encoder(&Default::default());
    targets.clear(&mut encoder);
    let scene = app.scene().unwrap();
    render_composite_view(
        &mut encoder,
        &ctx.queue,
        &view,
        &targets.gbuffer.framebuffer(),
        scene,
        &mut InstancedOpaqueDrawStrategy,
        &mut gbuffer_pass,
        "test gbuffer",
    );
    let lights = scene.lights();
    lighting_pass.render(
        &mut encoder,
        &ctx.queue,
        &view,
        &DeferredLightingInputs {
            gbuffer: &targets.gbuffer,
            lights: &lights,
            ambient_color_top: Vector3::new(1.0, 1.0, 1.0),
            ambient_color_bottom: Vector3::new(0.3, 0.4, 0.3),
            output: &targets.shaded_color,
        },
    );
    app.blit(
        &mut encoder,
        &ColorTarget {
            view: &output_view,
            format: gpu::TEST_FORMAT,
        },
        &targets.shaded_color,
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let image = gpu::read_back(&ctx, &output);
    assert!(support::pixel_is_lit(&image, 32, 32));
    assert!(!support::pixel_is_lit(&image, 0, 0));
}
