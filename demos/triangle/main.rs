use std::path::Path;

use anyhow::Context as _;
use clap::Parser;
use render_sandbox::{
    cli::{Args, DeviceCreationParameters},
    context::{Context, Framebuffer},
    flow::{self, GraphicsFlow},
    pipelines::basic::{mk_pipeline_layout, mk_render_pipeline},
    shader_factory::{ShaderFactory, ShaderHandle, ShaderStage},
};

const WINDOW_TITLE: &str = "Basic Triangle";

struct BasicTriangle {
    vertex_shader: ShaderHandle,
    pixel_shader: ShaderHandle,
    layout: wgpu::PipelineLayout,
    // Built for the back buffer format on first use
    pipeline: Option<wgpu::RenderPipeline>,
}

impl BasicTriangle {
    fn new(ctx: &Context, shader_dir: &Path) -> anyhow::Result<Self> {
        let shader_factory = ShaderFactory::from_directory(ctx.device.clone(), shader_dir);
        let vertex_shader = shader_factory
            .create_shader("triangle/shaders.wgsl", "main_vs", ShaderStage::Vertex)
            .context("failed to load the triangle vertex shader")?;
        let pixel_shader = shader_factory
            .create_shader("triangle/shaders.wgsl", "main_ps", ShaderStage::Fragment)
            .context("failed to load the triangle pixel shader")?;
        Ok(Self {
            vertex_shader,
            pixel_shader,
            layout: mk_pipeline_layout(&ctx.device, "Triangle Pipeline Layout", &[]),
            pipeline: None,
        })
    }
}

impl GraphicsFlow for BasicTriangle {
    fn animate(&mut self, ctx: &Context, _dt: instant::Duration) {
        ctx.set_informative_window_title(WINDOW_TITLE);
    }

    fn back_buffer_resizing(&mut self, _ctx: &Context) {
        self.pipeline = None;
    }

    fn render(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        back_buffer: &Framebuffer,
    ) -> anyhow::Result<()> {
        let target = back_buffer.color.first().context("no back buffer to draw into")?;
        let pipeline = self.pipeline.get_or_insert_with(|| {
            mk_render_pipeline(
                &ctx.device,
                "Triangle Pipeline",
                &self.layout,
                &self.vertex_shader,
                &self.pixel_shader,
                &[],
                &[target.format],
                None,
                None,
                None,
                1,
            )
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Triangle"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
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
        pass.set_pipeline(pipeline);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let params = DeviceCreationParameters::from_args(&args, WINDOW_TITLE, None);
    let shader_dir = args.shader_dir();
    flow::run(
        params,
        vec![Box::new(move |ctx: &Context| {
            Ok(Box::new(BasicTriangle::new(ctx, &shader_dir)?) as Box<dyn GraphicsFlow>)
        })],
    )
}
