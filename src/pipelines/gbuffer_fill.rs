use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex, material_bind_group_layout},
        texture::Texture,
    },
    pipelines::basic::{DepthTest, mk_pipeline_layout, mk_render_pipeline},
    render::GeometryPass,
    render_targets::GBufferRenderTargets,
    shader_factory::{ShaderError, ShaderFactory, ShaderStage},
    view::{PlanarView, ViewBuffer, view_bind_group_layout},
};

#[derive(Debug, Clone, Copy)]
pub struct GBufferFillPassParams {
    pub sample_count: u32,
    pub reverse_depth: bool,
}

impl Default for GBufferFillPassParams {
    fn default() -> Self {
        Self {
            sample_count: 1,
            reverse_depth: true,
        }
    }
}

/// Writes albedo, metal/rough, normals and emissive for every opaque surface.
pub struct GBufferFillPass {
    view_buffer: ViewBuffer,
    pipeline: wgpu::RenderPipeline,
    pipeline_no_cull: wgpu::RenderPipeline,
}

impl GBufferFillPass {
    pub fn new(
        device: &wgpu::Device,
        shader_factory: &ShaderFactory,
        params: GBufferFillPassParams,
    ) -> Result<Self, ShaderError> {
        let vs = shader_factory.create_shader("framework/gbuffer_fill.wgsl", "gbuffer_vs", ShaderStage::Vertex)?;
        let ps = shader_factory.create_shader("framework/gbuffer_fill.wgsl", "gbuffer_ps", ShaderStage::Fragment)?;

        let view_layout = view_bind_group_layout(device);
        let material_layout = material_bind_group_layout(device);
        let layout = mk_pipeline_layout(device, "GBuffer Pipeline Layout", &[&view_layout, &material_layout]);

        let mk_pipeline = |cull_mode| {
            mk_render_pipeline(
                device,
                "GBuffer Fill Pipeline",
                &layout,
                &vs,
                &ps,
                &[ModelVertex::desc(), InstanceRaw::desc()],
                &GBufferRenderTargets::COLOR_FORMATS,
                None,
                Some(DepthTest::scene(Texture::DEPTH_FORMAT, params.reverse_depth)),
                cull_mode,
                params.sample_count,
            )
        };

        Ok(Self {
            view_buffer: ViewBuffer::new(device, &view_layout, "GBuffer View Buffer"),
            pipeline: mk_pipeline(Some(wgpu::Face::Back)),
            pipeline_no_cull: mk_pipeline(None),
        })
    }

    /// Material bindings live on the materials, nothing is cached per target.
    pub fn reset_binding_cache(&mut self) {}
}

impl GeometryPass for GBufferFillPass {
    fn prepare(&mut self, queue: &wgpu::Queue, view: &PlanarView) {
        self.view_buffer.write(queue, view);
    }

    fn pipeline(&self, double_sided: bool) -> &wgpu::RenderPipeline {
        if double_sided {
            &self.pipeline_no_cull
        } else {
            &self.pipeline
        }
    }

    fn bind_pass_resources(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(0, &self.view_buffer.bind_group, &[]);
    }
}
