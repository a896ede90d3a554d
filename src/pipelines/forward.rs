use cgmath::Vector3;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        light::{LightConstants, LightingConstants},
        model::{ModelVertex, Vertex, material_bind_group_layout},
        texture::Texture,
    },
    pipelines::{
        basic::{DepthTest, mk_pipeline_layout, mk_render_pipeline},
        light::{self, LightBuffer},
    },
    render::GeometryPass,
    shader_factory::{ShaderError, ShaderFactory, ShaderStage},
    view::{PlanarView, ViewBuffer, view_bind_group_layout},
};

#[derive(Debug, Clone, Copy)]
pub struct ForwardShadingPassParams {
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub reverse_depth: bool,
}

impl Default for ForwardShadingPassParams {
    fn default() -> Self {
        Self {
            color_format: crate::render_targets::ForwardRenderTargets::COLOR_FORMAT,
            sample_count: 1,
            reverse_depth: true,
        }
    }
}

/// Shades scene geometry with every light in a single pass.
pub struct ForwardShadingPass {
    device: wgpu::Device,
    view_buffer: ViewBuffer,
    light_layout: wgpu::BindGroupLayout,
    lights: LightBuffer,
    pipeline: wgpu::RenderPipeline,
    pipeline_no_cull: wgpu::RenderPipeline,
}

impl ForwardShadingPass {
    pub fn new(
        device: &wgpu::Device,
        shader_factory: &ShaderFactory,
        params: ForwardShadingPassParams,
    ) -> Result<Self, ShaderError> {
        let vs = shader_factory.create_shader("framework/forward.wgsl", "forward_vs", ShaderStage::Vertex)?;
        let ps = shader_factory.create_shader("framework/forward.wgsl", "forward_ps", ShaderStage::Fragment)?;

        let view_layout = view_bind_group_layout(device);
        let material_layout = material_bind_group_layout(device);
        let light_layout = light::mk_bind_group_layout(device);
        let layout = mk_pipeline_layout(
            device,
            "Forward Pipeline Layout",
            &[&view_layout, &material_layout, &light_layout],
        );

        let mk_pipeline = |cull_mode| {
            mk_render_pipeline(
                device,
                "Forward Shading Pipeline",
                &layout,
                &vs,
                &ps,
                &[ModelVertex::desc(), InstanceRaw::desc()],
                &[params.color_format],
                None,
                Some(DepthTest::scene(Texture::DEPTH_FORMAT, params.reverse_depth)),
                cull_mode,
                params.sample_count,
            )
        };
        let pipeline = mk_pipeline(Some(wgpu::Face::Back));
        let pipeline_no_cull = mk_pipeline(None);

        Ok(Self {
            device: device.clone(),
            view_buffer: ViewBuffer::new(device, &view_layout, "Forward View Buffer"),
            lights: LightBuffer::new(device, &light_layout, 16),
            light_layout,
            pipeline,
            pipeline_no_cull,
        })
    }

    /// Upload the lights and hemispheric ambient used by the next draws.
    pub fn prepare_lights(
        &mut self,
        queue: &wgpu::Queue,
        lights: &[LightConstants],
        ambient_color_top: Vector3<f32>,
        ambient_color_bottom: Vector3<f32>,
    ) {
        let constants = LightingConstants::new(ambient_color_top, ambient_color_bottom, lights.len());
        self.lights
            .write(&self.device, queue, &self.light_layout, constants, lights);
    }

    /// The pass binds no render-target resources, so there is nothing to drop.
    pub fn reset_binding_cache(&mut self) {}
}

impl GeometryPass for ForwardShadingPass {
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
        pass.set_bind_group(2, &self.lights.bind_group, &[]);
    }
}
