//! Passes every sample shares. For now that is the full-screen blit.

use std::collections::HashMap;

use crate::{
    binding_cache::BindingCache,
    context::ColorTarget,
    data_structures::texture::{Texture, create_linear_sampler, create_point_sampler},
    pipelines::basic::{mk_pipeline_layout, mk_render_pipeline},
    shader_factory::{ShaderError, ShaderFactory, ShaderHandle, ShaderStage},
};

pub struct CommonRenderPasses {
    device: wgpu::Device,
    blit_vs: ShaderHandle,
    blit_ps: ShaderHandle,
    blit_layout: wgpu::BindGroupLayout,
    blit_pipeline_layout: wgpu::PipelineLayout,
    // One pipeline per target format
    blit_pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    pub linear_clamp_sampler: wgpu::Sampler,
    pub point_clamp_sampler: wgpu::Sampler,
}

impl CommonRenderPasses {
    pub fn new(device: &wgpu::Device, shader_factory: &ShaderFactory) -> Result<Self, ShaderError> {
        let blit_vs = shader_factory.create_shader("framework/blit.wgsl", "blit_vs", ShaderStage::Vertex)?;
        let blit_ps = shader_factory.create_shader("framework/blit.wgsl", "blit_ps", ShaderStage::Fragment)?;
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("blit_bind_group_layout"),
        });
        let blit_pipeline_layout = mk_pipeline_layout(device, "Blit Pipeline Layout", &[&blit_layout]);
        Ok(Self {
            device: device.clone(),
            blit_vs,
            blit_ps,
            blit_layout,
            blit_pipeline_layout,
            blit_pipelines: HashMap::new(),
            linear_clamp_sampler: create_linear_sampler(device, wgpu::AddressMode::ClampToEdge),
            point_clamp_sampler: create_point_sampler(device),
        })
    }

    fn blit_pipeline(&mut self, format: wgpu::TextureFormat) -> &wgpu::RenderPipeline {
        let Self {
            device,
            blit_vs,
            blit_ps,
            blit_pipeline_layout,
            ..
        } = self;
        self.blit_pipelines.entry(format).or_insert_with(|| {
            log::debug!("creating blit pipeline for {:?}", format);
            mk_render_pipeline(
                device,
                "Blit Pipeline",
                blit_pipeline_layout,
                blit_vs,
                blit_ps,
                &[],
                &[format],
                None,
                None,
                None,
                1,
            )
        })
    }

    /// Stretch `source` over the whole of `target`.
    ///
    /// Bind groups are cached per source texture in `cache`, so callers clear
    /// the cache when they recreate their targets.
    pub fn blit_texture(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &ColorTarget,
        source: &Texture,
        cache: &mut BindingCache<u64>,
    ) {
        let bind_group = cache.get_or_create(source.id(), || {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.blit_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.linear_clamp_sampler),
                    },
                ],
                label: Some("blit_bind_group"),
            })
        });
        let pipeline = self.blit_pipeline(target.format);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
