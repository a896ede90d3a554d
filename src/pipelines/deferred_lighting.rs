//! Compute pass that shades the G-buffer into an HDR color target.

use cgmath::Vector3;

use crate::{
    binding_cache::BindingCache,
    data_structures::{
        light::{LightConstants, LightingConstants},
        texture::Texture,
    },
    pipelines::light::{self, LightBuffer},
    render_targets::GBufferRenderTargets,
    shader_factory::{ShaderError, ShaderFactory, ShaderStage},
    view::{PlanarView, ViewBuffer, view_bind_group_layout},
};

/// Threads per workgroup along x and y, matching `deferred_lighting.wgsl`.
pub const WORKGROUP_SIZE: u32 = 8;

pub struct DeferredLightingInputs<'a> {
    pub gbuffer: &'a GBufferRenderTargets,
    pub lights: &'a [LightConstants],
    pub ambient_color_top: Vector3<f32>,
    pub ambient_color_bottom: Vector3<f32>,
    /// `Rgba16Float` storage texture the pass writes.
    pub output: &'a Texture,
}

pub fn dispatch_size(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE))
}

pub struct DeferredLightingPass {
    device: wgpu::Device,
    pipeline: wgpu::ComputePipeline,
    view_buffer: ViewBuffer,
    light_layout: wgpu::BindGroupLayout,
    lights: LightBuffer,
    gbuffer_layout: wgpu::BindGroupLayout,
    // Keyed by (G-buffer generation, output texture id)
    binding_cache: BindingCache<(u64, u64)>,
}

impl DeferredLightingPass {
    pub fn new(device: &wgpu::Device, shader_factory: &ShaderFactory) -> Result<Self, ShaderError> {
        let cs = shader_factory.create_shader(
            "framework/deferred_lighting.wgsl",
            "deferred_lighting_cs",
            ShaderStage::Compute,
        )?;

        let view_layout = view_bind_group_layout(device);
        let light_layout = light::mk_bind_group_layout(device);
        let gbuffer_layout = mk_gbuffer_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Deferred Lighting Pipeline Layout"),
            bind_group_layouts: &[&view_layout, &light_layout, &gbuffer_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Deferred Lighting Pipeline"),
            layout: Some(&layout),
            module: &cs.module,
            entry_point: cs.entry(),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device: device.clone(),
            pipeline,
            view_buffer: ViewBuffer::new(device, &view_layout, "Deferred Lighting View Buffer"),
            lights: LightBuffer::new(device, &light_layout, 16),
            light_layout,
            gbuffer_layout,
            binding_cache: BindingCache::new(),
        })
    }

    pub fn reset_binding_cache(&mut self) {
        self.binding_cache.clear();
    }

    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        view: &PlanarView,
        inputs: &DeferredLightingInputs,
    ) {
        self.view_buffer.write(queue, view);
        let constants = LightingConstants::new(
            inputs.ambient_color_top,
            inputs.ambient_color_bottom,
            inputs.lights.len(),
        );
        self.lights
            .write(&self.device, queue, &self.light_layout, constants, inputs.lights);

        let gbuffer = inputs.gbuffer;
        let output = inputs.output;
        let key = (gbuffer.generation(), output.id());
        let device = &self.device;
        let layout = &self.gbuffer_layout;
        let gbuffer_bind_group = self
            .binding_cache
            .get_or_create(key, || mk_gbuffer_bind_group(device, layout, gbuffer, output));

        let (groups_x, groups_y) = dispatch_size(output.width(), output.height());
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Deferred Lighting"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.view_buffer.bind_group, &[]);
        pass.set_bind_group(1, &self.lights.bind_group, &[]);
        pass.set_bind_group(2, gbuffer_bind_group, &[]);
        pass.dispatch_workgroups(groups_x, groups_y, 1);
    }
}

fn mk_gbuffer_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let color = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            color(0),
            color(1),
            color(2),
            color(3),
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 5,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: crate::render_targets::DeferredRenderTargets::SHADED_COLOR_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
        ],
        label: Some("gbuffer_bind_group_layout"),
    })
}

fn mk_gbuffer_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    gbuffer: &GBufferRenderTargets,
    output: &Texture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            texture_entry(0, &gbuffer.albedo),
            texture_entry(1, &gbuffer.specular),
            texture_entry(2, &gbuffer.normals),
            texture_entry(3, &gbuffer.emissive),
            texture_entry(4, &gbuffer.depth),
            texture_entry(5, output),
        ],
        label: Some("gbuffer_bind_group"),
    })
}

fn texture_entry(binding: u32, texture: &Texture) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(&texture.view),
    }
}
