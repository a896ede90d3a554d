use crate::shader_factory::ShaderHandle;

/// Depth test configuration for [`mk_render_pipeline`].
#[derive(Debug, Clone, Copy)]
pub struct DepthTest {
    pub format: wgpu::TextureFormat,
    pub compare: wgpu::CompareFunction,
    pub write: bool,
}

impl DepthTest {
    /// Standard scene depth test for the given projection convention.
    pub fn scene(format: wgpu::TextureFormat, reverse_projection: bool) -> Self {
        Self {
            format,
            compare: depth_compare(reverse_projection),
            write: true,
        }
    }
}

/// Closer fragments pass: greater depth under reverse-Z, smaller otherwise.
pub fn depth_compare(reverse_projection: bool) -> wgpu::CompareFunction {
    if reverse_projection {
        wgpu::CompareFunction::GreaterEqual
    } else {
        wgpu::CompareFunction::LessEqual
    }
}

pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    })
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex: &ShaderHandle,
    fragment: &ShaderHandle,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    color_formats: &[wgpu::TextureFormat],
    blend: Option<wgpu::BlendState>,
    depth: Option<DepthTest>,
    cull_mode: Option<wgpu::Face>,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let targets: Vec<_> = color_formats
        .iter()
        .map(|&format| {
            Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &vertex.module,
            entry_point: vertex.entry(),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment.module,
            entry_point: fragment.entry(),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth.map(|depth| wgpu::DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write,
            depth_compare: depth.compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
