//! Offscreen render target sets for the forward and deferred samples.
//!
//! Each set carries a `generation` that changes whenever the set is recreated,
//! which passes use as the key of their binding caches.

use crate::{
    context::{ColorTarget, Framebuffer},
    data_structures::texture::{Texture, next_resource_id},
};

fn clear_color_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

/// Depth value that is furthest away in the chosen convention.
pub fn far_depth(reverse_projection: bool) -> f32 {
    if reverse_projection { 0.0 } else { 1.0 }
}

/// Clear `colors` to zero and `depth` to the far plane in one empty pass.
pub fn clear_targets(
    encoder: &mut wgpu::CommandEncoder,
    colors: &[&wgpu::TextureView],
    depth: Option<&wgpu::TextureView>,
    reverse_projection: bool,
    label: &str,
) {
    let color_attachments: Vec<_> = colors.iter().map(|view| clear_color_attachment(view)).collect();
    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &color_attachments,
        depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(far_depth(reverse_projection)),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    });
}

/// Color plus depth for the forward sample.
pub struct ForwardRenderTargets {
    pub color: Texture,
    pub depth: Texture,
    reverse_projection: bool,
    generation: u64,
}

impl ForwardRenderTargets {
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(device: &wgpu::Device, size: [u32; 2], sample_count: u32, reverse_projection: bool) -> Self {
        Self {
            color: Texture::create_render_target(
                device,
                size,
                Self::COLOR_FORMAT,
                sample_count,
                wgpu::TextureUsages::COPY_SRC,
                "forward color",
            ),
            depth: Texture::create_depth_texture(device, size, sample_count, "forward depth"),
            reverse_projection,
            generation: next_resource_id(),
        }
    }

    pub fn size(&self) -> [u32; 2] {
        [self.color.width(), self.color.height()]
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        clear_targets(
            encoder,
            &[&self.color.view],
            Some(&self.depth.view),
            self.reverse_projection,
            "Forward Clear",
        );
    }

    pub fn framebuffer(&self) -> Framebuffer<'_> {
        let [width, height] = self.size();
        Framebuffer {
            color: vec![ColorTarget {
                view: &self.color.view,
                format: self.color.format,
            }],
            depth: Some(&self.depth.view),
            width,
            height,
        }
    }
}

/// Geometry buffers filled by the G-buffer pass.
pub struct GBufferRenderTargets {
    pub albedo: Texture,
    /// metalness in `r`, roughness in `g`
    pub specular: Texture,
    pub normals: Texture,
    pub emissive: Texture,
    pub depth: Texture,
    sample_count: u32,
    reverse_projection: bool,
    generation: u64,
}

impl GBufferRenderTargets {
    pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
    pub const SPECULAR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    pub const NORMALS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    pub const EMISSIVE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Formats in the order the G-buffer shader writes its outputs.
    pub const COLOR_FORMATS: [wgpu::TextureFormat; 4] = [
        Self::ALBEDO_FORMAT,
        Self::SPECULAR_FORMAT,
        Self::NORMALS_FORMAT,
        Self::EMISSIVE_FORMAT,
    ];

    pub fn new(device: &wgpu::Device, size: [u32; 2], sample_count: u32, reverse_projection: bool) -> Self {
        let target = |format, label| {
            Texture::create_render_target(
                device,
                size,
                format,
                sample_count,
                wgpu::TextureUsages::empty(),
                label,
            )
        };
        Self {
            albedo: target(Self::ALBEDO_FORMAT, "gbuffer albedo"),
            specular: target(Self::SPECULAR_FORMAT, "gbuffer specular"),
            normals: target(Self::NORMALS_FORMAT, "gbuffer normals"),
            emissive: target(Self::EMISSIVE_FORMAT, "gbuffer emissive"),
            depth: Texture::create_depth_texture(device, size, sample_count, "gbuffer depth"),
            sample_count,
            reverse_projection,
            generation: next_resource_id(),
        }
    }

    pub fn size(&self) -> [u32; 2] {
        [self.depth.width(), self.depth.height()]
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn reverse_projection(&self) -> bool {
        self.reverse_projection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        clear_targets(
            encoder,
            &[
                &self.albedo.view,
                &self.specular.view,
                &self.normals.view,
                &self.emissive.view,
            ],
            Some(&self.depth.view),
            self.reverse_projection,
            "GBuffer Clear",
        );
    }

    pub fn framebuffer(&self) -> Framebuffer<'_> {
        let [width, height] = self.size();
        let color = [&self.albedo, &self.specular, &self.normals, &self.emissive]
            .into_iter()
            .map(|texture| ColorTarget {
                view: &texture.view,
                format: texture.format,
            })
            .collect();
        Framebuffer {
            color,
            depth: Some(&self.depth.view),
            width,
            height,
        }
    }
}

/// G-buffer plus the HDR target the deferred lighting pass writes.
pub struct DeferredRenderTargets {
    pub gbuffer: GBufferRenderTargets,
    pub shaded_color: Texture,
}

impl DeferredRenderTargets {
    pub const SHADED_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    pub fn new(device: &wgpu::Device, size: [u32; 2], sample_count: u32, reverse_projection: bool) -> Self {
        Self {
            gbuffer: GBufferRenderTargets::new(device, size, sample_count, reverse_projection),
            shaded_color: Texture::create_storage_target(
                device,
                size,
                Self::SHADED_COLOR_FORMAT,
                "shaded color",
            ),
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.gbuffer.size()
    }

    pub fn generation(&self) -> u64 {
        self.gbuffer.generation()
    }

    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        self.gbuffer.clear(encoder);
    }
}
