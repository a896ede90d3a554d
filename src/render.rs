//! Geometry pass composition.
//!
//! A [`DrawStrategy`] decides which parts of a [`Scene`] are drawn, a
//! [`GeometryPass`] decides how, and [`render_composite_view`] records the
//! render pass that ties both to a view and a framebuffer.
//!
//! # Key types
//!
//! - [`DrawItem<'a>`] is one instanced draw of a mesh with its material
//! - [`InstancedOpaqueDrawStrategy`] yields one draw per opaque mesh
//! - [`GeometryPass`] is implemented by the forward and G-buffer passes

use std::ops::Range;

use crate::{
    context::Framebuffer,
    data_structures::model::{AlphaMode, Material, Mesh},
    scene::{MeshBatch, Scene},
    view::PlanarView,
};

/// One instanced draw.
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub instances: Range<u32>,
    pub mirrored: bool,
}

impl DrawItem<'_> {
    /// Whether the item must be drawn without back-face culling.
    pub fn needs_both_faces(&self) -> bool {
        self.material.double_sided || self.mirrored
    }
}

pub trait DrawStrategy {
    fn draw_items<'a>(&mut self, scene: &'a Scene) -> Vec<DrawItem<'a>>;
}

/// Draws every mesh whose material is opaque or alpha-tested with a single
/// instanced call, in mesh order. Blended materials are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstancedOpaqueDrawStrategy;

impl DrawStrategy for InstancedOpaqueDrawStrategy {
    fn draw_items<'a>(&mut self, scene: &'a Scene) -> Vec<DrawItem<'a>> {
        let alpha_mode_of = |mesh: usize| {
            let mesh = scene.meshes.get(mesh)?;
            scene.materials.get(mesh.material).map(|m| m.alpha_mode)
        };
        opaque_batches(scene.batches(), alpha_mode_of)
            .into_iter()
            .filter_map(|batch| {
                let mesh = scene.meshes.get(batch.mesh)?;
                let material = scene.materials.get(mesh.material)?;
                Some(DrawItem {
                    mesh,
                    material,
                    instances: batch.instances,
                    mirrored: batch.mirrored,
                })
            })
            .collect()
    }
}

/// Batches whose mesh has a non-blended material, with empty batches removed.
pub fn opaque_batches(
    batches: &[MeshBatch],
    alpha_mode_of: impl Fn(usize) -> Option<AlphaMode>,
) -> Vec<MeshBatch> {
    batches
        .iter()
        .filter(|batch| !batch.instances.is_empty())
        .filter(|batch| matches!(alpha_mode_of(batch.mesh), Some(AlphaMode::Opaque | AlphaMode::Mask)))
        .cloned()
        .collect()
}

/// A pass that draws scene geometry with per-material pipelines.
///
/// Bind group 0 holds the view constants and group 1 the material. Passes may
/// bind further groups in [`GeometryPass::bind_pass_resources`].
pub trait GeometryPass {
    /// Upload per-view data. Runs before the render pass is opened.
    fn prepare(&mut self, queue: &wgpu::Queue, view: &PlanarView);

    fn pipeline(&self, double_sided: bool) -> &wgpu::RenderPipeline;

    fn bind_pass_resources(&self, pass: &mut wgpu::RenderPass<'_>);
}

/// Record every item `strategy` yields for `scene` into `framebuffer`.
///
/// Attachments are loaded, not cleared; callers clear their targets first.
#[allow(clippy::too_many_arguments)]
pub fn render_composite_view(
    encoder: &mut wgpu::CommandEncoder,
    queue: &wgpu::Queue,
    view: &PlanarView,
    framebuffer: &Framebuffer,
    scene: &Scene,
    strategy: &mut dyn DrawStrategy,
    pass: &mut dyn GeometryPass,
    label: &str,
) {
    pass.prepare(queue, view);

    let Some(instance_buffer) = scene.instance_buffer() else {
        log::debug!("{}: scene has no instances to draw", label);
        return;
    };
    let items = strategy.draw_items(scene);

    let color_attachments: Vec<_> = framebuffer
        .color
        .iter()
        .map(|target| {
            Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })
        })
        .collect();
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &color_attachments,
        depth_stencil_attachment: framebuffer.depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    });

    let viewport = view.viewport();
    render_pass.set_viewport(
        viewport.x,
        viewport.y,
        viewport.width.min(framebuffer.width as f32),
        viewport.height.min(framebuffer.height as f32),
        viewport.min_depth,
        viewport.max_depth,
    );
    pass.bind_pass_resources(&mut render_pass);
    render_pass.set_vertex_buffer(1, instance_buffer.slice(..));

    let mut current_double_sided = None;
    for item in items {
        let double_sided = item.needs_both_faces();
        if current_double_sided != Some(double_sided) {
            render_pass.set_pipeline(pass.pipeline(double_sided));
            current_double_sided = Some(double_sided);
        }
        render_pass.set_bind_group(1, &item.material.bind_group, &[]);
        render_pass.set_vertex_buffer(0, item.mesh.vertex_buffer.slice(..));
        render_pass.set_index_buffer(item.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..item.mesh.num_elements, 0, item.instances);
    }
}
