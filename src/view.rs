//! Planar (single viewport) view and its shader constants.

use cgmath::{EuclideanSpace, Matrix4, Point3, SquareMatrix, Transform as _};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// View constants as laid out in `view.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewConstants {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// width, height, 1 / width, 1 / height
    pub viewport_size: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct PlanarView {
    viewport: Viewport,
    world_to_view: Matrix4<f32>,
    projection: Matrix4<f32>,
    view_proj: Matrix4<f32>,
    inv_view_proj: Matrix4<f32>,
    camera_position: Point3<f32>,
    cache_valid: bool,
}

impl Default for PlanarView {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1.0, 1.0),
            world_to_view: Matrix4::identity(),
            projection: Matrix4::identity(),
            view_proj: Matrix4::identity(),
            inv_view_proj: Matrix4::identity(),
            camera_position: Point3::origin(),
            cache_valid: true,
        }
    }
}

impl PlanarView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_matrices(&mut self, world_to_view: Matrix4<f32>, projection: Matrix4<f32>) {
        self.world_to_view = world_to_view;
        self.projection = projection;
        self.cache_valid = false;
    }

    /// Recompute derived matrices after [`PlanarView::set_matrices`].
    pub fn update_cache(&mut self) {
        if self.cache_valid {
            return;
        }
        self.view_proj = self.projection * self.world_to_view;
        self.inv_view_proj = self.view_proj.invert().unwrap_or_else(Matrix4::identity);
        self.camera_position = self
            .world_to_view
            .invert()
            .map(|view_to_world| view_to_world.transform_point(Point3::origin()))
            .unwrap_or_else(Point3::origin);
        self.cache_valid = true;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn world_to_view(&self) -> Matrix4<f32> {
        self.world_to_view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.view_proj
    }

    pub fn inv_view_proj(&self) -> Matrix4<f32> {
        self.inv_view_proj
    }

    pub fn camera_position(&self) -> Point3<f32> {
        self.camera_position
    }

    pub fn is_cache_valid(&self) -> bool {
        self.cache_valid
    }

    pub fn uniform(&self) -> ViewConstants {
        if !self.cache_valid {
            log::warn!("view constants requested before update_cache");
        }
        let Viewport { width, height, .. } = self.viewport;
        ViewConstants {
            view_proj: self.view_proj.into(),
            inv_view_proj: self.inv_view_proj.into(),
            camera_position: self.camera_position.to_homogeneous().into(),
            viewport_size: [width, height, 1.0 / width.max(1.0), 1.0 / height.max(1.0)],
        }
    }
}

pub fn view_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX
                | wgpu::ShaderStages::FRAGMENT
                | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("view_bind_group_layout"),
    })
}

/// Uniform buffer plus bind group holding one view's constants.
pub struct ViewBuffer {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ViewBuffer {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<ViewConstants>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, view: &PlanarView) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[view.uniform()]));
    }
}
