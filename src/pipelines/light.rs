use wgpu::util::DeviceExt;

use crate::data_structures::light::{LightConstants, LightingConstants};

/// Bindings: 0 the [`LightingConstants`] header, 1 the light array.
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let visibility = wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

/// GPU copy of the scene lights. The array buffer grows on demand.
pub struct LightBuffer {
    constants: wgpu::Buffer,
    lights: wgpu::Buffer,
    capacity: usize,
    pub bind_group: wgpu::BindGroup,
}

impl LightBuffer {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let constants = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Constants Buffer"),
            contents: bytemuck::cast_slice(&[LightingConstants::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights = mk_light_array(device, capacity);
        let bind_group = mk_bind_group(device, layout, &constants, &lights);
        Self {
            constants,
            lights,
            capacity,
            bind_group,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        constants: LightingConstants,
        lights: &[LightConstants],
    ) {
        if lights.len() > self.capacity {
            self.capacity = lights.len().next_power_of_two();
            self.lights = mk_light_array(device, self.capacity);
            self.bind_group = mk_bind_group(device, layout, &self.constants, &self.lights);
            log::debug!("light buffer grown to {} lights", self.capacity);
        }
        queue.write_buffer(&self.constants, 0, bytemuck::cast_slice(&[constants]));
        if !lights.is_empty() {
            queue.write_buffer(&self.lights, 0, bytemuck::cast_slice(lights));
        }
    }
}

fn mk_light_array(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Light Array Buffer"),
        size: (capacity * std::mem::size_of::<LightConstants>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    constants: &wgpu::Buffer,
    lights: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: constants.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: lights.as_entire_binding(),
            },
        ],
        label: Some("light_bind_group"),
    })
}
