//! Punctual lights and their GPU representation.

use cgmath::{InnerSpace, Matrix4, Transform as _, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Spot {
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

impl LightKind {
    fn shader_value(self) -> f32 {
        match self {
            LightKind::Directional => 0.0,
            LightKind::Point => 1.0,
            LightKind::Spot { .. } => 2.0,
        }
    }
}

/// A light as authored, before it is placed in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct LightDesc {
    pub name: Option<String>,
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Zero means unlimited range.
    pub range: f32,
}

/// Light data as read by the shading shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightConstants {
    /// xyz world position, w light kind
    pub position: [f32; 4],
    /// xyz world direction the light travels, w range
    pub direction: [f32; 4],
    /// rgb colour, a intensity
    pub color: [f32; 4],
    /// cos(inner cone), cos(outer cone)
    pub cone: [f32; 4],
}

impl LightConstants {
    /// Place `light` with its node's world matrix. Lights shine down local -Z.
    pub fn from_desc(light: &LightDesc, world: &Matrix4<f32>) -> Self {
        let forward = world.transform_vector(-Vector3::unit_z());
        let direction = if forward.magnitude2() > 0.0 {
            forward.normalize()
        } else {
            -Vector3::unit_z()
        };
        let (inner, outer) = match light.kind {
            LightKind::Spot {
                inner_cone_angle,
                outer_cone_angle,
            } => (inner_cone_angle.cos(), outer_cone_angle.cos()),
            _ => (1.0, 0.0),
        };
        Self {
            position: [world.w.x, world.w.y, world.w.z, light.kind.shader_value()],
            direction: [direction.x, direction.y, direction.z, light.range],
            color: [light.color[0], light.color[1], light.color[2], light.intensity],
            cone: [inner, outer, 0.0, 0.0],
        }
    }

    /// A directional light shining along `direction`.
    pub fn directional(direction: cgmath::Vector3<f32>, color: [f32; 3], intensity: f32) -> Self {
        let direction = direction.normalize();
        Self {
            position: [0.0, 0.0, 0.0, LightKind::Directional.shader_value()],
            direction: [direction.x, direction.y, direction.z, 0.0],
            color: [color[0], color[1], color[2], intensity],
            cone: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Ambient and light-count header that precedes the light array.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingConstants {
    pub ambient_color_top: [f32; 4],
    pub ambient_color_bottom: [f32; 4],
    pub light_count: u32,
    pub _padding: [u32; 3],
}

impl LightingConstants {
    pub fn new(
        ambient_color_top: cgmath::Vector3<f32>,
        ambient_color_bottom: cgmath::Vector3<f32>,
        light_count: usize,
    ) -> Self {
        Self {
            ambient_color_top: ambient_color_top.extend(0.0).into(),
            ambient_color_bottom: ambient_color_bottom.extend(0.0).into(),
            light_count: light_count as u32,
            _padding: [0; 3],
        }
    }
}
