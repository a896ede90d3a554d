//! First-person camera and the reverse-Z projection used by every sample.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::{event::MouseButton, keyboard::KeyCode};

/// Keeps the view from flipping over when looking straight up or down.
const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.0001;

/// Speed multiplier while Shift is held.
const BOOST_FACTOR: f32 = 3.0;

#[derive(Debug, Default, Clone, Copy)]
struct MoveKeys {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    boost: bool,
}

#[derive(Debug, Clone)]
pub struct FirstPersonCamera {
    position: Point3<f32>,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    move_speed: f32,
    /// Radians per pixel of mouse drag.
    rotate_speed: f32,
    keys: MoveKeys,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
    pending_rotation: (f32, f32),
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            yaw: Rad(-std::f32::consts::FRAC_PI_2),
            pitch: Rad(0.0),
            move_speed: 1.0,
            rotate_speed: 0.005,
            keys: MoveKeys::default(),
            dragging: false,
            last_cursor: None,
            pending_rotation: (0.0, 0.0),
        }
    }
}

impl FirstPersonCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn look_at(&mut self, eye: Point3<f32>, target: Point3<f32>) {
        self.position = eye;
        let dir = target - eye;
        if dir.magnitude2() <= f32::EPSILON {
            return;
        }
        let dir = dir.normalize();
        self.yaw = Rad(dir.z.atan2(dir.x));
        self.pitch = Rad(dir.y.clamp(-1.0, 1.0).asin().clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed;
    }

    pub fn set_rotate_speed(&mut self, speed: f32) {
        self.rotate_speed = speed;
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn yaw(&self) -> Rad<f32> {
        self.yaw
    }

    pub fn pitch(&self) -> Rad<f32> {
        self.pitch
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(Vector3::unit_y()).normalize()
    }

    /// Returns `true` for the movement keys.
    pub fn keyboard_update(&mut self, key: KeyCode, pressed: bool) -> bool {
        let slot = match key {
            KeyCode::KeyW | KeyCode::ArrowUp => &mut self.keys.forward,
            KeyCode::KeyS | KeyCode::ArrowDown => &mut self.keys.backward,
            KeyCode::KeyA | KeyCode::ArrowLeft => &mut self.keys.left,
            KeyCode::KeyD | KeyCode::ArrowRight => &mut self.keys.right,
            KeyCode::KeyE => &mut self.keys.up,
            KeyCode::KeyQ => &mut self.keys.down,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => &mut self.keys.boost,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    pub fn mouse_button_update(&mut self, button: MouseButton, pressed: bool) -> bool {
        if button != MouseButton::Left {
            return false;
        }
        self.dragging = pressed;
        true
    }

    pub fn mouse_pos_update(&mut self, x: f64, y: f64) -> bool {
        let consumed = match (self.dragging, self.last_cursor) {
            (true, Some((last_x, last_y))) => {
                self.pending_rotation.0 += (x - last_x) as f32;
                self.pending_rotation.1 += (y - last_y) as f32;
                true
            }
            _ => false,
        };
        self.last_cursor = Some((x, y));
        consumed
    }

    /// Apply accumulated rotation and movement for a frame lasting `dt` seconds.
    pub fn animate(&mut self, dt: f32) {
        let (dx, dy) = std::mem::take(&mut self.pending_rotation);
        self.yaw += Rad(dx * self.rotate_speed);
        self.pitch = Rad((self.pitch.0 - dy * self.rotate_speed).clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));

        let axis = |positive: bool, negative: bool| (positive as i32 - negative as i32) as f32;
        let forward = axis(self.keys.forward, self.keys.backward);
        let right = axis(self.keys.right, self.keys.left);
        let up = axis(self.keys.up, self.keys.down);
        if forward == 0.0 && right == 0.0 && up == 0.0 {
            return;
        }

        let boost = if self.keys.boost { BOOST_FACTOR } else { 1.0 };
        let step = self.move_speed * boost * dt;
        let direction = self.forward() * forward + self.right() * right + Vector3::unit_y() * up;
        self.position += direction.normalize() * step;
    }

    pub fn world_to_view(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

/// Infinite-far perspective projection with reversed depth.
///
/// Maps view-space `z = -z_near` to depth 1 and lets depth approach 0 at
/// infinity, so depth buffers clear to 0 and test with `Greater`.
pub fn persp_proj_reverse(fov_y: Rad<f32>, aspect: f32, z_near: f32) -> Matrix4<f32> {
    let f = 1.0 / (fov_y.0 / 2.0).tan();
    #[rustfmt::skip]
    let proj = Matrix4::new(
        f / aspect, 0.0, 0.0,    0.0,
        0.0,        f,   0.0,    0.0,
        0.0,        0.0, 0.0,   -1.0,
        0.0,        0.0, z_near, 0.0,
    );
    proj
}
