use cgmath::{InnerSpace, Point3, Rad, Transform as _, Vector3, Vector4};
use render_sandbox::camera::{FirstPersonCamera, persp_proj_reverse};
use winit::{event::MouseButton, keyboard::KeyCode};

const EPS: f32 = 1e-4;

fn camera_at_eye_height() -> FirstPersonCamera {
    let mut camera = FirstPersonCamera::new();
    camera.look_at(Point3::new(0.0, 1.8, 0.0), Point3::new(1.0, 1.8, 0.0));
    camera
}

#[test]
fn should_look_at_target() {
    let camera = camera_at_eye_height();
    assert!((camera.forward() - Vector3::unit_x()).magnitude() < EPS);
    assert!((camera.right() - Vector3::unit_z()).magnitude() < EPS);
    assert_eq!(camera.position(), Point3::new(0.0, 1.8, 0.0));
}

#[test]
fn should_ignore_degenerate_look_at() {
    let mut camera = camera_at_eye_height();
    let yaw = camera.yaw();
    camera.look_at(Point3::new(2.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
    assert_eq!(camera.position(), Point3::new(2.0, 0.0, 0.0));
    assert_eq!(camera.yaw(), yaw);
}

#[test]
fn should_move_forward_at_move_speed() {
    let mut camera = camera_at_eye_height();
    camera.set_move_speed(3.0);
    assert!(camera.keyboard_update(KeyCode::KeyW, true));
    camera.animate(0.5);
    assert!((camera.position() - Point3::new(1.5, 1.8, 0.0)).magnitude() < EPS);

    assert!(camera.keyboard_update(KeyCode::KeyW, false));
    camera.animate(0.5);
    assert!((camera.position() - Point3::new(1.5, 1.8, 0.0)).magnitude() < EPS);
}

#[test]
fn should_boost_while_shift_is_held() {
    let mut camera = camera_at_eye_height();
    camera.keyboard_update(KeyCode::ArrowUp, true);
    camera.keyboard_update(KeyCode::ShiftLeft, true);
    camera.animate(1.0);
    assert!((camera.position() - Point3::new(3.0, 1.8, 0.0)).magnitude() < EPS);
}

#[test]
fn should_move_vertically_with_e_and_q() {
    let mut camera = camera_at_eye_height();
    camera.keyboard_update(KeyCode::KeyE, true);
    camera.animate(1.0);
    assert!((camera.position().y - 2.8).abs() < EPS);
    camera.keyboard_update(KeyCode::KeyE, false);
    camera.keyboard_update(KeyCode::KeyQ, true);
    camera.animate(2.0);
    assert!((camera.position().y - 0.8).abs() < EPS);
}

#[test]
fn should_not_consume_unrelated_keys() {
    let mut camera = FirstPersonCamera::new();
    assert!(!camera.keyboard_update(KeyCode::KeyZ, true));
    assert!(!camera.mouse_button_update(MouseButton::Right, true));
}

#[test]
fn should_rotate_only_while_dragging() {
    let mut camera = camera_at_eye_height();
    camera.set_rotate_speed(0.01);
    let yaw = camera.yaw();

    assert!(!camera.mouse_pos_update(100.0, 100.0));
    assert!(!camera.mouse_pos_update(150.0, 100.0));
    camera.animate(0.016);
    assert_eq!(camera.yaw(), yaw);

    assert!(camera.mouse_button_update(MouseButton::Left, true));
    assert!(camera.mouse_pos_update(160.0, 100.0));
    camera.animate(0.016);
    assert!((camera.yaw().0 - (yaw.0 + 0.1)).abs() < EPS);
}

#[test]
fn should_clamp_pitch() {
    let mut camera = camera_at_eye_height();
    camera.mouse_button_update(MouseButton::Left, true);
    camera.mouse_pos_update(0.0, 0.0);
    camera.mouse_pos_update(0.0, -100_000.0);
    camera.animate(0.016);
    assert!(camera.pitch().0 < std::f32::consts::FRAC_PI_2);
    assert!(camera.forward().y > 0.99);
}

#[test]
fn should_transform_camera_position_to_view_origin() {
    let camera = camera_at_eye_height();
    let view = camera.world_to_view();
    let origin = view.transform_point(camera.position());
    assert!(origin.x.abs() < EPS && origin.y.abs() < EPS && origin.z.abs() < EPS);
    // Looking down +x in world space means looking down -z in view space
    let ahead = view.transform_point(Point3::new(5.0, 1.8, 0.0));
    assert!((ahead.z + 5.0).abs() < EPS);
}

fn project_depth(z_view: f32) -> f32 {
    let proj = persp_proj_reverse(Rad(std::f32::consts::FRAC_PI_4), 1.0, 0.1);
    let clip = proj * Vector4::new(0.0, 0.0, z_view, 1.0);
    clip.z / clip.w
}

#[test]
fn should_map_near_plane_to_one_and_infinity_to_zero() {
    assert!((project_depth(-0.1) - 1.0).abs() < EPS);
    assert!(project_depth(-1.0e6) < 1e-6);
    assert!(project_depth(-1.0e6) > 0.0);
}

#[test]
fn should_decrease_depth_with_distance() {
    let near = project_depth(-1.0);
    let far = project_depth(-10.0);
    assert!(near > far);
}

#[test]
fn should_scale_x_by_aspect() {
    let proj = persp_proj_reverse(Rad(std::f32::consts::FRAC_PI_2), 2.0, 0.1);
    // tan(45°) = 1, so focal length is 1 vertically and 0.5 horizontally
    assert!((proj.x.x - 0.5).abs() < EPS);
    assert!((proj.y.y - 1.0).abs() < EPS);
}
