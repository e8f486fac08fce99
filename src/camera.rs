//! Camera, projection and fly controls.
//!
//! The camera is a free-flying position/direction/up triple; the projection
//! tracks the viewport aspect ratio and must be refreshed whenever the
//! surface is resized. View and projection matrices are recomputed from
//! scratch each frame, never cached across frames.

use cgmath::{Deg, InnerSpace, Matrix3, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{event::MouseButton, keyboard::KeyCode};

use crate::input::Input;

/// cgmath produces OpenGL clip space (z in -1..1); wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub direction: Vector3<f32>,
    pub up: Vector3<f32>,
    pub speed: f32,
}

impl Camera {
    pub fn new(position: impl Into<Point3<f32>>, direction: impl Into<Vector3<f32>>) -> Self {
        Self {
            position: position.into(),
            direction: direction.into(),
            up: Vector3::unit_y(),
            speed: 0.1,
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.direction, self.up)
    }

    /// World position as a vector, for packing into the global block.
    pub fn position_vec(&self) -> Vector3<f32> {
        Vector3::new(self.position.x, self.position.y, self.position.z)
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Deg<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy,
            znear,
            zfar,
        }
    }

    /// Track the viewport aspect ratio; call on every surface resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Fly-camera controls driven by the per-frame input snapshot.
///
/// While the look button is held, W/S move along the view direction, A/D
/// strafe along the right vector, E/Q move along up, and horizontal mouse
/// delta yaws the view direction around the up axis.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub look_button: MouseButton,
    pub sensitivity: f32,
}

impl CameraController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            look_button: MouseButton::Right,
            sensitivity,
        }
    }

    pub fn update(&self, camera: &mut Camera, input: &Input) {
        if !input.button_held(self.look_button) {
            return;
        }

        let forward = camera.direction.normalize();
        let right = forward.cross(camera.up).normalize();
        let up = camera.up.normalize();

        if input.key_held(KeyCode::KeyW) {
            camera.position += forward * camera.speed;
        }
        if input.key_held(KeyCode::KeyS) {
            camera.position -= forward * camera.speed;
        }
        if input.key_held(KeyCode::KeyD) {
            camera.position += right * camera.speed;
        }
        if input.key_held(KeyCode::KeyA) {
            camera.position -= right * camera.speed;
        }
        if input.key_held(KeyCode::KeyE) {
            camera.position += up * camera.speed;
        }
        if input.key_held(KeyCode::KeyQ) {
            camera.position -= up * camera.speed;
        }

        let (dx, _dy) = input.mouse_delta();
        if dx != 0.0 {
            let yaw = Rad::from(Deg(-dx * self.sensitivity));
            camera.direction = Matrix3::from_axis_angle(up, yaw) * camera.direction;
        }
    }
}
