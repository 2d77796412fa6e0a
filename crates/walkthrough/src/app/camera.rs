use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use super::input::LookDelta;
use super::picking::Ray;
use super::rendering::transform::{screen_to_ndc, world_to_screen_px, Viewport};
use super::scene::WalkBounds;

pub const EYE_HEIGHT: f32 = 2.0;
pub const PITCH_MARGIN: f32 = 0.1;
/// Largest pitch magnitude the camera accepts.
pub const PITCH_LIMIT: f32 = FRAC_PI_2 - PITCH_MARGIN;
pub const START_POSITION: Vec3 = Vec3::new(0.0, EYE_HEIGHT, 6.0);

pub const DEFAULT_FOV_Y_DEGREES: f32 = 75.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_radians: DEFAULT_FOV_Y_DEGREES.to_radians(),
            aspect: 1.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    if pitch.is_nan() {
        return 0.0;
    }
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

/// First-person eye: position on the walk plane plus yaw/pitch, applied yaw first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    projection: Projection,
}

impl CameraState {
    pub fn new(bounds: &WalkBounds) -> Self {
        let (x, z) = bounds.clamp(START_POSITION.x, START_POSITION.z);
        Self {
            position: Vec3::new(x, EYE_HEIGHT, z),
            yaw: 0.0,
            pitch: 0.0,
            projection: Projection::default(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn apply_look(&mut self, delta: LookDelta) {
        if !delta.yaw.is_finite() || !delta.pitch.is_finite() {
            return;
        }
        self.yaw += delta.yaw;
        self.pitch = clamp_pitch(self.pitch + delta.pitch);
    }

    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        if yaw.is_finite() {
            self.yaw = yaw;
        }
        self.pitch = clamp_pitch(pitch);
    }

    /// Moves the eye on the walk plane. Requests outside `bounds` are clamped.
    pub fn set_position(&mut self, x: f32, z: f32, bounds: &WalkBounds) {
        if !x.is_finite() || !z.is_finite() {
            return;
        }
        let (x, z) = bounds.clamp(x, z);
        self.position = Vec3::new(x, EYE_HEIGHT, z);
    }

    /// Only the aspect ratio follows the viewport; position and orientation stay put.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if let Some(aspect) = viewport.aspect() {
            self.projection.aspect = aspect;
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Unit view direction including pitch.
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.position).inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }

    pub fn world_to_screen(&self, world: Vec3, viewport: Viewport) -> Option<Vec2> {
        world_to_screen_px(&self.view_projection(), world, viewport)
    }

    /// Ray from the eye through a viewport pixel.
    pub fn screen_ray(&self, screen_px: Vec2, viewport: Viewport) -> Option<Ray> {
        if viewport.is_empty() {
            return None;
        }
        let ndc = screen_to_ndc(screen_px, viewport);
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        let direction = far - near;
        if !direction.is_finite() || direction.length_squared() <= f32::EPSILON {
            return None;
        }
        Some(Ray::new(self.position, direction))
    }
}
