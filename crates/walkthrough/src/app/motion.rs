use glam::{Vec2, Vec3};

use super::camera::CameraState;
use super::input::{MoveAction, MovementIntent};
use super::scene::WalkBounds;

pub const DESKTOP_MOVE_SPEED: f32 = 0.2;
pub const MOBILE_MOVE_SPEED: f32 = 0.12;

/// What to do with a step whose target lies outside the walkable rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Drop the whole step.
    #[default]
    RejectWhole,
    /// Keep whichever axis of the step stays inside.
    SlideAlongWalls,
}

/// Unit direction in camera-local space (x right, z back), or `None` when
/// nothing is held or opposing flags cancel out.
pub fn local_direction(intent: &MovementIntent) -> Option<Vec2> {
    let axis = |negative: MoveAction, positive: MoveAction| -> f32 {
        intent.is_down(positive) as i8 as f32 - intent.is_down(negative) as i8 as f32
    };
    let local = Vec2::new(
        axis(MoveAction::StrafeLeft, MoveAction::StrafeRight),
        axis(MoveAction::Advance, MoveAction::Retreat),
    );
    local.try_normalize()
}

/// Horizontal step for one tick at `speed`, rotated by `yaw`.
pub fn world_displacement(intent: &MovementIntent, yaw: f32, speed: f32) -> Vec3 {
    let Some(local) = local_direction(intent) else {
        return Vec3::ZERO;
    };
    let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
    let right = Vec3::new(-forward.z, 0.0, forward.x);
    let world = forward * -local.y + right * local.x;
    world.try_normalize().map_or(Vec3::ZERO, |direction| direction * speed)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionIntegrator {
    pub speed: f32,
    pub policy: BoundaryPolicy,
}

impl MotionIntegrator {
    pub fn new(speed: f32, policy: BoundaryPolicy) -> Self {
        Self { speed, policy }
    }

    /// Advances the camera by one tick. Returns whether the position changed.
    pub fn step(&self, camera: &mut CameraState, intent: &MovementIntent, bounds: &WalkBounds) -> bool {
        let delta = world_displacement(intent, camera.yaw(), self.speed);
        if delta == Vec3::ZERO {
            return false;
        }
        let current = camera.position();
        let candidate = current + delta;
        let target = if bounds.contains_strict(candidate.x, candidate.z) {
            Some((candidate.x, candidate.z))
        } else {
            match self.policy {
                BoundaryPolicy::RejectWhole => None,
                BoundaryPolicy::SlideAlongWalls => slide(current, delta, bounds),
            }
        };
        match target {
            Some((x, z)) => {
                camera.set_position(x, z, bounds);
                true
            }
            None => false,
        }
    }
}

fn slide(current: Vec3, delta: Vec3, bounds: &WalkBounds) -> Option<(f32, f32)> {
    let x = if bounds.contains_strict(current.x + delta.x, current.z) {
        current.x + delta.x
    } else {
        current.x
    };
    let z = if bounds.contains_strict(x, current.z + delta.z) {
        current.z + delta.z
    } else {
        current.z
    };
    (x != current.x || z != current.z).then_some((x, z))
}
