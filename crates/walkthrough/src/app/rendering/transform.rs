use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }

    pub fn center_px(&self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

/// Pixel coordinates (origin top-left, y down) to normalized device coordinates.
pub fn screen_to_ndc(screen_px: Vec2, viewport: Viewport) -> Vec2 {
    let width = viewport.width.max(1) as f32;
    let height = viewport.height.max(1) as f32;
    Vec2::new(
        screen_px.x / width * 2.0 - 1.0,
        1.0 - screen_px.y / height * 2.0,
    )
}

pub fn ndc_to_screen(ndc: Vec2, viewport: Viewport) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        (1.0 - ndc.y) * 0.5 * viewport.height as f32,
    )
}

/// Projects a world point; `None` when the point is at or behind the eye plane.
pub fn world_to_screen_px(view_projection: &Mat4, world: Vec3, viewport: Viewport) -> Option<Vec2> {
    let clip = *view_projection * world.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
    Some(ndc_to_screen(ndc, viewport))
}
