pub mod canvas;
mod hud;
mod raster;
mod renderer;
pub mod text;
pub mod transform;

use thiserror::Error;

use super::camera::CameraState;
use super::controller::{DeviceProfile, TouchButtonLayout};
use super::input::MovementIntent;
use super::scene::SceneWorld;
use transform::Viewport;

pub use hud::{controls_hint, draw_hud};
pub use raster::Rasterizer;
pub use renderer::Renderer;

/// Overlay state drawn on top of the 3D view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudState {
    pub profile: DeviceProfile,
    /// `Some` only when cart controls are enabled.
    pub cart_count: Option<usize>,
    pub touch_buttons: Option<TouchButtonLayout>,
    pub held: MovementIntent,
    pub pending_textures: usize,
}

pub struct FrameView<'a> {
    pub world: &'a SceneWorld,
    pub camera: &'a CameraState,
    pub viewport: Viewport,
    pub hud: HudState,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("graphics context unavailable: {reason}")]
    ContextUnavailable { reason: String },
    #[error(transparent)]
    Surface(#[from] pixels::Error),
    #[error(transparent)]
    Texture(#[from] pixels::TextureError),
}

/// Host display surface a session draws into.
pub trait FrameSurface {
    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError>;
    fn draw(&mut self, view: &FrameView<'_>) -> Result<(), RenderError>;
}

/// Rasterizes the scene plus overlay into a plain RGBA buffer.
pub fn draw_frame(rasterizer: &mut Rasterizer, frame: &mut [u8], view: &FrameView<'_>) {
    rasterizer.draw(frame, view.viewport, view.world, view.camera);
    let mut canvas = canvas::Canvas::new(frame, view.viewport.width, view.viewport.height);
    draw_hud(&mut canvas, &view.hud);
}
