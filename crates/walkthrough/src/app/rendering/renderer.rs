use std::sync::Arc;

use pixels::{Pixels, SurfaceTexture};
use winit::window::Window;

use super::transform::Viewport;
use super::{draw_frame, FrameSurface, FrameView, Rasterizer, RenderError};

/// `pixels`-backed window surface. The framebuffer always matches the window's
/// inner size; the scene is rasterized on the CPU into it each frame.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    rasterizer: Rasterizer,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let viewport = Viewport::new(size.width.max(1), size.height.max(1));
        let surface = SurfaceTexture::new(viewport.width, viewport.height, Arc::clone(&window));
        let pixels = Pixels::new(viewport.width, viewport.height, surface)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            rasterizer: Rasterizer::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl FrameSurface for Renderer {
    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        if viewport.is_empty() || viewport == self.viewport {
            return Ok(());
        }
        self.pixels.resize_surface(viewport.width, viewport.height)?;
        self.pixels.resize_buffer(viewport.width, viewport.height)?;
        self.viewport = viewport;
        Ok(())
    }

    fn draw(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        if self.viewport.is_empty() || view.viewport != self.viewport {
            return Ok(());
        }
        draw_frame(&mut self.rasterizer, self.pixels.frame_mut(), view);
        self.pixels.render()?;
        Ok(())
    }
}
