use std::sync::Arc;

use glam::Vec2;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::camera::CameraState;
use super::controller::{DeviceProfile, InputController, InputEvent, InputSignal, LookSensitivity};
use super::input::MovementIntent;
use super::motion::{BoundaryPolicy, MotionIntegrator, DESKTOP_MOVE_SPEED, MOBILE_MOVE_SPEED};
use super::picking::{pick_nearest, resolve_pick, CartSelection, PickOutcome};
use super::rendering::transform::Viewport;
use super::rendering::{FrameSurface, FrameView, HudState, RenderError};
use super::scene::{build_scene, RoomSpec, SceneLayout, SceneWorld};
use super::textures::{TextureQueue, TextureSource};
use crate::catalog::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub room: RoomSpec,
    pub profile: DeviceProfile,
    pub cart_enabled: bool,
    pub boundary_policy: BoundaryPolicy,
    pub sensitivity: LookSensitivity,
    pub desktop_move_speed: f32,
    pub mobile_move_speed: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room: RoomSpec::default(),
            profile: DeviceProfile::Desktop,
            cart_enabled: false,
            boundary_policy: BoundaryPolicy::default(),
            sensitivity: LookSensitivity::default(),
            desktop_move_speed: DESKTOP_MOVE_SPEED,
            mobile_move_speed: MOBILE_MOVE_SPEED,
        }
    }
}

impl SessionConfig {
    pub fn move_speed(&self, profile: DeviceProfile) -> f32 {
        match profile {
            DeviceProfile::Desktop | DeviceProfile::DesktopContinuous => self.desktop_move_speed,
            DeviceProfile::Mobile => self.mobile_move_speed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unmounted,
    Mounting,
    Active,
    Unmounting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ItemAddedToCart(CatalogItem),
    ItemSelected(CatalogItem),
    ExitRequested,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {operation} a session that is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("3D view unavailable: {0}")]
    GraphicsUnavailable(#[source] RenderError),
}

/// Single pending "next frame" request. Rendering a frame consumes it; an
/// active session re-requests after every frame.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    scheduled: bool,
}

impl FrameScheduler {
    pub fn request(&mut self) {
        self.scheduled = true;
    }

    pub fn cancel(&mut self) {
        self.scheduled = false;
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.scheduled)
    }
}

/// One mounted walkthrough: scene, camera, input, cart and graphics surface.
pub struct WalkthroughSession {
    config: SessionConfig,
    state: SessionState,
    viewport: Viewport,
    world: Option<SceneWorld>,
    camera: CameraState,
    controller: InputController,
    motion: MotionIntegrator,
    cart: CartSelection,
    textures: TextureQueue,
    scheduler: FrameScheduler,
    surface: Option<Box<dyn FrameSurface>>,
    events: Vec<SceneEvent>,
    draw_failure_reported: bool,
}

impl std::fmt::Debug for WalkthroughSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkthroughSession")
            .field("state", &self.state)
            .field("profile", &self.controller.profile())
            .field("viewport", &self.viewport)
            .field("camera", &self.camera)
            .field("cart_len", &self.cart.len())
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}

impl WalkthroughSession {
    pub fn new(config: SessionConfig) -> Self {
        let bounds = config.room.walk_bounds();
        Self {
            state: SessionState::Unmounted,
            viewport: Viewport::new(0, 0),
            world: None,
            camera: CameraState::new(&bounds),
            controller: InputController::new(config.profile, config.sensitivity),
            motion: MotionIntegrator::new(config.move_speed(config.profile), config.boundary_policy),
            cart: CartSelection::default(),
            textures: TextureQueue::new(),
            scheduler: FrameScheduler::default(),
            surface: None,
            events: Vec::new(),
            draw_failure_reported: false,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn world(&self) -> Option<&SceneWorld> {
        self.world.as_ref()
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn controller(&self) -> &InputController {
        &self.controller
    }

    pub fn intent(&self) -> &MovementIntent {
        self.controller.intent()
    }

    pub fn profile(&self) -> DeviceProfile {
        self.controller.profile()
    }

    pub fn cart(&self) -> &CartSelection {
        &self.cart
    }

    /// Catalog items in the cart, in the order they were added.
    pub fn cart_items(&self) -> Vec<&CatalogItem> {
        let Some(world) = self.world.as_ref() else {
            return Vec::new();
        };
        self.cart
            .items()
            .iter()
            .filter_map(|item| world.item(*item))
            .collect()
    }

    pub fn frame_scheduled(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn pending_textures(&self) -> usize {
        self.textures.len()
    }

    /// Builds the scene and acquires the graphics surface. On failure nothing
    /// stays registered or scheduled and the session is back to `Unmounted`.
    pub fn mount<F>(&mut self, items: Arc<[CatalogItem]>, viewport: Viewport, create_surface: F) -> Result<(), SessionError>
    where
        F: FnOnce(Viewport) -> Result<Box<dyn FrameSurface>, RenderError>,
    {
        if self.state != SessionState::Unmounted {
            return Err(SessionError::InvalidState {
                operation: "mount",
                state: self.state,
            });
        }
        self.state = SessionState::Mounting;

        let surface = match create_surface(viewport) {
            Ok(surface) => surface,
            Err(error) => {
                warn!(error = %error, "graphics_context_unavailable");
                self.state = SessionState::Unmounted;
                return Err(SessionError::GraphicsUnavailable(error));
            }
        };

        let build = build_scene(
            self.config.room,
            items,
            SceneLayout {
                cart_controls: self.config.cart_enabled,
            },
        );
        let panel_count = build.world.panels().count();
        let object_count = build.world.object_count();

        self.viewport = viewport;
        self.camera = CameraState::new(&self.config.room.walk_bounds());
        self.camera.set_viewport(viewport);
        self.cart = CartSelection::default();
        self.events.clear();
        self.draw_failure_reported = false;
        self.textures = TextureQueue::new();
        self.textures.enqueue(build.texture_requests);
        self.world = Some(build.world);
        self.surface = Some(surface);
        self.controller.set_viewport(viewport);
        self.controller.attach();
        self.motion = MotionIntegrator::new(
            self.config.move_speed(self.controller.profile()),
            self.config.boundary_policy,
        );
        self.scheduler.request();
        self.state = SessionState::Active;

        info!(
            panel_count,
            object_count,
            profile = %self.controller.profile(),
            cart_enabled = self.config.cart_enabled,
            width = viewport.width,
            height = viewport.height,
            "scene_mounted"
        );
        Ok(())
    }

    /// Cancels the next frame, unregisters listeners and releases the surface.
    pub fn unmount(&mut self) {
        if self.state == SessionState::Unmounted {
            return;
        }
        self.state = SessionState::Unmounting;
        self.scheduler.cancel();
        self.controller.detach();
        let dropped_textures = self.textures.cancel_all();
        self.surface = None;
        self.world = None;
        self.events.clear();
        self.state = SessionState::Unmounted;
        info!(
            cart_len = self.cart.len(),
            dropped_textures,
            "scene_unmounted"
        );
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        if !self.is_active() {
            return;
        }
        match self.controller.handle(event, &mut self.camera) {
            Some(InputSignal::Click(position)) => {
                self.click_at(position);
            }
            Some(InputSignal::ExitRequested) => {
                debug!("exit_requested");
                self.events.push(SceneEvent::ExitRequested);
            }
            None => {}
        }
    }

    /// Only the projection aspect and input layout follow the viewport.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_viewport(viewport);
        self.controller.set_viewport(viewport);
        if let Some(surface) = self.surface.as_mut() {
            if let Err(error) = surface.resize(viewport) {
                warn!(
                    error = %error,
                    width = viewport.width,
                    height = viewport.height,
                    "surface_resize_failed"
                );
            }
        }
    }

    /// Swaps device profile in place; camera and cart are kept.
    pub fn switch_profile(&mut self, profile: DeviceProfile) {
        if profile == self.controller.profile() {
            return;
        }
        let previous = self.controller.profile();
        self.controller.switch_profile(profile);
        self.motion.speed = self.config.move_speed(profile);
        info!(from = %previous, to = %profile, "device_profile_switched");
    }

    /// Clamped camera placement on the walk plane.
    pub fn set_camera_position(&mut self, x: f32, z: f32) {
        let bounds = self.config.room.walk_bounds();
        self.camera.set_position(x, z, &bounds);
    }

    /// One integration step: look steering always, displacement when intended.
    pub fn tick(&mut self) {
        if !self.is_active() {
            return;
        }
        self.controller.tick_look(&mut self.camera);
        let bounds = self.config.room.walk_bounds();
        self.motion
            .step(&mut self.camera, self.controller.intent(), &bounds);
    }

    pub fn pump_textures(&mut self, source: &mut dyn TextureSource, budget: usize) -> usize {
        if !self.is_active() {
            return 0;
        }
        match self.world.as_mut() {
            Some(world) => self.textures.pump(source, world, budget),
            None => 0,
        }
    }

    /// Draws the current camera and scene if a frame is scheduled, then
    /// schedules the next one. Draw failures are absorbed; a run of them is
    /// warned about once.
    pub fn render(&mut self) -> bool {
        if !self.is_active() || !self.scheduler.take() {
            return false;
        }
        let hud = HudState {
            profile: self.controller.profile(),
            cart_count: self.config.cart_enabled.then_some(self.cart.len()),
            touch_buttons: self.controller.touch_buttons(),
            held: *self.controller.intent(),
            pending_textures: self.textures.len(),
        };
        let result = match (self.world.as_ref(), self.surface.as_mut()) {
            (Some(world), Some(surface)) => {
                let view = FrameView {
                    world,
                    camera: &self.camera,
                    viewport: self.viewport,
                    hud,
                };
                Some(surface.draw(&view))
            }
            _ => None,
        };
        self.scheduler.request();
        match result {
            Some(Ok(())) => {
                self.draw_failure_reported = false;
                true
            }
            Some(Err(error)) => {
                if self.draw_failure_reported {
                    debug!(error = %error, "frame_draw_failed");
                } else {
                    self.draw_failure_reported = true;
                    warn!(error = %error, "frame_draw_failed");
                }
                false
            }
            None => false,
        }
    }

    /// Picks at a viewport pixel and applies the result.
    pub fn click_at(&mut self, screen_px: Vec2) -> PickOutcome {
        if !self.is_active() {
            return PickOutcome::Nothing;
        }
        let Some(world) = self.world.as_ref() else {
            return PickOutcome::Nothing;
        };
        let Some(ray) = self.camera.screen_ray(screen_px, self.viewport) else {
            return PickOutcome::Nothing;
        };
        let hit = pick_nearest(world, &ray);
        let outcome = resolve_pick(hit.as_ref(), self.config.cart_enabled);
        match outcome {
            PickOutcome::AddToCart(item_ref) => {
                if let Some(item) = world.item(item_ref) {
                    self.cart.push(item_ref);
                    info!(
                        item = %item.name,
                        cart_len = self.cart.len(),
                        "item_added_to_cart"
                    );
                    self.events.push(SceneEvent::ItemAddedToCart(item.clone()));
                }
            }
            PickOutcome::Select(item_ref) => {
                if let Some(item) = world.item(item_ref) {
                    debug!(item = %item.name, "item_selected");
                    self.events.push(SceneEvent::ItemSelected(item.clone()));
                }
            }
            PickOutcome::Nothing => {}
        }
        outcome
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Drop for WalkthroughSession {
    fn drop(&mut self) {
        self.unmount();
    }
}
