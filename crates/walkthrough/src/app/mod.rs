mod camera;
mod controller;
mod input;
mod loop_runner;
mod metrics;
mod motion;
mod picking;
mod rendering;
mod scene;
mod session;
mod textures;

pub use camera::{clamp_pitch, CameraState, Projection, EYE_HEIGHT, PITCH_LIMIT, START_POSITION};
pub use controller::{
    key_action, DeviceProfile, InputController, InputEvent, InputSignal, ListenerKind, ListenerSet,
    LookSensitivity, PointerButton, ProfileSelection, TouchButton, TouchButtonLayout, UnknownProfile,
    CLICK_SLOP_PX, MOBILE_BREAKPOINT_PX,
};
pub use input::{LookDelta, MoveAction, MovementIntent};
pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, LoopConfig, SceneEventSink, SceneHost, TickPacing,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use motion::{
    world_displacement, BoundaryPolicy, MotionIntegrator, DESKTOP_MOVE_SPEED, MOBILE_MOVE_SPEED,
};
pub use picking::{pick_nearest, resolve_pick, CartSelection, PickHit, PickOutcome, Ray};
pub use rendering::transform::{world_to_screen_px, Viewport};
pub use rendering::{
    controls_hint, draw_frame, FrameSurface, FrameView, HudState, Rasterizer, RenderError, Renderer,
};
pub use scene::{
    build_scene, ItemRef, Quad, RoomSpec, RoomSpecError, SceneBuild, SceneLayout, SceneObject,
    SceneObjectId, SceneObjectKind, SceneWorld, SurfaceKind, WalkBounds, WALL_MARGIN,
};
pub use session::{
    SceneEvent, SessionConfig, SessionError, SessionState, WalkthroughSession,
};
pub use textures::{
    normalize_image_ref, FileTextureSource, Texture, TextureLoadError, TextureSlot, TextureSource,
};
