use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use crate::catalog::{CatalogError, CatalogItem};
use crate::StartupError;

use super::controller::{InputEvent, PointerButton, ProfileSelection};
use super::metrics::{MetricsAccumulator, MetricsHandle};
use super::rendering::transform::Viewport;
use super::rendering::{FrameSurface, RenderError, Renderer};
use super::session::{SceneEvent, SessionConfig, SessionError, WalkthroughSession};
use super::textures::TextureSource;

/// How often the motion integrator runs relative to rendered frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPacing {
    /// One integration step per rendered frame; speed follows the frame rate.
    #[default]
    PerFrame,
    /// Fixed-step integration decoupled from the frame rate.
    Fixed { ticks_per_second: u32 },
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub tick_pacing: TickPacing,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub max_render_fps: Option<u32>,
    pub metrics_log_interval: Duration,
    pub texture_loads_per_frame: usize,
    pub profile_selection: ProfileSelection,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Virtual Mall".to_string(),
            window_width: 1280,
            window_height: 720,
            tick_pacing: TickPacing::default(),
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            max_render_fps: None,
            metrics_log_interval: Duration::from_secs(5),
            texture_loads_per_frame: 1,
            profile_selection: ProfileSelection::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("3D view unavailable: {0}")]
    GraphicsUnavailable(#[source] RenderError),
    #[error(transparent)]
    Session(SessionError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::GraphicsUnavailable(source) => AppError::GraphicsUnavailable(source),
            other => AppError::Session(other),
        }
    }
}

/// Receives scene events as soon as the session emits them.
pub trait SceneEventSink {
    fn on_scene_event(&mut self, event: &SceneEvent);
}

/// Everything the host supplies to the scene.
pub struct SceneHost {
    pub items: Arc<[CatalogItem]>,
    pub textures: Box<dyn TextureSource>,
    pub events: Box<dyn SceneEventSink>,
}

pub fn run_app(config: LoopConfig, session_config: SessionConfig, host: SceneHost) -> Result<(), AppError> {
    run_app_with_metrics(config, session_config, host, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut session_config: SessionConfig,
    host: SceneHost,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let SceneHost {
        items,
        mut textures,
        mut events,
    } = host;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let size = window.inner_size();
    let initial_viewport = Viewport::new(size.width, size.height);
    session_config.profile = config.profile_selection.resolve(initial_viewport);

    let mut session = WalkthroughSession::new(session_config);
    let window_for_surface = Arc::clone(&window);
    session.mount(items, initial_viewport, move |_| {
        Renderer::new(window_for_surface).map(|renderer| Box::new(renderer) as Box<dyn FrameSurface>)
    })?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let max_frame_delta = normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let fixed_dt = match config.tick_pacing {
        TickPacing::PerFrame => None,
        TickPacing::Fixed { ticks_per_second } => {
            Some(Duration::from_secs_f64(1.0 / ticks_per_second.max(1) as f64))
        }
    };
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let texture_budget = config.texture_loads_per_frame.max(1);
    let profile_selection = config.profile_selection;

    info!(
        tick_pacing = ?config.tick_pacing,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        texture_budget,
        profile_selection = ?profile_selection,
        "loop_config"
    );

    let mut pointer = PointerTracker::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, Instant::now());

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        let viewport = Viewport::new(new_size.width, new_size.height);
                        session.resize(viewport);
                        if profile_selection.follows_viewport() && !viewport.is_empty() {
                            session.switch_profile(profile_selection.resolve(viewport));
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window.inner_size();
                        session.resize(Viewport::new(size.width, size.height));
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let ticks = match fixed_dt {
                            None => 1,
                            Some(fixed_dt) => {
                                accumulator = accumulator
                                    .saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                                let plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                                accumulator = plan.remaining_accumulator;
                                if plan.dropped_backlog > Duration::ZERO {
                                    warn!(
                                        dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                                        max_ticks_per_frame, "sim_clamp_triggered"
                                    );
                                }
                                plan.ticks_to_run
                            }
                        };
                        for _ in 0..ticks {
                            session.tick();
                        }
                        metrics_accumulator.record_ticks(ticks);
                        session.pump_textures(textures.as_mut(), texture_budget);

                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep = compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        session.render();
                        last_present_instant = Instant::now();
                        metrics_accumulator.record_frame(raw_frame_dt);

                        let pending_textures = session.pending_textures();
                        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now, pending_textures) {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                pending_textures,
                                cart_len = session.cart().len(),
                                "loop_metrics"
                            );
                        }
                    }
                    other => {
                        if let Some(input) = pointer.translate(&other) {
                            session.handle_input(&input);
                        }
                    }
                }
                forward_scene_events(&mut session, events.as_mut(), window_target);
            }
            Event::AboutToWait => {
                if session.frame_scheduled() {
                    window.request_redraw();
                }
            }
            Event::LoopExiting => {
                session.unmount();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn forward_scene_events(
    session: &mut WalkthroughSession,
    sink: &mut dyn SceneEventSink,
    window_target: &EventLoopWindowTarget<()>,
) {
    for event in session.drain_events() {
        sink.on_scene_event(&event);
        if event == SceneEvent::ExitRequested {
            info!(reason = "exit_requested", "shutdown_requested");
            window_target.exit();
        }
    }
}

/// Maps winit window events onto scene input. Mouse buttons carry no position
/// in winit, so the last cursor position is remembered here.
#[derive(Debug, Default)]
struct PointerTracker {
    cursor: Option<Vec2>,
}

impl PointerTracker {
    fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => Some(InputEvent::Key {
                    code,
                    pressed: event.state == ElementState::Pressed,
                }),
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.cursor = Some(position);
                Some(InputEvent::PointerMove { position })
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                Some(InputEvent::PointerLeave)
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let position = self.cursor?;
                let button = pointer_button(*button);
                Some(match state {
                    ElementState::Pressed => InputEvent::PointerDown { button, position },
                    ElementState::Released => InputEvent::PointerUp { button, position },
                })
            }
            WindowEvent::Touch(touch) => Some(touch_event(
                touch.phase,
                touch.id,
                Vec2::new(touch.location.x as f32, touch.location.y as f32),
            )),
            WindowEvent::Focused(false) => Some(InputEvent::FocusLost),
            _ => None,
        }
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

fn touch_event(phase: TouchPhase, id: u64, position: Vec2) -> InputEvent {
    match phase {
        TouchPhase::Started => InputEvent::TouchStart { id, position },
        TouchPhase::Moved => InputEvent::TouchMove { id, position },
        TouchPhase::Ended => InputEvent::TouchEnd { id, position },
        TouchPhase::Cancelled => InputEvent::TouchCancel { id },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_long_stalls() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_secs(3), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_keeps_remainder() {
        let plan = plan_sim_steps(Duration::from_millis(40), Duration::from_millis(16), 5);
        assert_eq!(plan.ticks_to_run, 2);
        assert_eq!(plan.remaining_accumulator, Duration::from_millis(8));
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_past_tick_cap() {
        let plan = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn render_cap_zero_means_uncapped() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(30)), Some(30));
        assert_eq!(format_render_cap(None), "off");
    }

    #[test]
    fn cap_sleep_only_covers_remaining_budget() {
        let target = target_frame_duration(Some(50));
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(5), target),
            Duration::from_millis(15)
        );
        assert_eq!(compute_cap_sleep(Duration::from_millis(25), target), Duration::ZERO);
        assert_eq!(compute_cap_sleep(Duration::from_millis(1), None), Duration::ZERO);
    }

    #[test]
    fn mouse_buttons_map_to_pointer_buttons() {
        assert_eq!(pointer_button(MouseButton::Left), PointerButton::Primary);
        assert_eq!(pointer_button(MouseButton::Right), PointerButton::Secondary);
        assert_eq!(pointer_button(MouseButton::Middle), PointerButton::Other);
    }

    #[test]
    fn touch_phases_map_to_touch_events() {
        let position = Vec2::new(3.0, 4.0);
        assert_eq!(
            touch_event(TouchPhase::Started, 7, position),
            InputEvent::TouchStart { id: 7, position }
        );
        assert_eq!(
            touch_event(TouchPhase::Ended, 7, position),
            InputEvent::TouchEnd { id: 7, position }
        );
        assert_eq!(
            touch_event(TouchPhase::Cancelled, 7, position),
            InputEvent::TouchCancel { id: 7 }
        );
    }

    #[test]
    fn focus_loss_translates_and_focus_gain_does_not() {
        let mut tracker = PointerTracker::default();
        assert_eq!(tracker.translate(&WindowEvent::Focused(false)), Some(InputEvent::FocusLost));
        assert_eq!(tracker.translate(&WindowEvent::Focused(true)), None);
        assert!(tracker.cursor.is_none());
    }

    #[test]
    fn graphics_session_errors_become_graphics_unavailable() {
        let error = AppError::from(SessionError::GraphicsUnavailable(RenderError::ContextUnavailable {
            reason: "headless".to_string(),
        }));
        assert!(matches!(error, AppError::GraphicsUnavailable(_)));
        assert!(error.to_string().starts_with("3D view unavailable"));
    }

    #[test]
    fn default_loop_config_paces_per_frame() {
        let config = LoopConfig::default();
        assert_eq!(config.tick_pacing, TickPacing::PerFrame);
        assert_eq!(config.profile_selection, ProfileSelection::default());
        assert!(config.texture_loads_per_frame >= 1);
    }
}
