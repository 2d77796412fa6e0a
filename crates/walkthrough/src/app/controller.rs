use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use tracing::debug;
use winit::keyboard::KeyCode;

use super::camera::CameraState;
use super::input::{LookDelta, MoveAction, MovementIntent};
use super::motion::{DESKTOP_MOVE_SPEED, MOBILE_MOVE_SPEED};
use super::rendering::transform::Viewport;

/// Press-release travel (pixels) under which a gesture still counts as a click.
pub const CLICK_SLOP_PX: f32 = 6.0;
/// Viewports narrower than this pick the mobile profile in auto mode.
pub const MOBILE_BREAKPOINT_PX: u32 = 800;

pub const TOUCH_BUTTON_SIZE_PX: f32 = 60.0;
pub const TOUCH_BUTTON_MARGIN_PX: f32 = 10.0;
pub const TOUCH_BUTTON_BOTTOM_PX: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    /// Keyboard movement, look while the primary button is held.
    Desktop,
    /// Keyboard movement, look steered by the pointer's offset from center.
    DesktopContinuous,
    /// On-screen movement buttons, swipe to look.
    Mobile,
}

impl DeviceProfile {
    pub fn listeners(self) -> &'static [ListenerKind] {
        match self {
            DeviceProfile::Desktop | DeviceProfile::DesktopContinuous => {
                &[ListenerKind::Keyboard, ListenerKind::Pointer]
            }
            DeviceProfile::Mobile => &[
                ListenerKind::Keyboard,
                ListenerKind::Touch,
                ListenerKind::TouchButtons,
            ],
        }
    }

    pub fn default_move_speed(self) -> f32 {
        match self {
            DeviceProfile::Desktop | DeviceProfile::DesktopContinuous => DESKTOP_MOVE_SPEED,
            DeviceProfile::Mobile => MOBILE_MOVE_SPEED,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceProfile::Desktop => "desktop",
            DeviceProfile::DesktopContinuous => "desktop-continuous",
            DeviceProfile::Mobile => "mobile",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either a fixed profile or one picked from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSelection {
    Fixed(DeviceProfile),
    Auto,
}

impl Default for ProfileSelection {
    fn default() -> Self {
        ProfileSelection::Fixed(DeviceProfile::Desktop)
    }
}

impl ProfileSelection {
    pub fn resolve(self, viewport: Viewport) -> DeviceProfile {
        match self {
            ProfileSelection::Fixed(profile) => profile,
            ProfileSelection::Auto if viewport.width < MOBILE_BREAKPOINT_PX => DeviceProfile::Mobile,
            ProfileSelection::Auto => DeviceProfile::Desktop,
        }
    }

    pub fn follows_viewport(self) -> bool {
        matches!(self, ProfileSelection::Auto)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProfile(pub String);

impl fmt::Display for UnknownProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown device profile `{}` (expected desktop, desktop-continuous, mobile or auto)",
            self.0
        )
    }
}

impl std::error::Error for UnknownProfile {}

impl FromStr for ProfileSelection {
    type Err = UnknownProfile;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(ProfileSelection::Fixed(DeviceProfile::Desktop)),
            "desktop-continuous" | "continuous" => {
                Ok(ProfileSelection::Fixed(DeviceProfile::DesktopContinuous))
            }
            "mobile" => Ok(ProfileSelection::Fixed(DeviceProfile::Mobile)),
            "auto" => Ok(ProfileSelection::Auto),
            _ => Err(UnknownProfile(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Keyboard,
    Pointer,
    Touch,
    TouchButtons,
}

impl ListenerKind {
    const fn index(self) -> usize {
        match self {
            ListenerKind::Keyboard => 0,
            ListenerKind::Pointer => 1,
            ListenerKind::Touch => 2,
            ListenerKind::TouchButtons => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerSet {
    registered: [bool; 4],
}

impl ListenerSet {
    pub fn contains(&self, kind: ListenerKind) -> bool {
        self.registered[kind.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.registered.iter().any(|registered| *registered)
    }

    pub fn len(&self) -> usize {
        self.registered.iter().filter(|registered| **registered).count()
    }

    fn register(&mut self, kind: ListenerKind) {
        self.registered[kind.index()] = true;
    }

    fn clear(&mut self) {
        self.registered = [false; 4];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

/// Host input normalized to viewport pixels (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { code: KeyCode, pressed: bool },
    PointerDown { button: PointerButton, position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp { button: PointerButton, position: Vec2 },
    PointerLeave,
    TouchStart { id: u64, position: Vec2 },
    TouchMove { id: u64, position: Vec2 },
    TouchEnd { id: u64, position: Vec2 },
    TouchCancel { id: u64 },
    FocusLost,
}

/// Discrete outcomes of an input event, handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSignal {
    Click(Vec2),
    ExitRequested,
}

pub fn key_action(code: KeyCode) -> Option<MoveAction> {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(MoveAction::Advance),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(MoveAction::Retreat),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(MoveAction::StrafeLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(MoveAction::StrafeRight),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookSensitivity {
    /// Radians of yaw per pixel of drag/swipe.
    pub yaw_per_px: f32,
    /// Radians of pitch per pixel of drag/swipe.
    pub pitch_per_px: f32,
    /// Radians per pixel of center offset, applied every tick in continuous mode.
    pub continuous_per_px: f32,
    /// Center offset (pixels) ignored in continuous mode.
    pub continuous_dead_zone_px: f32,
}

impl Default for LookSensitivity {
    fn default() -> Self {
        Self {
            yaw_per_px: 0.005,
            pitch_per_px: 0.003,
            continuous_per_px: 0.000_05,
            continuous_dead_zone_px: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchButton {
    pub action: MoveAction,
    pub center: Vec2,
    pub radius: f32,
}

impl TouchButton {
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// Four round buttons in one row, centered horizontally near the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchButtonLayout {
    buttons: [TouchButton; 4],
}

impl TouchButtonLayout {
    pub const ORDER: [MoveAction; 4] = [
        MoveAction::Advance,
        MoveAction::Retreat,
        MoveAction::StrafeLeft,
        MoveAction::StrafeRight,
    ];

    pub fn for_viewport(viewport: Viewport) -> Self {
        let slot = TOUCH_BUTTON_SIZE_PX + TOUCH_BUTTON_MARGIN_PX * 2.0;
        let row_left = (viewport.width as f32 - slot * Self::ORDER.len() as f32) * 0.5;
        let radius = TOUCH_BUTTON_SIZE_PX * 0.5;
        let center_y = viewport.height as f32 - TOUCH_BUTTON_BOTTOM_PX - TOUCH_BUTTON_MARGIN_PX - radius;
        let buttons = std::array::from_fn(|column| TouchButton {
            action: Self::ORDER[column],
            center: Vec2::new(row_left + slot * (column as f32 + 0.5), center_y),
            radius,
        });
        Self { buttons }
    }

    pub fn buttons(&self) -> &[TouchButton; 4] {
        &self.buttons
    }

    pub fn hit(&self, point: Vec2) -> Option<MoveAction> {
        self.buttons
            .iter()
            .find(|button| button.contains(point))
            .map(|button| button.action)
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    origin: Vec2,
    last: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct TouchLook {
    id: u64,
    origin: Vec2,
    yaw: f32,
    pitch: f32,
    max_travel: f32,
}

/// Turns host input events into movement flags and camera look updates for one
/// device profile. Events for listener kinds that are not registered are dropped.
#[derive(Debug)]
pub struct InputController {
    profile: DeviceProfile,
    sensitivity: LookSensitivity,
    listeners: ListenerSet,
    viewport: Viewport,
    intent: MovementIntent,
    look: LookDelta,
    drag: Option<DragState>,
    hover: Option<Vec2>,
    look_touch: Option<TouchLook>,
    button_touches: Vec<(u64, MoveAction)>,
    escape_down: bool,
}

impl InputController {
    pub fn new(profile: DeviceProfile, sensitivity: LookSensitivity) -> Self {
        Self {
            profile,
            sensitivity,
            listeners: ListenerSet::default(),
            viewport: Viewport::new(0, 0),
            intent: MovementIntent::none(),
            look: LookDelta::ZERO,
            drag: None,
            hover: None,
            look_touch: None,
            button_touches: Vec::new(),
            escape_down: false,
        }
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn intent(&self) -> &MovementIntent {
        &self.intent
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Registers the listener set of the current profile.
    pub fn attach(&mut self) {
        self.listeners.clear();
        for kind in self.profile.listeners() {
            self.listeners.register(*kind);
        }
        debug!(
            profile = %self.profile,
            listener_count = self.listeners.len(),
            "input_listeners_attached"
        );
    }

    /// Unregisters every listener and drops held flags and in-flight gestures.
    pub fn detach(&mut self) {
        self.listeners.clear();
        self.reset_transient();
        debug!(profile = %self.profile, "input_listeners_detached");
    }

    /// Swaps the profile; listeners are re-registered only if currently attached.
    pub fn switch_profile(&mut self, profile: DeviceProfile) {
        if profile == self.profile {
            return;
        }
        let attached = self.is_attached();
        self.detach();
        self.profile = profile;
        if attached {
            self.attach();
        }
    }

    pub fn touch_buttons(&self) -> Option<TouchButtonLayout> {
        self.listeners
            .contains(ListenerKind::TouchButtons)
            .then(|| TouchButtonLayout::for_viewport(self.viewport))
    }

    fn reset_transient(&mut self) {
        self.intent.clear();
        self.look = LookDelta::ZERO;
        self.drag = None;
        self.hover = None;
        self.look_touch = None;
        self.button_touches.clear();
        self.escape_down = false;
    }

    pub fn handle(&mut self, event: &InputEvent, camera: &mut CameraState) -> Option<InputSignal> {
        let signal = match *event {
            InputEvent::Key { code, pressed } => self.on_key(code, pressed),
            InputEvent::FocusLost => {
                if self.is_attached() {
                    self.intent.clear();
                    self.drag = None;
                    self.escape_down = false;
                }
                None
            }
            InputEvent::PointerDown { button, position } => self.on_pointer_down(button, position),
            InputEvent::PointerMove { position } => self.on_pointer_move(position),
            InputEvent::PointerUp { button, position } => self.on_pointer_up(button, position),
            InputEvent::PointerLeave => {
                if self.listeners.contains(ListenerKind::Pointer) {
                    self.drag = None;
                    self.hover = None;
                }
                None
            }
            InputEvent::TouchStart { id, position } => self.on_touch_start(id, position, camera),
            InputEvent::TouchMove { id, position } => self.on_touch_move(id, position, camera),
            InputEvent::TouchEnd { id, position } => self.on_touch_end(id, Some(position)),
            InputEvent::TouchCancel { id } => self.on_touch_end(id, None),
        };
        let look = self.look.take();
        if !look.is_zero() {
            camera.apply_look(look);
        }
        signal
    }

    /// Per-tick look steering for the continuous profile.
    pub fn tick_look(&mut self, camera: &mut CameraState) {
        if self.profile != DeviceProfile::DesktopContinuous
            || !self.listeners.contains(ListenerKind::Pointer)
            || self.viewport.is_empty()
        {
            return;
        }
        let Some(pointer) = self.hover else {
            return;
        };
        let offset = pointer - self.viewport.center_px();
        let dead_zone = self.sensitivity.continuous_dead_zone_px;
        let steer = |value: f32| {
            if value.abs() <= dead_zone {
                0.0
            } else {
                value - dead_zone * value.signum()
            }
        };
        let delta = LookDelta::new(
            -steer(offset.x) * self.sensitivity.continuous_per_px,
            -steer(offset.y) * self.sensitivity.continuous_per_px,
        );
        if !delta.is_zero() {
            camera.apply_look(delta);
        }
    }

    fn on_key(&mut self, code: KeyCode, pressed: bool) -> Option<InputSignal> {
        if !self.listeners.contains(ListenerKind::Keyboard) {
            return None;
        }
        if code == KeyCode::Escape {
            let first_press = pressed && !self.escape_down;
            self.escape_down = pressed;
            return first_press.then_some(InputSignal::ExitRequested);
        }
        if let Some(action) = key_action(code) {
            self.intent.set(action, pressed);
        }
        None
    }

    fn on_pointer_down(&mut self, button: PointerButton, position: Vec2) -> Option<InputSignal> {
        if !self.listeners.contains(ListenerKind::Pointer) || button != PointerButton::Primary {
            return None;
        }
        match self.profile {
            DeviceProfile::DesktopContinuous => {
                self.hover = Some(position);
                Some(InputSignal::Click(position))
            }
            _ => {
                self.drag = Some(DragState {
                    origin: position,
                    last: position,
                });
                None
            }
        }
    }

    fn on_pointer_move(&mut self, position: Vec2) -> Option<InputSignal> {
        if !self.listeners.contains(ListenerKind::Pointer) {
            return None;
        }
        match self.profile {
            DeviceProfile::DesktopContinuous => self.hover = Some(position),
            _ => {
                if let Some(drag) = self.drag.as_mut() {
                    let delta = position - drag.last;
                    drag.last = position;
                    self.look.accumulate(LookDelta::new(
                        -delta.x * self.sensitivity.yaw_per_px,
                        -delta.y * self.sensitivity.pitch_per_px,
                    ));
                }
            }
        }
        None
    }

    fn on_pointer_up(&mut self, button: PointerButton, position: Vec2) -> Option<InputSignal> {
        if !self.listeners.contains(ListenerKind::Pointer) || button != PointerButton::Primary {
            return None;
        }
        let drag = self.drag.take()?;
        (drag.origin.distance(position) <= CLICK_SLOP_PX).then_some(InputSignal::Click(position))
    }

    fn on_touch_start(&mut self, id: u64, position: Vec2, camera: &CameraState) -> Option<InputSignal> {
        if self.listeners.contains(ListenerKind::TouchButtons) {
            if let Some(action) = TouchButtonLayout::for_viewport(self.viewport).hit(position) {
                self.button_touches.retain(|(touch, _)| *touch != id);
                self.button_touches.push((id, action));
                self.intent.set(action, true);
                return None;
            }
        }
        if !self.listeners.contains(ListenerKind::Touch) || self.look_touch.is_some() {
            return None;
        }
        self.look_touch = Some(TouchLook {
            id,
            origin: position,
            yaw: camera.yaw(),
            pitch: camera.pitch(),
            max_travel: 0.0,
        });
        None
    }

    fn on_touch_move(&mut self, id: u64, position: Vec2, camera: &mut CameraState) -> Option<InputSignal> {
        if !self.listeners.contains(ListenerKind::Touch) {
            return None;
        }
        let Some(touch) = self.look_touch.as_mut().filter(|touch| touch.id == id) else {
            return None;
        };
        let offset = position - touch.origin;
        touch.max_travel = touch.max_travel.max(offset.length());
        camera.set_orientation(
            touch.yaw - offset.x * self.sensitivity.yaw_per_px,
            touch.pitch - offset.y * self.sensitivity.pitch_per_px,
        );
        None
    }

    fn on_touch_end(&mut self, id: u64, position: Option<Vec2>) -> Option<InputSignal> {
        if let Some(index) = self.button_touches.iter().position(|(touch, _)| *touch == id) {
            let (_, action) = self.button_touches.remove(index);
            if !self.button_touches.iter().any(|(_, held)| *held == action) {
                self.intent.set(action, false);
            }
            return None;
        }
        let touch = self.look_touch.filter(|touch| touch.id == id)?;
        self.look_touch = None;
        let position = position?;
        let travel = touch.max_travel.max(position.distance(touch.origin));
        (travel <= CLICK_SLOP_PX).then_some(InputSignal::Click(position))
    }
}
