#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveAction {
    Advance,
    Retreat,
    StrafeLeft,
    StrafeRight,
}

const ACTION_COUNT: usize = 4;

impl MoveAction {
    pub const ALL: [MoveAction; ACTION_COUNT] = [
        MoveAction::Advance,
        MoveAction::Retreat,
        MoveAction::StrafeLeft,
        MoveAction::StrafeRight,
    ];

    const fn index(self) -> usize {
        match self {
            MoveAction::Advance => 0,
            MoveAction::Retreat => 1,
            MoveAction::StrafeLeft => 2,
            MoveAction::StrafeRight => 3,
        }
    }
}

/// Held movement flags. Written by the input controller, read by the integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntent {
    down: [bool; ACTION_COUNT],
}

impl MovementIntent {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: MoveAction, is_down: bool) -> Self {
        self.set(action, is_down);
        self
    }

    pub fn set(&mut self, action: MoveAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: MoveAction) -> bool {
        self.down[action.index()]
    }

    pub fn any(&self) -> bool {
        self.down.iter().any(|down| *down)
    }

    pub fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

/// Yaw/pitch change in radians accumulated since the last time it was consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookDelta {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookDelta {
    pub const ZERO: LookDelta = LookDelta {
        yaw: 0.0,
        pitch: 0.0,
    };

    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    pub fn is_zero(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0
    }

    pub fn accumulate(&mut self, other: LookDelta) {
        self.yaw += other.yaw;
        self.pitch += other.pitch;
    }

    pub fn take(&mut self) -> LookDelta {
        std::mem::take(self)
    }
}
