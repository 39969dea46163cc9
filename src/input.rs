//! Unit input.
//!
//! The core consumes a normalized input snapshot plus discrete press/release
//! actions. Gameplay code feeds it either by sending [`UnitInputEvent`]s or by
//! writing a [`UnitIntent`] component every frame, which is diffed against the
//! previous frame and turned into actions.

use bevy::prelude::*;

/// Latched input state read by state decision steps.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSnapshot {
    /// Effective move vector. States may override it (wall jumps clear it).
    pub move_input: Vec2,
    /// Last move vector reported by the input source.
    pub device_move: Vec2,
    /// Run button held.
    pub run: bool,
    /// Crouch button held.
    pub crouch: bool,
    /// Jump button held.
    pub jump: bool,
}

impl InputSnapshot {
    /// Horizontal dead zone used when choosing a follow-up state.
    pub const FOLLOW_UP_DEAD_ZONE: f32 = 0.1;

    /// Check whether there is any horizontal input.
    #[inline]
    pub fn has_horizontal(&self) -> bool {
        self.move_input.x != 0.0
    }

    /// Check whether the horizontal input leaves the follow-up dead zone.
    #[inline]
    pub fn has_horizontal_beyond_dead_zone(&self) -> bool {
        self.move_input.x.abs() > Self::FOLLOW_UP_DEAD_ZONE
    }

    /// Check whether the stick is held fully down.
    #[inline]
    pub fn is_holding_down(&self) -> bool {
        self.move_input.y <= -1.0 + f32::EPSILON
    }

    /// Record a move vector reported by the input source.
    pub fn set_move(&mut self, value: Vec2) {
        self.move_input = value;
        self.device_move = value;
    }

    /// Zero the effective move vector until the next report or resync.
    pub fn clear_move(&mut self) {
        self.move_input = Vec2::ZERO;
    }

    /// Restore the effective move vector from the last reported value.
    pub fn resync_move(&mut self) {
        self.move_input = self.device_move;
    }
}

/// A discrete input change forwarded to the current state.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// Move vector changed.
    Move(Vec2),
    /// Run pressed (`true`) or released.
    Run(bool),
    /// Crouch pressed (`true`) or released.
    Crouch(bool),
    /// Jump pressed (`true`) or released.
    Jump(bool),
}

/// Input action addressed to one unit.
#[derive(Event, Debug, Clone, Copy)]
pub struct UnitInputEvent {
    pub entity: Entity,
    pub action: InputAction,
}

impl UnitInputEvent {
    /// Create an input event.
    pub fn new(entity: Entity, action: InputAction) -> Self {
        Self { entity, action }
    }
}

/// Per-frame desired input written by gameplay code or AI.
///
/// A system compares it with the previous frame and forwards every change as
/// an [`InputAction`], so callers only need to set the current values.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use unit_locomotion::prelude::*;
///
/// let mut intent = UnitIntent::default();
/// intent.set_move(Vec2::new(1.0, 0.0));
/// intent.set_run(true);
///
/// let actions = intent.take_changes();
/// assert_eq!(actions.len(), 2);
/// assert!(intent.take_changes().is_empty());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct UnitIntent {
    /// Desired move vector, each axis within -1..=1.
    pub move_input: Vec2,
    pub run: bool,
    pub crouch: bool,
    pub jump: bool,
    /// Values already forwarded.
    pub(crate) previous: InputSnapshot,
}

impl UnitIntent {
    /// Set the move vector, clamped to -1..=1 per axis.
    pub fn set_move(&mut self, value: Vec2) {
        self.move_input = value.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    pub fn set_run(&mut self, held: bool) {
        self.run = held;
    }

    pub fn set_crouch(&mut self, held: bool) {
        self.crouch = held;
    }

    pub fn set_jump(&mut self, held: bool) {
        self.jump = held;
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.move_input = Vec2::ZERO;
        self.run = false;
        self.crouch = false;
        self.jump = false;
    }

    /// Collect the actions needed to bring the unit up to date.
    ///
    /// Button changes come first so that a move reported in the same frame
    /// sees the new button state.
    pub fn take_changes(&mut self) -> Vec<InputAction> {
        let mut actions = Vec::new();
        if self.run != self.previous.run {
            actions.push(InputAction::Run(self.run));
        }
        if self.crouch != self.previous.crouch {
            actions.push(InputAction::Crouch(self.crouch));
        }
        if self.move_input != self.previous.move_input {
            actions.push(InputAction::Move(self.move_input));
        }
        if self.jump != self.previous.jump {
            actions.push(InputAction::Jump(self.jump));
        }
        self.previous = InputSnapshot {
            move_input: self.move_input,
            device_move: self.move_input,
            run: self.run,
            crouch: self.crouch,
            jump: self.jump,
        };
        actions
    }
}
