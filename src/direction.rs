//! Facing direction.
//!
//! The unit always faces left or right. Only the [`DirectionManager`] changes
//! the facing, and only while the current state allows turning around (unless
//! a state forces it).

use bevy::prelude::*;

use crate::state::UnitState;

/// Signed horizontal facing.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Right,
    Left,
}

impl Direction {
    /// `+1.0` for right, `-1.0` for left.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Right => 1.0,
            Direction::Left => -1.0,
        }
    }

    /// Unit vector pointing in the facing direction.
    #[inline]
    pub fn vector(self) -> Vec2 {
        Vec2::new(self.sign(), 0.0)
    }

    /// The opposite facing.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
        }
    }

    /// Facing selected by a horizontal input value. Zero counts as right.
    #[inline]
    pub fn from_input(x: f32) -> Self {
        if x < 0.0 {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Check whether a nonzero horizontal value points the same way.
    #[inline]
    pub fn agrees_with(self, x: f32) -> bool {
        x != 0.0 && x.signum() == self.sign()
    }

    /// Visual rotation for this facing: identity or half a turn about Y.
    pub fn rotation(self) -> Quat {
        match self {
            Direction::Right => Quat::IDENTITY,
            Direction::Left => Quat::from_rotation_y(std::f32::consts::PI),
        }
    }
}

/// Owns the unit's facing and the list of states that may turn around.
#[derive(Reflect, Debug, Clone)]
pub struct DirectionManager {
    current: Direction,
    /// States in which input may flip the facing. Empty means every state.
    rotatable_states: Vec<UnitState>,
}

impl Default for DirectionManager {
    fn default() -> Self {
        Self::new(Direction::Right, Self::default_rotatable_states())
    }
}

impl DirectionManager {
    /// Create a manager with an initial facing and rotation gating list.
    pub fn new(initial: Direction, rotatable_states: Vec<UnitState>) -> Self {
        Self {
            current: initial,
            rotatable_states,
        }
    }

    /// States that may turn around out of the box.
    pub fn default_rotatable_states() -> Vec<UnitState> {
        vec![
            UnitState::Idle,
            UnitState::Walk,
            UnitState::Run,
            UnitState::Jump,
            UnitState::JumpSecond,
            UnitState::Fall,
            UnitState::Attack,
            UnitState::Hide,
        ]
    }

    /// Current facing.
    #[inline]
    pub fn current(&self) -> Direction {
        self.current
    }

    /// Check whether `state` may flip the facing from input.
    pub fn can_rotate_in(&self, state: UnitState) -> bool {
        self.rotatable_states.is_empty() || self.rotatable_states.contains(&state)
    }

    /// Face the direction of `move_x` when it is nonzero and `state` allows it.
    ///
    /// Returns `true` if the facing changed.
    pub fn update_direction(&mut self, move_x: f32, state: UnitState) -> bool {
        if move_x == 0.0 || !self.can_rotate_in(state) {
            return false;
        }
        self.set_direction(Direction::from_input(move_x))
    }

    /// Face the direction of `move_x` regardless of state. Zero faces right.
    pub fn update_direction_forced(&mut self, move_x: f32) -> bool {
        self.set_direction(Direction::from_input(move_x))
    }

    /// Set the facing. Returns `true` if it changed.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if direction == self.current {
            return false;
        }
        self.current = direction;
        true
    }

    /// Turn around.
    pub fn reverse_direction(&mut self) {
        self.current = self.current.reversed();
    }
}
