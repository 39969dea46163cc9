//! Animation plumbing.
//!
//! The core never plays clips. It issues trigger and parameter commands
//! through [`AnimatorCommands`] and reacts to [`AnimationSignal`]s reported by
//! whatever plays the clips. States receive a signal only while they are
//! current and only if they subscribed to it in `enter`.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::state::UnitState;

/// Animator clip, trigger and parameter names used by the built-in states.
pub mod names {
    pub const IDLE: &str = "Idle";
    pub const WALK: &str = "Walk";
    pub const FALL: &str = "Fall";
    pub const LAND: &str = "Land";
    pub const JUMP: &str = "Jump";
    pub const JUMP_SECOND: &str = "JumpSecond";
    pub const JUMP_WALL: &str = "JumpWall";
    pub const JUMP_DOWN: &str = "JumpDown";
    pub const GRAB_WALL: &str = "GrabWall";
    pub const CLIMB_WALL: &str = "ClimbWall";
    pub const GRAB_LEDGE: &str = "GrabLedge";
    pub const CLIMB_LEDGE: &str = "ClimbLedge";

    pub const IS_CROUCHING: &str = "IsCrouching";
    pub const IS_RUNNING: &str = "IsRunning";
    pub const IS_FALLING: &str = "IsFalling";
}

/// Notification raised by the animation player.
#[derive(Reflect, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnimationSignal {
    /// A named animator state started playing.
    Entered(String),
    /// A named animator state stopped playing.
    Exited(String),
    /// The jump clip reached its take-off frame.
    JumpStarted,
    /// A foot touched the ground.
    Footstep,
    /// A clip without a dedicated signal finished.
    AnimationEnded,
}

impl AnimationSignal {
    /// Shorthand for [`AnimationSignal::Entered`].
    pub fn entered(name: impl Into<String>) -> Self {
        AnimationSignal::Entered(name.into())
    }

    /// Shorthand for [`AnimationSignal::Exited`].
    pub fn exited(name: impl Into<String>) -> Self {
        AnimationSignal::Exited(name.into())
    }
}

/// Subscriptions of states to animation signals.
///
/// Each state subscribes in `enter` and every subscription it holds is
/// released when it exits, so a re-entered state never receives a signal twice.
#[derive(Debug, Clone, Default)]
pub struct AnimationEventBridge {
    subscriptions: HashSet<(UnitState, AnimationSignal)>,
}

impl AnimationEventBridge {
    /// Subscribe `state` to `signal`. Subscribing twice has no extra effect.
    pub fn subscribe(&mut self, state: UnitState, signal: AnimationSignal) {
        self.subscriptions.insert((state, signal));
    }

    /// Drop one subscription. Returns `true` if it existed.
    pub fn unsubscribe(&mut self, state: UnitState, signal: &AnimationSignal) -> bool {
        self.subscriptions.remove(&(state, signal.clone()))
    }

    /// Drop every subscription held by `state`.
    pub fn release(&mut self, state: UnitState) {
        self.subscriptions.retain(|(owner, _)| *owner != state);
    }

    /// Check whether `state` listens for `signal`.
    pub fn is_subscribed(&self, state: UnitState, signal: &AnimationSignal) -> bool {
        self.subscriptions.contains(&(state, signal.clone()))
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

/// Animator commands queued during one frame.
///
/// Only the last trigger set in a frame survives. Parameters keep the last
/// value written per name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimatorCommands {
    trigger: Option<String>,
    bools: HashMap<String, bool>,
    floats: HashMap<String, f32>,
    ints: HashMap<String, i32>,
}

impl AnimatorCommands {
    /// Queue a trigger, voiding any trigger queued earlier this frame.
    pub fn set_trigger(&mut self, name: impl Into<String>) {
        self.trigger = Some(name.into());
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) {
        self.bools.insert(name.into(), value);
    }

    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.floats.insert(name.into(), value);
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i32) {
        self.ints.insert(name.into(), value);
    }

    /// Trigger that would be fired by the next flush.
    pub fn pending_trigger(&self) -> Option<&str> {
        self.trigger.as_deref()
    }

    /// Pending value of a bool parameter.
    pub fn pending_bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }

    /// Check whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.trigger.is_none()
            && self.bools.is_empty()
            && self.floats.is_empty()
            && self.ints.is_empty()
    }

    /// Take everything queued so far, leaving the queue empty.
    pub fn flush(&mut self) -> AnimatorCommands {
        std::mem::take(self)
    }
}

/// Animator state as last written by the unit.
///
/// `trigger` holds the trigger fired by the most recent flush and is cleared
/// by the next one, so an animation player reacting to `Changed` sees each
/// trigger exactly once.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct AnimatorParameters {
    pub trigger: Option<String>,
    pub bools: HashMap<String, bool>,
    pub floats: HashMap<String, f32>,
    pub ints: HashMap<String, i32>,
}

impl AnimatorParameters {
    /// Apply one frame of commands.
    pub fn apply(&mut self, commands: AnimatorCommands) {
        self.trigger = commands.trigger;
        self.bools.extend(commands.bools);
        self.floats.extend(commands.floats);
        self.ints.extend(commands.ints);
    }

    /// Current value of a bool parameter. Unset parameters read as `false`.
    pub fn bool(&self, name: &str) -> bool {
        self.bools.get(name).copied().unwrap_or(false)
    }
}

/// Animation signal addressed to one unit.
#[derive(Event, Debug, Clone)]
pub struct AnimationEvent {
    pub entity: Entity,
    pub signal: AnimationSignal,
}

impl AnimationEvent {
    /// Create an animation event.
    pub fn new(entity: Entity, signal: AnimationSignal) -> Self {
        Self { entity, signal }
    }
}

/// A unit's foot touched the ground.
///
/// `surface` is the entity the unit was standing on, if any, so audio code can
/// pick a sound from it.
#[derive(Event, Debug, Clone, Copy)]
pub struct FootstepEvent {
    pub entity: Entity,
    pub surface: Option<Entity>,
}
