//! Built-in locomotion states.
//!
//! Each state is a [`StateHandler`]: a small struct holding a [`StateBase`]
//! plus whatever it needs to remember during one activation (jump ticks, a
//! finished animation). [`build_handlers`] creates one of each from the
//! authored [`LocomotionSettings`].

mod crouch;
mod fall;
mod ground;
mod jump;
mod land;
mod leap;
mod ledge;
mod wall;

pub use crouch::{CrouchState, IdleCrouchState};
pub use fall::FallState;
pub use ground::{IdleState, WalkState};
pub use jump::JumpState;
pub use land::{ClimbLedgeState, LandState};
pub use leap::{JumpDownState, JumpSecondState, JumpWallState};
pub use ledge::{GrabLedgeState, GrabPlatformState};
pub use wall::{ClimbWallState, GrabWallState};

use bevy::prelude::*;

use crate::animation::AnimationSignal;
use crate::config::{LocomotionSettings, MovementContext, StateSettings};
use crate::input::InputSnapshot;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Behavior of one state.
///
/// Every hook has a default so a state only implements what it reacts to.
/// Overridden `enter`/`exit` must call [`StateBase::enter`]/[`StateBase::exit`].
pub trait StateHandler: Send + Sync + 'static {
    fn base(&self) -> &StateBase;

    fn base_mut(&mut self) -> &mut StateBase;

    /// Tag this handler is registered under.
    fn state(&self) -> UnitState {
        self.base().state()
    }

    /// Check whether the state may be entered from `previous`.
    fn accepts(&self, previous: UnitState) -> bool {
        self.base().accepts(previous)
    }

    fn enter(&mut self, _ctx: &mut UnitContext<'_>) {
        self.base_mut().enter();
    }

    fn exit(&mut self, _ctx: &mut UnitContext<'_>) {
        self.base_mut().exit();
    }

    /// Once per rendered frame, unless the state was entered this frame.
    fn decision_step(&mut self, _ctx: &mut UnitContext<'_>) {}

    /// Once per fixed tick.
    fn physics_step(&mut self, ctx: &mut UnitContext<'_>) {
        self.base().apply_movement(ctx);
    }

    fn on_move(&mut self, _ctx: &mut UnitContext<'_>, _value: Vec2) {}

    fn on_run(&mut self, _ctx: &mut UnitContext<'_>, _held: bool) {}

    fn on_crouch(&mut self, _ctx: &mut UnitContext<'_>, _held: bool) {}

    fn on_jump(&mut self, _ctx: &mut UnitContext<'_>) {}

    fn on_jump_canceled(&mut self, _ctx: &mut UnitContext<'_>) {}

    /// A subscribed animation signal arrived.
    fn on_animation(&mut self, _ctx: &mut UnitContext<'_>, _signal: &AnimationSignal) {}
}

/// Data every state carries: its tag, strategy, authored and live movement
/// context, and forbidden predecessors.
#[derive(Debug, Clone)]
pub struct StateBase {
    state: UnitState,
    strategy: MovementStrategy,
    settings: MovementContext,
    context: MovementContext,
    forbidden: Vec<UnitState>,
    active: bool,
}

impl StateBase {
    pub fn new(state: UnitState, strategy: MovementStrategy, settings: &StateSettings) -> Self {
        let movement = settings.movement.normalized();
        Self {
            state,
            strategy,
            settings: movement,
            context: movement,
            forbidden: settings.forbidden.clone(),
            active: false,
        }
    }

    #[inline]
    pub fn state(&self) -> UnitState {
        self.state
    }

    #[inline]
    pub fn strategy(&self) -> MovementStrategy {
        self.strategy
    }

    /// Authored movement context.
    #[inline]
    pub fn settings(&self) -> &MovementContext {
        &self.settings
    }

    /// Movement context of the current activation.
    #[inline]
    pub fn context(&self) -> &MovementContext {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut MovementContext {
        &mut self.context
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn accepts(&self, previous: UnitState) -> bool {
        !self.forbidden.contains(&previous)
    }

    /// Start an activation with a fresh copy of the authored context.
    pub fn enter(&mut self) {
        self.active = true;
        self.context = self.settings;
    }

    pub fn exit(&mut self) {
        self.active = false;
    }

    /// Integrate one physics tick with the live context.
    pub fn apply_movement(&self, ctx: &mut UnitContext<'_>) {
        ctx.apply_movement(self.strategy, &self.context);
    }
}

/// Jump from the ground: drop through when holding down on a platform.
pub(crate) fn jump_or_drop(ctx: &mut UnitContext<'_>, jump: UnitState) {
    if ctx.wants_jump_down() {
        ctx.switch_state(UnitState::JumpDown);
    } else {
        ctx.switch_state(jump);
    }
}

/// State to continue in once a landing or ledge climb finishes.
pub(crate) fn follow_up_state(input: &InputSnapshot) -> UnitState {
    let moving = input.has_horizontal_beyond_dead_zone();
    match (input.crouch, input.run, moving) {
        (true, _, true) => UnitState::Crouch,
        (false, true, true) => UnitState::Run,
        (false, false, true) => UnitState::Walk,
        (true, _, false) => UnitState::IdleCrouch,
        (false, _, false) => UnitState::Idle,
    }
}

/// Create one handler for every built-in locomotion state.
pub fn build_handlers(settings: &LocomotionSettings) -> Vec<Box<dyn StateHandler>> {
    vec![
        Box::new(IdleState::new(&settings.idle)),
        Box::new(IdleCrouchState::new(&settings.idle_crouch)),
        Box::new(WalkState::walk(&settings.walk)),
        Box::new(WalkState::run(&settings.run)),
        Box::new(CrouchState::new(&settings.crouch)),
        Box::new(FallState::new(&settings.fall)),
        Box::new(LandState::new(&settings.land)),
        Box::new(JumpState::jump(&settings.jump)),
        Box::new(JumpState::jump_high(&settings.jump_high)),
        Box::new(JumpSecondState::new(&settings.jump_second)),
        Box::new(JumpWallState::new(&settings.jump_wall)),
        Box::new(JumpDownState::new(&settings.jump_down)),
        Box::new(GrabWallState::new(&settings.grab_wall)),
        Box::new(ClimbWallState::new(&settings.climb_wall)),
        Box::new(GrabLedgeState::new(&settings.grab_ledge)),
        Box::new(GrabPlatformState::new(&settings.grab_platform)),
        Box::new(ClimbLedgeState::new(&settings.climb_ledge)),
    ]
}
