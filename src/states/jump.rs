//! Variable-height jumps from the ground.

use super::{StateBase, StateHandler};
use crate::animation::{names, AnimationSignal};
use crate::config::JumpSettings;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Jump (or JumpHigh) held for as long as the button stays down.
///
/// Nothing moves until the clip reports take-off. From then on the impulse is
/// applied once per physics tick for at least `min_iterations` and at most
/// `iterations` ticks; releasing the button ends it early.
pub struct JumpState {
    base: StateBase,
    iterations: u32,
    min_iterations: u32,
    vertical_decay: f32,
    iteration: u32,
    holding: bool,
    ready: bool,
}

impl JumpState {
    pub fn jump(settings: &JumpSettings) -> Self {
        Self::new(UnitState::Jump, settings)
    }

    pub fn jump_high(settings: &JumpSettings) -> Self {
        Self::new(UnitState::JumpHigh, settings)
    }

    fn new(state: UnitState, settings: &JumpSettings) -> Self {
        Self {
            base: StateBase::new(state, MovementStrategy::Jump, &settings.base),
            iterations: settings.iterations,
            min_iterations: settings.min_iterations,
            vertical_decay: settings.vertical_decay.abs(),
            iteration: 0,
            holding: false,
            ready: false,
        }
    }

    /// Impulse ticks applied so far in this activation.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }
}

impl StateHandler for JumpState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.iteration = 0;
        self.holding = true;
        self.ready = false;
        self.base.enter();

        ctx.subscribe(AnimationSignal::JumpStarted);
        let speed_x = ctx.velocity().x.abs();
        let context = self.base.context_mut();
        context.max_speed.x = context.max_speed.x.max(speed_x);
        ctx.animator().set_trigger(names::JUMP);
        ctx.set_jump_count(1);
    }

    fn physics_step(&mut self, ctx: &mut UnitContext<'_>) {
        if !self.ready {
            return;
        }
        let within_budget = self.iteration < self.iterations;
        let held = self.holding || self.iteration < self.min_iterations;
        if !(within_budget && held) {
            ctx.switch_state(UnitState::Fall);
            return;
        }

        self.base.apply_movement(ctx);
        self.iteration += 1;
        if self.vertical_decay > 0.0 && self.iteration >= self.min_iterations {
            let context = self.base.context_mut();
            context.max_speed.y = (context.max_speed.y - self.vertical_decay).max(0.0);
        }
    }

    fn on_jump_canceled(&mut self, _ctx: &mut UnitContext<'_>) {
        self.holding = false;
    }

    fn on_animation(&mut self, _ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if *signal == AnimationSignal::JumpStarted {
            self.ready = true;
        }
    }
}
