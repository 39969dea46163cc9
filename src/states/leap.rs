//! Committed jumps: fixed launch velocity for a fixed number of ticks.
//!
//! All three hold the unit still until the clip reports take-off, then set
//! their launch velocity and keep it for `iterations` physics ticks.

use bevy::prelude::*;

use super::{StateBase, StateHandler};
use crate::animation::{names, AnimationSignal};
use crate::config::LeapSettings;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Tick budget shared by the committed jumps.
#[derive(Debug, Clone, Copy)]
struct Launch {
    iterations: u32,
    iteration: u32,
    ready: bool,
}

impl Launch {
    fn new(iterations: u32) -> Self {
        Self {
            iterations,
            iteration: 0,
            ready: false,
        }
    }

    fn reset(&mut self) {
        self.iteration = 0;
        self.ready = false;
    }

    /// Apply one tick of movement. Returns `false` once the budget is spent.
    fn step(&mut self, base: &StateBase, ctx: &mut UnitContext<'_>) -> bool {
        if !self.ready {
            base.apply_movement(ctx);
            return true;
        }
        if self.iteration < self.iterations {
            base.apply_movement(ctx);
            self.iteration += 1;
            return true;
        }
        false
    }
}

fn new_base(state: UnitState, settings: &LeapSettings) -> StateBase {
    StateBase::new(state, MovementStrategy::ConstantSpeed, &settings.base)
}

/// Mid-air jump in the facing direction.
pub struct JumpSecondState {
    base: StateBase,
    launch: Launch,
}

impl JumpSecondState {
    pub fn new(settings: &LeapSettings) -> Self {
        Self {
            base: new_base(UnitState::JumpSecond, settings),
            launch: Launch::new(settings.iterations),
        }
    }
}

impl StateHandler for JumpSecondState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.launch.reset();
        self.base.enter();
        ctx.subscribe(AnimationSignal::JumpStarted);
        ctx.animator().set_trigger(names::JUMP_SECOND);
        self.base.context_mut().max_speed = Vec2::ZERO;
        let jumps = ctx.jump_count() + 1;
        ctx.set_jump_count(jumps);
    }

    fn physics_step(&mut self, ctx: &mut UnitContext<'_>) {
        if !self.launch.step(&self.base, ctx) {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if *signal != AnimationSignal::JumpStarted {
            return;
        }
        let speed = self.base.settings().max_speed;
        self.base.context_mut().max_speed = Vec2::new(speed.x * ctx.facing().sign(), speed.y);
        self.launch.ready = true;
    }
}

/// Jump away from a wall or ledge.
pub struct JumpWallState {
    base: StateBase,
    launch: Launch,
}

impl JumpWallState {
    pub fn new(settings: &LeapSettings) -> Self {
        Self {
            base: new_base(UnitState::JumpWall, settings),
            launch: Launch::new(settings.iterations),
        }
    }
}

impl StateHandler for JumpWallState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        self.launch.reset();
        // Held input would steer straight back into the wall.
        ctx.input_mut().clear_move();
        ctx.animator().set_trigger(names::JUMP_WALL);
        ctx.subscribe(AnimationSignal::JumpStarted);
        self.base.context_mut().max_speed = Vec2::ZERO;
        ctx.set_jump_count(1);
    }

    fn physics_step(&mut self, ctx: &mut UnitContext<'_>) {
        if !self.launch.step(&self.base, ctx) {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if *signal != AnimationSignal::JumpStarted {
            return;
        }
        ctx.direction_mut().reverse_direction();
        let speed = self.base.settings().max_speed;
        self.base.context_mut().max_speed = Vec2::new(speed.x * ctx.facing().sign(), speed.y);
        self.launch.ready = true;
    }
}

/// Drop through the platform the unit stands on.
pub struct JumpDownState {
    base: StateBase,
    launch: Launch,
    platform: Option<Entity>,
}

impl JumpDownState {
    pub fn new(settings: &LeapSettings) -> Self {
        Self {
            base: new_base(UnitState::JumpDown, settings),
            launch: Launch::new(settings.iterations),
            platform: None,
        }
    }
}

impl StateHandler for JumpDownState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.launch.reset();
        self.base.enter();
        ctx.subscribe(AnimationSignal::JumpStarted);
        ctx.animator().set_trigger(names::JUMP_DOWN);
        self.platform = ctx.probe().platform();
        self.base.context_mut().max_speed = Vec2::ZERO;
    }

    fn exit(&mut self, _ctx: &mut UnitContext<'_>) {
        self.base.exit();
        self.platform = None;
    }

    fn physics_step(&mut self, ctx: &mut UnitContext<'_>) {
        if self.launch.step(&self.base, ctx) {
            return;
        }
        if ctx.is_grounded() {
            ctx.switch_state(UnitState::Land);
        } else {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if *signal != AnimationSignal::JumpStarted {
            return;
        }
        if let Some(platform) = self.platform {
            ctx.ignore_platform(platform);
        }
        let speed = self.base.settings().max_speed;
        self.base.context_mut().max_speed = Vec2::new(0.0, -speed.y);
        self.launch.ready = true;
    }
}
