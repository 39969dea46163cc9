//! Standing and walking on the ground.

use bevy::prelude::*;

use super::{jump_or_drop, StateBase, StateHandler};
use crate::animation::names;
use crate::config::StateSettings;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Standing still.
pub struct IdleState {
    base: StateBase,
}

impl IdleState {
    pub fn new(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(UnitState::Idle, MovementStrategy::Default, settings),
        }
    }
}

impl StateHandler for IdleState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        let animator = ctx.animator();
        animator.set_trigger(names::IDLE);
        animator.set_bool(names::IS_CROUCHING, false);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        if !ctx.is_grounded() {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_crouch(&mut self, ctx: &mut UnitContext<'_>, held: bool) {
        if held {
            ctx.switch_state(UnitState::IdleCrouch);
        }
    }

    // Only a move event starts walking; a wall ahead sends Walk back here
    // and the unit waits for the next one.
    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if value.x == 0.0 {
            return;
        }
        if ctx.input().run {
            ctx.switch_state(UnitState::Run);
        } else {
            ctx.switch_state(UnitState::Walk);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        jump_or_drop(ctx, UnitState::Jump);
    }
}

/// Walking or running, depending on how it was built.
pub struct WalkState {
    base: StateBase,
    running: bool,
}

impl WalkState {
    pub fn walk(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(UnitState::Walk, MovementStrategy::Default, settings),
            running: false,
        }
    }

    pub fn run(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(UnitState::Run, MovementStrategy::Default, settings),
            running: true,
        }
    }
}

impl StateHandler for WalkState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        let animator = ctx.animator();
        animator.set_trigger(names::WALK);
        animator.set_bool(names::IS_CROUCHING, false);
        animator.set_bool(names::IS_RUNNING, self.running);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        if ctx.wall_in_front() {
            ctx.switch_state(UnitState::Idle);
        } else if !ctx.is_grounded() {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_crouch(&mut self, ctx: &mut UnitContext<'_>, held: bool) {
        if held {
            ctx.switch_state(UnitState::Crouch);
        }
    }

    fn on_run(&mut self, ctx: &mut UnitContext<'_>, held: bool) {
        match (self.running, held) {
            (false, true) => ctx.switch_state(UnitState::Run),
            (true, false) => ctx.switch_state(UnitState::Walk),
            _ => {}
        }
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if value.x == 0.0 {
            ctx.switch_state(UnitState::Idle);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        jump_or_drop(ctx, UnitState::Jump);
    }
}
