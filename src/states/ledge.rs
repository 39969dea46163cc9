//! Hanging from ledges and platform edges.
//!
//! Both states snap into place when the grab clip starts and accept input
//! only once it has finished playing.

use bevy::prelude::*;

use super::{StateBase, StateHandler};
use crate::animation::{names, AnimationSignal};
use crate::config::{GrabLedgeSettings, GrabPlatformSettings};
use crate::direction::Direction;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

fn is_climb_input(value: Vec2, facing: Direction) -> bool {
    value.y > 0.0 || facing.agrees_with(value.x)
}

fn is_drop_input(value: Vec2, facing: Direction) -> bool {
    value.y < 0.0 || (value.x != 0.0 && !facing.agrees_with(value.x))
}

/// Hanging from the corner of solid geometry.
pub struct GrabLedgeState {
    base: StateBase,
    grab_offset: Vec2,
    skip_ledge_offset_x: f32,
    finished: bool,
}

impl GrabLedgeState {
    pub fn new(settings: &GrabLedgeSettings) -> Self {
        Self {
            base: StateBase::new(
                UnitState::GrabLedge,
                MovementStrategy::ConstantSpeed,
                &settings.base,
            ),
            grab_offset: settings.grab_offset,
            skip_ledge_offset_x: settings.skip_ledge_offset_x,
            finished: false,
        }
    }

    /// Whether the grab clip has finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn snap_to_ledge(&self, ctx: &mut UnitContext<'_>) {
        let Some(ledge) = ctx.ledge_bounds() else {
            return;
        };
        let x = match ctx.facing() {
            Direction::Right => ledge.min.x - self.grab_offset.x,
            Direction::Left => ledge.max.x + self.grab_offset.x,
        };
        ctx.set_position(Vec2::new(x, ledge.max.y + self.grab_offset.y));
    }

    fn let_go(&self, ctx: &mut UnitContext<'_>) {
        if let Some(ledge) = ctx.ledge_bounds() {
            let x = match ctx.facing() {
                Direction::Right => ledge.min.x - self.skip_ledge_offset_x,
                Direction::Left => ledge.max.x + self.skip_ledge_offset_x,
            };
            let position = ctx.position();
            ctx.set_position(Vec2::new(x, position.y));
        }
        ctx.direction_mut().reverse_direction();
        ctx.ignore_ledge();
        ctx.switch_state(UnitState::Fall);
    }
}

impl StateHandler for GrabLedgeState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        self.finished = false;
        ctx.subscribe(AnimationSignal::entered(names::GRAB_LEDGE));
        ctx.subscribe(AnimationSignal::exited(names::GRAB_LEDGE));
        ctx.animator().set_trigger(names::GRAB_LEDGE);
        ctx.set_velocity(Vec2::ZERO);
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if !self.finished {
            return;
        }
        let facing = ctx.facing();
        if is_climb_input(value, facing) {
            ctx.switch_state(UnitState::ClimbLedge);
        } else if is_drop_input(value, facing) {
            self.let_go(ctx);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        ctx.switch_state(UnitState::JumpWall);
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        match signal {
            AnimationSignal::Entered(name) if name == names::GRAB_LEDGE => self.snap_to_ledge(ctx),
            AnimationSignal::Exited(name) if name == names::GRAB_LEDGE => {
                self.finished = true;
                if is_climb_input(ctx.input().move_input, ctx.facing()) {
                    ctx.switch_state(UnitState::ClimbLedge);
                }
            }
            _ => {}
        }
    }
}

/// Hanging from the edge of a one-way platform.
///
/// Shares the ledge grab clip and its signals.
pub struct GrabPlatformState {
    base: StateBase,
    grab_offset_y: f32,
    jump_offset_y: f32,
    finished: bool,
}

impl GrabPlatformState {
    pub fn new(settings: &GrabPlatformSettings) -> Self {
        Self {
            base: StateBase::new(
                UnitState::GrabPlatform,
                MovementStrategy::ConstantSpeed,
                &settings.base,
            ),
            grab_offset_y: settings.grab_offset_y,
            jump_offset_y: settings.jump_offset_y,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn snap_to_platform(&self, ctx: &mut UnitContext<'_>) {
        let Some(platform) = ctx.ledge_bounds() else {
            return;
        };
        let x = ctx.position().x.clamp(platform.min.x, platform.max.x);
        ctx.set_position(Vec2::new(x, platform.max.y + self.grab_offset_y));
    }
}

impl StateHandler for GrabPlatformState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        self.finished = false;
        ctx.subscribe(AnimationSignal::entered(names::GRAB_LEDGE));
        ctx.subscribe(AnimationSignal::exited(names::GRAB_LEDGE));
        ctx.animator().set_trigger(names::GRAB_LEDGE);
        ctx.set_velocity(Vec2::ZERO);
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if !self.finished {
            return;
        }
        if value.y < 0.0 {
            ctx.ignore_ledge();
            ctx.switch_state(UnitState::Fall);
        } else if value.y > 0.0 || value.x != 0.0 {
            ctx.switch_state(UnitState::ClimbLedge);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        if let Some(platform) = ctx.ledge_bounds() {
            let position = ctx.position();
            ctx.set_position(Vec2::new(position.x, platform.max.y + self.jump_offset_y));
        }
        ctx.switch_state(UnitState::Jump);
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        match signal {
            AnimationSignal::Entered(name) if name == names::GRAB_LEDGE => {
                self.snap_to_platform(ctx)
            }
            AnimationSignal::Exited(name) if name == names::GRAB_LEDGE => {
                self.finished = true;
                let held = ctx.input().move_input;
                if held.y > 0.0 || held.x != 0.0 {
                    ctx.switch_state(UnitState::ClimbLedge);
                }
            }
            _ => {}
        }
    }
}
