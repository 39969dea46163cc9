//! Hanging on and climbing walls.

use bevy::prelude::*;

use super::{StateBase, StateHandler};
use crate::animation::{names, AnimationSignal};
use crate::config::{ClimbWallSettings, StateSettings};
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Sliding slowly down a wall.
pub struct GrabWallState {
    base: StateBase,
}

impl GrabWallState {
    pub fn new(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(
                UnitState::GrabWall,
                MovementStrategy::ConstantSpeed,
                settings,
            ),
        }
    }

    /// Put the unit's side flush against the wall.
    fn snap_to_wall(ctx: &mut UnitContext<'_>) {
        let Some(wall) = ctx.wall_bounds() else {
            return;
        };
        let half_width = ctx.physics().unit_bounds().half_size().x + ctx.physics().edge_radius();
        let x = match ctx.facing().sign() > 0.0 {
            true => wall.min.x - half_width,
            false => wall.max.x + half_width,
        };
        let position = ctx.position();
        ctx.set_position(Vec2::new(x, position.y));
    }
}

impl StateHandler for GrabWallState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        ctx.subscribe(AnimationSignal::entered(names::GRAB_WALL));
        ctx.animator().set_trigger(names::GRAB_WALL);
        let slide = self.base.settings().max_speed.y;
        self.base.context_mut().max_speed = Vec2::new(0.0, -slide);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        if ctx.is_grounded() {
            ctx.switch_state(UnitState::Land);
        } else if !ctx.wall_for_grab_in_front() {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if value.y != 0.0 {
            ctx.switch_state(UnitState::ClimbWall);
        }
        if value.x != 0.0 && !ctx.facing().agrees_with(value.x) {
            ctx.direction_mut().reverse_direction();
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        ctx.switch_state(UnitState::JumpWall);
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if let AnimationSignal::Entered(name) = signal {
            if name == names::GRAB_WALL {
                Self::snap_to_wall(ctx);
            }
        }
    }
}

/// Climbing up or down a wall with the vertical input.
pub struct ClimbWallState {
    base: StateBase,
    climb_up_speed: f32,
    climb_down_speed: f32,
}

impl ClimbWallState {
    pub fn new(settings: &ClimbWallSettings) -> Self {
        Self {
            base: StateBase::new(
                UnitState::ClimbWall,
                MovementStrategy::ConstantSpeed,
                &settings.base,
            ),
            climb_up_speed: settings.climb_up_speed.abs(),
            climb_down_speed: settings.climb_down_speed.abs(),
        }
    }

    fn climb_velocity(&self, vertical: f32) -> Vec2 {
        if vertical > 0.0 {
            Vec2::new(0.0, self.climb_up_speed)
        } else if vertical < 0.0 {
            Vec2::new(0.0, -self.climb_down_speed)
        } else {
            Vec2::ZERO
        }
    }
}

impl StateHandler for ClimbWallState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        ctx.animator().set_trigger(names::CLIMB_WALL);
        self.base.context_mut().max_speed = self.climb_velocity(ctx.input().move_input.y);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        if ctx.ledge_in_front() {
            ctx.switch_state(UnitState::GrabLedge);
        } else if ctx.is_grounded() && ctx.velocity().y <= 0.0 {
            ctx.switch_state(UnitState::Land);
        } else if !ctx.wall_for_grab_in_front() {
            ctx.switch_state(UnitState::Fall);
        }
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        self.base.context_mut().max_speed = self.climb_velocity(ctx.input().move_input.y);
        if value.y == 0.0 {
            ctx.switch_state(UnitState::GrabWall);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        ctx.switch_state(UnitState::JumpWall);
    }
}
