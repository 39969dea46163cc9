//! Airborne without an active impulse.

use super::{StateBase, StateHandler};
use crate::animation::names;
use crate::config::FallSettings;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Falling, or coasting up after a jump ran out.
///
/// Checks in order: ledge, platform, wall, ground. The first hit wins.
pub struct FallState {
    base: StateBase,
    apex_threshold: f32,
    platform_grab_threshold: f32,
    falling: bool,
}

impl FallState {
    pub fn new(settings: &FallSettings) -> Self {
        Self {
            base: StateBase::new(UnitState::Fall, MovementStrategy::Default, &settings.base),
            apex_threshold: settings.apex_threshold.abs(),
            platform_grab_threshold: settings.platform_grab_threshold,
            falling: true,
        }
    }

    /// Whether the unit was last seen moving down.
    pub fn is_falling(&self) -> bool {
        self.falling
    }

    fn set_falling(&mut self, ctx: &mut UnitContext<'_>, falling: bool) {
        self.falling = falling;
        ctx.animator().set_bool(names::IS_FALLING, falling);
    }

    fn track_apex(&mut self, ctx: &mut UnitContext<'_>) {
        let vertical = ctx.velocity().y;
        if self.falling && vertical > -self.apex_threshold {
            self.set_falling(ctx, false);
        }
        if !self.falling && vertical < self.apex_threshold {
            self.set_falling(ctx, true);
        }
    }
}

impl StateHandler for FallState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        let velocity = ctx.velocity();
        let context = self.base.context_mut();
        context.max_speed.x = context.max_speed.x.max(velocity.x.abs());

        ctx.animator().set_trigger(names::FALL);
        let falling = velocity.y <= self.apex_threshold;
        self.set_falling(ctx, falling);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        self.track_apex(ctx);
        let vertical = ctx.velocity().y;

        if ctx.ledge_in_front() {
            ctx.switch_state(UnitState::GrabLedge);
        } else if ctx.platform_in_front()
            && vertical > self.apex_threshold
            && vertical < self.platform_grab_threshold
        {
            ctx.switch_state(UnitState::GrabPlatform);
        } else if ctx.wall_for_grab_in_front() && ctx.input().has_horizontal() {
            ctx.switch_state(UnitState::GrabWall);
        } else if ctx.is_grounded() && vertical <= 0.0 {
            ctx.switch_state(UnitState::Land);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        if ctx.wall_in_front() {
            ctx.switch_state(UnitState::JumpWall);
        } else if ctx.has_jumps_left() {
            ctx.switch_state(UnitState::JumpSecond);
        }
    }
}
