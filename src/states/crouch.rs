//! Crouching, moving or still.

use bevy::prelude::*;

use super::{jump_or_drop, StateBase, StateHandler};
use crate::animation::names;
use crate::config::StateSettings;
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Crouch-walking.
pub struct CrouchState {
    base: StateBase,
}

impl CrouchState {
    pub fn new(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(UnitState::Crouch, MovementStrategy::Default, settings),
        }
    }
}

impl StateHandler for CrouchState {
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
        animator.set_bool(names::IS_CROUCHING, true);
        animator.set_bool(names::IS_RUNNING, false);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        if ctx.wall_in_front() || ctx.cliff_in_front() {
            ctx.switch_state(UnitState::IdleCrouch);
        } else if !ctx.is_grounded() {
            ctx.switch_state(UnitState::Fall);
        } else if !ctx.input().crouch && !ctx.wall_above() {
            let next = if ctx.input().run {
                UnitState::Run
            } else {
                UnitState::Walk
            };
            ctx.switch_state(next);
        }
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if value.x == 0.0 || ctx.wall_in_front() {
            ctx.switch_state(UnitState::IdleCrouch);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        jump_or_drop(ctx, UnitState::JumpHigh);
    }
}

/// Crouching in place.
pub struct IdleCrouchState {
    base: StateBase,
}

impl IdleCrouchState {
    pub fn new(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(
                UnitState::IdleCrouch,
                MovementStrategy::ConstantSpeed,
                settings,
            ),
        }
    }
}

impl StateHandler for IdleCrouchState {
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
        animator.set_bool(names::IS_CROUCHING, true);
    }

    fn decision_step(&mut self, ctx: &mut UnitContext<'_>) {
        if !ctx.is_grounded() {
            ctx.switch_state(UnitState::Fall);
        } else if !ctx.input().crouch && !ctx.wall_above() {
            ctx.switch_state(UnitState::Idle);
        } else if ctx.input().has_horizontal() && !ctx.cliff_in_front() {
            ctx.switch_state(UnitState::Crouch);
        }
    }

    fn on_move(&mut self, ctx: &mut UnitContext<'_>, value: Vec2) {
        if value.x != 0.0 && !ctx.cliff_in_front() {
            ctx.switch_state(UnitState::Crouch);
        }
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        jump_or_drop(ctx, UnitState::JumpHigh);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::input::InputAction;
    use crate::test_support::TestWorld;

    fn crouching(world: TestWorld) -> Harness {
        let mut harness = Harness::new(world, UnitState::Idle);
        harness.input(InputAction::Crouch(true));
        harness
    }

    #[test]
    fn idle_crouch_holds_still() {
        let (world, _) = TestWorld::on_floor();
        let mut harness = crouching(world);
        assert_eq!(harness.state(), UnitState::IdleCrouch);
        assert_eq!(harness.trigger(), Some(names::IDLE));
        assert_eq!(harness.bool_param(names::IS_CROUCHING), Some(true));

        harness.world.velocity = Vec2::new(2.0, 0.0);
        harness.physics();
        assert_eq!(harness.world.velocity, Vec2::ZERO);
    }

    #[test]
    fn idle_crouch_moves_to_crouch_and_back() {
        let (world, _) = TestWorld::on_floor();
        let mut harness = crouching(world);

        harness.press_move(1.0, 0.0);
        assert_eq!(harness.state(), UnitState::Crouch);
        assert_eq!(harness.trigger(), Some(names::WALK));

        harness.press_move(0.0, 0.0);
        assert_eq!(harness.state(), UnitState::IdleCrouch);
    }

    #[test]
    fn idle_crouch_refuses_to_move_over_cliff() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        world.add_solid(Rect::new(-5.0, -1.0, 0.6, 0.0));
        let mut harness = crouching(world);

        harness.press_move(1.0, 0.0);
        assert_eq!(harness.state(), UnitState::IdleCrouch);
        harness.decide_now();
        assert_eq!(harness.state(), UnitState::IdleCrouch);
    }

    #[test]
    fn crouch_stops_at_cliff() {
        let mut world = TestWorld::new(Vec2::new(-2.0, 1.0));
        world.add_solid(Rect::new(-5.0, -1.0, 0.6, 0.0));
        let mut harness = crouching(world);
        harness.press_move(1.0, 0.0);
        assert_eq!(harness.state(), UnitState::Crouch);

        harness.world.position.x = 0.0;
        harness.decide_now();
        assert_eq!(harness.state(), UnitState::IdleCrouch);
    }

    #[test]
    fn crouch_stops_at_wall_on_move() {
        let (mut world, _) = TestWorld::on_floor();
        world.add_solid(Rect::new(0.6, 0.0, 1.6, 5.0));
        let mut harness = crouching(world);
        harness.press_move(1.0, 0.0);
        assert_eq!(harness.state(), UnitState::Crouch);

        // The next move report sees the wall.
        harness.press_move(1.0, 0.0);
        assert_eq!(harness.state(), UnitState::IdleCrouch);
    }

    #[test]
    fn releasing_crouch_under_ceiling_keeps_crouching() {
        let (mut world, _) = TestWorld::on_floor();
        let ceiling = world.add_solid(Rect::new(-5.0, 2.1, 5.0, 3.0));
        let mut harness = crouching(world);

        harness.input(InputAction::Crouch(false));
        harness.decide_now();
        assert_eq!(harness.state(), UnitState::IdleCrouch);

        harness.world.bodies.retain(|body| body.entity != ceiling);
        harness.decide_now();
        assert_eq!(harness.state(), UnitState::Idle);
    }

    #[test]
    fn releasing_crouch_while_moving_resumes_walk_or_run() {
        let (world, _) = TestWorld::on_floor();
        let mut harness = crouching(world);
        harness.press_move(1.0, 0.0);
        harness.input(InputAction::Crouch(false));
        harness.decide_now();
        assert_eq!(harness.state(), UnitState::Walk);

        let (world, _) = TestWorld::on_floor();
        let mut harness = crouching(world);
        harness.input(InputAction::Run(true));
        harness.press_move(1.0, 0.0);
        harness.input(InputAction::Crouch(false));
        harness.decide_now();
        assert_eq!(harness.state(), UnitState::Run);
    }

    #[test]
    fn crouch_jump_is_high() {
        let (world, _) = TestWorld::on_floor();
        let mut harness = crouching(world);
        harness.input(InputAction::Jump(true));
        assert_eq!(harness.state(), UnitState::JumpHigh);
    }
}
