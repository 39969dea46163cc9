//! Animation-gated hand-overs back to the ground states.

use bevy::prelude::*;

use super::{follow_up_state, jump_or_drop, StateBase, StateHandler};
use crate::animation::{names, AnimationSignal};
use crate::config::{ClimbLedgeSettings, StateSettings};
use crate::machine::UnitContext;
use crate::movement::MovementStrategy;
use crate::state::UnitState;

/// Touch-down. Leaves when the landing clip ends.
pub struct LandState {
    base: StateBase,
}

impl LandState {
    pub fn new(settings: &StateSettings) -> Self {
        Self {
            base: StateBase::new(UnitState::Land, MovementStrategy::Default, settings),
        }
    }
}

impl StateHandler for LandState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        ctx.subscribe(AnimationSignal::exited(names::LAND));
        ctx.animator().set_trigger(names::LAND);
        ctx.refresh_direction();
    }

    fn on_jump(&mut self, ctx: &mut UnitContext<'_>) {
        jump_or_drop(ctx, UnitState::Jump);
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if let AnimationSignal::Exited(name) = signal {
            if name == names::LAND {
                let next = follow_up_state(ctx.input());
                ctx.switch_state(next);
            }
        }
    }
}

/// Pulling up onto a ledge. Leaves when the climb clip ends.
pub struct ClimbLedgeState {
    base: StateBase,
    climb_offset: Vec2,
}

impl ClimbLedgeState {
    pub fn new(settings: &ClimbLedgeSettings) -> Self {
        Self {
            base: StateBase::new(
                UnitState::ClimbLedge,
                MovementStrategy::ConstantSpeed,
                &settings.base,
            ),
            climb_offset: settings.climb_offset,
        }
    }

    fn finish(&self, ctx: &mut UnitContext<'_>) {
        let offset = Vec2::new(
            self.climb_offset.x * ctx.facing().sign(),
            self.climb_offset.y,
        );
        let position = ctx.position() + offset;
        ctx.set_position(position);

        let next = follow_up_state(ctx.input());
        ctx.switch_state(next);
    }
}

impl StateHandler for ClimbLedgeState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, ctx: &mut UnitContext<'_>) {
        self.base.enter();
        ctx.subscribe(AnimationSignal::exited(names::CLIMB_LEDGE));
        ctx.animator().set_trigger(names::CLIMB_LEDGE);
    }

    fn on_animation(&mut self, ctx: &mut UnitContext<'_>, signal: &AnimationSignal) {
        if let AnimationSignal::Exited(name) = signal {
            if name == names::CLIMB_LEDGE {
                self.finish(ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::direction::Direction;
    use crate::input::InputAction;
    use crate::test_support::TestWorld;

    fn landing() -> Harness {
        let (world, _) = TestWorld::on_floor();
        Harness::new(world, UnitState::Land)
    }

    #[test]
    fn waits_for_clip_end() {
        let mut harness = landing();
        assert_eq!(harness.trigger(), Some(names::LAND));

        harness.decide_now();
        for _ in 0..5 {
            harness.physics();
        }
        assert_eq!(harness.state(), UnitState::Land);

        assert!(!harness.signal(AnimationSignal::exited(names::FALL)));
        assert!(harness.signal(AnimationSignal::exited(names::LAND)));
        assert_eq!(harness.state(), UnitState::Idle);
    }

    #[test]
    fn follow_up_uses_held_input() {
        let cases = [
            (Vec2::new(1.0, 0.0), false, true, UnitState::Crouch),
            (Vec2::new(1.0, 0.0), true, false, UnitState::Run),
            (Vec2::new(-1.0, 0.0), false, false, UnitState::Walk),
            (Vec2::ZERO, false, true, UnitState::IdleCrouch),
        ];
        for (movement, run, crouch, expected) in cases {
            let mut harness = landing();
            harness.runtime.input.set_move(movement);
            harness.runtime.input.run = run;
            harness.runtime.input.crouch = crouch;
            harness.signal(AnimationSignal::exited(names::LAND));
            assert_eq!(harness.state(), expected);
        }
    }

    #[test]
    fn enter_restores_cleared_move_input() {
        let (world, _) = TestWorld::on_floor();
        let mut harness = Harness::new(world, UnitState::Fall);
        harness.press_move(1.0, 0.0);
        harness.runtime.input.clear_move();

        harness.switch(UnitState::Land);
        assert_eq!(harness.runtime.input().move_input, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn jump_cancels_landing() {
        let mut harness = landing();
        harness.input(InputAction::Jump(true));
        assert_eq!(harness.state(), UnitState::Jump);
    }

    #[test]
    fn climb_finish_moves_onto_ledge() {
        let world = TestWorld::new(Vec2::new(2.0, 3.0));
        let config = crate::config::UnitConfig::default()
            .with_initial_state(UnitState::ClimbLedge)
            .with_initial_direction(Direction::Left);
        let mut harness = Harness::with_config(world, config);
        assert_eq!(harness.trigger(), Some(names::CLIMB_LEDGE));

        harness.signal(AnimationSignal::exited(names::CLIMB_LEDGE));
        assert!((harness.world.position - Vec2::new(1.4, 4.8)).length() < 1e-5);
        assert_eq!(harness.state(), UnitState::Idle);
    }

    #[test]
    fn climb_holds_unit_still() {
        let world = TestWorld::new(Vec2::new(0.0, 3.0));
        let mut harness = Harness::new(world, UnitState::ClimbLedge);
        harness.world.velocity = Vec2::new(1.0, -4.0);
        harness.physics();
        assert_eq!(harness.world.velocity, Vec2::ZERO);
    }
}
