//! The locomotion unit component.
//!
//! [`LocomotionUnit`] bundles a [`StateMachine`] with the [`UnitRuntime`] its
//! handlers share. It is engine agnostic: every entry point takes the
//! [`PhysicsBackend`] view of the unit's body for the duration of the call, so
//! hosts without an ECS backend can drive it by hand.

use bevy::prelude::*;

use crate::animation::{AnimationSignal, AnimatorCommands, AnimatorParameters};
use crate::backend::{IgnoredContacts, PhysicsBackend};
use crate::config::UnitConfig;
use crate::direction::Direction;
use crate::input::{InputAction, InputSnapshot};
use crate::machine::{StateMachine, UnitRuntime};
use crate::probe::CollisionProbe;
use crate::state::UnitState;
use crate::states::{build_handlers, StateHandler};

/// A unit driven by the locomotion state machine.
///
/// Inserted automatically for every entity that gets a [`UnitConfig`].
#[derive(Component)]
#[require(AnimatorParameters, IgnoredContacts)]
pub struct LocomotionUnit {
    machine: StateMachine,
    runtime: UnitRuntime,
}

impl LocomotionUnit {
    /// Create a unit with the built-in handlers for every locomotion state.
    pub fn new(config: UnitConfig) -> Self {
        let mut machine = StateMachine::new(config.initial_state);
        for handler in build_handlers(&config.states) {
            machine.register(handler);
        }
        Self {
            machine,
            runtime: UnitRuntime::new(config),
        }
    }

    /// Builder: register an extra handler, replacing the built-in one for its state.
    pub fn with_handler(mut self, handler: Box<dyn StateHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Register a handler. Returns the handler it replaced.
    pub fn register(&mut self, handler: Box<dyn StateHandler>) -> Option<Box<dyn StateHandler>> {
        self.machine.register(handler)
    }

    /// Enter the initial state if that has not happened yet.
    pub fn start(&mut self, physics: &mut dyn PhysicsBackend) -> bool {
        self.machine.start(&mut self.runtime, physics)
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.machine.is_started()
    }

    /// Current state tag.
    #[inline]
    pub fn state(&self) -> UnitState {
        self.machine.current()
    }

    #[inline]
    pub fn facing(&self) -> Direction {
        self.runtime.facing()
    }

    /// Grounded flag computed by the last decision phase.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.runtime.is_grounded()
    }

    #[inline]
    pub fn jump_count(&self) -> u32 {
        self.runtime.jump_count()
    }

    #[inline]
    pub fn input(&self) -> &InputSnapshot {
        self.runtime.input()
    }

    #[inline]
    pub fn probe(&self) -> &CollisionProbe {
        self.runtime.probe()
    }

    #[inline]
    pub fn config(&self) -> &UnitConfig {
        self.runtime.config()
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn runtime(&self) -> &UnitRuntime {
        &self.runtime
    }

    /// Run the decision phase. Call once per rendered frame.
    pub fn decision_phase(&mut self, physics: &mut dyn PhysicsBackend) {
        self.machine.run_decision_phase(&mut self.runtime, physics);
    }

    /// Run the physics phase. Call once per fixed tick.
    pub fn physics_phase(&mut self, physics: &mut dyn PhysicsBackend) {
        self.machine.run_physics_phase(&mut self.runtime, physics);
    }

    /// Latch an input change and forward it to the current state.
    pub fn handle_input(&mut self, action: InputAction, physics: &mut dyn PhysicsBackend) {
        self.machine
            .dispatch_input(action, &mut self.runtime, physics);
    }

    /// Forward an animation signal. Returns `true` if the current state took it.
    pub fn handle_animation(
        &mut self,
        signal: &AnimationSignal,
        physics: &mut dyn PhysicsBackend,
    ) -> bool {
        self.machine
            .dispatch_animation(signal, &mut self.runtime, physics)
    }

    /// Force a transition, as gameplay code does for hits or scripted moves.
    pub fn switch_state(&mut self, target: UnitState, physics: &mut dyn PhysicsBackend) -> bool {
        self.machine
            .switch_state(target, &mut self.runtime, physics)
    }

    /// Return to plain locomotion after an externally driven state.
    ///
    /// Grounded units go to Idle, airborne ones to Fall. A dead unit stays dead.
    pub fn reset_state(&mut self, physics: &mut dyn PhysicsBackend) -> bool {
        if self.state() == UnitState::Death {
            return false;
        }
        let target = match self.runtime.is_grounded() {
            true => UnitState::Idle,
            false => UnitState::Fall,
        };
        self.switch_state(target, physics)
    }

    /// Take the animator commands queued since the last call.
    pub fn take_animator_commands(&mut self) -> AnimatorCommands {
        self.runtime.animator_mut().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::names;
    use crate::states::StateBase;
    use crate::test_support::TestWorld;

    /// Stand-in for a gameplay state the locomotion set does not cover.
    struct HurtState {
        base: StateBase,
    }

    impl HurtState {
        fn new() -> Self {
            Self {
                base: StateBase::new(UnitState::Hurt, Default::default(), &Default::default()),
            }
        }
    }

    impl StateHandler for HurtState {
        fn base(&self) -> &StateBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut StateBase {
            &mut self.base
        }
    }

    fn started(world: &mut TestWorld) -> LocomotionUnit {
        let mut unit =
            LocomotionUnit::new(UnitConfig::default()).with_handler(Box::new(HurtState::new()));
        assert!(unit.start(world));
        unit
    }

    #[test]
    fn starts_idle_and_queues_trigger() {
        let (mut world, _) = TestWorld::on_floor();
        let mut unit = started(&mut world);
        assert_eq!(unit.state(), UnitState::Idle);

        let commands = unit.take_animator_commands();
        assert_eq!(commands.pending_trigger(), Some(names::IDLE));
        assert!(unit.take_animator_commands().is_empty());
    }

    #[test]
    fn input_moves_unit_through_phases() {
        let (mut world, _) = TestWorld::on_floor();
        let mut unit = started(&mut world);

        unit.handle_input(InputAction::Move(Vec2::new(-1.0, 0.0)), &mut world);
        assert_eq!(unit.state(), UnitState::Walk);

        unit.decision_phase(&mut world);
        assert_eq!(unit.facing(), Direction::Left);
        unit.physics_phase(&mut world);
        assert!(world.velocity.x < 0.0);
    }

    #[test]
    fn reset_after_external_state() {
        let (mut world, _) = TestWorld::on_floor();
        let mut unit = started(&mut world);
        unit.decision_phase(&mut world);

        assert!(unit.switch_state(UnitState::Hurt, &mut world));
        assert_eq!(unit.state(), UnitState::Hurt);
        assert!(unit.reset_state(&mut world));
        assert_eq!(unit.state(), UnitState::Idle);

        world.position.y = 10.0;
        unit.switch_state(UnitState::Hurt, &mut world);
        unit.decision_phase(&mut world);
        assert!(!unit.is_grounded());
        unit.reset_state(&mut world);
        assert_eq!(unit.state(), UnitState::Fall);
    }

    #[test]
    fn dead_units_do_not_reset() {
        let (mut world, _) = TestWorld::on_floor();
        // No Death handler is registered, so the unit is placed there by config.
        let config = UnitConfig::default().with_initial_state(UnitState::Death);
        let mut dead = LocomotionUnit::new(config);
        assert!(!dead.start(&mut world));
        assert!(!dead.reset_state(&mut world));
        assert_eq!(dead.state(), UnitState::Death);
    }

    #[test]
    fn unsubscribed_signals_are_ignored() {
        let (mut world, _) = TestWorld::on_floor();
        let mut unit = started(&mut world);
        assert!(!unit.handle_animation(&AnimationSignal::JumpStarted, &mut world));

        unit.handle_input(InputAction::Jump(true), &mut world);
        assert_eq!(unit.state(), UnitState::Jump);
        assert!(unit.handle_animation(&AnimationSignal::JumpStarted, &mut world));
    }
}
