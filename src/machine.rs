//! State machine core.
//!
//! [`StateMachine`] holds one handler per state tag and the current tag. It
//! drives the two update phases and arbitrates transitions:
//!
//! - the **decision phase** runs once per rendered frame: facing update,
//!   exclusion-list maintenance, grounded refresh, then the current state's
//!   decision step (skipped once right after a transition);
//! - the **physics phase** runs on every fixed tick and always calls the
//!   current state's physics step.
//!
//! Handlers never switch state directly. They queue requests on their
//! [`UnitContext`] and the machine applies them, in order, as soon as the
//! handler call returns.

use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;

use crate::animation::{AnimationEventBridge, AnimationSignal, AnimatorCommands};
use crate::backend::PhysicsBackend;
use crate::config::{MovementContext, UnitConfig};
use crate::direction::{Direction, DirectionManager};
use crate::input::{InputAction, InputSnapshot};
use crate::movement::{MovementInput, MovementStrategy};
use crate::probe::CollisionProbe;
use crate::state::UnitState;
use crate::states::StateHandler;

/// Transitions applied in one drain before the rest are dropped.
pub const MAX_CHAINED_TRANSITIONS: usize = 32;

/// Per-unit data shared by all state handlers.
#[derive(Debug, Clone)]
pub struct UnitRuntime {
    pub(crate) config: UnitConfig,
    pub(crate) input: InputSnapshot,
    pub(crate) direction: DirectionManager,
    pub(crate) probe: CollisionProbe,
    pub(crate) animator: AnimatorCommands,
    pub(crate) animation: AnimationEventBridge,
    pub(crate) jump_count: u32,
    pub(crate) grounded: bool,
    pending: VecDeque<UnitState>,
}

impl UnitRuntime {
    pub fn new(config: UnitConfig) -> Self {
        Self {
            input: InputSnapshot::default(),
            direction: DirectionManager::new(
                config.initial_direction,
                config.rotatable_states.clone(),
            ),
            probe: CollisionProbe::new(config.probe),
            animator: AnimatorCommands::default(),
            animation: AnimationEventBridge::default(),
            jump_count: 0,
            grounded: true,
            pending: VecDeque::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    #[inline]
    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    #[inline]
    pub fn facing(&self) -> Direction {
        self.direction.current()
    }

    #[inline]
    pub fn probe(&self) -> &CollisionProbe {
        &self.probe
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    #[inline]
    pub fn jump_count(&self) -> u32 {
        self.jump_count
    }

    #[inline]
    pub fn animation(&self) -> &AnimationEventBridge {
        &self.animation
    }

    #[inline]
    pub fn animator(&self) -> &AnimatorCommands {
        &self.animator
    }

    #[inline]
    pub fn animator_mut(&mut self) -> &mut AnimatorCommands {
        &mut self.animator
    }
}

/// What a state handler sees while it runs.
///
/// Wraps the unit's runtime data and the physics backend for the duration of
/// one handler call.
pub struct UnitContext<'a> {
    runtime: &'a mut UnitRuntime,
    physics: &'a mut dyn PhysicsBackend,
    state: UnitState,
}

impl<'a> UnitContext<'a> {
    pub fn new(
        runtime: &'a mut UnitRuntime,
        physics: &'a mut dyn PhysicsBackend,
        state: UnitState,
    ) -> Self {
        Self {
            runtime,
            physics,
            state,
        }
    }

    /// State the running handler belongs to.
    #[inline]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Request a transition. Applied after the current handler call returns.
    pub fn switch_state(&mut self, target: UnitState) {
        self.runtime.pending.push_back(target);
    }

    /// Transitions requested so far during this call.
    pub fn pending_transitions(&self) -> impl Iterator<Item = UnitState> + '_ {
        self.runtime.pending.iter().copied()
    }

    // === Unit data ===

    #[inline]
    pub fn config(&self) -> &UnitConfig {
        &self.runtime.config
    }

    #[inline]
    pub fn input(&self) -> &InputSnapshot {
        &self.runtime.input
    }

    #[inline]
    pub fn input_mut(&mut self) -> &mut InputSnapshot {
        &mut self.runtime.input
    }

    #[inline]
    pub fn facing(&self) -> Direction {
        self.runtime.direction.current()
    }

    #[inline]
    pub fn direction_mut(&mut self) -> &mut DirectionManager {
        &mut self.runtime.direction
    }

    /// Restore the move vector from the input source and face it if allowed.
    pub fn refresh_direction(&mut self) {
        self.runtime.input.resync_move();
        let move_x = self.runtime.input.move_input.x;
        self.runtime.direction.update_direction(move_x, self.state);
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.runtime.grounded
    }

    #[inline]
    pub fn on_platform(&self) -> bool {
        self.runtime.probe.on_platform()
    }

    #[inline]
    pub fn jump_count(&self) -> u32 {
        self.runtime.jump_count
    }

    #[inline]
    pub fn set_jump_count(&mut self, count: u32) {
        self.runtime.jump_count = count;
    }

    /// Check whether another air jump is allowed.
    #[inline]
    pub fn has_jumps_left(&self) -> bool {
        self.runtime.jump_count < self.runtime.config.max_jumps
    }

    /// Holding fully down while standing on a platform.
    pub fn wants_jump_down(&self) -> bool {
        self.runtime.input.is_holding_down() && self.on_platform()
    }

    // === Physics ===

    #[inline]
    pub fn physics(&self) -> &dyn PhysicsBackend {
        &*self.physics
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.physics.velocity()
    }

    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.physics.set_velocity(velocity);
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.physics.position()
    }

    #[inline]
    pub fn set_position(&mut self, position: Vec2) {
        self.physics.set_position(position);
    }

    /// Integrate one physics tick with `strategy` and write the velocity.
    pub fn apply_movement(&mut self, strategy: MovementStrategy, context: &MovementContext) {
        let input = MovementInput {
            velocity: self.physics.velocity(),
            move_x: self.runtime.input.move_input.x,
            facing: self.runtime.direction.current(),
            config: &self.runtime.config,
        };
        let velocity = strategy.integrate(input, context);
        self.physics.set_velocity(velocity);
    }

    // === Probe ===

    #[inline]
    pub fn probe(&self) -> &CollisionProbe {
        &self.runtime.probe
    }

    pub fn wall_in_front(&mut self) -> bool {
        let facing = self.facing();
        self.runtime.probe.wall_in_front(&*self.physics, facing)
    }

    pub fn wall_for_grab_in_front(&mut self) -> bool {
        let facing = self.facing();
        self.runtime
            .probe
            .wall_for_grab_in_front(&*self.physics, facing)
    }

    pub fn cliff_in_front(&self) -> bool {
        self.runtime
            .probe
            .cliff_in_front(&*self.physics, self.facing())
    }

    pub fn wall_above(&self) -> bool {
        self.runtime.probe.wall_above(&*self.physics).is_some()
    }

    pub fn ledge_in_front(&mut self) -> bool {
        let facing = self.facing();
        self.runtime.probe.ledge_in_front(&*self.physics, facing)
    }

    pub fn platform_in_front(&mut self) -> bool {
        let facing = self.facing();
        self.runtime.probe.platform_in_front(&*self.physics, facing)
    }

    pub fn wall_bounds(&self) -> Option<Rect> {
        self.runtime.probe.wall_bounds(&*self.physics)
    }

    pub fn ledge_bounds(&self) -> Option<Rect> {
        self.runtime.probe.ledge_bounds(&*self.physics)
    }

    pub fn ignore_platform(&mut self, entity: Entity) -> bool {
        self.runtime
            .probe
            .ignore_platform(&mut *self.physics, entity)
    }

    pub fn ignore_ledge(&mut self) {
        self.runtime.probe.ignore_ledge();
    }

    // === Animation ===

    #[inline]
    pub fn animator(&mut self) -> &mut AnimatorCommands {
        &mut self.runtime.animator
    }

    /// Listen for `signal` until the running state exits.
    pub fn subscribe(&mut self, signal: AnimationSignal) {
        self.runtime.animation.subscribe(self.state, signal);
    }

    pub fn unsubscribe(&mut self, signal: &AnimationSignal) {
        self.runtime.animation.unsubscribe(self.state, signal);
    }
}

/// Owns the handlers and the current tag.
pub struct StateMachine {
    handlers: HashMap<UnitState, Box<dyn StateHandler>>,
    current: UnitState,
    started: bool,
    skip_next_decision: bool,
}

impl StateMachine {
    /// Create an empty machine that will start in `initial`.
    pub fn new(initial: UnitState) -> Self {
        Self {
            handlers: HashMap::new(),
            current: initial,
            started: false,
            skip_next_decision: false,
        }
    }

    /// Register a handler under its own tag, replacing any previous one.
    pub fn register(&mut self, handler: Box<dyn StateHandler>) -> Option<Box<dyn StateHandler>> {
        self.handlers.insert(handler.state(), handler)
    }

    #[inline]
    pub fn current(&self) -> UnitState {
        self.current
    }

    /// Whether a current handler has been entered.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[inline]
    pub fn has_handler(&self, state: UnitState) -> bool {
        self.handlers.contains_key(&state)
    }

    pub fn handler(&self, state: UnitState) -> Option<&dyn StateHandler> {
        self.handlers.get(&state).map(|handler| handler.as_ref())
    }

    /// Whether the next decision step will be skipped.
    #[inline]
    pub fn skips_next_decision(&self) -> bool {
        self.skip_next_decision
    }

    /// Enter the initial state.
    ///
    /// Without a handler for it the machine stays idle until a transition to a
    /// registered state succeeds.
    pub fn start(&mut self, runtime: &mut UnitRuntime, physics: &mut dyn PhysicsBackend) -> bool {
        if self.started {
            return true;
        }
        let initial = self.current;
        let Some(handler) = self.handlers.get_mut(&initial) else {
            warn!("no handler registered for initial state {initial:?}; unit stays inactive");
            return false;
        };
        handler.enter(&mut UnitContext::new(runtime, physics, initial));
        self.started = true;
        self.drain(runtime, physics);
        true
    }

    /// Switch to `target` now, then apply any transitions that causes.
    pub fn switch_state(
        &mut self,
        target: UnitState,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
    ) -> bool {
        let switched = self.transition(target, runtime, physics);
        self.drain(runtime, physics);
        switched
    }

    /// Decision phase for one rendered frame.
    pub fn run_decision_phase(
        &mut self,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
    ) {
        if !self.started {
            return;
        }
        let state = self.current;
        let move_x = runtime.input.move_input.x;
        runtime.direction.update_direction(move_x, state);

        let facing = runtime.direction.current();
        if state != UnitState::JumpDown {
            runtime.probe.try_restore_platforms(physics, facing);
        }
        if state != UnitState::Fall {
            runtime.probe.restore_ledge();
        }
        runtime.grounded = runtime.probe.is_grounded(&*physics, facing);

        if self.skip_next_decision {
            self.skip_next_decision = false;
            return;
        }
        self.with_current(runtime, physics, |handler, ctx| handler.decision_step(ctx));
    }

    /// Physics phase for one fixed tick.
    pub fn run_physics_phase(
        &mut self,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
    ) {
        if !self.started {
            return;
        }
        self.with_current(runtime, physics, |handler, ctx| handler.physics_step(ctx));
    }

    /// Latch an input change and forward it to the current state.
    pub fn dispatch_input(
        &mut self,
        action: InputAction,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
    ) {
        match action {
            InputAction::Move(value) => runtime.input.set_move(value),
            InputAction::Run(held) => runtime.input.run = held,
            InputAction::Crouch(held) => runtime.input.crouch = held,
            InputAction::Jump(held) => runtime.input.jump = held,
        }
        if !self.started {
            return;
        }
        self.with_current(runtime, physics, |handler, ctx| match action {
            InputAction::Move(value) => handler.on_move(ctx, value),
            InputAction::Run(held) => handler.on_run(ctx, held),
            InputAction::Crouch(held) => handler.on_crouch(ctx, held),
            InputAction::Jump(true) => handler.on_jump(ctx),
            InputAction::Jump(false) => handler.on_jump_canceled(ctx),
        });
    }

    /// Deliver an animation signal to the current state if it subscribed.
    pub fn dispatch_animation(
        &mut self,
        signal: &AnimationSignal,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
    ) -> bool {
        if !self.started || !runtime.animation.is_subscribed(self.current, signal) {
            return false;
        }
        self.with_current(runtime, physics, |handler, ctx| {
            handler.on_animation(ctx, signal)
        });
        true
    }

    fn with_current(
        &mut self,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
        call: impl FnOnce(&mut dyn StateHandler, &mut UnitContext<'_>),
    ) {
        let state = self.current;
        match self.handlers.get_mut(&state) {
            Some(handler) => call(
                handler.as_mut(),
                &mut UnitContext::new(runtime, physics, state),
            ),
            None => warn!("current state {state:?} has no handler"),
        }
        self.drain(runtime, physics);
    }

    fn drain(&mut self, runtime: &mut UnitRuntime, physics: &mut dyn PhysicsBackend) {
        let mut applied = 0;
        while let Some(target) = runtime.pending.pop_front() {
            if applied == MAX_CHAINED_TRANSITIONS {
                warn!(
                    "more than {MAX_CHAINED_TRANSITIONS} chained transitions from {:?}; dropping {} requests",
                    self.current,
                    runtime.pending.len() + 1
                );
                runtime.pending.clear();
                return;
            }
            applied += 1;
            self.transition(target, runtime, physics);
        }
    }

    fn transition(
        &mut self,
        target: UnitState,
        runtime: &mut UnitRuntime,
        physics: &mut dyn PhysicsBackend,
    ) -> bool {
        let previous = self.current;
        let Some(next) = self.handlers.get(&target) else {
            warn!("no handler registered for {target:?}; staying in {previous:?}");
            return false;
        };
        if self.started && !next.accepts(previous) {
            trace!("{target:?} refuses entry from {previous:?}");
            return false;
        }

        if self.started {
            if let Some(handler) = self.handlers.get_mut(&previous) {
                handler.exit(&mut UnitContext::new(runtime, physics, previous));
            }
            runtime.animation.release(previous);
        }

        self.current = target;
        self.started = true;
        if let Some(handler) = self.handlers.get_mut(&target) {
            handler.enter(&mut UnitContext::new(runtime, physics, target));
        }
        self.skip_next_decision = true;
        debug!("unit state {previous:?} -> {target:?}");
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::StateSettings;
    use crate::states::StateBase;
    use crate::test_support::TestWorld;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Handler that records every call and can be scripted to request a
    /// transition from its decision step or on enter.
    struct Spy {
        base: StateBase,
        log: Log,
        on_decision: Option<UnitState>,
        on_enter: Option<UnitState>,
    }

    impl Spy {
        fn boxed(state: UnitState, log: &Log) -> Box<Self> {
            Box::new(Self {
                base: StateBase::new(
                    state,
                    MovementStrategy::ConstantSpeed,
                    &StateSettings::new(MovementContext::constant(Vec2::new(1.0, 0.0))),
                ),
                log: log.clone(),
                on_decision: None,
                on_enter: None,
            })
        }

        fn record(&self, call: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{:?}:{call}", self.base.state()));
        }
    }

    impl StateHandler for Spy {
        fn base(&self) -> &StateBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut StateBase {
            &mut self.base
        }

        fn enter(&mut self, ctx: &mut UnitContext) {
            self.base.enter();
            self.record("enter");
            ctx.subscribe(AnimationSignal::JumpStarted);
            if let Some(target) = self.on_enter {
                ctx.switch_state(target);
            }
        }

        fn exit(&mut self, _ctx: &mut UnitContext) {
            self.base.exit();
            self.record("exit");
        }

        fn decision_step(&mut self, ctx: &mut UnitContext) {
            self.record("decision");
            if let Some(target) = self.on_decision {
                ctx.switch_state(target);
            }
        }

        fn physics_step(&mut self, ctx: &mut UnitContext) {
            self.record("physics");
            self.base.apply_movement(ctx);
        }

        fn on_animation(&mut self, _ctx: &mut UnitContext, _signal: &AnimationSignal) {
            self.record("animation");
        }
    }

    fn setup(handlers: Vec<Box<Spy>>) -> (StateMachine, UnitRuntime, TestWorld) {
        let mut machine = StateMachine::new(UnitState::Idle);
        for handler in handlers {
            machine.register(handler);
        }
        let runtime = UnitRuntime::new(UnitConfig::default());
        let (world, _) = TestWorld::on_floor();
        (machine, runtime, world)
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn start_enters_initial_state() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![Spy::boxed(UnitState::Idle, &log)]);

        assert!(machine.start(&mut runtime, &mut world));
        assert!(machine.is_started());
        assert_eq!(take(&log), vec!["Idle:enter"]);
        assert!(machine
            .handler(UnitState::Idle)
            .is_some_and(|h| h.base().is_active()));
    }

    #[test]
    fn start_without_initial_handler_stays_inactive() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![Spy::boxed(UnitState::Walk, &log)]);

        assert!(!machine.start(&mut runtime, &mut world));
        machine.run_decision_phase(&mut runtime, &mut world);
        machine.run_physics_phase(&mut runtime, &mut world);
        assert!(take(&log).is_empty());

        // A transition to a registered state brings it up.
        assert!(machine.switch_state(UnitState::Walk, &mut runtime, &mut world));
        assert_eq!(take(&log), vec!["Walk:enter"]);
    }

    #[test]
    fn switch_to_unregistered_state_is_dropped() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![Spy::boxed(UnitState::Idle, &log)]);
        machine.start(&mut runtime, &mut world);
        take(&log);

        for state in UnitState::ALL {
            if state == UnitState::Idle {
                continue;
            }
            assert!(!machine.switch_state(state, &mut runtime, &mut world));
            assert_eq!(machine.current(), UnitState::Idle);
        }
        assert!(take(&log).is_empty());
    }

    #[test]
    fn forbidden_predecessor_refuses_silently() {
        let log = Log::default();
        let mut walk = Spy::boxed(UnitState::Walk, &log);
        walk.base = StateBase::new(
            UnitState::Walk,
            MovementStrategy::Default,
            &StateSettings::new(MovementContext::STILL).with_forbidden([UnitState::Idle]),
        );
        let (mut machine, mut runtime, mut world) =
            setup(vec![Spy::boxed(UnitState::Idle, &log), walk]);
        machine.start(&mut runtime, &mut world);
        take(&log);

        assert!(!machine.switch_state(UnitState::Walk, &mut runtime, &mut world));
        assert_eq!(machine.current(), UnitState::Idle);
        assert!(take(&log).is_empty());
        assert!(!machine.skips_next_decision());
    }

    #[test]
    fn transition_exits_before_enter_and_skips_one_decision() {
        let log = Log::default();
        let mut idle = Spy::boxed(UnitState::Idle, &log);
        idle.on_decision = Some(UnitState::Walk);
        let (mut machine, mut runtime, mut world) =
            setup(vec![idle, Spy::boxed(UnitState::Walk, &log)]);
        machine.start(&mut runtime, &mut world);
        take(&log);

        // Tick 1: transition in the decision step, physics still runs once.
        machine.run_decision_phase(&mut runtime, &mut world);
        machine.run_physics_phase(&mut runtime, &mut world);
        assert_eq!(
            take(&log),
            vec!["Idle:decision", "Idle:exit", "Walk:enter", "Walk:physics"]
        );

        // Tick 2: the new state's decision step is skipped once.
        machine.run_decision_phase(&mut runtime, &mut world);
        machine.run_physics_phase(&mut runtime, &mut world);
        assert_eq!(take(&log), vec!["Walk:physics"]);

        // Tick 3: back to normal.
        machine.run_decision_phase(&mut runtime, &mut world);
        assert_eq!(take(&log), vec!["Walk:decision"]);
    }

    #[test]
    fn reentering_current_state_exits_and_enters() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![Spy::boxed(UnitState::Idle, &log)]);
        machine.start(&mut runtime, &mut world);
        take(&log);

        assert!(machine.switch_state(UnitState::Idle, &mut runtime, &mut world));
        assert_eq!(take(&log), vec!["Idle:exit", "Idle:enter"]);
        assert!(machine.skips_next_decision());
    }

    #[test]
    fn queued_transitions_apply_in_order() {
        let log = Log::default();
        let mut idle = Spy::boxed(UnitState::Idle, &log);
        idle.on_decision = Some(UnitState::Walk);
        let mut walk = Spy::boxed(UnitState::Walk, &log);
        walk.on_enter = Some(UnitState::Run);
        let (mut machine, mut runtime, mut world) =
            setup(vec![idle, walk, Spy::boxed(UnitState::Run, &log)]);
        machine.start(&mut runtime, &mut world);
        take(&log);

        machine.run_decision_phase(&mut runtime, &mut world);
        assert_eq!(machine.current(), UnitState::Run);
        assert_eq!(
            take(&log),
            vec![
                "Idle:decision",
                "Idle:exit",
                "Walk:enter",
                "Walk:exit",
                "Run:enter"
            ]
        );
    }

    #[test]
    fn runaway_chain_is_cut() {
        let log = Log::default();
        let mut idle = Spy::boxed(UnitState::Idle, &log);
        idle.on_enter = Some(UnitState::Walk);
        let mut walk = Spy::boxed(UnitState::Walk, &log);
        walk.on_enter = Some(UnitState::Idle);
        let (mut machine, mut runtime, mut world) = setup(vec![idle, walk]);

        machine.start(&mut runtime, &mut world);
        let enters = take(&log)
            .iter()
            .filter(|entry| entry.ends_with(":enter"))
            .count();
        assert_eq!(enters, MAX_CHAINED_TRANSITIONS + 1);
        assert_eq!(runtime.pending.len(), 0);
    }

    #[test]
    fn animation_signals_reach_only_subscribed_current_state() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![
            Spy::boxed(UnitState::Idle, &log),
            Spy::boxed(UnitState::Walk, &log),
        ]);
        machine.start(&mut runtime, &mut world);
        take(&log);

        assert!(!machine.dispatch_animation(&AnimationSignal::Footstep, &mut runtime, &mut world));
        assert!(machine.dispatch_animation(
            &AnimationSignal::JumpStarted,
            &mut runtime,
            &mut world
        ));
        assert_eq!(take(&log), vec!["Idle:animation"]);

        machine.switch_state(UnitState::Walk, &mut runtime, &mut world);
        assert!(!runtime
            .animation
            .is_subscribed(UnitState::Idle, &AnimationSignal::JumpStarted));
        assert!(runtime
            .animation
            .is_subscribed(UnitState::Walk, &AnimationSignal::JumpStarted));
        assert_eq!(runtime.animation.len(), 1);
    }

    #[test]
    fn input_is_latched_and_forwarded() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![Spy::boxed(UnitState::Idle, &log)]);

        // Latched even before start.
        machine.dispatch_input(InputAction::Run(true), &mut runtime, &mut world);
        assert!(runtime.input.run);

        machine.start(&mut runtime, &mut world);
        machine.dispatch_input(
            InputAction::Move(Vec2::new(-1.0, 0.0)),
            &mut runtime,
            &mut world,
        );
        assert_eq!(runtime.input.move_input, Vec2::new(-1.0, 0.0));
        assert_eq!(runtime.input.device_move, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn decision_phase_updates_facing_and_grounded() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![Spy::boxed(UnitState::Idle, &log)]);
        machine.start(&mut runtime, &mut world);
        runtime.input.set_move(Vec2::new(-1.0, 0.0));

        world.position.y = 5.0;
        machine.run_decision_phase(&mut runtime, &mut world);
        assert_eq!(runtime.facing(), Direction::Left);
        assert!(!runtime.is_grounded());

        world.position.y = 1.0;
        machine.run_decision_phase(&mut runtime, &mut world);
        assert!(runtime.is_grounded());
    }

    #[test]
    fn decision_phase_keeps_platforms_ignored_during_jump_down() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![
            Spy::boxed(UnitState::Idle, &log),
            Spy::boxed(UnitState::JumpDown, &log),
        ]);
        let platform = world.add_platform(Rect::new(-2.0, 5.0, 2.0, 5.2));
        machine.start(&mut runtime, &mut world);
        runtime.probe.ignore_platform(&mut world, platform);

        machine.switch_state(UnitState::JumpDown, &mut runtime, &mut world);
        machine.run_decision_phase(&mut runtime, &mut world);
        assert!(runtime.probe.is_platform_ignored(platform));

        machine.switch_state(UnitState::Idle, &mut runtime, &mut world);
        machine.run_decision_phase(&mut runtime, &mut world);
        assert!(!runtime.probe.is_platform_ignored(platform));
    }

    #[test]
    fn decision_phase_clears_ignored_ledge_outside_fall() {
        let log = Log::default();
        let (mut machine, mut runtime, mut world) = setup(vec![
            Spy::boxed(UnitState::Idle, &log),
            Spy::boxed(UnitState::Fall, &log),
        ]);
        world.position = Vec2::new(0.0, 1.0);
        world.add_solid(Rect::new(0.6, -5.0, 3.0, 0.9));
        machine.start(&mut runtime, &mut world);

        assert!(runtime.probe.ledge_in_front(&world, Direction::Right));
        runtime.probe.ignore_ledge();
        machine.switch_state(UnitState::Fall, &mut runtime, &mut world);
        machine.run_decision_phase(&mut runtime, &mut world);
        assert!(runtime.probe.ignored_ledge().is_some());

        machine.switch_state(UnitState::Idle, &mut runtime, &mut world);
        machine.run_decision_phase(&mut runtime, &mut world);
        assert!(runtime.probe.ignored_ledge().is_none());
    }
}
