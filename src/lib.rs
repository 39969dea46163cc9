//! # `unit_locomotion`
//!
//! A state-machine locomotion controller for 2D platformer units, with a
//! physics backend abstraction.
//!
//! Every unit runs a finite state machine over locomotion states (idle, walk,
//! run, crouch, the jump family, fall, land, wall and ledge grabs, climbs).
//! Each state decides when to hand over to another one and how the unit's
//! velocity is integrated while it is current.
//!
//! - Reads the world through a collision probe: ground, walls, cliffs, ledges
//!   and platforms found with ray and box casts on configurable layers
//! - Drops through one-way platforms and restores their contacts once clear
//! - Gates jumps, grabs and climbs on animation signals (take-off frame, clip
//!   start and end) instead of timers
//! - Abstracts the physics engine behind [`backend::PhysicsBackend`] (Rapier2D
//!   included behind the `rapier2d` feature)
//!
//! ## Architecture
//!
//! Each unit is updated in two phases:
//! 1. The **decision phase** runs once per frame in `Update`: facing, platform
//!    and ledge restoration, grounded check, then the current state's decision
//!    step (skipped on the first frame after a transition)
//! 2. The **physics phase** runs every `FixedUpdate` tick and integrates
//!    velocity with the current state's movement strategy
//!
//! Input and animation signals arrive as events and are forwarded to the
//! current state as they come in.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use unit_locomotion::prelude::*;
//!
//! // Configure a unit and drive it with a per-frame intent
//! let config = UnitConfig::player().with_max_jumps(2);
//! let mut intent = UnitIntent::default();
//! intent.set_move(Vec2::new(1.0, 0.0));
//!
//! // Spawn both on an entity with a physics body; the plugin adds the rest
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod collision;
pub mod config;
pub mod direction;
pub mod input;
pub mod machine;
pub mod movement;
pub mod probe;
pub mod state;
pub mod states;
pub mod systems;
pub mod unit;

#[cfg(feature = "rapier2d")]
pub mod rapier;

#[cfg(test)]
mod test_support;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{
        names, AnimationEvent, AnimationSignal, AnimatorParameters, FootstepEvent,
    };
    pub use crate::backend::{IgnoredContacts, LayerMask, LocomotionBackend, PhysicsBackend};
    pub use crate::config::{MovementContext, ProbeConfig, StateSettings, UnitConfig};
    pub use crate::direction::Direction;
    pub use crate::input::{InputAction, UnitInputEvent, UnitIntent};
    pub use crate::movement::MovementStrategy;
    pub use crate::state::{Airborne, Grounded, UnitState};
    pub use crate::states::{StateBase, StateHandler};
    pub use crate::systems::UnitVisual;
    pub use crate::unit::LocomotionUnit;
    pub use crate::{LocomotionPlugin, LocomotionSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dLocomotionBackend, RapierUnitBundle};
}

/// System sets used by the locomotion systems, in execution order within
/// `Update`. [`LocomotionSet::Physics`] runs in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Unit setup and input and animation event delivery.
    Input,
    /// Decision phase and marker sync.
    Decision,
    /// Animator parameters and visual facing.
    Output,
    /// Physics phase.
    Physics,
}

/// Main plugin for the locomotion system.
///
/// This plugin is generic over a physics backend `B` which gives the state
/// machine access to each unit's body.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dLocomotionBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
#[cfg_attr(feature = "rapier2d", doc = "```rust,no_run")]
#[cfg_attr(not(feature = "rapier2d"), doc = "```rust,ignore")]
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use unit_locomotion::prelude::*;
/// use unit_locomotion::rapier::LocomotionPhysicsHooks;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<LocomotionPhysicsHooks>::default())
///     .add_plugins(LocomotionPlugin::<Rapier2dLocomotionBackend>::default())
///     .run();
/// ```
pub struct LocomotionPlugin<B: backend::LocomotionBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::UnitConfig>();
        app.register_type::<input::UnitIntent>();
        app.register_type::<animation::AnimatorParameters>();
        app.register_type::<backend::IgnoredContacts>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<systems::UnitVisual>();

        app.add_event::<input::UnitInputEvent>();
        app.add_event::<animation::AnimationEvent>();
        app.add_event::<animation::FootstepEvent>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            Update,
            (
                LocomotionSet::Input,
                LocomotionSet::Decision,
                LocomotionSet::Output,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                systems::setup_units,
                systems::dispatch_intents,
                systems::dispatch_input_events::<B>,
                systems::dispatch_animation_events::<B>,
            )
                .chain()
                .in_set(LocomotionSet::Input),
        );
        app.add_systems(
            Update,
            (
                systems::run_decision_phase::<B>,
                systems::sync_state_markers,
            )
                .chain()
                .in_set(LocomotionSet::Decision),
        );
        app.add_systems(
            Update,
            (
                systems::flush_animator_commands,
                systems::sync_visual_facing,
            )
                .in_set(LocomotionSet::Output),
        );

        // Velocity integration at a fixed rate
        app.add_systems(
            FixedUpdate,
            systems::run_physics_phase::<B>.in_set(LocomotionSet::Physics),
        );
    }
}
