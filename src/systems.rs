//! Core locomotion systems.
//!
//! Systems that run the state machine need a physics view of each unit's
//! body, so they are exclusive systems generic over the backend, which visits
//! every unit with that view. The remaining systems only move data between
//! components and events.

use std::collections::HashMap;

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::animation::{AnimationEvent, AnimationSignal, AnimatorParameters, FootstepEvent};
use crate::backend::LocomotionBackend;
use crate::config::UnitConfig;
use crate::input::{InputAction, UnitInputEvent, UnitIntent};
use crate::state::{Airborne, Grounded};
use crate::unit::LocomotionUnit;

/// Marker for the child entity that carries a unit's sprite or model.
///
/// Its rotation follows the unit's facing.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct UnitVisual;

/// Build a [`LocomotionUnit`] for every entity that just got a [`UnitConfig`].
pub fn setup_units(mut commands: Commands, q_new: Query<(Entity, &UnitConfig), Added<UnitConfig>>) {
    for (entity, config) in &q_new {
        let unit = LocomotionUnit::new(config.clone());
        if !unit.machine().has_handler(config.initial_state) {
            warn!(
                "unit {entity} starts in {:?}, which has no handler; it stays inactive",
                config.initial_state
            );
        }
        debug!(
            "locomotion unit {entity} created in {:?}",
            config.initial_state
        );
        commands.entity(entity).insert(unit);
    }
}

/// Turn per-frame [`UnitIntent`] changes into input events.
pub fn dispatch_intents(
    mut q_intents: Query<(Entity, &mut UnitIntent), Changed<UnitIntent>>,
    mut events: EventWriter<UnitInputEvent>,
) {
    for (entity, mut intent) in &mut q_intents {
        // Diffing must not count as a change, or every intent is revisited next frame.
        for action in intent.bypass_change_detection().take_changes() {
            events.write(UnitInputEvent::new(entity, action));
        }
    }
}

/// Forward input events to their units, in the order they were sent.
pub fn dispatch_input_events<B: LocomotionBackend>(
    world: &mut World,
    mut cursor: Local<EventCursor<UnitInputEvent>>,
) {
    let Some(events) = world.get_resource::<Events<UnitInputEvent>>() else {
        return;
    };
    let mut pending: HashMap<Entity, Vec<InputAction>> = HashMap::new();
    for event in cursor.read(events) {
        pending.entry(event.entity).or_default().push(event.action);
    }
    if pending.is_empty() {
        return;
    }

    B::for_each_unit(world, |entity, unit, physics| {
        let Some(actions) = pending.remove(&entity) else {
            return;
        };
        for action in actions {
            unit.handle_input(action, physics);
        }
    });

    for entity in pending.keys() {
        trace!("dropping input for {entity}: not a locomotion unit");
    }
}

/// Forward animation signals to their units.
///
/// Footstep signals are also re-emitted as [`FootstepEvent`]s carrying the
/// collider the unit stands on, whether or not the current state listens.
pub fn dispatch_animation_events<B: LocomotionBackend>(
    world: &mut World,
    mut cursor: Local<EventCursor<AnimationEvent>>,
) {
    let Some(events) = world.get_resource::<Events<AnimationEvent>>() else {
        return;
    };
    let mut pending: HashMap<Entity, Vec<AnimationSignal>> = HashMap::new();
    for event in cursor.read(events) {
        pending
            .entry(event.entity)
            .or_default()
            .push(event.signal.clone());
    }
    if pending.is_empty() {
        return;
    }

    let mut footsteps = Vec::new();
    B::for_each_unit(world, |entity, unit, physics| {
        let Some(signals) = pending.remove(&entity) else {
            return;
        };
        for signal in signals {
            if signal == AnimationSignal::Footstep {
                footsteps.push(FootstepEvent {
                    entity,
                    surface: unit.probe().surface(),
                });
            }
            if !unit.handle_animation(&signal, physics) {
                trace!("unit {entity} in {:?} ignored {signal:?}", unit.state());
            }
        }
    });

    if !footsteps.is_empty() {
        if let Some(mut events) = world.get_resource_mut::<Events<FootstepEvent>>() {
            events.extend(footsteps);
        }
    }
}

/// Run the decision phase of every unit, starting units on their first frame.
pub fn run_decision_phase<B: LocomotionBackend>(world: &mut World) {
    B::for_each_unit(world, |_, unit, physics| {
        if !unit.is_started() {
            if !unit.machine().has_handler(unit.state()) {
                return;
            }
            unit.start(physics);
        }
        unit.decision_phase(physics);
    });
}

/// Run the physics phase of every unit. Scheduled in `FixedUpdate`.
pub fn run_physics_phase<B: LocomotionBackend>(world: &mut World) {
    B::for_each_unit(world, |_, unit, physics| {
        unit.physics_phase(physics);
    });
}

/// Publish the animator commands queued this frame.
pub fn flush_animator_commands(mut q_units: Query<(&mut LocomotionUnit, &mut AnimatorParameters)>) {
    for (mut unit, mut parameters) in &mut q_units {
        let commands = unit.take_animator_commands();
        // An empty frame still has to clear last frame's trigger.
        if commands.is_empty() && parameters.trigger.is_none() {
            continue;
        }
        parameters.apply(commands);
    }
}

/// Turn [`UnitVisual`] children to match their unit's facing.
pub fn sync_visual_facing(
    q_units: Query<(&LocomotionUnit, &Children)>,
    mut q_visuals: Query<&mut Transform, With<UnitVisual>>,
) {
    for (unit, children) in &q_units {
        let rotation = unit.facing().rotation();
        let children: &[Entity] = children;
        for &child in children {
            let Ok(mut transform) = q_visuals.get_mut(child) else {
                continue;
            };
            if transform.rotation != rotation {
                transform.rotation = rotation;
            }
        }
    }
}

/// Sync the [`Grounded`] / [`Airborne`] markers with each unit's grounded flag.
pub fn sync_state_markers(
    mut commands: Commands,
    q_units: Query<(Entity, &LocomotionUnit, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, unit, has_grounded, has_airborne) in &q_units {
        if !unit.is_started() {
            continue;
        }
        if unit.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded);
            commands.entity(entity).remove::<Airborne>();
        } else if !unit.is_grounded() && !has_airborne {
            commands.entity(entity).remove::<Grounded>();
            commands.entity(entity).insert(Airborne);
        }
    }
}
