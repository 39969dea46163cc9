//! Physics backend abstraction.
//!
//! The locomotion core never talks to a physics engine directly. Every
//! geometry query and every read/write of the unit's rigid body goes through
//! [`PhysicsBackend`], which a backend implements for one unit at a time.
//! This keeps the state machine testable against a scripted world and lets the
//! engine be swapped (Rapier2D is included behind the `rapier2d` feature).

use std::collections::HashSet;
use std::ops::BitOr;

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::unit::LocomotionUnit;

/// Bit mask of physics layers used to filter probe queries.
///
/// A collider belongs to one or more layers; a query only reports colliders
/// whose layers intersect the query mask.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing the single layer at `index` (0..32).
    pub const fn layer(index: u32) -> Self {
        Self(1 << index)
    }

    /// Check whether the two masks share at least one layer.
    #[inline]
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Check whether the mask matches nothing.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        LayerMask(self.0 | rhs.0)
    }
}

/// Colliders whose contacts with this unit are currently switched off.
///
/// Backends keep it in sync from [`PhysicsBackend::set_collision_ignored`]
/// and consult it when filtering contact pairs.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct IgnoredContacts {
    entities: HashSet<Entity>,
}

impl IgnoredContacts {
    /// Switch contacts with `other` off (`true`) or back on.
    pub fn set(&mut self, other: Entity, ignored: bool) {
        if ignored {
            self.entities.insert(other);
        } else {
            self.entities.remove(&other);
        }
    }

    #[inline]
    pub fn contains(&self, other: Entity) -> bool {
        self.entities.contains(&other)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Physics operations the locomotion core needs for a single unit.
///
/// An implementation is bound to one unit (its rigid body and collider) for
/// the duration of a call into the core. Queries report every collider they
/// touch, including colliders whose contacts with the unit are currently
/// ignored: filtering by the ignore lists is the probe's job.
///
/// Implementations must be object safe so state handlers can receive them as
/// `&mut dyn PhysicsBackend`.
pub trait PhysicsBackend {
    /// Cast a ray and return every hit, nearest first.
    ///
    /// A ray that starts inside a collider reports it at distance zero.
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<CollisionData>;

    /// Sweep an axis-aligned box and return every hit, nearest first.
    ///
    /// A `distance` of zero is a plain overlap test at `center`.
    fn cast_box(
        &self,
        center: Vec2,
        size: Vec2,
        direction: Vec2,
        distance: f32,
        mask: LayerMask,
    ) -> Vec<CollisionData>;

    /// World-space bounds of another collider, if it still exists.
    fn collider_bounds(&self, entity: Entity) -> Option<Rect>;

    /// World-space bounds of the unit's own collider (without edge radius).
    fn unit_bounds(&self) -> Rect;

    /// Rounding radius of the unit's collider.
    fn edge_radius(&self) -> f32 {
        0.0
    }

    /// Current linear velocity of the unit's rigid body.
    fn velocity(&self) -> Vec2;

    /// Overwrite the linear velocity of the unit's rigid body.
    fn set_velocity(&mut self, velocity: Vec2);

    /// Current position of the unit's transform.
    fn position(&self) -> Vec2;

    /// Teleport the unit's transform.
    fn set_position(&mut self, position: Vec2);

    /// Enable or disable contacts between the unit and `other`.
    ///
    /// Returns `false` when either collider is missing and nothing changed.
    fn set_collision_ignored(&mut self, other: Entity, ignored: bool) -> bool;
}

/// A physics engine integration that can drive [`LocomotionUnit`]s.
///
/// The core systems are generic over the backend. They ask it to visit every
/// unit with a [`PhysicsBackend`] view bound to that unit's body, and run the
/// state machine against that view.
///
pub trait LocomotionBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Call `visit` for every unit this backend can drive.
    ///
    /// Units whose body is incomplete (no collider yet, for example) are
    /// skipped.
    fn for_each_unit(
        world: &mut World,
        visit: impl FnMut(Entity, &mut LocomotionUnit, &mut dyn PhysicsBackend),
    );
}
