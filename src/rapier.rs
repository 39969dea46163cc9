//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.
//!
//! Probe queries go through the Rapier query pipeline. Collider bounds are
//! derived from the collider shape and its global translation; rotation and
//! scale of colliders are not taken into account.
//!
//! Contacts a unit has switched off (platforms it drops through) are only
//! suppressed when Rapier runs with [`LocomotionPhysicsHooks`]:
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_rapier2d::prelude::*;
//! use unit_locomotion::prelude::*;
//! use unit_locomotion::rapier::{LocomotionPhysicsHooks, Rapier2dLocomotionBackend};
//!
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(RapierPhysicsPlugin::<LocomotionPhysicsHooks>::default())
//!     .add_plugins(LocomotionPlugin::<Rapier2dLocomotionBackend>::default())
//!     .run();
//! ```

use bevy::ecs::system::{SystemParam, SystemState};
use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::parry::shape::{Cuboid, SharedShape};
use bevy_rapier2d::prelude::*;

use crate::backend::{IgnoredContacts, LayerMask, LocomotionBackend, PhysicsBackend};
use crate::collision::CollisionData;
use crate::unit::LocomotionUnit;

/// Upper bound on colliders reported by one box sweep.
const MAX_SWEEP_HITS: usize = 8;

/// Rapier2D physics backend for locomotion units.
///
/// A unit needs a [`Collider`], a [`Velocity`] and a rigid body. Its own
/// gravity is integrated by the movement strategies, so Rapier's gravity
/// should be disabled for it (see [`RapierUnitBundle`]).
pub struct Rapier2dLocomotionBackend;

type UnitBodies = (
    Entity,
    &'static mut LocomotionUnit,
    &'static mut Transform,
    &'static mut Velocity,
    &'static mut IgnoredContacts,
    &'static Collider,
);

type SceneColliders = (
    &'static Collider,
    &'static GlobalTransform,
    Option<&'static CollisionGroups>,
);

type UnitBodyParams = (
    ReadRapierContext<'static, 'static>,
    Query<'static, 'static, UnitBodies>,
    Query<'static, 'static, SceneColliders>,
);

/// Query state shared by every locomotion system that visits units.
#[derive(Resource)]
struct UnitBodyState(SystemState<UnitBodyParams>);

impl FromWorld for UnitBodyState {
    fn from_world(world: &mut World) -> Self {
        Self(SystemState::new(world))
    }
}

impl LocomotionBackend for Rapier2dLocomotionBackend {
    fn plugin() -> impl Plugin {
        Rapier2dLocomotionPlugin
    }

    fn for_each_unit(
        world: &mut World,
        mut visit: impl FnMut(Entity, &mut LocomotionUnit, &mut dyn PhysicsBackend),
    ) {
        world.init_resource::<UnitBodyState>();
        world.resource_scope(|world, mut state: Mut<UnitBodyState>| {
            let (rapier_context, mut q_units, q_scene) = state.0.get_mut(world);
            let Ok(context) = rapier_context.single() else {
                return;
            };

            for (entity, mut unit, mut transform, mut velocity, mut ignored, collider) in
                &mut q_units
            {
                let start_position = transform.translation.xy();
                let start_velocity = velocity.linvel;
                let mut body = RapierUnitBody {
                    context: &context,
                    scene: &q_scene,
                    entity,
                    shape: ShapeExtents::of(collider),
                    position: start_position,
                    velocity: start_velocity,
                    ignored: &mut *ignored,
                };
                visit(entity, &mut *unit, &mut body);

                let (position, linvel) = (body.position, body.velocity);
                // Writing the transform teleports the body, so only do it on request.
                if position != start_position {
                    transform.translation.x = position.x;
                    transform.translation.y = position.y;
                }
                if linvel != start_velocity {
                    velocity.linvel = linvel;
                }
            }
        });
    }
}

/// Plugin that sets up Rapier2D-specific systems for locomotion units.
pub struct Rapier2dLocomotionPlugin;

impl Plugin for Rapier2dLocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UnitBodyState>();
        app.add_systems(PostUpdate, enable_contact_filtering);
    }
}

/// Make Rapier consult [`LocomotionPhysicsHooks`] for new units.
pub fn enable_contact_filtering(
    mut commands: Commands,
    q_units: Query<(Entity, Option<&ActiveHooks>), (Added<LocomotionUnit>, With<Collider>)>,
) {
    for (entity, hooks) in &q_units {
        let hooks = hooks.copied().unwrap_or(ActiveHooks::empty());
        if !hooks.contains(ActiveHooks::FILTER_CONTACT_PAIRS) {
            commands
                .entity(entity)
                .insert(hooks | ActiveHooks::FILTER_CONTACT_PAIRS);
        }
    }
}

/// Physics hooks that drop contacts a unit has switched off.
#[derive(SystemParam)]
pub struct LocomotionPhysicsHooks<'w, 's> {
    ignored: Query<'w, 's, &'static IgnoredContacts>,
}

impl LocomotionPhysicsHooks<'_, '_> {
    fn ignores(&self, unit: Entity, other: Entity) -> bool {
        self.ignored
            .get(unit)
            .is_ok_and(|ignored| ignored.contains(other))
    }
}

impl BevyPhysicsHooks for LocomotionPhysicsHooks<'_, '_> {
    fn filter_contact_pair(&self, context: PairFilterContextView) -> Option<SolverFlags> {
        let (a, b) = (context.collider1(), context.collider2());
        if self.ignores(a, b) || self.ignores(b, a) {
            return None;
        }
        Some(SolverFlags::COMPUTE_IMPULSES)
    }
}

/// Box extents of a collider shape, split into core and rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ShapeExtents {
    half_size: Vec2,
    radius: f32,
}

impl ShapeExtents {
    fn of(collider: &Collider) -> Self {
        if let Some(cuboid) = collider.as_cuboid() {
            return Self {
                half_size: cuboid.half_extents(),
                radius: 0.0,
            };
        }
        if let Some(round) = collider.raw.as_round_cuboid() {
            let half = round.inner_shape.half_extents;
            return Self {
                half_size: Vec2::new(half.x, half.y),
                radius: round.border_radius,
            };
        }
        if let Some(capsule) = collider.as_capsule() {
            let segment = capsule.segment();
            let half_height = (segment.a().y - segment.b().y).abs() / 2.0;
            let radius = capsule.radius();
            return Self {
                half_size: Vec2::new(radius, half_height + radius),
                radius: 0.0,
            };
        }
        if let Some(ball) = collider.as_ball() {
            return Self {
                half_size: Vec2::splat(ball.radius()),
                radius: 0.0,
            };
        }
        Self {
            half_size: Vec2::ZERO,
            radius: 0.0,
        }
    }

    /// Bounds including the rounding, centered at `center`.
    fn outer_bounds(&self, center: Vec2) -> Rect {
        Rect::from_center_half_size(center, self.half_size + Vec2::splat(self.radius))
    }
}

/// Physics view of one unit for the duration of a state machine call.
struct RapierUnitBody<'a, 'w, 's> {
    context: &'a RapierContext<'a>,
    scene: &'a Query<'w, 's, SceneColliders>,
    entity: Entity,
    shape: ShapeExtents,
    position: Vec2,
    velocity: Vec2,
    ignored: &'a mut IgnoredContacts,
}

impl RapierUnitBody<'_, '_, '_> {
    fn filter<'f>(&self, mask: LayerMask) -> QueryFilter<'f> {
        QueryFilter::default()
            .exclude_rigid_body(self.entity)
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(mask.0),
            ))
    }

    fn hit(&self, entity: Entity, distance: f32, point: Vec2) -> Option<CollisionData> {
        let (collider, transform, groups) = self.scene.get(entity).ok()?;
        let bounds = ShapeExtents::of(collider).outer_bounds(transform.translation().xy());
        let layers = groups.map_or(LayerMask::ALL, |groups| {
            LayerMask(groups.memberships.bits())
        });
        Some(CollisionData::new(distance, point, entity, bounds, layers))
    }

    fn overlaps(&self, center: Vec2, shape: &Cuboid, mask: LayerMask) -> Vec<CollisionData> {
        let mut hits = Vec::new();
        self.context.intersections_with_shape(
            center,
            0.0,
            &Collider::from(SharedShape::new(*shape)),
            self.filter(mask),
            |entity| {
                if let Some(bounds) = self.collider_bounds(entity) {
                    hits.extend(self.hit(entity, 0.0, bounds.center()));
                }
                true
            },
        );
        hits
    }
}

impl PhysicsBackend for RapierUnitBody<'_, '_, '_> {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<CollisionData> {
        let direction = direction.normalize_or_zero();
        let mut hits = Vec::new();
        self.context.intersections_with_ray(
            origin,
            direction,
            max_distance,
            true,
            self.filter(mask),
            |entity, intersection| {
                hits.extend(self.hit(entity, intersection.time_of_impact, intersection.point));
                true
            },
        );
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn cast_box(
        &self,
        center: Vec2,
        size: Vec2,
        direction: Vec2,
        distance: f32,
        mask: LayerMask,
    ) -> Vec<CollisionData> {
        let shape = Cuboid::new((size * 0.5).into());
        let direction = direction.normalize_or_zero();
        if distance <= 0.0 || direction == Vec2::ZERO {
            return self.overlaps(center, &shape, mask);
        }

        // The pipeline reports the first hit only; sweep again without it.
        let mut found: Vec<Entity> = Vec::new();
        let mut hits = Vec::new();
        while found.len() < MAX_SWEEP_HITS {
            let unseen = |entity: Entity| !found.contains(&entity);
            let filter = self.filter(mask).predicate(&unseen);
            let options = ShapeCastOptions {
                max_time_of_impact: distance,
                stop_at_penetration: true,
                ..default()
            };
            let Some((entity, hit)) = self.context.cast_shape(
                center,
                0.0,
                direction,
                &Collider::from(SharedShape::new(shape)),
                options,
                filter,
            ) else {
                break;
            };
            let point = hit
                .details
                .map(|details| details.witness1)
                .unwrap_or(center + direction * hit.time_of_impact);
            found.push(entity);
            hits.extend(self.hit(entity, hit.time_of_impact, point));
        }
        hits
    }

    fn collider_bounds(&self, entity: Entity) -> Option<Rect> {
        let (collider, transform, _) = self.scene.get(entity).ok()?;
        Some(ShapeExtents::of(collider).outer_bounds(transform.translation().xy()))
    }

    fn unit_bounds(&self) -> Rect {
        Rect::from_center_half_size(self.position, self.shape.half_size)
    }

    fn edge_radius(&self) -> f32 {
        self.shape.radius
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn set_collision_ignored(&mut self, other: Entity, ignored: bool) -> bool {
        if self.scene.get(other).is_err() {
            return false;
        }
        self.ignored.set(other, ignored);
        true
    }
}

/// Bundle for creating a locomotion unit with Rapier2D physics.
///
/// The movement strategies own the unit's velocity, including gravity, so
/// Rapier's gravity is disabled and rotation is locked.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use unit_locomotion::prelude::*;
/// use unit_locomotion::rapier::RapierUnitBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         UnitConfig::player(),
///         UnitIntent::default(),
///         RapierUnitBundle::new(),
///         Collider::round_cuboid(0.45, 0.95, 0.05),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct RapierUnitBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub gravity_scale: GravityScale,
    pub locked_axes: LockedAxes,
    /// Contact filtering for dropped-through platforms.
    pub active_hooks: ActiveHooks,
}

impl Default for RapierUnitBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierUnitBundle {
    /// Dynamic, rotation-locked body without Rapier gravity.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            gravity_scale: GravityScale(0.0),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            active_hooks: ActiveHooks::FILTER_CONTACT_PAIRS,
        }
    }

    /// Set the rigid body type.
    ///
    /// [`RigidBody::KinematicVelocityBased`] suits units that should push
    /// nothing around.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }
}

/// Collision groups placing a collider on the given probe layers.
pub fn layer_groups(layers: LayerMask) -> CollisionGroups {
    CollisionGroups::new(Group::from_bits_truncate(layers.0), Group::ALL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_extents() {
        let extents = ShapeExtents::of(&Collider::cuboid(0.5, 1.0));
        assert_eq!(extents.half_size, Vec2::new(0.5, 1.0));
        assert_eq!(extents.radius, 0.0);
        assert_eq!(
            extents.outer_bounds(Vec2::new(2.0, 1.0)),
            Rect::new(1.5, 0.0, 2.5, 2.0)
        );
    }

    #[test]
    fn round_cuboid_extents_keep_radius_apart() {
        let extents = ShapeExtents::of(&Collider::round_cuboid(0.45, 0.95, 0.05));
        assert!((extents.half_size - Vec2::new(0.45, 0.95)).length() < 1e-6);
        assert!((extents.radius - 0.05).abs() < 1e-6);

        let outer = extents.outer_bounds(Vec2::ZERO);
        assert!((outer.max - Vec2::new(0.5, 1.0)).length() < 1e-6);
    }

    #[test]
    fn capsule_extents() {
        let extents = ShapeExtents::of(&Collider::capsule_y(0.5, 0.25));
        assert!((extents.half_size - Vec2::new(0.25, 0.75)).length() < 1e-6);
    }

    #[test]
    fn layer_groups_use_probe_bits() {
        let groups = layer_groups(LayerMask::layer(1));
        assert_eq!(groups.memberships.bits(), 2);
        assert_eq!(groups.filters, Group::ALL);
    }
}
