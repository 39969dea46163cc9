//! Collision probe.
//!
//! Answers the geometric questions the states ask (grounded, wall ahead, cliff
//! ahead, ledge or platform to grab, ceiling above) with ray and box casts
//! built from the unit's collider bounds, facing and configured layers.
//!
//! The probe also owns the two exclusion lists: platforms whose contacts with
//! the unit are suppressed (drop-through jumps), and the single ledge the unit
//! must not re-grab right after letting go of it. Nothing outside the probe
//! mutates them.

use std::collections::HashSet;

use bevy::prelude::*;

use crate::backend::{LayerMask, PhysicsBackend};
use crate::collision::CollisionData;
use crate::config::ProbeConfig;
use crate::direction::Direction;

/// Geometry queries plus the last detected ground, wall and ledge.
#[derive(Debug, Clone, Default)]
pub struct CollisionProbe {
    config: ProbeConfig,
    ground: Option<CollisionData>,
    on_platform: bool,
    wall: Option<CollisionData>,
    ledge: Option<CollisionData>,
    ignored_platforms: HashSet<Entity>,
    ignored_ledge: Option<Entity>,
}

impl CollisionProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }

    #[inline]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Object the unit stood on at the last grounded check.
    #[inline]
    pub fn ground(&self) -> Option<&CollisionData> {
        self.ground.as_ref()
    }

    /// Entity the unit stood on at the last grounded check, of any layer.
    ///
    /// Reported with footsteps so hosts can pick a material sound.
    #[inline]
    pub fn surface(&self) -> Option<Entity> {
        self.ground.map(|hit| hit.entity)
    }

    /// Platform-layer entity the unit stood on at the last grounded check.
    #[inline]
    pub fn platform(&self) -> Option<Entity> {
        self.ground
            .filter(|_| self.on_platform)
            .map(|hit| hit.entity)
    }

    /// Whether the object stood on belongs to the platform layer.
    #[inline]
    pub fn on_platform(&self) -> bool {
        self.on_platform
    }

    /// Wall found by the last wall check.
    #[inline]
    pub fn wall(&self) -> Option<&CollisionData> {
        self.wall.as_ref()
    }

    /// Ledge or platform found by the last ledge/platform check.
    #[inline]
    pub fn ledge(&self) -> Option<&CollisionData> {
        self.ledge.as_ref()
    }

    #[inline]
    pub fn ignored_ledge(&self) -> Option<Entity> {
        self.ignored_ledge
    }

    #[inline]
    pub fn is_platform_ignored(&self, entity: Entity) -> bool {
        self.ignored_platforms.contains(&entity)
    }

    pub fn ignored_platforms(&self) -> impl Iterator<Item = Entity> + '_ {
        self.ignored_platforms.iter().copied()
    }

    /// Current bounds of the wall, falling back to the bounds seen when found.
    pub fn wall_bounds(&self, physics: &dyn PhysicsBackend) -> Option<Rect> {
        self.wall
            .map(|hit| physics.collider_bounds(hit.entity).unwrap_or(hit.bounds))
    }

    /// Current bounds of the ledge, falling back to the bounds seen when found.
    pub fn ledge_bounds(&self, physics: &dyn PhysicsBackend) -> Option<Rect> {
        self.ledge
            .map(|hit| physics.collider_bounds(hit.entity).unwrap_or(hit.bounds))
    }

    // === Ground ===

    /// Check for ground under the unit.
    ///
    /// Three rays go down from the bottom edge: at the center and at both
    /// sides, the leading side first. Ignored platforms are skipped. Records
    /// the object stood on and whether it is a platform.
    pub fn is_grounded(&mut self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        let bounds = physics.unit_bounds();
        let half = bounds.half_size();
        let length = self.config.bounce + physics.edge_radius();
        let offsets = [0.0, half.x * facing.sign(), -half.x * facing.sign()];

        for offset in offsets {
            let origin = Vec2::new(bounds.center().x + offset, bounds.min.y);
            let hits = physics.cast_ray(origin, Vec2::NEG_Y, length, self.config.ground_mask());
            if let Some(hit) = hits
                .into_iter()
                .find(|hit| !self.ignored_platforms.contains(&hit.entity))
            {
                self.on_platform = hit.is_on(self.config.platform_layer);
                self.ground = Some(hit);
                return true;
            }
        }

        self.ground = None;
        self.on_platform = false;
        false
    }

    /// Check whether the unit's collider overlaps `entity` on the platform layer.
    pub fn is_overlapping_platform(
        &self,
        physics: &dyn PhysicsBackend,
        entity: Entity,
        facing: Direction,
    ) -> bool {
        let bounds = physics.unit_bounds();
        let size = bounds.size() + Vec2::splat(2.0 * physics.edge_radius());
        physics
            .cast_box(
                bounds.center(),
                size,
                facing.vector(),
                0.0,
                self.config.platform_layer,
            )
            .iter()
            .any(|hit| hit.entity == entity)
    }

    // === Walls ===

    /// Check for a wall ahead. Platforms the unit is inside of do not count.
    pub fn wall_in_front(&mut self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        self.wall = None;
        let hits = self.wall_box_hits(physics, facing.vector(), self.config.collision_layer);
        self.wall = hits
            .into_iter()
            .find(|hit| !self.is_overlapping_platform(physics, hit.entity, facing));
        self.wall.is_some()
    }

    /// Check for a wall ahead that reaches below the unit's position.
    pub fn wall_for_grab_in_front(
        &mut self,
        physics: &dyn PhysicsBackend,
        facing: Direction,
    ) -> bool {
        if !self.wall_in_front(physics, facing) {
            return false;
        }
        match self.wall_bounds(physics) {
            Some(bounds) => physics.position().y >= bounds.min.y,
            None => false,
        }
    }

    /// Check for a block ahead.
    pub fn block_in_front(&self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        !self
            .wall_box_hits(physics, facing.vector(), self.config.block_layer)
            .is_empty()
    }

    /// Check for a wall behind.
    pub fn wall_behind(&self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        !self
            .wall_box_hits(physics, -facing.vector(), self.config.collision_layer)
            .is_empty()
    }

    /// Check for missing ground just past the leading edge.
    pub fn cliff_in_front(&self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        let bounds = physics.unit_bounds();
        let size = bounds.size();
        let origin = bounds.center() + facing.vector() * (size.x + self.config.cliff_offset)
            - Vec2::Y * (size.y / 2.0);
        physics
            .cast_ray(
                origin,
                Vec2::NEG_Y,
                self.config.cliff_depth,
                self.config.ground_mask(),
            )
            .is_empty()
    }

    /// Solid geometry right above the unit's head.
    pub fn wall_above(&self, physics: &dyn PhysicsBackend) -> Option<CollisionData> {
        self.head_box_hit(physics, self.config.collision_layer)
    }

    /// Stairs right above the unit's head.
    pub fn stairs_above(&self, physics: &dyn PhysicsBackend) -> Option<CollisionData> {
        self.head_box_hit(physics, self.config.stairs_layer)
    }

    /// Check for solid geometry ahead of the unit's upper body.
    pub fn wall_in_front_top(&self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        self.wall_in_front_vertical(physics, facing, true)
    }

    /// Check for solid geometry ahead of the unit's feet.
    pub fn wall_in_front_bottom(&self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        self.wall_in_front_vertical(physics, facing, false)
    }

    // === Ledges and platforms ===

    /// Check for a grabbable ledge ahead, skipping the ignored ledge.
    ///
    /// Solid geometry in front of the upper body means there is no ledge.
    pub fn ledge_in_front(&mut self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        self.ledge = None;
        if self.wall_in_front_top(physics, facing) {
            return false;
        }
        let hits = self.wall_box_hits(physics, facing.vector(), self.config.collision_layer);
        self.ledge = hits
            .into_iter()
            .find(|hit| Some(hit.entity) != self.ignored_ledge);
        self.ledge.is_some()
    }

    /// Check for a grabbable platform ahead, skipping ignored platforms and
    /// the ignored ledge.
    pub fn platform_in_front(&mut self, physics: &dyn PhysicsBackend, facing: Direction) -> bool {
        self.ledge = None;
        if self.wall_in_front_top(physics, facing) {
            return false;
        }
        let hits = self.wall_box_hits(physics, facing.vector(), self.config.platform_layer);
        self.ledge = hits.into_iter().find(|hit| {
            !self.ignored_platforms.contains(&hit.entity) && Some(hit.entity) != self.ignored_ledge
        });
        self.ledge.is_some()
    }

    /// Check for solid geometry between the unit and `target`.
    pub fn is_wall_between(&self, physics: &dyn PhysicsBackend, target: Entity) -> bool {
        let Some(target_bounds) = physics.collider_bounds(target) else {
            return false;
        };
        let origin = physics.position();
        let offset = target_bounds.center() - origin;
        physics
            .cast_ray(origin, offset, offset.length(), self.config.collision_layer)
            .iter()
            .any(|hit| hit.entity != target)
    }

    // === Exclusions ===

    /// Suppress contacts with a platform and remember it.
    ///
    /// Nothing happens if the backend cannot find both colliders.
    pub fn ignore_platform(&mut self, physics: &mut dyn PhysicsBackend, entity: Entity) -> bool {
        if !physics.set_collision_ignored(entity, true) {
            return false;
        }
        self.ignored_platforms.insert(entity);
        true
    }

    /// Re-enable contacts with a platform and forget it.
    pub fn restore_platform(&mut self, physics: &mut dyn PhysicsBackend, entity: Entity) -> bool {
        // A despawned platform is dropped from the list as well.
        let restored = physics.set_collision_ignored(entity, false);
        self.ignored_platforms.remove(&entity);
        restored
    }

    /// Restore every ignored platform the unit no longer overlaps.
    pub fn try_restore_platforms(&mut self, physics: &mut dyn PhysicsBackend, facing: Direction) {
        if self.ignored_platforms.is_empty() {
            return;
        }
        let released: Vec<Entity> = self
            .ignored_platforms
            .iter()
            .copied()
            .filter(|&entity| !self.is_overlapping_platform(&*physics, entity, facing))
            .collect();
        for entity in released {
            self.restore_platform(physics, entity);
        }
    }

    /// Exclude the current ledge from ledge detection.
    pub fn ignore_ledge(&mut self) {
        self.ignored_ledge = self.ledge.map(|hit| hit.entity);
    }

    /// Clear the ignored ledge.
    pub fn restore_ledge(&mut self) {
        self.ignored_ledge = None;
    }

    // === Shapes ===

    /// Box in front of (or behind) the unit, raised above the slope limit so
    /// walkable slopes are not reported as walls.
    fn wall_box_hits(
        &self,
        physics: &dyn PhysicsBackend,
        direction: Vec2,
        mask: LayerMask,
    ) -> Vec<CollisionData> {
        let bounds = physics.unit_bounds();
        let full = bounds.size() + Vec2::splat(2.0 * physics.edge_radius());
        let bounce = self.config.bounce;
        let tangent = self.config.slope_tangent();

        let center =
            bounds.center() + Vec2::Y * (bounce / 2.0 / tangent) + direction * (full.x / 2.0);
        let size = Vec2::new(bounce * 1.5, full.y - bounce / tangent);
        physics.cast_box(center, size, direction, 0.0, mask)
    }

    fn head_box_hit(&self, physics: &dyn PhysicsBackend, mask: LayerMask) -> Option<CollisionData> {
        let bounds = physics.unit_bounds();
        let edge = physics.edge_radius();
        let center = bounds.center() + Vec2::Y * ((bounds.height() + 2.0 * edge) / 2.0);
        let size = Vec2::new(bounds.width(), 2.0 * self.config.bounce);
        physics
            .cast_box(center, size, Vec2::Y, 0.0, mask)
            .into_iter()
            .next()
    }

    fn wall_in_front_vertical(
        &self,
        physics: &dyn PhysicsBackend,
        facing: Direction,
        top: bool,
    ) -> bool {
        let bounds = physics.unit_bounds();
        let edge = physics.edge_radius();
        let bounce = self.config.bounce;
        let vertical = if top { Vec2::Y } else { Vec2::NEG_Y };

        let center = bounds.center()
            + vertical * (bounds.height() / 2.0 + edge + bounce)
            + facing.vector() * (bounds.width() / 2.0 + edge + bounce);
        let size = Vec2::splat(2.0 * bounce);
        !physics
            .cast_box(
                center,
                size,
                facing.vector(),
                0.0,
                self.config.collision_layer,
            )
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestWorld;

    fn probe() -> CollisionProbe {
        CollisionProbe::new(ProbeConfig::default())
    }

    #[test]
    fn grounded_on_floor() {
        let (world, floor) = TestWorld::on_floor();
        let mut probe = probe();

        assert!(probe.is_grounded(&world, Direction::Right));
        assert_eq!(probe.surface(), Some(floor));
        assert_eq!(probe.platform(), None);
        assert!(!probe.on_platform());
    }

    #[test]
    fn not_grounded_in_the_air() {
        let (mut world, _) = TestWorld::on_floor();
        world.position.y = 2.0;
        let mut probe = probe();

        assert!(!probe.is_grounded(&world, Direction::Right));
        assert_eq!(probe.surface(), None);
        assert_eq!(probe.platform(), None);
    }

    #[test]
    fn grounded_on_edge_ray() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        // Only the trailing edge is above ground.
        world.add_solid(Rect::new(-5.0, -1.0, -0.4, 0.0));
        let mut probe = probe();

        assert!(probe.is_grounded(&world, Direction::Right));
    }

    #[test]
    fn grounded_on_platform_sets_flag() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        let platform = world.add_platform(Rect::new(-2.0, -0.2, 2.0, 0.0));
        let mut probe = probe();

        assert!(probe.is_grounded(&world, Direction::Right));
        assert!(probe.on_platform());
        assert_eq!(probe.platform(), Some(platform));
        assert_eq!(probe.surface(), Some(platform));
    }

    #[test]
    fn ignored_platform_is_not_ground() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        let platform = world.add_platform(Rect::new(-2.0, -0.2, 2.0, 0.0));
        let mut probe = probe();

        assert!(probe.ignore_platform(&mut world, platform));
        assert!(world.ignored.contains(&platform));
        assert!(!probe.is_grounded(&world, Direction::Right));
    }

    #[test]
    fn ignore_missing_platform_is_noop() {
        let mut world = TestWorld::new(Vec2::ZERO);
        let mut probe = probe();

        assert!(!probe.ignore_platform(&mut world, Entity::from_raw(7)));
        assert_eq!(probe.ignored_platforms().count(), 0);
    }

    #[test]
    fn restore_after_leaving_platform() {
        let mut world = TestWorld::new(Vec2::new(0.0, -0.5));
        let platform = world.add_platform(Rect::new(-2.0, -0.2, 2.0, 0.0));
        let mut probe = probe();
        probe.ignore_platform(&mut world, platform);

        // Still inside the platform: stays ignored.
        probe.try_restore_platforms(&mut world, Direction::Right);
        assert!(probe.is_platform_ignored(platform));

        // Fell below it.
        world.position.y = -2.0;
        probe.try_restore_platforms(&mut world, Direction::Right);
        assert!(!probe.is_platform_ignored(platform));
        assert!(!world.ignored.contains(&platform));
    }

    #[test]
    fn wall_in_front_only_in_facing_direction() {
        let (mut world, _) = TestWorld::on_floor();
        let wall = world.add_solid(Rect::new(0.6, 0.0, 1.6, 5.0));
        let mut probe = probe();

        assert!(probe.wall_in_front(&world, Direction::Right));
        assert_eq!(probe.wall().map(|hit| hit.entity), Some(wall));
        assert!(probe.wall_behind(&world, Direction::Left));

        assert!(!probe.wall_in_front(&world, Direction::Left));
        assert!(probe.wall().is_none());
    }

    #[test]
    fn low_step_is_not_a_wall() {
        let (mut world, _) = TestWorld::on_floor();
        // Lower than the slope allowance at the bottom of the wall box.
        world.add_solid(Rect::new(0.6, 0.0, 1.6, 0.2));
        let mut probe = probe();

        assert!(!probe.wall_in_front(&world, Direction::Right));
    }

    #[test]
    fn wall_for_grab_requires_unit_above_wall_bottom() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        world.add_solid(Rect::new(0.6, 0.5, 1.6, 5.0));
        let mut probe = probe();
        assert!(probe.wall_for_grab_in_front(&world, Direction::Right));

        world.position.y = 0.4;
        assert!(probe.wall_in_front(&world, Direction::Right));
        assert!(!probe.wall_for_grab_in_front(&world, Direction::Right));
    }

    #[test]
    fn cliff_detection() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        world.add_solid(Rect::new(-5.0, -1.0, 0.6, 0.0));
        let probe = probe();

        assert!(probe.cliff_in_front(&world, Direction::Right));
        assert!(!probe.cliff_in_front(&world, Direction::Left));
    }

    #[test]
    fn wall_above_and_stairs_above() {
        let (mut world, _) = TestWorld::on_floor();
        let probe = probe();
        assert!(probe.wall_above(&world).is_none());

        let ceiling = world.add_solid(Rect::new(-2.0, 2.1, 2.0, 3.0));
        assert_eq!(
            probe.wall_above(&world).map(|hit| hit.entity),
            Some(ceiling)
        );

        let stairs = world.add_body(
            Rect::new(-0.2, 2.0, 0.2, 2.2),
            ProbeConfig::default().stairs_layer,
        );
        assert_eq!(
            probe.stairs_above(&world).map(|hit| hit.entity),
            Some(stairs)
        );
    }

    #[test]
    fn block_in_front_uses_block_layer() {
        let (mut world, _) = TestWorld::on_floor();
        let probe = probe();
        world.add_body(
            Rect::new(0.6, 0.0, 1.6, 1.0),
            ProbeConfig::default().block_layer,
        );

        assert!(probe.block_in_front(&world, Direction::Right));
        assert!(!probe.block_in_front(&world, Direction::Left));
    }

    #[test]
    fn ledge_detected_when_upper_body_is_clear() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        let ledge = world.add_solid(Rect::new(0.6, -5.0, 3.0, 0.9));
        let mut probe = probe();

        assert!(!probe.wall_in_front_top(&world, Direction::Right));
        assert!(probe.ledge_in_front(&world, Direction::Right));
        assert_eq!(probe.ledge().map(|hit| hit.entity), Some(ledge));
    }

    #[test]
    fn tall_wall_is_not_a_ledge() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        world.add_solid(Rect::new(0.6, -5.0, 3.0, 5.0));
        let mut probe = probe();

        assert!(probe.wall_in_front_top(&world, Direction::Right));
        assert!(!probe.ledge_in_front(&world, Direction::Right));
        assert!(probe.ledge().is_none());
    }

    #[test]
    fn ignored_ledge_is_skipped_until_restored() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        world.add_solid(Rect::new(0.6, -5.0, 3.0, 0.9));
        let mut probe = probe();

        assert!(probe.ledge_in_front(&world, Direction::Right));
        probe.ignore_ledge();
        assert!(!probe.ledge_in_front(&world, Direction::Right));

        probe.restore_ledge();
        assert!(probe.ledge_in_front(&world, Direction::Right));
    }

    #[test]
    fn platform_in_front_skips_ignored_platforms() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        let platform = world.add_platform(Rect::new(0.6, 0.7, 3.0, 0.9));
        let mut probe = probe();

        assert!(probe.platform_in_front(&world, Direction::Right));
        assert_eq!(probe.ledge().map(|hit| hit.entity), Some(platform));

        probe.ignore_platform(&mut world, platform);
        assert!(!probe.platform_in_front(&world, Direction::Right));
    }

    #[test]
    fn wall_between_target() {
        let mut world = TestWorld::new(Vec2::new(0.0, 1.0));
        let target = world.add_solid(Rect::new(9.0, 0.0, 10.0, 2.0));
        let probe = probe();
        assert!(!probe.is_wall_between(&world, target));

        world.add_solid(Rect::new(4.0, -5.0, 5.0, 5.0));
        assert!(probe.is_wall_between(&world, target));
    }
}
