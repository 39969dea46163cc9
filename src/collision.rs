//! Collision hit records.
//!
//! These structures hold the results of physics queries (raycasts and box
//! casts) issued by the collision probe.

use bevy::prelude::*;

use crate::backend::LayerMask;

/// Information about one collider touched by a ray or box cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Distance along the cast direction to the hit (0 for overlaps).
    pub distance: f32,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity owning the collider that was hit.
    pub entity: Entity,
    /// World-space bounds of the collider that was hit.
    pub bounds: Rect,
    /// Physics layers the hit collider belongs to.
    pub layers: LayerMask,
}

impl CollisionData {
    /// Create a hit record.
    pub fn new(
        distance: f32,
        point: Vec2,
        entity: Entity,
        bounds: Rect,
        layers: LayerMask,
    ) -> Self {
        Self {
            distance,
            point,
            entity,
            bounds,
            layers,
        }
    }

    /// Check whether the hit collider is on any layer of `mask`.
    #[inline]
    pub fn is_on(&self, mask: LayerMask) -> bool {
        self.layers.intersects(mask)
    }
}
