//! Scripted physics world for unit tests.
//!
//! Static axis-aligned boxes on layers, one box-shaped unit, no solver. Tests
//! move the unit by hand (or with [`TestWorld::advance`]) and the probe sees
//! exactly the geometry they set up.

use std::collections::HashSet;

use bevy::prelude::*;

use crate::backend::{LayerMask, PhysicsBackend};
use crate::collision::CollisionData;
use crate::config::ProbeConfig;

pub(crate) struct TestBody {
    pub entity: Entity,
    pub rect: Rect,
    pub layers: LayerMask,
}

pub(crate) struct TestWorld {
    pub bodies: Vec<TestBody>,
    pub position: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub edge_radius: f32,
    pub ignored: HashSet<Entity>,
    next_id: u32,
}

impl TestWorld {
    /// Unit of size 1x2 centered at `position`, empty world.
    pub fn new(position: Vec2) -> Self {
        Self {
            bodies: Vec::new(),
            position,
            size: Vec2::new(1.0, 2.0),
            velocity: Vec2::ZERO,
            edge_radius: 0.0,
            ignored: HashSet::new(),
            next_id: 100,
        }
    }

    /// Unit standing on a wide floor whose top is at y = 0.
    pub fn on_floor() -> (Self, Entity) {
        let mut world = Self::new(Vec2::new(0.0, 1.0));
        let floor = world.add_solid(Rect::new(-50.0, -1.0, 50.0, 0.0));
        (world, floor)
    }

    pub fn add_body(&mut self, rect: Rect, layers: LayerMask) -> Entity {
        let entity = Entity::from_raw(self.next_id);
        self.next_id += 1;
        self.bodies.push(TestBody {
            entity,
            rect,
            layers,
        });
        entity
    }

    pub fn add_solid(&mut self, rect: Rect) -> Entity {
        self.add_body(rect, ProbeConfig::default().collision_layer)
    }

    pub fn add_platform(&mut self, rect: Rect) -> Entity {
        self.add_body(rect, ProbeConfig::default().platform_layer)
    }

    /// Integrate position over `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    fn hit(&self, body: &TestBody, distance: f32, point: Vec2) -> CollisionData {
        CollisionData::new(distance, point, body.entity, body.rect, body.layers)
    }
}

fn ray_rect(origin: Vec2, direction: Vec2, max_distance: f32, rect: Rect) -> Option<f32> {
    let mut t_min = 0.0_f32;
    let mut t_max = max_distance;
    for axis in 0..2 {
        let o = origin[axis];
        let d = direction[axis];
        let (lo, hi) = (rect.min[axis], rect.max[axis]);
        if d.abs() < 1e-9 {
            if o < lo || o > hi {
                return None;
            }
        } else {
            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    Some(t_min)
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.min.x < b.max.x && a.max.x > b.min.x && a.min.y < b.max.y && a.max.y > b.min.y
}

impl PhysicsBackend for TestWorld {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<CollisionData> {
        let direction = direction.normalize_or_zero();
        let mut hits: Vec<CollisionData> = self
            .bodies
            .iter()
            .filter(|body| body.layers.intersects(mask))
            .filter_map(|body| {
                ray_rect(origin, direction, max_distance, body.rect)
                    .map(|t| self.hit(body, t, origin + direction * t))
            })
            .collect();
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
        let start = Rect::from_center_size(center, size);
        let end = Rect::from_center_size(center + direction.normalize_or_zero() * distance, size);
        let swept = start.union(end);
        self.bodies
            .iter()
            .filter(|body| body.layers.intersects(mask) && overlaps(swept, body.rect))
            .map(|body| self.hit(body, 0.0, body.rect.center()))
            .collect()
    }

    fn collider_bounds(&self, entity: Entity) -> Option<Rect> {
        self.bodies
            .iter()
            .find(|body| body.entity == entity)
            .map(|body| body.rect)
    }

    fn unit_bounds(&self) -> Rect {
        Rect::from_center_size(self.position, self.size)
    }

    fn edge_radius(&self) -> f32 {
        self.edge_radius
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
        if self.collider_bounds(other).is_none() {
            return false;
        }
        if ignored {
            self.ignored.insert(other);
        } else {
            self.ignored.remove(&other);
        }
        true
    }
}
