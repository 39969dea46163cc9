//! Velocity integration strategies.
//!
//! A strategy turns the unit's current velocity, the live [`MovementContext`]
//! of the active state and the horizontal input into the velocity for the next
//! physics tick. Strategies are pure: they neither read nor write the physics
//! world themselves.

use bevy::prelude::*;

use crate::config::{MovementContext, UnitConfig};
use crate::direction::Direction;

/// How a state integrates velocity on each physics tick.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementStrategy {
    /// Accelerate and decelerate horizontally, integrate gravity vertically.
    #[default]
    Default,
    /// Set velocity to the context's speed vector.
    ConstantSpeed,
    /// Default horizontal rule, vertical velocity pinned to the vertical cap.
    Jump,
}

/// Inputs a strategy needs besides the movement context.
#[derive(Debug, Clone, Copy)]
pub struct MovementInput<'a> {
    pub velocity: Vec2,
    pub move_x: f32,
    pub facing: Direction,
    pub config: &'a UnitConfig,
}

impl MovementStrategy {
    /// Velocity for the next tick.
    pub fn integrate(self, input: MovementInput<'_>, context: &MovementContext) -> Vec2 {
        match self {
            MovementStrategy::Default => Vec2::new(
                horizontal_velocity(input.velocity.x, input.move_x, input.facing, context),
                gravity_velocity(input.velocity.y, context.max_speed.y, input.config),
            ),
            MovementStrategy::ConstantSpeed => context.max_speed,
            MovementStrategy::Jump => Vec2::new(
                horizontal_velocity(input.velocity.x, input.move_x, input.facing, context),
                context.max_speed.y,
            ),
        }
    }
}

/// Horizontal acceleration rule shared by [`MovementStrategy::Default`] and
/// [`MovementStrategy::Jump`].
///
/// With input active, speed builds toward the facing direction while below the
/// cap or while still moving against the facing, clamped to the cap.
/// Otherwise speed bleeds toward zero without crossing it.
pub fn horizontal_velocity(
    velocity_x: f32,
    move_x: f32,
    facing: Direction,
    context: &MovementContext,
) -> f32 {
    let active = move_x.abs() > f32::EPSILON;
    let sign = facing.sign();
    let max_speed = context.max_speed.x;
    let rate = if active {
        context.acceleration_x
    } else {
        context.deceleration_x
    };

    if active && (velocity_x.abs() < max_speed || sign * velocity_x < 0.0) {
        (velocity_x + sign * rate).clamp(-max_speed, max_speed)
    } else if velocity_x > 0.0 {
        (velocity_x - rate).max(0.0)
    } else if velocity_x < 0.0 {
        (velocity_x + rate).min(0.0)
    } else {
        0.0
    }
}

/// Vertical velocity after one tick of gravity, clamped to `±max_speed_y`.
pub fn gravity_velocity(velocity_y: f32, max_speed_y: f32, config: &UnitConfig) -> f32 {
    let scale = config.gravity_scale_for(velocity_y);
    (velocity_y + config.global_gravity * scale).clamp(-max_speed_y, max_speed_y)
}
