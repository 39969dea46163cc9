//! Unit configuration.
//!
//! This module defines the tunables a [`LocomotionUnit`] is built from:
//! gravity and jump budget, probe geometry and layers, and the authored
//! movement settings of every locomotion state. Configuration is consumed at
//! construction time; changing it afterwards has no effect on a running unit.
//!
//! [`LocomotionUnit`]: crate::unit::LocomotionUnit

use bevy::prelude::*;

use crate::backend::LayerMask;
use crate::direction::{Direction, DirectionManager};
use crate::state::UnitState;

/// Speed caps and horizontal acceleration used by a movement strategy.
///
/// Each state activation works on its own copy, so a state may change its caps
/// (for example a decaying jump) without touching the authored values.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementContext {
    /// Maximum speed per axis. Non-negative once normalized.
    pub max_speed: Vec2,
    /// Horizontal speed added per physics tick while input is active.
    pub acceleration_x: f32,
    /// Horizontal speed removed per physics tick while input is released.
    pub deceleration_x: f32,
}

impl MovementContext {
    /// Context that holds the unit still.
    pub const STILL: Self = Self {
        max_speed: Vec2::ZERO,
        acceleration_x: 0.0,
        deceleration_x: 0.0,
    };

    /// Create a context.
    pub fn new(max_speed: Vec2, acceleration_x: f32, deceleration_x: f32) -> Self {
        Self {
            max_speed,
            acceleration_x,
            deceleration_x,
        }
    }

    /// Context with speed caps only, for states that drive velocity directly.
    pub fn constant(max_speed: Vec2) -> Self {
        Self::new(max_speed, 0.0, 0.0)
    }

    /// Copy with every component made non-negative.
    pub fn normalized(self) -> Self {
        Self {
            max_speed: self.max_speed.abs(),
            acceleration_x: self.acceleration_x.abs(),
            deceleration_x: self.deceleration_x.abs(),
        }
    }

    /// Builder: set the speed caps.
    pub fn with_max_speed(mut self, max_speed: Vec2) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Builder: set horizontal acceleration and deceleration.
    pub fn with_acceleration(mut self, acceleration_x: f32, deceleration_x: f32) -> Self {
        self.acceleration_x = acceleration_x;
        self.deceleration_x = deceleration_x;
        self
    }
}

/// Authored settings shared by every state.
#[derive(Reflect, Debug, Clone, PartialEq, Default)]
pub struct StateSettings {
    /// Movement context cloned at every activation.
    pub movement: MovementContext,
    /// Predecessor states this state refuses to be entered from.
    pub forbidden: Vec<UnitState>,
}

impl StateSettings {
    /// Create settings with no forbidden predecessors.
    pub fn new(movement: MovementContext) -> Self {
        Self {
            movement,
            forbidden: Vec::new(),
        }
    }

    /// Builder: refuse entry from these states.
    pub fn with_forbidden(mut self, forbidden: impl IntoIterator<Item = UnitState>) -> Self {
        self.forbidden = forbidden.into_iter().collect();
        self
    }
}

/// Fall settings.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct FallSettings {
    pub base: StateSettings,
    /// Vertical speed band around zero that separates rising from falling.
    pub apex_threshold: f32,
    /// Upward speed above which platforms cannot be grabbed.
    pub platform_grab_threshold: f32,
}

impl Default for FallSettings {
    fn default() -> Self {
        Self {
            base: StateSettings::new(MovementContext::new(Vec2::new(3.0, 20.0), 0.3, 0.1)),
            apex_threshold: 1.0,
            platform_grab_threshold: 10.0,
        }
    }
}

/// Variable-height jump settings (Jump and JumpHigh).
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct JumpSettings {
    pub base: StateSettings,
    /// Maximum number of physics ticks the impulse is applied for.
    pub iterations: u32,
    /// Ticks applied even if the button is released right away.
    pub min_iterations: u32,
    /// Vertical cap removed per tick once past the minimum. Zero disables it.
    pub vertical_decay: f32,
}

impl JumpSettings {
    /// Short hop used from standing or walking.
    pub fn jump() -> Self {
        Self {
            base: StateSettings::new(MovementContext::new(Vec2::new(3.0, 12.0), 0.5, 0.1)),
            iterations: 5,
            min_iterations: 1,
            vertical_decay: 0.0,
        }
    }

    /// Longer, decaying jump used from a crouch.
    pub fn jump_high() -> Self {
        Self {
            base: StateSettings::new(MovementContext::new(Vec2::new(2.0, 14.0), 0.5, 0.1)),
            iterations: 10,
            min_iterations: 2,
            vertical_decay: 1.0,
        }
    }

    /// Builder: set the tick budget.
    pub fn with_iterations(mut self, iterations: u32, min_iterations: u32) -> Self {
        self.iterations = iterations;
        self.min_iterations = min_iterations;
        self
    }
}

impl Default for JumpSettings {
    fn default() -> Self {
        Self::jump()
    }
}

/// Settings of the committed jumps (JumpSecond, JumpWall, JumpDown).
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct LeapSettings {
    pub base: StateSettings,
    /// Number of physics ticks the launch velocity is held.
    pub iterations: u32,
}

impl LeapSettings {
    /// Mid-air jump.
    pub fn jump_second() -> Self {
        Self {
            base: StateSettings::new(MovementContext::constant(Vec2::new(5.0, 10.0))),
            iterations: 3,
        }
    }

    /// Jump off a wall or ledge.
    pub fn jump_wall() -> Self {
        Self {
            base: StateSettings::new(MovementContext::constant(Vec2::new(5.0, 12.0))),
            iterations: 3,
        }
    }

    /// Drop through a platform.
    pub fn jump_down() -> Self {
        Self {
            base: StateSettings::new(MovementContext::constant(Vec2::new(0.0, 6.0))),
            iterations: 2,
        }
    }
}

/// ClimbWall settings.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct ClimbWallSettings {
    pub base: StateSettings,
    pub climb_up_speed: f32,
    pub climb_down_speed: f32,
}

impl Default for ClimbWallSettings {
    fn default() -> Self {
        Self {
            base: StateSettings::new(MovementContext::STILL),
            climb_up_speed: 2.0,
            climb_down_speed: 0.5,
        }
    }
}

/// GrabLedge settings.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct GrabLedgeSettings {
    pub base: StateSettings,
    /// Position of the unit relative to the ledge's top corner while hanging.
    pub grab_offset: Vec2,
    /// Horizontal distance past the ledge edge when letting go.
    pub skip_ledge_offset_x: f32,
}

impl Default for GrabLedgeSettings {
    fn default() -> Self {
        Self {
            base: StateSettings::new(MovementContext::STILL),
            grab_offset: Vec2::new(0.3, -1.0),
            skip_ledge_offset_x: 0.5,
        }
    }
}

/// GrabPlatform settings.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct GrabPlatformSettings {
    pub base: StateSettings,
    /// Vertical offset from the platform top while hanging.
    pub grab_offset_y: f32,
    /// Vertical offset from the platform top when jumping off.
    pub jump_offset_y: f32,
}

impl Default for GrabPlatformSettings {
    fn default() -> Self {
        Self {
            base: StateSettings::new(MovementContext::STILL),
            grab_offset_y: -1.0,
            jump_offset_y: 0.1,
        }
    }
}

/// ClimbLedge settings.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct ClimbLedgeSettings {
    pub base: StateSettings,
    /// Offset applied when the climb finishes; `x` is scaled by facing.
    pub climb_offset: Vec2,
}

impl Default for ClimbLedgeSettings {
    fn default() -> Self {
        Self {
            base: StateSettings::new(MovementContext::STILL),
            climb_offset: Vec2::new(0.6, 1.8),
        }
    }
}

/// Authored settings for every built-in locomotion state.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct LocomotionSettings {
    pub idle: StateSettings,
    pub idle_crouch: StateSettings,
    pub walk: StateSettings,
    pub run: StateSettings,
    pub crouch: StateSettings,
    pub fall: FallSettings,
    pub land: StateSettings,
    pub jump: JumpSettings,
    pub jump_high: JumpSettings,
    pub jump_second: LeapSettings,
    pub jump_wall: LeapSettings,
    pub jump_down: LeapSettings,
    pub grab_wall: StateSettings,
    pub climb_wall: ClimbWallSettings,
    pub grab_ledge: GrabLedgeSettings,
    pub grab_platform: GrabPlatformSettings,
    pub climb_ledge: ClimbLedgeSettings,
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        let ground = MovementContext::new(Vec2::new(3.0, 15.0), 0.5, 0.5);
        Self {
            idle: StateSettings::new(ground),
            idle_crouch: StateSettings::new(MovementContext::STILL),
            walk: StateSettings::new(ground),
            run: StateSettings::new(MovementContext::new(Vec2::new(6.0, 15.0), 0.75, 0.5)),
            crouch: StateSettings::new(ground.with_max_speed(Vec2::new(1.5, 15.0))),
            fall: FallSettings::default(),
            land: StateSettings::new(ground),
            jump: JumpSettings::jump(),
            jump_high: JumpSettings::jump_high(),
            jump_second: LeapSettings::jump_second(),
            jump_wall: LeapSettings::jump_wall(),
            jump_down: LeapSettings::jump_down(),
            grab_wall: StateSettings::new(MovementContext::constant(Vec2::new(0.0, 1.0))),
            climb_wall: ClimbWallSettings::default(),
            grab_ledge: GrabLedgeSettings::default(),
            grab_platform: GrabPlatformSettings::default(),
            climb_ledge: ClimbLedgeSettings::default(),
        }
    }
}

/// Geometry and layer settings of the collision probe.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ProbeConfig {
    /// Solid geometry: ground, walls, ledges.
    pub collision_layer: LayerMask,
    /// One-way platforms that can be dropped through and grabbed.
    pub platform_layer: LayerMask,
    /// Climbable stairs.
    pub stairs_layer: LayerMask,
    /// Pushable or breakable blocks.
    pub block_layer: LayerMask,
    /// Steepest walkable slope in degrees, kept within 5..=60.
    pub slope_limit: f32,
    /// Probe thickness: ground ray length and wall box width both derive from it.
    pub bounce: f32,
    /// Distance past the leading edge where the cliff probe looks for ground.
    pub cliff_offset: f32,
    /// Length of the cliff probe ray.
    pub cliff_depth: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            collision_layer: LayerMask::layer(0),
            platform_layer: LayerMask::layer(1),
            stairs_layer: LayerMask::layer(2),
            block_layer: LayerMask::layer(3),
            slope_limit: 60.0,
            bounce: 0.3,
            cliff_offset: 0.3,
            cliff_depth: 0.5,
        }
    }
}

impl ProbeConfig {
    /// Mask used for anything the unit can stand on.
    #[inline]
    pub fn ground_mask(&self) -> LayerMask {
        self.collision_layer | self.platform_layer
    }

    /// Tangent of the angle between the slope limit and the vertical.
    pub fn slope_tangent(&self) -> f32 {
        (90.0 - self.slope_limit.clamp(5.0, 60.0))
            .to_radians()
            .tan()
    }

    /// Builder: set the layer masks.
    pub fn with_layers(
        mut self,
        collision: LayerMask,
        platform: LayerMask,
        stairs: LayerMask,
        block: LayerMask,
    ) -> Self {
        self.collision_layer = collision;
        self.platform_layer = platform;
        self.stairs_layer = stairs;
        self.block_layer = block;
        self
    }

    /// Builder: set the slope limit in degrees.
    pub fn with_slope_limit(mut self, degrees: f32) -> Self {
        self.slope_limit = degrees.clamp(5.0, 60.0);
        self
    }

    /// Builder: set the probe thickness.
    pub fn with_bounce(mut self, bounce: f32) -> Self {
        self.bounce = bounce;
        self
    }

    /// Builder: set the cliff probe offset.
    pub fn with_cliff_offset(mut self, offset: f32) -> Self {
        self.cliff_offset = offset;
        self
    }
}

/// Complete configuration of one unit.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct UnitConfig {
    /// Gravity acceleration added per physics tick (negative is down).
    pub global_gravity: f32,
    /// Gravity multiplier while not falling.
    pub gravity_scale: f32,
    /// Gravity multiplier while falling.
    pub gravity_scale_falling: f32,
    /// Jumps available before touching the ground again.
    pub max_jumps: u32,
    /// State entered when the unit starts.
    pub initial_state: UnitState,
    /// Facing when the unit starts.
    pub initial_direction: Direction,
    /// States in which input may turn the unit around. Empty means all.
    pub rotatable_states: Vec<UnitState>,
    pub probe: ProbeConfig,
    pub states: LocomotionSettings,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            global_gravity: -9.81,
            gravity_scale: 3.0,
            gravity_scale_falling: 3.0,
            max_jumps: 2,
            initial_state: UnitState::Idle,
            initial_direction: Direction::Right,
            rotatable_states: DirectionManager::default_rotatable_states(),
            probe: ProbeConfig::default(),
            states: LocomotionSettings::default(),
        }
    }
}

impl UnitConfig {
    /// Create a config for player-controlled units.
    pub fn player() -> Self {
        Self::default()
    }

    /// Create a config for heavier, single-jump units.
    pub fn heavy() -> Self {
        Self {
            gravity_scale_falling: 4.0,
            max_jumps: 1,
            ..default()
        }
    }

    /// Gravity multiplier for the given vertical velocity.
    #[inline]
    pub fn gravity_scale_for(&self, vertical_velocity: f32) -> f32 {
        if vertical_velocity < 0.0 {
            self.gravity_scale_falling
        } else {
            self.gravity_scale
        }
    }

    /// Builder: set gravity.
    pub fn with_gravity(mut self, global_gravity: f32, scale: f32, scale_falling: f32) -> Self {
        self.global_gravity = global_gravity;
        self.gravity_scale = scale;
        self.gravity_scale_falling = scale_falling;
        self
    }

    /// Builder: set the jump budget.
    pub fn with_max_jumps(mut self, max_jumps: u32) -> Self {
        self.max_jumps = max_jumps;
        self
    }

    /// Builder: set the initial state.
    pub fn with_initial_state(mut self, state: UnitState) -> Self {
        self.initial_state = state;
        self
    }

    /// Builder: set the initial facing.
    pub fn with_initial_direction(mut self, direction: Direction) -> Self {
        self.initial_direction = direction;
        self
    }

    /// Builder: set the states that may turn around.
    pub fn with_rotatable_states(mut self, states: impl IntoIterator<Item = UnitState>) -> Self {
        self.rotatable_states = states.into_iter().collect();
        self
    }

    /// Builder: set the probe configuration.
    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Builder: set the per-state settings.
    pub fn with_states(mut self, states: LocomotionSettings) -> Self {
        self.states = states;
        self
    }
}
