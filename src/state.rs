//! Unit state tags and state marker components.
//!
//! [`UnitState`] names every behavior a unit can be in. Exactly one tag is
//! current at any time and only a transition through the state machine
//! changes it. The marker components mirror the grounded flag into the ECS so
//! other systems can filter on it.

use bevy::prelude::*;

/// Closed set of behavior tags.
///
/// Handlers ship for the locomotion tags (see [`UnitState::LOCOMOTION`]). The
/// remaining tags are valid transition targets that a game registers its own
/// handlers for; requesting one without a handler is reported and dropped.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitState {
    #[default]
    Idle,
    IdleCrouch,
    Walk,
    Crouch,
    Run,
    Dash,
    Jump,
    JumpHigh,
    JumpDown,
    JumpSecond,
    JumpWall,
    Fall,
    Land,
    GrabWall,
    ClimbWall,
    GrabLedge,
    GrabPlatform,
    ClimbLedge,
    ClimbStairs,
    ClimbUp,
    Use,
    Attack,
    Hurt,
    Stun,
    Freezed,
    Death,
    Sleep,
    Hide,
    Appear,
    PickUpItem,
}

impl UnitState {
    /// Every tag, in declaration order.
    pub const ALL: [UnitState; 30] = [
        UnitState::Idle,
        UnitState::IdleCrouch,
        UnitState::Walk,
        UnitState::Crouch,
        UnitState::Run,
        UnitState::Dash,
        UnitState::Jump,
        UnitState::JumpHigh,
        UnitState::JumpDown,
        UnitState::JumpSecond,
        UnitState::JumpWall,
        UnitState::Fall,
        UnitState::Land,
        UnitState::GrabWall,
        UnitState::ClimbWall,
        UnitState::GrabLedge,
        UnitState::GrabPlatform,
        UnitState::ClimbLedge,
        UnitState::ClimbStairs,
        UnitState::ClimbUp,
        UnitState::Use,
        UnitState::Attack,
        UnitState::Hurt,
        UnitState::Stun,
        UnitState::Freezed,
        UnitState::Death,
        UnitState::Sleep,
        UnitState::Hide,
        UnitState::Appear,
        UnitState::PickUpItem,
    ];

    /// Tags with a built-in locomotion handler.
    pub const LOCOMOTION: [UnitState; 17] = [
        UnitState::Idle,
        UnitState::IdleCrouch,
        UnitState::Walk,
        UnitState::Crouch,
        UnitState::Run,
        UnitState::Jump,
        UnitState::JumpHigh,
        UnitState::JumpDown,
        UnitState::JumpSecond,
        UnitState::JumpWall,
        UnitState::Fall,
        UnitState::Land,
        UnitState::GrabWall,
        UnitState::ClimbWall,
        UnitState::GrabLedge,
        UnitState::GrabPlatform,
        UnitState::ClimbLedge,
    ];

    /// Check whether the tag is one of the jump variants.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            UnitState::Jump
                | UnitState::JumpHigh
                | UnitState::JumpDown
                | UnitState::JumpSecond
                | UnitState::JumpWall
        )
    }

    /// Check whether the unit hangs on a wall, ledge or platform in this state.
    pub fn is_grab(self) -> bool {
        matches!(
            self,
            UnitState::GrabWall
                | UnitState::ClimbWall
                | UnitState::GrabLedge
                | UnitState::GrabPlatform
                | UnitState::ClimbLedge
        )
    }
}

/// Marker component indicating the unit is grounded.
///
/// Mirrors the grounded flag the decision phase computed last.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the unit is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(UnitState::default(), UnitState::Idle);
    }

    #[test]
    fn all_tags_are_distinct() {
        let unique: HashSet<_> = UnitState::ALL.iter().collect();
        assert_eq!(unique.len(), UnitState::ALL.len());
    }

    #[test]
    fn locomotion_tags_are_a_subset() {
        for state in UnitState::LOCOMOTION {
            assert!(UnitState::ALL.contains(&state));
        }
        assert!(!UnitState::LOCOMOTION.contains(&UnitState::Death));
    }

    #[test]
    fn jump_and_grab_families() {
        assert!(UnitState::JumpWall.is_jump());
        assert!(!UnitState::Fall.is_jump());
        assert!(UnitState::GrabPlatform.is_grab());
        assert!(!UnitState::Land.is_grab());
    }
}
