//! # Waypoints
//!
//! A waypoint is a target pose tagged with the motion which produces it. The tag decides which
//! speed the vehicle uses to get there.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A single target of the coverage path.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub north_m: f64,
    pub east_m: f64,
    pub down_m: f64,
    pub yaw_deg: f64,

    /// The motion which reaches this waypoint
    pub action: WaypointAction,

    /// 1-based index of the stripe this waypoint belongs to, zero for waypoints which are not
    /// part of the coverage pattern.
    pub stripe: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointAction {
    /// Climb to the top of a vertical stripe
    MoveUp,

    /// Descend to the bottom of a vertical stripe
    MoveDown,

    /// Step sideways along the top of the wall
    MoveHorizontalTop,

    /// Step sideways along the bottom of the wall
    MoveHorizontalBottom,

    /// Climb to the next horizontal stripe at the left edge
    MoveUpLeft,

    /// Climb to the next horizontal stripe at the right edge
    MoveUpRight,

    /// Paint a horizontal stripe left to right
    MoveRight,

    /// Paint a horizontal stripe right to left
    MoveLeft,

    /// Transit which is not part of the pattern
    Positioning,

    ReturnToTakeoff,
}

/// Which of the speed profile's speeds a motion uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedClass {
    Vertical,
    Horizontal,
    Positioning,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Waypoint {
    /// A waypoint outside of the coverage pattern at the given pose.
    pub fn from_pose(pose: &Pose, action: WaypointAction) -> Self {
        Self {
            north_m: pose.north_m(),
            east_m: pose.east_m(),
            down_m: pose.down_m(),
            yaw_deg: pose.yaw_deg,
            action,
            stripe: 0,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.north_m, self.east_m, self.down_m, self.yaw_deg)
    }
}

impl WaypointAction {
    pub fn speed_class(&self) -> SpeedClass {
        match self {
            WaypointAction::MoveUp
            | WaypointAction::MoveDown
            | WaypointAction::MoveUpLeft
            | WaypointAction::MoveUpRight => SpeedClass::Vertical,
            WaypointAction::MoveHorizontalTop
            | WaypointAction::MoveHorizontalBottom
            | WaypointAction::MoveRight
            | WaypointAction::MoveLeft => SpeedClass::Horizontal,
            WaypointAction::Positioning | WaypointAction::ReturnToTakeoff => {
                SpeedClass::Positioning
            }
        }
    }
}

impl std::fmt::Display for WaypointAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WaypointAction::MoveUp => "move_up",
            WaypointAction::MoveDown => "move_down",
            WaypointAction::MoveHorizontalTop => "move_horizontal_top",
            WaypointAction::MoveHorizontalBottom => "move_horizontal_bottom",
            WaypointAction::MoveUpLeft => "move_up_left",
            WaypointAction::MoveUpRight => "move_up_right",
            WaypointAction::MoveRight => "move_right",
            WaypointAction::MoveLeft => "move_left",
            WaypointAction::Positioning => "positioning",
            WaypointAction::ReturnToTakeoff => "return_to_takeoff",
        };

        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_speed_class() {
        assert_eq!(WaypointAction::MoveUp.speed_class(), SpeedClass::Vertical);
        assert_eq!(WaypointAction::MoveUpRight.speed_class(), SpeedClass::Vertical);
        assert_eq!(
            WaypointAction::MoveHorizontalBottom.speed_class(),
            SpeedClass::Horizontal
        );
        assert_eq!(WaypointAction::MoveLeft.speed_class(), SpeedClass::Horizontal);
        assert_eq!(
            WaypointAction::ReturnToTakeoff.speed_class(),
            SpeedClass::Positioning
        );
    }

    #[test]
    fn test_action_serde_matches_display() {
        let json = serde_json::to_string(&WaypointAction::MoveHorizontalTop).unwrap();
        assert_eq!(json, format!("\"{}\"", WaypointAction::MoveHorizontalTop));
    }
}
