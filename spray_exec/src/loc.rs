//! # Localisation module
//!
//! Provides the [`Pose`] of the vehicle in the local navigation (NED) frame. The pose itself is
//! estimated by the vehicle, this module only converts the link's telemetry into a form the
//! controllers can do vector maths on.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vehicle::{PositionNed, PositionNedYaw};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The current pose of the vehicle.
///
/// Position is `[north, east, down]` in metres, so an altitude above the ground is a negative
/// down component.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the NED frame
    pub position_m_ned: Vector3<f64>,

    /// Heading in degrees clockwise from north
    pub yaw_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Pose {
    pub fn new(north_m: f64, east_m: f64, down_m: f64, yaw_deg: f64) -> Self {
        Self {
            position_m_ned: Vector3::new(north_m, east_m, down_m),
            yaw_deg,
        }
    }

    pub fn north_m(&self) -> f64 {
        self.position_m_ned[0]
    }

    pub fn east_m(&self) -> f64 {
        self.position_m_ned[1]
    }

    pub fn down_m(&self) -> f64 {
        self.position_m_ned[2]
    }

    /// Straight line distance to another pose.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.position_m_ned - self.position_m_ned).norm()
    }

    /// Distance to another pose ignoring the down axis.
    pub fn horizontal_distance_to(&self, other: &Pose) -> f64 {
        (other.position_m_ned.xy() - self.position_m_ned.xy()).norm()
    }

    /// Position-hold setpoint at this pose.
    pub fn to_setpoint(&self) -> PositionNedYaw {
        PositionNedYaw {
            north_m: self.north_m(),
            east_m: self.east_m(),
            down_m: self.down_m(),
            yaw_deg: self.yaw_deg,
        }
    }
}

impl From<PositionNed> for Pose {
    fn from(pos: PositionNed) -> Self {
        Self::new(pos.north_m, pos.east_m, pos.down_m, 0.0)
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2})",
            self.north_m(),
            self.east_m(),
            self.down_m()
        )
    }
}
