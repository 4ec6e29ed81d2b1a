//! # Vehicle Link Interface
//!
//! The mission software never talks to the vehicle's transport directly. Instead it is written
//! against the traits in this module:
//!
//! - [`PoseSource`] - provides the latest position estimate, polled once per control tick.
//! - [`MotionSink`] - accepts setpoints and mode changes (arm, offboard streaming, land).
//! - [`VehicleStatus`] - connection, health and diagnostic readback.
//!
//! All positions and velocities are in the local North-East-Down (NED) navigation frame, so that
//! "up" is a negative `down_m`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position estimate in the NED frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionNed {
    pub north_m: f64,
    pub east_m: f64,
    pub down_m: f64,
}

/// Position setpoint in the NED frame with a yaw demand.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionNedYaw {
    pub north_m: f64,
    pub east_m: f64,
    pub down_m: f64,

    /// Yaw demand in degrees, clockwise from north.
    pub yaw_deg: f64,
}

/// Velocity setpoint in the NED frame with a yaw demand.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityNedYaw {
    pub north_ms: f64,
    pub east_ms: f64,
    pub down_ms: f64,

    /// Yaw demand in degrees, clockwise from north.
    pub yaw_deg: f64,
}

/// Health flags reported by the vehicle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// The global position estimate is good enough to fly.
    pub is_global_position_ok: bool,

    /// A home position has been set.
    pub is_home_position_ok: bool,

    /// The vehicle would accept an arm command now.
    pub is_armable: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Flight mode reported by the vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    Unknown,
    Ready,
    Hold,
    Offboard,
    Land,
}

/// Errors reported by the vehicle link.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VehicleError {
    #[error("The vehicle link is not connected")]
    NotConnected,

    #[error("Could not connect to the vehicle at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("The vehicle rejected the {cmd} command: {reason}")]
    CommandRejected { cmd: LinkCmd, reason: String },

    #[error("No telemetry is available from the vehicle")]
    TelemetryUnavailable,
}

/// Names of the commands which can be sent over the link, used for reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkCmd {
    SetVelocity,
    SetPosition,
    Arm,
    StartOffboard,
    StopOffboard,
    Land,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Provides position samples.
pub trait PoseSource {
    /// Get the most recent position estimate.
    ///
    /// Implementations may block briefly waiting for the next telemetry message but must not
    /// return a stale cached value.
    fn sample(&mut self) -> Result<PositionNed, VehicleError>;
}

/// Accepts motion commands.
///
/// Each call issues exactly one command, nothing is queued.
pub trait MotionSink {
    fn set_velocity(&mut self, cmd: VelocityNedYaw) -> Result<(), VehicleError>;

    fn set_position(&mut self, cmd: PositionNedYaw) -> Result<(), VehicleError>;

    fn arm(&mut self) -> Result<(), VehicleError>;

    /// Enter offboard mode, in which the vehicle follows the streamed setpoints. At least one
    /// setpoint must have been sent before starting.
    fn start_offboard_stream(&mut self) -> Result<(), VehicleError>;

    /// Leave offboard mode. Fails if offboard is not active.
    fn stop_offboard_stream(&mut self) -> Result<(), VehicleError>;

    fn land(&mut self) -> Result<(), VehicleError>;
}

/// Connection and status readback.
pub trait VehicleStatus {
    /// Establish the link, blocking until connected or failed.
    fn connect(&mut self) -> Result<(), VehicleError>;

    fn health(&mut self) -> Result<Health, VehicleError>;

    fn is_armed(&mut self) -> Result<bool, VehicleError>;

    fn flight_mode(&mut self) -> Result<FlightMode, VehicleError>;
}

/// A complete vehicle link.
pub trait VehicleLink: PoseSource + MotionSink + VehicleStatus {}

impl<T> VehicleLink for T where T: PoseSource + MotionSink + VehicleStatus {}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl std::fmt::Display for LinkCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkCmd::SetVelocity => "set_velocity",
            LinkCmd::SetPosition => "set_position",
            LinkCmd::Arm => "arm",
            LinkCmd::StartOffboard => "start_offboard",
            LinkCmd::StopOffboard => "stop_offboard",
            LinkCmd::Land => "land",
        };

        write!(f, "{}", name)
    }
}

impl Health {
    /// True if the vehicle reports both a valid global position and a home position, which is
    /// required before arming is attempted.
    pub fn is_ready_for_arming(&self) -> bool {
        self.is_global_position_ok && self.is_home_position_ok
    }
}
