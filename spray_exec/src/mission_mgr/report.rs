//! # Mission report
//!
//! Summary of a finished mission, returned by [`MissionMgr::run`](super::MissionMgr::run) and
//! archived by the exec.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{eqpt::vehicle::FlightMode, tc::mission::PatternType};
use serde::Serialize;

use super::{MissionContext, MissionPhase};
use crate::{cov_planner::Waypoint, loc::Pose};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    pub outcome: MissionOutcome,

    pub pattern: PatternType,

    pub phases: Vec<MissionPhase>,

    pub num_waypoints: usize,

    /// Indices of the waypoints whose legs timed out
    pub timed_out_legs: Vec<usize>,

    pub return_timed_out: bool,

    pub takeoff_pose: Option<Pose>,

    pub abort_cause: Option<String>,

    /// Error raised while returning to the takeoff pose during an abort
    pub return_error: Option<String>,

    pub landing_error: Option<String>,

    /// Armed state read back after landing
    pub final_is_armed: Option<bool>,

    /// Flight mode read back after landing
    pub final_flight_mode: Option<FlightMode>,

    pub elapsed_s: f64,

    /// The planned waypoints, archived separately
    #[serde(skip)]
    pub waypoints: Vec<Waypoint>,
}

/// Post-land readback of the vehicle status.
#[derive(Debug, Copy, Clone, Default)]
pub(super) struct LandingDiagnostics {
    pub is_armed: Option<bool>,
    pub flight_mode: Option<FlightMode>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MissionOutcome {
    Completed,
    CompletedWithTimeouts {
        num_timeouts: usize,
    },
    AbortedAndLanded {
        cause: String,
    },
    AbortedWithLandingFailure {
        cause: String,
        landing_error: String,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MissionReport {
    pub(super) fn build(
        ctx: &MissionContext,
        pattern: PatternType,
        abort_cause: Option<String>,
        return_error: Option<String>,
        landing_error: Option<String>,
        diagnostics: LandingDiagnostics,
        elapsed_s: f64,
    ) -> Self {
        let num_timeouts = ctx.timed_out_legs().len() + ctx.return_timed_out() as usize;

        let outcome = match (&abort_cause, &landing_error) {
            (Some(cause), Some(landing_error)) => MissionOutcome::AbortedWithLandingFailure {
                cause: cause.clone(),
                landing_error: landing_error.clone(),
            },
            (Some(cause), None) => MissionOutcome::AbortedAndLanded {
                cause: cause.clone(),
            },
            (None, _) if num_timeouts > 0 => MissionOutcome::CompletedWithTimeouts { num_timeouts },
            (None, _) => MissionOutcome::Completed,
        };

        Self {
            outcome,
            pattern,
            phases: ctx.phase_history().to_vec(),
            num_waypoints: ctx.waypoints().len(),
            timed_out_legs: ctx.timed_out_legs().to_vec(),
            return_timed_out: ctx.return_timed_out(),
            takeoff_pose: ctx.takeoff_pose(),
            abort_cause,
            return_error,
            landing_error,
            final_is_armed: diagnostics.is_armed,
            final_flight_mode: diagnostics.flight_mode,
            elapsed_s,
            waypoints: ctx.waypoints().to_vec(),
        }
    }

    /// True if the mission completed and the vehicle accepted the land command.
    ///
    /// A completed mission whose land command failed is not a success: the vehicle may still be
    /// armed and in the air.
    pub fn is_success(&self) -> bool {
        !self.is_aborted() && self.landing_error.is_none()
    }

    pub fn is_aborted(&self) -> bool {
        matches!(
            self.outcome,
            MissionOutcome::AbortedAndLanded { .. }
                | MissionOutcome::AbortedWithLandingFailure { .. }
        )
    }
}

impl std::fmt::Display for MissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionOutcome::Completed => write!(f, "completed"),
            MissionOutcome::CompletedWithTimeouts { num_timeouts } => {
                write!(f, "completed with {} waypoint timeout(s)", num_timeouts)
            }
            MissionOutcome::AbortedAndLanded { cause } => {
                write!(f, "aborted and landed ({})", cause)
            }
            MissionOutcome::AbortedWithLandingFailure {
                cause,
                landing_error,
            } => write!(
                f,
                "aborted with landing failure ({}, then {})",
                cause, landing_error
            ),
        }
    }
}
