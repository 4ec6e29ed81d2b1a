//! # Mission context
//!
//! Run-time state of one mission, owned by the [`MissionMgr`](super::MissionMgr). Everything
//! outside the mission manager can only read it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use crate::{cov_planner::Waypoint, loc::Pose};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MissionContext {
    phase: MissionPhase,

    /// Every phase entered, in order
    phase_history: Vec<MissionPhase>,

    /// Pose sampled on the ground before arming, the pattern is planned from here
    launch_pose: Option<Pose>,

    /// Pose after the climb, set once
    takeoff_pose: Option<Pose>,

    waypoints: Vec<Waypoint>,

    /// Index of the waypoint currently being flown to
    waypoint_index: usize,

    last_pose: Option<Pose>,

    /// Indices of the waypoints whose legs timed out
    timed_out_legs: Vec<usize>,

    return_timed_out: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum MissionPhase {
    Connect,
    AwaitTelemetry,
    CaptureTakeoffPose,
    ArmAndClimb,
    TransitToStart,
    ExecutePattern,
    ReturnToTakeoff,
    Land,
    Done,
    Abort,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MissionContext {
    pub(super) fn new() -> Self {
        Self {
            phase: MissionPhase::Connect,
            phase_history: vec![MissionPhase::Connect],
            launch_pose: None,
            takeoff_pose: None,
            waypoints: Vec::new(),
            waypoint_index: 0,
            last_pose: None,
            timed_out_legs: Vec::new(),
            return_timed_out: false,
        }
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn phase_history(&self) -> &[MissionPhase] {
        &self.phase_history
    }

    pub fn launch_pose(&self) -> Option<Pose> {
        self.launch_pose
    }

    pub fn takeoff_pose(&self) -> Option<Pose> {
        self.takeoff_pose
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    pub fn last_pose(&self) -> Option<Pose> {
        self.last_pose
    }

    pub fn timed_out_legs(&self) -> &[usize] {
        &self.timed_out_legs
    }

    pub fn return_timed_out(&self) -> bool {
        self.return_timed_out
    }

    /// Phases which can fall back to the abort path, i.e. those after the takeoff pose capture
    /// and before landing.
    pub fn is_abortable(&self) -> bool {
        matches!(
            self.phase,
            MissionPhase::ArmAndClimb
                | MissionPhase::TransitToStart
                | MissionPhase::ExecutePattern
                | MissionPhase::ReturnToTakeoff
        )
    }

    pub(super) fn set_phase(&mut self, phase: MissionPhase) {
        if phase != self.phase {
            info!("Mission phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.phase_history.push(phase);
        }
    }

    pub(super) fn set_launch(&mut self, launch_pose: Pose, waypoints: Vec<Waypoint>) {
        self.launch_pose = Some(launch_pose);
        self.last_pose = Some(launch_pose);
        self.waypoints = waypoints;
        self.waypoint_index = 0;
    }

    /// Store the takeoff pose. Once stored it is never replaced, later calls are ignored.
    pub(super) fn set_takeoff_pose(&mut self, pose: Pose) {
        match self.takeoff_pose {
            Some(p) => warn!(
                "Takeoff pose already captured at {}, ignoring new pose {}",
                p, pose
            ),
            None => {
                info!("Takeoff pose stored: {}", pose);
                self.takeoff_pose = Some(pose);
            }
        }
    }

    pub(super) fn set_waypoint_index(&mut self, index: usize) {
        self.waypoint_index = index;
    }

    pub(super) fn set_last_pose(&mut self, pose: Pose) {
        self.last_pose = Some(pose);
    }

    pub(super) fn record_timeout(&mut self, index: usize) {
        self.timed_out_legs.push(index);
    }

    pub(super) fn record_return_timeout(&mut self) {
        self.return_timed_out = true;
    }
}
