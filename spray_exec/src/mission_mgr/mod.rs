//! # Mission manager module
//!
//! This module implements the [`MissionMgr`] state machine, which sequences a complete spray
//! mission. The mission is broken down into phases, each handled by a `mode_xyz` function that
//! returns the phase to switch to:
//!
//! - `Connect` - establish the vehicle link.
//! - `AwaitTelemetry` - wait for a valid position and home position.
//! - `CaptureTakeoffPose` - sample the launch pose and plan the waypoints from it.
//! - `ArmAndClimb` - start offboard, arm, and ramp up to the takeoff altitude. The pose at the top
//!   of the climb is stored as the takeoff pose.
//! - `TransitToStart` - fly to the first waypoint.
//! - `ExecutePattern` - fly to each remaining waypoint in order. Timed out legs are recorded and
//!   the pattern continues.
//! - `ReturnToTakeoff` - fly back to the takeoff pose and hold.
//! - `Land` - stop offboard, land, wait for the vehicle to settle and read back its status.
//!
//! Failures before the takeoff pose capture are returned to the caller as errors, nothing has
//! moved yet. A failure after that point moves the mission into `Abort`, which returns to the
//! takeoff pose (if one was stored) and lands, exactly once. The outcome is then reported in the
//! [`MissionReport`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod context;
pub mod params;
mod report;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::vehicle::{VehicleError, VehicleLink},
    tc::mission::{MissionCmd, PatternType},
};
use log::{debug, error, info, warn};
use util::time::{Clock, Ticker};

use crate::{
    cov_planner::{CovPlanner, CovPlannerError},
    loc::Pose,
    nav_ctrl::{NavCtrl, NavCtrlError, SeekOutcome, SeekReport, SeekRequest},
    wall::{WallConfig, WallConfigError, WallGeometry},
};
pub use context::{MissionContext, MissionPhase};
pub use params::{MissionMgrParams, SpeedProfile};
pub use report::{MissionOutcome, MissionReport};
use report::LandingDiagnostics;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mission Manager
///
/// Owns the planner and the navigation controller, and drives a vehicle through one mission per
/// call to [`MissionMgr::run`].
pub struct MissionMgr {
    params: MissionMgrParams,

    planner: CovPlanner,

    nav_ctrl: NavCtrl,

    wall: WallGeometry,

    pattern: PatternType,

    /// The profile selected by the pattern
    profile: SpeedProfile,
}

/// Errors raised while the abort path runs.
#[derive(Debug, Default)]
struct AbortErrors {
    return_error: Option<String>,
    landing_error: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the mission manager.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("Configuration error: {0}")]
    Config(ConfigError),

    #[error("Could not connect to the vehicle: {0}")]
    Connection(VehicleError),

    #[error("The vehicle did not report a valid position within {0:.1} s")]
    NotReady(f64),

    #[error("The vehicle rejected the arm command: {0}")]
    ArmRejected(VehicleError),

    #[error("The vehicle rejected the offboard start: {0}")]
    OffboardRejected(VehicleError),

    #[error("The vehicle rejected a setpoint: {0}")]
    CommandStreamRejected(VehicleError),

    #[error("Could not get a pose from the vehicle: {0}")]
    PoseUnavailable(VehicleError),

    #[error("The land command failed: {0}")]
    LandingCommand(VehicleError),
}

/// Problems with the mission configuration, all detected before the vehicle moves.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load MissionMgrParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid MissionMgr parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid {pattern} speed profile: {reason}")]
    InvalidSpeedProfile { pattern: PatternType, reason: String },

    #[error(transparent)]
    Wall(WallConfigError),

    #[error("Error in CovPlanner: {0}")]
    CovPlanner(CovPlannerError),

    #[error("Error in NavCtrl: {0}")]
    NavCtrl(NavCtrlError),

    #[error("The coverage plan contains no waypoints")]
    EmptyPlan,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<ConfigError> for MissionError {
    fn from(e: ConfigError) -> Self {
        MissionError::Config(e)
    }
}

impl From<NavCtrlError> for MissionError {
    fn from(e: NavCtrlError) -> Self {
        match e {
            NavCtrlError::PoseUnavailable(v) => MissionError::PoseUnavailable(v),
            NavCtrlError::CommandRejected(v) => MissionError::CommandStreamRejected(v),
            e => MissionError::Config(ConfigError::NavCtrl(e)),
        }
    }
}

impl MissionMgr {
    /// Initialise the manager for the given mission command.
    ///
    /// Loads `mission_mgr.toml`, `cov_planner.toml` and `nav_ctrl.toml` from the params
    /// directory, and the wall from the command's wall config.
    pub fn init(cmd: &MissionCmd) -> Result<Self, MissionError> {
        let params = util::params::load("mission_mgr.toml").map_err(ConfigError::ParamLoadError)?;
        let planner = CovPlanner::init("cov_planner.toml").map_err(ConfigError::CovPlanner)?;
        let nav_ctrl = NavCtrl::init("nav_ctrl.toml").map_err(ConfigError::NavCtrl)?;
        let wall = WallConfig::load(&cmd.wall_config).map_err(ConfigError::Wall)?;

        Self::new(params, planner, nav_ctrl, wall, cmd.pattern)
    }

    pub fn new(
        params: MissionMgrParams,
        planner: CovPlanner,
        nav_ctrl: NavCtrl,
        wall: WallGeometry,
        pattern: PatternType,
    ) -> Result<Self, MissionError> {
        params.validate().map_err(ConfigError::InvalidParams)?;

        let profile = *params.profile(pattern);
        profile
            .validate()
            .map_err(|reason| ConfigError::InvalidSpeedProfile { pattern, reason })?;

        info!("Speed configuration for the {} pattern:", pattern);
        info!("    Vertical speed:    {:.1} m/s", profile.vertical_speed_ms);
        info!("    Horizontal speed:  {:.1} m/s", profile.horizontal_speed_ms);
        info!("    Positioning speed: {:.1} m/s", profile.positioning_speed_ms);
        info!("    Hover time:        {:.1} s", profile.hover_time_s);

        Ok(Self {
            params,
            planner,
            nav_ctrl,
            wall,
            pattern,
            profile,
        })
    }

    pub fn profile(&self) -> &SpeedProfile {
        &self.profile
    }

    /// Fly one complete mission.
    ///
    /// Errors are only returned for failures before the takeoff pose capture. Anything later is
    /// handled by the abort path and reported in the returned [`MissionReport`].
    pub fn run<V, C>(&self, vehicle: &mut V, clock: &mut C) -> Result<MissionReport, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        let start_s = clock.now_s();
        let mut ctx = MissionContext::new();

        info!("Starting {} spray mission", self.pattern);

        // Mode execution. Each of the mode functions returns either the phase to switch to or an
        // error
        while ctx.phase() != MissionPhase::Done {
            let res = match ctx.phase() {
                MissionPhase::Connect => self.mode_connect(vehicle),
                MissionPhase::AwaitTelemetry => self.mode_await_telemetry(vehicle, clock),
                MissionPhase::CaptureTakeoffPose => self.mode_capture_takeoff_pose(&mut ctx, vehicle),
                MissionPhase::ArmAndClimb => self.mode_arm_and_climb(&mut ctx, vehicle, clock),
                MissionPhase::TransitToStart => self.mode_transit_to_start(&mut ctx, vehicle, clock),
                MissionPhase::ExecutePattern => self.mode_execute_pattern(&mut ctx, vehicle, clock),
                MissionPhase::ReturnToTakeoff => {
                    self.mode_return_to_takeoff(&mut ctx, vehicle, clock)
                }
                MissionPhase::Land => {
                    let (landing_error, diagnostics) = self.land(&mut ctx, vehicle, clock);
                    ctx.set_phase(MissionPhase::Done);

                    return Ok(MissionReport::build(
                        &ctx,
                        self.pattern,
                        None,
                        None,
                        landing_error.map(|e| e.to_string()),
                        diagnostics,
                        clock.now_s() - start_s,
                    ));
                }
                MissionPhase::Abort | MissionPhase::Done => break,
            };

            match res {
                Ok(phase) => ctx.set_phase(phase),
                Err(e) if ctx.is_abortable() => {
                    return Ok(self.abort(&mut ctx, vehicle, clock, e, start_s));
                }
                Err(e) => {
                    error!("Mission failed in {:?}: {}", ctx.phase(), e);
                    return Err(e);
                }
            }
        }

        // Only reachable if the loop was left without landing, which the phase functions never
        // do
        Ok(MissionReport::build(
            &ctx,
            self.pattern,
            None,
            None,
            None,
            LandingDiagnostics::default(),
            clock.now_s() - start_s,
        ))
    }

    fn mode_connect<V>(&self, vehicle: &mut V) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
    {
        info!("Connecting to the vehicle...");
        vehicle.connect().map_err(MissionError::Connection)?;
        info!("Vehicle connected");

        Ok(MissionPhase::AwaitTelemetry)
    }

    /// Wait for the vehicle to report a valid global and home position.
    fn mode_await_telemetry<V, C>(
        &self,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        info!("Waiting for the vehicle to be ready...");

        let start_s = clock.now_s();
        let mut ticker = Ticker::start(self.nav_ctrl.params().tick_period_s, clock);

        loop {
            match vehicle.health() {
                Ok(h) if h.is_ready_for_arming() => break,
                Ok(h) => debug!("Vehicle not ready yet: {:?}", h),
                Err(e) => warn!("Could not read vehicle health: {}", e),
            }

            if clock.now_s() - start_s >= self.params.readiness_timeout_s {
                return Err(MissionError::NotReady(self.params.readiness_timeout_s));
            }

            ticker.wait(clock);
        }

        info!("Vehicle ready for arming");

        Ok(MissionPhase::CaptureTakeoffPose)
    }

    /// Sample the launch pose and plan the pattern from it.
    fn mode_capture_takeoff_pose<V>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
    ) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
    {
        let launch_pose = Pose::from(vehicle.sample().map_err(MissionError::PoseUnavailable)?);
        info!("Launch pose: {}", launch_pose);

        let waypoints = self.planner.plan(&self.wall, self.pattern, &launch_pose);
        if waypoints.is_empty() {
            return Err(ConfigError::EmptyPlan.into());
        }

        ctx.set_launch(launch_pose, waypoints);

        Ok(MissionPhase::ArmAndClimb)
    }

    /// Start offboard, arm, and ramp up to the takeoff altitude.
    fn mode_arm_and_climb<V, C>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        let launch_pose = match ctx.launch_pose() {
            Some(p) => p,
            None => return Err(MissionError::PoseUnavailable(VehicleError::TelemetryUnavailable)),
        };

        // Offboard needs a setpoint before it will start
        vehicle
            .set_position(launch_pose.to_setpoint())
            .map_err(MissionError::CommandStreamRejected)?;

        info!("Starting offboard mode...");
        vehicle
            .start_offboard_stream()
            .map_err(MissionError::OffboardRejected)?;

        self.nav_ctrl.hold_position(
            vehicle,
            clock,
            &launch_pose,
            self.params.offboard_warmup_setpoints,
        )?;

        match vehicle.health() {
            Ok(h) if h.is_armable => info!("Vehicle is armable"),
            Ok(_) => warn!("Vehicle still not armable, attempting to arm anyway"),
            Err(e) => warn!("Could not read vehicle health: {}", e),
        }

        info!("Arming...");
        vehicle.arm().map_err(MissionError::ArmRejected)?;
        info!("Vehicle armed");

        // Ramp the altitude setpoint rather than jumping straight to the target
        info!(
            "Climbing {:.1} m over {} steps",
            self.params.climb_altitude_m, self.params.climb_steps
        );
        let mut ticker = Ticker::start(self.params.climb_step_period_s, clock);
        for step in 1..=self.params.climb_steps {
            let fraction = step as f64 / self.params.climb_steps as f64;
            let mut setpoint = launch_pose.to_setpoint();
            setpoint.down_m = launch_pose.down_m() - self.params.climb_altitude_m * fraction;

            vehicle
                .set_position(setpoint)
                .map_err(MissionError::CommandStreamRejected)?;
            ticker.wait(clock);
        }

        let pose = Pose::from(vehicle.sample().map_err(MissionError::PoseUnavailable)?);
        ctx.set_last_pose(pose);
        ctx.set_takeoff_pose(pose);

        Ok(MissionPhase::TransitToStart)
    }

    fn mode_transit_to_start<V, C>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        let target = match ctx.waypoints().first() {
            Some(w) => w.pose(),
            None => return Err(ConfigError::EmptyPlan.into()),
        };

        info!(
            "Moving to the spray start position {} at {:.1} m/s",
            target, self.profile.positioning_speed_ms
        );

        ctx.set_waypoint_index(0);
        let report = self.seek(vehicle, clock, target, self.profile.positioning_speed_ms)?;
        self.record_leg(ctx, 0, &report);

        if ctx.waypoints().len() > 1 {
            Ok(MissionPhase::ExecutePattern)
        } else {
            Ok(MissionPhase::ReturnToTakeoff)
        }
    }

    /// Fly the next waypoint of the pattern.
    fn mode_execute_pattern<V, C>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        // The first waypoint was reached in the transit
        let index = ctx.waypoint_index() + 1;
        let waypoint = match ctx.waypoints().get(index) {
            Some(w) => *w,
            None => return Ok(MissionPhase::ReturnToTakeoff),
        };
        ctx.set_waypoint_index(index);

        let speed_ms = self.profile.speed_for(waypoint.action.speed_class());
        info!(
            "Waypoint {}/{} [stripe {}]: {} at {:.1} m/s",
            index + 1,
            ctx.waypoints().len(),
            waypoint.stripe,
            waypoint.action,
            speed_ms
        );

        let report = self.seek(vehicle, clock, waypoint.pose(), speed_ms)?;
        self.record_leg(ctx, index, &report);

        if index + 1 < ctx.waypoints().len() {
            Ok(MissionPhase::ExecutePattern)
        } else {
            info!("{} spray pattern completed", self.pattern);
            Ok(MissionPhase::ReturnToTakeoff)
        }
    }

    fn mode_return_to_takeoff<V, C>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<MissionPhase, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        let takeoff_pose = match ctx.takeoff_pose() {
            Some(p) => p,
            None => {
                warn!("No takeoff pose stored, skipping return");
                return Ok(MissionPhase::Land);
            }
        };

        if let Some(p) = ctx.last_pose() {
            info!(
                "Returning to takeoff pose {}, distance {:.2} m",
                takeoff_pose,
                p.distance_to(&takeoff_pose)
            );
        }

        let report = self.seek(
            vehicle,
            clock,
            takeoff_pose,
            self.profile.positioning_speed_ms,
        )?;
        ctx.set_last_pose(report.last_pose);

        match report.outcome {
            SeekOutcome::Converged => info!("Returned to takeoff pose"),
            SeekOutcome::TimedOut => {
                warn!("Returned to the takeoff area with timeout");
                ctx.record_return_timeout();
            }
        }

        info!(
            "Holding position for {:.1} s before landing",
            self.params.return_hold_s
        );
        self.nav_ctrl.hold_position(
            vehicle,
            clock,
            &takeoff_pose,
            self.nav_ctrl.ticks_for(self.params.return_hold_s),
        )?;

        Ok(MissionPhase::Land)
    }

    /// Land, returning any error from the land command and the post-land status.
    ///
    /// Nothing here is retried. Failing to stop offboard is expected when the vehicle has already
    /// left it, and is only logged.
    fn land<V, C>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
        clock: &mut C,
    ) -> (Option<MissionError>, LandingDiagnostics)
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        info!("Landing...");

        match (vehicle.sample(), ctx.takeoff_pose()) {
            (Ok(p), Some(takeoff_pose)) => {
                let pose = Pose::from(p);
                ctx.set_last_pose(pose);
                info!(
                    "Distance from takeoff position: {:.2} m",
                    pose.horizontal_distance_to(&takeoff_pose)
                );
            }
            (Ok(p), None) => ctx.set_last_pose(Pose::from(p)),
            (Err(e), _) => warn!("Could not sample pose before landing: {}", e),
        }

        match vehicle.stop_offboard_stream() {
            Ok(_) => info!("Offboard mode stopped"),
            Err(e) => warn!("Could not stop offboard (normal if already stopped): {}", e),
        }

        let landing_error = match vehicle.land() {
            Ok(_) => {
                info!("Land command sent");
                None
            }
            Err(e) => {
                error!("Land command error: {}", e);
                Some(MissionError::LandingCommand(e))
            }
        };

        info!(
            "Waiting {:.1} s for landing to complete...",
            self.params.land_settle_s
        );
        clock.sleep_s(self.params.land_settle_s);

        let mut diagnostics = LandingDiagnostics::default();
        match vehicle.is_armed() {
            Ok(a) => {
                info!("Vehicle armed: {}", a);
                diagnostics.is_armed = Some(a);
            }
            Err(e) => warn!("Status check error: {}", e),
        }
        match vehicle.flight_mode() {
            Ok(m) => {
                info!("Flight mode: {:?}", m);
                diagnostics.flight_mode = Some(m);
            }
            Err(e) => warn!("Status check error: {}", e),
        }

        info!("Landing sequence completed");

        (landing_error, diagnostics)
    }

    /// Abort the mission: return to the takeoff pose if there is one, then land.
    fn abort<V, C>(
        &self,
        ctx: &mut MissionContext,
        vehicle: &mut V,
        clock: &mut C,
        cause: MissionError,
        start_s: f64,
    ) -> MissionReport
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        let failed_phase = ctx.phase();
        error!("Mission failed in {:?}: {}", failed_phase, cause);
        ctx.set_phase(MissionPhase::Abort);

        let mut errors = AbortErrors::default();

        // Return once, unless it was the return itself that failed
        if ctx.takeoff_pose().is_some() && failed_phase != MissionPhase::ReturnToTakeoff {
            warn!("Emergency return to takeoff position...");
            ctx.set_phase(MissionPhase::ReturnToTakeoff);

            if let Err(e) = self.mode_return_to_takeoff(ctx, vehicle, clock) {
                error!("Emergency return failed: {}", e);
                errors.return_error = Some(e.to_string());
            }
        }

        warn!("Emergency landing sequence...");
        ctx.set_phase(MissionPhase::Land);
        let (landing_error, diagnostics) = self.land(ctx, vehicle, clock);
        errors.landing_error = landing_error.map(|e| e.to_string());

        if let Some(ref e) = errors.landing_error {
            error!("Emergency landing failed: {}", e);
        }

        ctx.set_phase(MissionPhase::Done);

        MissionReport::build(
            ctx,
            self.pattern,
            Some(cause.to_string()),
            errors.return_error,
            errors.landing_error,
            diagnostics,
            clock.now_s() - start_s,
        )
    }

    /// Fly one leg with the mission's tolerance, timeout and hover time.
    fn seek<V, C>(
        &self,
        vehicle: &mut V,
        clock: &mut C,
        target: Pose,
        speed_ms: f64,
    ) -> Result<SeekReport, MissionError>
    where
        V: VehicleLink + ?Sized,
        C: Clock,
    {
        let req = SeekRequest {
            target,
            speed_ms,
            tolerance_m: self.profile.waypoint_tolerance_m,
            max_duration_s: self.params.max_seek_duration_s,
            hold_time_s: self.profile.hover_time_s,
        };

        Ok(self.nav_ctrl.seek(vehicle, clock, &req)?)
    }

    fn record_leg(&self, ctx: &mut MissionContext, index: usize, report: &SeekReport) {
        ctx.set_last_pose(report.last_pose);

        if report.outcome == SeekOutcome::TimedOut {
            warn!("Waypoint {} reached with timeout, continuing...", index + 1);
            ctx.record_timeout(index);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_vehicle::{SimCommand, SimFaults, SimVehicle, SimVehicleParams};
    use crate::wall::WallPosition;
    use comms_if::eqpt::vehicle::FlightMode;
    use util::time::SimClock;

    fn sim(faults: SimFaults) -> (SimClock, SimVehicle<SimClock>) {
        let clock = SimClock::new();
        let vehicle =
            SimVehicle::new(SimVehicleParams::default(), faults, clock.clone()).with_command_log();
        (clock, vehicle)
    }

    fn wall(width_m: f64, height_m: f64) -> WallGeometry {
        WallGeometry::new(WallPosition { x: 7.0, y: 0.0 }, width_m, height_m, 0.2).unwrap()
    }

    fn mission_mgr(params: MissionMgrParams, wall: WallGeometry, pattern: PatternType) -> MissionMgr {
        MissionMgr::new(
            params,
            CovPlanner::default(),
            NavCtrl::default(),
            wall,
            pattern,
        )
        .unwrap()
    }

    #[test]
    fn test_nominal_mission() {
        let (mut clock, mut vehicle) = sim(SimFaults::default());
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(1.0, 2.0),
            PatternType::Vertical,
        );

        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        assert_eq!(report.outcome, MissionOutcome::Completed);
        assert!(report.is_success());
        assert_eq!(
            report.phases,
            vec![
                MissionPhase::Connect,
                MissionPhase::AwaitTelemetry,
                MissionPhase::CaptureTakeoffPose,
                MissionPhase::ArmAndClimb,
                MissionPhase::TransitToStart,
                MissionPhase::ExecutePattern,
                MissionPhase::ReturnToTakeoff,
                MissionPhase::Land,
                MissionPhase::Done,
            ]
        );
        assert_eq!(report.num_waypoints, 12);
        assert!(report.timed_out_legs.is_empty());
        assert!(report.landing_error.is_none());

        // Takeoff pose is at the top of the climb above the launch point
        let takeoff_pose = report.takeoff_pose.unwrap();
        assert!(takeoff_pose.horizontal_distance_to(&Pose::default()) < 1e-9);
        assert!((takeoff_pose.down_m() - -2.0).abs() < 0.5);

        // Landed and disarmed
        assert_eq!(report.final_is_armed, Some(false));
        assert_eq!(report.final_flight_mode, Some(FlightMode::Land));
        assert_eq!(vehicle.position_m_ned()[2], 0.0);

        // Offboard was stopped before landing
        let log = vehicle.command_log();
        let stop_idx = log.iter().position(|c| *c == SimCommand::StopOffboard);
        let land_idx = log.iter().position(|c| *c == SimCommand::Land);
        assert!(stop_idx.unwrap() < land_idx.unwrap());
    }

    #[test]
    fn test_nominal_landing_failure() {
        let faults = SimFaults {
            reject_land: true,
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(1.0, 2.0),
            PatternType::Vertical,
        );

        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        // The pattern was flown, but the vehicle is still up so the mission did not succeed
        assert_eq!(report.outcome, MissionOutcome::Completed);
        assert!(!report.is_aborted());
        assert!(!report.is_success());
        assert!(report.landing_error.as_ref().unwrap().contains("land"));
        assert_eq!(report.final_is_armed, Some(true));

        // Landing is not retried
        let num_lands = vehicle
            .command_log()
            .iter()
            .filter(|c| **c == SimCommand::Land)
            .count();
        assert_eq!(num_lands, 1);
    }

    #[test]
    fn test_timeouts_do_not_abort() {
        // The two waypoints of the top stripe are above the vehicle's ceiling and can never be
        // reached
        let faults = SimFaults {
            ceiling_down_m: Some(-7.8),
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);

        let mut params = MissionMgrParams::default();
        params.horizontal_profile.waypoint_tolerance_m = 0.1;
        params.max_seek_duration_s = 10.0;

        let mgr = mission_mgr(params, wall(1.0, 7.5), PatternType::Horizontal);
        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        assert_eq!(report.num_waypoints, 40);
        assert_eq!(report.timed_out_legs, vec![38, 39]);
        assert_eq!(
            report.outcome,
            MissionOutcome::CompletedWithTimeouts { num_timeouts: 2 }
        );
        assert!(report.phases.contains(&MissionPhase::ReturnToTakeoff));
        assert!(report.phases.contains(&MissionPhase::Land));
        assert!(!report.phases.contains(&MissionPhase::Abort));
        assert_eq!(report.final_is_armed, Some(false));
    }

    #[test]
    fn test_arm_rejected_aborts() {
        let faults = SimFaults {
            reject_arm: true,
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(15.0, 5.0),
            PatternType::Vertical,
        );

        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        match &report.outcome {
            MissionOutcome::AbortedAndLanded { cause } => assert!(cause.contains("arm")),
            o => panic!("Expected AbortedAndLanded, got {:?}", o),
        }
        assert!(report.is_aborted());
        assert!(report.phases.contains(&MissionPhase::Abort));
        assert!(!report.phases.contains(&MissionPhase::ExecutePattern));
        assert!(report.takeoff_pose.is_none());

        // No return leg without a takeoff pose, but the landing still happens
        assert!(!report.phases.contains(&MissionPhase::ReturnToTakeoff));
        assert_eq!(vehicle.command_log().last(), Some(&SimCommand::Land));
        assert!(!vehicle
            .command_log()
            .iter()
            .any(|c| matches!(c, SimCommand::SetVelocity(_))));
    }

    #[test]
    fn test_offboard_rejected_aborts() {
        let faults = SimFaults {
            reject_offboard: true,
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(15.0, 5.0),
            PatternType::Horizontal,
        );

        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        assert!(matches!(
            report.outcome,
            MissionOutcome::AbortedAndLanded { .. }
        ));
        assert!(!vehicle.command_log().contains(&SimCommand::Arm));
        assert!(vehicle.command_log().contains(&SimCommand::Land));
    }

    #[test]
    fn test_landing_failure_during_abort() {
        let faults = SimFaults {
            reject_arm: true,
            reject_land: true,
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(15.0, 5.0),
            PatternType::Vertical,
        );

        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        match &report.outcome {
            MissionOutcome::AbortedWithLandingFailure {
                cause,
                landing_error,
            } => {
                assert!(cause.contains("arm"));
                assert!(landing_error.contains("land"));
            }
            o => panic!("Expected AbortedWithLandingFailure, got {:?}", o),
        }

        // Landing is attempted exactly once
        let num_lands = vehicle
            .command_log()
            .iter()
            .filter(|c| **c == SimCommand::Land)
            .count();
        assert_eq!(num_lands, 1);
    }

    #[test]
    fn test_stream_rejected_mid_mission() {
        let faults = SimFaults {
            reject_setpoints_after: Some(200),
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(15.0, 5.0),
            PatternType::Vertical,
        );

        let report = mgr.run(&mut vehicle, &mut clock).unwrap();

        // The stream is still refused on the way home, so the return fails but the landing
        // goes ahead
        assert!(matches!(
            report.outcome,
            MissionOutcome::AbortedAndLanded { .. }
        ));
        assert!(report.takeoff_pose.is_some());
        assert!(report.return_error.is_some());
        assert_eq!(report.final_is_armed, Some(false));
        assert_eq!(report.phases.last(), Some(&MissionPhase::Done));
    }

    #[test]
    fn test_connection_refused() {
        let faults = SimFaults {
            refuse_connection: true,
            ..Default::default()
        };
        let (mut clock, mut vehicle) = sim(faults);
        let mgr = mission_mgr(
            MissionMgrParams::default(),
            wall(15.0, 5.0),
            PatternType::Vertical,
        );

        let res = mgr.run(&mut vehicle, &mut clock);

        assert!(matches!(res, Err(MissionError::Connection(_))));
        assert!(vehicle.command_log().is_empty());
    }

    #[test]
    fn test_not_ready() {
        let clock = SimClock::new();
        let params = SimVehicleParams {
            health_warmup_s: 1000.0,
            ..Default::default()
        };
        let mut vehicle =
            SimVehicle::new(params, SimFaults::default(), clock.clone()).with_command_log();
        let mut clock = clock;

        let mut mgr_params = MissionMgrParams::default();
        mgr_params.readiness_timeout_s = 2.0;
        let mgr = mission_mgr(mgr_params, wall(15.0, 5.0), PatternType::Vertical);

        let res = mgr.run(&mut vehicle, &mut clock);

        assert!(matches!(res, Err(MissionError::NotReady(_))));
        assert!(vehicle.command_log().is_empty());
        assert!(clock.now_s() < 2.0 + 0.1 + 1e-9);
    }

    #[test]
    fn test_unbounded_seek_duration_rejected() {
        let params = MissionMgrParams {
            max_seek_duration_s: std::f64::INFINITY,
            ..Default::default()
        };

        let res = MissionMgr::new(
            params,
            CovPlanner::default(),
            NavCtrl::default(),
            wall(15.0, 5.0),
            PatternType::Vertical,
        );
        assert!(matches!(
            res,
            Err(MissionError::Config(ConfigError::InvalidParams(_)))
        ));
    }

    #[test]
    fn test_invalid_profile() {
        let mut params = MissionMgrParams::default();
        params.horizontal_profile.positioning_speed_ms = 0.0;

        // Only the selected pattern's profile matters
        assert!(MissionMgr::new(
            params.clone(),
            CovPlanner::default(),
            NavCtrl::default(),
            wall(15.0, 5.0),
            PatternType::Vertical,
        )
        .is_ok());

        let res = MissionMgr::new(
            params,
            CovPlanner::default(),
            NavCtrl::default(),
            wall(15.0, 5.0),
            PatternType::Horizontal,
        );
        assert!(matches!(
            res,
            Err(MissionError::Config(ConfigError::InvalidSpeedProfile { .. }))
        ));
    }
}
