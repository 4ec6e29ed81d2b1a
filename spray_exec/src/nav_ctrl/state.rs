//! Navigation control module state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vehicle::{MotionSink, PoseSource, VehicleError, VelocityNedYaw};
use log::{debug, info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;
use util::{
    maths::clamp_abs,
    params,
    time::{Clock, Ticker},
};

use super::NavCtrlParams;
use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Navigation controller.
///
/// Holds no state between legs, so the same controller is used for every leg of a mission.
#[derive(Debug, Clone, Default)]
pub struct NavCtrl {
    params: NavCtrlParams,
}

/// One leg to be flown by [`NavCtrl::seek`].
#[derive(Debug, Copy, Clone)]
pub struct SeekRequest {
    pub target: Pose,

    /// Speed along the displacement to the target
    pub speed_ms: f64,

    /// The target is reached once closer than this
    pub tolerance_m: f64,

    /// Time after which the leg is abandoned
    pub max_duration_s: f64,

    /// Time to hold position at the target once the leg has finished. The hold always lasts at
    /// least one tick.
    pub hold_time_s: f64,
}

/// Result of a finished leg.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct SeekReport {
    pub outcome: SeekOutcome,

    /// Distance to the target at the last sample
    pub final_distance_m: f64,

    /// Time spent seeking, not including the hold
    pub elapsed_s: f64,

    /// Number of velocity demands issued
    pub num_velocity_cmds: usize,

    /// The last sampled pose
    pub last_pose: Pose,
}

/// Progress of the leg in flight.
struct Leg {
    req: SeekRequest,
    ticker: Ticker,
    start_s: f64,
    elapsed_s: f64,
    hold_ticks_remaining: usize,
    num_velocity_cmds: usize,
    last_pose: Pose,
    last_distance_m: f64,
    outcome: SeekOutcome,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SeekOutcome {
    Converged,
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum NavCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid seek request: {0}")]
    InvalidRequest(String),

    #[error("Could not sample the vehicle pose: {0}")]
    PoseUnavailable(VehicleError),

    #[error("A motion command was rejected: {0}")]
    CommandRejected(VehicleError),
}

/// The possible modes of a leg. Each mode is handled by a `mode_xyz` function which returns the
/// mode to switch to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum NavCtrlMode {
    Seek,
    Hold,
    Finished,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl NavCtrl {
    /// Initialise the controller from the given parameter file.
    pub fn init(params_file: &str) -> Result<Self, NavCtrlError> {
        let params = params::load(params_file).map_err(NavCtrlError::ParamLoadError)?;

        Self::new(params)
    }

    pub fn new(params: NavCtrlParams) -> Result<Self, NavCtrlError> {
        if !(params.tick_period_s.is_finite() && params.tick_period_s > 0.0) {
            return Err(NavCtrlError::InvalidParams(format!(
                "tick period must be positive, found {}",
                params.tick_period_s
            )));
        }
        if !(params.max_component_ratio > 0.0 && params.max_component_ratio <= 1.0) {
            return Err(NavCtrlError::InvalidParams(format!(
                "component ratio must be in (0, 1], found {}",
                params.max_component_ratio
            )));
        }
        if !(params.slowdown_radius_m > 0.0) {
            return Err(NavCtrlError::InvalidParams(format!(
                "slowdown radius must be positive, found {}",
                params.slowdown_radius_m
            )));
        }
        if !(params.min_slowdown_factor > 0.0 && params.min_slowdown_factor <= 1.0) {
            return Err(NavCtrlError::InvalidParams(format!(
                "minimum slowdown factor must be in (0, 1], found {}",
                params.min_slowdown_factor
            )));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &NavCtrlParams {
        &self.params
    }

    /// Number of ticks covering the given duration.
    pub fn ticks_for(&self, duration_s: f64) -> usize {
        if duration_s <= 0.0 {
            return 0;
        }

        (duration_s / self.params.tick_period_s).round() as usize
    }

    /// Fly one leg to the requested target.
    ///
    /// Returns once the leg has converged or timed out and the hold at the target has finished.
    /// Errors are only returned if the pose could not be sampled or a command was rejected.
    pub fn seek<V, C>(
        &self,
        vehicle: &mut V,
        clock: &mut C,
        req: &SeekRequest,
    ) -> Result<SeekReport, NavCtrlError>
    where
        V: PoseSource + MotionSink + ?Sized,
        C: Clock,
    {
        req.validate()?;

        debug!(
            "Seeking {} at {:.2} m/s (tol {:.2} m, max {:.1} s)",
            req.target, req.speed_ms, req.tolerance_m, req.max_duration_s
        );

        let start_s = clock.now_s();
        let mut leg = Leg {
            req: *req,
            ticker: Ticker::start(self.params.tick_period_s, clock),
            start_s,
            elapsed_s: 0.0,
            hold_ticks_remaining: self.ticks_for(req.hold_time_s).max(1),
            num_velocity_cmds: 0,
            last_pose: Pose::default(),
            last_distance_m: std::f64::INFINITY,
            outcome: SeekOutcome::TimedOut,
        };

        // Mode execution. Each of the mode functions returns either the mode to switch to or an
        // error
        let mut mode = NavCtrlMode::Seek;
        while mode != NavCtrlMode::Finished {
            mode = match mode {
                NavCtrlMode::Seek => self.mode_seek(&mut leg, vehicle, clock),
                NavCtrlMode::Hold => self.mode_hold(&mut leg, vehicle, clock),
                NavCtrlMode::Finished => Ok(NavCtrlMode::Finished),
            }?;
        }

        Ok(SeekReport {
            outcome: leg.outcome,
            final_distance_m: leg.last_distance_m,
            elapsed_s: leg.elapsed_s,
            num_velocity_cmds: leg.num_velocity_cmds,
            last_pose: leg.last_pose,
        })
    }

    /// Stream position setpoints at `target` for the given number of ticks.
    pub fn hold_position<V, C>(
        &self,
        vehicle: &mut V,
        clock: &mut C,
        target: &Pose,
        num_ticks: usize,
    ) -> Result<(), NavCtrlError>
    where
        V: MotionSink + ?Sized,
        C: Clock,
    {
        let mut ticker = Ticker::start(self.params.tick_period_s, clock);

        for _ in 0..num_ticks {
            vehicle
                .set_position(target.to_setpoint())
                .map_err(NavCtrlError::CommandRejected)?;
            ticker.wait(clock);
        }

        Ok(())
    }

    /// Calculate the velocity demand for the given displacement to the target.
    ///
    /// The demand points along the displacement with magnitude `speed_ms`, each axis limited to
    /// `max_component_ratio * speed_ms`, and is scaled down inside the slowdown radius.
    pub fn velocity_demand(&self, displacement_m: &Vector3<f64>, speed_ms: f64) -> Vector3<f64> {
        let distance_m = displacement_m.norm();

        if distance_m <= 0.0 {
            return Vector3::zeros();
        }

        let max_component_ms = speed_ms * self.params.max_component_ratio;
        let mut demand_ms =
            (displacement_m / distance_m * speed_ms).map(|v| clamp_abs(v, max_component_ms));

        if distance_m < self.params.slowdown_radius_m {
            let factor = (distance_m / self.params.slowdown_radius_m)
                .max(self.params.min_slowdown_factor);
            demand_ms *= factor;
        }

        demand_ms
    }

    /// One tick of the seek.
    fn mode_seek<V, C>(
        &self,
        leg: &mut Leg,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<NavCtrlMode, NavCtrlError>
    where
        V: PoseSource + MotionSink + ?Sized,
        C: Clock,
    {
        let pose = Pose::from(vehicle.sample().map_err(NavCtrlError::PoseUnavailable)?);
        let displacement_m = leg.req.target.position_m_ned - pose.position_m_ned;
        let distance_m = displacement_m.norm();

        leg.last_pose = pose;
        leg.last_distance_m = distance_m;
        leg.elapsed_s = clock.now_s() - leg.start_s;

        if distance_m < leg.req.tolerance_m {
            info!(
                "Reached {} (distance: {:.2} m, {:.1} s)",
                leg.req.target, distance_m, leg.elapsed_s
            );
            leg.outcome = SeekOutcome::Converged;
            return Ok(NavCtrlMode::Hold);
        }

        if leg.elapsed_s >= leg.req.max_duration_s {
            warn!(
                "Timeout reaching {}, distance: {:.2} m",
                leg.req.target, distance_m
            );
            leg.outcome = SeekOutcome::TimedOut;
            return Ok(NavCtrlMode::Hold);
        }

        let demand_ms = self.velocity_demand(&displacement_m, leg.req.speed_ms);

        trace!(
            "At {} distance {:.2} m, demand [{:.2}, {:.2}, {:.2}] m/s",
            pose,
            distance_m,
            demand_ms[0],
            demand_ms[1],
            demand_ms[2]
        );

        vehicle
            .set_velocity(VelocityNedYaw {
                north_ms: demand_ms[0],
                east_ms: demand_ms[1],
                down_ms: demand_ms[2],
                yaw_deg: leg.req.target.yaw_deg,
            })
            .map_err(NavCtrlError::CommandRejected)?;
        leg.num_velocity_cmds += 1;

        leg.ticker.wait(clock);

        Ok(NavCtrlMode::Seek)
    }

    /// One tick of the hold at the target.
    ///
    /// The first hold tick is the tick on which the seek finished, so velocity control is stopped
    /// without a second command going out in that tick.
    fn mode_hold<V, C>(
        &self,
        leg: &mut Leg,
        vehicle: &mut V,
        clock: &mut C,
    ) -> Result<NavCtrlMode, NavCtrlError>
    where
        V: MotionSink + ?Sized,
        C: Clock,
    {
        if leg.hold_ticks_remaining == 0 {
            return Ok(NavCtrlMode::Finished);
        }

        vehicle
            .set_position(leg.req.target.to_setpoint())
            .map_err(NavCtrlError::CommandRejected)?;
        leg.hold_ticks_remaining -= 1;

        leg.ticker.wait(clock);

        Ok(NavCtrlMode::Hold)
    }
}

impl SeekRequest {
    fn validate(&self) -> Result<(), NavCtrlError> {
        if !(self.speed_ms.is_finite() && self.speed_ms > 0.0) {
            return Err(NavCtrlError::InvalidRequest(format!(
                "speed must be positive, found {}",
                self.speed_ms
            )));
        }
        if !(self.tolerance_m.is_finite() && self.tolerance_m > 0.0) {
            return Err(NavCtrlError::InvalidRequest(format!(
                "tolerance must be positive, found {}",
                self.tolerance_m
            )));
        }
        if !(self.max_duration_s.is_finite() && self.max_duration_s >= 0.0) {
            return Err(NavCtrlError::InvalidRequest(format!(
                "max duration must be finite and not negative, found {}",
                self.max_duration_s
            )));
        }
        if !(self.hold_time_s.is_finite() && self.hold_time_s >= 0.0) {
            return Err(NavCtrlError::InvalidRequest(format!(
                "hold time must be finite and not negative, found {}",
                self.hold_time_s
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_vehicle::{SimCommand, SimFaults, SimVehicle, SimVehicleParams};
    use comms_if::eqpt::vehicle::VehicleStatus;
    use util::time::SimClock;

    /// A simulated vehicle already armed and flying in offboard mode at 2 m.
    fn flying_vehicle(clock: &mut SimClock, faults: SimFaults) -> SimVehicle<SimClock> {
        let params = SimVehicleParams {
            spawn_position_m_ned: [0.0, 0.0, -2.0],
            ..Default::default()
        };
        let mut vehicle = SimVehicle::new(params, faults, clock.clone()).with_command_log();

        vehicle.connect().unwrap();
        clock.sleep_s(5.0);
        let here = Pose::from(vehicle.sample().unwrap());
        vehicle.set_position(here.to_setpoint()).unwrap();
        vehicle.start_offboard_stream().unwrap();
        vehicle.arm().unwrap();
        vehicle.clear_command_log();

        vehicle
    }

    fn request(target: Pose) -> SeekRequest {
        SeekRequest {
            target,
            speed_ms: 1.0,
            tolerance_m: 0.3,
            max_duration_s: 30.0,
            hold_time_s: 0.0,
        }
    }

    fn nav_ctrl() -> NavCtrl {
        NavCtrl::new(NavCtrlParams::default()).unwrap()
    }

    #[test]
    fn test_velocity_demand() {
        let nc = nav_ctrl();

        // Far away along one axis, the component limit applies
        let v = nc.velocity_demand(&Vector3::new(10.0, 0.0, 0.0), 1.0);
        assert!((v - Vector3::new(0.8, 0.0, 0.0)).norm() < 1e-12);

        // Far away on a diagonal, under the component limit
        let v = nc.velocity_demand(&Vector3::new(10.0, -10.0, 0.0), 1.0);
        let c = 1.0 / 2f64.sqrt();
        assert!((v - Vector3::new(c, -c, 0.0)).norm() < 1e-12);

        // Inside the slowdown radius, linear slowdown
        let v = nc.velocity_demand(&Vector3::new(0.0, 0.0, -1.0), 1.0);
        assert!((v - Vector3::new(0.0, 0.0, -0.4)).norm() < 1e-12);

        // Very close, the minimum slowdown factor applies
        let v = nc.velocity_demand(&Vector3::new(0.0, 0.2, 0.0), 1.0);
        assert!((v - Vector3::new(0.0, 0.24, 0.0)).norm() < 1e-12);

        assert_eq!(nc.velocity_demand(&Vector3::zeros(), 1.0), Vector3::zeros());
    }

    #[test]
    fn test_ticks_for() {
        let nc = nav_ctrl();

        assert_eq!(nc.ticks_for(1.5), 15);
        assert_eq!(nc.ticks_for(3.0), 30);
        assert_eq!(nc.ticks_for(0.0), 0);
        assert_eq!(nc.ticks_for(-1.0), 0);
    }

    #[test]
    fn test_invalid_params() {
        let res = NavCtrl::new(NavCtrlParams {
            tick_period_s: 0.0,
            ..Default::default()
        });
        assert!(matches!(res, Err(NavCtrlError::InvalidParams(_))));

        let res = NavCtrl::new(NavCtrlParams {
            max_component_ratio: 1.5,
            ..Default::default()
        });
        assert!(matches!(res, Err(NavCtrlError::InvalidParams(_))));
    }

    #[test]
    fn test_seek_converges() {
        let mut clock = SimClock::new();
        let mut vehicle = flying_vehicle(&mut clock, SimFaults::default());
        let target = Pose::new(0.0, 3.0, -3.0, 0.0);

        let report = nav_ctrl()
            .seek(&mut vehicle, &mut clock, &request(target))
            .unwrap();

        assert_eq!(report.outcome, SeekOutcome::Converged);
        assert!(report.final_distance_m < 0.3);
        assert!(report.num_velocity_cmds > 0);
        assert!(report.elapsed_s < 30.0);

        // Velocity control ends with a position setpoint at the target
        assert_eq!(
            vehicle.command_log().last(),
            Some(&SimCommand::SetPosition(target.to_setpoint()))
        );
    }

    #[test]
    fn test_seek_at_current_pose() {
        let mut clock = SimClock::new();
        let mut vehicle = flying_vehicle(&mut clock, SimFaults::default());
        let here = Pose::from(vehicle.sample().unwrap());

        let req = SeekRequest {
            hold_time_s: 0.5,
            ..request(here)
        };
        let report = nav_ctrl().seek(&mut vehicle, &mut clock, &req).unwrap();

        assert_eq!(report.outcome, SeekOutcome::Converged);
        assert_eq!(report.num_velocity_cmds, 0);
        assert_eq!(report.elapsed_s, 0.0);

        // One setpoint per hold tick, no velocity demands at all
        let log = vehicle.command_log();
        assert_eq!(log.len(), 5);
        assert!(log.iter().all(|c| matches!(c, SimCommand::SetPosition(_))));
        assert!((clock.now_s() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_seek_times_out_when_frozen() {
        let mut clock = SimClock::new();
        let faults = SimFaults {
            frozen: true,
            ..Default::default()
        };
        let mut vehicle = flying_vehicle(&mut clock, faults);
        let start_s = clock.now_s();

        let req = SeekRequest {
            max_duration_s: 2.0,
            hold_time_s: 1.0,
            ..request(Pose::new(10.0, 0.0, -2.0, 0.0))
        };
        let report = nav_ctrl().seek(&mut vehicle, &mut clock, &req).unwrap();

        assert_eq!(report.outcome, SeekOutcome::TimedOut);
        assert!(report.elapsed_s >= 2.0 - 1e-9);
        assert!(report.elapsed_s <= 2.0 + 0.1 + 1e-9);
        assert!((report.final_distance_m - 10.0).abs() < 1e-9);

        // The hold still runs after a timeout
        let seek_end_s = start_s + report.elapsed_s;
        assert!((clock.now_s() - (seek_end_s + 1.0)).abs() < 1e-9);
        let num_holds = vehicle
            .command_log()
            .iter()
            .filter(|c| matches!(c, SimCommand::SetPosition(_)))
            .count();
        assert_eq!(num_holds, 10);
    }

    #[test]
    fn test_seek_command_rejected() {
        let mut clock = SimClock::new();
        let faults = SimFaults {
            reject_setpoints_after: Some(5),
            ..Default::default()
        };
        let mut vehicle = SimVehicle::new(
            SimVehicleParams {
                spawn_position_m_ned: [0.0, 0.0, -2.0],
                ..Default::default()
            },
            faults,
            clock.clone(),
        )
        .with_command_log();
        vehicle.connect().unwrap();

        let res = nav_ctrl().seek(
            &mut vehicle,
            &mut clock,
            &request(Pose::new(10.0, 0.0, -2.0, 0.0)),
        );

        assert!(matches!(res, Err(NavCtrlError::CommandRejected(_))));
    }

    #[test]
    fn test_seek_invalid_request() {
        let mut clock = SimClock::new();
        let mut vehicle = flying_vehicle(&mut clock, SimFaults::default());

        let req = SeekRequest {
            tolerance_m: 0.0,
            ..request(Pose::default())
        };

        assert!(matches!(
            nav_ctrl().seek(&mut vehicle, &mut clock, &req),
            Err(NavCtrlError::InvalidRequest(_))
        ));
        assert!(vehicle.command_log().is_empty());

        let req = SeekRequest {
            max_duration_s: std::f64::INFINITY,
            ..request(Pose::default())
        };
        assert!(matches!(
            nav_ctrl().seek(&mut vehicle, &mut clock, &req),
            Err(NavCtrlError::InvalidRequest(_))
        ));

        let req = SeekRequest {
            hold_time_s: std::f64::NAN,
            ..request(Pose::default())
        };
        assert!(matches!(
            nav_ctrl().seek(&mut vehicle, &mut clock, &req),
            Err(NavCtrlError::InvalidRequest(_))
        ));
        assert!(vehicle.command_log().is_empty());
    }

    #[test]
    fn test_one_command_per_tick() {
        let mut clock = SimClock::new();
        let mut vehicle = flying_vehicle(&mut clock, SimFaults::default());
        let start_s = clock.now_s();

        let req = SeekRequest {
            hold_time_s: 1.0,
            ..request(Pose::new(0.0, 2.0, -2.0, 0.0))
        };
        let report = nav_ctrl().seek(&mut vehicle, &mut clock, &req).unwrap();
        assert_eq!(report.outcome, SeekOutcome::Converged);

        // Every command is followed by a full tick, so the commands span the whole leg
        let num_cmds = vehicle.command_log().len();
        assert_eq!(num_cmds, report.num_velocity_cmds + 10);
        let num_ticks = ((clock.now_s() - start_s) / 0.1).round() as usize;
        assert_eq!(num_cmds, num_ticks);
    }
}
