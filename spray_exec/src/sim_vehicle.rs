//! # Simulated vehicle
//!
//! A kinematic point mass implementing the vehicle link traits, used in place of the real
//! transport by the exec and by the tests. It models the parts of the flight stack protocol that
//! the mission depends on:
//!
//! - Offboard mode can only be started once a setpoint has been sent, and stopping it fails if it
//!   isn't active.
//! - Health only reports a valid position estimate some time after connecting.
//! - Motion only happens while armed. Velocity setpoints are followed directly, position
//!   setpoints are tracked with a proportional law, both limited to the maximum speed.
//! - Landing descends to the ground and then disarms.
//!
//! The state is integrated lazily on every interaction using the shared clock, so the vehicle
//! runs in whatever time the controllers run in. Faults can be injected with [`SimFaults`], and
//! every command received is recorded in a log.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vehicle::{
    FlightMode, Health, LinkCmd, MotionSink, PoseSource, PositionNed, PositionNedYaw,
    VehicleError, VehicleStatus, VelocityNedYaw,
};
use log::{debug, info, trace};
use nalgebra::Vector3;
use serde::Deserialize;
use util::time::Clock;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SimVehicleParams {
    /// Address reported in connection errors
    pub address: String,

    /// Initial position of the vehicle in the NED frame
    pub spawn_position_m_ned: [f64; 3],

    pub max_speed_ms: f64,

    /// Proportional gain used to track position setpoints, in 1/s
    pub position_gain: f64,

    pub land_speed_ms: f64,

    pub ground_level_down_m: f64,

    /// Time after connecting before the position estimate is reported valid
    pub health_warmup_s: f64,
}

/// Faults which can be injected into the simulation.
#[derive(Debug, Clone, Default)]
pub struct SimFaults {
    pub refuse_connection: bool,

    pub reject_arm: bool,

    pub reject_offboard: bool,

    /// Reject velocity and position setpoints once this many have been accepted
    pub reject_setpoints_after: Option<usize>,

    pub reject_land: bool,

    /// The vehicle accepts commands but never moves
    pub frozen: bool,

    /// The vehicle cannot climb above this down coordinate
    pub ceiling_down_m: Option<f64>,
}

/// Simulated vehicle.
pub struct SimVehicle<C: Clock> {
    params: SimVehicleParams,
    faults: SimFaults,
    clock: C,

    last_update_s: f64,
    connected_at_s: Option<f64>,

    position_m_ned: Vector3<f64>,
    demand: Demand,

    is_armed: bool,
    is_offboard: bool,
    is_landing: bool,
    flight_mode: FlightMode,

    num_setpoints: usize,

    /// Received commands, only kept once enabled with [`SimVehicle::with_command_log`]
    command_log: Option<Vec<SimCommand>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// A command received by the simulated vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    SetVelocity(VelocityNedYaw),
    SetPosition(PositionNedYaw),
    Arm,
    StartOffboard,
    StopOffboard,
    Land,
}

#[derive(Debug, Copy, Clone)]
enum Demand {
    None,
    Velocity(Vector3<f64>),
    Position(Vector3<f64>),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for SimVehicleParams {
    fn default() -> Self {
        Self {
            address: String::from("udp://:14540"),
            spawn_position_m_ned: [0.0, 0.0, 0.0],
            max_speed_ms: 5.0,
            position_gain: 1.5,
            land_speed_ms: 0.7,
            ground_level_down_m: 0.0,
            health_warmup_s: 1.0,
        }
    }
}

impl<C: Clock> SimVehicle<C> {
    pub fn new(params: SimVehicleParams, faults: SimFaults, clock: C) -> Self {
        let [n, e, d] = params.spawn_position_m_ned;
        let last_update_s = clock.now_s();

        Self {
            params,
            faults,
            clock,
            last_update_s,
            connected_at_s: None,
            position_m_ned: Vector3::new(n, e, d),
            demand: Demand::None,
            is_armed: false,
            is_offboard: false,
            is_landing: false,
            flight_mode: FlightMode::Unknown,
            num_setpoints: 0,
            command_log: None,
        }
    }

    /// Record every command received from now on.
    pub fn with_command_log(mut self) -> Self {
        self.command_log = Some(Vec::new());
        self
    }

    /// All commands received so far, oldest first. Empty unless the log was enabled.
    pub fn command_log(&self) -> &[SimCommand] {
        match self.command_log {
            Some(ref log) => log.as_slice(),
            None => &[],
        }
    }

    pub fn clear_command_log(&mut self) {
        if let Some(ref mut log) = self.command_log {
            log.clear();
        }
    }

    /// True position of the vehicle, without integrating.
    pub fn position_m_ned(&self) -> Vector3<f64> {
        self.position_m_ned
    }

    pub fn is_offboard(&self) -> bool {
        self.is_offboard
    }

    fn is_connected(&self) -> bool {
        self.connected_at_s.is_some()
    }

    fn is_position_ok(&self) -> bool {
        match self.connected_at_s {
            Some(t) => self.clock.now_s() - t >= self.params.health_warmup_s,
            None => false,
        }
    }

    fn check_connected(&self) -> Result<(), VehicleError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(VehicleError::NotConnected)
        }
    }

    fn record(&mut self, cmd: SimCommand) {
        if let Some(ref mut log) = self.command_log {
            log.push(cmd);
        }
    }

    fn reject(cmd: LinkCmd, reason: &str) -> VehicleError {
        VehicleError::CommandRejected {
            cmd,
            reason: reason.to_string(),
        }
    }

    /// Bring the simulated state up to the current time.
    fn update(&mut self) {
        let now_s = self.clock.now_s();
        let dt_s = now_s - self.last_update_s;
        self.last_update_s = now_s;

        if dt_s <= 0.0 || !self.is_armed || self.faults.frozen {
            return;
        }

        let ground_m = self.params.ground_level_down_m;

        if self.is_landing {
            self.position_m_ned[2] =
                (self.position_m_ned[2] + self.params.land_speed_ms * dt_s).min(ground_m);

            if self.position_m_ned[2] >= ground_m {
                info!("Sim vehicle touched down, disarming");
                self.is_landing = false;
                self.is_armed = false;
                self.demand = Demand::None;
            }
            return;
        }

        match self.demand {
            Demand::None => (),
            Demand::Velocity(v) => self.position_m_ned += v * dt_s,
            Demand::Position(p) => {
                let error_m = p - self.position_m_ned;
                let distance_m = error_m.norm();

                if distance_m > 0.0 {
                    let speed_ms =
                        (self.params.position_gain * distance_m).min(self.params.max_speed_ms);
                    let step_m = (speed_ms * dt_s).min(distance_m);
                    self.position_m_ned += error_m / distance_m * step_m;
                }
            }
        }

        // Can't go through the ground, or above the ceiling
        self.position_m_ned[2] = self.position_m_ned[2].min(ground_m);
        if let Some(ceiling_m) = self.faults.ceiling_down_m {
            self.position_m_ned[2] = self.position_m_ned[2].max(ceiling_m);
        }
    }

    /// Common handling of velocity and position setpoints.
    fn accept_setpoint(&mut self, cmd: LinkCmd) -> Result<(), VehicleError> {
        self.check_connected()?;

        if let Some(limit) = self.faults.reject_setpoints_after {
            if self.num_setpoints >= limit {
                return Err(Self::reject(cmd, "setpoint stream refused"));
            }
        }

        self.num_setpoints += 1;
        Ok(())
    }
}

impl<C: Clock> PoseSource for SimVehicle<C> {
    fn sample(&mut self) -> Result<PositionNed, VehicleError> {
        self.check_connected()?;
        self.update();

        Ok(PositionNed {
            north_m: self.position_m_ned[0],
            east_m: self.position_m_ned[1],
            down_m: self.position_m_ned[2],
        })
    }
}

impl<C: Clock> MotionSink for SimVehicle<C> {
    fn set_velocity(&mut self, cmd: VelocityNedYaw) -> Result<(), VehicleError> {
        self.update();
        self.record(SimCommand::SetVelocity(cmd));
        self.accept_setpoint(LinkCmd::SetVelocity)?;

        let mut v = Vector3::new(cmd.north_ms, cmd.east_ms, cmd.down_ms);
        let speed_ms = v.norm();
        if speed_ms > self.params.max_speed_ms {
            v *= self.params.max_speed_ms / speed_ms;
        }

        trace!("Sim velocity demand {:?}", v);
        self.demand = Demand::Velocity(v);

        Ok(())
    }

    fn set_position(&mut self, cmd: PositionNedYaw) -> Result<(), VehicleError> {
        self.update();
        self.record(SimCommand::SetPosition(cmd));
        self.accept_setpoint(LinkCmd::SetPosition)?;

        trace!("Sim position demand {:?}", cmd);
        self.demand = Demand::Position(Vector3::new(cmd.north_m, cmd.east_m, cmd.down_m));

        Ok(())
    }

    fn arm(&mut self) -> Result<(), VehicleError> {
        self.update();
        self.record(SimCommand::Arm);
        self.check_connected()?;

        if self.faults.reject_arm {
            return Err(Self::reject(LinkCmd::Arm, "arming denied"));
        }
        if !self.is_position_ok() {
            return Err(Self::reject(LinkCmd::Arm, "no valid position estimate"));
        }

        debug!("Sim vehicle armed");
        self.is_armed = true;
        if !self.is_offboard {
            self.flight_mode = FlightMode::Hold;
        }

        Ok(())
    }

    fn start_offboard_stream(&mut self) -> Result<(), VehicleError> {
        self.update();
        self.record(SimCommand::StartOffboard);
        self.check_connected()?;

        if self.faults.reject_offboard {
            return Err(Self::reject(LinkCmd::StartOffboard, "offboard denied"));
        }
        if self.num_setpoints == 0 {
            return Err(Self::reject(
                LinkCmd::StartOffboard,
                "no setpoint sent before starting",
            ));
        }

        debug!("Sim vehicle in offboard");
        self.is_offboard = true;
        self.flight_mode = FlightMode::Offboard;

        Ok(())
    }

    fn stop_offboard_stream(&mut self) -> Result<(), VehicleError> {
        self.update();
        self.record(SimCommand::StopOffboard);
        self.check_connected()?;

        if !self.is_offboard {
            return Err(Self::reject(LinkCmd::StopOffboard, "offboard is not active"));
        }

        debug!("Sim vehicle left offboard, holding");
        self.is_offboard = false;
        self.flight_mode = FlightMode::Hold;
        self.demand = Demand::Position(self.position_m_ned);

        Ok(())
    }

    fn land(&mut self) -> Result<(), VehicleError> {
        self.update();
        self.record(SimCommand::Land);
        self.check_connected()?;

        if self.faults.reject_land {
            return Err(Self::reject(LinkCmd::Land, "land denied"));
        }

        debug!("Sim vehicle landing");
        self.is_offboard = false;
        self.is_landing = self.is_armed;
        self.flight_mode = FlightMode::Land;

        Ok(())
    }
}

impl<C: Clock> VehicleStatus for SimVehicle<C> {
    fn connect(&mut self) -> Result<(), VehicleError> {
        if self.faults.refuse_connection {
            return Err(VehicleError::ConnectionFailed {
                address: self.params.address.clone(),
                reason: String::from("connection refused"),
            });
        }

        if !self.is_connected() {
            self.connected_at_s = Some(self.clock.now_s());
            self.last_update_s = self.clock.now_s();
            self.flight_mode = FlightMode::Ready;
            info!("Sim vehicle connected at {}", self.params.address);
        }

        Ok(())
    }

    fn health(&mut self) -> Result<Health, VehicleError> {
        self.check_connected()?;

        let position_ok = self.is_position_ok();

        Ok(Health {
            is_global_position_ok: position_ok,
            is_home_position_ok: position_ok,
            is_armable: position_ok && !self.faults.reject_arm,
        })
    }

    fn is_armed(&mut self) -> Result<bool, VehicleError> {
        self.check_connected()?;
        self.update();

        Ok(self.is_armed)
    }

    fn flight_mode(&mut self) -> Result<FlightMode, VehicleError> {
        self.check_connected()?;
        self.update();

        Ok(self.flight_mode)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use util::time::SimClock;

    fn connected(faults: SimFaults) -> (SimClock, SimVehicle<SimClock>) {
        let mut clock = SimClock::new();
        let mut vehicle =
            SimVehicle::new(SimVehicleParams::default(), faults, clock.clone()).with_command_log();
        vehicle.connect().unwrap();
        clock.sleep_s(1.0);
        (clock, vehicle)
    }

    fn hold_here() -> PositionNedYaw {
        PositionNedYaw::default()
    }

    #[test]
    fn test_not_connected() {
        let clock = SimClock::new();
        let mut vehicle = SimVehicle::new(SimVehicleParams::default(), SimFaults::default(), clock);

        assert_eq!(vehicle.sample(), Err(VehicleError::NotConnected));
        assert_eq!(vehicle.arm(), Err(VehicleError::NotConnected));
    }

    #[test]
    fn test_refuse_connection() {
        let faults = SimFaults {
            refuse_connection: true,
            ..Default::default()
        };
        let mut vehicle = SimVehicle::new(SimVehicleParams::default(), faults, SimClock::new());

        assert!(matches!(
            vehicle.connect(),
            Err(VehicleError::ConnectionFailed { .. })
        ));
    }

    #[test]
    fn test_health_warmup() {
        let mut clock = SimClock::new();
        let mut vehicle =
            SimVehicle::new(SimVehicleParams::default(), SimFaults::default(), clock.clone());
        vehicle.connect().unwrap();

        assert!(!vehicle.health().unwrap().is_ready_for_arming());
        clock.sleep_s(1.0);
        assert!(vehicle.health().unwrap().is_ready_for_arming());
    }

    #[test]
    fn test_offboard_protocol() {
        let (_, mut vehicle) = connected(SimFaults::default());

        // Offboard needs a setpoint first
        assert!(vehicle.start_offboard_stream().is_err());
        assert!(vehicle.stop_offboard_stream().is_err());

        vehicle.set_position(hold_here()).unwrap();
        vehicle.start_offboard_stream().unwrap();
        assert_eq!(vehicle.flight_mode().unwrap(), FlightMode::Offboard);

        vehicle.stop_offboard_stream().unwrap();
        assert_eq!(vehicle.flight_mode().unwrap(), FlightMode::Hold);
        assert!(vehicle.stop_offboard_stream().is_err());
    }

    #[test]
    fn test_moves_only_when_armed() {
        let (mut clock, mut vehicle) = connected(SimFaults::default());

        vehicle
            .set_velocity(VelocityNedYaw {
                north_ms: 1.0,
                ..Default::default()
            })
            .unwrap();
        clock.sleep_s(1.0);
        assert_eq!(vehicle.sample().unwrap().north_m, 0.0);

        vehicle.arm().unwrap();
        clock.sleep_s(1.0);
        assert!((vehicle.sample().unwrap().north_m - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_limited() {
        let (mut clock, mut vehicle) = connected(SimFaults::default());
        vehicle.arm().unwrap();

        vehicle
            .set_velocity(VelocityNedYaw {
                east_ms: 50.0,
                ..Default::default()
            })
            .unwrap();
        clock.sleep_s(1.0);

        assert!((vehicle.sample().unwrap().east_m - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_tracking_and_ceiling() {
        let faults = SimFaults {
            ceiling_down_m: Some(-1.5),
            ..Default::default()
        };
        let (mut clock, mut vehicle) = connected(faults);
        vehicle.arm().unwrap();

        vehicle
            .set_position(PositionNedYaw {
                down_m: -3.0,
                ..Default::default()
            })
            .unwrap();

        for _ in 0..100 {
            clock.sleep_s(0.1);
            vehicle.sample().unwrap();
        }

        assert!((vehicle.position_m_ned()[2] - -1.5).abs() < 1e-9);
    }

    #[test]
    fn test_land_disarms() {
        let (mut clock, mut vehicle) = connected(SimFaults::default());
        vehicle.arm().unwrap();
        vehicle
            .set_position(PositionNedYaw {
                down_m: -2.0,
                ..Default::default()
            })
            .unwrap();
        for _ in 0..100 {
            clock.sleep_s(0.1);
            vehicle.sample().unwrap();
        }
        assert!((vehicle.position_m_ned()[2] - -2.0).abs() < 1e-3);

        vehicle.land().unwrap();
        assert_eq!(vehicle.flight_mode().unwrap(), FlightMode::Land);
        clock.sleep_s(4.0);

        assert_eq!(vehicle.is_armed().unwrap(), false);
        assert_eq!(vehicle.position_m_ned()[2], 0.0);
    }

    #[test]
    fn test_reject_setpoints_after() {
        let faults = SimFaults {
            reject_setpoints_after: Some(2),
            ..Default::default()
        };
        let (_, mut vehicle) = connected(faults);

        vehicle.set_position(hold_here()).unwrap();
        vehicle.set_position(hold_here()).unwrap();
        assert!(matches!(
            vehicle.set_position(hold_here()),
            Err(VehicleError::CommandRejected {
                cmd: LinkCmd::SetPosition,
                ..
            })
        ));

        // Rejected commands are still logged
        assert_eq!(vehicle.command_log().len(), 3);
    }

    #[test]
    fn test_command_log_disabled_by_default() {
        let clock = SimClock::new();
        let mut vehicle = SimVehicle::new(SimVehicleParams::default(), SimFaults::default(), clock);
        vehicle.connect().unwrap();

        vehicle.set_position(hold_here()).unwrap();
        vehicle.start_offboard_stream().unwrap();

        assert!(vehicle.command_log().is_empty());
    }
}
