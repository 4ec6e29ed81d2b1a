//! Main spray executable entry point.
//!
//! # Architecture
//!
//! The executable runs one complete spray mission and exits:
//!
//!     - Initialise the session and logging
//!     - Parse the mission command (pattern and wall config)
//!     - Load parameters and the wall, initialise the MissionMgr
//!     - Open the vehicle link
//!     - Run the mission
//!     - Archive the plan and the mission report in the session directory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use structopt::StructOpt;

// Internal
use comms_if::{eqpt::vehicle::VehicleLink, tc::mission::MissionCmd};
use spray_lib::mission_mgr::MissionMgr;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    time::WallClock,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let cmd = MissionCmd::from_args();

    // Initialise session
    let session = Session::new("spray_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Wall Spray Painting Executable\n");
    info!("Session directory: {:?}", session.session_root);
    info!("Mission command: {:?}\n", cmd);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mission_mgr = MissionMgr::init(&cmd).wrap_err("Failed to initialise the MissionMgr")?;
    info!("MissionMgr init complete");

    let mut clock = WallClock::new();
    let mut vehicle = open_vehicle_link(clock).wrap_err("Failed to open the vehicle link")?;
    info!("Vehicle link opened");

    info!("Module initialisation complete\n");

    // ---- MISSION ----

    let report = match mission_mgr.run(vehicle.as_mut(), &mut clock) {
        Ok(r) => r,
        Err(e) => {
            error!("Mission failed before takeoff: {}", e);
            session.exit();
            return Err(e).wrap_err("The mission could not be started");
        }
    };

    info!("Mission {} in {:.1} s", report.outcome, report.elapsed_s);
    if !report.timed_out_legs.is_empty() {
        warn!(
            "Legs to waypoints {:?} timed out",
            report.timed_out_legs.iter().map(|i| i + 1).collect::<Vec<_>>()
        );
    }

    // ---- SHUTDOWN ----

    session.save("plan.json", report.waypoints.clone());
    session.save("report.json", report.clone());

    info!("End of execution");
    session.exit();

    if !report.is_success() {
        return match report.landing_error {
            Some(ref e) if !report.is_aborted() => Err(eyre!(
                "Mission {} but the landing failed: {}",
                report.outcome,
                e
            )),
            _ => Err(eyre!("Mission aborted: {}", report.outcome)),
        };
    }

    Ok(())
}

/// Open the link to the vehicle.
#[cfg(feature = "sim")]
fn open_vehicle_link(clock: WallClock) -> Result<Box<dyn VehicleLink>, Report> {
    use spray_lib::sim_vehicle::{SimFaults, SimVehicle, SimVehicleParams};

    let params: SimVehicleParams =
        util::params::load("sim_vehicle.toml").wrap_err("Could not load sim vehicle params")?;

    info!("Using the simulated vehicle at {}", params.address);

    Ok(Box::new(SimVehicle::new(params, SimFaults::default(), clock)))
}

/// Open the link to the vehicle.
#[cfg(not(feature = "sim"))]
fn open_vehicle_link(_clock: WallClock) -> Result<Box<dyn VehicleLink>, Report> {
    Err(eyre!(
        "No vehicle link available, build with the `sim` feature to fly the simulated vehicle"
    ))
}
