//! # Spray library.
//!
//! This library allows other crates in the workspace (and the benches) to access items defined
//! inside the spray crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Localisation - the pose type shared by the planner and controllers
pub mod loc;

/// Wall geometry and the wall configuration file
pub mod wall;

/// Coverage planner - turns the wall geometry into an ordered waypoint sequence
pub mod cov_planner;

/// Navigation control - drives the vehicle to one waypoint with velocity feedback
pub mod nav_ctrl;

/// Mission manager - sequences the mission phases and handles abort
pub mod mission_mgr;

/// Simulated vehicle - kinematic stand-in for the vehicle link
pub mod sim_vehicle;
