//! # Navigation control module
//!
//! Navigation control drives the vehicle from wherever it currently is to a single target pose,
//! using closed-loop velocity commands at a fixed tick rate. One call to [`NavCtrl::seek`] is one
//! leg of the mission.
//!
//! Every tick the pose is sampled and the displacement to the target computed. Once the distance
//! is inside the tolerance the leg has converged. Otherwise a velocity demand is issued along the
//! displacement at the requested speed, with each axis limited to a fraction of that speed and a
//! linear slowdown inside a near-field radius so that the vehicle eases onto the target.
//!
//! A leg which has not converged within its maximum duration is abandoned as timed out. This is
//! not an error, the caller decides what to do with it.
//!
//! Whatever the outcome, the leg finishes with a position hold at the target for the requested
//! hold time, so that the vehicle is stable before the next leg starts.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod params;
pub mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

pub use params::NavCtrlParams;
pub use state::*;
