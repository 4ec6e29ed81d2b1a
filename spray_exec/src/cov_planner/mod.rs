//! # Coverage planner module
//!
//! The coverage planner turns the geometry of a wall into the ordered list of waypoints that the
//! vehicle flies to paint it. Two boustrophedon (zig-zag) patterns are supported:
//!
//! - Vertical - each stripe paints the full height of the wall, stepping sideways by one stripe
//!   pitch between stripes. Every stripe reverses the vertical direction of the last.
//! - Horizontal - each stripe paints the full width of the wall, stepping up by one stripe pitch
//!   between stripes. Every stripe reverses the lateral direction of the last.
//!
//! The wall lies along the east axis of the navigation frame, starting at the east coordinate of
//! the start pose. The north coordinate is held at the start pose's for the whole pattern.
//!
//! Stripe offsets run `0, p, 2p, ...` and are clamped to the wall extent, so the last stripe lies
//! exactly on the far edge of the wall. Planning stops as soon as a stripe reaches the edge.
//!
//! Planning is a pure function of the geometry, pattern, start pose and parameters.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod horizontal;
pub mod params;
mod vertical;
pub mod waypoint;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::mission::PatternType;
use log::{debug, info, warn};
use util::{maths::ceil_steps, params as param_file};

use crate::{loc::Pose, wall::WallGeometry};
pub use params::CovPlannerParams;
pub use waypoint::{SpeedClass, Waypoint, WaypointAction};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Offsets closer than this to the wall extent are considered to have reached it.
const EXTENT_TOLERANCE_M: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Coverage planner.
#[derive(Debug, Clone, Default)]
pub struct CovPlanner {
    params: CovPlannerParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CovPlannerError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(param_file::LoadError),

    #[error("The stripe pitch must be positive, found {0}")]
    InvalidStripePitch(f64),

    #[error("The spray clearance cannot be negative, found {0}")]
    InvalidClearance(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl CovPlanner {
    /// Initialise the planner from the given parameter file.
    pub fn init(params_file: &str) -> Result<Self, CovPlannerError> {
        let params = param_file::load(params_file).map_err(CovPlannerError::ParamLoadError)?;

        Self::new(params)
    }

    pub fn new(params: CovPlannerParams) -> Result<Self, CovPlannerError> {
        if !(params.stripe_pitch_m.is_finite() && params.stripe_pitch_m > 0.0) {
            return Err(CovPlannerError::InvalidStripePitch(params.stripe_pitch_m));
        }
        if !(params.spray_clearance_m.is_finite() && params.spray_clearance_m >= 0.0) {
            return Err(CovPlannerError::InvalidClearance(params.spray_clearance_m));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &CovPlannerParams {
        &self.params
    }

    /// Plan the waypoints covering the wall with the given pattern, starting from `start`.
    ///
    /// An empty sequence is returned if the wall has a non-positive width or height.
    pub fn plan(
        &self,
        wall: &WallGeometry,
        pattern: PatternType,
        start: &Pose,
    ) -> Vec<Waypoint> {
        if !(is_positive(wall.width_m) && is_positive(wall.height_m)) {
            warn!(
                "Cannot plan over a {} m x {} m wall, no waypoints produced",
                wall.width_m, wall.height_m
            );
            return Vec::new();
        }

        info!(
            "Planning {} pattern over a {:.2} m x {:.2} m wall from {}",
            pattern, wall.width_m, wall.height_m, start
        );

        let waypoints = match pattern {
            PatternType::Vertical => vertical::plan(&self.params, wall, start),
            PatternType::Horizontal => horizontal::plan(&self.params, wall, start),
        };

        info!(
            "Planned {} waypoints over {} stripes",
            waypoints.len(),
            waypoints.last().map(|w| w.stripe).unwrap_or(0)
        );

        for (i, w) in waypoints.iter().enumerate() {
            debug!(
                "    {:3}: stripe {:2} {:<22} ({:.2}, {:.2}, {:.2})",
                i, w.stripe, w.action, w.north_m, w.east_m, w.down_m
            );
        }

        waypoints
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Offsets of each stripe from the start of the wall, `0, p, 2p, ...` with the last clamped to
/// `extent`.
fn stripe_offsets(extent_m: f64, pitch_m: f64) -> Vec<f64> {
    let max_stripes = ceil_steps(extent_m, pitch_m) + 1;
    let mut offsets = Vec::with_capacity(max_stripes);

    for i in 0..max_stripes {
        let offset_m = (i as f64 * pitch_m).min(extent_m);
        offsets.push(offset_m);

        if extent_m - offset_m < EXTENT_TOLERANCE_M {
            break;
        }
    }

    offsets
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
