//! Coverage planner parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for the coverage planner
#[derive(Deserialize, Debug, Clone)]
pub struct CovPlannerParams {
    /// Spacing between neighbouring stripes, i.e. the width of one spray pass
    pub stripe_pitch_m: f64,

    /// Height above the ground at which coverage starts
    pub spray_clearance_m: f64,

    /// The down coordinate of the ground in the navigation frame
    pub ground_level_down_m: f64,
}

impl Default for CovPlannerParams {
    fn default() -> Self {
        Self {
            stripe_pitch_m: 0.4,
            spray_clearance_m: 0.5,
            ground_level_down_m: 0.0,
        }
    }
}
