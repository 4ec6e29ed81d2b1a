//! Navigation control parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for navigation control
#[derive(Deserialize, Debug, Clone)]
pub struct NavCtrlParams {
    /// Period of the control tick
    pub tick_period_s: f64,

    /// Limit on each axis of the velocity demand, as a fraction of the leg's speed. Bounds the
    /// overshoot of diagonal moves.
    pub max_component_ratio: f64,

    /// Distance from the target inside which the demand is scaled down
    pub slowdown_radius_m: f64,

    /// Smallest scale applied inside the slowdown radius
    pub min_slowdown_factor: f64,
}

impl Default for NavCtrlParams {
    fn default() -> Self {
        Self {
            tick_period_s: 0.1,
            max_component_ratio: 0.8,
            slowdown_radius_m: 2.0,
            min_slowdown_factor: 0.3,
        }
    }
}
