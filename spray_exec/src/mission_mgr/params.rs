//! # MissionMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::mission::PatternType;
use serde::{Deserialize, Serialize};

use crate::cov_planner::SpeedClass;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MissionMgrParams {
    /// Speeds used when flying the vertical pattern
    pub vertical_profile: SpeedProfile,

    /// Speeds used when flying the horizontal pattern
    pub horizontal_profile: SpeedProfile,

    /// Time after which a single leg is abandoned
    pub max_seek_duration_s: f64,

    /// Time to wait for the vehicle to report a valid position before giving up
    pub readiness_timeout_s: f64,

    /// Height of the takeoff pose above the launch pose
    pub climb_altitude_m: f64,

    /// Number of setpoints the climb is ramped over
    pub climb_steps: usize,

    pub climb_step_period_s: f64,

    /// Hold setpoints streamed after starting offboard and before arming
    pub offboard_warmup_setpoints: usize,

    /// Time to hold at the takeoff pose before landing
    pub return_hold_s: f64,

    /// Time to wait after the land command before reading back the vehicle status
    pub land_settle_s: f64,
}

/// Speeds and dwell for one mission, selected by the pattern.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedProfile {
    /// Speed of up and down moves
    pub vertical_speed_ms: f64,

    /// Speed of sideways moves
    pub horizontal_speed_ms: f64,

    /// Speed of moves outside the pattern (transit to start, return to takeoff)
    pub positioning_speed_ms: f64,

    /// Hold time at each waypoint
    pub hover_time_s: f64,

    /// Distance inside which a waypoint is reached
    pub waypoint_tolerance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MissionMgrParams {
    fn default() -> Self {
        Self {
            vertical_profile: SpeedProfile {
                vertical_speed_ms: 1.2,
                horizontal_speed_ms: 0.8,
                positioning_speed_ms: 1.5,
                hover_time_s: 1.5,
                waypoint_tolerance_m: 0.3,
            },
            horizontal_profile: SpeedProfile {
                vertical_speed_ms: 0.8,
                horizontal_speed_ms: 1.2,
                positioning_speed_ms: 1.5,
                hover_time_s: 1.5,
                waypoint_tolerance_m: 0.3,
            },
            max_seek_duration_s: 30.0,
            readiness_timeout_s: 30.0,
            climb_altitude_m: 2.0,
            climb_steps: 20,
            climb_step_period_s: 0.2,
            offboard_warmup_setpoints: 10,
            return_hold_s: 3.0,
            land_settle_s: 8.0,
        }
    }
}

impl MissionMgrParams {
    pub fn profile(&self, pattern: PatternType) -> &SpeedProfile {
        match pattern {
            PatternType::Vertical => &self.vertical_profile,
            PatternType::Horizontal => &self.horizontal_profile,
        }
    }

    /// Check the timing parameters, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        // Every wait in the mission is bounded by one of these, so none may be infinite
        if !(self.max_seek_duration_s.is_finite() && self.max_seek_duration_s > 0.0) {
            return Err(format!(
                "max seek duration must be finite and positive, found {}",
                self.max_seek_duration_s
            ));
        }

        let durations = [
            ("readiness timeout", self.readiness_timeout_s),
            ("return hold", self.return_hold_s),
            ("land settle time", self.land_settle_s),
        ];
        for (name, value) in durations.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(format!(
                    "{} must be finite and not negative, found {}",
                    name, value
                ));
            }
        }

        if self.climb_steps == 0
            || !(self.climb_step_period_s.is_finite() && self.climb_step_period_s > 0.0)
        {
            return Err(String::from("the climb needs at least one step of positive length"));
        }
        if !self.climb_altitude_m.is_finite() {
            return Err(format!(
                "climb altitude must be finite, found {}",
                self.climb_altitude_m
            ));
        }

        Ok(())
    }
}

impl SpeedProfile {
    /// The speed used for the given class of motion.
    pub fn speed_for(&self, class: SpeedClass) -> f64 {
        match class {
            SpeedClass::Vertical => self.vertical_speed_ms,
            SpeedClass::Horizontal => self.horizontal_speed_ms,
            SpeedClass::Positioning => self.positioning_speed_ms,
        }
    }

    /// Check the profile, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let speeds = [
            ("vertical speed", self.vertical_speed_ms),
            ("horizontal speed", self.horizontal_speed_ms),
            ("positioning speed", self.positioning_speed_ms),
            ("waypoint tolerance", self.waypoint_tolerance_m),
        ];

        for (name, value) in speeds.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(format!("{} must be positive, found {}", name, value));
            }
        }

        if !(self.hover_time_s.is_finite() && self.hover_time_s >= 0.0) {
            return Err(format!(
                "hover time cannot be negative, found {}",
                self.hover_time_s
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_profile_selection() {
        let params = MissionMgrParams::default();

        let v = params.profile(PatternType::Vertical);
        assert_eq!(v.speed_for(SpeedClass::Vertical), 1.2);
        assert_eq!(v.speed_for(SpeedClass::Horizontal), 0.8);

        let h = params.profile(PatternType::Horizontal);
        assert_eq!(h.speed_for(SpeedClass::Vertical), 0.8);
        assert_eq!(h.speed_for(SpeedClass::Horizontal), 1.2);
        assert_eq!(h.speed_for(SpeedClass::Positioning), 1.5);
    }

    #[test]
    fn test_profile_validation() {
        let params = MissionMgrParams::default();
        assert!(params.vertical_profile.validate().is_ok());
        assert!(params.validate().is_ok());

        let bad = SpeedProfile {
            waypoint_tolerance_m: 0.0,
            ..params.vertical_profile
        };
        assert!(bad.validate().is_err());

        let bad = SpeedProfile {
            hover_time_s: -1.0,
            ..params.vertical_profile
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unbounded_durations_rejected() {
        let params = MissionMgrParams {
            max_seek_duration_s: std::f64::INFINITY,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = MissionMgrParams {
            readiness_timeout_s: std::f64::INFINITY,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = MissionMgrParams {
            land_settle_s: std::f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = MissionMgrParams {
            climb_step_period_s: std::f64::INFINITY,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = MissionMgrParams {
            readiness_timeout_s: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_from_toml() {
        let params: MissionMgrParams = util::params::from_str(
            r#"
            max_seek_duration_s = 30.0
            readiness_timeout_s = 30.0
            climb_altitude_m = 2.0
            climb_steps = 20
            climb_step_period_s = 0.2
            offboard_warmup_setpoints = 10
            return_hold_s = 3.0
            land_settle_s = 8.0

            [vertical_profile]
            vertical_speed_ms = 1.2
            horizontal_speed_ms = 0.8
            positioning_speed_ms = 1.5
            hover_time_s = 1.5
            waypoint_tolerance_m = 0.3

            [horizontal_profile]
            vertical_speed_ms = 0.8
            horizontal_speed_ms = 1.2
            positioning_speed_ms = 1.5
            hover_time_s = 1.5
            waypoint_tolerance_m = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(params.horizontal_profile, MissionMgrParams::default().horizontal_profile);
        assert_eq!(params.climb_steps, 20);
    }
}
