//! Vertical coverage pattern

use super::{stripe_offsets, CovPlannerParams, Waypoint, WaypointAction};
use crate::{loc::Pose, wall::WallGeometry};

/// Plan a vertical boustrophedon over the wall.
///
/// Each stripe is three waypoints: climb (or descend) to one extreme at the previous stripe's
/// lateral position, step sideways to this stripe's position at that extreme, then paint to the
/// opposite extreme. The first stripe goes up.
pub(super) fn plan(params: &CovPlannerParams, wall: &WallGeometry, start: &Pose) -> Vec<Waypoint> {
    let start_x = start.north_m();
    let start_y = start.east_m();

    // Up is negative down
    let bottom_z = params.ground_level_down_m - params.spray_clearance_m.min(wall.height_m);
    let top_z = params.ground_level_down_m - wall.height_m;

    let offsets = stripe_offsets(wall.width_m, params.stripe_pitch_m);
    let mut waypoints = Vec::with_capacity(offsets.len() * 3);

    let mut current_y = start_y;
    let mut going_up = true;

    for (i, offset_m) in offsets.iter().enumerate() {
        let stripe = i + 1;
        let target_y = start_y + offset_m;

        let (first_z, last_z, first, across, last) = if going_up {
            (
                top_z,
                bottom_z,
                WaypointAction::MoveUp,
                WaypointAction::MoveHorizontalTop,
                WaypointAction::MoveDown,
            )
        } else {
            (
                bottom_z,
                top_z,
                WaypointAction::MoveDown,
                WaypointAction::MoveHorizontalBottom,
                WaypointAction::MoveUp,
            )
        };

        let wp = |y: f64, z: f64, action: WaypointAction| Waypoint {
            north_m: start_x,
            east_m: y,
            down_m: z,
            yaw_deg: 0.0,
            action,
            stripe,
        };

        waypoints.push(wp(current_y, first_z, first));
        waypoints.push(wp(target_y, first_z, across));
        waypoints.push(wp(target_y, last_z, last));

        current_y = target_y;
        going_up = !going_up;
    }

    waypoints
}
