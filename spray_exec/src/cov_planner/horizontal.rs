//! Horizontal coverage pattern

use super::{stripe_offsets, CovPlannerParams, Waypoint, WaypointAction};
use crate::{loc::Pose, wall::WallGeometry};

/// Plan a horizontal boustrophedon over the wall.
///
/// Each stripe is two waypoints: rise to the stripe's height at the current edge of the wall,
/// then paint across to the opposite edge. The first stripe is at the bottom and goes right.
pub(super) fn plan(params: &CovPlannerParams, wall: &WallGeometry, start: &Pose) -> Vec<Waypoint> {
    let start_x = start.north_m();
    let left_y = start.east_m();
    let right_y = start.east_m() + wall.width_m;

    let bottom_z = params.ground_level_down_m - params.spray_clearance_m;

    let offsets = stripe_offsets(wall.height_m, params.stripe_pitch_m);
    let mut waypoints = Vec::with_capacity(offsets.len() * 2);

    let mut going_right = true;

    for (i, offset_m) in offsets.iter().enumerate() {
        let stripe = i + 1;
        let target_z = bottom_z - offset_m;

        let ((first_y, first), (last_y, last)) = if going_right {
            (
                (left_y, WaypointAction::MoveUpLeft),
                (right_y, WaypointAction::MoveRight),
            )
        } else {
            (
                (right_y, WaypointAction::MoveUpRight),
                (left_y, WaypointAction::MoveLeft),
            )
        };

        for (y, action) in [(first_y, first), (last_y, last)].iter() {
            waypoints.push(Waypoint {
                north_m: start_x,
                east_m: *y,
                down_m: target_z,
                yaw_deg: 0.0,
                action: *action,
                stripe,
            });
        }

        going_right = !going_right;
    }

    waypoints
}
