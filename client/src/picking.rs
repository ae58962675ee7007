//! Click handling: hit volumes first, then the walkable floor.

use crate::{
    camera::{VenueCamera, ViewRig},
    convert::{to_na_vec3, to_point},
    data::Navigate,
    grid::{CurrentCell, VenueGrid},
    input::PointerClicked,
    placement::HitTargets,
};
use bevy::prelude::*;
use venue_shared::{DEFAULT_TRANSITION_SECS, NavigationIntent};

/// Hit volumes further than this from the camera are ignored.
const MAX_PICK_DISTANCE: f32 = 250.0;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Update, handle_clicks);
}

fn handle_clicks(
    mut clicks: MessageReader<PointerClicked>,
    camera: Single<(&Camera, &GlobalTransform), With<VenueCamera>>,
    hit_targets: Option<Res<HitTargets>>,
    venue_grid: Option<Res<VenueGrid>>,
    mut current: ResMut<CurrentCell>,
    mut rig: ResMut<ViewRig>,
    mut navigate: MessageWriter<Navigate>,
) {
    let (camera, camera_transform) = *camera;
    for click in clicks.read() {
        let Ok(ray) = camera.viewport_to_world(camera_transform, click.position) else {
            continue;
        };

        if let Some(targets) = hit_targets.as_deref()
            && let Some((target, distance)) =
                targets.pick(to_point(ray.origin), to_na_vec3(*ray.direction), MAX_PICK_DISTANCE)
        {
            debug!("Picked {target:?} at {distance:.2}");
            navigate.write(Navigate(NavigationIntent::from(target)));
            continue;
        }

        let Some(venue_grid) = venue_grid.as_deref() else {
            continue;
        };
        let metrics = &venue_grid.metrics;
        let floor = current.0.map_or(0, |cell| cell.floor);
        let Some(point) = floor_intersection(ray, metrics.floor_surface_y(floor)) else {
            continue;
        };
        match venue_grid.grid.cell_at_world(metrics, &to_point(point), floor) {
            Some(cell) if cell.is_allowed => {
                info!("Moving to cell ({}, {}) on floor {}", cell.x, cell.y, cell.floor);
                current.0 = Some(*cell);
                rig.travel_to(metrics.world_position(cell), DEFAULT_TRANSITION_SECS);
            }
            Some(cell) => debug!("Cell ({}, {}) is not walkable", cell.x, cell.y),
            None => debug!("Click outside the grid at {point}"),
        }
    }
}

/// Where `ray` meets the horizontal plane at `height`, if in front of the camera.
fn floor_intersection(ray: Ray3d, height: f32) -> Option<Vec3> {
    if ray.direction.y.abs() < 1.0e-3 {
        return None;
    }
    let t = (height - ray.origin.y) / ray.direction.y;
    (t > 0.0).then(|| ray.origin + *ray.direction * t)
}
