use crate::{
    convert::{pose_to_transform, to_na_vec3, to_point},
    grid::VenueGrid,
    input::InputAction,
};
use bevy::{
    input::touch::Touches,
    prelude::*,
    window::{CursorLeft, CursorMoved, PrimaryWindow},
};
use leafwing_input_manager::prelude::*;
use venue_shared::{CameraPose, CameraRig, TransitionTick, Vec2 as NaVec2};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, add_camera);
    app.add_systems(Update, (free_look, advance_rig, apply_pose).chain());
}

/// Owner of the active camera pose. The camera entity's transform only mirrors it.
#[derive(Resource, Deref, DerefMut)]
pub struct ViewRig(pub CameraRig);

#[derive(Component)]
pub struct VenueCamera;

fn add_camera(mut commands: Commands, venue_grid: Option<Res<VenueGrid>>) {
    let metrics = venue_grid.as_ref().map(|v| v.metrics).unwrap_or_default();
    let position = venue_grid
        .as_ref()
        .and_then(|v| v.start_cell())
        .map(|cell| metrics.world_position(&cell))
        .unwrap_or_else(|| to_point(Vec3::new(0.0, metrics.floor_clearance, 0.0)));
    let pose = CameraPose::looking_at(position, position + to_na_vec3(Vec3::NEG_Z));
    commands.insert_resource(ViewRig(CameraRig::new(pose)));

    commands.spawn((
        Name::new("Venue Camera"),
        VenueCamera,
        Camera3d::default(),
        bevy::core_pipeline::tonemapping::Tonemapping::AcesFitted,
        pose_to_transform(&pose),
        DistanceFog {
            color: Color::srgba(0.82, 0.84, 0.88, 1.0),
            falloff: FogFalloff::Linear {
                start: 40.0,
                end: 160.0,
            },
            ..default()
        },
    ));
}

fn na(v: Vec2) -> NaVec2 {
    NaVec2::new(v.x, v.y)
}

/// Feeds mouse drags and single-finger touch drags to the rig.
fn free_look(
    actions: Res<ActionState<InputAction>>,
    touches: Res<Touches>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut cursor_moved: MessageReader<CursorMoved>,
    mut cursor_left: MessageReader<CursorLeft>,
    mut rig: ResMut<ViewRig>,
) {
    if actions.just_pressed(&InputAction::Select)
        && let Some(at) = window.cursor_position()
    {
        rig.pointer_down(na(at));
    }
    for moved in cursor_moved.read() {
        rig.pointer_move(na(moved.position));
    }
    if actions.just_released(&InputAction::Select) || cursor_left.read().count() > 0 {
        rig.pointer_up();
    }

    if let Some(touch) = touches.iter_just_pressed().next() {
        rig.pointer_down(na(touch.position()));
    }
    if let Some(touch) = touches.iter().find(|t| t.delta() != Vec2::ZERO) {
        rig.pointer_move(na(touch.position()));
    }
    if touches.any_just_released() || touches.any_just_canceled() {
        rig.pointer_up();
    }
}

fn advance_rig(time: Res<Time>, mut rig: ResMut<ViewRig>) {
    if rig.tick(time.delta_secs()) == TransitionTick::Arrived {
        debug!("Camera arrived at {:?}", rig.pose().position);
    }
}

fn apply_pose(rig: Res<ViewRig>, mut camera: Single<&mut Transform, With<VenueCamera>>) {
    **camera = pose_to_transform(&rig.pose());
}
