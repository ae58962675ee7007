//! Debug/performance tooling for native dev builds.
//!
//! This plugin is compiled/used only when the caller gates it behind `dev_native`
//! (`#[cfg(feature = "dev_native")] mod debug_tools;` in `main.rs`).

use crate::{
    assets::{LoadedVenue, VenueState},
    convert::point_to_vec3,
    placement::TenantAssignment,
};
use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin, SystemInformationDiagnosticsPlugin,
};
use bevy::prelude::*;
use bevy::render::diagnostic::RenderDiagnosticsPlugin;
use iyes_perf_ui::prelude::*;
use venue_shared::{AnchorBounds, AnchorRole};

const ANCHOR_COLOR: Color = Color::srgb(0.95, 0.3, 0.85);
const ASSIGNED_ANCHOR_COLOR: Color = Color::srgb(0.2, 0.9, 0.95);

/// Add debug/perf tooling (intended for `dev_native` builds only).
pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        FrameTimeDiagnosticsPlugin::default(),
        EntityCountDiagnosticsPlugin::default(),
        SystemInformationDiagnosticsPlugin::default(),
        RenderDiagnosticsPlugin,
        PerfUiPlugin,
    ));

    app.add_systems(Startup, spawn_perf_ui);
    app.add_systems(
        Update,
        draw_anchor_bounds.run_if(in_state(VenueState::Ready)),
    );
}

fn spawn_perf_ui(mut commands: Commands) {
    commands.spawn(PerfUiAllEntries::default());
}

/// Outlines every anchor of the parsed scene. Anchors of assigned slots stand out.
fn draw_anchor_bounds(
    loaded: Res<LoadedVenue>,
    assignment: Option<Res<TenantAssignment>>,
    mut gizmos: Gizmos,
) {
    let assigned = |slot: usize| {
        assignment
            .as_ref()
            .is_some_and(|a| a.slots().iter().any(|s| s.slot == slot))
    };
    for key in loaded.scene.index.anchor_keys() {
        let Some(bounds) = loaded.scene.anchor_bounds(key) else {
            continue;
        };
        let color = if assigned(key.slot) {
            ASSIGNED_ANCHOR_COLOR
        } else {
            ANCHOR_COLOR
        };
        let size = bounds.size();
        gizmos.cuboid(
            Transform::from_translation(point_to_vec3(&bounds.center()))
                .with_scale(Vec3::new(size.x, size.y, size.z)),
            color,
        );
        if key.role == AnchorRole::Sign {
            gizmos.line(
                point_to_vec3(&bounds.center()),
                point_to_vec3(&bounds.center()) + Vec3::Y,
                color,
            );
        }
    }
}
