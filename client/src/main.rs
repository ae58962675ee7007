// Support configuring Bevy lints within code.
#![cfg_attr(bevy_lint, feature(register_tool), register_tool(bevy))]
// Disable console on Windows for non-dev builds.
#![cfg_attr(not(feature = "dev"), windows_subsystem = "windows")]

#[cfg(feature = "dev_native")]
mod debug_tools;

mod assets;
mod camera;
mod convert;
mod data;
mod grid;
mod input;
mod labels;
mod picking;
mod placement;
mod settings;
mod world;

use bevy::prelude::*;

fn main() -> AppExit {
    App::new().add_plugins(AppPlugin).run()
}

pub struct AppPlugin;
impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Window {
                title: "Venue".to_string(),
                fit_canvas_to_parent: true,
                ..default()
            }
            .into(),
            ..default()
        }));

        // Settings first: the grid and asset plugins read them while building.
        app.add_plugins((settings::plugin, input::plugin, data::plugin, grid::plugin));
        app.add_plugins((
            assets::plugin,
            world::plugin,
            camera::plugin,
            labels::plugin,
            placement::plugin,
            picking::plugin,
        ));

        #[cfg(feature = "dev_native")]
        app.add_plugins(debug_tools::plugin);
    }
}
