use bevy::{light::CascadeShadowConfigBuilder, prelude::*};

pub(super) fn plugin(app: &mut App) {
    app.insert_resource(ClearColor(Color::srgb(0.82, 0.84, 0.88)));
    app.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 350.0,
        ..default()
    });
    app.add_systems(Startup, setup);
}

fn setup(mut commands: Commands) {
    debug!("World lighting setup");

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: light_consts::lux::OVERCAST_DAY,
            shadows_enabled: true,
            ..default()
        },
        CascadeShadowConfigBuilder {
            maximum_distance: 120.0,
            ..default()
        }
        .build(),
        Transform::from_xyz(12.0, 30.0, 8.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
