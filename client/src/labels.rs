//! Text quads backed by rasterized label textures, memoized per label.

use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
};
use std::collections::HashMap;
use venue_shared::{LabelBitmap, LabelKey, LabelSpec, rasterize_label};

/// Requests a label quad on this entity. The mesh and material are attached on the next update.
#[derive(Component, Clone, Debug)]
pub struct TextLabel(pub LabelSpec);

#[derive(Clone)]
struct LabelHandles {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

#[derive(Resource, Default)]
struct LabelCache {
    entries: HashMap<LabelKey, LabelHandles>,
}

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<LabelCache>();
    app.add_systems(PostUpdate, realize_labels);
}

fn realize_labels(
    mut commands: Commands,
    pending: Query<(Entity, &TextLabel), Changed<TextLabel>>,
    mut cache: ResMut<LabelCache>,
    mut images: ResMut<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, TextLabel(spec)) in &pending {
        let handles = cache
            .entries
            .entry(spec.key())
            .or_insert_with(|| {
                let bitmap = rasterize_label(spec);
                debug!(
                    "Rasterized label {:?} ({}x{})",
                    spec.text, bitmap.width, bitmap.height
                );
                let mesh = meshes.add(Rectangle::new(bitmap.quad_width, bitmap.quad_height));
                let material = materials.add(StandardMaterial {
                    base_color_texture: Some(images.add(label_image(bitmap))),
                    unlit: true,
                    // Blended geometry is drawn without depth writes.
                    alpha_mode: AlphaMode::Blend,
                    cull_mode: None,
                    double_sided: true,
                    ..default()
                });
                LabelHandles { mesh, material }
            })
            .clone();

        commands
            .entity(entity)
            .insert((Mesh3d(handles.mesh), MeshMaterial3d(handles.material)));
    }
}

fn label_image(bitmap: LabelBitmap) -> Image {
    Image::new(
        Extent3d {
            width: bitmap.width,
            height: bitmap.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        bitmap.pixels,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_labels_share_assets() {
        let mut app = App::new();
        app.init_resource::<Assets<Image>>()
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<LabelCache>()
            .add_systems(Update, realize_labels);

        let spec = LabelSpec::new("Ember Coffee");
        let a = app.world_mut().spawn(TextLabel(spec.clone())).id();
        let b = app.world_mut().spawn(TextLabel(spec)).id();
        let c = app.world_mut().spawn(TextLabel(LabelSpec::new("Dune Outdoor"))).id();
        app.update();

        let world = app.world();
        let material = |e: Entity| world.get::<MeshMaterial3d<StandardMaterial>>(e).unwrap().0.id();
        assert_eq!(material(a), material(b));
        assert_ne!(material(a), material(c));
        assert_eq!(world.resource::<Assets<Image>>().len(), 2);
    }

    #[test]
    fn image_matches_bitmap() {
        let bitmap = rasterize_label(&LabelSpec::new("19.50 EUR"));
        let (width, height) = (bitmap.width, bitmap.height);
        let image = label_image(bitmap);
        assert_eq!(image.width(), width);
        assert_eq!(image.height(), height);
    }
}
