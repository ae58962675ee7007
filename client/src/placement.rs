//! Tenant content on the venue's anchor bundles.
//!
//! Tenants are assigned once when the venue becomes ready. Every update the engine
//! recomputes positions from the anchors' live world bounds, so content follows anchors
//! that move; entities only mirror the computed frame.
//!
//! Products with an image are shown as textured frames, the rest as tenant-colored cubes.
//! Signs carry the tenant name and, when the tenant has one, its logo.

use crate::{
    assets::{LoadedVenue, VenueState},
    camera::VenueCamera,
    convert::{point_to_vec3, to_na_vec3, to_point, to_vec3},
    data::VenueData,
    labels::TextLabel,
    settings::VenueSettings,
};
use bevy::{camera::primitives::Aabb as MeshBounds, prelude::*};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use venue_shared::{
    Aabb, AnchorBounds, AnchorKey, CachedScene, HitTargetWorld, ItemKey, LabelSpec, PlacedItem,
    PlacementFrame, ProductQuery, TENANT_SLOTS, VenuePlacementEngine, assign_tenants,
    constants::HIT_VOLUME_OPACITY, scene::parse_anchor_name,
};

/// Gap between a product and the price tag under it.
const TAG_GAP: f32 = 0.08;
const SIGN_FONT_SIZE: f32 = 0.35;
const TAG_FONT_SIZE: f32 = 0.06;
/// Side of the square logo quad above a sign.
const LOGO_SIZE: f32 = 0.6;

const TENANT_COLORS: [Color; 3] = [
    Color::srgb(0.85, 0.35, 0.3),
    Color::srgb(0.3, 0.6, 0.85),
    Color::srgb(0.45, 0.75, 0.35),
];

/// The tenant selection of the current venue load and its spin state.
#[derive(Resource, Deref, DerefMut)]
pub struct TenantAssignment(pub VenuePlacementEngine);

/// Pickable volumes of the latest placement frame.
#[derive(Resource, Deref)]
pub struct HitTargets(pub HitTargetWorld);

/// Spawned scene entities carrying an anchor name.
#[derive(Resource, Default, Deref)]
pub struct AnchorEntities(pub HashMap<AnchorKey, Entity>);

/// Entity mirroring one placed item.
#[derive(Component, Clone, Copy, Debug)]
pub struct PlacementKey(pub ItemKey);

/// Quad that follows a placed item without being one.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
enum Companion {
    /// Under a product, facing the camera.
    PriceTag(ItemKey),
    /// Above a sign, facing the same way.
    Logo(ItemKey),
}

impl Companion {
    fn item(&self) -> ItemKey {
        match *self {
            Companion::PriceTag(key) | Companion::Logo(key) => key,
        }
    }

    /// Translation and rotation next to `item`.
    fn pose(&self, item: &PlacedItem, camera_rotation: Quat) -> (Vec3, Quat) {
        let center = point_to_vec3(&item.position);
        match self {
            Companion::PriceTag(_) => (
                center - Vec3::Y * (item.half_extents.y + TAG_GAP),
                camera_rotation,
            ),
            Companion::Logo(_) => (
                center + Vec3::Y * (SIGN_FONT_SIZE + LOGO_SIZE * 0.5),
                Quat::from_rotation_y(item.spin),
            ),
        }
    }
}

/// Product item drawn as a picture of the product.
#[derive(Component)]
struct ImageFrame;

/// Everything spawned for the current assignment.
#[derive(Component)]
struct PlacedContent;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        OnEnter(VenueState::Ready),
        (index_anchors, assign_and_spawn).chain(),
    );
    app.add_systems(
        Update,
        (advance_spins, track_anchors)
            .chain()
            .run_if(in_state(VenueState::Ready)),
    );
    app.add_systems(OnExit(VenueState::Ready), clear_content);
}

fn index_anchors(
    mut commands: Commands,
    loaded: Res<LoadedVenue>,
    children: Query<&Children>,
    names: Query<&Name>,
) {
    let mut anchors = HashMap::new();
    for entity in children.iter_descendants(loaded.root) {
        if let Ok(name) = names.get(entity)
            && let Some(key) = parse_anchor_name(name.as_str())
        {
            anchors.entry(key).or_insert(entity);
        }
    }
    debug!("Indexed {} anchor entities", anchors.len());
    commands.insert_resource(AnchorEntities(anchors));
}

fn assign_and_spawn(
    mut commands: Commands,
    settings: Res<VenueSettings>,
    data: Res<VenueData>,
    loaded: Res<LoadedVenue>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let slots = assign_tenants(
        data.0.as_ref(),
        TENANT_SLOTS,
        &ProductQuery::default(),
        &mut rng,
    );
    for slot in &slots {
        info!(
            "Slot {}: {} ({} products)",
            slot.slot,
            slot.tenant.name,
            slot.products.as_ref().map_or(0, Vec::len)
        );
    }
    let engine = VenuePlacementEngine::new(slots);

    for missing in engine.compute(loaded.scene.as_ref()).missing {
        warn!("Anchor {missing} is missing from the venue; its content is skipped");
    }

    let unit_cube = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
    let unit_quad = meshes.add(Rectangle::new(1.0, 1.0));
    let hit_volume = materials.add(StandardMaterial {
        base_color: Color::WHITE.with_alpha(HIT_VOLUME_OPACITY),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });
    let tenant_materials: Vec<_> = TENANT_COLORS
        .iter()
        .map(|&color| materials.add(color))
        .collect();
    // One material per image path; tables and shelves show the same products.
    let mut image_materials: HashMap<String, Handle<StandardMaterial>> = HashMap::new();
    let mut image_material = |path: &str| {
        image_materials
            .entry(path.to_string())
            .or_insert_with(|| {
                materials.add(StandardMaterial {
                    base_color_texture: Some(asset_server.load(path.to_string())),
                    cull_mode: None,
                    double_sided: true,
                    ..default()
                })
            })
            .clone()
    };

    for key in engine.item_keys() {
        let hidden = (PlacedContent, PlacementKey(key), Transform::default(), Visibility::Hidden);
        match key {
            ItemKey::Sign { .. } => {
                let Some(text) = engine.label_text(key) else {
                    continue;
                };
                commands.spawn((
                    Name::new(format!("{key:?}")),
                    hidden,
                    TextLabel(LabelSpec::new(text).with_font_size(SIGN_FONT_SIZE)),
                ));
                let logo = engine
                    .tenant(key.slot())
                    .and_then(|t| t.logo_image_url.as_deref());
                if let Some(logo) = logo {
                    commands.spawn((
                        Name::new(format!("{key:?} logo")),
                        PlacedContent,
                        Companion::Logo(key),
                        Transform::from_scale(Vec3::splat(LOGO_SIZE)),
                        Visibility::Hidden,
                        Mesh3d(unit_quad.clone()),
                        MeshMaterial3d(image_material(logo)),
                    ));
                }
            }
            ItemKey::Table { slot, .. } | ItemKey::Shelf { slot, .. } => {
                let image = engine.product(key).and_then(|p| p.image_url.as_deref());
                let mut item = commands.spawn((Name::new(format!("{key:?}")), hidden));
                match image {
                    Some(path) => item.insert((
                        ImageFrame,
                        Mesh3d(unit_quad.clone()),
                        MeshMaterial3d(image_material(path)),
                    )),
                    None => item.insert((
                        Mesh3d(unit_cube.clone()),
                        MeshMaterial3d(tenant_materials[slot % tenant_materials.len()].clone()),
                    )),
                };
                if let Some(text) = engine.label_text(key) {
                    commands.spawn((
                        Name::new(format!("{key:?} tag")),
                        PlacedContent,
                        Companion::PriceTag(key),
                        Transform::default(),
                        Visibility::Hidden,
                        TextLabel(
                            LabelSpec::new(text)
                                .with_font_size(TAG_FONT_SIZE)
                                .with_color([255, 240, 200, 255]),
                        ),
                    ));
                }
            }
            ItemKey::Checkout { .. } => {
                commands.spawn((
                    Name::new(format!("{key:?}")),
                    hidden,
                    Mesh3d(unit_cube.clone()),
                    MeshMaterial3d(hit_volume.clone()),
                ));
            }
        }
    }

    commands.insert_resource(TenantAssignment(engine));
}

fn advance_spins(time: Res<Time>, mut assignment: ResMut<TenantAssignment>) {
    assignment.advance(time.delta_secs());
}

/// Anchor bounds from the spawned meshes, falling back to the parsed scene.
struct LiveAnchors<'a> {
    live: HashMap<AnchorKey, Aabb>,
    scene: &'a CachedScene,
}

impl AnchorBounds for LiveAnchors<'_> {
    fn anchor_bounds(&self, key: AnchorKey) -> Option<Aabb> {
        self.live
            .get(&key)
            .copied()
            .or_else(|| self.scene.anchor_bounds(key))
    }
}

/// World bounds of every mesh under `entity`, including itself.
fn subtree_bounds(
    entity: Entity,
    children: &Query<&Children>,
    bounds: &Query<(&MeshBounds, &GlobalTransform)>,
) -> Option<Aabb> {
    std::iter::once(entity)
        .chain(children.iter_descendants(entity))
        .filter_map(|e| bounds.get(e).ok())
        .filter_map(|(aabb, transform)| {
            let (center, half) = (Vec3::from(aabb.center), Vec3::from(aabb.half_extents));
            let local = Aabb::from_center(to_point(center), to_na_vec3(half));
            Aabb::from_points(
                local
                    .corners()
                    .iter()
                    .map(|c| to_point(transform.transform_point(point_to_vec3(c)))),
            )
        })
        .reduce(|a, b| a.union(&b))
}

fn track_anchors(
    mut commands: Commands,
    assignment: Res<TenantAssignment>,
    loaded: Res<LoadedVenue>,
    anchors: Res<AnchorEntities>,
    children: Query<&Children>,
    bounds: Query<(&MeshBounds, &GlobalTransform)>,
    camera: Single<&Transform, (With<VenueCamera>, Without<PlacementKey>, Without<Companion>)>,
    mut items: Query<(&PlacementKey, &mut Transform, &mut Visibility), Without<Companion>>,
    mut companions: Query<(&Companion, &mut Transform, &mut Visibility), Without<PlacementKey>>,
    hit_targets: Option<Res<HitTargets>>,
    mut hit_layout: Local<Vec<(ItemKey, Vec3, Vec3)>>,
) {
    let live = LiveAnchors {
        live: anchors
            .iter()
            .filter_map(|(key, &entity)| Some((*key, subtree_bounds(entity, &children, &bounds)?)))
            .collect(),
        scene: loaded.scene.as_ref(),
    };
    let frame = assignment.compute(&live);
    let placed: HashMap<ItemKey, &PlacedItem> =
        frame.items.iter().map(|item| (item.key, item)).collect();

    for (PlacementKey(key), mut transform, mut visibility) in &mut items {
        let Some(item) = placed.get(key) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        transform.translation = point_to_vec3(&item.position);
        transform.rotation = Quat::from_rotation_y(item.spin);
        if item.half_extents != venue_shared::Vec3::zeros() {
            transform.scale = to_vec3(&item.half_extents) * 2.0;
        }
        *visibility = Visibility::Inherited;
    }

    for (companion, mut transform, mut visibility) in &mut companions {
        let Some(item) = placed.get(&companion.item()) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        (transform.translation, transform.rotation) = companion.pose(item, camera.rotation);
        *visibility = Visibility::Inherited;
    }

    // Spin does not move hit volumes, so only layout changes rebuild them.
    let layout = hit_layout_of(&frame);
    if hit_targets.is_none() || *hit_layout != layout {
        let world = HitTargetWorld::build(&frame);
        debug!("Rebuilt {} hit volumes", world.len());
        commands.insert_resource(HitTargets(world));
        *hit_layout = layout;
    }
}

fn hit_layout_of(frame: &PlacementFrame) -> Vec<(ItemKey, Vec3, Vec3)> {
    frame
        .items
        .iter()
        .filter(|item| item.target.is_some())
        .map(|item| {
            (
                item.key,
                point_to_vec3(&item.position),
                to_vec3(&item.half_extents),
            )
        })
        .collect()
}

fn clear_content(mut commands: Commands, content: Query<Entity, With<PlacedContent>>) {
    for entity in &content {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<TenantAssignment>();
    commands.remove_resource::<HitTargets>();
    commands.remove_resource::<AnchorEntities>();
}
