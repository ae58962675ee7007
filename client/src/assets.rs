//! Venue scene loading.
//!
//! The scene file is read through Bevy's asset source and parsed once by the shared
//! [`AssetCache`] on the IO task pool. Bevy's glTF loader renders the document's default
//! scene. The venue becomes [`VenueState::Ready`] once the spawned scene carries its
//! shadow flags.

use crate::{input::InputAction, settings::VenueSettings};
use bevy::{
    asset::io::{AssetReaderError, AssetSourceId},
    light::{NotShadowCaster, NotShadowReceiver},
    platform::collections::HashMap,
    prelude::*,
    tasks::{IoTaskPool, Task, block_on, futures_lite::future},
};
use futures::{FutureExt, future::BoxFuture};
use leafwing_input_manager::prelude::*;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use venue_shared::{
    AssetCache, AssetId, CachedScene, FetchError, SceneFetcher, SceneGraph,
    asset_cache::LoadResult, parse_scene_bytes,
};

#[derive(States, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VenueState {
    #[default]
    Loading,
    Ready,
    Failed,
}

/// Reads scene files through the default asset source, so native and web builds share
/// one I/O path.
pub struct GlbFetcher {
    server: AssetServer,
}

impl GlbFetcher {
    pub fn new(server: AssetServer) -> Self {
        Self { server }
    }
}

impl SceneFetcher for GlbFetcher {
    fn fetch(&self, id: &AssetId) -> BoxFuture<'static, Result<SceneGraph, FetchError>> {
        let server = self.server.clone();
        let path = PathBuf::from(id.as_str());
        async move {
            let bytes = read_asset(&server, &path).await?;
            Ok(parse_scene_bytes(&bytes)?)
        }
        .boxed()
    }
}

async fn read_asset(server: &AssetServer, path: &Path) -> Result<Vec<u8>, FetchError> {
    let source = server
        .get_source(AssetSourceId::Default)
        .map_err(|e| FetchError::Io(e.to_string()))?;
    let mut reader = source.reader().read(path).await.map_err(reader_error)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

fn reader_error(err: AssetReaderError) -> FetchError {
    match err {
        AssetReaderError::NotFound(path) => FetchError::NotFound(path.display().to_string()),
        other => FetchError::Io(other.to_string()),
    }
}

/// Scene cache and render handles, owned by the app for its whole lifetime.
///
/// Holding the strong `Handle<Scene>` here keeps Bevy from unloading the venue when its
/// root entity is despawned, so a reload spawns from memory.
#[derive(Resource)]
pub struct VenueAssets {
    cache: AssetCache<GlbFetcher>,
    scenes: HashMap<AssetId, Handle<Scene>>,
}

impl VenueAssets {
    pub fn new(server: AssetServer) -> Self {
        Self {
            cache: AssetCache::new(GlbFetcher::new(server)),
            scenes: HashMap::default(),
        }
    }

    pub fn cache(&self) -> &AssetCache<GlbFetcher> {
        &self.cache
    }

    /// The render handle for `scene`, loading the scene it was parsed from on first use.
    fn scene_handle(&mut self, scene: &CachedScene, server: &AssetServer) -> Handle<Scene> {
        self.scenes
            .entry(scene.id.clone())
            .or_insert_with(|| {
                let label = GltfAssetLabel::Scene(scene.graph.default_scene());
                server.load(label.from_asset(scene.id.as_str().to_owned()))
            })
            .clone()
    }
}

/// The venue currently on screen.
#[derive(Resource)]
pub struct LoadedVenue {
    pub scene: Arc<CachedScene>,
    pub root: Entity,
}

#[derive(Resource)]
struct PendingLoad(Task<LoadResult>);

pub(super) fn plugin(app: &mut App) {
    app.init_state::<VenueState>();
    let server = app.world().resource::<AssetServer>().clone();
    app.insert_resource(VenueAssets::new(server));

    app.add_systems(OnEnter(VenueState::Loading), start_load);
    app.add_systems(
        Update,
        (poll_load, apply_shadow_flags)
            .chain()
            .run_if(in_state(VenueState::Loading)),
    );
    app.add_systems(
        Update,
        reload_venue.run_if(not(in_state(VenueState::Loading))),
    );
}

fn start_load(mut commands: Commands, assets: Res<VenueAssets>, settings: Res<VenueSettings>) {
    info!("Loading venue {}", settings.venue);
    let load = assets.cache().load(settings.venue.as_str());
    commands.insert_resource(PendingLoad(IoTaskPool::get().spawn(load)));
}

fn poll_load(
    mut commands: Commands,
    pending: Option<ResMut<PendingLoad>>,
    mut assets: ResMut<VenueAssets>,
    asset_server: Res<AssetServer>,
    mut next_state: ResMut<NextState<VenueState>>,
) {
    let Some(mut pending) = pending else {
        return;
    };
    let Some(result) = block_on(future::poll_once(&mut pending.0)) else {
        return;
    };
    commands.remove_resource::<PendingLoad>();

    match result {
        Ok(scene) => {
            info!(
                "Venue {} parsed: {} nodes, {} anchors, animations {:?}",
                scene.id,
                scene.graph.len(),
                scene.index.anchor_keys().len(),
                scene.animation_names()
            );
            let handle = assets.scene_handle(&scene, &asset_server);
            let root = commands.spawn((Name::new("Venue"), SceneRoot(handle))).id();
            commands.insert_resource(LoadedVenue { scene, root });
        }
        Err(e) => {
            error!("{e}. Press R to retry.");
            next_state.set(VenueState::Failed);
        }
    }
}

/// Copies the load-time shadow classification onto the spawned meshes.
///
/// Each mesh takes the flags of the nearest named ancestor known to the parsed scene.
fn apply_shadow_flags(
    mut commands: Commands,
    loaded: Option<Res<LoadedVenue>>,
    children: Query<&Children>,
    meshes: Query<Entity, With<Mesh3d>>,
    names: Query<&Name>,
    parents: Query<&ChildOf>,
    mut next_state: ResMut<NextState<VenueState>>,
) {
    let Some(loaded) = loaded else {
        return;
    };
    // The scene spawner has not instantiated the scene yet.
    if children.get(loaded.root).is_err() {
        return;
    }

    let graph = &loaded.scene.graph;
    let index = &loaded.scene.index;
    let mut flagged = 0;
    for entity in children.iter_descendants(loaded.root) {
        if !meshes.contains(entity) {
            continue;
        }
        let ancestors =
            std::iter::successors(Some(entity), |e| parents.get(*e).ok().map(ChildOf::parent));
        let node = ancestors
            .take_while(|e| *e != loaded.root)
            .find_map(|e| names.get(e).ok().and_then(|n| index.node_by_name(n.as_str())))
            .and_then(|id| graph.node(id));
        let Some(node) = node else {
            continue;
        };

        let mut mesh = commands.entity(entity);
        if !node.casts_shadows {
            mesh.insert(NotShadowCaster);
        }
        if !node.receives_shadows {
            mesh.insert(NotShadowReceiver);
            flagged += 1;
        }
    }

    debug!("Venue spawned, {flagged} meshes excluded from shadow receiving");
    next_state.set(VenueState::Ready);
}

fn reload_venue(
    mut commands: Commands,
    actions: Res<ActionState<InputAction>>,
    loaded: Option<Res<LoadedVenue>>,
    mut next_state: ResMut<NextState<VenueState>>,
) {
    if !actions.just_pressed(&InputAction::Reload) {
        return;
    }
    if let Some(loaded) = loaded {
        commands.entity(loaded.root).despawn();
        commands.remove_resource::<LoadedVenue>();
    }
    info!("Reloading venue");
    next_state.set(VenueState::Loading);
}
