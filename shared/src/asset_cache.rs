/*!
Deduplicating loader for packaged venue scenes.

Every identifier is fetched at most once while a load is in flight, and at most once in
total when it succeeds. Concurrent requests share one `futures::future::Shared` future.
Failures are handed to every waiter of that attempt and then forgotten, so the next
request fetches again.

```text
  load(id) ──► Ready(scene)            ─► ready(scene)
           ├─► Loading{gen, shared}    ─► shared.clone()
           └─► absent ─► fetch ─► Loading{gen, shared}
                                    │
                       settle(gen): Ok  ─► Ready(scene)
                                    Err ─► remove entry
```
*/

use crate::scene::{SceneError, SceneGraph, SceneIndex};
use futures::{
    FutureExt,
    future::{self, BoxFuture, Shared},
};
use std::{
    collections::HashMap,
    fmt, io,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};
use thiserror::Error;
use tracing::{debug, warn};

/// Resource locator of a packaged scene.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("malformed scene: {0}")]
    Malformed(String),
}

impl From<SceneError> for FetchError {
    fn from(err: SceneError) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(err.to_string()),
            _ => FetchError::Io(err.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("failed to load {id}: {source}")]
pub struct LoadError {
    pub id: AssetId,
    pub source: FetchError,
}

/// Produces the raw scene for an identifier.
///
/// `fetch` is called with the cache lock held and must only build the future; the work
/// happens when the future is polled.
pub trait SceneFetcher: Send + Sync + 'static {
    fn fetch(&self, id: &AssetId) -> BoxFuture<'static, Result<SceneGraph, FetchError>>;
}

/// A loaded scene with its load-time metadata.
#[derive(Debug)]
pub struct CachedScene {
    pub id: AssetId,
    pub graph: SceneGraph,
    pub index: SceneIndex,
}

impl CachedScene {
    /// Classifies shadows, then builds the name and anchor indices.
    pub fn prepare(id: AssetId, mut graph: SceneGraph) -> Self {
        graph.classify_shadows();
        let index = SceneIndex::build(&graph);
        Self { id, graph, index }
    }

    #[inline]
    pub fn animation_names(&self) -> &[String] {
        self.graph.animations()
    }
}

pub type LoadResult = Result<Arc<CachedScene>, LoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

enum Entry {
    Loading { generation: u64, load: SharedLoad },
    Ready(Arc<CachedScene>),
}

type Entries = Arc<Mutex<HashMap<AssetId, Entry>>>;

pub struct AssetCache<F> {
    fetcher: Arc<F>,
    entries: Entries,
    next_generation: AtomicU64,
    fetches: AtomicUsize,
}

impl<F: SceneFetcher> AssetCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            entries: Arc::default(),
            next_generation: AtomicU64::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns the scene for `id`, sharing any in-flight load of the same identifier.
    pub fn load(&self, id: impl Into<AssetId>) -> BoxFuture<'static, LoadResult> {
        let id = id.into();
        let mut entries = lock(&self.entries);

        match entries.get(&id) {
            Some(Entry::Ready(scene)) => return future::ready(Ok(Arc::clone(scene))).boxed(),
            Some(Entry::Loading { load, .. }) => {
                debug!(%id, "joining in-flight scene load");
                return load.clone().boxed();
            }
            None => {}
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(%id, generation, "fetching scene");

        let fetch = self.fetcher.fetch(&id);
        let settle_into = Arc::clone(&self.entries);
        let key = id.clone();
        let load = async move {
            let result = match fetch.await {
                Ok(graph) => Ok(Arc::new(CachedScene::prepare(key.clone(), graph))),
                Err(source) => Err(LoadError {
                    id: key.clone(),
                    source,
                }),
            };
            settle(&settle_into, &key, generation, &result);
            result
        }
        .boxed()
        .shared();

        entries.insert(
            id,
            Entry::Loading {
                generation,
                load: load.clone(),
            },
        );
        load.boxed()
    }

    /// The completed scene for `id`, if any.
    pub fn get(&self, id: &AssetId) -> Option<Arc<CachedScene>> {
        match lock(&self.entries).get(id)? {
            Entry::Ready(scene) => Some(Arc::clone(scene)),
            Entry::Loading { load, .. } => match load.peek() {
                Some(Ok(scene)) => Some(Arc::clone(scene)),
                _ => None,
            },
        }
    }

    pub fn is_loading(&self, id: &AssetId) -> bool {
        matches!(lock(&self.entries).get(id), Some(Entry::Loading { .. }))
    }

    /// Number of fetches issued since creation.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. In-flight loads still resolve for their waiters but are not stored.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

/// Stores the outcome of load `generation`, unless a newer load replaced the entry.
fn settle(entries: &Entries, id: &AssetId, generation: u64, result: &LoadResult) {
    let mut entries = lock(entries);
    let current = matches!(
        entries.get(id),
        Some(Entry::Loading { generation: g, .. }) if *g == generation
    );
    if !current {
        debug!(%id, generation, "discarding stale scene load");
        return;
    }

    match result {
        Ok(scene) => {
            let anchors = scene.index.anchor_keys().len();
            debug!(%id, nodes = scene.graph.len(), anchors, "scene ready");
            entries.insert(id.clone(), Entry::Ready(Arc::clone(scene)));
        }
        Err(error) => {
            warn!(%error, "scene load failed; next request will fetch again");
            entries.remove(id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AnchorKey, AnchorRole, SceneNode};
    use crate::types::{Aabb, Point3};
    use futures::{channel::oneshot, executor::block_on, future::join};
    use std::collections::VecDeque;

    type Reply = Result<SceneGraph, FetchError>;

    /// Each fetch waits on the next queued channel.
    #[derive(Default)]
    struct GatedFetcher {
        gates: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
    }

    impl GatedFetcher {
        fn gate(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            lock(&self.gates).push_back(rx);
            tx
        }
    }

    impl SceneFetcher for GatedFetcher {
        fn fetch(&self, _id: &AssetId) -> BoxFuture<'static, Reply> {
            let gate = lock(&self.gates).pop_front();
            async move {
                match gate {
                    Some(rx) => rx
                        .await
                        .unwrap_or_else(|_| Err(FetchError::Io("cancelled".into()))),
                    None => Err(FetchError::Io("no gate".into())),
                }
            }
            .boxed()
        }
    }

    fn venue() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let root = graph.add_node(SceneNode::new("Venue"), None);
        graph.add_node(SceneNode::new("Table1").with_mesh(Some(bounds)), Some(root));
        graph.add_node(SceneNode::new("GroundPlane").with_mesh(Some(bounds)), Some(root));
        graph
    }

    #[test]
    fn concurrent_loads_share_one_fetch() {
        let cache = AssetCache::new(GatedFetcher::default());
        let gate = cache.fetcher().gate();
        let id = AssetId::from("venue/mall.glb");

        let first = cache.load(id.clone());
        let second = cache.load(id.clone());
        assert_eq!(cache.fetch_count(), 1);
        assert!(cache.is_loading(&id));
        assert!(cache.get(&id).is_none());

        gate.send(Ok(venue())).unwrap();
        let (a, b) = block_on(join(first, second));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));

        // Completed entries resolve immediately without another fetch.
        let third = block_on(cache.load(id.clone())).unwrap();
        assert!(Arc::ptr_eq(&a, &third));
        assert_eq!(cache.fetch_count(), 1);
        assert!(!cache.is_loading(&id));
        assert!(cache.get(&id).is_some());
    }

    #[test]
    fn prepared_scene_is_classified_and_indexed() {
        let cache = AssetCache::new(GatedFetcher::default());
        cache.fetcher().gate().send(Ok(venue())).unwrap();

        let scene = block_on(cache.load("mall.glb")).unwrap();
        assert_eq!(
            scene.index.anchor(AnchorKey::new(AnchorRole::Table, 0)),
            Some(1)
        );
        let ground = scene.graph.node(2).unwrap();
        assert!(ground.casts_shadows && ground.receives_shadows);
        assert!(scene.animation_names().is_empty());
    }

    #[test]
    fn failure_reaches_every_waiter_and_is_not_cached() {
        let cache = AssetCache::new(GatedFetcher::default());
        let id = AssetId::from("missing.glb");
        let gate = cache.fetcher().gate();

        let first = cache.load(id.clone());
        let second = cache.load(id.clone());
        gate.send(Err(FetchError::NotFound("missing.glb".into())))
            .unwrap();

        let (a, b) = block_on(join(first, second));
        let (a, b) = (a.unwrap_err(), b.unwrap_err());
        assert_eq!(a, b);
        assert_eq!(a.source, FetchError::NotFound("missing.glb".into()));
        assert!(cache.is_empty());

        // The retry issues a fresh fetch.
        cache.fetcher().gate().send(Ok(venue())).unwrap();
        let scene = block_on(cache.load(id.clone())).unwrap();
        assert_eq!(scene.id, id);
        assert_eq!(cache.fetch_count(), 2);
    }

    #[test]
    fn stale_load_does_not_overwrite_newer_entry() {
        let cache = AssetCache::new(GatedFetcher::default());
        let id = AssetId::from("mall.glb");

        let old_gate = cache.fetcher().gate();
        let old = cache.load(id.clone());
        cache.clear();

        let new_gate = cache.fetcher().gate();
        let new = cache.load(id.clone());
        assert_eq!(cache.fetch_count(), 2);

        old_gate
            .send(Err(FetchError::Io("connection reset".into())))
            .unwrap();
        assert!(block_on(old).is_err());
        assert!(cache.is_loading(&id));

        new_gate.send(Ok(venue())).unwrap();
        assert!(block_on(new).is_ok());
        assert!(cache.get(&id).is_some());
    }

    #[test]
    fn io_errors_map_to_fetch_errors() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(FetchError::from(missing), FetchError::NotFound(_)));
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(FetchError::from(denied), FetchError::Io(_)));
    }
}
