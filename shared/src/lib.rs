pub mod asset_cache;
pub mod camera;
pub mod constants;
pub mod grid;
pub mod label;
pub mod placement;
pub mod scene;
pub mod types;
pub mod venue_data;

pub use asset_cache::{AssetCache, AssetId, CachedScene, FetchError, LoadError, SceneFetcher};
pub use camera::{
    CameraMode, CameraPose, CameraRig, CameraTransitionController, FreeLookController,
    TransitionTick,
};
pub use constants::{
    CELL_SIZE, DEFAULT_TRANSITION_SECS, FLOOR_CLEARANCE, FLOOR_HEIGHT, PRODUCT_QUERY_LIMIT,
    TENANT_SLOTS,
};
pub use grid::{FloorTemplate, GridCell, GridError, GridMetrics, SpatialGrid};
pub use label::{LabelBitmap, LabelKey, LabelSpec, rasterize_label};
pub use placement::{
    AnchorBounds, HitTarget, HitTargetWorld, ItemKey, PlacedItem, PlacementFrame, TenantSlot,
    VenuePlacementEngine, assign_tenants,
};
pub use scene::{AnchorKey, AnchorRole, SceneError, SceneGraph, SceneIndex, parse_scene_bytes};
pub use types::{Aabb, Mat4, Point3, Quat, Vec2, Vec3};
pub use venue_data::{
    Money, NavigationIntent, NavigationSink, Product, ProductQuery, Tenant, VenueDataSource,
};
