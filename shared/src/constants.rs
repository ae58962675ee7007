use std::f32::consts::FRAC_PI_2;

/// Size of one grid cell in world units (meters).
/// All cells are square.
pub const CELL_SIZE: f32 = 4.0;

/// Vertical distance between two venue floors (meters).
pub const FLOOR_HEIGHT: f32 = 6.0;

/// Height above a floor at which the camera hovers when standing on a cell (meters).
pub const FLOOR_CLEARANCE: f32 = 1.7;

/// World-space position of cell `(0, 0)` on floor 0.
///
/// Used by `GridMetrics::world_position`:
/// - `pos.x = GRID_ORIGIN_OFFSET.x + x * CELL_SIZE`
/// - `pos.y = GRID_ORIGIN_OFFSET.y + floor * FLOOR_HEIGHT + FLOOR_CLEARANCE`
/// - `pos.z = GRID_ORIGIN_OFFSET.z + y * CELL_SIZE`
pub const GRID_ORIGIN_OFFSET: [f32; 3] = [-18.0, 0.0, -18.0];

/// Floor-plan marker for a walkable cell. Every other marker is closed.
pub const WALKABLE_MARKER: u8 = 1;

/// Number of tenant display slots (anchor bundles) in the venue scene.
pub const TENANT_SLOTS: usize = 3;

/// Maximum number of products displayed on a tenant table.
pub const TABLE_CAPACITY: usize = 4;

/// Shelf layout: rows x columns, filled row-major.
pub const SHELF_ROWS: usize = 4;
pub const SHELF_COLUMNS: usize = 5;
pub const SHELF_CAPACITY: usize = SHELF_ROWS * SHELF_COLUMNS;

/// Offset of the sign label from the sign anchor's bounding-box center (meters).
pub const SIGN_LABEL_OFFSET: [f32; 3] = [0.0, 0.0, 0.06];

/// Gap between a table's top surface and the bottom of the items resting on it (meters).
pub const TABLE_ITEM_LIFT: f32 = 0.05;

/// Fraction of the per-item spacing used as the item's width.
pub const ITEM_FILL: f32 = 0.6;

/// Angular rate (rad/s) of the first table item; each following item spins faster by
/// `SPIN_RATE_STEP`.
pub const SPIN_BASE_RATE: f32 = 0.6;
pub const SPIN_RATE_STEP: f32 = 0.25;

/// Opacity of interaction hit-volumes. Non-zero so picking backends keep them.
pub const HIT_VOLUME_OPACITY: f32 = 0.001;

/// Label buffer resolution before supersampling (pixels).
pub const LABEL_BASE_WIDTH: u32 = 256;
pub const LABEL_BASE_HEIGHT: u32 = 64;

/// Supersampling multiple applied to the label base resolution.
pub const LABEL_SUPERSAMPLING: u32 = 4;

/// Margin kept between label text and the buffer edge, in base pixels.
pub const LABEL_MARGIN: u32 = 4;

/// Default duration of a camera transition to a selected cell (seconds).
pub const DEFAULT_TRANSITION_SECS: f32 = 1.2;

/// Free-look rotation per pointer pixel (radians).
pub const FREE_LOOK_SENSITIVITY: f32 = 0.004;

/// Free-look pitch is clamped to `[-PITCH_LIMIT, PITCH_LIMIT]`.
pub const PITCH_LIMIT: f32 = FRAC_PI_2;

/// Number of products requested per tenant from the data layer.
pub const PRODUCT_QUERY_LIMIT: usize = 24;
