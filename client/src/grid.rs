//! Walkable grid: floor-plan loading, the selected cell and the debug overlay.

use crate::{input::InputAction, settings::VenueSettings};
use bevy::prelude::*;
use leafwing_input_manager::prelude::*;
use std::{f32::consts::FRAC_PI_2, path::Path};
use thiserror::Error;
use venue_shared::{FloorTemplate, GridCell, GridError, GridMetrics, SpatialGrid};

/// Side length of the built-in single-floor plan.
const BUILTIN_PLAN_SIZE: usize = 10;

const CELL_COLOR: Color = Color::srgba(0.3, 0.8, 0.5, 0.6);
const CURRENT_CELL_COLOR: Color = Color::srgb(1.0, 0.85, 0.2);

#[derive(Resource)]
pub struct VenueGrid {
    pub grid: SpatialGrid,
    pub metrics: GridMetrics,
}

impl VenueGrid {
    /// Walkable cell nearest to the grid origin on the lowest floor.
    pub fn start_cell(&self) -> Option<GridCell> {
        self.grid
            .walkable_cells()
            .min_by_key(|c| (c.floor, c.x * c.x + c.y * c.y))
            .copied()
    }
}

/// The cell the camera last travelled to.
#[derive(Resource, Default, Debug)]
pub struct CurrentCell(pub Option<GridCell>);

#[derive(Resource, Default)]
struct GridOverlay {
    visible: bool,
}

#[derive(Debug, Error)]
pub enum FloorPlanError {
    #[error("cannot read floor plan: {0}")]
    Io(#[from] std::io::Error),
    #[error("floor plan is not a list of marker grids: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Grid(#[from] GridError),
}

pub(super) fn plugin(app: &mut App) {
    let settings = app.world().resource::<VenueSettings>().clone();
    match build_grid(settings.floor_plan.as_deref()) {
        Ok(grid) => {
            let (floors, rows, columns) = grid.dimensions();
            info!(
                "Grid: {floors} floor(s), {rows}x{columns}, {} walkable",
                grid.walkable_count()
            );
            let venue_grid = VenueGrid {
                grid,
                metrics: GridMetrics::default(),
            };
            app.insert_resource(CurrentCell(venue_grid.start_cell()));
            app.insert_resource(venue_grid);
        }
        Err(e) => {
            error!("No walkable grid: {e}. Floor clicks are ignored.");
            app.init_resource::<CurrentCell>();
        }
    }
    app.init_resource::<GridOverlay>();

    app.add_systems(Update, (toggle_overlay, draw_overlay).chain());
}

fn load_floor_plan(path: &Path) -> Result<SpatialGrid, FloorPlanError> {
    let raw = std::fs::read_to_string(path)?;
    let templates = parse_floor_plan(&raw)?;
    Ok(SpatialGrid::build(&templates)?)
}

fn parse_floor_plan(raw: &str) -> Result<Vec<FloorTemplate>, FloorPlanError> {
    Ok(serde_json::from_str(raw)?)
}

/// The configured floor plan, or the built-in one when there is none or it is unusable.
fn build_grid(floor_plan: Option<&Path>) -> Result<SpatialGrid, FloorPlanError> {
    if let Some(path) = floor_plan {
        match load_floor_plan(path) {
            Ok(grid) => return Ok(grid),
            Err(e) => error!("Floor plan {}: {e}. Using the built-in plan.", path.display()),
        }
    }
    Ok(builtin_grid()?)
}

fn builtin_grid() -> Result<SpatialGrid, GridError> {
    let floor: FloorTemplate = vec![vec![1; BUILTIN_PLAN_SIZE]; BUILTIN_PLAN_SIZE];
    SpatialGrid::build(&[floor])
}

fn toggle_overlay(actions: Res<ActionState<InputAction>>, mut overlay: ResMut<GridOverlay>) {
    if actions.just_pressed(&InputAction::ToggleGrid) {
        overlay.visible = !overlay.visible;
        debug!("Grid overlay: {}", overlay.visible);
    }
}

fn draw_overlay(
    overlay: Res<GridOverlay>,
    venue_grid: Option<Res<VenueGrid>>,
    current: Res<CurrentCell>,
    mut gizmos: Gizmos,
) {
    let Some(venue_grid) = venue_grid.filter(|_| overlay.visible) else {
        return;
    };
    let metrics = &venue_grid.metrics;
    let size = Vec2::splat(metrics.cell_size * 0.9);
    for cell in venue_grid.grid.walkable_cells() {
        let position = metrics.world_position(cell);
        // Slightly above the surface to avoid z-fighting with the floor mesh.
        let center = Vec3::new(
            position.x,
            metrics.floor_surface_y(cell.floor) + 0.02,
            position.z,
        );
        let color = if current.0.as_ref() == Some(cell) {
            CURRENT_CELL_COLOR
        } else {
            CELL_COLOR
        };
        gizmos.rect(
            Isometry3d::new(center, Quat::from_rotation_x(-FRAC_PI_2)),
            size,
            color,
        );
    }
}
