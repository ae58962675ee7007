//! Multi-floor venue grid.
//!
//! The grid is built once from a floor-plan template and never mutated afterwards.
//! The camera's "current location" lives outside the grid.
//!
//! # Model
//! - A template is one 2D marker array per floor, indexed `[row][column]`.
//! - `x` is the column, `y` is the row, `floor` is the template index.
//! - A cell is walkable when its marker equals [`WALKABLE_MARKER`].
//!
//! # World mapping
//! ```text
//! world_position(cell) = origin_offset
//!     + (x * cell_size, floor * floor_height + floor_clearance, y * cell_size)
//! ```
//!
//! Queries outside the declared bounds answer "not walkable" instead of panicking, since
//! pointer clicks can land anywhere.

use thiserror::Error;

use crate::{
    constants::{CELL_SIZE, FLOOR_CLEARANCE, FLOOR_HEIGHT, GRID_ORIGIN_OFFSET, WALKABLE_MARKER},
    types::{Point3, Vec3},
};

/// One floor of a floor-plan template, `[row][column] -> marker`.
pub type FloorTemplate = Vec<Vec<u8>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
    pub floor: i32,
    pub is_allowed: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("floor plan declares no floors")]
    NoFloors,
    #[error("floor {floor} has no cells")]
    EmptyFloor { floor: usize },
    #[error("floor {floor} has {rows} rows, expected {expected}")]
    RowCountMismatch {
        floor: usize,
        rows: usize,
        expected: usize,
    },
    #[error("floor {floor} row {row} has {columns} columns, expected {expected}")]
    ColumnCountMismatch {
        floor: usize,
        row: usize,
        columns: usize,
        expected: usize,
    },
}

/// Constants of the cell -> world mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMetrics {
    pub cell_size: f32,
    pub floor_height: f32,
    pub floor_clearance: f32,
    pub origin_offset: Vec3,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE,
            floor_height: FLOOR_HEIGHT,
            floor_clearance: FLOOR_CLEARANCE,
            origin_offset: Vec3::from(GRID_ORIGIN_OFFSET),
        }
    }
}

impl GridMetrics {
    /// World-space position of a cell. Pure in the metric constants.
    #[inline]
    pub fn world_position(&self, cell: &GridCell) -> Point3 {
        let local = Vec3::new(
            cell.x as f32 * self.cell_size,
            cell.floor as f32 * self.floor_height + self.floor_clearance,
            cell.y as f32 * self.cell_size,
        );
        Point3::from(self.origin_offset + local)
    }

    /// Grid coordinates `(x, y)` of the cell center nearest to `position`.
    #[inline]
    pub fn nearest_coords(&self, position: &Point3) -> (i32, i32) {
        let local = position.coords - self.origin_offset;
        (
            (local.x / self.cell_size).round() as i32,
            (local.z / self.cell_size).round() as i32,
        )
    }

    /// Height of a floor's walking surface (without clearance).
    #[inline]
    pub fn floor_surface_y(&self, floor: i32) -> f32 {
        self.origin_offset.y + floor as f32 * self.floor_height
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpatialGrid {
    floors: usize,
    rows: usize,
    columns: usize,
    /// Floor-major, then row-major.
    cells: Vec<GridCell>,
}

impl SpatialGrid {
    /// Builds the grid from one template per floor.
    ///
    /// Every floor must have the same row count, and every row the same column count;
    /// otherwise construction fails before any cell is produced.
    pub fn build(templates: &[FloorTemplate]) -> Result<Self, GridError> {
        let first = templates.first().ok_or(GridError::NoFloors)?;
        let rows = first.len();
        let columns = first.first().map_or(0, Vec::len);
        if rows == 0 || columns == 0 {
            return Err(GridError::EmptyFloor { floor: 0 });
        }

        for (floor, template) in templates.iter().enumerate() {
            if template.len() != rows {
                return Err(GridError::RowCountMismatch {
                    floor,
                    rows: template.len(),
                    expected: rows,
                });
            }
            if let Some((row, line)) = template
                .iter()
                .enumerate()
                .find(|(_, line)| line.len() != columns)
            {
                return Err(GridError::ColumnCountMismatch {
                    floor,
                    row,
                    columns: line.len(),
                    expected: columns,
                });
            }
        }

        let mut cells = Vec::with_capacity(templates.len() * rows * columns);
        for (floor, template) in templates.iter().enumerate() {
            for (y, line) in template.iter().enumerate() {
                for (x, &marker) in line.iter().enumerate() {
                    cells.push(GridCell {
                        x: x as i32,
                        y: y as i32,
                        floor: floor as i32,
                        is_allowed: marker == WALKABLE_MARKER,
                    });
                }
            }
        }

        Ok(Self {
            floors: templates.len(),
            rows,
            columns,
            cells,
        })
    }

    /// `(floors, rows, columns)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.floors, self.rows, self.columns)
    }

    fn index(&self, x: i32, y: i32, floor: i32) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|&x| x < self.columns)?;
        let y = usize::try_from(y).ok().filter(|&y| y < self.rows)?;
        let floor = usize::try_from(floor).ok().filter(|&f| f < self.floors)?;
        Some((floor * self.rows + y) * self.columns + x)
    }

    pub fn cell_at(&self, x: i32, y: i32, floor: i32) -> Option<&GridCell> {
        self.index(x, y, floor).map(|i| &self.cells[i])
    }

    /// `false` for closed cells and for any coordinate outside the grid.
    #[inline]
    pub fn is_walkable(&self, x: i32, y: i32, floor: i32) -> bool {
        self.cell_at(x, y, floor).is_some_and(|c| c.is_allowed)
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    pub fn walkable_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter().filter(|c| c.is_allowed)
    }

    pub fn walkable_count(&self) -> usize {
        self.walkable_cells().count()
    }

    /// Walkable 4-connected neighbors on the same floor, in N, E, S, W order.
    pub fn walkable_neighbors(&self, cell: &GridCell) -> Vec<GridCell> {
        const STEPS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        STEPS
            .iter()
            .filter_map(|&(dx, dy)| self.cell_at(cell.x + dx, cell.y + dy, cell.floor))
            .filter(|c| c.is_allowed)
            .copied()
            .collect()
    }

    /// Cell nearest to a world position on `floor`, or `None` when it falls outside the grid.
    pub fn cell_at_world(
        &self,
        metrics: &GridMetrics,
        position: &Point3,
        floor: i32,
    ) -> Option<&GridCell> {
        let (x, y) = metrics.nearest_coords(position);
        self.cell_at(x, y, floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 5x5 floor with an open 3x3 block in the top-left corner, plus a fully closed floor.
    fn scenario_templates() -> Vec<FloorTemplate> {
        let mut open = vec![vec![0u8; 5]; 5];
        for row in open.iter_mut().take(3) {
            for marker in row.iter_mut().take(3) {
                *marker = WALKABLE_MARKER;
            }
        }
        vec![open, vec![vec![0u8; 5]; 5]]
    }

    #[test]
    fn open_block_yields_nine_walkable_cells() {
        let grid = SpatialGrid::build(&scenario_templates()).unwrap();
        assert_eq!(grid.dimensions(), (2, 5, 5));
        assert_eq!(grid.walkable_count(), 9);
    }

    #[test]
    fn world_position_of_cell_one_one() {
        let grid = SpatialGrid::build(&scenario_templates()).unwrap();
        let metrics = GridMetrics::default();
        let cell = grid.cell_at(1, 1, 0).unwrap();

        let expected = Point3::from(
            metrics.origin_offset
                + Vec3::new(metrics.cell_size, metrics.floor_clearance, metrics.cell_size),
        );
        assert!((metrics.world_position(cell) - expected).norm() < 1.0e-6);
    }

    #[test]
    fn is_allowed_matches_template_marker_everywhere() {
        let templates = vec![
            vec![vec![1, 0, 2, 1], vec![0, 1, 1, 0], vec![1, 1, 0, 0]],
            vec![vec![0, 0, 1, 1], vec![1, 9, 1, 0], vec![0, 1, 1, 1]],
        ];
        let grid = SpatialGrid::build(&templates).unwrap();

        for (floor, template) in templates.iter().enumerate() {
            for (y, line) in template.iter().enumerate() {
                for (x, &marker) in line.iter().enumerate() {
                    let cell = grid.cell_at(x as i32, y as i32, floor as i32).unwrap();
                    assert_eq!(cell.is_allowed, marker == WALKABLE_MARKER);
                    assert_eq!((cell.x, cell.y, cell.floor), (x as i32, y as i32, floor as i32));
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_is_never_walkable() {
        let grid = SpatialGrid::build(&[vec![vec![1u8; 3]; 3]]).unwrap();
        let queries = [
            (-1, 0, 0),
            (0, -1, 0),
            (0, 0, -1),
            (3, 0, 0),
            (0, 3, 0),
            (0, 0, 1),
            (i32::MAX, i32::MAX, i32::MAX),
            (i32::MIN, 0, 0),
        ];
        for (x, y, floor) in queries {
            assert!(!grid.is_walkable(x, y, floor));
            assert!(grid.cell_at(x, y, floor).is_none());
        }
    }

    #[test]
    fn mismatched_templates_fail_fast() {
        assert_eq!(SpatialGrid::build(&[]), Err(GridError::NoFloors));
        assert_eq!(
            SpatialGrid::build(&[vec![]]),
            Err(GridError::EmptyFloor { floor: 0 })
        );
        assert_eq!(
            SpatialGrid::build(&[vec![vec![1, 1]; 2], vec![vec![1, 1]; 3]]),
            Err(GridError::RowCountMismatch {
                floor: 1,
                rows: 3,
                expected: 2
            })
        );
        assert_eq!(
            SpatialGrid::build(&[vec![vec![1, 1], vec![1, 1, 1]]]),
            Err(GridError::ColumnCountMismatch {
                floor: 0,
                row: 1,
                columns: 3,
                expected: 2
            })
        );
    }

    #[test]
    fn world_lookup_inverts_world_position() {
        let grid = SpatialGrid::build(&scenario_templates()).unwrap();
        let metrics = GridMetrics::default();
        let cell = *grid.cell_at(2, 1, 0).unwrap();

        // Nudge within the cell; rounding returns the same cell.
        let nudge = Vec3::new(0.3 * CELL_SIZE, -1.0, -0.3 * CELL_SIZE);
        let point = metrics.world_position(&cell) + nudge;
        assert_eq!(grid.cell_at_world(&metrics, &point, 0), Some(&cell));

        let far = Point3::new(1.0e6, 0.0, 1.0e6);
        assert!(grid.cell_at_world(&metrics, &far, 0).is_none());
    }

    #[test]
    fn neighbors_skip_closed_and_missing_cells() {
        let grid = SpatialGrid::build(&scenario_templates()).unwrap();
        let corner = *grid.cell_at(0, 0, 0).unwrap();
        let edge = *grid.cell_at(2, 1, 0).unwrap();

        let around_corner: Vec<_> = grid
            .walkable_neighbors(&corner)
            .iter()
            .map(|c| (c.x, c.y))
            .collect();
        assert_eq!(around_corner, vec![(1, 0), (0, 1)]);

        let around_edge: Vec<_> = grid
            .walkable_neighbors(&edge)
            .iter()
            .map(|c| (c.x, c.y))
            .collect();
        assert_eq!(around_edge, vec![(2, 0), (2, 2), (1, 1)]);
    }
}
