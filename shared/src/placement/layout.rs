//! Pure placement rules. Every position is derived from an anchor's world bounds.

use crate::{
    constants::{
        ITEM_FILL, SHELF_CAPACITY, SHELF_COLUMNS, SHELF_ROWS, SIGN_LABEL_OFFSET, TABLE_CAPACITY,
        TABLE_ITEM_LIFT,
    },
    types::{Aabb, Point3, Vec3},
};

/// Center and half extents of one placed box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemBox {
    pub position: Point3,
    pub half_extents: Vec3,
}

pub fn sign_label_position(sign: &Aabb) -> Point3 {
    sign.center() + Vec3::from(SIGN_LABEL_OFFSET)
}

/// Up to [`TABLE_CAPACITY`] items in a row along X, centered on the table and resting on it.
pub fn table_layout(table: &Aabb, count: usize) -> Vec<ItemBox> {
    let n = count.min(TABLE_CAPACITY);
    if n == 0 {
        return Vec::new();
    }

    let center = table.center();
    let spacing = table.size().x / TABLE_CAPACITY as f32;
    let half = spacing * ITEM_FILL * 0.5;
    let y = table.max.y + TABLE_ITEM_LIFT + half;
    let mid = (n - 1) as f32 * 0.5;

    (0..n)
        .map(|i| ItemBox {
            position: Point3::new(center.x + (i as f32 - mid) * spacing, y, center.z),
            half_extents: Vec3::repeat(half),
        })
        .collect()
}

/// Up to [`SHELF_CAPACITY`] items on a `SHELF_ROWS x SHELF_COLUMNS` grid, row-major from
/// the top-left cell.
pub fn shelf_layout(shelf: &Aabb, count: usize) -> Vec<ItemBox> {
    let n = count.min(SHELF_CAPACITY);
    let size = shelf.size();
    let cell_w = size.x / SHELF_COLUMNS as f32;
    let cell_h = size.y / SHELF_ROWS as f32;
    let half = cell_w.min(cell_h) * ITEM_FILL * 0.5;
    let z = shelf.center().z;

    (0..n)
        .map(|i| {
            let (row, col) = (i / SHELF_COLUMNS, i % SHELF_COLUMNS);
            ItemBox {
                position: Point3::new(
                    shelf.min.x + (col as f32 + 0.5) * cell_w,
                    shelf.max.y - (row as f32 + 0.5) * cell_h,
                    z,
                ),
                half_extents: Vec3::repeat(half),
            }
        })
        .collect()
}

/// Hit volume covering the cashier anchor.
pub fn checkout_volume(cashier: &Aabb) -> ItemBox {
    ItemBox {
        position: cashier.center(),
        half_extents: cashier.half_extents(),
    }
}
