/*!
Procedural tenant content for the venue.

Tenants are assigned once per scene load to anchor bundles `Table<n>`, `Cashier<n>`,
`Sign<n>` and `Shelf<n>`. Positions are never stored: every call to
[`VenuePlacementEngine::compute`] derives them from the anchors' current bounds, so
content follows the scene when anchors move. Only the spin angles persist between frames.
*/

mod hit_targets;
mod layout;
mod selection;
mod spin;

pub use hit_targets::{HitTarget, HitTargetWorld};
pub use layout::{ItemBox, checkout_volume, shelf_layout, sign_label_position, table_layout};
pub use selection::{assign_tenants, select_tenants};
pub use spin::{SpinState, spin_rate};

use crate::{
    asset_cache::CachedScene,
    constants::{SHELF_CAPACITY, TABLE_CAPACITY},
    scene::{AnchorKey, AnchorRole},
    types::{Aabb, Point3, Vec3},
    venue_data::{Product, Tenant},
};
use std::collections::{BTreeMap, HashMap};

/// Current world bounds of anchor nodes.
pub trait AnchorBounds {
    fn anchor_bounds(&self, key: AnchorKey) -> Option<Aabb>;
}

impl AnchorBounds for CachedScene {
    fn anchor_bounds(&self, key: AnchorKey) -> Option<Aabb> {
        self.index
            .anchor(key)
            .and_then(|node| self.graph.world_bounds(node))
    }
}

impl AnchorBounds for HashMap<AnchorKey, Aabb> {
    fn anchor_bounds(&self, key: AnchorKey) -> Option<Aabb> {
        self.get(&key).copied()
    }
}

/// A tenant bound to the anchor bundle of `slot`.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantSlot {
    pub slot: usize,
    pub tenant: Tenant,
    /// `None` when the product lookup failed.
    pub products: Option<Vec<Product>>,
}

impl TenantSlot {
    fn products(&self) -> &[Product] {
        self.products.as_deref().unwrap_or_default()
    }
}

/// Identity of one piece of placed content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Sign { slot: usize },
    Table { slot: usize, index: usize },
    Shelf { slot: usize, index: usize },
    Checkout { slot: usize },
}

impl ItemKey {
    pub fn slot(&self) -> usize {
        match *self {
            ItemKey::Sign { slot }
            | ItemKey::Table { slot, .. }
            | ItemKey::Shelf { slot, .. }
            | ItemKey::Checkout { slot } => slot,
        }
    }

    /// The anchor this item is positioned from.
    pub fn anchor(&self) -> AnchorKey {
        let role = match self {
            ItemKey::Sign { .. } => AnchorRole::Sign,
            ItemKey::Table { .. } => AnchorRole::Table,
            ItemKey::Shelf { .. } => AnchorRole::Shelf,
            ItemKey::Checkout { .. } => AnchorRole::Cashier,
        };
        AnchorKey::new(role, self.slot())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedItem {
    pub key: ItemKey,
    pub position: Point3,
    pub half_extents: Vec3,
    /// Rotation about +Y (radians). Non-zero only for table items.
    pub spin: f32,
    pub target: Option<HitTarget>,
}

/// Placement for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementFrame {
    pub items: Vec<PlacedItem>,
    /// Anchors needed by an assigned tenant but absent from the scene.
    pub missing: Vec<AnchorKey>,
}

impl PlacementFrame {
    pub fn get(&self, key: ItemKey) -> Option<&PlacedItem> {
        self.items.iter().find(|item| item.key == key)
    }
}

pub struct VenuePlacementEngine {
    slots: Vec<TenantSlot>,
    spins: BTreeMap<(usize, usize), SpinState>,
}

impl VenuePlacementEngine {
    pub fn new(slots: Vec<TenantSlot>) -> Self {
        let spins = slots
            .iter()
            .flat_map(|slot| {
                let count = slot.products().len().min(TABLE_CAPACITY);
                (0..count).map(move |i| ((slot.slot, i), SpinState::new(spin_rate(i))))
            })
            .collect();
        Self { slots, spins }
    }

    #[inline]
    pub fn slots(&self) -> &[TenantSlot] {
        &self.slots
    }

    pub fn tenant(&self, slot: usize) -> Option<&Tenant> {
        self.slot(slot).map(|s| &s.tenant)
    }

    fn slot(&self, slot: usize) -> Option<&TenantSlot> {
        self.slots.iter().find(|s| s.slot == slot)
    }

    /// Product shown by a table or shelf item. Both read the tenant's list in order.
    pub fn product(&self, key: ItemKey) -> Option<&Product> {
        match key {
            ItemKey::Table { slot, index } | ItemKey::Shelf { slot, index } => {
                self.slot(slot)?.products().get(index)
            }
            ItemKey::Sign { .. } | ItemKey::Checkout { .. } => None,
        }
    }

    /// Text rendered next to an item: tenant name on signs, price tags on products.
    pub fn label_text(&self, key: ItemKey) -> Option<String> {
        match key {
            ItemKey::Sign { slot } => self.tenant(slot).map(|t| t.name.clone()),
            ItemKey::Table { .. } | ItemKey::Shelf { .. } => self.product(key)?.price_tag(),
            ItemKey::Checkout { .. } => None,
        }
    }

    pub fn spin(&self, slot: usize, index: usize) -> Option<SpinState> {
        self.spins.get(&(slot, index)).copied()
    }

    /// Advances every table item's spin by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        for spin in self.spins.values_mut() {
            *spin = spin.advanced(dt);
        }
    }

    /// Positions of all content from the anchors' current bounds.
    pub fn compute<A: AnchorBounds + ?Sized>(&self, anchors: &A) -> PlacementFrame {
        let mut frame = PlacementFrame::default();

        for slot in &self.slots {
            let s = slot.slot;
            let products = slot.products();
            let mut bounds = |role: AnchorRole| {
                let key = AnchorKey::new(role, s);
                let found = anchors.anchor_bounds(key);
                if found.is_none() {
                    frame.missing.push(key);
                }
                found
            };

            let sign = bounds(AnchorRole::Sign);
            let table = bounds(AnchorRole::Table);
            let shelf = bounds(AnchorRole::Shelf);
            let cashier = bounds(AnchorRole::Cashier);

            if let Some(sign) = sign {
                frame.items.push(PlacedItem {
                    key: ItemKey::Sign { slot: s },
                    position: sign_label_position(&sign),
                    half_extents: Vec3::zeros(),
                    spin: 0.0,
                    target: None,
                });
            }

            if let Some(table) = table {
                let layout = table_layout(&table, products.len());
                for (index, placed) in layout.into_iter().enumerate() {
                    frame.items.push(PlacedItem {
                        key: ItemKey::Table { slot: s, index },
                        position: placed.position,
                        half_extents: placed.half_extents,
                        spin: self.spin(s, index).map_or(0.0, |spin| spin.angle),
                        target: Some(HitTarget::Product {
                            product_id: products[index].id.clone(),
                        }),
                    });
                }
            }

            if let Some(shelf) = shelf {
                let layout = shelf_layout(&shelf, products.len());
                for (index, placed) in layout.into_iter().enumerate() {
                    frame.items.push(PlacedItem {
                        key: ItemKey::Shelf { slot: s, index },
                        position: placed.position,
                        half_extents: placed.half_extents,
                        spin: 0.0,
                        target: Some(HitTarget::Product {
                            product_id: products[index].id.clone(),
                        }),
                    });
                }
            }

            if let Some(cashier) = cashier {
                let volume = checkout_volume(&cashier);
                frame.items.push(PlacedItem {
                    key: ItemKey::Checkout { slot: s },
                    position: volume.position,
                    half_extents: volume.half_extents,
                    spin: 0.0,
                    target: Some(HitTarget::Checkout {
                        shop_id: slot.tenant.id.clone(),
                    }),
                });
            }
        }

        frame
    }

    /// Every item key the current assignment can produce, for spawning.
    pub fn item_keys(&self) -> Vec<ItemKey> {
        let mut keys = Vec::new();
        for slot in &self.slots {
            let s = slot.slot;
            let count = slot.products().len();
            keys.push(ItemKey::Sign { slot: s });
            let tables = 0..count.min(TABLE_CAPACITY);
            let shelves = 0..count.min(SHELF_CAPACITY);
            keys.extend(tables.map(|index| ItemKey::Table { slot: s, index }));
            keys.extend(shelves.map(|index| ItemKey::Shelf { slot: s, index }));
            keys.push(ItemKey::Checkout { slot: s });
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneGraph, SceneNode};
    use crate::types::Mat4;

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            title: Some(format!("Item {id}")),
            price: None,
            image_url: None,
        }
    }

    fn tenant_slot(slot: usize, products: Option<usize>) -> TenantSlot {
        TenantSlot {
            slot,
            tenant: Tenant {
                id: format!("shop{slot}"),
                name: format!("Shop {slot}"),
                logo_image_url: None,
            },
            products: products.map(|n| (0..n).map(|i| product(&format!("{slot}-{i}"))).collect()),
        }
    }

    fn bundle(slot: usize, x: f32) -> HashMap<AnchorKey, Aabb> {
        let at = |role, min: [f32; 3], max: [f32; 3]| {
            (
                AnchorKey::new(role, slot),
                Aabb::new(
                    Point3::new(min[0] + x, min[1], min[2]),
                    Point3::new(max[0] + x, max[1], max[2]),
                ),
            )
        };
        HashMap::from([
            at(AnchorRole::Sign, [-1.0, 3.0, 0.0], [1.0, 3.5, 0.1]),
            at(AnchorRole::Table, [-2.0, 0.0, 2.0], [2.0, 1.0, 3.0]),
            at(AnchorRole::Shelf, [-2.5, 0.0, -1.0], [2.5, 2.0, -0.5]),
            at(AnchorRole::Cashier, [3.0, 0.0, 2.0], [4.0, 1.1, 3.0]),
        ])
    }

    #[test]
    fn full_slot_places_every_piece() {
        let engine = VenuePlacementEngine::new(vec![tenant_slot(0, Some(6))]);
        let frame = engine.compute(&bundle(0, 0.0));

        assert!(frame.missing.is_empty());
        assert_eq!(frame.items.len(), 1 + 4 + 6 + 1);
        assert_eq!(engine.item_keys().len(), frame.items.len());

        let checkout = frame.get(ItemKey::Checkout { slot: 0 }).unwrap();
        assert_eq!(
            checkout.target,
            Some(HitTarget::Checkout {
                shop_id: "shop0".into()
            })
        );
        let shelf = frame.get(ItemKey::Shelf { slot: 0, index: 5 }).unwrap();
        assert_eq!(
            shelf.target,
            Some(HitTarget::Product {
                product_id: "0-5".into()
            })
        );
        assert_eq!(engine.label_text(ItemKey::Sign { slot: 0 }).as_deref(), Some("Shop 0"));
        assert_eq!(
            engine.label_text(ItemKey::Table { slot: 0, index: 1 }).as_deref(),
            Some("Item 0-1")
        );
    }

    #[test]
    fn placement_is_stable_for_unchanged_anchors() {
        let mut engine =
            VenuePlacementEngine::new(vec![tenant_slot(0, Some(3)), tenant_slot(1, Some(2))]);
        let mut anchors = bundle(0, 0.0);
        anchors.extend(bundle(1, 20.0));

        let first = engine.compute(&anchors);
        assert_eq!(first, engine.compute(&anchors));

        // Spinning changes only the table items' angle.
        engine.advance(0.5);
        let spun = engine.compute(&anchors);
        for (a, b) in first.items.iter().zip(&spun.items) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.key, b.key);
            if matches!(a.key, ItemKey::Table { .. }) {
                assert!(b.spin > a.spin);
            } else {
                assert_eq!(b.spin, 0.0);
            }
        }
    }

    #[test]
    fn content_follows_moved_anchors() {
        let engine = VenuePlacementEngine::new(vec![tenant_slot(0, Some(2))]);
        let before = engine.compute(&bundle(0, 0.0));
        let after = engine.compute(&bundle(0, 7.0));

        for (a, b) in before.items.iter().zip(&after.items) {
            assert!((b.position.x - a.position.x - 7.0).abs() < 1.0e-5);
        }
    }

    #[test]
    fn missing_anchors_and_products_are_skipped() {
        let engine = VenuePlacementEngine::new(vec![tenant_slot(0, None), tenant_slot(1, Some(3))]);
        let mut anchors = bundle(0, 0.0);
        anchors.extend(bundle(1, 10.0));
        anchors.remove(&AnchorKey::new(AnchorRole::Shelf, 1));

        let frame = engine.compute(&anchors);
        assert_eq!(frame.missing, vec![AnchorKey::new(AnchorRole::Shelf, 1)]);

        // Failed lookup: sign and checkout only.
        let slot0: Vec<_> = frame.items.iter().filter(|i| i.key.slot() == 0).collect();
        assert_eq!(slot0.len(), 2);

        // Missing shelf: sign, 3 table items, checkout.
        let slot1: Vec<_> = frame.items.iter().filter(|i| i.key.slot() == 1).collect();
        assert_eq!(slot1.len(), 5);
        assert!(slot1.iter().all(|i| !matches!(i.key, ItemKey::Shelf { .. })));
    }

    #[test]
    fn cached_scene_provides_live_bounds() {
        let mut graph = SceneGraph::new();
        let unit = Aabb::new(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let root = graph.add_node(SceneNode::new("Venue"), None);
        graph.add_node(SceneNode::new("Cashier1").with_mesh(Some(unit)), Some(root));
        let scene = CachedScene::prepare("mall.glb".into(), graph);

        let key = AnchorKey::new(AnchorRole::Cashier, 0);
        assert_eq!(scene.anchor_bounds(key), Some(unit));
        assert_eq!(scene.anchor_bounds(AnchorKey::new(AnchorRole::Sign, 0)), None);

        let mut moved = CachedScene::prepare("mall.glb".into(), scene.graph.clone());
        moved
            .graph
            .set_local_matrix(root, Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)));
        assert_eq!(moved.anchor_bounds(key).unwrap().min.y, 5.0);
    }
}
