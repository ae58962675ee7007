use super::PlacementFrame;
use crate::{
    types::{Point3, Quat, Vec3},
    venue_data::NavigationIntent,
};
use nalgebra::{Isometry, Translation3};
use rapier3d::prelude::{
    BroadPhaseBvh, ColliderBuilder, ColliderSet, IntegrationParameters, NarrowPhase, QueryFilter,
    Ray, RigidBodySet,
};

/// Minimum half extent of a pickable volume (meters).
const MIN_HALF_EXTENT: f32 = 1.0e-3;

/// What an interaction volume opens when selected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HitTarget {
    Checkout { shop_id: String },
    Product { product_id: String },
}

impl From<HitTarget> for NavigationIntent {
    fn from(target: HitTarget) -> Self {
        match target {
            HitTarget::Checkout { shop_id } => NavigationIntent::Checkout { shop_id },
            HitTarget::Product { product_id } => NavigationIntent::Product { product_id },
        }
    }
}

/// Static rapier world holding one cuboid per hit volume of a placement frame.
///
/// Rebuilt whenever the placement frame changes; queried with screen rays.
pub struct HitTargetWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    targets: Vec<HitTarget>,
}

impl HitTargetWorld {
    pub fn build(frame: &PlacementFrame) -> Self {
        let bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut modified_colliders = Vec::new();
        let mut targets = Vec::new();

        for item in &frame.items {
            let Some(target) = &item.target else {
                continue;
            };
            let half = item.half_extents.map(|h| h.max(MIN_HALF_EXTENT));
            let mut collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
                .user_data(targets.len() as u128)
                .build();
            collider.set_position(Isometry::from_parts(
                Translation3::from(item.position.coords),
                Quat::identity(),
            ));
            modified_colliders.push(colliders.insert(collider));
            targets.push(target.clone());
        }

        let mut broad_phase = BroadPhaseBvh::new();
        let mut events = Vec::new();
        broad_phase.update(
            &IntegrationParameters::default(),
            &colliders,
            &bodies,
            &modified_colliders,
            &[],
            &mut events,
        );

        Self {
            bodies,
            colliders,
            broad_phase,
            narrow_phase: NarrowPhase::default(),
            targets,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Nearest target along the ray within `max_distance`, with its hit distance.
    ///
    /// Rays starting inside a volume hit it at distance 0.
    pub fn pick(
        &self,
        origin: Point3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<(HitTarget, f32)> {
        let direction = direction.try_normalize(f32::EPSILON)?;
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default(),
        );

        let (handle, distance) = query.cast_ray(&Ray::new(origin, direction), max_distance, true)?;
        let index = self.colliders.get(handle)?.user_data as usize;
        self.targets.get(index).cloned().map(|t| (t, distance))
    }
}
