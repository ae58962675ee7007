use super::TenantSlot;
use crate::venue_data::{ProductQuery, Tenant, VenueDataSource};
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, warn};

/// Uniformly picks up to `count` tenants: Fisher–Yates over a copy, then the first `count`.
pub fn select_tenants<R: Rng + ?Sized>(
    candidates: &[Tenant],
    count: usize,
    rng: &mut R,
) -> Vec<Tenant> {
    let mut pool = candidates.to_vec();
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}

/// Selects tenants for `slots` display slots and fetches each one's products.
///
/// Slot `i` gets the `i`-th selected tenant. A failed product lookup leaves the slot with
/// `products: None`.
pub fn assign_tenants<D, R>(
    source: &D,
    slots: usize,
    query: &ProductQuery,
    rng: &mut R,
) -> Vec<TenantSlot>
where
    D: VenueDataSource + ?Sized,
    R: Rng + ?Sized,
{
    let candidates = source.recommended_tenants();
    if candidates.is_empty() {
        debug!("no recommended tenants; venue renders without shops");
    }

    select_tenants(&candidates, slots, rng)
        .into_iter()
        .enumerate()
        .map(|(slot, tenant)| {
            let products = source.products_for_tenant(&tenant.id, query);
            match &products {
                None => {
                    warn!(tenant = %tenant.id, slot, "product lookup failed; slot stays empty")
                }
                Some(list) => {
                    debug!(tenant = %tenant.id, slot, products = list.len(), "tenant assigned")
                }
            }
            TenantSlot {
                slot,
                tenant,
                products,
            }
        })
        .collect()
}
