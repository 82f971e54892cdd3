//! Pool allocation: fills per-vehicle-type demand buckets from the
//! fairness-ranked roster.
//!
//! Buckets are processed scarcest first, where scarcity is the number of
//! qualified drivers per requested slot. Within a bucket the ranked list is
//! walked in order, so a longer-waiting qualified driver is never skipped
//! while the bucket still has room. Whoever is left after both passes is on
//! standby for the cycle.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::{Demand, Driver, DriverId, PoolMap, VehicleType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolAllocation {
    pub pools: PoolMap,
    /// Unfilled slots per bucket. Buckets filled completely are absent.
    pub shortfalls: BTreeMap<VehicleType, u32>,
    /// Drivers placed in no bucket, in fairness order.
    pub standby: Vec<DriverId>,
    /// Order in which buckets were filled (scarcest first).
    pub bucket_order: Vec<VehicleType>,
}

impl PoolAllocation {
    pub fn shortfall(&self, vehicle_type: &VehicleType) -> u32 {
        self.shortfalls.get(vehicle_type).copied().unwrap_or(0)
    }

    pub fn total_shortfall(&self) -> u32 {
        self.shortfalls.values().sum()
    }

    pub fn total_assigned(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn pool_of(&self, driver: &DriverId) -> Option<&VehicleType> {
        self.pools
            .iter()
            .find(|(_, members)| members.contains(driver))
            .map(|(tag, _)| tag)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket<'a> {
    tag: &'a VehicleType,
    requested: u32,
    qualified: u32,
}

impl Bucket<'_> {
    /// Compares `qualified / requested` without floating point.
    fn scarcity_cmp(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.qualified) * u64::from(other.requested);
        let rhs = u64::from(other.qualified) * u64::from(self.requested);
        lhs.cmp(&rhs)
    }
}

/// Never fails: an under-supplied bucket is returned partially filled and
/// its missing slots are recorded in [`PoolAllocation::shortfalls`].
pub fn allocate_pools(ranked: &[&Driver], demand: &Demand) -> PoolAllocation {
    let mut buckets: Vec<Bucket<'_>> = demand
        .iter()
        .filter(|(_, requested)| **requested > 0)
        .map(|(tag, requested)| Bucket {
            tag,
            requested: *requested,
            qualified: ranked.iter().filter(|d| d.is_qualified_for(tag)).count() as u32,
        })
        .collect();
    // Stable: equal scarcity keeps tag order.
    buckets.sort_by(Bucket::scarcity_cmp);

    let mut pools: PoolMap = demand.keys().map(|tag| (tag.clone(), Vec::new())).collect();
    let mut placed: HashSet<&DriverId> = HashSet::new();

    for bucket in &buckets {
        let members = pools.entry(bucket.tag.clone()).or_default();
        for &driver in ranked {
            if members.len() >= bucket.requested as usize {
                break;
            }
            if placed.contains(&driver.id) || !driver.is_qualified_for(bucket.tag) {
                continue;
            }
            members.push(driver.id.clone());
            placed.insert(&driver.id);
        }
        debug!(
            pool = %bucket.tag,
            qualified = bucket.qualified,
            requested = bucket.requested,
            filled = members.len(),
            "pool filled"
        );
    }

    // Top-up pass for buckets left short.
    for bucket in &buckets {
        let members = pools.entry(bucket.tag.clone()).or_default();
        let missing = (bucket.requested as usize).saturating_sub(members.len());
        if missing == 0 {
            continue;
        }
        let top_up: Vec<&DriverId> = ranked
            .iter()
            .filter(|d| !placed.contains(&d.id) && d.is_qualified_for(bucket.tag))
            .take(missing)
            .map(|d| &d.id)
            .collect();
        for id in top_up {
            members.push(id.clone());
            placed.insert(id);
        }
    }

    let mut shortfalls = BTreeMap::new();
    for bucket in &buckets {
        let filled = pools.get(bucket.tag).map_or(0, Vec::len) as u32;
        let missing = bucket.requested.saturating_sub(filled);
        if missing > 0 {
            warn!(
                pool = %bucket.tag,
                requested = bucket.requested,
                filled,
                missing,
                "pool under-filled"
            );
            shortfalls.insert(bucket.tag.clone(), missing);
        }
    }

    let standby: Vec<DriverId> = ranked
        .iter()
        .filter(|d| !placed.contains(&d.id))
        .map(|d| d.id.clone())
        .collect();

    info!(
        assigned = placed.len(),
        standby = standby.len(),
        short_pools = shortfalls.len(),
        "pool allocation complete"
    );

    PoolAllocation {
        pools,
        shortfalls,
        standby,
        bucket_order: buckets.iter().map(|b| b.tag.clone()).collect(),
    }
}
