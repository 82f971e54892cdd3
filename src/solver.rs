//! Route assignment engine and the planning-cycle runner.
//!
//! Both passes are greedy and walk unassigned routes in input order. A route
//! that already carries a driver (or vehicle) is never touched, so re-running
//! a pass after manual edits only fills the gaps.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::fairness::{TieBreak, rank_by_fairness};
use crate::model::{Driver, Route, RouteId, Vehicle, VehicleType};
use crate::pools::{PoolAllocation, allocate_pools};
use crate::scoring::score_with_vehicle;
use crate::state::AssignmentState;

/// Which drivers the driver pass may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverSource {
    /// Any driver without a route.
    #[default]
    FullRoster,
    /// Only drivers holding a pool slot for the route's vehicle type.
    PoolMembers,
}

impl DriverSource {
    fn admits(self, driver: &Driver, vehicle_type: &VehicleType) -> bool {
        match self {
            DriverSource::FullRoster => true,
            DriverSource::PoolMembers => driver.pool.as_ref() == Some(vehicle_type),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Secondary ordering for equal standby gaps.
    pub tie_break: TieBreak,
    pub driver_source: DriverSource,
    /// Score the Vehicle dimension against a vehicle already on the route.
    pub vehicle_aware_scoring: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::InputOrder,
            driver_source: DriverSource::FullRoster,
            vehicle_aware_scoring: true,
        }
    }
}

/// Result of one assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentOutcome {
    pub assigned: usize,
    /// Routes the pass could not serve.
    pub unfilled: Vec<RouteId>,
    /// Routes that received a vehicle of a different type.
    pub type_fallbacks: Vec<RouteId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub pools: PoolAllocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drivers: Option<AssignmentOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<AssignmentOutcome>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    score: u32,
    days_since_standby: u32,
}

/// Best score first, then the longer standby gap, then roster order.
fn best_candidate(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().min_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.days_since_standby.cmp(&a.days_since_standby))
            .then(a.index.cmp(&b.index))
    })
}

pub fn auto_assign_drivers(
    routes: &mut [Route],
    drivers: &mut [Driver],
    options: &PlannerOptions,
) -> AssignmentOutcome {
    let mut outcome = AssignmentOutcome::default();

    for route in routes.iter_mut().filter(|r| r.driver.is_none()) {
        let target: &Route = route;
        let vehicle = target.vehicle.as_ref().filter(|_| options.vehicle_aware_scoring);

        let candidates: Vec<Candidate> = drivers
            .par_iter()
            .enumerate()
            .filter(|(_, d)| {
                d.assigned_route.is_none()
                    && d.is_qualified_for(&target.vehicle_type)
                    && options.driver_source.admits(d, &target.vehicle_type)
            })
            .map(|(index, d)| Candidate {
                index,
                score: score_with_vehicle(d, target, vehicle),
                days_since_standby: d.days_since_standby,
            })
            .collect();

        let Some(best) = best_candidate(candidates) else {
            warn!(
                route = %route.id,
                vehicle_type = %route.vehicle_type,
                "no qualified driver available"
            );
            outcome.unfilled.push(route.id.clone());
            continue;
        };

        let driver = &mut drivers[best.index];
        driver.assigned_route = Some(route.id.clone());
        route.driver = Some(driver.id.clone());
        outcome.assigned += 1;
        debug!(
            route = %route.id,
            driver = %driver.id,
            score = best.score,
            status = ?route.status(),
            "driver assigned"
        );
    }

    info!(
        assigned = outcome.assigned,
        unfilled = outcome.unfilled.len(),
        "driver pass complete"
    );
    outcome
}

/// Type-matched vehicle first, otherwise any available one; first fit.
pub fn auto_assign_vehicles(routes: &mut [Route], vehicles: &mut [Vehicle]) -> AssignmentOutcome {
    let mut outcome = AssignmentOutcome::default();

    for route in routes.iter_mut().filter(|r| r.vehicle.is_none()) {
        let matched = vehicles
            .iter()
            .position(|v| v.is_available() && v.vehicle_type == route.vehicle_type);
        let pick = match matched {
            Some(index) => Some((index, false)),
            None => vehicles.iter().position(Vehicle::is_available).map(|index| (index, true)),
        };

        let Some((index, fallback)) = pick else {
            warn!(route = %route.id, "no active vehicle available");
            outcome.unfilled.push(route.id.clone());
            continue;
        };

        let vehicle = &mut vehicles[index];
        vehicle.assigned_route = Some(route.id.clone());
        route.vehicle = Some(vehicle.id.clone());
        outcome.assigned += 1;
        if fallback {
            debug!(
                route = %route.id,
                vehicle = %vehicle.id,
                required = %route.vehicle_type,
                actual = %vehicle.vehicle_type,
                "vehicle type fallback"
            );
            outcome.type_fallbacks.push(route.id.clone());
        }
    }

    info!(
        assigned = outcome.assigned,
        unfilled = outcome.unfilled.len(),
        fallbacks = outcome.type_fallbacks.len(),
        "vehicle pass complete"
    );
    outcome
}

/// Rank, allocate pools and record membership on `state`; with
/// `auto_assign` set, follow up with the driver and vehicle passes.
pub fn run_cycle(
    state: &mut AssignmentState,
    options: &PlannerOptions,
    auto_assign: bool,
) -> CycleReport {
    let allocation = {
        let ranked = rank_by_fairness(&state.drivers, options.tie_break);
        allocate_pools(&ranked, &state.demand)
    };
    state.apply_pools(&allocation);

    let mut report = CycleReport {
        pools: allocation,
        ..CycleReport::default()
    };

    if auto_assign {
        report.drivers = Some(state.auto_assign_drivers(options));
        report.vehicles = Some(state.auto_assign_vehicles());
    }

    report
}
