//! Shared planning desk for service use.
//!
//! A full cycle or auto-assign holds the cycle gate exclusively. Manual
//! overrides hold it shared and additionally claim every route they touch
//! (the target, plus the route a moved driver or vehicle leaves), so
//! overrides on different routes proceed together while two edits of the
//! same route, or an edit racing an auto-assign, are refused with
//! [`PlanError::Busy`].
//! Nothing here waits for a lock to free up; callers retry.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, TryLockError};

use tracing::debug;

use crate::error::PlanError;
use crate::model::{Route, RouteId};
use crate::solver::{self, AssignmentOutcome, CycleReport, PlannerOptions};
use crate::state::{AssignmentState, Resource, ResourceKind};

pub struct PlanningDesk {
    state: Mutex<AssignmentState>,
    cycle_gate: RwLock<()>,
    claimed_routes: Mutex<HashSet<RouteId>>,
    options: PlannerOptions,
}

struct RouteClaim<'a> {
    claims: &'a Mutex<HashSet<RouteId>>,
    route: RouteId,
}

impl Drop for RouteClaim<'_> {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.route);
    }
}

impl PlanningDesk {
    pub fn new(state: AssignmentState, options: PlannerOptions) -> Self {
        Self {
            state: Mutex::new(state),
            cycle_gate: RwLock::new(()),
            claimed_routes: Mutex::new(HashSet::new()),
            options,
        }
    }

    fn state(&self) -> MutexGuard<'_, AssignmentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AssignmentState {
        self.state().clone()
    }

    pub fn into_state(self) -> AssignmentState {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_cycle(&self, auto_assign: bool) -> Result<CycleReport, PlanError> {
        let _gate = match self.cycle_gate.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(PlanError::Busy("planning cycle".into())),
        };
        let mut state = self.state();
        Ok(solver::run_cycle(&mut *state, &self.options, auto_assign))
    }

    /// Driver pass followed by vehicle pass.
    pub fn auto_assign(&self) -> Result<(AssignmentOutcome, AssignmentOutcome), PlanError> {
        let _gate = match self.cycle_gate.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(PlanError::Busy("auto-assign".into())),
        };
        let mut state = self.state();
        let drivers = state.auto_assign_drivers(&self.options);
        let vehicles = state.auto_assign_vehicles();
        Ok((drivers, vehicles))
    }

    /// Claims the target route and, when the resource is leaving another
    /// route, that route too.
    pub fn manual_assign(&self, route: &RouteId, resource: Resource) -> Result<Route, PlanError> {
        let _gate = self.shared_gate()?;
        let previous = self.state().route_of(&resource).cloned();

        let _claim = self.claim(route)?;
        let _previous_claim = match &previous {
            Some(old) if old != route => Some(self.claim(old)?),
            _ => None,
        };
        debug!(route = %route, previous = ?previous, "routes claimed");

        let mut state = self.state();
        if state.route_of(&resource) != previous.as_ref() {
            return Err(PlanError::Busy(resource.to_string()));
        }
        state.manual_assign(route, resource).cloned()
    }

    pub fn manual_unassign(&self, route: &RouteId, kind: ResourceKind) -> Result<Route, PlanError> {
        let _gate = self.shared_gate()?;
        let _claim = self.claim(route)?;
        debug!(route = %route, "route claimed");
        let mut state = self.state();
        state.manual_unassign(route, kind).cloned()
    }

    fn shared_gate(&self) -> Result<RwLockReadGuard<'_, ()>, PlanError> {
        match self.cycle_gate.try_read() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(PlanError::Busy("planning cycle".into())),
        }
    }

    fn claim(&self, route: &RouteId) -> Result<RouteClaim<'_>, PlanError> {
        let mut claims = self
            .claimed_routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !claims.insert(route.clone()) {
            return Err(PlanError::Busy(format!("route {route}")));
        }
        Ok(RouteClaim {
            claims: &self.claimed_routes,
            route: route.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Driver, DriverId, Vehicle, VehicleId, VehicleType};

    fn desk() -> PlanningDesk {
        let mut driver = Driver::new("D1", "Dana");
        driver.qualifications.insert(VehicleType::new("EDV"));
        let state = AssignmentState::new(
            vec![driver],
            vec![Vehicle::new("V1", "EDV")],
            vec![Route::new("R1", "CX1", "EDV"), Route::new("R2", "CX2", "EDV")],
            [(VehicleType::new("EDV"), 1)].into_iter().collect(),
        );
        PlanningDesk::new(state, PlannerOptions::default())
    }

    #[test]
    fn manual_edit_is_refused_while_cycle_runs() {
        let desk = desk();
        let _cycle = desk.cycle_gate.write().unwrap();

        let err = desk
            .manual_assign(&RouteId::new("R1"), Resource::Driver(DriverId::new("D1")))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn cycle_is_refused_while_manual_edit_holds_gate() {
        let desk = desk();
        let _edit = desk.cycle_gate.read().unwrap();

        assert!(matches!(desk.run_cycle(true), Err(PlanError::Busy(_))));
        assert!(matches!(desk.auto_assign(), Err(PlanError::Busy(_))));
    }

    #[test]
    fn same_route_edits_conflict_but_other_routes_proceed() {
        let desk = desk();
        let _claim = desk.claim(&RouteId::new("R1")).unwrap();

        let err = desk
            .manual_assign(&RouteId::new("R1"), Resource::Vehicle(VehicleId::new("V1")))
            .unwrap_err();
        assert_eq!(err, PlanError::Busy("route R1".into()));

        let route = desk
            .manual_assign(&RouteId::new("R2"), Resource::Vehicle(VehicleId::new("V1")))
            .unwrap();
        assert_eq!(route.vehicle, Some(VehicleId::new("V1")));
    }

    #[test]
    fn moving_a_driver_also_claims_the_route_it_leaves() {
        let desk = desk();
        let driver = Resource::Driver(DriverId::new("D1"));
        desk.manual_assign(&RouteId::new("R2"), driver.clone()).unwrap();

        {
            let _held = desk.claim(&RouteId::new("R2")).unwrap();
            let err = desk.manual_assign(&RouteId::new("R1"), driver.clone()).unwrap_err();
            assert_eq!(err, PlanError::Busy("route R2".into()));
        }

        let route = desk.manual_assign(&RouteId::new("R1"), driver).unwrap();
        assert_eq!(route.driver, Some(DriverId::new("D1")));
        let state = desk.snapshot();
        assert_eq!(state.route(&RouteId::new("R2")).unwrap().driver, None);
        assert!(desk.claimed_routes.lock().unwrap().is_empty());
    }

    #[test]
    fn claims_are_released_after_edit() {
        let desk = desk();
        let route = RouteId::new("R1");
        desk.manual_assign(&route, Resource::Driver(DriverId::new("D1"))).unwrap();
        desk.manual_unassign(&route, ResourceKind::Driver).unwrap();
        assert!(desk.claimed_routes.lock().unwrap().is_empty());
    }

    #[test]
    fn cycles_run_from_many_threads_never_interleave() {
        let desk = desk();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let _ = desk.run_cycle(true);
                });
            }
        });

        let state = desk.into_state();
        let assigned = state.routes.iter().filter(|r| r.driver.is_some()).count();
        assert_eq!(assigned, 1);
        assert_eq!(state.pools[&VehicleType::new("EDV")], vec![DriverId::new("D1")]);
    }
}
