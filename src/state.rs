//! The in-memory assignment state of one planning cycle.
//!
//! Pool membership and route bindings are independent: a driver can hold a
//! pool slot and a route at the same time. Every mutation keeps both sides of
//! a binding in sync (route → driver/vehicle and back).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PlanError;
use crate::fairness::{TieBreak, rank_by_fairness};
use crate::model::{
    Demand, Driver, DriverId, PoolMap, Route, RouteId, RouteStatus, Vehicle, VehicleId,
    VehicleStatus, VehicleType,
};
use crate::pools::PoolAllocation;
use crate::solver::{self, AssignmentOutcome, PlannerOptions};

/// A resource to bind to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Driver(DriverId),
    Vehicle(VehicleId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Driver(id) => write!(f, "driver {id}"),
            Resource::Vehicle(id) => write!(f, "vehicle {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Driver,
    Vehicle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub vehicle_type: VehicleType,
    pub assigned: usize,
    pub requested: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total_requested: u32,
    pub total_assigned: usize,
    /// Drivers without a pool slot.
    pub unpooled: usize,
    /// Roster size minus total requested demand.
    pub projected_standby: usize,
    pub buckets: Vec<BucketStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveStats {
    pub routes: usize,
    pub with_driver: usize,
    pub with_vehicle: usize,
    pub complete: usize,
    pub available_drivers: usize,
    pub available_vehicles: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentState {
    pub drivers: Vec<Driver>,
    pub vehicles: Vec<Vehicle>,
    pub routes: Vec<Route>,
    pub demand: Demand,
    pub pools: PoolMap,
}

impl AssignmentState {
    /// Pool membership is rebuilt from `Driver::pool`. Route bindings are
    /// taken from the routes: every driver's and vehicle's `assigned_route`
    /// is reset to whichever route names it.
    pub fn new(
        mut drivers: Vec<Driver>,
        mut vehicles: Vec<Vehicle>,
        routes: Vec<Route>,
        demand: Demand,
    ) -> Self {
        let mut pools: PoolMap = demand.keys().map(|tag| (tag.clone(), Vec::new())).collect();
        for driver in &drivers {
            if let Some(tag) = &driver.pool {
                pools.entry(tag.clone()).or_default().push(driver.id.clone());
            }
        }

        for driver in &mut drivers {
            driver.assigned_route = None;
        }
        for vehicle in &mut vehicles {
            vehicle.assigned_route = None;
        }
        for route in &routes {
            if let Some(id) = &route.driver {
                if let Some(driver) = drivers.iter_mut().find(|d| d.id == *id) {
                    driver.assigned_route = Some(route.id.clone());
                }
            }
            if let Some(id) = &route.vehicle {
                if let Some(vehicle) = vehicles.iter_mut().find(|v| v.id == *id) {
                    vehicle.assigned_route = Some(route.id.clone());
                }
            }
        }

        Self {
            drivers,
            vehicles,
            routes,
            demand,
            pools,
        }
    }

    pub fn driver(&self, id: &DriverId) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == *id)
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == *id)
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == *id)
    }

    /// The route `resource` is currently bound to, if any.
    pub fn route_of(&self, resource: &Resource) -> Option<&RouteId> {
        match resource {
            Resource::Driver(id) => self.driver(id)?.assigned_route.as_ref(),
            Resource::Vehicle(id) => self.vehicle(id)?.assigned_route.as_ref(),
        }
    }

    fn driver_index(&self, id: &DriverId) -> Result<usize, PlanError> {
        self.drivers
            .iter()
            .position(|d| d.id == *id)
            .ok_or_else(|| PlanError::UnknownDriver(id.clone()))
    }

    fn vehicle_index(&self, id: &VehicleId) -> Result<usize, PlanError> {
        self.vehicles
            .iter()
            .position(|v| v.id == *id)
            .ok_or_else(|| PlanError::UnknownVehicle(id.clone()))
    }

    fn route_index(&self, id: &RouteId) -> Result<usize, PlanError> {
        self.routes
            .iter()
            .position(|r| r.id == *id)
            .ok_or_else(|| PlanError::UnknownRoute(id.clone()))
    }

    /// Replaces all pool membership with `allocation`.
    pub fn apply_pools(&mut self, allocation: &PoolAllocation) {
        for driver in &mut self.drivers {
            driver.pool = allocation.pool_of(&driver.id).cloned();
        }
        self.pools = allocation.pools.clone();
    }

    pub fn auto_assign_drivers(&mut self, options: &PlannerOptions) -> AssignmentOutcome {
        solver::auto_assign_drivers(&mut self.routes, &mut self.drivers, options)
    }

    pub fn auto_assign_vehicles(&mut self) -> AssignmentOutcome {
        solver::auto_assign_vehicles(&mut self.routes, &mut self.vehicles)
    }

    pub fn manual_assign(
        &mut self,
        route: &RouteId,
        resource: Resource,
    ) -> Result<&Route, PlanError> {
        match resource {
            Resource::Driver(driver) => self.assign_driver(route, &driver),
            Resource::Vehicle(vehicle) => self.assign_vehicle(route, &vehicle),
        }
    }

    /// Clearing an empty slot is a no-op.
    pub fn manual_unassign(
        &mut self,
        route: &RouteId,
        kind: ResourceKind,
    ) -> Result<&Route, PlanError> {
        let ri = self.route_index(route)?;
        match kind {
            ResourceKind::Driver => {
                if let Some(driver) = self.routes[ri].driver.take() {
                    self.release_driver(&driver, route);
                    info!(route = %route, driver = %driver, "driver unassigned");
                }
            }
            ResourceKind::Vehicle => {
                if let Some(vehicle) = self.routes[ri].vehicle.take() {
                    self.release_vehicle(&vehicle, route);
                    info!(route = %route, vehicle = %vehicle, "vehicle unassigned");
                }
            }
        }
        Ok(&self.routes[ri])
    }

    /// Binds `driver` to `route`. The route's previous driver is freed and a
    /// driver already running another route leaves it.
    pub fn assign_driver(
        &mut self,
        route: &RouteId,
        driver: &DriverId,
    ) -> Result<&Route, PlanError> {
        let ri = self.route_index(route)?;
        let di = self.driver_index(driver)?;

        let vehicle_type = &self.routes[ri].vehicle_type;
        if !self.drivers[di].is_qualified_for(vehicle_type) {
            return Err(PlanError::NotQualified {
                driver: driver.clone(),
                vehicle_type: vehicle_type.clone(),
            });
        }
        if self.routes[ri].driver.as_ref() == Some(driver) {
            return Ok(&self.routes[ri]);
        }

        if let Some(previous) = self.routes[ri].driver.take() {
            self.release_driver(&previous, route);
        }
        if let Some(old_route) = self.drivers[di].assigned_route.take() {
            if let Some(old) = self.routes.iter_mut().find(|r| r.id == old_route) {
                old.driver = None;
            }
            debug!(driver = %driver, from = %old_route, to = %route, "driver moved between routes");
        }

        self.drivers[di].assigned_route = Some(route.clone());
        self.routes[ri].driver = Some(driver.clone());
        info!(
            route = %route,
            driver = %driver,
            status = ?self.routes[ri].status(),
            "driver assigned manually"
        );
        Ok(&self.routes[ri])
    }

    /// Binds an active `vehicle` to `route`; the type may differ from the
    /// route's requirement.
    pub fn assign_vehicle(
        &mut self,
        route: &RouteId,
        vehicle: &VehicleId,
    ) -> Result<&Route, PlanError> {
        let ri = self.route_index(route)?;
        let vi = self.vehicle_index(vehicle)?;

        let status = self.vehicles[vi].status;
        if status != VehicleStatus::Active {
            return Err(PlanError::VehicleNotActive {
                vehicle: vehicle.clone(),
                status,
            });
        }
        if self.routes[ri].vehicle.as_ref() == Some(vehicle) {
            return Ok(&self.routes[ri]);
        }

        if let Some(previous) = self.routes[ri].vehicle.take() {
            self.release_vehicle(&previous, route);
        }
        if let Some(old_route) = self.vehicles[vi].assigned_route.take() {
            if let Some(old) = self.routes.iter_mut().find(|r| r.id == old_route) {
                old.vehicle = None;
            }
        }

        self.vehicles[vi].assigned_route = Some(route.clone());
        self.routes[ri].vehicle = Some(vehicle.clone());
        info!(
            route = %route,
            vehicle = %vehicle,
            status = ?self.routes[ri].status(),
            "vehicle assigned manually"
        );
        Ok(&self.routes[ri])
    }

    fn release_driver(&mut self, driver: &DriverId, route: &RouteId) {
        if let Some(d) = self.drivers.iter_mut().find(|d| d.id == *driver) {
            if d.assigned_route.as_ref() == Some(route) {
                d.assigned_route = None;
            }
        }
    }

    fn release_vehicle(&mut self, vehicle: &VehicleId, route: &RouteId) {
        if let Some(v) = self.vehicles.iter_mut().find(|v| v.id == *vehicle) {
            if v.assigned_route.as_ref() == Some(route) {
                v.assigned_route = None;
            }
        }
    }

    /// Moves `driver` out of its current pool and into `pool`, at the front.
    /// A full target leaves everything as it was.
    pub fn move_to_pool(&mut self, driver: &DriverId, pool: &VehicleType) -> Result<(), PlanError> {
        let di = self.driver_index(driver)?;
        let capacity = *self
            .demand
            .get(pool)
            .ok_or_else(|| PlanError::UnknownPool(pool.clone()))?;
        if !self.drivers[di].is_qualified_for(pool) {
            return Err(PlanError::NotQualified {
                driver: driver.clone(),
                vehicle_type: pool.clone(),
            });
        }

        // The driver's own slot in the target does not count against it.
        let occupied = self
            .pools
            .get(pool)
            .map_or(0, |members| members.iter().filter(|id| *id != driver).count());
        if occupied >= capacity as usize {
            return Err(PlanError::PoolFull {
                pool: pool.clone(),
                capacity,
            });
        }

        self.remove_from_pool(driver)?;
        self.pools
            .entry(pool.clone())
            .or_default()
            .insert(0, driver.clone());
        self.drivers[di].pool = Some(pool.clone());
        info!(driver = %driver, pool = %pool, "driver moved to pool");
        Ok(())
    }

    /// Returns whether the driver held a pool slot.
    pub fn remove_from_pool(&mut self, driver: &DriverId) -> Result<bool, PlanError> {
        let di = self.driver_index(driver)?;
        let mut removed = false;
        for members in self.pools.values_mut() {
            let before = members.len();
            members.retain(|id| id != driver);
            removed |= members.len() != before;
        }
        self.drivers[di].pool = None;
        Ok(removed)
    }

    /// Drivers without a pool slot, longest standby gap first.
    pub fn pool_standby(&self, tie_break: TieBreak) -> Vec<&Driver> {
        rank_by_fairness(&self.drivers, tie_break)
            .into_iter()
            .filter(|d| d.pool.is_none())
            .collect()
    }

    /// Drivers without a route, longest standby gap first.
    pub fn route_standby(&self, tie_break: TieBreak) -> Vec<&Driver> {
        rank_by_fairness(&self.drivers, tie_break)
            .into_iter()
            .filter(|d| d.assigned_route.is_none())
            .collect()
    }

    pub fn pool_stats(&self) -> PoolStats {
        let total_requested: u32 = self.demand.values().sum();
        let buckets: Vec<BucketStats> = self
            .demand
            .iter()
            .map(|(tag, requested)| BucketStats {
                vehicle_type: tag.clone(),
                assigned: self.pools.get(tag).map_or(0, Vec::len),
                requested: *requested,
            })
            .collect();

        PoolStats {
            total_requested,
            total_assigned: buckets.iter().map(|b| b.assigned).sum(),
            unpooled: self.drivers.iter().filter(|d| d.pool.is_none()).count(),
            projected_standby: self.drivers.len().saturating_sub(total_requested as usize),
            buckets,
        }
    }

    pub fn wave_stats(&self) -> WaveStats {
        WaveStats {
            routes: self.routes.len(),
            with_driver: self.routes.iter().filter(|r| r.driver.is_some()).count(),
            with_vehicle: self.routes.iter().filter(|r| r.vehicle.is_some()).count(),
            complete: self
                .routes
                .iter()
                .filter(|r| r.status() == RouteStatus::Complete)
                .count(),
            available_drivers: self
                .drivers
                .iter()
                .filter(|d| d.assigned_route.is_none())
                .count(),
            available_vehicles: self.vehicles.iter().filter(|v| v.is_available()).count(),
        }
    }
}
