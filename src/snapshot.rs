//! Planning snapshots: the per-cycle input handed over by the data layer,
//! and the load-time validation that keeps malformed records out of the
//! planner.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InvalidInput, SnapshotError};
use crate::model::{Demand, Driver, Route, Vehicle, VehicleType};
use crate::state::AssignmentState;
use crate::traits::SnapshotSource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningSnapshot {
    pub drivers: Vec<Driver>,
    pub vehicles: Vec<Vehicle>,
    pub routes: Vec<Route>,
    #[serde(default)]
    pub demand: Demand,
}

impl PlanningSnapshot {
    /// Parses and validates. DEP orders are checked while parsing.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: PlanningSnapshot = serde_json::from_str(raw)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), InvalidInput> {
        let mut seen = HashSet::new();
        for driver in &self.drivers {
            if driver.qualifications.is_empty() {
                return Err(InvalidInput::EmptyQualifications(driver.id.clone()));
            }
            if !seen.insert(&driver.id) {
                return Err(InvalidInput::DuplicateDriver(driver.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for vehicle in &self.vehicles {
            if !seen.insert(&vehicle.id) {
                return Err(InvalidInput::DuplicateVehicle(vehicle.id.clone()));
            }
        }

        let known = self.known_vehicle_types();
        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(&route.id) {
                return Err(InvalidInput::DuplicateRoute(route.id.clone()));
            }
            if !known.contains(&route.vehicle_type) {
                return Err(InvalidInput::UnknownVehicleType {
                    route: route.id.clone(),
                    vehicle_type: route.vehicle_type.clone(),
                });
            }
        }

        self.validate_bindings()
    }

    /// Routes may arrive pre-assigned; each binding must name a known
    /// resource and no resource may be bound twice.
    fn validate_bindings(&self) -> Result<(), InvalidInput> {
        let mut bound_drivers = HashSet::new();
        let mut bound_vehicles = HashSet::new();
        for route in &self.routes {
            if let Some(driver) = &route.driver {
                if !self.drivers.iter().any(|d| d.id == *driver) {
                    return Err(InvalidInput::UnknownBoundDriver {
                        route: route.id.clone(),
                        driver: driver.clone(),
                    });
                }
                if !bound_drivers.insert(driver) {
                    return Err(InvalidInput::DriverBoundTwice(driver.clone()));
                }
            }
            if let Some(vehicle) = &route.vehicle {
                if !self.vehicles.iter().any(|v| v.id == *vehicle) {
                    return Err(InvalidInput::UnknownBoundVehicle {
                        route: route.id.clone(),
                        vehicle: vehicle.clone(),
                    });
                }
                if !bound_vehicles.insert(vehicle) {
                    return Err(InvalidInput::VehicleBoundTwice(vehicle.clone()));
                }
            }
        }
        Ok(())
    }

    /// Types present in the fleet, in any qualification, or in demand.
    fn known_vehicle_types(&self) -> HashSet<&VehicleType> {
        self.vehicles
            .iter()
            .map(|v| &v.vehicle_type)
            .chain(self.drivers.iter().flat_map(|d| d.qualifications.iter()))
            .chain(self.demand.keys())
            .collect()
    }

    pub fn into_state(self) -> AssignmentState {
        AssignmentState::new(self.drivers, self.vehicles, self.routes, self.demand)
    }
}

/// Reads a snapshot from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for JsonFileSource {
    fn load(&self) -> Result<PlanningSnapshot, SnapshotError> {
        let raw = fs::read_to_string(&self.path)?;
        let snapshot = PlanningSnapshot::from_json(&raw)?;
        debug!(
            path = %self.path.display(),
            drivers = snapshot.drivers.len(),
            vehicles = snapshot.vehicles.len(),
            routes = snapshot.routes.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}
