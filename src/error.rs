//! Error types.
//!
//! Shortfalls (unfilled buckets, routes left without a driver or vehicle)
//! are reported as data on the allocation and assignment outcomes and never
//! show up here.

use crate::model::{DriverId, RouteId, VehicleId, VehicleStatus, VehicleType};
use crate::telemetry::TelemetryError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DepOrderError {
    #[error("DEP order '{value}' must have exactly 5 symbols, found {len}")]
    WrongLength { value: String, len: usize },
    #[error("unknown DEP symbol '{0}' (expected one of R, W, P, V, T)")]
    UnknownSymbol(char),
    #[error("DEP symbol '{0}' appears more than once")]
    Repeated(char),
}

/// Malformed planning input, rejected when a snapshot is loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("driver {0} has no vehicle-type qualifications")]
    EmptyQualifications(DriverId),
    #[error("driver id {0} appears more than once")]
    DuplicateDriver(DriverId),
    #[error("vehicle id {0} appears more than once")]
    DuplicateVehicle(VehicleId),
    #[error("route id {0} appears more than once")]
    DuplicateRoute(RouteId),
    #[error("route {route} requires unknown vehicle type {vehicle_type}")]
    UnknownVehicleType {
        route: RouteId,
        vehicle_type: VehicleType,
    },
    #[error("route {route} is bound to driver {driver}, who is not on the roster")]
    UnknownBoundDriver { route: RouteId, driver: DriverId },
    #[error("route {route} is bound to vehicle {vehicle}, which is not in the fleet")]
    UnknownBoundVehicle { route: RouteId, vehicle: VehicleId },
    #[error("driver {0} is bound to more than one route")]
    DriverBoundTwice(DriverId),
    #[error("vehicle {0} is bound to more than one route")]
    VehicleBoundTwice(VehicleId),
}

/// Failures of manual overrides and of the concurrent planning desk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("route {0} is not part of this cycle")]
    UnknownRoute(RouteId),
    #[error("driver {0} is not on the roster")]
    UnknownDriver(DriverId),
    #[error("vehicle {0} is not in the fleet")]
    UnknownVehicle(VehicleId),
    #[error("no demand bucket for vehicle type {0}")]
    UnknownPool(VehicleType),
    #[error("driver {driver} is not qualified for {vehicle_type}")]
    NotQualified {
        driver: DriverId,
        vehicle_type: VehicleType,
    },
    #[error("vehicle {vehicle} is {status:?}, only active vehicles can be assigned")]
    VehicleNotActive {
        vehicle: VehicleId,
        status: VehicleStatus,
    },
    #[error("pool {pool} is full ({capacity} requested)")]
    PoolFull { pool: VehicleType, capacity: u32 },
    #[error("{0} is being modified by another request, retry")]
    Busy(String),
}

impl PlanError {
    /// Only lock conflicts are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlanError::Busy(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid snapshot: {0}")]
    Invalid(#[from] InvalidInput),
}

/// Top-level error of the `wave-planner` binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("failed to write plan: {0}")]
    Export(#[source] std::io::Error),
    #[error("{0}")]
    Usage(String),
}
