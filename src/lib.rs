//! wave-planner core
//!
//! Fair driver pool allocation and DEP-scored driver/vehicle-to-route
//! assignment for one planning cycle of a delivery station.

pub mod model;
pub mod error;
pub mod traits;
pub mod fairness;
pub mod pools;
pub mod scoring;
pub mod solver;
pub mod state;
pub mod desk;
pub mod snapshot;
pub mod http;
pub mod finalize;
pub mod telemetry;
