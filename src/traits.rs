//! Seams to the collaborators around the planner.
//!
//! Loading, persistence and notification delivery live outside this crate.
//! Apps implement these traits for their own backends; the planner itself
//! only ever sees plain records.

use std::error::Error;

use crate::error::SnapshotError;
use crate::finalize::{Notification, WavePlan};
use crate::snapshot::PlanningSnapshot;

/// Supplies the records for one planning cycle.
pub trait SnapshotSource {
    fn load(&self) -> Result<PlanningSnapshot, SnapshotError>;
}

/// Persists a finalized wave plan.
pub trait PlanSink {
    type Error: Error;

    fn persist(&self, plan: &WavePlan) -> Result<(), Self::Error>;
}

/// Delivers a single driver notification (SMS, in-app, ...).
pub trait Notifier {
    type Error: Error;

    fn notify(&self, notification: &Notification) -> Result<(), Self::Error>;
}
