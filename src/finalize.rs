//! Finalizing a wave plan: the export handed to persistence and the driver
//! notifications derived from it.

use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::fairness::TieBreak;
use crate::model::{DriverId, PoolMap, RouteId, RouteStatus, VehicleId};
use crate::state::{AssignmentState, WaveStats};
use crate::traits::{Notifier, PlanSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeSettings {
    pub notify_routes: bool,
    pub notify_standby: bool,
}

impl Default for FinalizeSettings {
    fn default() -> Self {
        Self {
            notify_routes: true,
            notify_standby: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRoute {
    pub id: RouteId,
    pub route_code: String,
    pub wave: u32,
    pub pad: u32,
    pub pad_time: String,
    pub driver: Option<DriverId>,
    pub vehicle: Option<VehicleId>,
    pub status: RouteStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WavePlan {
    pub routes: Vec<PlannedRoute>,
    pub pools: PoolMap,
    /// Drivers without a route, longest standby gap first.
    pub standby: Vec<DriverId>,
    pub stats: WaveStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RouteDetails,
    Standby,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub driver: DriverId,
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finalized {
    pub plan: WavePlan,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: Vec<DriverId>,
}

pub fn finalize_plan(state: &AssignmentState, settings: FinalizeSettings) -> Finalized {
    let routes: Vec<PlannedRoute> = state
        .routes
        .iter()
        .map(|r| PlannedRoute {
            id: r.id.clone(),
            route_code: r.route_code.clone(),
            wave: r.wave,
            pad: r.pad,
            pad_time: r.pad_time.clone(),
            driver: r.driver.clone(),
            vehicle: r.vehicle.clone(),
            status: r.status(),
        })
        .collect();

    let standby: Vec<DriverId> = state
        .route_standby(TieBreak::InputOrder)
        .into_iter()
        .map(|d| d.id.clone())
        .collect();

    let mut notifications = Vec::new();
    if settings.notify_routes {
        for route in &routes {
            let Some(driver) = &route.driver else { continue };
            let vehicle = route
                .vehicle
                .as_ref()
                .map_or_else(|| "vehicle pending".to_string(), |v| format!("vehicle {v}"));
            notifications.push(Notification {
                driver: driver.clone(),
                kind: NotificationKind::RouteDetails,
                message: format!(
                    "Route {} - wave {}, pad {} at {}, {}",
                    route.route_code, route.wave, route.pad, route.pad_time, vehicle
                ),
            });
        }
    }
    if settings.notify_standby {
        notifications.extend(standby.iter().map(|driver| Notification {
            driver: driver.clone(),
            kind: NotificationKind::Standby,
            message: "You are on standby for this wave.".to_string(),
        }));
    }

    Finalized {
        plan: WavePlan {
            routes,
            pools: state.pools.clone(),
            standby,
            stats: state.wave_stats(),
        },
        notifications,
    }
}

/// Persists the plan, then delivers notifications. A failed delivery is
/// recorded and does not stop the rest.
pub fn publish<S, N>(
    finalized: &Finalized,
    sink: &S,
    notifier: &N,
) -> Result<PublishReport, S::Error>
where
    S: PlanSink,
    N: Notifier,
{
    sink.persist(&finalized.plan)?;

    let mut report = PublishReport::default();
    for notification in &finalized.notifications {
        match notifier.notify(notification) {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                warn!(driver = %notification.driver, error = %err, "notification failed");
                report.failed.push(notification.driver.clone());
            }
        }
    }

    info!(
        delivered = report.delivered,
        failed = report.failed.len(),
        "wave plan published"
    );
    Ok(report)
}

/// Writes the plan as pretty JSON.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    pub path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PlanSink for JsonFileSink {
    type Error = io::Error;

    fn persist(&self, plan: &WavePlan) -> Result<(), Self::Error> {
        let body = serde_json::to_string_pretty(plan)?;
        fs::write(&self.path, body)
    }
}

/// Logs notifications instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    type Error = Infallible;

    fn notify(&self, notification: &Notification) -> Result<(), Self::Error> {
        info!(
            driver = %notification.driver,
            kind = ?notification.kind,
            message = %notification.message,
            "notification"
        );
        Ok(())
    }
}
