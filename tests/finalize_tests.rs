//! Snapshot loading, finalization and publishing tests

mod fixtures;

use std::cell::RefCell;
use std::fmt;
use std::fs;

use wave_planner::error::{InvalidInput, SnapshotError};
use wave_planner::finalize::{
    FinalizeSettings, JsonFileSink, Notification, NotificationKind, WavePlan, finalize_plan,
    publish,
};
use wave_planner::model::{RouteStatus, VehicleStatus};
use wave_planner::snapshot::{JsonFileSource, PlanningSnapshot};
use wave_planner::solver::{PlannerOptions, run_cycle};
use wave_planner::state::{AssignmentState, Resource};
use wave_planner::traits::{Notifier, PlanSink, SnapshotSource};

use fixtures::*;

const SNAPSHOT: &str = r#"{
  "drivers": [
    {
      "id": "D1",
      "name": "Ana",
      "qualifications": ["EDV"],
      "daysSinceStandby": 4,
      "depOrder": "WRPVT",
      "lastRoute": {
        "routeCode": "CX5",
        "wave": 1,
        "pad": 9,
        "vehicleType": "PRIME",
        "vehicleId": "V1"
      }
    },
    {
      "id": "D2",
      "name": "Bo",
      "qualifications": ["EDV", "XL"],
      "daysSinceStandby": 1,
      "depOrder": "rwpvt"
    }
  ],
  "vehicles": [
    { "id": "V1", "type": "EDV", "status": "active" },
    { "id": "V2", "type": "XL", "status": "maintenance" }
  ],
  "routes": [
    {
      "id": "R1",
      "routeCode": "CX5",
      "vehicleType": "EDV",
      "wave": 1,
      "pad": 2,
      "padTime": "10:20",
      "packages": 212
    }
  ],
  "demand": { "EDV": 1 }
}"#;

#[derive(Debug)]
struct Rejected;

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rejected")
    }
}

impl std::error::Error for Rejected {}

#[derive(Default)]
struct RecordingSink {
    plans: RefCell<Vec<WavePlan>>,
    fail: bool,
}

impl PlanSink for RecordingSink {
    type Error = Rejected;

    fn persist(&self, plan: &WavePlan) -> Result<(), Self::Error> {
        if self.fail {
            return Err(Rejected);
        }
        self.plans.borrow_mut().push(plan.clone());
        Ok(())
    }
}

/// Fails for one driver, records everything else.
#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<Notification>>,
    unreachable: Option<&'static str>,
}

impl Notifier for RecordingNotifier {
    type Error = Rejected;

    fn notify(&self, notification: &Notification) -> Result<(), Self::Error> {
        if self.unreachable == Some(notification.driver.as_str()) {
            return Err(Rejected);
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

fn planned_station() -> AssignmentState {
    let drivers = vec![
        TestDriver::new("D1").days(5).qualified(&["EDV"]).build(),
        TestDriver::new("D2").days(3).qualified(&["XL"]).build(),
        TestDriver::new("D3").days(8).qualified(&["STANDARD"]).build(),
        TestDriver::new("D4").days(1).qualified(&["STANDARD"]).build(),
    ];
    let vehicles = vec![vehicle("V1", "EDV")];
    let routes = vec![
        TestRoute::new("R1", "CX1", "EDV").wave(2).pad(4).pad_time("10:40").build(),
        TestRoute::new("R2", "CX2", "XL").wave(1).pad(3).pad_time("10:05").build(),
    ];
    let demand = demand(&[("EDV", 1), ("XL", 1)]);
    let mut state = AssignmentState::new(drivers, vehicles, routes, demand);
    run_cycle(&mut state, &PlannerOptions::default(), true);
    state
}

#[test]
fn snapshot_parses_and_builds_state() {
    let snapshot = PlanningSnapshot::from_json(SNAPSHOT).expect("valid snapshot");

    assert_eq!(snapshot.drivers.len(), 2);
    assert_eq!(snapshot.drivers[1].dep_order.to_string(), "RWPVT");
    assert!(snapshot.drivers[1].last_route.is_none());

    let mut state = snapshot.into_state();
    assert!(state.pools[&tag("EDV")].is_empty());

    let report = run_cycle(&mut state, &PlannerOptions::default(), true);
    assert_eq!(ids(&report.pools.pools[&tag("EDV")]), ["D1"]);
    let route = state.route(&rid("R1")).unwrap();
    assert_eq!(route.driver, Some(did("D1")));
    assert_eq!(route.vehicle, Some(vid("V1")));
}

#[test]
fn bad_dep_order_fails_parsing() {
    let raw = SNAPSHOT.replace("\"WRPVT\"", "\"WRPVX\"");

    let err = PlanningSnapshot::from_json(&raw).unwrap_err();

    assert!(matches!(err, SnapshotError::Json(_)), "got {err:?}");
    assert!(err.to_string().contains("unknown DEP symbol 'X'"), "got {err}");
}

#[test]
fn validation_rejects_malformed_records() {
    let mut snapshot = PlanningSnapshot::from_json(SNAPSHOT).expect("valid snapshot");

    let mut duplicate = snapshot.clone();
    duplicate.drivers[1].id = did("D1");
    assert_eq!(duplicate.validate(), Err(InvalidInput::DuplicateDriver(did("D1"))));

    let mut duplicate = snapshot.clone();
    duplicate.vehicles[1].id = vid("V1");
    assert_eq!(duplicate.validate(), Err(InvalidInput::DuplicateVehicle(vid("V1"))));

    let mut duplicate = snapshot.clone();
    duplicate.routes.push(duplicate.routes[0].clone());
    assert_eq!(duplicate.validate(), Err(InvalidInput::DuplicateRoute(rid("R1"))));

    let mut unknown = snapshot.clone();
    unknown.routes[0].vehicle_type = tag("CARGO_BIKE");
    assert_eq!(
        unknown.validate(),
        Err(InvalidInput::UnknownVehicleType {
            route: rid("R1"),
            vehicle_type: tag("CARGO_BIKE"),
        })
    );

    snapshot.drivers[0].qualifications.clear();
    assert_eq!(snapshot.validate(), Err(InvalidInput::EmptyQualifications(did("D1"))));
}

#[test]
fn route_types_known_only_from_demand_are_accepted() {
    let mut snapshot = PlanningSnapshot::from_json(SNAPSHOT).expect("valid snapshot");
    snapshot.demand.insert(tag("PRIME"), 0);
    snapshot.routes[0].vehicle_type = tag("PRIME");

    assert_eq!(snapshot.validate(), Ok(()));
}

#[test]
fn preassigned_route_binds_its_driver_and_vehicle() {
    let mut snapshot = PlanningSnapshot::from_json(SNAPSHOT).expect("valid snapshot");
    snapshot.vehicles[1].status = VehicleStatus::Active;
    snapshot.routes[0].driver = Some(did("D1"));
    snapshot.routes[0].vehicle = Some(vid("V1"));
    let mut second = snapshot.routes[0].clone();
    second.id = rid("R2");
    second.route_code = "CX6".to_string();
    second.driver = None;
    second.vehicle = None;
    snapshot.routes.push(second);
    assert_eq!(snapshot.validate(), Ok(()));

    let mut state = snapshot.into_state();
    assert_eq!(state.driver(&did("D1")).unwrap().assigned_route, Some(rid("R1")));
    assert_eq!(state.vehicle(&vid("V1")).unwrap().assigned_route, Some(rid("R1")));

    run_cycle(&mut state, &PlannerOptions::default(), true);

    let r2 = state.route(&rid("R2")).unwrap();
    assert_eq!(r2.driver, Some(did("D2")));
    assert_eq!(r2.vehicle, Some(vid("V2")));
    let d1_routes = state
        .routes
        .iter()
        .filter(|r| r.driver == Some(did("D1")))
        .count();
    assert_eq!(d1_routes, 1);
}

#[test]
fn stale_back_references_are_replaced_by_route_bindings() {
    let mut stale = TestDriver::new("D1").qualified(&["EDV"]).build();
    stale.assigned_route = Some(rid("R9"));
    let mut route = TestRoute::new("R1", "CX1", "EDV").build();
    route.vehicle = Some(vid("V1"));

    let vehicles = vec![vehicle("V1", "EDV")];
    let state = AssignmentState::new(vec![stale], vehicles, vec![route], demand(&[]));

    assert_eq!(state.driver(&did("D1")).unwrap().assigned_route, None);
    assert_eq!(state.vehicle(&vid("V1")).unwrap().assigned_route, Some(rid("R1")));
}

#[test]
fn validation_rejects_broken_route_bindings() {
    let mut snapshot = PlanningSnapshot::from_json(SNAPSHOT).expect("valid snapshot");
    let mut second = snapshot.routes[0].clone();
    second.id = rid("R2");
    snapshot.routes.push(second);

    let mut unknown = snapshot.clone();
    unknown.routes[0].driver = Some(did("D9"));
    assert_eq!(
        unknown.validate(),
        Err(InvalidInput::UnknownBoundDriver {
            route: rid("R1"),
            driver: did("D9"),
        })
    );

    let mut unknown = snapshot.clone();
    unknown.routes[1].vehicle = Some(vid("V9"));
    assert_eq!(
        unknown.validate(),
        Err(InvalidInput::UnknownBoundVehicle {
            route: rid("R2"),
            vehicle: vid("V9"),
        })
    );

    let mut twice = snapshot.clone();
    twice.routes[0].driver = Some(did("D1"));
    twice.routes[1].driver = Some(did("D1"));
    assert_eq!(twice.validate(), Err(InvalidInput::DriverBoundTwice(did("D1"))));

    let mut twice = snapshot.clone();
    twice.routes[0].vehicle = Some(vid("V1"));
    twice.routes[1].vehicle = Some(vid("V1"));
    assert_eq!(twice.validate(), Err(InvalidInput::VehicleBoundTwice(vid("V1"))));
}

#[test]
fn finalized_plan_lists_routes_and_standby() {
    let state = planned_station();

    let finalized = finalize_plan(&state, FinalizeSettings::default());
    let plan = &finalized.plan;

    assert_eq!(plan.routes[0].driver, Some(did("D1")));
    assert_eq!(plan.routes[0].status, RouteStatus::Complete);
    assert_eq!(plan.routes[1].driver, Some(did("D2")));
    assert_eq!(plan.routes[1].status, RouteStatus::Warning);
    assert_eq!(ids(&plan.standby), ["D3", "D4"]);
    assert_eq!(plan.stats.complete, 1);
    assert_eq!(plan.pools, state.pools);
}

#[test]
fn notifications_cover_routes_then_standby() {
    let state = planned_station();

    let finalized = finalize_plan(&state, FinalizeSettings::default());
    let messages: Vec<(&str, NotificationKind, &str)> = finalized
        .notifications
        .iter()
        .map(|n| (n.driver.as_str(), n.kind, n.message.as_str()))
        .collect();

    assert_eq!(
        messages,
        [
            (
                "D1",
                NotificationKind::RouteDetails,
                "Route CX1 - wave 2, pad 4 at 10:40, vehicle V1",
            ),
            (
                "D2",
                NotificationKind::RouteDetails,
                "Route CX2 - wave 1, pad 3 at 10:05, vehicle pending",
            ),
            ("D3", NotificationKind::Standby, "You are on standby for this wave."),
            ("D4", NotificationKind::Standby, "You are on standby for this wave."),
        ]
    );
}

#[test]
fn notification_settings_gate_each_kind() {
    let state = planned_station();

    let routes_only = finalize_plan(
        &state,
        FinalizeSettings {
            notify_routes: true,
            notify_standby: false,
        },
    );
    assert!(routes_only.notifications.iter().all(|n| n.kind == NotificationKind::RouteDetails));
    assert_eq!(routes_only.notifications.len(), 2);

    let silent = finalize_plan(
        &state,
        FinalizeSettings {
            notify_routes: false,
            notify_standby: false,
        },
    );
    assert!(silent.notifications.is_empty());
    assert_eq!(silent.plan, routes_only.plan);
}

#[test]
fn publish_persists_then_notifies_and_records_failures() {
    let state = planned_station();
    let finalized = finalize_plan(&state, FinalizeSettings::default());
    let sink = RecordingSink::default();
    let notifier = RecordingNotifier {
        unreachable: Some("D3"),
        ..RecordingNotifier::default()
    };

    let report = publish(&finalized, &sink, &notifier).expect("sink accepts");

    assert_eq!(sink.plans.borrow().as_slice(), [finalized.plan.clone()]);
    assert_eq!(report.delivered, 3);
    assert_eq!(ids(&report.failed), ["D3"]);
    assert_eq!(notifier.sent.borrow().len(), 3);
}

#[test]
fn failed_persist_sends_nothing() {
    let state = planned_station();
    let finalized = finalize_plan(&state, FinalizeSettings::default());
    let sink = RecordingSink {
        fail: true,
        ..RecordingSink::default()
    };
    let notifier = RecordingNotifier::default();

    assert!(publish(&finalized, &sink, &notifier).is_err());
    assert!(notifier.sent.borrow().is_empty());
}

#[test]
fn json_files_round_trip_through_source_and_sink() {
    let dir = std::env::temp_dir().join(format!("wave-planner-test-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir");
    let snapshot_path = dir.join("snapshot.json");
    let plan_path = dir.join("plan.json");
    fs::write(&snapshot_path, SNAPSHOT).expect("write snapshot");

    let mut state = JsonFileSource::new(&snapshot_path)
        .load()
        .expect("load snapshot")
        .into_state();
    state
        .manual_assign(&rid("R1"), Resource::Driver(did("D2")))
        .expect("qualified driver");
    let finalized = finalize_plan(&state, FinalizeSettings::default());
    JsonFileSink::new(&plan_path)
        .persist(&finalized.plan)
        .expect("write plan");

    let raw = fs::read_to_string(&plan_path).expect("read plan");
    let written: serde_json::Value = serde_json::from_str(&raw).expect("plan json");
    assert_eq!(written["routes"][0]["driver"], "D2");
    assert_eq!(written["routes"][0]["status"], "warning");
    assert_eq!(written["routes"][0]["padTime"], "10:20");
    assert_eq!(written["standby"][0], "D1");

    let missing = JsonFileSource::new(dir.join("missing.json")).load().unwrap_err();
    assert!(matches!(missing, SnapshotError::Io(_)));

    fs::remove_dir_all(&dir).ok();
}
