//! Test fixtures for wave-planner.
//!
//! Builders for drivers, vehicles and routes with sensible defaults, plus a
//! deterministic station roster for property-style checks.

#![allow(dead_code)]

use wave_planner::model::{
    Demand, Driver, DriverId, LastRoute, Route, RouteId, Vehicle, VehicleId, VehicleStatus,
    VehicleType,
};

#[derive(Clone, Debug)]
pub struct TestDriver {
    driver: Driver,
}

impl TestDriver {
    pub fn new(id: &str) -> Self {
        Self {
            driver: Driver::new(id, format!("Driver {id}")),
        }
    }

    pub fn days(mut self, days: u32) -> Self {
        self.driver.days_since_standby = days;
        self
    }

    pub fn qualified(mut self, types: &[&str]) -> Self {
        self.driver
            .qualifications
            .extend(types.iter().map(|t| VehicleType::new(*t)));
        self
    }

    pub fn dep(mut self, order: &str) -> Self {
        self.driver.dep_order = order.parse().expect("valid DEP order");
        self
    }

    pub fn last_route(
        mut self,
        code: &str,
        wave: u32,
        pad: u32,
        vehicle_type: &str,
        vehicle: &str,
    ) -> Self {
        self.driver.last_route = Some(LastRoute {
            route_code: code.to_string(),
            wave,
            pad,
            vehicle_type: VehicleType::new(vehicle_type),
            vehicle_id: VehicleId::new(vehicle),
        });
        self
    }

    pub fn in_pool(mut self, pool: &str) -> Self {
        self.driver.pool = Some(VehicleType::new(pool));
        self
    }

    pub fn build(self) -> Driver {
        self.driver
    }
}

#[derive(Clone, Debug)]
pub struct TestRoute {
    route: Route,
}

impl TestRoute {
    pub fn new(id: &str, code: &str, vehicle_type: &str) -> Self {
        Self {
            route: Route::new(id, code, vehicle_type),
        }
    }

    pub fn wave(mut self, wave: u32) -> Self {
        self.route.wave = wave;
        self
    }

    pub fn pad(mut self, pad: u32) -> Self {
        self.route.pad = pad;
        self
    }

    pub fn pad_time(mut self, time: &str) -> Self {
        self.route.pad_time = time.to_string();
        self
    }

    pub fn build(self) -> Route {
        self.route
    }
}

pub fn vehicle(id: &str, vehicle_type: &str) -> Vehicle {
    Vehicle::new(id, vehicle_type)
}

pub fn vehicle_with_status(id: &str, vehicle_type: &str, status: VehicleStatus) -> Vehicle {
    Vehicle {
        status,
        ..Vehicle::new(id, vehicle_type)
    }
}

pub fn demand(entries: &[(&str, u32)]) -> Demand {
    entries
        .iter()
        .map(|(tag, count)| (VehicleType::new(*tag), *count))
        .collect()
}

pub fn tag(value: &str) -> VehicleType {
    VehicleType::new(value)
}

pub fn did(value: &str) -> DriverId {
    DriverId::new(value)
}

pub fn vid(value: &str) -> VehicleId {
    VehicleId::new(value)
}

pub fn rid(value: &str) -> RouteId {
    RouteId::new(value)
}

pub fn ids(drivers: &[DriverId]) -> Vec<&str> {
    drivers.iter().map(DriverId::as_str).collect()
}

/// Forty drivers with a spread of standby gaps and qualification mixes.
/// Values are derived from the index so every run sees the same roster.
pub fn station_roster() -> Vec<Driver> {
    const MIXES: [&[&str]; 5] = [
        &["EDV"],
        &["EDV", "PRIME"],
        &["STANDARD"],
        &["STANDARD", "XL"],
        &["EDV", "PRIME", "STANDARD", "XL"],
    ];
    const DEPS: [&str; 6] = ["RWPVT", "WRPVT", "RPWVT", "VTWRP", "TWRVP", "PVRWT"];

    (0..40)
        .map(|i| {
            TestDriver::new(&format!("D{i:02}"))
                .days((i * 7 % 15) as u32)
                .qualified(MIXES[i % MIXES.len()])
                .dep(DEPS[i % DEPS.len()])
                .last_route(
                    &format!("CX{}", i % 12 + 1),
                    (i % 2 + 1) as u32,
                    (i % 3 + 1) as u32,
                    MIXES[i % MIXES.len()][0],
                    &format!("V{}", i % 9 + 1),
                )
                .build()
        })
        .collect()
}
