//! Driver Experience Preference (DEP) scoring.
//!
//! Each driver ranks the five dimensions (Route, Wave, Pad, Vehicle, Type).
//! The dimension at position `i` is worth `5 - i` points when it matches the
//! driver's last route; an exact route-code match counts double. The scorer
//! folds the driver's order over a fixed table of matchers, so the order is
//! data rather than control flow.

use serde::Serialize;

use crate::model::{DepSymbol, Driver, LastRoute, Route, VehicleId};

type Matcher = fn(&LastRoute, &Route, Option<&VehicleId>) -> bool;

struct Dimension {
    symbol: DepSymbol,
    multiplier: u32,
    matches: Matcher,
}

const DIMENSIONS: [Dimension; 5] = [
    Dimension {
        symbol: DepSymbol::Route,
        multiplier: 2,
        matches: |last, route, _| last.route_code == route.route_code,
    },
    Dimension {
        symbol: DepSymbol::Wave,
        multiplier: 1,
        matches: |last, route, _| last.wave == route.wave,
    },
    Dimension {
        symbol: DepSymbol::Pad,
        multiplier: 1,
        matches: |last, route, _| last.pad == route.pad,
    },
    Dimension {
        symbol: DepSymbol::Vehicle,
        multiplier: 1,
        matches: |last, _, vehicle| vehicle.is_some_and(|id| *id == last.vehicle_id),
    },
    Dimension {
        symbol: DepSymbol::Type,
        multiplier: 1,
        matches: |last, route, _| last.vehicle_type == route.vehicle_type,
    },
];

/// Highest score any driver/route pair can reach (route preferred first).
pub const MAX_SCORE: u32 = 5 * 2 + 4 + 3 + 2 + 1;

fn dimension(symbol: DepSymbol) -> &'static Dimension {
    let index = match symbol {
        DepSymbol::Route => 0,
        DepSymbol::Wave => 1,
        DepSymbol::Pad => 2,
        DepSymbol::Vehicle => 3,
        DepSymbol::Type => 4,
    };
    &DIMENSIONS[index]
}

/// Points earned by one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub symbol: char,
    pub weight: u32,
    pub points: u32,
}

/// Per-dimension explanation of a score, in the driver's preference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub contributions: Vec<Contribution>,
    pub total: u32,
}

/// Score of `driver` for `route` with no concrete vehicle; the Vehicle
/// dimension contributes nothing.
pub fn score_match(driver: &Driver, route: &Route) -> u32 {
    score_with_vehicle(driver, route, None)
}

/// Score of `driver` for `route` when `vehicle` would run it.
pub fn score_with_vehicle(driver: &Driver, route: &Route, vehicle: Option<&VehicleId>) -> u32 {
    let Some(last) = &driver.last_route else {
        return 0;
    };

    let order = driver.dep_order.symbols();
    order.iter().enumerate().fold(0, |score, (position, symbol)| {
        let dim = dimension(*symbol);
        if (dim.matches)(last, route, vehicle) {
            score + (order.len() - position) as u32 * dim.multiplier
        } else {
            score
        }
    })
}

pub fn explain(driver: &Driver, route: &Route, vehicle: Option<&VehicleId>) -> ScoreBreakdown {
    let order = driver.dep_order.symbols();
    let contributions: Vec<Contribution> = order
        .iter()
        .enumerate()
        .map(|(position, symbol)| {
            let dim = dimension(*symbol);
            let weight = (order.len() - position) as u32;
            let matched = driver
                .last_route
                .as_ref()
                .is_some_and(|last| (dim.matches)(last, route, vehicle));
            Contribution {
                symbol: dim.symbol.as_char(),
                weight,
                points: if matched { weight * dim.multiplier } else { 0 },
            }
        })
        .collect();

    ScoreBreakdown {
        total: contributions.iter().map(|c| c.points).sum(),
        contributions,
    }
}
