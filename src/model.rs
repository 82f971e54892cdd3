//! Planning records: drivers, vehicles, routes and the demand buckets that
//! tie them together for one planning cycle.
//!
//! Every record is loaded fresh per cycle by a collaborator (see
//! [`crate::traits::SnapshotSource`]); the planner only mutates the
//! assignment fields (`pool`, `assigned_route`, `driver`, `vehicle`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DepOrderError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Roster identifier of a driver.
    DriverId
);
string_id!(
    /// Fleet identifier of a vehicle.
    VehicleId
);
string_id!(
    /// Identifier of a route within the current cycle.
    RouteId
);
string_id!(
    /// Vehicle-type tag (e.g. `EDV`, `XL`). Tags both demand buckets and
    /// driver qualifications.
    VehicleType
);

/// Requested driver count per vehicle-type bucket.
pub type Demand = BTreeMap<VehicleType, u32>;

/// Drivers currently filling each bucket, in placement order.
pub type PoolMap = BTreeMap<VehicleType, Vec<DriverId>>;

/// One of the five Driver Experience Preference dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepSymbol {
    Route,
    Wave,
    Pad,
    Vehicle,
    Type,
}

impl DepSymbol {
    pub const ALL: [DepSymbol; 5] = [
        DepSymbol::Route,
        DepSymbol::Wave,
        DepSymbol::Pad,
        DepSymbol::Vehicle,
        DepSymbol::Type,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(Self::Route),
            'W' => Some(Self::Wave),
            'P' => Some(Self::Pad),
            'V' => Some(Self::Vehicle),
            'T' => Some(Self::Type),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Route => 'R',
            Self::Wave => 'W',
            Self::Pad => 'P',
            Self::Vehicle => 'V',
            Self::Type => 'T',
        }
    }
}

/// A driver's ranking over the five DEP dimensions, most preferred first.
///
/// Always a permutation of [`DepSymbol::ALL`]; construction goes through
/// [`FromStr`] so a malformed order never reaches the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DepOrder([DepSymbol; 5]);

impl DepOrder {
    pub fn symbols(&self) -> &[DepSymbol; 5] {
        &self.0
    }

    /// Zero-based rank of `symbol` in this order.
    pub fn position(&self, symbol: DepSymbol) -> usize {
        self.0.iter().position(|s| *s == symbol).unwrap_or(self.0.len())
    }
}

impl Default for DepOrder {
    fn default() -> Self {
        Self(DepSymbol::ALL)
    }
}

impl FromStr for DepOrder {
    type Err = DepOrderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = raw.trim().chars().collect();
        if chars.len() != DepSymbol::ALL.len() {
            return Err(DepOrderError::WrongLength {
                value: raw.to_string(),
                len: chars.len(),
            });
        }

        let mut symbols = DepSymbol::ALL;
        for (slot, c) in symbols.iter_mut().zip(&chars) {
            *slot = DepSymbol::from_char(*c).ok_or(DepOrderError::UnknownSymbol(*c))?;
        }

        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(DepOrderError::Repeated(symbol.as_char()));
            }
        }

        Ok(Self(symbols))
    }
}

impl TryFrom<String> for DepOrder {
    type Error = DepOrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DepOrder> for String {
    fn from(value: DepOrder) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DepOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.0 {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

/// The driver's most recent historical assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRoute {
    pub route_code: String,
    pub wave: u32,
    pub pad: u32,
    pub vehicle_type: VehicleType,
    pub vehicle_id: VehicleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub qualifications: BTreeSet<VehicleType>,
    pub days_since_standby: u32,
    pub dep_order: DepOrder,
    #[serde(default)]
    pub last_route: Option<LastRoute>,
    /// Demand bucket the driver currently fills, if any.
    #[serde(default)]
    pub pool: Option<VehicleType>,
    #[serde(default)]
    pub assigned_route: Option<RouteId>,
}

impl Driver {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DriverId::new(id),
            name: name.into(),
            qualifications: BTreeSet::new(),
            days_since_standby: 0,
            dep_order: DepOrder::default(),
            last_route: None,
            pool: None,
            assigned_route: None,
        }
    }

    pub fn is_qualified_for(&self, vehicle_type: &VehicleType) -> bool {
        self.qualifications.contains(vehicle_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    Grounded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub status: VehicleStatus,
    #[serde(default)]
    pub assigned_route: Option<RouteId>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, vehicle_type: impl Into<String>) -> Self {
        Self {
            id: VehicleId::new(id),
            vehicle_type: VehicleType::new(vehicle_type),
            status: VehicleStatus::Active,
            assigned_route: None,
        }
    }

    /// Active and not bound to any route.
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Active && self.assigned_route.is_none()
    }
}

/// Derived completeness of a route's assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Incomplete,
    Warning,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    pub route_code: String,
    pub vehicle_type: VehicleType,
    pub wave: u32,
    pub pad: u32,
    pub pad_time: String,
    pub packages: u32,
    #[serde(default)]
    pub driver: Option<DriverId>,
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        route_code: impl Into<String>,
        vehicle_type: impl Into<String>,
    ) -> Self {
        Self {
            id: RouteId::new(id),
            route_code: route_code.into(),
            vehicle_type: VehicleType::new(vehicle_type),
            wave: 1,
            pad: 1,
            pad_time: String::new(),
            packages: 0,
            driver: None,
            vehicle: None,
        }
    }

    pub fn status(&self) -> RouteStatus {
        match (self.driver.is_some(), self.vehicle.is_some()) {
            (true, true) => RouteStatus::Complete,
            (false, false) => RouteStatus::Incomplete,
            _ => RouteStatus::Warning,
        }
    }
}
