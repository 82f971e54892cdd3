//! Fairness rotation: orders the roster so the driver who has gone longest
//! without a standby day is owed a route first.

use crate::model::Driver;

/// Secondary key for drivers with the same standby gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep roster order (stable sort).
    #[default]
    InputOrder,
    /// Ascending driver id, independent of how the roster was loaded.
    DriverId,
}

/// Descending `days_since_standby`. Pure; the roster is left untouched.
pub fn rank_by_fairness(drivers: &[Driver], tie_break: TieBreak) -> Vec<&Driver> {
    let mut ranked: Vec<&Driver> = drivers.iter().collect();
    match tie_break {
        TieBreak::InputOrder => {
            ranked.sort_by(|a, b| b.days_since_standby.cmp(&a.days_since_standby));
        }
        TieBreak::DriverId => {
            ranked.sort_by(|a, b| {
                b.days_since_standby
                    .cmp(&a.days_since_standby)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }
    ranked
}
