//! Feasibility constraint evaluation
//!
//! Stateless predicates over a resource's static configuration and a
//! candidate counterpart. Each constraint is evaluated independently; the
//! allocation pass combines them with AND semantics through
//! `check_candidate` before treating a candidate as eligible.

use capacity_timeline::{AllocationError, ElevationBounds, ResourceConfig, Result};
use serde::Serialize;

/// Why a candidate was rejected at a time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// Counterpart is on the resource's precluded list
    Precluded,

    /// Resource is fully dedicated to other counterparts
    DedicatedOnly,

    /// Pointing angle falls outside the gimbal travel limits
    GimbalStop,

    /// More active candidates than free channels at this step
    CapacityExhausted,

    /// Committing the channel would radiate within another link's
    /// angular separation limit
    Conjunction,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::Precluded => "precluded counterpart",
            RejectReason::DedicatedOnly => "resource dedicated to other counterparts",
            RejectReason::GimbalStop => "outside gimbal stop",
            RejectReason::CapacityExhausted => "capacity exhausted",
            RejectReason::Conjunction => "conjunction with a committed link",
        };
        f.write_str(s)
    }
}

/// Counterpart is in the resource's dedicated set.
pub fn is_dedicated_transmitter(config: &ResourceConfig, counterpart: &str) -> bool {
    config.dedicated.contains(counterpart)
}

/// Counterpart is never eligible on this resource.
pub fn is_precluded_receiver(config: &ResourceConfig, counterpart: &str) -> bool {
    config.precluded.contains(counterpart)
}

/// The dedicated set saturates the resource's capacity and `counterpart`
/// is not in it: the candidate must yield to the dedicated users.
pub fn is_non_fully_dedicated(config: &ResourceConfig, counterpart: &str) -> bool {
    !config.dedicated.is_empty()
        && config.dedicated.len() == config.capacity
        && !config.dedicated.contains(counterpart)
}

/// Angle falls outside the gimbal travel limits. An unset bound leaves
/// that side unconstrained.
pub fn is_outside_gimbal_stop(config: &ResourceConfig, angle_deg: f64) -> bool {
    if let Some(min) = config.gimbal_min_deg {
        if angle_deg < min {
            return true;
        }
    }
    if let Some(max) = config.gimbal_max_deg {
        if angle_deg > max {
            return true;
        }
    }
    false
}

/// Elevation bounds for a counterpart: the per-counterpart override if
/// present, else the resource default. A query with neither configured is
/// a setup error (the mandatory-default-before-override rule).
pub fn elevation_bounds(config: &ResourceConfig, counterpart: &str) -> Result<ElevationBounds> {
    if let Some(bounds) = config.elevation_overrides.get(counterpart) {
        return Ok(*bounds);
    }
    config
        .elevation_default
        .ok_or_else(|| AllocationError::MissingDefaultConstraint {
            designator: config.designator.clone(),
            counterpart: counterpart.to_string(),
        })
}

/// AND-combination of the per-candidate constraints. `None` means the
/// candidate is eligible; `Some` carries the first failing constraint.
pub fn check_candidate(
    config: &ResourceConfig,
    counterpart: &str,
    pointing_deg: Option<f64>,
) -> Option<RejectReason> {
    if is_precluded_receiver(config, counterpart) {
        return Some(RejectReason::Precluded);
    }
    if is_non_fully_dedicated(config, counterpart) {
        return Some(RejectReason::DedicatedOnly);
    }
    if config.has_gimbal_stops() {
        if let Some(angle) = pointing_deg {
            if is_outside_gimbal_stop(config, angle) {
                return Some(RejectReason::GimbalStop);
            }
        }
    }
    None
}
