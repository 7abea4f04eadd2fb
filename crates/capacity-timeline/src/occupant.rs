//! Channel occupant encoding
//!
//! A timeline cell is either empty, held by an active counterpart, or held
//! by a counterpart inside its preparation window. The legacy wire format
//! packs all three into one signed integer (0 empty, +n active, -n
//! preparing); internally the tagged enum is authoritative and the signed
//! form exists only at the serialization boundary.

use serde::{Deserialize, Serialize};

/// 1-based counterpart number within a resource's allocator.
///
/// Asset numbers are assigned in designator lexical order at registry
/// build, so ascending asset order and designator order coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u16);

impl AssetId {
    pub fn index(self) -> usize {
        (self.0 as usize) - 1
    }
}

/// State of one (time step, channel) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    /// Channel unused at this step
    Empty,

    /// Counterpart actively transmitting/receiving
    Active(AssetId),

    /// Channel reserved ahead of activation, not yet radiating
    Preparing(AssetId),
}

impl Occupant {
    /// Signed wire encoding: 0 empty, +n active, -n preparing.
    pub fn encode(self) -> i32 {
        match self {
            Occupant::Empty => 0,
            Occupant::Active(a) => i32::from(a.0),
            Occupant::Preparing(a) => -i32::from(a.0),
        }
    }

    /// Decode the signed wire form. `None` if the magnitude cannot be a
    /// valid asset number.
    pub fn decode(raw: i32) -> Option<Occupant> {
        if raw == 0 {
            return Some(Occupant::Empty);
        }
        let magnitude = raw.unsigned_abs();
        if magnitude > u32::from(u16::MAX) {
            return None;
        }
        let asset = AssetId(magnitude as u16);
        if raw > 0 {
            Some(Occupant::Active(asset))
        } else {
            Some(Occupant::Preparing(asset))
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Occupant::Empty)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Occupant::Active(_))
    }

    pub fn is_preparing(self) -> bool {
        matches!(self, Occupant::Preparing(_))
    }

    /// The occupying asset, regardless of phase.
    pub fn asset(self) -> Option<AssetId> {
        match self {
            Occupant::Empty => None,
            Occupant::Active(a) | Occupant::Preparing(a) => Some(a),
        }
    }
}
