//! Activity state classifier
//!
//! Derives the per-(resource, time step) activity state from a timeline
//! cell plus static per-link flags. States are never stored; every query
//! recomputes them from the committed timeline, so they cannot drift out
//! of sync with it.

use crate::Occupant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Activity state of one channel at one time step.
///
/// Exactly one state holds per cell: `Empty` for a zero cell, one of the
/// preparation states for a negative cell, and one of the positive-cell
/// sub-states otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    /// Channel unused
    Empty,

    /// Preparation window with the counterpart geometrically in view
    PreparationInContact,

    /// Preparation window before the counterpart rises into view
    PreparationOutOfContact,

    /// Acquisition/start-up or teardown overhead around the mission window
    Overhead,

    /// Inside the link's declared mission window
    Mission,

    /// Buffer time allocated beyond the mission window
    Buffer,

    /// Wideband drop-link dump
    Droplink,

    /// State-of-health contact recovering from an SOH loss
    StateOfHealthLoss,
}

/// Per-link activity flags supplied by the external link/antenna
/// configuration. Step sets are absolute step indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkActivity {
    /// Inclusive mission window, if declared
    pub mission_window: Option<(usize, usize)>,

    pub overhead_steps: BTreeSet<usize>,
    pub buffer_steps: BTreeSet<usize>,
    pub droplink_steps: BTreeSet<usize>,
    pub soh_loss_steps: BTreeSet<usize>,

    /// Whether the drop-link dump radiates wideband (feeds the wideband
    /// conjunction check)
    pub droplink_wideband: bool,
}

impl LinkActivity {
    pub fn in_mission_window(&self, step: usize) -> bool {
        self.mission_window
            .map(|(start, end)| step >= start && step <= end)
            .unwrap_or(false)
    }
}

/// Classify one cell. Pure function of the cell, the counterpart's in-view
/// flag at the step, and the link's static flags.
///
/// Positive-cell precedence: SOH loss > droplink > buffer > overhead >
/// mission; an active cell matching no flag and no mission window is
/// treated as overhead.
pub fn classify(cell: Occupant, in_view: bool, link: &LinkActivity, step: usize) -> ActivityState {
    match cell {
        Occupant::Empty => ActivityState::Empty,
        Occupant::Preparing(_) => {
            if in_view {
                ActivityState::PreparationInContact
            } else {
                ActivityState::PreparationOutOfContact
            }
        }
        Occupant::Active(_) => {
            if link.soh_loss_steps.contains(&step) {
                ActivityState::StateOfHealthLoss
            } else if link.droplink_steps.contains(&step) {
                ActivityState::Droplink
            } else if link.buffer_steps.contains(&step) {
                ActivityState::Buffer
            } else if link.overhead_steps.contains(&step) {
                ActivityState::Overhead
            } else if link.in_mission_window(step) {
                ActivityState::Mission
            } else {
                ActivityState::Overhead
            }
        }
    }
}

pub fn is_allocated_mission(cell: Occupant, in_view: bool, link: &LinkActivity, step: usize) -> bool {
    classify(cell, in_view, link, step) == ActivityState::Mission
}

pub fn is_allocated_overhead(cell: Occupant, in_view: bool, link: &LinkActivity, step: usize) -> bool {
    classify(cell, in_view, link, step) == ActivityState::Overhead
}

pub fn is_allocated_buffer(cell: Occupant, in_view: bool, link: &LinkActivity, step: usize) -> bool {
    classify(cell, in_view, link, step) == ActivityState::Buffer
}

pub fn is_allocated_droplink(cell: Occupant, in_view: bool, link: &LinkActivity, step: usize) -> bool {
    classify(cell, in_view, link, step) == ActivityState::Droplink
}
