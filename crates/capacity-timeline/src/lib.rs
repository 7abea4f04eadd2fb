//! Capacity Timeline Library
//!
//! Per-resource, per-time-step bookkeeping for mission contact planning:
//! which capacity channel holds which remote counterpart, in which phase
//! (preparation vs. active), and what activity state that implies.
//!
//! The timeline is allocated once for the full simulation window, mutated
//! only by the allocation pass, and read by every downstream query and
//! report for the remainder of the run.

use thiserror::Error;

pub mod occupant;
pub mod registry;
pub mod states;
pub mod store;

pub use occupant::{AssetId, Occupant};
pub use registry::{
    ElevationBounds, FrequencyBand, Link, LinkConfig, LinkId, Registry, Resource, ResourceConfig,
    ResourceId, SimulationWindow,
};
pub use states::{classify, ActivityState, LinkActivity};
pub use store::{CapacityTimeline, ChannelGrid};

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("invalid configuration for {designator}: {reason}")]
    InvalidConfig { designator: String, reason: String },
    #[error("no default elevation constraint on {designator} for counterpart {counterpart}")]
    MissingDefaultConstraint {
        designator: String,
        counterpart: String,
    },
    #[error("channel {channel} out of range on {designator} (capacity {capacity})")]
    ChannelOutOfRange {
        designator: String,
        channel: usize,
        capacity: usize,
    },
    #[error("time step {step} outside simulation window ({steps} steps)")]
    TimeOutOfRange { step: usize, steps: usize },
    #[error("cell (step {step}, channel {channel}) on {designator} already holds asset {occupant}")]
    CellOccupied {
        designator: String,
        step: usize,
        channel: usize,
        occupant: i32,
    },
    #[error("unknown designator: {0}")]
    UnknownDesignator(String),
    #[error("registry not finalized before allocation")]
    RegistryNotFinalized,
}

pub type Result<T> = std::result::Result<T, AllocationError>;
