//! Capacity timeline store
//!
//! One `ChannelGrid` per resource: a `steps x capacity` grid of
//! `Occupant` cells, sized once at setup and never resized. Writes are
//! confined to the single cell touched; a write that would displace a
//! different counterpart is refused rather than silently overwritten.

use crate::registry::{Registry, ResourceConfig, ResourceId};
use crate::{AllocationError, AssetId, Occupant, Result};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ChannelGrid {
    designator: String,
    capacity: usize,
    steps: usize,
    cells: Vec<Occupant>,
}

impl ChannelGrid {
    pub fn new(designator: impl Into<String>, capacity: usize, steps: usize) -> Self {
        Self {
            designator: designator.into(),
            capacity,
            steps,
            cells: vec![Occupant::Empty; capacity * steps],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn index(&self, step: usize, channel: usize) -> Result<usize> {
        if step >= self.steps {
            return Err(AllocationError::TimeOutOfRange {
                step,
                steps: self.steps,
            });
        }
        if channel >= self.capacity {
            return Err(AllocationError::ChannelOutOfRange {
                designator: self.designator.clone(),
                channel,
                capacity: self.capacity,
            });
        }
        Ok(step * self.capacity + channel)
    }

    /// Write an asset into a cell. Re-writing the identical occupant is
    /// idempotent; writing over a different one is an invariant violation.
    pub fn set(&mut self, step: usize, channel: usize, asset: AssetId, preparation: bool) -> Result<()> {
        let idx = self.index(step, channel)?;
        let next = if preparation {
            Occupant::Preparing(asset)
        } else {
            Occupant::Active(asset)
        };
        let current = self.cells[idx];
        if !current.is_empty() && current != next {
            return Err(AllocationError::CellOccupied {
                designator: self.designator.clone(),
                step,
                channel,
                occupant: current.encode(),
            });
        }
        trace!(
            "{}: step {} channel {} <- {}",
            self.designator,
            step,
            channel,
            next.encode()
        );
        self.cells[idx] = next;
        Ok(())
    }

    pub fn clear(&mut self, step: usize, channel: usize) -> Result<()> {
        let idx = self.index(step, channel)?;
        self.cells[idx] = Occupant::Empty;
        Ok(())
    }

    pub fn get(&self, step: usize, channel: usize) -> Result<Occupant> {
        let idx = self.index(step, channel)?;
        Ok(self.cells[idx])
    }

    /// Linear scan for the channel holding an asset at a step, matching
    /// both active and preparation phases. `None` when absent or the step
    /// is outside the window.
    pub fn find_channel(&self, step: usize, asset: AssetId) -> Option<usize> {
        if step >= self.steps {
            return None;
        }
        (0..self.capacity).find(|&ch| self.cells[step * self.capacity + ch].asset() == Some(asset))
    }

    /// Count of non-empty cells at a step (0 outside the window).
    pub fn occupied_count(&self, step: usize) -> usize {
        if step >= self.steps {
            return 0;
        }
        (0..self.capacity)
            .filter(|&ch| !self.cells[step * self.capacity + ch].is_empty())
            .count()
    }

    pub fn is_full(&self, step: usize) -> bool {
        self.capacity == 0 || self.occupied_count(step) == self.capacity
    }

    /// Dedicated-saturation variant: a resource whose dedicated set
    /// saturates its capacity reports full to any non-dedicated
    /// counterpart even while cells remain physically empty.
    pub fn is_full_for(&self, step: usize, counterpart: &str, config: &ResourceConfig) -> bool {
        if self.is_full(step) {
            return true;
        }
        config.dedicated.len() == self.capacity && !config.dedicated.contains(counterpart)
    }
}

/// All per-resource grids for one simulation run, indexed by `ResourceId`.
pub struct CapacityTimeline {
    grids: Vec<ChannelGrid>,
}

impl CapacityTimeline {
    /// Allocate grids for every registered resource at the window size.
    pub fn new(registry: &Registry) -> Self {
        let steps = registry.window.steps;
        let grids = registry
            .resources()
            .map(|r| ChannelGrid::new(r.designator(), r.config.capacity, steps))
            .collect();
        Self { grids }
    }

    pub fn grid(&self, id: ResourceId) -> &ChannelGrid {
        &self.grids[id.0 as usize]
    }

    pub fn grid_mut(&mut self, id: ResourceId) -> &mut ChannelGrid {
        &mut self.grids[id.0 as usize]
    }
}
