//! Best-fit channel assignment
//!
//! Converts per-step "link is active" signals into committed channel
//! numbers for one resource, processing time steps strictly in increasing
//! order. A counterpart keeps its previous channel while active, and its
//! channel stays reserved across idle gaps of up to `switch_threshold`
//! steps. New assignments prefer the preferenced channel range until that
//! range is saturated over a trailing window, and must clear the
//! conjunction check against the committed timeline before the channel is
//! written. Excess or conjoining candidates are rejected for the step and
//! reported upward; they never abort the pass.

use crate::conjunction::{narrowband_conjunction_problem, wideband_conjunction_problem};
use crate::constraints::{check_candidate, RejectReason};
use capacity_timeline::{
    AllocationError, AssetId, CapacityTimeline, ChannelGrid, LinkId, Registry, ResourceConfig,
    ResourceId, Result,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Default idle-gap tolerance before a channel is released for reassignment
pub const DEFAULT_SWITCH_THRESHOLD: usize = 2;

/// Trailing window over which preferenced-range saturation is measured
pub const DEFAULT_PREFERENCE_WINDOW: usize = 16;

/// One candidate that wanted a channel and did not get one.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationFailure {
    pub asset: AssetId,
    pub counterpart: String,
    pub step: usize,
    pub reason: RejectReason,
    /// Upstream link score at the rejected step, when the generator
    /// supplied one
    pub score: Option<f64>,
}

/// Outcome of one resource's allocation pass.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationPass {
    pub resource: String,
    /// Active cells committed
    pub assigned: usize,
    /// Preparation cells committed
    pub preparation: usize,
    pub rejected: Vec<AllocationFailure>,
}

struct Candidate {
    asset: AssetId,
    link: LinkId,
    counterpart: String,
    /// The resource transmits on this link, so channel activations carry a
    /// preparation window
    transmitter: bool,
    /// Post-constraint activity signal, one flag per step
    active: Vec<bool>,
}

/// Per-channel reservation state carried across steps.
#[derive(Clone, Copy)]
struct Slot {
    holder: Option<AssetId>,
    last_active: usize,
}

pub struct BestFit {
    pub switch_threshold: usize,
    pub preference_window: usize,
}

impl Default for BestFit {
    fn default() -> Self {
        Self {
            switch_threshold: DEFAULT_SWITCH_THRESHOLD,
            preference_window: DEFAULT_PREFERENCE_WINDOW,
        }
    }
}

impl BestFit {
    pub fn new(switch_threshold: usize) -> Self {
        Self {
            switch_threshold,
            ..Default::default()
        }
    }

    /// Run the allocation pass for one resource, committing assignments
    /// into its timeline grid. Configuration and invariant errors unwind
    /// the pass; capacity exhaustion is recorded and the pass continues.
    pub fn allocate(
        &self,
        registry: &Registry,
        resource: ResourceId,
        timeline: &mut CapacityTimeline,
    ) -> Result<AllocationPass> {
        if !registry.is_finalized() {
            return Err(AllocationError::RegistryNotFinalized);
        }
        let res = registry.resource(resource);
        let config = &res.config;
        let steps = registry.window.steps;

        let candidates = self.build_candidates(registry, resource);

        let mut slots = vec![
            Slot {
                holder: None,
                last_active: 0,
            };
            config.capacity
        ];
        let mut pass = AllocationPass {
            resource: config.designator.clone(),
            assigned: 0,
            preparation: 0,
            rejected: Vec::new(),
        };

        for step in 0..steps {
            // Release channels whose holder has been idle past the gap
            // tolerance
            for slot in slots.iter_mut() {
                if let Some(holder) = slot.holder {
                    let holder_active = candidates
                        .iter()
                        .any(|c| c.asset == holder && c.active[step]);
                    if !holder_active && step - slot.last_active > self.switch_threshold {
                        slot.holder = None;
                    }
                }
            }

            let mut unassigned: Vec<&Candidate> = Vec::new();

            // Carry forward: an active counterpart keeps its reserved
            // channel, including across tolerated idle gaps
            for candidate in candidates.iter().filter(|c| c.active[step]) {
                let held = slots
                    .iter()
                    .position(|s| s.holder == Some(candidate.asset));
                match held {
                    Some(channel) => {
                        let grid = timeline.grid_mut(resource);
                        grid.set(step, channel, candidate.asset, false)?;
                        slots[channel].last_active = step;
                        pass.assigned += 1;
                        pass.preparation +=
                            self.backfill_preparation(grid, config, candidate, step, channel)?;
                    }
                    None => unassigned.push(candidate),
                }
            }

            // New assignments in ascending asset (= designator) order
            for candidate in unassigned {
                let channel = self.pick_channel(timeline.grid(resource), config, &slots, step);
                let Some(channel) = channel else {
                    warn!(
                        "{}: capacity exhausted at step {}, rejecting {} (score {:?})",
                        config.designator, step, candidate.counterpart,
                        registry.link(candidate.link).config.score_at(step)
                    );
                    pass.rejected.push(self.failure(
                        registry,
                        candidate,
                        step,
                        RejectReason::CapacityExhausted,
                    ));
                    continue;
                };

                // The conjunction check runs against the partially
                // committed timeline before anything is written. A
                // transmitting contact radiates through acquisition, so
                // it must clear the wideband variant; receive-side
                // contacts only need narrowband clearance.
                let conjoins = if candidate.transmitter {
                    wideband_conjunction_problem(registry, timeline, candidate.link, step)
                } else {
                    narrowband_conjunction_problem(registry, timeline, candidate.link, step)
                };
                if conjoins {
                    warn!(
                        "{}: conjunction at step {}, rejecting {}",
                        config.designator, step, candidate.counterpart
                    );
                    pass.rejected.push(self.failure(
                        registry,
                        candidate,
                        step,
                        RejectReason::Conjunction,
                    ));
                    continue;
                }

                debug!(
                    "{}: step {} assign {} -> channel {}",
                    config.designator, step, candidate.counterpart, channel
                );
                let grid = timeline.grid_mut(resource);
                grid.set(step, channel, candidate.asset, false)?;
                slots[channel] = Slot {
                    holder: Some(candidate.asset),
                    last_active: step,
                };
                pass.assigned += 1;
                pass.preparation +=
                    self.backfill_preparation(grid, config, candidate, step, channel)?;
            }
        }

        info!(
            "{}: allocation pass complete, {} active cells, {} preparation cells, {} rejections",
            config.designator,
            pass.assigned,
            pass.preparation,
            pass.rejected.len()
        );
        Ok(pass)
    }

    fn failure(
        &self,
        registry: &Registry,
        candidate: &Candidate,
        step: usize,
        reason: RejectReason,
    ) -> AllocationFailure {
        AllocationFailure {
            asset: candidate.asset,
            counterpart: candidate.counterpart.clone(),
            step,
            reason,
            score: registry.link(candidate.link).config.score_at(step),
        }
    }

    /// Gather candidate links for a resource, filtering statically
    /// infeasible counterparts and evaluating per-step constraints.
    fn build_candidates(&self, registry: &Registry, resource: ResourceId) -> Vec<Candidate> {
        let res = registry.resource(resource);
        let config = &res.config;
        let steps = registry.window.steps;

        let mut candidates: Vec<Candidate> = Vec::new();
        for link in registry.links_for(resource) {
            let Some(other) = link.counterpart_of(resource) else {
                continue;
            };
            let counterpart = registry.resource(other).config.designator.clone();
            let Some(asset) = res.asset_number(&counterpart) else {
                continue;
            };

            let active: Vec<bool> = (0..steps)
                .map(|step| {
                    if !link.config.in_view_at(step) || link.config.precluded_at(step) {
                        return false;
                    }
                    match check_candidate(config, &counterpart, link.config.azimuth_at(step)) {
                        None => true,
                        Some(reason) => {
                            debug!(
                                "{}: step {} candidate {} filtered: {}",
                                config.designator, step, counterpart, reason
                            );
                            false
                        }
                    }
                })
                .collect();

            if !active.iter().any(|&a| a) {
                continue;
            }

            let transmitter = config.can_transmit && link.transmit == resource;
            candidates.push(Candidate {
                asset,
                link: link.id,
                counterpart,
                transmitter,
                active,
            });
        }

        // Ascending asset order doubles as the designator-lexical tie-break
        candidates.sort_by_key(|c| c.asset);
        candidates
    }

    /// Channel choice for a fresh assignment: lowest free preferenced
    /// channel while the preferenced range is not saturated over the
    /// trailing window, else lowest free channel overall.
    fn pick_channel(
        &self,
        grid: &ChannelGrid,
        config: &ResourceConfig,
        slots: &[Slot],
        step: usize,
    ) -> Option<usize> {
        let free = |ch: usize| slots[ch].holder.is_none();
        let preferenced = config.preferenced_capacity;

        if preferenced > 0 && !self.preference_saturated(grid, preferenced, step) {
            if let Some(ch) = (0..preferenced).find(|&ch| free(ch)) {
                return Some(ch);
            }
        }
        (0..config.capacity).find(|&ch| free(ch))
    }

    /// The preferenced range is saturated when it has carried more than
    /// half of its possible occupancy over the trailing window.
    fn preference_saturated(&self, grid: &ChannelGrid, preferenced: usize, step: usize) -> bool {
        let window = self.preference_window.min(step);
        if window == 0 {
            return false;
        }
        let mut occupied = 0usize;
        for s in (step - window)..step {
            for ch in 0..preferenced {
                if grid.get(s, ch).map(|c| !c.is_empty()).unwrap_or(false) {
                    occupied += 1;
                }
            }
        }
        occupied * 2 > preferenced * window
    }

    /// Write the preparation window onto the contact's channel for the
    /// steps immediately preceding its start. A still-occupied cell
    /// truncates the window rather than rejecting the contact.
    fn backfill_preparation(
        &self,
        grid: &mut ChannelGrid,
        config: &ResourceConfig,
        candidate: &Candidate,
        step: usize,
        channel: usize,
    ) -> Result<usize> {
        if !candidate.transmitter || config.preparation_steps == 0 {
            return Ok(0);
        }
        // Only a contact start carries a preparation window
        if step > 0 && grid.find_channel(step - 1, candidate.asset).is_some() {
            return Ok(0);
        }

        let mut written = 0usize;
        for back in 1..=config.preparation_steps {
            let Some(s) = step.checked_sub(back) else {
                break;
            };
            if !grid.get(s, channel)?.is_empty() {
                debug!(
                    "{}: preparation for {} truncated at step {}",
                    config.designator, candidate.counterpart, s
                );
                break;
            }
            grid.set(s, channel, candidate.asset, true)?;
            written += 1;
        }
        Ok(written)
    }
}
