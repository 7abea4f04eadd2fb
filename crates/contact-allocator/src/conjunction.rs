//! RF conjunction and lead/trail coordination checks
//!
//! Conjunction: two links radiating from the same angularly-constrained
//! resource within the band's separation angle interfere. Detected
//! conjunctions are surfaced as booleans for the caller to consult before
//! committing a channel; they never abort a pass.
//!
//! Coordination: a lead/trail resource pair performs a make-before-break
//! hand-off when both sides hold an active transmit assignment at the
//! same step.

use capacity_timeline::{
    AllocationError, ActivityState, CapacityTimeline, LinkId, Occupant, Registry, ResourceId,
    Result, classify,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Angular separation between two azimuths, wrapped to [0, 180].
pub fn angular_separation_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

fn conjunction_problem(
    registry: &Registry,
    timeline: &CapacityTimeline,
    link: LinkId,
    step: usize,
    wideband: bool,
) -> bool {
    let subject = registry.link(link);
    let Some(subject_az) = subject.config.azimuth_at(step) else {
        return false;
    };

    for rid in [subject.transmit, subject.receive] {
        let resource = registry.resource(rid);
        // Only angularly-constrained RF hardware can conjoin
        let Some(separation) = resource.config.band.conjunction_separation_deg() else {
            continue;
        };
        if !resource.config.has_gimbal_stops() {
            continue;
        }

        let grid = timeline.grid(rid);
        for other in registry.links_for(rid) {
            if other.id == link {
                continue;
            }
            let Some(counterpart) = other.counterpart_of(rid) else {
                continue;
            };
            let designator = &registry.resource(counterpart).config.designator;
            let Some(asset) = resource.asset_number(designator) else {
                continue;
            };
            let Some(channel) = grid.find_channel(step, asset) else {
                continue;
            };
            let radiating = match grid.get(step, channel) {
                Ok(Occupant::Active(_)) => {
                    // A droplink step is reception, not transmission; it
                    // only radiates when flagged as a wideband droplink
                    if other.config.activity.droplink_steps.contains(&step) {
                        wideband && other.config.activity.droplink_wideband
                    } else {
                        true
                    }
                }
                Ok(Occupant::Preparing(_)) => wideband,
                _ => false,
            };
            if !radiating {
                continue;
            }
            if let Some(other_az) = other.config.azimuth_at(step) {
                if angular_separation_deg(subject_az, other_az) < separation {
                    return true;
                }
            }
        }
    }
    false
}

/// Wideband conjunction: another link on the same resource is active or
/// inside its preparation window (a wideband transmitter radiates during
/// acquisition) at too small an angular separation. Conjunction-exempt
/// bands always return false.
pub fn wideband_conjunction_problem(
    registry: &Registry,
    timeline: &CapacityTimeline,
    link: LinkId,
    step: usize,
) -> bool {
    conjunction_problem(registry, timeline, link, step, true)
}

/// Narrowband conjunction: only actively transmitting links interfere.
pub fn narrowband_conjunction_problem(
    registry: &Registry,
    timeline: &CapacityTimeline,
    link: LinkId,
    step: usize,
) -> bool {
    conjunction_problem(registry, timeline, link, step, false)
}

/// Scan the committed schedule for wideband conjunctions. Consumed by the
/// CLI as a run-level warning list, never an error.
pub fn detect_conjunctions(
    registry: &Registry,
    timeline: &CapacityTimeline,
) -> Vec<(LinkId, usize)> {
    let mut found = Vec::new();
    for link in registry.links() {
        for step in 0..registry.window.steps {
            if wideband_conjunction_problem(registry, timeline, link.id, step) {
                warn!(
                    "wideband conjunction on link {} -> {} at step {}",
                    link.config.transmit, link.config.receive, step
                );
                found.push((link.id, step));
            }
        }
    }
    found
}

/// Two resources performing coordinated make-before-break hand-offs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeadTrailPair {
    pub lead: ResourceId,
    pub trail: ResourceId,
}

impl LeadTrailPair {
    /// Setup-time validation: overlap detection counts one assignment per
    /// side, so each member must have capacity at most 1.
    pub fn validate(&self, registry: &Registry) -> Result<()> {
        for rid in [self.lead, self.trail] {
            let config = &registry.resource(rid).config;
            if config.capacity > 1 {
                return Err(AllocationError::InvalidConfig {
                    designator: config.designator.clone(),
                    reason: "lead/trail pair member capacity exceeds 1".to_string(),
                });
            }
        }
        Ok(())
    }

    /// True while both sides hold an active transmit assignment at `step`:
    /// the overlap that defines a successful hand-off.
    pub fn is_conducting_make_before_break(
        &self,
        registry: &Registry,
        timeline: &CapacityTimeline,
        step: usize,
    ) -> bool {
        [self.lead, self.trail].iter().all(|&rid| {
            let resource = registry.resource(rid);
            if !resource.config.can_transmit {
                return false;
            }
            let grid = timeline.grid(rid);
            (0..grid.capacity()).any(|ch| matches!(grid.get(step, ch), Ok(Occupant::Active(_))))
        })
    }
}

/// Single-resource make-before-break: a multi-capacity resource carrying
/// one channel in `Mission` and another in `Overhead` at the same step is
/// handing a counterpart off between its own channels.
pub fn is_conducting_make_before_break_single(
    registry: &Registry,
    timeline: &CapacityTimeline,
    resource: ResourceId,
    step: usize,
) -> bool {
    let grid = timeline.grid(resource);
    let mut mission = false;
    let mut overhead = false;

    for ch in 0..grid.capacity() {
        let Ok(cell) = grid.get(step, ch) else {
            continue;
        };
        let Some(asset) = cell.asset() else {
            continue;
        };
        let Some(link) = registry.link_for_asset(resource, asset) else {
            continue;
        };
        match classify(cell, link.config.in_view_at(step), &link.config.activity, step) {
            ActivityState::Mission => mission = true,
            ActivityState::Overhead => overhead = true,
            _ => {}
        }
    }
    mission && overhead
}

#[cfg(test)]
mod tests {
    use super::*;
    use capacity_timeline::{
        AssetId, FrequencyBand, LinkActivity, LinkConfig, ResourceConfig, SimulationWindow,
    };
    use std::collections::{BTreeMap, BTreeSet};

    fn window(steps: usize) -> SimulationWindow {
        SimulationWindow {
            start: "2026-08-25T00:00:00Z".parse().unwrap(),
            step_seconds: 60,
            steps,
        }
    }

    fn config(designator: &str, band: FrequencyBand, capacity: usize) -> ResourceConfig {
        ResourceConfig {
            designator: designator.to_string(),
            band,
            capacity,
            preferenced_capacity: 0,
            preparation_steps: 0,
            can_transmit: true,
            can_receive: true,
            gimbal_min_deg: None,
            gimbal_max_deg: None,
            dedicated: BTreeSet::new(),
            precluded: BTreeSet::new(),
            elevation_default: None,
            elevation_overrides: BTreeMap::new(),
        }
    }

    fn link(transmit: &str, receive: &str, steps: usize, azimuth: f64) -> LinkConfig {
        LinkConfig {
            transmit: transmit.to_string(),
            receive: receive.to_string(),
            data_rate_mbps: 150.0,
            in_view: vec![true; steps],
            precluded: vec![],
            score: vec![],
            azimuth_deg: vec![azimuth; steps],
            elevation_deg: vec![],
            activity: LinkActivity::default(),
        }
    }

    #[test]
    fn test_angular_separation_wraps() {
        assert!((angular_separation_deg(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((angular_separation_deg(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((angular_separation_deg(90.0, 270.0) - 180.0).abs() < 1e-9);
    }

    fn conjunction_registry(band: FrequencyBand, az2: f64) -> (Registry, CapacityTimeline, LinkId) {
        let mut reg = Registry::new(window(4));
        let mut gs = config("GS-ALPHA", band, 2);
        gs.gimbal_min_deg = Some(0.0);
        gs.gimbal_max_deg = Some(360.0);
        let gs = reg.add_resource(gs).unwrap();
        reg.add_resource(config("UV-01", band, 1)).unwrap();
        reg.add_resource(config("UV-02", band, 1)).unwrap();
        let l1 = reg.add_link(link("GS-ALPHA", "UV-01", 4, 100.0)).unwrap();
        reg.add_link(link("GS-ALPHA", "UV-02", 4, az2)).unwrap();
        reg.finalize();

        let mut timeline = CapacityTimeline::new(&reg);
        // UV-02 active on channel 1 at every step
        let asset = reg.resource(gs).asset_number("UV-02").unwrap();
        for step in 0..4 {
            timeline.grid_mut(gs).set(step, 1, asset, false).unwrap();
        }
        (reg, timeline, l1)
    }

    #[test]
    fn test_conjunction_below_separation() {
        // KaBand separation is 2 degrees; 1 degree apart conflicts
        let (reg, timeline, l1) = conjunction_registry(FrequencyBand::KaBand, 101.0);
        assert!(wideband_conjunction_problem(&reg, &timeline, l1, 0));
        assert!(narrowband_conjunction_problem(&reg, &timeline, l1, 0));
    }

    #[test]
    fn test_no_conjunction_when_separated() {
        let (reg, timeline, l1) = conjunction_registry(FrequencyBand::KaBand, 140.0);
        assert!(!wideband_conjunction_problem(&reg, &timeline, l1, 0));
    }

    #[test]
    fn test_optical_band_exempt() {
        let (reg, timeline, l1) = conjunction_registry(FrequencyBand::Optical, 100.5);
        assert!(!wideband_conjunction_problem(&reg, &timeline, l1, 0));
    }

    #[test]
    fn test_wideband_sees_preparation() {
        let mut reg = Registry::new(window(4));
        let mut gs = config("GS-ALPHA", FrequencyBand::KaBand, 2);
        gs.gimbal_min_deg = Some(0.0);
        gs.gimbal_max_deg = Some(360.0);
        let gs = reg.add_resource(gs).unwrap();
        reg.add_resource(config("UV-01", FrequencyBand::KaBand, 1)).unwrap();
        reg.add_resource(config("UV-02", FrequencyBand::KaBand, 1)).unwrap();
        let l1 = reg.add_link(link("GS-ALPHA", "UV-01", 4, 100.0)).unwrap();
        reg.add_link(link("GS-ALPHA", "UV-02", 4, 100.5)).unwrap();
        reg.finalize();

        let mut timeline = CapacityTimeline::new(&reg);
        let asset = reg.resource(gs).asset_number("UV-02").unwrap();
        timeline.grid_mut(gs).set(0, 1, asset, true).unwrap();

        assert!(wideband_conjunction_problem(&reg, &timeline, l1, 0));
        assert!(!narrowband_conjunction_problem(&reg, &timeline, l1, 0));
    }

    #[test]
    fn test_droplink_radiates_only_when_flagged_wideband() {
        let build = |flag: bool| {
            let mut reg = Registry::new(window(4));
            let mut gs = config("GS-ALPHA", FrequencyBand::KaBand, 2);
            gs.gimbal_min_deg = Some(0.0);
            gs.gimbal_max_deg = Some(360.0);
            let gs = reg.add_resource(gs).unwrap();
            reg.add_resource(config("UV-01", FrequencyBand::KaBand, 1)).unwrap();
            reg.add_resource(config("UV-02", FrequencyBand::KaBand, 1)).unwrap();
            let l1 = reg.add_link(link("GS-ALPHA", "UV-01", 4, 100.0)).unwrap();
            let mut dropping = link("GS-ALPHA", "UV-02", 4, 100.5);
            dropping.activity.droplink_steps.insert(0);
            dropping.activity.droplink_wideband = flag;
            reg.add_link(dropping).unwrap();
            reg.finalize();

            let mut timeline = CapacityTimeline::new(&reg);
            let asset = reg.resource(gs).asset_number("UV-02").unwrap();
            timeline.grid_mut(gs).set(0, 1, asset, false).unwrap();
            (reg, timeline, l1)
        };

        let (reg, timeline, l1) = build(false);
        assert!(!wideband_conjunction_problem(&reg, &timeline, l1, 0));
        assert!(!narrowband_conjunction_problem(&reg, &timeline, l1, 0));

        let (reg, timeline, l1) = build(true);
        assert!(wideband_conjunction_problem(&reg, &timeline, l1, 0));
        assert!(!narrowband_conjunction_problem(&reg, &timeline, l1, 0));
    }

    #[test]
    fn test_make_before_break_overlap_window() {
        let mut reg = Registry::new(window(10));
        let lead = reg
            .add_resource(config("RLY-LEAD", FrequencyBand::KaBand, 1))
            .unwrap();
        let trail = reg
            .add_resource(config("RLY-TRAIL", FrequencyBand::KaBand, 1))
            .unwrap();
        reg.add_resource(config("UV-01", FrequencyBand::KaBand, 2)).unwrap();
        reg.add_link(link("RLY-LEAD", "UV-01", 10, 0.0)).unwrap();
        reg.add_link(link("RLY-TRAIL", "UV-01", 10, 0.0)).unwrap();
        reg.finalize();

        let pair = LeadTrailPair { lead, trail };
        pair.validate(&reg).unwrap();

        let mut timeline = CapacityTimeline::new(&reg);
        // Lead active t0..t5, trail active t3..t8
        for step in 0..=5 {
            timeline.grid_mut(lead).set(step, 0, AssetId(1), false).unwrap();
        }
        for step in 3..=8 {
            timeline.grid_mut(trail).set(step, 0, AssetId(1), false).unwrap();
        }

        for step in 0..10 {
            let expected = (3..=5).contains(&step);
            assert_eq!(
                pair.is_conducting_make_before_break(&reg, &timeline, step),
                expected,
                "step {}",
                step
            );
        }
    }

    #[test]
    fn test_pair_validation_rejects_multi_capacity() {
        let mut reg = Registry::new(window(4));
        let lead = reg
            .add_resource(config("RLY-LEAD", FrequencyBand::KaBand, 2))
            .unwrap();
        let trail = reg
            .add_resource(config("RLY-TRAIL", FrequencyBand::KaBand, 1))
            .unwrap();
        reg.finalize();

        let pair = LeadTrailPair { lead, trail };
        assert!(pair.validate(&reg).is_err());
    }

    #[test]
    fn test_single_resource_mission_overhead_overlap() {
        let mut reg = Registry::new(window(6));
        let gs = reg
            .add_resource(config("GS-ALPHA", FrequencyBand::KaBand, 2))
            .unwrap();
        reg.add_resource(config("UV-01", FrequencyBand::KaBand, 1)).unwrap();
        reg.add_resource(config("UV-02", FrequencyBand::KaBand, 1)).unwrap();

        let mut mission_link = link("GS-ALPHA", "UV-01", 6, 0.0);
        mission_link.activity.mission_window = Some((0, 5));
        reg.add_link(mission_link).unwrap();

        let mut overhead_link = link("GS-ALPHA", "UV-02", 6, 0.0);
        overhead_link.activity.overhead_steps.insert(2);
        reg.add_link(overhead_link).unwrap();
        reg.finalize();

        let uv1 = reg.resource(gs).asset_number("UV-01").unwrap();
        let uv2 = reg.resource(gs).asset_number("UV-02").unwrap();

        let mut timeline = CapacityTimeline::new(&reg);
        timeline.grid_mut(gs).set(2, 0, uv1, false).unwrap();
        timeline.grid_mut(gs).set(2, 1, uv2, false).unwrap();
        timeline.grid_mut(gs).set(3, 0, uv1, false).unwrap();

        assert!(is_conducting_make_before_break_single(&reg, &timeline, gs, 2));
        // Only the mission channel at step 3
        assert!(!is_conducting_make_before_break_single(&reg, &timeline, gs, 3));
    }
}
