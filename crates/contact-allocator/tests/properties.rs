//! Property-based checks over the allocation engine
//!
//! Random activity tracks through the best-fit pass must uphold the
//! engine's invariants: the capacity bound, channel exclusivity,
//! carry-forward stability, and set/find round trips.

use capacity_timeline::{
    AssetId, CapacityTimeline, ChannelGrid, FrequencyBand, LinkActivity, LinkConfig, Occupant,
    Registry, ResourceConfig, ResourceId, SimulationWindow,
};
use contact_allocator::BestFit;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};

const STEPS: usize = 24;

/// Per-step activity flags for one counterpart
fn activity_track() -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), STEPS)
}

/// One to four counterpart activity tracks
fn candidate_tracks() -> impl Strategy<Value = Vec<Vec<bool>>> {
    proptest::collection::vec(activity_track(), 1..=4)
}

fn resource_capacity() -> impl Strategy<Value = usize> {
    1usize..=3
}

fn switch_threshold() -> impl Strategy<Value = usize> {
    0usize..=3
}

fn config(designator: &str, capacity: usize) -> ResourceConfig {
    ResourceConfig {
        designator: designator.to_string(),
        band: FrequencyBand::KaBand,
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

/// Build a registry with one allocatable resource and run the pass.
fn run_pass(
    tracks: &[Vec<bool>],
    capacity: usize,
    threshold: usize,
) -> (Registry, CapacityTimeline, ResourceId) {
    let mut registry = Registry::new(SimulationWindow {
        start: "2026-08-25T00:00:00Z".parse().unwrap(),
        step_seconds: 60,
        steps: STEPS,
    });
    let resource = registry.add_resource(config("GS-ALPHA", capacity)).unwrap();
    for (i, track) in tracks.iter().enumerate() {
        let counterpart = format!("UV-{:02}", i + 1);
        registry.add_resource(config(&counterpart, 1)).unwrap();
        registry
            .add_link(LinkConfig {
                transmit: "GS-ALPHA".to_string(),
                receive: counterpart,
                data_rate_mbps: 150.0,
                in_view: track.clone(),
                precluded: vec![],
                score: vec![],
                azimuth_deg: vec![],
                elevation_deg: vec![],
                activity: LinkActivity::default(),
            })
            .unwrap();
    }
    registry.finalize();

    let mut timeline = CapacityTimeline::new(&registry);
    BestFit {
        switch_threshold: threshold,
        ..Default::default()
    }
    .allocate(&registry, resource, &mut timeline)
    .unwrap();
    (registry, timeline, resource)
}

proptest! {
    #[test]
    fn prop_capacity_bound(
        tracks in candidate_tracks(),
        capacity in resource_capacity(),
        threshold in switch_threshold(),
    ) {
        let (_registry, timeline, resource) = run_pass(&tracks, capacity, threshold);
        let grid = timeline.grid(resource);
        for step in 0..STEPS {
            prop_assert!(grid.occupied_count(step) <= capacity);
        }
    }

    #[test]
    fn prop_channel_exclusivity(
        tracks in candidate_tracks(),
        capacity in resource_capacity(),
        threshold in switch_threshold(),
    ) {
        let (_registry, timeline, resource) = run_pass(&tracks, capacity, threshold);
        let grid = timeline.grid(resource);
        for step in 0..STEPS {
            let mut seen = HashSet::new();
            for channel in 0..capacity {
                if let Some(asset) = grid.get(step, channel).unwrap().asset() {
                    prop_assert!(seen.insert(asset), "asset on two channels at step {}", step);
                }
            }
        }
    }

    #[test]
    fn prop_carry_forward_stability(
        tracks in candidate_tracks(),
        capacity in resource_capacity(),
        threshold in switch_threshold(),
    ) {
        let (registry, timeline, resource) = run_pass(&tracks, capacity, threshold);
        let grid = timeline.grid(resource);
        let res = registry.resource(resource);

        for (i, track) in tracks.iter().enumerate() {
            let counterpart = format!("UV-{:02}", i + 1);
            let asset = res.asset_number(&counterpart).unwrap();
            for step in 0..STEPS - 1 {
                for channel in 0..capacity {
                    let holds_now = grid.get(step, channel).unwrap() == Occupant::Active(asset);
                    if holds_now && track[step + 1] {
                        prop_assert_eq!(
                            grid.get(step + 1, channel).unwrap(),
                            Occupant::Active(asset),
                            "asset {:?} lost channel {} at step {}",
                            asset, channel, step + 1
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn prop_assigned_matches_active_when_unsaturated(
        track in activity_track(),
        capacity in resource_capacity(),
        threshold in switch_threshold(),
    ) {
        // A single candidate can never be rejected: every active step
        // must be committed somewhere.
        let tracks = vec![track.clone()];
        let (registry, timeline, resource) = run_pass(&tracks, capacity, threshold);
        let grid = timeline.grid(resource);
        let asset = registry.resource(resource).asset_number("UV-01").unwrap();
        for (step, &active) in track.iter().enumerate() {
            prop_assert_eq!(grid.find_channel(step, asset).is_some(), active);
        }
    }

    #[test]
    fn prop_set_find_round_trip(
        step in 0usize..STEPS,
        channel in 0usize..3,
        asset in 1u16..=100,
        preparation in any::<bool>(),
    ) {
        let mut grid = ChannelGrid::new("GS-ALPHA", 3, STEPS);
        let asset = AssetId(asset);
        grid.set(step, channel, asset, preparation).unwrap();
        prop_assert_eq!(grid.find_channel(step, asset), Some(channel));

        grid.clear(step, channel).unwrap();
        prop_assert_eq!(grid.find_channel(step, asset), None);
    }
}
