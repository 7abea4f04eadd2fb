//! Occupancy report rendering
//!
//! Renders each resource's committed timeline as a fixed-width text table:
//! one row per time step, one character per channel. Built entirely on the
//! activity-state queries, so the report can never disagree with the
//! timeline.

use capacity_timeline::{ActivityState, CapacityTimeline, Registry, Resource, classify};

/// One character per channel state.
fn state_char(state: ActivityState) -> char {
    match state {
        ActivityState::Empty => '.',
        ActivityState::PreparationInContact => 'p',
        ActivityState::PreparationOutOfContact => 'q',
        ActivityState::Overhead => 'O',
        ActivityState::Mission => 'M',
        ActivityState::Buffer => 'B',
        ActivityState::Droplink => 'D',
        ActivityState::StateOfHealthLoss => 'S',
    }
}

fn channel_char(registry: &Registry, timeline: &CapacityTimeline, resource: &Resource, step: usize, channel: usize) -> char {
    let grid = timeline.grid(resource.id);
    let Ok(cell) = grid.get(step, channel) else {
        return '!';
    };
    let Some(asset) = cell.asset() else {
        return '.';
    };
    // A cell whose asset has no backing link is an upstream bug marker
    let Some(link) = registry.link_for_asset(resource.id, asset) else {
        return '!';
    };
    state_char(classify(
        cell,
        link.config.in_view_at(step),
        &link.config.activity,
        step,
    ))
}

/// Render one resource's occupancy table.
pub fn render_resource(registry: &Registry, timeline: &CapacityTimeline, resource: &Resource) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({:?}, capacity {}, preferenced {})\n",
        resource.designator(),
        resource.config.band,
        resource.config.capacity,
        resource.config.preferenced_capacity
    ));
    out.push_str(&format!("{:<20} {:>6}  channels\n", "time (UTC)", "step"));

    for step in 0..registry.window.steps {
        let stamp = registry.window.step_time(step).format("%Y-%m-%d %H:%M:%S");
        let mut row = String::with_capacity(resource.config.capacity);
        for channel in 0..resource.config.capacity {
            row.push(channel_char(registry, timeline, resource, step, channel));
        }
        out.push_str(&format!("{:<20} {:>6}  {}\n", stamp, step, row));
    }
    out
}

/// Render the full run report, one table per resource.
pub fn render(registry: &Registry, timeline: &CapacityTimeline) -> String {
    let mut out = String::new();
    for resource in registry.resources() {
        if resource.config.capacity == 0 {
            continue;
        }
        out.push_str(&render_resource(registry, timeline, resource));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use capacity_timeline::{
        FrequencyBand, LinkActivity, LinkConfig, ResourceConfig, SimulationWindow,
    };
    use std::collections::{BTreeMap, BTreeSet};

    fn build() -> (Registry, CapacityTimeline) {
        let mut registry = Registry::new(SimulationWindow {
            start: "2026-08-25T00:00:00Z".parse().unwrap(),
            step_seconds: 60,
            steps: 4,
        });
        let base = ResourceConfig {
            designator: "GS-ALPHA".to_string(),
            band: FrequencyBand::KaBand,
            capacity: 2,
            preferenced_capacity: 1,
            preparation_steps: 0,
            can_transmit: true,
            can_receive: true,
            gimbal_min_deg: None,
            gimbal_max_deg: None,
            dedicated: BTreeSet::new(),
            precluded: BTreeSet::new(),
            elevation_default: None,
            elevation_overrides: BTreeMap::new(),
        };
        let gs = registry.add_resource(base.clone()).unwrap();
        registry
            .add_resource(ResourceConfig {
                designator: "UV-01".to_string(),
                capacity: 1,
                preferenced_capacity: 0,
                ..base
            })
            .unwrap();

        let mut activity = LinkActivity::default();
        activity.mission_window = Some((0, 1));
        registry
            .add_link(LinkConfig {
                transmit: "GS-ALPHA".to_string(),
                receive: "UV-01".to_string(),
                data_rate_mbps: 150.0,
                in_view: vec![true; 4],
                precluded: vec![],
                score: vec![],
                azimuth_deg: vec![],
                elevation_deg: vec![],
                activity,
            })
            .unwrap();
        registry.finalize();

        let mut timeline = CapacityTimeline::new(&registry);
        let asset = registry.resource(gs).asset_number("UV-01").unwrap();
        timeline.grid_mut(gs).set(0, 0, asset, true).unwrap();
        timeline.grid_mut(gs).set(1, 0, asset, false).unwrap();
        timeline.grid_mut(gs).set(2, 0, asset, false).unwrap();
        (registry, timeline)
    }

    #[test]
    fn test_render_rows() {
        let (registry, timeline) = build();
        let resource = registry.resource_by_designator("GS-ALPHA").unwrap();
        let out = render_resource(&registry, &timeline, resource);
        let rows: Vec<&str> = out.lines().collect();

        // Header + column line + 4 step rows
        assert_eq!(rows.len(), 6);
        assert!(rows[2].ends_with("p.")); // preparation in contact
        assert!(rows[3].ends_with("M.")); // inside mission window
        assert!(rows[4].ends_with("O.")); // active past the window
        assert!(rows[5].ends_with("..")); // empty
    }

    #[test]
    fn test_full_report_covers_resources() {
        let (registry, timeline) = build();
        let out = render(&registry, &timeline);
        assert!(out.contains("GS-ALPHA"));
        assert!(out.contains("UV-01"));
    }
}
