//! Scenario loading from JSON
//!
//! A scenario file carries the static configuration the engine consumes:
//! resource configs, lead/trail pairs, and candidate links with their
//! precomputed per-step in-view signals expressed as inclusive step
//! intervals. Records missing required fields are skipped and counted;
//! configuration that parses but violates an invariant is a fatal setup
//! error.

use crate::conjunction::LeadTrailPair;
use crate::{PlannerError, Result};
use capacity_timeline::{
    ElevationBounds, FrequencyBand, LinkActivity, LinkConfig, Registry, ResourceConfig,
    SimulationWindow,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Sanitize a designator (alphanumeric, dash, underscore only)
fn sanitize_designator(raw: String) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect()
}

/// Expand inclusive [start, end] step intervals into a per-step flag vector.
fn expand_intervals(intervals: &[(usize, usize)], steps: usize) -> Vec<bool> {
    let mut flags = vec![false; steps];
    for &(start, end) in intervals {
        for flag in flags.iter_mut().take(steps.min(end.saturating_add(1))).skip(start) {
            *flag = true;
        }
    }
    flags
}

fn expand_interval_set(intervals: &[(usize, usize)], steps: usize) -> BTreeSet<usize> {
    let mut set = BTreeSet::new();
    for &(start, end) in intervals {
        for step in start..=end.min(steps.saturating_sub(1)) {
            set.insert(step);
        }
    }
    set
}

#[derive(Debug, Deserialize)]
struct RawBounds {
    min_deg: f64,
    max_deg: f64,
}

impl From<RawBounds> for ElevationBounds {
    fn from(b: RawBounds) -> Self {
        ElevationBounds {
            min_deg: b.min_deg,
            max_deg: b.max_deg,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResource {
    designator: Option<String>,
    band: Option<FrequencyBand>,
    capacity: Option<usize>,
    #[serde(default)]
    preferenced_capacity: usize,
    #[serde(default)]
    preparation_steps: usize,
    #[serde(default = "default_true")]
    can_transmit: bool,
    #[serde(default = "default_true")]
    can_receive: bool,
    gimbal_min_deg: Option<f64>,
    gimbal_max_deg: Option<f64>,
    #[serde(default)]
    dedicated: Vec<String>,
    #[serde(default)]
    precluded: Vec<String>,
    elevation_default: Option<RawBounds>,
    #[serde(default)]
    elevation_overrides: BTreeMap<String, RawBounds>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawLink {
    transmit: Option<String>,
    receive: Option<String>,
    #[serde(default)]
    data_rate_mbps: f64,
    #[serde(default)]
    in_view: Vec<(usize, usize)>,
    #[serde(default)]
    precluded: Vec<(usize, usize)>,
    #[serde(default)]
    score: Vec<f64>,
    #[serde(default)]
    azimuth_deg: Vec<f64>,
    #[serde(default)]
    elevation_deg: Vec<f64>,
    mission_window: Option<(usize, usize)>,
    #[serde(default)]
    overhead: Vec<(usize, usize)>,
    #[serde(default)]
    buffer: Vec<(usize, usize)>,
    #[serde(default)]
    droplink: Vec<(usize, usize)>,
    #[serde(default)]
    soh_loss: Vec<(usize, usize)>,
    #[serde(default)]
    droplink_wideband: bool,
}

#[derive(Debug, Deserialize)]
struct RawPair {
    lead: String,
    trail: String,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    start_time: DateTime<Utc>,
    step_seconds: i64,
    steps: usize,
    resources: Vec<RawResource>,
    #[serde(default)]
    pairs: Vec<RawPair>,
    #[serde(default)]
    links: Vec<RawLink>,
}

/// A loaded, validated, finalized scenario ready for allocation.
pub struct Scenario {
    pub registry: Registry,
    pub pairs: Vec<LeadTrailPair>,
}

/// Load a scenario from a JSON file.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    info!("Loading scenario from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: RawScenario = serde_json::from_reader(reader)?;
    build_scenario(raw)
}

fn build_scenario(raw: RawScenario) -> Result<Scenario> {
    let steps = raw.steps;
    let mut registry = Registry::new(SimulationWindow {
        start: raw.start_time,
        step_seconds: raw.step_seconds,
        steps,
    });

    let mut skipped = 0usize;
    for resource in raw.resources {
        let (Some(designator), Some(band), Some(capacity)) =
            (resource.designator, resource.band, resource.capacity)
        else {
            skipped += 1;
            continue;
        };
        let config = ResourceConfig {
            designator: sanitize_designator(designator),
            band,
            capacity,
            preferenced_capacity: resource.preferenced_capacity,
            preparation_steps: resource.preparation_steps,
            can_transmit: resource.can_transmit,
            can_receive: resource.can_receive,
            gimbal_min_deg: resource.gimbal_min_deg,
            gimbal_max_deg: resource.gimbal_max_deg,
            dedicated: resource.dedicated.into_iter().collect(),
            precluded: resource.precluded.into_iter().collect(),
            elevation_default: resource.elevation_default.map(Into::into),
            elevation_overrides: resource
                .elevation_overrides
                .into_iter()
                .map(|(k, v)| (k, v.into()))
                .collect(),
        };
        registry.add_resource(config)?;
    }
    if skipped > 0 {
        warn!("{} resource records skipped for missing fields", skipped);
    }

    let mut skipped_links = 0usize;
    for link in raw.links {
        let (Some(transmit), Some(receive)) = (link.transmit, link.receive) else {
            skipped_links += 1;
            continue;
        };
        let activity = LinkActivity {
            mission_window: link.mission_window,
            overhead_steps: expand_interval_set(&link.overhead, steps),
            buffer_steps: expand_interval_set(&link.buffer, steps),
            droplink_steps: expand_interval_set(&link.droplink, steps),
            soh_loss_steps: expand_interval_set(&link.soh_loss, steps),
            droplink_wideband: link.droplink_wideband,
        };
        registry.add_link(LinkConfig {
            transmit: sanitize_designator(transmit),
            receive: sanitize_designator(receive),
            data_rate_mbps: link.data_rate_mbps,
            in_view: expand_intervals(&link.in_view, steps),
            precluded: expand_intervals(&link.precluded, steps),
            score: link.score,
            azimuth_deg: link.azimuth_deg,
            elevation_deg: link.elevation_deg,
            activity,
        })?;
    }
    if skipped_links > 0 {
        warn!("{} link records skipped for missing endpoints", skipped_links);
    }

    registry.finalize();
    if registry.resources().next().is_none() {
        return Err(PlannerError::EmptyScenario);
    }

    let mut pairs = Vec::new();
    for pair in raw.pairs {
        let lead = registry
            .resource_by_designator(&pair.lead)
            .map(|r| r.id)
            .ok_or_else(|| {
                capacity_timeline::AllocationError::UnknownDesignator(pair.lead.clone())
            })?;
        let trail = registry
            .resource_by_designator(&pair.trail)
            .map(|r| r.id)
            .ok_or_else(|| {
                capacity_timeline::AllocationError::UnknownDesignator(pair.trail.clone())
            })?;
        let pair = LeadTrailPair { lead, trail };
        pair.validate(&registry)?;
        pairs.push(pair);
    }

    info!(
        "Scenario loaded: {} resources, {} links, {} lead/trail pairs",
        registry.resources().count(),
        registry.links().count(),
        pairs.len()
    );

    Ok(Scenario { registry, pairs })
}
