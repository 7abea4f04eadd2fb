//! Resource and link registry
//!
//! Arena of resources and candidate links addressed by stable handles.
//! Links refer to their transmit/receive endpoints by `ResourceId`; there
//! are no back-pointers and no process-wide registries. The registry is
//! built once at setup, validated, finalized, and read-only afterward.

use crate::states::LinkActivity;
use crate::{AllocationError, AssetId, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Stable handle into the resource arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

/// Stable handle into the link arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u32);

/// Frequency band of a resource. The laser/RF distinction drives the
/// conjunction rules: optical terminals are conjunction-exempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyBand {
    SBand,
    XBand,
    KuBand,
    KaBand,
    Optical,
}

impl FrequencyBand {
    pub fn conjunction_exempt(self) -> bool {
        matches!(self, FrequencyBand::Optical)
    }

    /// Minimum angular separation between simultaneously radiating links
    /// before RF interference is assumed. `None` for exempt bands.
    pub fn conjunction_separation_deg(self) -> Option<f64> {
        match self {
            FrequencyBand::SBand => Some(5.0),
            FrequencyBand::XBand => Some(3.0),
            FrequencyBand::KuBand => Some(2.5),
            FrequencyBand::KaBand => Some(2.0),
            FrequencyBand::Optical => None,
        }
    }
}

/// Elevation bounds in degrees, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationBounds {
    pub min_deg: f64,
    pub max_deg: f64,
}

/// Static configuration of one transmit/receive endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub designator: String,
    pub band: FrequencyBand,

    /// Number of concurrent-use channels
    pub capacity: usize,

    /// How many channels (0..preferenced_capacity) should carry the
    /// majority of traffic. 0 = no preference.
    pub preferenced_capacity: usize,

    /// Steps a channel is reserved ahead of each contact start
    pub preparation_steps: usize,

    pub can_transmit: bool,
    pub can_receive: bool,

    /// Gimbal travel limits in degrees; unset bound = unconstrained
    pub gimbal_min_deg: Option<f64>,
    pub gimbal_max_deg: Option<f64>,

    /// Once capacity is saturated by these counterparts, nobody else may
    /// use the resource. Empty = open to all.
    pub dedicated: BTreeSet<String>,

    /// Counterparts never eligible on this resource
    pub precluded: BTreeSet<String>,

    /// Resource-level default elevation constraint
    pub elevation_default: Option<ElevationBounds>,

    /// Per-counterpart overrides of the default
    pub elevation_overrides: BTreeMap<String, ElevationBounds>,
}

impl ResourceConfig {
    /// Setup-time validation. Violations here are fatal configuration
    /// errors reported with the offending designator.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(AllocationError::InvalidConfig {
                designator: self.designator.clone(),
                reason: reason.to_string(),
            })
        };

        if self.designator.is_empty() {
            return fail("empty designator");
        }
        if self.preferenced_capacity > self.capacity {
            return fail("preferenced capacity exceeds total capacity");
        }
        if self.dedicated.len() > self.capacity {
            return fail("dedicated counterpart count exceeds capacity");
        }
        if let (Some(min), Some(max)) = (self.gimbal_min_deg, self.gimbal_max_deg) {
            if min > max {
                return fail("gimbal minimum exceeds maximum");
            }
        }
        if let Some(b) = self.elevation_default {
            if b.min_deg > b.max_deg {
                return fail("default elevation minimum exceeds maximum");
            }
        }
        for (counterpart, b) in &self.elevation_overrides {
            if b.min_deg > b.max_deg {
                return Err(AllocationError::InvalidConfig {
                    designator: self.designator.clone(),
                    reason: format!("elevation override for {} inverted", counterpart),
                });
            }
        }
        if let Some(cp) = self.dedicated.intersection(&self.precluded).next() {
            return Err(AllocationError::InvalidConfig {
                designator: self.designator.clone(),
                reason: format!("{} is both dedicated and precluded", cp),
            });
        }
        Ok(())
    }

    pub fn has_gimbal_stops(&self) -> bool {
        self.gimbal_min_deg.is_some() || self.gimbal_max_deg.is_some()
    }
}

/// Static configuration of one candidate link plus its precomputed
/// per-step signals from the geometry/link-generation subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Transmit endpoint designator
    pub transmit: String,

    /// Receive endpoint designator
    pub receive: String,

    pub data_rate_mbps: f64,

    /// Per-step geometric visibility flag, length = simulation steps
    pub in_view: Vec<bool>,

    /// Per-step preclusion flag (externally decided), length = steps or empty
    pub precluded: Vec<bool>,

    /// Per-step link score from the upstream generator (empty if unused)
    pub score: Vec<f64>,

    /// Per-step pointing azimuth in degrees, used for conjunction
    /// separation checks on gimballed hardware. Empty = unknown.
    pub azimuth_deg: Vec<f64>,

    /// Per-step pointing elevation in degrees. Empty = unknown.
    pub elevation_deg: Vec<f64>,

    /// Activity sub-state flags supplied by the link/antenna configuration
    pub activity: LinkActivity,
}

impl LinkConfig {
    pub fn in_view_at(&self, step: usize) -> bool {
        self.in_view.get(step).copied().unwrap_or(false)
    }

    pub fn precluded_at(&self, step: usize) -> bool {
        self.precluded.get(step).copied().unwrap_or(false)
    }

    pub fn azimuth_at(&self, step: usize) -> Option<f64> {
        self.azimuth_deg.get(step).copied()
    }

    pub fn score_at(&self, step: usize) -> Option<f64> {
        self.score.get(step).copied()
    }

    pub fn elevation_at(&self, step: usize) -> Option<f64> {
        self.elevation_deg.get(step).copied()
    }
}

/// A registered link with resolved endpoint handles.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub transmit: ResourceId,
    pub receive: ResourceId,
    pub config: LinkConfig,
}

impl Link {
    /// The endpoint opposite `resource`, if this link touches it.
    pub fn counterpart_of(&self, resource: ResourceId) -> Option<ResourceId> {
        if self.transmit == resource {
            Some(self.receive)
        } else if self.receive == resource {
            Some(self.transmit)
        } else {
            None
        }
    }
}

/// A registered resource plus its counterpart table.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: ResourceId,
    pub config: ResourceConfig,

    /// Counterpart designators in lexical order; asset number n maps to
    /// assets[n-1]. Populated by `finalize`.
    assets: Vec<String>,
}

impl Resource {
    pub fn designator(&self) -> &str {
        &self.config.designator
    }

    /// 1-based asset number for a counterpart designator
    pub fn asset_number(&self, counterpart: &str) -> Option<AssetId> {
        self.assets
            .iter()
            .position(|a| a == counterpart)
            .map(|i| AssetId((i + 1) as u16))
    }

    /// Counterpart designator for an asset number
    pub fn counterpart_name(&self, asset: AssetId) -> Option<&str> {
        self.assets.get(asset.index()).map(String::as_str)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }
}

/// Simulation window: time-step to wall-clock mapping. Used only to size
/// timelines and stamp reports; the engine itself is step-index based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationWindow {
    pub start: DateTime<Utc>,
    pub step_seconds: i64,
    pub steps: usize,
}

impl SimulationWindow {
    pub fn step_time(&self, step: usize) -> DateTime<Utc> {
        self.start + Duration::seconds(self.step_seconds * step as i64)
    }
}

/// Arena of resources and links for one simulation run.
pub struct Registry {
    pub window: SimulationWindow,
    resources: Vec<Resource>,
    links: Vec<Link>,
    finalized: bool,
}

impl Registry {
    pub fn new(window: SimulationWindow) -> Self {
        Self {
            window,
            resources: Vec::new(),
            links: Vec::new(),
            finalized: false,
        }
    }

    /// Register a resource. Fails on invalid config or duplicate designator.
    pub fn add_resource(&mut self, config: ResourceConfig) -> Result<ResourceId> {
        config.validate()?;
        if self.resource_by_designator(&config.designator).is_some() {
            return Err(AllocationError::InvalidConfig {
                designator: config.designator,
                reason: "duplicate designator".to_string(),
            });
        }
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(Resource {
            id,
            config,
            assets: Vec::new(),
        });
        Ok(id)
    }

    /// Register a candidate link by endpoint designators.
    pub fn add_link(&mut self, config: LinkConfig) -> Result<LinkId> {
        let transmit = self
            .resource_by_designator(&config.transmit)
            .map(|r| r.id)
            .ok_or_else(|| AllocationError::UnknownDesignator(config.transmit.clone()))?;
        let receive = self
            .resource_by_designator(&config.receive)
            .map(|r| r.id)
            .ok_or_else(|| AllocationError::UnknownDesignator(config.receive.clone()))?;
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link {
            id,
            transmit,
            receive,
            config,
        });
        Ok(id)
    }

    /// Build per-resource counterpart tables. Must run after all resources
    /// and links are registered and before any allocation pass.
    pub fn finalize(&mut self) {
        for i in 0..self.resources.len() {
            let rid = self.resources[i].id;
            let mut names: BTreeSet<String> = BTreeSet::new();
            for link in &self.links {
                if let Some(other) = link.counterpart_of(rid) {
                    names.insert(self.resources[other.0 as usize].config.designator.clone());
                }
            }
            self.resources[i].assets = names.into_iter().collect();
        }
        self.finalized = true;
        info!(
            "registry finalized: {} resources, {} links, {} steps",
            self.resources.len(),
            self.links.len(),
            self.window.steps
        );
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0 as usize]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0 as usize]
    }

    pub fn resource_by_designator(&self, designator: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.config.designator == designator)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Links touching a resource, either endpoint.
    pub fn links_for(&self, resource: ResourceId) -> impl Iterator<Item = &Link> {
        self.links
            .iter()
            .filter(move |l| l.transmit == resource || l.receive == resource)
    }

    /// The link connecting a resource to one of its numbered counterparts.
    pub fn link_for_asset(&self, resource: ResourceId, asset: AssetId) -> Option<&Link> {
        let counterpart = self.resource(resource).counterpart_name(asset)?;
        self.links_for(resource).find(|l| {
            l.counterpart_of(resource)
                .map(|other| self.resource(other).config.designator == counterpart)
                .unwrap_or(false)
        })
    }
}
