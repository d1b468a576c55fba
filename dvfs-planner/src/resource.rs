/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resource catalog: sites, DVFS-capable nodes and the network between them.
//!
//! The catalog is immutable once built and shared by the planner through an
//! `Arc`.  Nodes and sites are addressed by dense indices ([`NodeId`],
//! [`SiteId`]) so per-node planning state can live in plain vectors.

use std::fmt;

use crate::error::ModelError;
use crate::price::PriceSchedule;

// ── Identifiers ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site#{}", self.0)
    }
}

// ── Power levels ──────────────────────────────────────────────────────────────

/// One DVFS operating point of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLevel {
    /// Instructions per second.
    pub speed: f64,
    /// Power drawn while busy at this level, in watts.
    pub power_watts: f64,
    /// Transient failure rate λ (per second) at this level.
    pub failure_rate: f64,
}

impl PowerLevel {
    pub fn new(speed: f64, power_watts: f64, failure_rate: f64) -> Self {
        Self {
            speed,
            power_watts,
            failure_rate,
        }
    }

    /// `length / speed`.
    pub fn exec_time(&self, length: f64) -> f64 {
        length / self.speed
    }

    /// `exp(-λ · execTime)`.
    pub fn reliability(&self, length: f64) -> f64 {
        (-self.failure_rate * self.exec_time(length)).exp()
    }

    /// Instructions per watt.
    pub fn efficiency(&self) -> f64 {
        self.speed / self.power_watts
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// A virtual machine hosted at one site, with levels ordered fastest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub site: SiteId,
    levels: Vec<PowerLevel>,
}

impl Node {
    pub fn levels(&self) -> &[PowerLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> &PowerLevel {
        &self.levels[index]
    }

    pub fn fastest(&self) -> &PowerLevel {
        &self.levels[0]
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Mean instructions-per-watt across all levels.
    pub fn efficiency(&self) -> f64 {
        self.levels.iter().map(PowerLevel::efficiency).sum::<f64>() / self.levels.len() as f64
    }
}

fn validate_levels(node: &str, levels: &[PowerLevel]) -> Result<(), ModelError> {
    if levels.is_empty() {
        return Err(ModelError::NoPowerLevels {
            node: node.to_string(),
        });
    }
    for (level, l) in levels.iter().enumerate() {
        let reason = if !(l.speed.is_finite() && l.speed > 0.0) {
            Some("speed must be finite and positive")
        } else if !(l.power_watts.is_finite() && l.power_watts >= 0.0) {
            Some("power must be finite and non-negative")
        } else if !(l.failure_rate.is_finite() && l.failure_rate >= 0.0) {
            Some("failure rate must be finite and non-negative")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ModelError::InvalidPowerLevel {
                node: node.to_string(),
                level,
                reason,
            });
        }
    }
    if levels.windows(2).any(|w| w[1].speed > w[0].speed) {
        return Err(ModelError::UnorderedPowerLevels {
            node: node.to_string(),
        });
    }
    Ok(())
}

// ── Site & network ────────────────────────────────────────────────────────────

/// A datacenter with its own electricity tariff.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub prices: PriceSchedule,
}

/// Link bandwidths in bytes per second.  `f64::INFINITY` models free
/// transfers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Network {
    pub intra_site_bandwidth: f64,
    pub inter_site_bandwidth: f64,
}

impl Network {
    pub fn new(intra_site_bandwidth: f64, inter_site_bandwidth: f64) -> Result<Self, ModelError> {
        for (link, value) in [
            ("intra-site", intra_site_bandwidth),
            ("inter-site", inter_site_bandwidth),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ModelError::InvalidBandwidth { link, value });
            }
        }
        Ok(Self {
            intra_site_bandwidth,
            inter_site_bandwidth,
        })
    }

    /// Zero-cost transfers everywhere.
    pub fn unlimited() -> Self {
        Self {
            intra_site_bandwidth: f64::INFINITY,
            inter_site_bandwidth: f64::INFINITY,
        }
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Immutable view of every site and node available to the planner.
#[derive(Debug, Clone)]
pub struct Catalog {
    sites: Vec<Site>,
    nodes: Vec<Node>,
    network: Network,
}

impl Catalog {
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.0]
    }

    /// Price schedule of the site hosting `node`.
    pub fn prices_of(&self, node: NodeId) -> &PriceSchedule {
        &self.sites[self.nodes[node.0].site.0].prices
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes hosted at `site`, in declaration order.
    pub fn nodes_in(&self, site: SiteId) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |n| n.site == site)
    }

    pub fn same_site(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes[a.0].site == self.nodes[b.0].site
    }

    /// Seconds to move `size_bytes` from node `from` to node `to`.
    ///
    /// Zero on the same node, intra-site bandwidth within a site and
    /// inter-site bandwidth otherwise.
    pub fn transfer_time(&self, size_bytes: f64, from: NodeId, to: NodeId) -> f64 {
        if from == to || size_bytes == 0.0 {
            0.0
        } else if self.same_site(from, to) {
            size_bytes / self.network.intra_site_bandwidth
        } else {
            size_bytes / self.network.inter_site_bandwidth
        }
    }

    /// Seconds to stage a resident artifact onto `to`.  Artifacts with no
    /// known location are fetched over the inter-site link.
    pub fn fetch_time(&self, size_bytes: f64, location: Option<NodeId>, to: NodeId) -> f64 {
        match location {
            Some(from) => self.transfer_time(size_bytes, from, to),
            None if size_bytes == 0.0 => 0.0,
            None => size_bytes / self.network.inter_site_bandwidth,
        }
    }

    /// Mean of every node's top speed.
    pub fn mean_top_speed(&self) -> f64 {
        self.nodes.iter().map(|n| n.fastest().speed).sum::<f64>() / self.nodes.len() as f64
    }

    /// Highest top speed of any node.
    pub fn max_top_speed(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| n.fastest().speed)
            .fold(0.0, f64::max)
    }
}

/// Incrementally assembles a validated [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    sites: Vec<Site>,
    nodes: Vec<Node>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_site(&mut self, name: impl Into<String>, prices: PriceSchedule) -> SiteId {
        let id = SiteId(self.sites.len());
        self.sites.push(Site {
            id,
            name: name.into(),
            prices,
        });
        id
    }

    /// Adds a node whose `levels` are ordered fastest to slowest.
    ///
    /// # Errors
    /// Rejects unknown sites, duplicate names and invalid or unordered levels.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        site: SiteId,
        levels: Vec<PowerLevel>,
    ) -> Result<NodeId, ModelError> {
        let name = name.into();
        if site.0 >= self.sites.len() {
            return Err(ModelError::UnknownSite { node: name, site: site.0 });
        }
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(ModelError::DuplicateNode { node: name });
        }
        validate_levels(&name, &levels)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            name,
            site,
            levels,
        });
        Ok(id)
    }

    pub fn build(self, network: Network) -> Result<Catalog, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::NoNodes);
        }
        Ok(Catalog {
            sites: self.sites,
            nodes: self.nodes,
            network,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
