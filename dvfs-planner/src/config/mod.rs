/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Planning configuration loading.
//!
//! One YAML file describes the resource catalog and the planner tunables:
//! ```yaml
//! network:
//!   intra_site_bandwidth: 1.0e9   # bytes/s
//!   inter_site_bandwidth: 1.0e8
//! sites:
//!   east:
//!     prices: [0.10, 0.10, 0.12]  # per kWh, hour 0 first, repeats
//!     nodes:
//!       e1:
//!         levels:                 # fastest first
//!           - { speed: 2000, power: 100, failure_rate: 1.0e-6 }
//!           - { speed: 1000, power: 35, failure_rate: 1.0e-6 }
//! planner:
//!   variant: dews
//!   slack_factor: 0.5
//!   seed: 42
//! ```
//!
//! Sites and nodes are ordered by name, so ids are stable across loads.
//! `network` may be omitted (free transfers), as may any `planner` field.
//!
//! Workflow files are handled by [`workflow`].

pub mod workflow;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::planner::{PlannerConfig, PlannerKind};
use crate::price::PriceSchedule;
use crate::resource::{Catalog, CatalogBuilder, Network, PowerLevel};

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanningFile {
    #[serde(default)]
    network: Option<NetworkEntry>,
    sites: BTreeMap<String, SiteEntry>,
    #[serde(default)]
    planner: PlannerSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkEntry {
    intra_site_bandwidth: f64,
    inter_site_bandwidth: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteEntry {
    prices: Vec<f64>,
    #[serde(default)]
    nodes: BTreeMap<String, NodeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeEntry {
    levels: Vec<LevelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelEntry {
    /// Instructions per second.
    speed: f64,
    /// Watts.
    power: f64,
    #[serde(default)]
    failure_rate: f64,
}

/// Every field falls back to [`PlannerConfig::default`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlannerSection {
    variant: Option<String>,
    slack_factor: Option<f64>,
    reliability_factor: Option<f64>,
    seed: Option<u64>,
    beta: Option<f64>,
    gamma: Option<f64>,
    tau: Option<f64>,
    max_site_retries: Option<usize>,
    max_retry_count: Option<u32>,
}

impl PlannerSection {
    fn into_config(self) -> Result<PlannerConfig> {
        let defaults = PlannerConfig::default();
        let kind = match self.variant {
            Some(name) => name.parse::<PlannerKind>()?,
            None => defaults.kind,
        };
        Ok(PlannerConfig {
            kind,
            slack_factor: self.slack_factor.unwrap_or(defaults.slack_factor),
            reliability_factor: self.reliability_factor.unwrap_or(defaults.reliability_factor),
            seed: self.seed.unwrap_or(defaults.seed),
            beta: self.beta.unwrap_or(defaults.beta),
            gamma: self.gamma.unwrap_or(defaults.gamma),
            tau: self.tau.unwrap_or(defaults.tau),
            max_site_retries: self.max_site_retries.unwrap_or(defaults.max_site_retries),
            max_retry_count: self.max_retry_count.unwrap_or(defaults.max_retry_count),
        })
    }
}

// ── PlanningConfig ────────────────────────────────────────────────────────────

/// Validated catalog plus planner tunables.
#[derive(Debug, Clone)]
pub struct PlanningConfig {
    pub catalog: Catalog,
    pub planner: PlannerConfig,
}

impl PlanningConfig {
    /// Reads and validates `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or the catalog it describes is rejected.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading planning configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid planning configuration: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: PlanningFile =
            serde_yaml::from_str(yaml).context("Failed to parse planning YAML")?;

        let network = match file.network {
            Some(n) => Network::new(n.intra_site_bandwidth, n.inter_site_bandwidth)?,
            None => Network::unlimited(),
        };

        let mut builder = CatalogBuilder::new();
        for (site_name, site) in file.sites {
            let prices = PriceSchedule::new(site.prices)
                .with_context(|| format!("site '{site_name}' has an invalid price schedule"))?;
            debug!(
                "  Site: {} | hours: {} | mean price: {:.4}",
                site_name,
                prices.hourly().len(),
                prices.mean_price()
            );
            let site_id = builder.add_site(site_name.clone(), prices);

            for (node_name, node) in site.nodes {
                let levels: Vec<PowerLevel> = node
                    .levels
                    .iter()
                    .map(|l| PowerLevel::new(l.speed, l.power, l.failure_rate))
                    .collect();
                debug!(
                    "    Node: {} | levels: {} | top speed: {}",
                    node_name,
                    levels.len(),
                    levels.first().map_or(0.0, |l| l.speed)
                );
                builder
                    .add_node(node_name, site_id, levels)
                    .with_context(|| format!("invalid node in site '{site_name}'"))?;
            }
        }
        let catalog = builder.build(network)?;
        let planner = file.planner.into_config()?;

        info!(
            "Loaded {} site(s), {} node(s); planner {} (slack {}, seed {})",
            catalog.sites().len(),
            catalog.nodes().len(),
            planner.kind,
            planner.slack_factor,
            planner.seed,
        );

        Ok(Self { catalog, planner })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
