/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shared catalogs and workflows for unit tests.

use crate::deadline::DeadlinePlan;
use crate::metrics::MetricsCache;
use crate::planner::candidate::SearchContext;
use crate::planner::variant::VariantProfile;
use crate::price::PriceSchedule;
use crate::reliability::{ExecMatrix, ReliabilityBudget};
use crate::resource::{Catalog, CatalogBuilder, Network, NodeId, PowerLevel};
use crate::timeline::Timelines;
use crate::workflow::{Artifact, JobId, Workflow, WorkflowBuilder, WorkflowId};

/// Three levels, fastest first, with a flat failure rate.
pub(crate) fn dvfs_levels() -> Vec<PowerLevel> {
    vec![
        PowerLevel::new(2000.0, 100.0, 1e-6),
        PowerLevel::new(1500.0, 60.0, 1e-6),
        PowerLevel::new(1000.0, 35.0, 1e-6),
    ]
}

pub(crate) fn single_level(speed: f64) -> Vec<PowerLevel> {
    vec![PowerLevel::new(speed, 100.0, 0.0)]
}

/// `sites[i] = (name, hourly prices)`; `nodes[j] = (name, site index, levels)`.
pub(crate) fn catalog(
    sites: &[(&str, Vec<f64>)],
    nodes: Vec<(&str, usize, Vec<PowerLevel>)>,
    network: Network,
) -> Catalog {
    let mut b = CatalogBuilder::new();
    let ids: Vec<_> = sites
        .iter()
        .map(|(name, prices)| b.add_site(*name, PriceSchedule::new(prices.clone()).unwrap()))
        .collect();
    for (name, site, levels) in nodes {
        b.add_node(name, ids[site], levels).unwrap();
    }
    b.build(network).unwrap()
}

/// Two sites (cheap "east", pricier "west"), two DVFS nodes each.
pub(crate) fn two_site_catalog() -> Catalog {
    catalog(
        &[("east", vec![0.10; 24]), ("west", vec![0.25; 24])],
        vec![
            ("e1", 0, dvfs_levels()),
            ("e2", 0, dvfs_levels()),
            ("w1", 1, dvfs_levels()),
            ("w2", 1, dvfs_levels()),
        ],
        Network::new(1.0e6, 1.0e5).unwrap(),
    )
}

/// One node, one level, free network.
pub(crate) fn single_node_catalog(speed: f64) -> Catalog {
    catalog(
        &[("only", vec![0.1])],
        vec![("n0", 0, single_level(speed))],
        Network::unlimited(),
    )
}

/// `a → {b, c} → d` with the given lengths; every edge carries `data` bytes.
pub(crate) fn diamond(id: u64, lengths: [f64; 4], data: f64) -> Workflow {
    let mut b = WorkflowBuilder::new(WorkflowId(id), format!("diamond-{id}"));
    let names = ["a", "b", "c", "d"];
    let ids: Vec<JobId> = names
        .iter()
        .zip(lengths)
        .map(|(n, len)| b.add_job(*n, len).unwrap())
        .collect();
    for (p, c) in [(0, 1), (0, 2), (1, 3), (2, 3)] {
        let file = format!("{}-{}", names[p], names[c]);
        b.add_output(ids[p], Artifact::new(file.clone(), data)).unwrap();
        b.add_input(ids[c], Artifact::new(file, data)).unwrap();
        b.add_dependency(ids[p], ids[c]).unwrap();
    }
    b.build().unwrap()
}

/// `layers` levels of `width` jobs; every job depends on all jobs of the
/// previous layer.  Roots read a resident input from `NodeId(0)`.
pub(crate) fn layered(id: u64, layers: usize, width: usize, length: f64, data: f64) -> Workflow {
    let mut b = WorkflowBuilder::new(WorkflowId(id), format!("layered-{id}"));
    let mut previous: Vec<JobId> = Vec::new();
    for layer in 0..layers {
        let mut current = Vec::new();
        for k in 0..width {
            let name = format!("j{layer}_{k}");
            // Vary lengths a little so ranks are not all tied.
            let job = b.add_job(name.clone(), length * (1.0 + 0.1 * k as f64)).unwrap();
            b.add_output(job, Artifact::new(format!("{name}.out"), data)).unwrap();
            if layer == 0 {
                b.add_input(job, Artifact::new(format!("{name}.in"), data).at(NodeId(0)))
                    .unwrap();
            }
            for p in &previous {
                b.add_input(job, Artifact::new(format!("j{}_{}.out", layer - 1, p.0 % width), data))
                    .unwrap();
                b.add_dependency(*p, job).unwrap();
            }
            current.push(job);
        }
        previous = current;
    }
    b.build().unwrap()
}

/// Everything a [`SearchContext`] borrows, prepared at base time 0.
pub(crate) struct Prepared {
    pub catalog: Catalog,
    pub workflow: Workflow,
    pub profile: VariantProfile,
    pub metrics: MetricsCache,
    pub matrix: ExecMatrix,
    pub deadlines: DeadlinePlan,
}

impl Prepared {
    pub(crate) fn new(catalog: Catalog, workflow: Workflow, profile: VariantProfile, slack: f64) -> Self {
        let metrics =
            MetricsCache::compute(&workflow, &catalog, profile.averaging, profile.speed).unwrap();
        let matrix = ExecMatrix::compute(&workflow, &catalog);
        let deadlines = DeadlinePlan::compute(&workflow, &metrics, 0.0, slack, profile.sub_deadline);
        Self {
            catalog,
            workflow,
            profile,
            metrics,
            matrix,
            deadlines,
        }
    }

    /// Context with no reliability goal, β = 0.8 and three site retries.
    pub(crate) fn ctx(&self, timelines: &Timelines) -> SearchContext<'_> {
        SearchContext::new(
            &self.catalog,
            &self.workflow,
            &self.metrics,
            &self.matrix,
            &self.deadlines,
            ReliabilityBudget::new(0.0, self.workflow.len()),
            self.profile,
            0.8,
            3,
            timelines,
        )
    }
}
