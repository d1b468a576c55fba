/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-workflow derived metrics, computed once before the search starts.
//!
//! With `w(j) = length(j) / reference_speed + avgLocal(j)` and
//! `c(p, j)` the average transfer time of the data `j` reads from `p`:
//!
//! ```text
//! EFT(j)  = w(j) + max_p ( EFT(p) + c(p, j) )              forward, by depth
//! up(j)   = w(j) + max_c ( up(c)  + c(j, c) )              backward
//! down(j) =        max_p ( down(p) + w(p) + c(p, j) )      forward, roots = 0
//! ```
//!
//! The longest `EFT` and the largest upward rank are both the critical path
//! length of the workflow.

use crate::planner::error::{MetricKind, PlannerError};
use crate::resource::Catalog;
use crate::workflow::{Job, JobId, Workflow};

/// How the mean transfer time of a parent→child edge is taken over the
/// catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredecessorAveraging {
    /// Literal mean over every ordered node pair, `O(nodes²)` per edge.
    NodePairs,
    /// Same expectation from per-site node counts, `O(sites)` per edge.
    SiteAggregated,
}

/// Which node speed converts job lengths into times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedReference {
    /// Mean of the nodes' top speeds.
    Mean,
    /// Fastest top speed in the catalog.
    Fastest,
}

/// Derived timing metrics for one workflow against one catalog.
#[derive(Debug, Clone)]
pub struct MetricsCache {
    reference_speed: f64,
    /// `[job][node]` seconds to stage the job's local inputs.
    local_transfer: Vec<Vec<f64>>,
    avg_local: Vec<f64>,
    /// `[job][k]` mean transfer from `job.parents[k]`.
    avg_pred: Vec<Vec<f64>>,
    eft: Vec<f64>,
    upward: Vec<f64>,
    downward: Vec<f64>,
}

impl MetricsCache {
    pub fn compute(
        workflow: &Workflow,
        catalog: &Catalog,
        averaging: PredecessorAveraging,
        speed: SpeedReference,
    ) -> Result<Self, PlannerError> {
        let reference_speed = match speed {
            SpeedReference::Mean => catalog.mean_top_speed(),
            SpeedReference::Fastest => catalog.max_top_speed(),
        };

        let local_transfer: Vec<Vec<f64>> = workflow
            .jobs()
            .iter()
            .map(|job| {
                catalog
                    .nodes()
                    .iter()
                    .map(|node| {
                        job.local_inputs
                            .iter()
                            .map(|a| catalog.fetch_time(a.size_bytes, a.location, node.id))
                            .sum()
                    })
                    .collect()
            })
            .collect();
        let avg_local = local_transfer
            .iter()
            .map(|row| row.iter().sum::<f64>() / row.len() as f64)
            .collect();

        let avg_pred = workflow
            .jobs()
            .iter()
            .map(|job| {
                job.parents
                    .iter()
                    .map(|p| mean_transfer(catalog, job.data_from(workflow.job(*p)), averaging))
                    .collect()
            })
            .collect();

        let mut cache = Self {
            reference_speed,
            local_transfer,
            avg_local,
            avg_pred,
            eft: Vec::new(),
            upward: Vec::new(),
            downward: Vec::new(),
        };

        let order = workflow.depth_order();
        cache.eft = cache.earliest_finish_pass(workflow, &order)?;
        cache.upward = cache.upward_rank_pass(workflow, &order)?;
        cache.downward = cache.downward_rank_pass(workflow, &order)?;
        Ok(cache)
    }

    // ── Passes ────────────────────────────────────────────────────────────────

    pub(crate) fn earliest_finish_pass(
        &self,
        workflow: &Workflow,
        order: &[JobId],
    ) -> Result<Vec<f64>, PlannerError> {
        let mut eft: Vec<Option<f64>> = vec![None; workflow.len()];
        for &id in order {
            let job = workflow.job(id);
            let mut start = 0.0_f64;
            for (k, p) in job.parents.iter().enumerate() {
                let parent = eft[p.0]
                    .ok_or_else(|| missing(MetricKind::EarliestFinish, workflow, id, *p))?;
                start = start.max(parent + self.avg_pred[id.0][k]);
            }
            eft[id.0] = Some(start + self.weight(job));
        }
        finish(eft, MetricKind::EarliestFinish, workflow)
    }

    fn upward_rank_pass(
        &self,
        workflow: &Workflow,
        order: &[JobId],
    ) -> Result<Vec<f64>, PlannerError> {
        let mut up: Vec<Option<f64>> = vec![None; workflow.len()];
        for &id in order.iter().rev() {
            let job = workflow.job(id);
            let mut tail = 0.0_f64;
            for c in &job.children {
                let child = up[c.0].ok_or_else(|| missing(MetricKind::UpwardRank, workflow, id, *c))?;
                tail = tail.max(child + self.pred_transfer(workflow, *c, id));
            }
            up[id.0] = Some(self.weight(job) + tail);
        }
        finish(up, MetricKind::UpwardRank, workflow)
    }

    fn downward_rank_pass(
        &self,
        workflow: &Workflow,
        order: &[JobId],
    ) -> Result<Vec<f64>, PlannerError> {
        let mut down: Vec<Option<f64>> = vec![None; workflow.len()];
        for &id in order {
            let job = workflow.job(id);
            let mut head = 0.0_f64;
            for (k, p) in job.parents.iter().enumerate() {
                let parent =
                    down[p.0].ok_or_else(|| missing(MetricKind::DownwardRank, workflow, id, *p))?;
                head = head.max(parent + self.weight(workflow.job(*p)) + self.avg_pred[id.0][k]);
            }
            down[id.0] = Some(head);
        }
        finish(down, MetricKind::DownwardRank, workflow)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn reference_speed(&self) -> f64 {
        self.reference_speed
    }

    /// Mean execution plus staging time of `job`.
    pub fn weight(&self, job: &Job) -> f64 {
        job.length / self.reference_speed + self.avg_local[job.id.0]
    }

    pub fn local_transfer(&self, job: JobId, node: crate::resource::NodeId) -> f64 {
        self.local_transfer[job.0][node.0]
    }

    pub fn avg_local_transfer(&self, job: JobId) -> f64 {
        self.avg_local[job.0]
    }

    /// Mean transfer time of the data `job` reads from `parent`; 0 when
    /// `parent` is not a parent of `job`.
    pub fn pred_transfer(&self, workflow: &Workflow, job: JobId, parent: JobId) -> f64 {
        workflow
            .job(job)
            .parents
            .iter()
            .position(|p| *p == parent)
            .map_or(0.0, |k| self.avg_pred[job.0][k])
    }

    pub fn eft(&self, job: JobId) -> f64 {
        self.eft[job.0]
    }

    pub fn upward_rank(&self, job: JobId) -> f64 {
        self.upward[job.0]
    }

    pub fn downward_rank(&self, job: JobId) -> f64 {
        self.downward[job.0]
    }

    /// Longest estimated finish time of any job.
    pub fn critical_path(&self) -> f64 {
        self.eft.iter().copied().fold(0.0, f64::max)
    }

    pub fn max_upward_rank(&self) -> f64 {
        self.upward.iter().copied().fold(0.0, f64::max)
    }
}

/// Mean seconds to move `data` bytes between two nodes drawn uniformly from
/// the catalog (same-node pairs included, at zero cost).
pub fn mean_transfer(catalog: &Catalog, data: f64, averaging: PredecessorAveraging) -> f64 {
    if data == 0.0 {
        return 0.0;
    }
    let nodes = catalog.nodes();
    let n = nodes.len() as f64;
    match averaging {
        PredecessorAveraging::NodePairs => {
            let mut total = 0.0;
            for a in nodes {
                for b in nodes {
                    total += catalog.transfer_time(data, a.id, b.id);
                }
            }
            total / (n * n)
        }
        PredecessorAveraging::SiteAggregated => {
            let mut per_site = vec![0.0_f64; catalog.sites().len()];
            for node in nodes {
                per_site[node.site.0] += 1.0;
            }
            let same_site_sq: f64 = per_site.iter().map(|c| c * c).sum();
            let intra_pairs = same_site_sq - n;
            let inter_pairs = n * n - same_site_sq;
            let net = catalog.network();
            let mut total = 0.0;
            if intra_pairs > 0.0 {
                total += intra_pairs * data / net.intra_site_bandwidth;
            }
            if inter_pairs > 0.0 {
                total += inter_pairs * data / net.inter_site_bandwidth;
            }
            total / (n * n)
        }
    }
}

fn missing(metric: MetricKind, workflow: &Workflow, job: JobId, predecessor: JobId) -> PlannerError {
    PlannerError::MissingPredecessorMetric {
        metric,
        job: workflow.job(job).name.clone(),
        predecessor: workflow.job(predecessor).name.clone(),
    }
}

fn finish(
    values: Vec<Option<f64>>,
    metric: MetricKind,
    workflow: &Workflow,
) -> Result<Vec<f64>, PlannerError> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| missing(metric, workflow, JobId(i), JobId(i))))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::resource::{Network, NodeId};

    const EPS: f64 = 1e-9;

    #[test]
    fn chain_on_free_network_sums_lengths() {
        let catalog = fixtures::single_node_catalog(100.0);
        let wf = fixtures::diamond(1, [100.0, 200.0, 300.0, 400.0], 0.0);
        let m = MetricsCache::compute(
            &wf,
            &catalog,
            PredecessorAveraging::SiteAggregated,
            SpeedReference::Mean,
        )
        .unwrap();
        assert_eq!(m.eft(JobId(0)), 1.0);
        assert_eq!(m.eft(JobId(1)), 3.0);
        assert_eq!(m.eft(JobId(2)), 4.0);
        assert_eq!(m.eft(JobId(3)), 8.0);
        assert_eq!(m.critical_path(), 8.0);
    }

    #[test]
    fn upward_rank_peaks_at_critical_path() {
        let catalog = fixtures::two_site_catalog();
        let wf = fixtures::diamond(1, [4000.0, 8000.0, 2000.0, 6000.0], 5.0e5);
        let m = MetricsCache::compute(
            &wf,
            &catalog,
            PredecessorAveraging::SiteAggregated,
            SpeedReference::Mean,
        )
        .unwrap();
        assert!((m.max_upward_rank() - m.critical_path()).abs() < EPS);
        assert!((m.upward_rank(JobId(0)) - m.critical_path()).abs() < EPS);
        // a → b → d is critical, so up + down equals the path length there
        for j in [0, 1, 3] {
            let total = m.upward_rank(JobId(j)) + m.downward_rank(JobId(j));
            assert!((total - m.critical_path()).abs() < EPS, "job {j}: {total}");
        }
        assert!(m.upward_rank(JobId(2)) + m.downward_rank(JobId(2)) < m.critical_path());
        assert_eq!(m.downward_rank(JobId(0)), 0.0);
    }

    #[test]
    fn averaging_modes_agree() {
        let catalog = fixtures::catalog(
            &[("a", vec![0.1]), ("b", vec![0.2]), ("c", vec![0.3])],
            vec![
                ("a1", 0, fixtures::dvfs_levels()),
                ("a2", 0, fixtures::dvfs_levels()),
                ("a3", 0, fixtures::dvfs_levels()),
                ("b1", 1, fixtures::dvfs_levels()),
                ("c1", 2, fixtures::dvfs_levels()),
                ("c2", 2, fixtures::dvfs_levels()),
            ],
            Network::new(1000.0, 50.0).unwrap(),
        );
        for data in [0.0, 1.0, 12_345.0] {
            let pairs = mean_transfer(&catalog, data, PredecessorAveraging::NodePairs);
            let sites = mean_transfer(&catalog, data, PredecessorAveraging::SiteAggregated);
            assert!((pairs - sites).abs() < 1e-9 * pairs.max(1.0), "{pairs} vs {sites}");
        }
    }

    #[test]
    fn pair_average_counts_same_node_pairs() {
        // two nodes on one site at 10 B/s: half the pairs are free
        let catalog = fixtures::catalog(
            &[("s", vec![0.1])],
            vec![
                ("x", 0, fixtures::single_level(1.0)),
                ("y", 0, fixtures::single_level(1.0)),
            ],
            Network::new(10.0, 1.0).unwrap(),
        );
        let t = mean_transfer(&catalog, 100.0, PredecessorAveraging::NodePairs);
        assert!((t - 5.0).abs() < EPS);
    }

    #[test]
    fn local_transfer_depends_on_artifact_location() {
        let catalog = fixtures::two_site_catalog();
        let wf = fixtures::layered(3, 2, 2, 1000.0, 1.0e5);
        let m = MetricsCache::compute(
            &wf,
            &catalog,
            PredecessorAveraging::SiteAggregated,
            SpeedReference::Fastest,
        )
        .unwrap();
        // roots read 1e5 bytes from e1
        assert_eq!(m.local_transfer(JobId(0), NodeId(0)), 0.0);
        assert!((m.local_transfer(JobId(0), NodeId(1)) - 0.1).abs() < EPS);
        assert!((m.local_transfer(JobId(0), NodeId(2)) - 1.0).abs() < EPS);
        assert!((m.avg_local_transfer(JobId(0)) - 2.1 / 4.0).abs() < EPS);
        assert_eq!(m.avg_local_transfer(JobId(2)), 0.0);
        assert_eq!(m.reference_speed(), 2000.0);
    }

    #[test]
    fn out_of_order_pass_reports_missing_predecessor() {
        let catalog = fixtures::single_node_catalog(100.0);
        let wf = fixtures::diamond(1, [1.0, 1.0, 1.0, 1.0], 0.0);
        let m = MetricsCache::compute(
            &wf,
            &catalog,
            PredecessorAveraging::SiteAggregated,
            SpeedReference::Mean,
        )
        .unwrap();
        let mut reversed = wf.depth_order();
        reversed.reverse();
        let err = m.earliest_finish_pass(&wf, &reversed).unwrap_err();
        assert!(matches!(
            err,
            PlannerError::MissingPredecessorMetric {
                metric: MetricKind::EarliestFinish,
                ..
            }
        ));
    }
}
