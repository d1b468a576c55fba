/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Execution-time / reliability matrix and per-job reliability budgets.
//!
//! For job `j` on node `n` at level `l`:
//! `exec = length(j) / speed(n, l)` and `rel = exp(-λ(n, l) · exec)`.
//!
//! The workflow goal `G` is spread geometrically over its `N` jobs.  With
//! `avg = G^(1/N)` and `R` the product of reliabilities already committed in
//! the current pass, the `i`-th job (0-based) must reach
//!
//! ```text
//! subGoal(i) = G / (R · avg^(N − i − 1))
//! ```
//!
//! so that meeting every sub-goal meets `G`.

use crate::resource::{Catalog, NodeId};
use crate::workflow::{JobId, Workflow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelEstimate {
    pub exec_time: f64,
    pub reliability: f64,
}

/// `(exec_time, reliability)` for every (job, node, level).
#[derive(Debug, Clone)]
pub struct ExecMatrix {
    estimates: Vec<Vec<Vec<LevelEstimate>>>,
}

impl ExecMatrix {
    pub fn compute(workflow: &Workflow, catalog: &Catalog) -> Self {
        let estimates = workflow
            .jobs()
            .iter()
            .map(|job| {
                catalog
                    .nodes()
                    .iter()
                    .map(|node| {
                        node.levels()
                            .iter()
                            .map(|level| LevelEstimate {
                                exec_time: level.exec_time(job.length),
                                reliability: level.reliability(job.length),
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self { estimates }
    }

    pub fn get(&self, job: JobId, node: NodeId, level: usize) -> LevelEstimate {
        self.estimates[job.0][node.0][level]
    }

    pub fn levels(&self, job: JobId, node: NodeId) -> &[LevelEstimate] {
        &self.estimates[job.0][node.0]
    }
}

/// Default goal when a workflow carries none: the reliability of running
/// the whole workload at the reference speed under `reliability_factor`.
pub fn default_goal(workflow: &Workflow, reliability_factor: f64, reference_speed: f64) -> f64 {
    (-reliability_factor * workflow.total_length() / reference_speed).exp()
}

/// Geometric split of a workflow reliability goal over its jobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliabilityBudget {
    goal: f64,
    per_job: f64,
    jobs: usize,
}

impl ReliabilityBudget {
    pub fn new(goal: f64, jobs: usize) -> Self {
        let per_job = if jobs == 0 {
            1.0
        } else {
            goal.max(0.0).powf(1.0 / jobs as f64)
        };
        Self { goal, per_job, jobs }
    }

    pub fn goal(&self) -> f64 {
        self.goal
    }

    pub fn per_job(&self) -> f64 {
        self.per_job
    }

    /// Minimum reliability for the next job, given the product `achieved`
    /// of the `committed` jobs placed so far.  A non-positive goal never
    /// prunes.
    pub fn sub_goal(&self, achieved: f64, committed: usize) -> f64 {
        if self.goal <= 0.0 {
            return 0.0;
        }
        let remaining_after = self.jobs.saturating_sub(committed + 1);
        self.goal / (achieved * self.per_job.powi(remaining_after as i32))
    }

    pub fn is_met(&self, reliability: f64) -> bool {
        reliability >= self.goal
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
