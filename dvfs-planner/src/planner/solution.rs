/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Search results: per-job placements, pass solutions and the committed plan.

use crate::resource::NodeId;
use crate::timeline::Timelines;
use crate::workflow::{Binding, JobId, WorkflowId};

/// Where and when one job runs in a solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobPlacement {
    pub job: JobId,
    pub node: NodeId,
    pub level: usize,
    /// All inputs present on `node`.
    pub ready: f64,
    pub start: f64,
    pub finish: f64,
    /// Staging plus execution energy cost.
    pub cost: f64,
    pub reliability: f64,
}

impl JobPlacement {
    pub fn binding(&self) -> Binding {
        Binding {
            node: self.node,
            level: self.level,
            start: self.start,
            finish: self.finish,
            cost: self.cost,
        }
    }
}

/// Outcome of one sequencer pass, with the timelines it produced.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Indexed by job id.
    pub placements: Vec<JobPlacement>,
    pub commit_order: Vec<JobId>,
    pub cost: f64,
    pub finish_time: f64,
    pub reliability: f64,
    pub timelines: Timelines,
}

impl Solution {
    pub fn placement(&self, job: JobId) -> &JobPlacement {
        &self.placements[job.0]
    }
}

/// Bookkeeping for one pass of the local search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassRecord {
    pub cost: f64,
    pub finish_time: f64,
    pub reliability: f64,
    pub feasible: bool,
    pub accepted: bool,
    /// Stagnation counter after this pass.
    pub stagnation: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    pub stagnation_limit: usize,
    pub tie_groups: usize,
    pub passes: Vec<PassRecord>,
}

impl SearchStats {
    /// Costs of the accepted passes, in acceptance order.
    pub fn accepted_costs(&self) -> Vec<f64> {
        self.passes
            .iter()
            .filter(|p| p.accepted)
            .map(|p| p.cost)
            .collect()
    }
}

/// The committed plan of one workflow.
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub workflow: WorkflowId,
    pub name: String,
    pub deadline: f64,
    pub reliability_goal: f64,
    pub cost: f64,
    pub finish_time: f64,
    pub reliability: f64,
    /// Indexed by job id.
    pub placements: Vec<JobPlacement>,
    pub commit_order: Vec<JobId>,
    pub stats: SearchStats,
}

impl WorkflowPlan {
    pub fn feasible(&self) -> bool {
        self.finish_time <= self.deadline && self.reliability >= self.reliability_goal
    }
}
