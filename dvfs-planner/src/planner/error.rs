/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the workflow planner.
//!
//! | Variant | Raised by | Effect |
//! |---|---|---|
//! | `EmptyWorkflow` | [`Planner::plan_workflow`] precondition | workflow rejected |
//! | `UnknownPlanner` | [`PlannerKind`] parsing | configuration rejected |
//! | `MissingPredecessorMetric` | metrics cache | workflow aborted (internal fault) |
//! | `InconsistentPrecedence` | sequencer pass | workflow aborted (internal fault) |
//! | `InfeasibleSchedule` | sequencer termination | workflow not committed |
//!
//! Every failure leaves the planner's shared timelines and totals untouched.
//!
//! [`Planner::plan_workflow`]: super::Planner::plan_workflow
//! [`PlannerKind`]: super::PlannerKind

use thiserror::Error;

use crate::workflow::WorkflowId;

/// Which derived metric was being computed when a dependency was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    EarliestFinish,
    UpwardRank,
    DownwardRank,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::EarliestFinish => write!(f, "earliest finish time"),
            MetricKind::UpwardRank => write!(f, "upward rank"),
            MetricKind::DownwardRank => write!(f, "downward rank"),
        }
    }
}

/// Top-level error type returned by the planner.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    #[error("workflow '{workflow}' has no jobs")]
    EmptyWorkflow { workflow: String },

    #[error("unknown planner: '{0}' (valid: random, heft, epee, dews, ecwsd, reliability_aware)")]
    UnknownPlanner(String),

    /// A metric was read for a neighbour that had not been computed yet.
    /// Indicates a broken evaluation order.
    #[error("{metric} of '{predecessor}' is not available while computing '{job}'")]
    MissingPredecessorMetric {
        metric: MetricKind,
        job: String,
        predecessor: String,
    },

    /// A pass committed a job before one of its parents.
    #[error("workflow '{workflow}': job '{job}' was ordered before its parent '{parent}'")]
    InconsistentPrecedence {
        workflow: String,
        job: String,
        parent: String,
    },

    /// No pass produced a schedule meeting both the deadline and the
    /// reliability goal.
    #[error(
        "no feasible schedule for workflow {workflow_id} '{workflow}' \
         (slack factor {slack_factor}, reliability goal {reliability_goal:.6}, deadline {deadline:.1}s)"
    )]
    InfeasibleSchedule {
        workflow_id: WorkflowId,
        workflow: String,
        slack_factor: f64,
        reliability_goal: f64,
        deadline: f64,
    },
}
