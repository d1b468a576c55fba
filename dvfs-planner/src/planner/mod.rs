/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workflow planner.
//!
//! [`Planner`] places every job of a submitted [`Workflow`] on a
//! (node, power level, start time) of a shared [`Catalog`], minimising energy
//! cost under a deadline and a reliability goal.  State carried between
//! workflows is limited to the per-node [`Timelines`], the running total
//! cost and the global finish time.
//!
//! Per workflow:
//!
//! 1. [`MetricsCache`], [`DeadlinePlan`] and [`ExecMatrix`] are computed once.
//! 2. The sequencer runs one or more passes of the candidate search, each on
//!    its own copy of the timelines.
//! 3. The cheapest feasible pass is committed: its timelines replace the
//!    shared ones and every job gets its binding.  If no pass is feasible the
//!    workflow fails with [`PlannerError::InfeasibleSchedule`] and the shared
//!    state is not touched.
//!
//! # Example
//! ```rust,ignore
//! let mut planner = Planner::from_seed(Arc::new(catalog), PlannerConfig::default());
//! let plan = planner.plan_workflow(&mut workflow)?;
//! println!("cost {:.4}, finish {:.1}s", plan.cost, plan.finish_time);
//! ```

pub(crate) mod candidate;
pub mod error;
pub(crate) mod sequencer;
pub mod solution;
pub mod variant;

pub use error::{MetricKind, PlannerError};
pub use solution::{JobPlacement, PassRecord, SearchStats, Solution, WorkflowPlan};
pub use variant::{PlannerKind, VariantProfile};

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::deadline::DeadlinePlan;
use crate::metrics::MetricsCache;
use crate::reliability::{default_goal, ExecMatrix, ReliabilityBudget};
use crate::resource::Catalog;
use crate::timeline::Timelines;
use crate::workflow::{JobRef, SubmissionOrder, Workflow};

use candidate::SearchContext;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Tunables of one planner instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    pub kind: PlannerKind,
    /// Deadline looseness: `deadline = base + cp · (1 + slack_factor)`.
    pub slack_factor: f64,
    /// Failure rate used for the default reliability goal.
    pub reliability_factor: f64,
    pub seed: u64,
    /// Safety margin of the power-level relaxation.
    pub beta: f64,
    /// Fraction of tie-group members allowed as stagnation (DEWS).
    pub gamma: f64,
    /// Fraction of jobs allowed as stagnation (ECWSD).
    pub tau: f64,
    /// Site attempts of the bounded-retry ordering.
    pub max_site_retries: usize,
    /// Consumed by the execution simulator only.
    pub max_retry_count: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            kind: PlannerKind::Dews,
            slack_factor: 0.5,
            reliability_factor: 1e-5,
            seed: 0,
            beta: 0.8,
            gamma: 0.6,
            tau: 0.6,
            max_site_retries: 3,
            max_retry_count: 3,
        }
    }
}

// ── Planner ───────────────────────────────────────────────────────────────────

/// Plans workflows one at a time against shared node timelines.
pub struct Planner {
    catalog: Arc<Catalog>,
    config: PlannerConfig,
    profile: VariantProfile,
    timelines: Timelines,
    total_cost: f64,
    global_finish_time: f64,
    rng: StdRng,
    /// Every committed job, in commit order.
    committed: Vec<JobRef>,
}

impl Planner {
    pub fn new(catalog: Arc<Catalog>, config: PlannerConfig, rng: StdRng) -> Self {
        let timelines = Timelines::new(catalog.nodes().len());
        Self {
            profile: config.kind.profile(),
            catalog,
            config,
            timelines,
            total_cost: 0.0,
            global_finish_time: 0.0,
            rng,
            committed: Vec::new(),
        }
    }

    /// Planner whose random source is seeded from `config.seed`.
    pub fn from_seed(catalog: Arc<Catalog>, config: PlannerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::new(catalog, config, rng)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn timelines(&self) -> &Timelines {
        &self.timelines
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn global_finish_time(&self) -> f64 {
        self.global_finish_time
    }

    pub fn committed(&self) -> &[JobRef] {
        &self.committed
    }

    // ── Public entry points ───────────────────────────────────────────────────

    /// Plans `workflow` and commits the result.
    ///
    /// On success every job carries its binding and `workflow.deadline` is
    /// set.  The deadline is set on failure too, so callers can report it.
    ///
    /// # Errors
    /// * [`PlannerError::EmptyWorkflow`] for a workflow without jobs.
    /// * [`PlannerError::InfeasibleSchedule`] if no pass met both the deadline
    ///   and the reliability goal; nothing is committed.
    /// * [`PlannerError::InconsistentPrecedence`] and
    ///   [`PlannerError::MissingPredecessorMetric`] on internal ordering
    ///   faults.
    pub fn plan_workflow(&mut self, workflow: &mut Workflow) -> Result<WorkflowPlan, PlannerError> {
        if workflow.is_empty() {
            return Err(PlannerError::EmptyWorkflow {
                workflow: workflow.name.clone(),
            });
        }

        let profile = self.profile;
        let catalog = Arc::clone(&self.catalog);
        let metrics = MetricsCache::compute(workflow, &catalog, profile.averaging, profile.speed)?;
        let base = self.global_finish_time.max(workflow.submitted_at);
        let deadlines = DeadlinePlan::compute(
            workflow,
            &metrics,
            base,
            self.config.slack_factor,
            profile.sub_deadline,
        );
        let goal = workflow.reliability_goal.unwrap_or_else(|| {
            default_goal(workflow, self.config.reliability_factor, metrics.reference_speed())
        });
        workflow.deadline = Some(deadlines.deadline);

        info!(
            planner = %self.config.kind,
            workflow = %workflow.name,
            jobs = workflow.len(),
            base,
            critical_path = deadlines.critical_path,
            deadline = deadlines.deadline,
            reliability_goal = goal,
            "planning workflow"
        );

        let (outcome, workflow_id, name) = {
            let wf: &Workflow = workflow;
            let matrix = ExecMatrix::compute(wf, &catalog);
            let ctx = SearchContext::new(
                &catalog,
                wf,
                &metrics,
                &matrix,
                &deadlines,
                ReliabilityBudget::new(goal, wf.len()),
                profile,
                self.config.beta,
                self.config.max_site_retries,
                &self.timelines,
            );
            let order = sequencer::initial_order(wf, &metrics, profile.priority);
            let groups = sequencer::tie_groups(wf, profile.tie_groups);
            let limit = sequencer::stagnation_limit(
                profile.budget,
                &groups,
                wf.len(),
                self.config.gamma,
                self.config.tau,
            );
            debug!(
                workflow = %wf.name,
                tie_groups = groups.len(),
                stagnation_limit = limit,
                "search budget"
            );
            let outcome =
                sequencer::search(&ctx, &self.timelines, &order, &groups, limit, &mut self.rng)?;
            (outcome, wf.id, wf.name.clone())
        };

        let Some(best) = outcome.best else {
            warn!(
                workflow = %name,
                passes = outcome.stats.passes.len(),
                deadline = deadlines.deadline,
                reliability_goal = goal,
                "no feasible schedule"
            );
            return Err(PlannerError::InfeasibleSchedule {
                workflow_id,
                workflow: name,
                slack_factor: self.config.slack_factor,
                reliability_goal: goal,
                deadline: deadlines.deadline,
            });
        };

        // ── Commit ────────────────────────────────────────────────────────────
        for placement in &best.placements {
            workflow.bind(placement.job, placement.binding());
        }
        self.committed.extend(best.commit_order.iter().map(|&job| JobRef {
            workflow: workflow_id,
            job,
        }));
        self.timelines = best.timelines;
        self.total_cost += best.cost;
        self.global_finish_time = self.global_finish_time.max(best.finish_time);

        info!(
            workflow = %name,
            cost = best.cost,
            finish = best.finish_time,
            reliability = best.reliability,
            passes = outcome.stats.passes.len(),
            total_cost = self.total_cost,
            "workflow committed"
        );

        Ok(WorkflowPlan {
            workflow: workflow_id,
            name,
            deadline: deadlines.deadline,
            reliability_goal: goal,
            cost: best.cost,
            finish_time: best.finish_time,
            reliability: best.reliability,
            placements: best.placements,
            commit_order: best.commit_order,
            stats: outcome.stats,
        })
    }

    /// Sorts `workflows` by `order` and plans them in turn.  A failed
    /// workflow does not stop the batch.
    pub fn plan_batch(
        &mut self,
        workflows: &mut [Workflow],
        order: SubmissionOrder,
    ) -> Vec<Result<WorkflowPlan, PlannerError>> {
        order.sort(workflows);
        workflows
            .iter_mut()
            .map(|wf| self.plan_workflow(wf))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
