/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workflow deadline and per-job sub-deadlines.
//!
//! With `base` the planner's current finish time (or the workflow's
//! submission time, whichever is later) and `cp` the critical path:
//!
//! ```text
//! deadline = base + cp · (1 + slack_factor)
//! slack    = cp · slack_factor
//! ```
//!
//! Each [`SubDeadlineRule`] hands part of `slack` to every job.  The raw
//! values are then normalised so that a child never gets an earlier
//! sub-deadline than its parents, nothing exceeds the deadline, and every
//! exit job gets the deadline itself.

use crate::metrics::MetricsCache;
use crate::workflow::{JobId, Workflow};

/// How the workflow slack is distributed over its jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubDeadlineRule {
    /// `base + eft · (1 + slack_factor)`.
    EftScaled,
    /// `base + eft + slack · (depth + 1) / (max_depth + 1)`.
    DepthShare,
    /// `base + eft + (cp − up + w) · slack / cp`.
    RankShare,
    /// `i`-th job by descending upward rank gets `base + eft + (i + 1) · slack / n`.
    PositionShare,
}

/// Deadline and sub-deadlines of one workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlinePlan {
    pub base: f64,
    pub critical_path: f64,
    pub deadline: f64,
    sub_deadlines: Vec<f64>,
}

impl DeadlinePlan {
    pub fn compute(
        workflow: &Workflow,
        metrics: &MetricsCache,
        base: f64,
        slack_factor: f64,
        rule: SubDeadlineRule,
    ) -> Self {
        let cp = metrics.critical_path();
        let slack = cp * slack_factor;
        let deadline = base + cp + slack;

        let mut sub: Vec<f64> = match rule {
            SubDeadlineRule::EftScaled => workflow
                .jobs()
                .iter()
                .map(|j| base + metrics.eft(j.id) * (1.0 + slack_factor))
                .collect(),

            SubDeadlineRule::DepthShare => {
                let levels = (workflow.max_depth() + 1) as f64;
                workflow
                    .jobs()
                    .iter()
                    .map(|j| base + metrics.eft(j.id) + slack * (j.depth + 1) as f64 / levels)
                    .collect()
            }

            SubDeadlineRule::RankShare => workflow
                .jobs()
                .iter()
                .map(|j| {
                    let eft = base + metrics.eft(j.id);
                    let top = metrics.max_upward_rank();
                    if top > 0.0 {
                        let share = top - metrics.upward_rank(j.id) + metrics.weight(j);
                        eft + share * slack / top
                    } else {
                        eft
                    }
                })
                .collect(),

            SubDeadlineRule::PositionShare => {
                let mut by_rank: Vec<JobId> = workflow.jobs().iter().map(|j| j.id).collect();
                by_rank.sort_by(|a, b| {
                    metrics
                        .upward_rank(*b)
                        .total_cmp(&metrics.upward_rank(*a))
                        .then(a.cmp(b))
                });
                let n = workflow.len() as f64;
                let mut sub = vec![0.0; workflow.len()];
                for (i, id) in by_rank.into_iter().enumerate() {
                    sub[id.0] = base + metrics.eft(id) + (i + 1) as f64 * slack / n;
                }
                sub
            }
        };

        // Monotone along edges, capped at the deadline, exits on the deadline.
        for id in workflow.depth_order() {
            let job = workflow.job(id);
            let floor = job
                .parents
                .iter()
                .map(|p| sub[p.0])
                .fold(f64::NEG_INFINITY, f64::max);
            sub[id.0] = sub[id.0].max(floor).min(deadline);
            if job.is_sink() {
                sub[id.0] = deadline;
            }
        }

        Self {
            base,
            critical_path: cp,
            deadline,
            sub_deadlines: sub,
        }
    }

    pub fn sub_deadline(&self, job: JobId) -> f64 {
        self.sub_deadlines[job.0]
    }

    pub fn sub_deadlines(&self) -> &[f64] {
        &self.sub_deadlines
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::metrics::{PredecessorAveraging, SpeedReference};

    const RULES: [SubDeadlineRule; 4] = [
        SubDeadlineRule::EftScaled,
        SubDeadlineRule::DepthShare,
        SubDeadlineRule::RankShare,
        SubDeadlineRule::PositionShare,
    ];

    fn setup() -> (Workflow, MetricsCache) {
        let catalog = fixtures::two_site_catalog();
        let wf = fixtures::layered(1, 4, 3, 4.0e4, 2.0e5);
        let m = MetricsCache::compute(
            &wf,
            &catalog,
            PredecessorAveraging::SiteAggregated,
            SpeedReference::Mean,
        )
        .unwrap();
        (wf, m)
    }

    #[test]
    fn deadline_scales_critical_path() {
        let (wf, m) = setup();
        let plan = DeadlinePlan::compute(&wf, &m, 100.0, 0.5, SubDeadlineRule::EftScaled);
        assert!((plan.deadline - (100.0 + 1.5 * m.critical_path())).abs() < 1e-9);
        assert_eq!(plan.base, 100.0);
    }

    #[test]
    fn every_rule_is_monotone_and_ends_on_the_deadline() {
        let (wf, m) = setup();
        for rule in RULES {
            let plan = DeadlinePlan::compute(&wf, &m, 0.0, 0.8, rule);
            for job in wf.jobs() {
                let s = plan.sub_deadline(job.id);
                assert!(s <= plan.deadline, "{rule:?}: {s} > {}", plan.deadline);
                assert!(s >= m.eft(job.id) - 1e-9, "{rule:?}: below EFT");
                for p in &job.parents {
                    assert!(plan.sub_deadline(*p) <= s, "{rule:?}: parent after child");
                }
                if job.is_sink() {
                    assert_eq!(s, plan.deadline);
                }
            }
        }
    }

    #[test]
    fn zero_slack_pins_sub_deadlines_to_eft() {
        let (wf, m) = setup();
        let plan = DeadlinePlan::compute(&wf, &m, 0.0, 0.0, SubDeadlineRule::DepthShare);
        let root = wf.roots().next().unwrap().id;
        assert!((plan.sub_deadline(root) - m.eft(root)).abs() < 1e-9);
        assert!((plan.deadline - m.critical_path()).abs() < 1e-9);
    }

    #[test]
    fn depth_share_grows_with_depth() {
        let (wf, m) = setup();
        let plan = DeadlinePlan::compute(&wf, &m, 0.0, 1.0, SubDeadlineRule::DepthShare);
        let root = wf.job(JobId(0));
        let slack = m.critical_path();
        let expected = m.eft(root.id) + slack / (wf.max_depth() + 1) as f64;
        assert!((plan.sub_deadline(root.id) - expected).abs() < 1e-9);
    }
}
