/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Job sequencing and iterated local search.
//!
//! A *pass* walks a job order, placing every job whose parents are already
//! placed and sweeping again until all jobs are placed.  Each pass starts
//! from a fresh copy of the planner's timelines.
//!
//! The search keeps the cheapest feasible pass.  A pass is accepted only if
//! it is feasible and strictly cheaper than the incumbent, which resets the
//! stagnation counter `k` to 0; any other pass increments `k`.  Between
//! passes the best order (or the initial one while nothing is feasible) is
//! perturbed by swapping two random members inside `k` distinct tie groups.
//! The search stops once `k` reaches the variant's stagnation limit.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use tracing::debug;

use crate::metrics::MetricsCache;
use crate::timeline::Timelines;
use crate::workflow::{JobId, Workflow};

use super::candidate::{place_job, PassState, SearchContext};
use super::error::PlannerError;
use super::solution::{PassRecord, SearchStats, Solution};
use super::variant::{PriorityKey, SearchBudget, TieGroups};

/// Hard ceiling on passes per workflow.
const PASS_LIMIT: usize = 10_000;

/// Best feasible solution (if any) and the pass history.
#[derive(Debug)]
pub(crate) struct SearchOutcome {
    pub best: Option<Solution>,
    pub stats: SearchStats,
}

// ── Ordering & groups ─────────────────────────────────────────────────────────

/// Initial sequence for `key`; ties break on depth, then job id.
pub(crate) fn initial_order(workflow: &Workflow, metrics: &MetricsCache, key: PriorityKey) -> Vec<JobId> {
    let depth = |id: &JobId| workflow.job(*id).depth;
    let mut order: Vec<JobId> = workflow.jobs().iter().map(|j| j.id).collect();
    match key {
        PriorityKey::UpwardRank => order.sort_by(|a, b| {
            metrics
                .upward_rank(*b)
                .total_cmp(&metrics.upward_rank(*a))
                .then(depth(a).cmp(&depth(b)))
                .then(a.cmp(b))
        }),
        PriorityKey::Depth => order.sort_by_key(|id| (depth(id), *id)),
        PriorityKey::Eft => order.sort_by(|a, b| {
            metrics
                .eft(*a)
                .total_cmp(&metrics.eft(*b))
                .then(depth(a).cmp(&depth(b)))
                .then(a.cmp(b))
        }),
        PriorityKey::CriticalPath => order.sort_by(|a, b| {
            let through = |id: &JobId| metrics.upward_rank(*id) + metrics.downward_rank(*id);
            depth(a)
                .cmp(&depth(b))
                .then(through(b).total_cmp(&through(a)))
                .then(a.cmp(b))
        }),
    }
    order
}

/// Groups of two or more jobs whose order may be swapped.
pub(crate) fn tie_groups(workflow: &Workflow, rule: TieGroups) -> Vec<Vec<JobId>> {
    match rule {
        TieGroups::SharedDepth => workflow
            .depth_groups()
            .into_iter()
            .filter(|g| g.len() > 1)
            .collect(),
        TieGroups::SharedParent => workflow
            .jobs()
            .iter()
            .filter(|j| j.children.len() > 1)
            .map(|j| j.children.clone())
            .collect(),
    }
}

/// Consecutive non-improving passes allowed; never below 1.
pub(crate) fn stagnation_limit(
    budget: SearchBudget,
    groups: &[Vec<JobId>],
    jobs: usize,
    gamma: f64,
    tau: f64,
) -> usize {
    let limit = match budget {
        SearchBudget::SinglePass => 1,
        SearchBudget::FractionOfCandidates => {
            let candidates: usize = groups.iter().map(Vec::len).sum();
            (gamma * candidates as f64).floor() as usize
        }
        SearchBudget::GroupCount => groups.len(),
        SearchBudget::BoundedFractionOfJobs => {
            ((tau * jobs as f64).floor() as usize).min(groups.len())
        }
    };
    limit.max(1)
}

/// Swaps two random members in each of `k` distinct random groups of
/// `base`.
pub(crate) fn perturb(base: &[JobId], groups: &[Vec<JobId>], k: usize, rng: &mut StdRng) -> Vec<JobId> {
    let mut order = base.to_vec();
    let picks = k.min(groups.len());
    if picks == 0 {
        return order;
    }
    for g in index::sample(rng, groups.len(), picks).into_iter() {
        let group = &groups[g];
        if group.len() < 2 {
            continue;
        }
        let a = rng.random_range(0..group.len());
        let mut b = rng.random_range(0..group.len() - 1);
        if b >= a {
            b += 1;
        }
        let pa = order.iter().position(|&j| j == group[a]);
        let pb = order.iter().position(|&j| j == group[b]);
        if let (Some(pa), Some(pb)) = (pa, pb) {
            order.swap(pa, pb);
        }
    }
    order
}

// ── Passes ────────────────────────────────────────────────────────────────────

/// Names the first unplaced job and its first unplaced parent.  A workflow
/// with nothing left to place can only be an empty one.
fn first_blocked(workflow: &Workflow, state: &PassState) -> PlannerError {
    let Some(job) = workflow.jobs().iter().find(|j| !state.is_placed(j.id)) else {
        return PlannerError::EmptyWorkflow {
            workflow: workflow.name.clone(),
        };
    };
    let parent = job
        .parents
        .iter()
        .find(|p| !state.is_placed(**p))
        .map_or(job.id, |p| *p);
    PlannerError::InconsistentPrecedence {
        workflow: workflow.name.clone(),
        job: job.name.clone(),
        parent: workflow.job(parent).name.clone(),
    }
}

/// Checks every job was committed after all of its parents.
pub(crate) fn verify_topological(workflow: &Workflow, commit_order: &[JobId]) -> Result<(), PlannerError> {
    let mut position = vec![usize::MAX; workflow.len()];
    for (i, id) in commit_order.iter().enumerate() {
        position[id.0] = i;
    }
    for &id in commit_order {
        let job = workflow.job(id);
        if let Some(p) = job.parents.iter().find(|p| position[p.0] >= position[id.0]) {
            return Err(PlannerError::InconsistentPrecedence {
                workflow: workflow.name.clone(),
                job: job.name.clone(),
                parent: workflow.job(*p).name.clone(),
            });
        }
    }
    Ok(())
}

/// Places every job following `order`, on a copy of `base`.
pub(crate) fn run_pass(
    ctx: &SearchContext<'_>,
    base: &Timelines,
    order: &[JobId],
    rng: &mut StdRng,
) -> Result<Solution, PlannerError> {
    let workflow = ctx.workflow;
    let mut state = PassState::new(base.clone(), workflow.len());

    while state.commit_order.len() < workflow.len() {
        let mut progressed = false;
        for &id in order {
            if state.is_placed(id) {
                continue;
            }
            if !workflow.job(id).parents.iter().all(|p| state.is_placed(*p)) {
                continue;
            }
            place_job(ctx, &mut state, id, rng)?;
            progressed = true;
        }
        if !progressed {
            return Err(first_blocked(workflow, &state));
        }
    }

    verify_topological(workflow, &state.commit_order)?;
    state
        .into_solution()
        .map_err(|state| first_blocked(workflow, &state))
}

// ── Local search ──────────────────────────────────────────────────────────────

/// Runs passes until the stagnation limit is reached (or once for
/// single-pass variants) and returns the cheapest feasible solution.
pub(crate) fn search(
    ctx: &SearchContext<'_>,
    base: &Timelines,
    initial: &[JobId],
    groups: &[Vec<JobId>],
    limit: usize,
    rng: &mut StdRng,
) -> Result<SearchOutcome, PlannerError> {
    let single_pass = ctx.profile.budget == SearchBudget::SinglePass;
    let mut stats = SearchStats {
        stagnation_limit: limit,
        tie_groups: groups.len(),
        passes: Vec::new(),
    };
    let mut best: Option<Solution> = None;
    let mut best_order: Option<Vec<JobId>> = None;
    let mut order = initial.to_vec();
    let mut k = 0usize;

    loop {
        let solution = run_pass(ctx, base, &order, rng)?;
        let feasible = solution.finish_time <= ctx.deadlines.deadline
            && ctx.budget.is_met(solution.reliability);
        let accepted = feasible && best.as_ref().map_or(true, |b| solution.cost < b.cost);
        k = if accepted { 0 } else { k + 1 };

        debug!(
            workflow = %ctx.workflow.name,
            pass = stats.passes.len(),
            cost = solution.cost,
            finish = solution.finish_time,
            reliability = solution.reliability,
            feasible,
            accepted,
            k,
            "pass"
        );
        stats.passes.push(PassRecord {
            cost: solution.cost,
            finish_time: solution.finish_time,
            reliability: solution.reliability,
            feasible,
            accepted,
            stagnation: k,
        });

        if accepted {
            best = Some(solution);
            best_order = Some(order.clone());
        }
        if single_pass || k >= limit || stats.passes.len() >= PASS_LIMIT {
            break;
        }
        order = perturb(best_order.as_deref().unwrap_or(initial), groups, k, rng);
    }

    Ok(SearchOutcome { best, stats })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Prepared};
    use crate::planner::variant::PlannerKind;
    use crate::workflow::{WorkflowBuilder, WorkflowId};
    use rand::SeedableRng;

    fn assert_topological(workflow: &Workflow, order: &[JobId]) {
        verify_topological(workflow, order).unwrap();
    }

    #[test]
    fn every_priority_key_yields_a_topological_order() {
        let wf = fixtures::layered(1, 4, 3, 3.0e4, 1.0e5);
        let catalog = fixtures::two_site_catalog();
        for kind in PlannerKind::ALL {
            let p = Prepared::new(catalog.clone(), wf.clone(), kind.profile(), 1.0);
            let order = initial_order(&p.workflow, &p.metrics, kind.profile().priority);
            assert_eq!(order.len(), wf.len());
            assert_topological(&wf, &order);
        }
    }

    #[test]
    fn tie_groups_by_depth_and_parent() {
        let layered = fixtures::layered(1, 3, 3, 1.0, 0.0);
        let by_depth = tie_groups(&layered, TieGroups::SharedDepth);
        assert_eq!(by_depth.len(), 3);
        assert!(by_depth.iter().all(|g| g.len() == 3));

        let diamond = fixtures::diamond(2, [1.0; 4], 0.0);
        assert_eq!(tie_groups(&diamond, TieGroups::SharedParent), vec![vec![JobId(1), JobId(2)]]);
        assert_eq!(tie_groups(&diamond, TieGroups::SharedDepth), vec![vec![JobId(1), JobId(2)]]);
    }

    #[test]
    fn stagnation_limits_per_budget() {
        let wf = fixtures::layered(1, 3, 3, 1.0, 0.0);
        let groups = tie_groups(&wf, TieGroups::SharedDepth);
        assert_eq!(stagnation_limit(SearchBudget::FractionOfCandidates, &groups, 9, 0.6, 0.6), 5);
        assert_eq!(stagnation_limit(SearchBudget::GroupCount, &groups, 9, 0.6, 0.6), 3);
        assert_eq!(stagnation_limit(SearchBudget::BoundedFractionOfJobs, &groups, 9, 0.6, 0.6), 3);
        assert_eq!(stagnation_limit(SearchBudget::SinglePass, &groups, 9, 0.6, 0.6), 1);
        assert_eq!(stagnation_limit(SearchBudget::GroupCount, &[], 9, 0.6, 0.6), 1);
    }

    #[test]
    fn perturb_only_swaps_inside_groups() {
        let wf = fixtures::layered(1, 3, 3, 1.0, 0.0);
        let groups = tie_groups(&wf, TieGroups::SharedDepth);
        let base = wf.depth_order();
        let mut rng = StdRng::seed_from_u64(42);

        assert_eq!(perturb(&base, &groups, 0, &mut rng), base);

        for k in 1..5 {
            let order = perturb(&base, &groups, k, &mut rng);
            assert_ne!(order, base, "k = {k} must swap something");
            // each job stays inside its own depth band
            for (i, id) in order.iter().enumerate() {
                assert_eq!(wf.job(*id).depth, i / 3);
            }
        }
    }

    #[test]
    fn scrambled_order_still_respects_precedence() {
        let p = Prepared::new(
            fixtures::two_site_catalog(),
            fixtures::layered(1, 3, 2, 2.0e4, 1.0e5),
            PlannerKind::Heft.profile(),
            1.0,
        );
        let timelines = Timelines::new(p.catalog.nodes().len());
        let ctx = p.ctx(&timelines);
        let mut reversed = p.workflow.depth_order();
        reversed.reverse();
        let mut rng = StdRng::seed_from_u64(5);

        let solution = run_pass(&ctx, &timelines, &reversed, &mut rng).unwrap();
        assert_topological(&p.workflow, &solution.commit_order);
        for job in p.workflow.jobs() {
            for parent in &job.parents {
                assert!(solution.placement(*parent).finish <= solution.placement(job.id).start);
            }
        }
        assert!(timelines.window_count() == 0, "base timelines untouched");
        assert_eq!(solution.timelines.window_count(), p.workflow.len());
    }

    #[test]
    fn blocked_job_is_named_without_panicking() {
        let empty = WorkflowBuilder::new(WorkflowId(8), "nothing").build().unwrap();
        let state = PassState::new(Timelines::new(1), 0);
        assert_eq!(
            first_blocked(&empty, &state),
            PlannerError::EmptyWorkflow {
                workflow: "nothing".into()
            }
        );

        let p = Prepared::new(
            fixtures::single_node_catalog(100.0),
            fixtures::diamond(1, [1.0; 4], 0.0),
            PlannerKind::Heft.profile(),
            1.0,
        );
        let timelines = Timelines::new(1);
        let ctx = p.ctx(&timelines);
        let mut state = PassState::new(timelines.clone(), 4);
        let mut rng = StdRng::seed_from_u64(0);
        place_job(&ctx, &mut state, JobId(0), &mut rng).unwrap();

        let err = state
            .into_solution()
            .map_err(|state| first_blocked(&p.workflow, &state))
            .unwrap_err();
        assert!(matches!(err, PlannerError::InconsistentPrecedence { ref job, .. } if job == "b"));
    }

    #[test]
    fn completed_pass_needs_no_blocked_job() {
        let p = Prepared::new(
            fixtures::single_node_catalog(100.0),
            fixtures::diamond(1, [1.0; 4], 0.0),
            PlannerKind::Heft.profile(),
            1.0,
        );
        let timelines = Timelines::new(1);
        let ctx = p.ctx(&timelines);
        let mut rng = StdRng::seed_from_u64(0);
        let solution = run_pass(&ctx, &timelines, &p.workflow.depth_order(), &mut rng).unwrap();
        assert_eq!(solution.placements.len(), 4);
        assert_eq!(solution.commit_order.len(), 4);
    }

    #[test]
    fn verify_topological_rejects_child_first() {
        let wf = fixtures::diamond(1, [1.0; 4], 0.0);
        let err = verify_topological(&wf, &[JobId(1), JobId(0), JobId(2), JobId(3)]).unwrap_err();
        assert!(matches!(err, PlannerError::InconsistentPrecedence { ref job, .. } if job == "b"));
    }

    #[test]
    fn accepted_costs_strictly_decrease_and_reset_stagnation() {
        for kind in [PlannerKind::Dews, PlannerKind::Ecwsd, PlannerKind::ReliabilityAware] {
            let p = Prepared::new(
                fixtures::two_site_catalog(),
                fixtures::layered(1, 4, 3, 4.0e5, 2.0e5),
                kind.profile(),
                2.0,
            );
            let timelines = Timelines::new(p.catalog.nodes().len());
            let ctx = p.ctx(&timelines);
            let order = initial_order(&p.workflow, &p.metrics, kind.profile().priority);
            let groups = tie_groups(&p.workflow, kind.profile().tie_groups);
            let limit = stagnation_limit(kind.profile().budget, &groups, p.workflow.len(), 0.6, 0.6);
            let mut rng = StdRng::seed_from_u64(99);

            let outcome = search(&ctx, &timelines, &order, &groups, limit, &mut rng).unwrap();
            let stats = &outcome.stats;
            assert!(stats.passes.len() >= 2, "{kind}: at least one pass after acceptance");

            let accepted = stats.accepted_costs();
            assert!(accepted.windows(2).all(|w| w[1] < w[0]), "{kind}: {accepted:?}");

            let mut previous = 0;
            for pass in &stats.passes {
                if pass.accepted {
                    assert_eq!(pass.stagnation, 0);
                    assert!(pass.feasible);
                } else {
                    assert_eq!(pass.stagnation, previous + 1);
                }
                previous = pass.stagnation;
            }
            assert_eq!(stats.passes.last().map(|p| p.stagnation), Some(limit));

            let best = outcome.best.expect("generous slack must be feasible");
            assert_eq!(Some(&best.cost), accepted.last());
        }
    }

    #[test]
    fn single_pass_variant_runs_once() {
        let p = Prepared::new(
            fixtures::two_site_catalog(),
            fixtures::layered(1, 2, 2, 1.0e4, 0.0),
            PlannerKind::Epee.profile(),
            1.0,
        );
        let timelines = Timelines::new(p.catalog.nodes().len());
        let ctx = p.ctx(&timelines);
        let order = initial_order(&p.workflow, &p.metrics, PriorityKey::UpwardRank);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = search(&ctx, &timelines, &order, &[], 1, &mut rng).unwrap();
        assert_eq!(outcome.stats.passes.len(), 1);
        assert!(outcome.best.is_some());
    }
}
