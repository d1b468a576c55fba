/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Candidate search: choose a (node, power level, start time) for one job.
//!
//! For a job whose parents are already placed in the current pass:
//!
//! 1. `begin` = earliest parent finish (the workflow release for roots).
//! 2. Sites are visited in the variant's [`SiteOrdering`].
//! 3. Inside a site, nodes are probed at their fastest level; a candidate is
//!    feasible when it finishes by the job's sub-deadline and meets its
//!    reliability sub-goal.
//! 4. With power relaxation, the candidate then slows down to the slowest
//!    level whose run still fits in
//!    `span = lft − β·(lft − eft) − start`, where `lft` is the earlier of
//!    the next busy window on that node and the sub-deadline.
//! 5. Cost = staging energy + execution energy at the chosen level, priced
//!    with the site's tariff.
//! 6. The best candidate by the variant's [`Objective`] wins; if nothing is
//!    feasible a random node at its fastest level is used.
//!
//! The winner is committed into the pass's own copy of the timelines.
//!
//! [`SiteOrdering`]: super::variant::SiteOrdering
//! [`Objective`]: super::variant::Objective

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::deadline::DeadlinePlan;
use crate::metrics::MetricsCache;
use crate::reliability::{ExecMatrix, ReliabilityBudget};
use crate::resource::{Catalog, Node, NodeId, SiteId};
use crate::timeline::Timelines;
use crate::workflow::{JobId, JobRef, Workflow};

use super::error::PlannerError;
use super::solution::{JobPlacement, Solution};
use super::variant::{
    LevelSearch, NodeOrdering, NodeSelection, Objective, SiteOrdering, StagingBilling,
    VariantProfile,
};

/// Strategies cycled by [`SiteOrdering::BoundedRetry`], indexed by attempt.
const RETRY_CYCLE: [SiteOrdering; 3] = [
    SiteOrdering::Random,
    SiteOrdering::CheapestAveragePrice,
    SiteOrdering::DataLocality,
];

// ── Per-workflow context ──────────────────────────────────────────────────────

/// Read-only inputs shared by every pass of one workflow.
pub(crate) struct SearchContext<'a> {
    pub catalog: &'a Catalog,
    pub workflow: &'a Workflow,
    pub metrics: &'a MetricsCache,
    pub matrix: &'a ExecMatrix,
    pub deadlines: &'a DeadlinePlan,
    pub budget: ReliabilityBudget,
    pub profile: VariantProfile,
    pub beta: f64,
    pub max_site_retries: usize,
    /// Sites hosting at least one node.
    populated_sites: Vec<SiteId>,
    /// Instructions per unit price of each site when the workflow arrives.
    site_ipp: Vec<f64>,
}

impl<'a> SearchContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: &'a Catalog,
        workflow: &'a Workflow,
        metrics: &'a MetricsCache,
        matrix: &'a ExecMatrix,
        deadlines: &'a DeadlinePlan,
        budget: ReliabilityBudget,
        profile: VariantProfile,
        beta: f64,
        max_site_retries: usize,
        timelines: &Timelines,
    ) -> Self {
        let populated_sites: Vec<SiteId> = catalog
            .sites()
            .iter()
            .map(|s| s.id)
            .filter(|&s| catalog.nodes_in(s).next().is_some())
            .collect();

        let site_ipp = catalog
            .sites()
            .iter()
            .map(|site| {
                let nodes: Vec<&Node> = catalog.nodes_in(site.id).collect();
                if nodes.is_empty() {
                    return 0.0;
                }
                let efficiency =
                    nodes.iter().map(|n| n.efficiency()).sum::<f64>() / nodes.len() as f64;
                let idle = nodes
                    .iter()
                    .map(|n| timelines.node(n.id).busy_until())
                    .fold(f64::INFINITY, f64::min)
                    .max(workflow.submitted_at);
                let price = site.prices.price_at(idle);
                if price > 0.0 {
                    efficiency / price
                } else {
                    f64::INFINITY
                }
            })
            .collect();

        Self {
            catalog,
            workflow,
            metrics,
            matrix,
            deadlines,
            budget,
            profile,
            beta,
            max_site_retries,
            populated_sites,
            site_ipp,
        }
    }

    pub fn site_ipp(&self, site: SiteId) -> f64 {
        self.site_ipp[site.0]
    }
}

// ── Per-pass state ────────────────────────────────────────────────────────────

/// Mutable state of one sequencer pass.
#[derive(Debug, Clone)]
pub(crate) struct PassState {
    pub timelines: Timelines,
    placements: Vec<Option<JobPlacement>>,
    pub commit_order: Vec<JobId>,
    pub reliability: f64,
    pub cost: f64,
    pub finish_time: f64,
}

impl PassState {
    pub fn new(timelines: Timelines, jobs: usize) -> Self {
        Self {
            timelines,
            placements: vec![None; jobs],
            commit_order: Vec::with_capacity(jobs),
            reliability: 1.0,
            cost: 0.0,
            finish_time: 0.0,
        }
    }

    pub fn is_placed(&self, job: JobId) -> bool {
        self.placements[job.0].is_some()
    }

    fn record(&mut self, placement: JobPlacement) {
        self.reliability *= placement.reliability;
        self.cost += placement.cost;
        self.finish_time = self.finish_time.max(placement.finish);
        self.commit_order.push(placement.job);
        self.placements[placement.job.0] = Some(placement);
    }

    /// Hands the state back while any job is still unplaced.
    pub fn into_solution(self) -> Result<Solution, Self> {
        if self.placements.iter().any(Option::is_none) {
            return Err(self);
        }
        let placements = self.placements.into_iter().flatten().collect();
        Ok(Solution {
            placements,
            commit_order: self.commit_order,
            cost: self.cost,
            finish_time: self.finish_time,
            reliability: self.reliability,
            timelines: self.timelines,
        })
    }
}

// ── Candidate evaluation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    node: NodeId,
    level: usize,
    ready: f64,
    start: f64,
    finish: f64,
    cost: f64,
    reliability: f64,
}

/// Everything needed to evaluate placements of a single job.
struct JobSearch<'c, 'a> {
    ctx: &'c SearchContext<'a>,
    timelines: &'c Timelines,
    job: JobId,
    parents: Vec<JobPlacement>,
    begin: f64,
    sub_deadline: f64,
    sub_goal: f64,
}

impl JobSearch<'_, '_> {
    fn is_better(&self, candidate: &Candidate, incumbent: Option<&Candidate>) -> bool {
        let Some(incumbent) = incumbent else {
            return true;
        };
        let ord = match self.ctx.profile.objective {
            Objective::Cost => candidate
                .cost
                .total_cmp(&incumbent.cost)
                .then(candidate.finish.total_cmp(&incumbent.finish)),
            Objective::FinishTime => candidate
                .finish
                .total_cmp(&incumbent.finish)
                .then(candidate.cost.total_cmp(&incumbent.cost)),
        };
        ord == Ordering::Less
    }

    fn keep_better(&self, best: Option<Candidate>, candidate: Option<Candidate>) -> Option<Candidate> {
        match candidate {
            Some(c) if self.is_better(&c, best.as_ref()) => Some(c),
            _ => best,
        }
    }

    fn feasible(&self, c: &Candidate) -> bool {
        c.finish <= self.sub_deadline && c.reliability >= self.sub_goal
    }

    /// Time all inputs are present on `node`.  Never before submission, so
    /// gaps left by earlier workflows stay usable.
    fn ready_time(&self, node: NodeId) -> f64 {
        let ctx = self.ctx;
        let job = ctx.workflow.job(self.job);
        let mut ready = ctx.workflow.submitted_at;
        for p in &self.parents {
            let data = job.data_from(ctx.workflow.job(p.job));
            ready = ready.max(p.finish + ctx.catalog.transfer_time(data, p.node, node));
        }
        ready + ctx.metrics.local_transfer(self.job, node)
    }

    fn cost(&self, node: NodeId, level: usize, ready: f64, start: f64) -> f64 {
        let ctx = self.ctx;
        let prices = ctx.catalog.prices_of(node);
        let power = ctx.catalog.node(node).level(level).power_watts;
        let exec = ctx.matrix.get(self.job, node, level).exec_time;

        let staging = match ctx.profile.staging {
            StagingBilling::ReadyWindow => prices.energy_cost(self.begin, ready, power),
            StagingBilling::PerTransfer => {
                let job = ctx.workflow.job(self.job);
                let local = ctx.metrics.local_transfer(self.job, node);
                let mut total = prices.energy_cost(ready - local, ready, power);
                for p in &self.parents {
                    let data = job.data_from(ctx.workflow.job(p.job));
                    let t = ctx.catalog.transfer_time(data, p.node, node);
                    total += prices.energy_cost(p.finish, p.finish + t, power);
                }
                total
            }
        };
        staging + prices.energy_cost(start, start + exec, power)
    }

    fn evaluate(&self, node: NodeId, level: usize, ready: f64) -> Candidate {
        let est = self.ctx.matrix.get(self.job, node, level);
        let start = self.timelines.probe(node, est.exec_time, ready);
        Candidate {
            node,
            level,
            ready,
            start,
            finish: start + est.exec_time,
            cost: self.cost(node, level, ready, start),
            reliability: est.reliability,
        }
    }

    /// Slowest level that still fits the relaxed span after `fastest`.
    fn relaxed_level(&self, fastest: &Candidate) -> usize {
        // Searching from the start also catches a window that begins exactly
        // where `fastest` ends.
        let next = self
            .timelines
            .next_window_start_after(fastest.node, fastest.start)
            .unwrap_or(f64::INFINITY);
        let lft = next.min(self.sub_deadline);
        let span = if lft.is_finite() {
            lft - self.ctx.beta * (lft - fastest.finish) - fastest.start
        } else {
            f64::INFINITY
        };

        let mut chosen = 0;
        for (level, est) in self.ctx.matrix.levels(self.job, fastest.node).iter().enumerate().skip(1) {
            if est.exec_time > span || est.reliability < self.sub_goal {
                break;
            }
            chosen = level;
        }
        chosen
    }

    /// Best feasible placement on `node`, if any.
    fn try_node(&self, node: NodeId) -> Option<Candidate> {
        let ready = self.ready_time(node);
        match self.ctx.profile.level_search {
            LevelSearch::FastestOnly | LevelSearch::Random => {
                let c = self.evaluate(node, 0, ready);
                self.feasible(&c).then_some(c)
            }
            LevelSearch::FastestThenRelax => {
                let fastest = self.evaluate(node, 0, ready);
                if !self.feasible(&fastest) {
                    return None;
                }
                match self.relaxed_level(&fastest) {
                    0 => Some(fastest),
                    level => {
                        let relaxed = self.evaluate(node, level, ready);
                        if relaxed.start == fastest.start && self.feasible(&relaxed) {
                            Some(relaxed)
                        } else {
                            Some(fastest)
                        }
                    }
                }
            }
            LevelSearch::Exhaustive => {
                let mut best = None;
                let levels = self.ctx.catalog.node(node).level_count();
                for level in 0..levels {
                    if self.ctx.matrix.get(self.job, node, level).reliability < self.sub_goal {
                        break;
                    }
                    let c = self.evaluate(node, level, ready);
                    if c.finish > self.sub_deadline {
                        break;
                    }
                    best = self.keep_better(best, Some(c));
                }
                best
            }
        }
    }

    /// `true` when `node` already holds one of the job's inputs.
    fn holds_data(&self, node: NodeId) -> bool {
        let job = self.ctx.workflow.job(self.job);
        job.local_inputs.iter().any(|a| a.location == Some(node))
            || self.parents.iter().any(|p| p.node == node)
    }

    fn search_site(&self, site: SiteId) -> Option<Candidate> {
        let mut nodes: Vec<&Node> = self.ctx.catalog.nodes_in(site).collect();
        if self.ctx.profile.node_ordering == NodeOrdering::EfficiencyDesc {
            nodes.sort_by(|a, b| b.efficiency().total_cmp(&a.efficiency()).then(a.id.cmp(&b.id)));
        }

        match self.ctx.profile.node_selection {
            NodeSelection::FirstFeasible => nodes.iter().find_map(|n| self.try_node(n.id)),
            NodeSelection::FirstFeasibleThenLocal => {
                let (i, first) = nodes
                    .iter()
                    .enumerate()
                    .find_map(|(i, n)| self.try_node(n.id).map(|c| (i, c)))?;
                let mut best = Some(first);
                for n in &nodes[i + 1..] {
                    if self.holds_data(n.id) {
                        best = self.keep_better(best, self.try_node(n.id));
                    }
                }
                best
            }
            NodeSelection::AllNodes => nodes
                .iter()
                .fold(None, |best, n| self.keep_better(best, self.try_node(n.id))),
        }
    }

    // ── Site ordering ─────────────────────────────────────────────────────────

    fn data_sites(&self) -> Vec<SiteId> {
        let catalog = self.ctx.catalog;
        let job = self.ctx.workflow.job(self.job);
        let mut sites: Vec<SiteId> = job
            .local_inputs
            .iter()
            .filter_map(|a| a.location)
            .chain(self.parents.iter().map(|p| p.node))
            .map(|n| catalog.node(n).site)
            .collect();
        sites.sort();
        sites.dedup();
        sites
    }

    fn cheapest_by(&self, price: impl Fn(SiteId) -> f64) -> Vec<SiteId> {
        self.ctx
            .populated_sites
            .iter()
            .copied()
            .min_by(|a, b| price(*a).total_cmp(&price(*b)).then(a.cmp(b)))
            .into_iter()
            .collect()
    }

    /// Rough cost of running the job anywhere in `site` at average speed
    /// and power, counting only data that has to cross sites.
    fn site_estimate(&self, site: SiteId) -> f64 {
        let ctx = self.ctx;
        let catalog = ctx.catalog;
        let job = ctx.workflow.job(self.job);
        let nodes: Vec<&Node> = catalog.nodes_in(site).collect();
        let count = nodes.len() as f64;
        let speed = nodes.iter().map(|n| n.fastest().speed).sum::<f64>() / count;
        let power = nodes.iter().map(|n| n.fastest().power_watts).sum::<f64>() / count;
        let inter = catalog.network().inter_site_bandwidth;

        let mut duration = job.length / speed;
        for p in &self.parents {
            if catalog.node(p.node).site != site {
                duration += job.data_from(ctx.workflow.job(p.job)) / inter;
            }
        }
        for a in &job.local_inputs {
            let remote = a.location.map_or(true, |n| catalog.node(n).site != site);
            if remote {
                duration += a.size_bytes / inter;
            }
        }
        catalog
            .site(site)
            .prices
            .energy_cost(self.begin, self.begin + duration, power)
    }

    fn best_ipp_site(&self) -> Vec<SiteId> {
        let mut ranked = self.ctx.populated_sites.clone();
        ranked.sort_by(|a, b| {
            self.ctx
                .site_ipp(*b)
                .total_cmp(&self.ctx.site_ipp(*a))
                .then(a.cmp(b))
        });
        let holding = self.data_sites();
        ranked
            .iter()
            .enumerate()
            .filter(|(i, s)| *i == 0 || holding.contains(s))
            .map(|(_, s)| *s)
            .min_by(|a, b| self.site_estimate(*a).total_cmp(&self.site_estimate(*b)))
            .into_iter()
            .collect()
    }

    /// Sites to visit, in order, for a single-shot strategy.
    fn sites_for(&self, ordering: SiteOrdering, rng: &mut StdRng) -> Vec<SiteId> {
        let catalog = self.ctx.catalog;
        let sites = &self.ctx.populated_sites;
        match ordering {
            SiteOrdering::Random => sites.choose(rng).copied().into_iter().collect(),
            SiteOrdering::CheapestAveragePrice => self.cheapest_by(|s| {
                catalog
                    .site(s)
                    .prices
                    .average_price(self.begin, self.sub_deadline)
            }),
            SiteOrdering::CheapestCurrentPrice => {
                self.cheapest_by(|s| catalog.site(s).prices.price_at(self.begin))
            }
            SiteOrdering::DataLocality => {
                let holding: Vec<SiteId> = self
                    .data_sites()
                    .into_iter()
                    .filter(|s| sites.contains(s))
                    .collect();
                let pool = if holding.is_empty() { sites } else { &holding };
                pool.choose(rng).copied().into_iter().collect()
            }
            SiteOrdering::PriceAscending => {
                let mut ordered = sites.clone();
                ordered.sort_by(|a, b| {
                    let pa = catalog.site(*a).prices.price_at(self.begin);
                    let pb = catalog.site(*b).prices.price_at(self.begin);
                    pa.total_cmp(&pb).then(a.cmp(b))
                });
                ordered
            }
            SiteOrdering::InstructionsPerPrice => self.best_ipp_site(),
            // Outside the retry loop every site is a fair candidate.
            SiteOrdering::AllSites | SiteOrdering::BoundedRetry => sites.clone(),
        }
    }

    fn search_sites(&self, sites: Vec<SiteId>) -> Option<Candidate> {
        sites
            .into_iter()
            .fold(None, |best, s| self.keep_better(best, self.search_site(s)))
    }

    fn bounded_retry(&self, rng: &mut StdRng) -> Option<Candidate> {
        let mut best = None;
        let mut attempt = 0;
        while attempt < self.ctx.max_site_retries {
            let strategy = RETRY_CYCLE[attempt % RETRY_CYCLE.len()];
            let sites = self.sites_for(strategy, rng);
            match self.search_sites(sites) {
                Some(c) if self.is_better(&c, best.as_ref()) => {
                    best = Some(c);
                    attempt = 0;
                }
                _ => attempt += 1,
            }
        }
        best
    }

    fn random_node(&self, rng: &mut StdRng) -> NodeId {
        NodeId(rng.random_range(0..self.ctx.catalog.nodes().len()))
    }

    fn search(&self, rng: &mut StdRng) -> Candidate {
        let profile = &self.ctx.profile;

        if profile.level_search == LevelSearch::Random {
            let node = self.random_node(rng);
            let level = rng.random_range(0..self.ctx.catalog.node(node).level_count());
            return self.evaluate(node, level, self.ready_time(node));
        }

        let found = match profile.site_ordering {
            SiteOrdering::BoundedRetry => self.bounded_retry(rng),
            ordering => {
                let sites = self.sites_for(ordering, rng);
                self.search_sites(sites)
            }
        };

        found.unwrap_or_else(|| {
            let node = self.random_node(rng);
            warn!(
                job = %self.ctx.workflow.job(self.job).name,
                node = %self.ctx.catalog.node(node).name,
                sub_deadline = self.sub_deadline,
                "no feasible candidate, falling back to a random node"
            );
            self.evaluate(node, 0, self.ready_time(node))
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Chooses and commits a placement for `job` into `state`.
///
/// # Errors
/// [`PlannerError::InconsistentPrecedence`] if a parent of `job` has not been
/// placed in this pass.
pub(crate) fn place_job(
    ctx: &SearchContext<'_>,
    state: &mut PassState,
    job: JobId,
    rng: &mut StdRng,
) -> Result<JobPlacement, PlannerError> {
    let workflow = ctx.workflow;
    let parents = workflow
        .job(job)
        .parents
        .iter()
        .map(|p| {
            state.placements[p.0].ok_or_else(|| PlannerError::InconsistentPrecedence {
                workflow: workflow.name.clone(),
                job: workflow.job(job).name.clone(),
                parent: workflow.job(*p).name.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let begin = if parents.is_empty() {
        workflow.submitted_at
    } else {
        parents.iter().map(|p| p.finish).fold(f64::INFINITY, f64::min)
    };
    let sub_goal = if ctx.profile.reliability_pruning {
        ctx.budget.sub_goal(state.reliability, state.commit_order.len())
    } else {
        0.0
    };

    let chosen = JobSearch {
        ctx,
        timelines: &state.timelines,
        job,
        parents,
        begin,
        sub_deadline: ctx.deadlines.sub_deadline(job),
        sub_goal,
    }
    .search(rng);

    let exec = ctx.matrix.get(job, chosen.node, chosen.level).exec_time;
    let window = state.timelines.commit(
        chosen.node,
        exec,
        chosen.ready,
        JobRef {
            workflow: workflow.id,
            job,
        },
    );
    debug_assert_eq!(window.start, chosen.start);

    let placement = JobPlacement {
        job,
        node: chosen.node,
        level: chosen.level,
        ready: chosen.ready,
        start: window.start,
        finish: window.finish,
        cost: chosen.cost,
        reliability: chosen.reliability,
    };
    debug!(
        job = %workflow.job(job).name,
        node = %ctx.catalog.node(placement.node).name,
        level = placement.level,
        start = placement.start,
        finish = placement.finish,
        cost = placement.cost,
        "placed"
    );
    state.record(placement);
    Ok(placement)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
