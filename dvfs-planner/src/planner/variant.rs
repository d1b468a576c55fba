/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Planner variants and the hooks each one plugs into the shared search.
//!
//! A variant is pure data: a [`VariantProfile`] naming the priority key,
//! sub-deadline rule, site ordering and search budget it uses.  The
//! candidate search and sequencer read the profile; nothing dispatches on
//! [`PlannerKind`] directly.
//!
//! | Kind | Order | Sub-deadline | Sites | Levels | Passes |
//! |---|---|---|---|---|---|
//! | `random` | upward rank | EFT-scaled | any node | random | 1 |
//! | `heft` | upward rank | EFT-scaled | all | fastest, min finish | 1 |
//! | `epee` | upward rank | position share | best IPP | fastest + relax | 1 |
//! | `dews` | depth | EFT-scaled | bounded retry | fastest + relax | ILS, shared depth |
//! | `ecwsd` | EFT | depth share | price ascending | fastest | ILS, shared parent |
//! | `reliability_aware` | critical path | rank share | cheapest now | exhaustive | ILS, shared depth |

use std::fmt;
use std::str::FromStr;

use crate::deadline::SubDeadlineRule;
use crate::metrics::{PredecessorAveraging, SpeedReference};

use super::error::PlannerError;

// ── Hooks ─────────────────────────────────────────────────────────────────────

/// Initial sequence order.  Ties always break on job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityKey {
    /// Descending upward rank.
    UpwardRank,
    /// Ascending depth.
    Depth,
    /// Ascending estimated finish time.
    Eft,
    /// Ascending depth, then descending `up + down` (critical jobs first).
    CriticalPath,
}

/// Which sites a job's candidate search visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOrdering {
    /// One uniformly random site.
    Random,
    /// The site with the lowest mean price between the job's begin time and
    /// its sub-deadline.
    CheapestAveragePrice,
    /// The site with the lowest price at the job's begin time.
    CheapestCurrentPrice,
    /// A random site already holding the job's inputs or a parent's output.
    DataLocality,
    /// Every site, cheapest current price first.
    PriceAscending,
    /// The cheapest estimate among the best instructions-per-price site and
    /// the data-holding sites.
    InstructionsPerPrice,
    /// Every site in catalog order.
    AllSites,
    /// Repeated single-site attempts cycling random, cheapest average and
    /// data locality; the attempt counter resets on every improvement.
    BoundedRetry,
}

/// Node visiting order inside a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrdering {
    AsListed,
    /// Instructions per watt, best first.
    EfficiencyDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSelection {
    /// Stop at the first node meeting the constraints.
    FirstFeasible,
    /// First feasible node, then any later node holding the job's data.
    FirstFeasibleThenLocal,
    /// Best of every feasible node.
    AllNodes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSearch {
    /// Fastest level only.
    FastestOnly,
    /// Fastest level to test feasibility, then slow down into the idle time
    /// before the next window or the sub-deadline.
    FastestThenRelax,
    /// Every level, fastest first, stopping once reliability or the
    /// sub-deadline is violated.
    Exhaustive,
    /// Uniformly random node and level, no constraints.
    Random,
}

/// What "better" means between two feasible candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Cost,
    FinishTime,
}

/// Which intervals the staging energy is billed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingBilling {
    /// `[begin, ready]` at the chosen level's power.
    ReadyWindow,
    /// Each parent transfer and the local staging as separate intervals.
    PerTransfer,
}

/// Sets of jobs whose relative order the local search may swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieGroups {
    /// Jobs sharing a depth.
    SharedDepth,
    /// Children of a job with more than one child.
    SharedParent,
}

/// How many consecutive non-improving passes end the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    SinglePass,
    /// `⌊γ · jobs in tie groups⌋`.
    FractionOfCandidates,
    /// Number of tie groups.
    GroupCount,
    /// `min(⌊τ · jobs⌋, tie groups)`.
    BoundedFractionOfJobs,
}

/// Everything the search needs to know about a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantProfile {
    pub priority: PriorityKey,
    pub sub_deadline: SubDeadlineRule,
    pub site_ordering: SiteOrdering,
    pub node_ordering: NodeOrdering,
    pub node_selection: NodeSelection,
    pub level_search: LevelSearch,
    pub objective: Objective,
    pub staging: StagingBilling,
    pub tie_groups: TieGroups,
    pub budget: SearchBudget,
    pub averaging: PredecessorAveraging,
    pub speed: SpeedReference,
    /// Prune candidates below the job's reliability sub-goal.
    pub reliability_pruning: bool,
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// The available planners, parsed from their configuration names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlannerKind {
    Random,
    Heft,
    Epee,
    Dews,
    Ecwsd,
    ReliabilityAware,
}

impl PlannerKind {
    pub const ALL: [PlannerKind; 6] = [
        PlannerKind::Random,
        PlannerKind::Heft,
        PlannerKind::Epee,
        PlannerKind::Dews,
        PlannerKind::Ecwsd,
        PlannerKind::ReliabilityAware,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlannerKind::Random => "random",
            PlannerKind::Heft => "heft",
            PlannerKind::Epee => "epee",
            PlannerKind::Dews => "dews",
            PlannerKind::Ecwsd => "ecwsd",
            PlannerKind::ReliabilityAware => "reliability_aware",
        }
    }

    pub fn profile(&self) -> VariantProfile {
        match self {
            PlannerKind::Random => VariantProfile {
                priority: PriorityKey::UpwardRank,
                sub_deadline: SubDeadlineRule::EftScaled,
                site_ordering: SiteOrdering::AllSites,
                node_ordering: NodeOrdering::AsListed,
                node_selection: NodeSelection::AllNodes,
                level_search: LevelSearch::Random,
                objective: Objective::Cost,
                staging: StagingBilling::ReadyWindow,
                tie_groups: TieGroups::SharedDepth,
                budget: SearchBudget::SinglePass,
                averaging: PredecessorAveraging::SiteAggregated,
                speed: SpeedReference::Mean,
                reliability_pruning: false,
            },
            PlannerKind::Heft => VariantProfile {
                priority: PriorityKey::UpwardRank,
                sub_deadline: SubDeadlineRule::EftScaled,
                site_ordering: SiteOrdering::AllSites,
                node_ordering: NodeOrdering::AsListed,
                node_selection: NodeSelection::AllNodes,
                level_search: LevelSearch::FastestOnly,
                objective: Objective::FinishTime,
                staging: StagingBilling::ReadyWindow,
                tie_groups: TieGroups::SharedDepth,
                budget: SearchBudget::SinglePass,
                averaging: PredecessorAveraging::SiteAggregated,
                speed: SpeedReference::Mean,
                reliability_pruning: false,
            },
            PlannerKind::Epee => VariantProfile {
                priority: PriorityKey::UpwardRank,
                sub_deadline: SubDeadlineRule::PositionShare,
                site_ordering: SiteOrdering::InstructionsPerPrice,
                node_ordering: NodeOrdering::EfficiencyDesc,
                node_selection: NodeSelection::FirstFeasible,
                level_search: LevelSearch::FastestThenRelax,
                objective: Objective::Cost,
                staging: StagingBilling::PerTransfer,
                tie_groups: TieGroups::SharedDepth,
                budget: SearchBudget::SinglePass,
                averaging: PredecessorAveraging::NodePairs,
                speed: SpeedReference::Fastest,
                reliability_pruning: false,
            },
            PlannerKind::Dews => VariantProfile {
                priority: PriorityKey::Depth,
                sub_deadline: SubDeadlineRule::EftScaled,
                site_ordering: SiteOrdering::BoundedRetry,
                node_ordering: NodeOrdering::EfficiencyDesc,
                node_selection: NodeSelection::FirstFeasibleThenLocal,
                level_search: LevelSearch::FastestThenRelax,
                objective: Objective::Cost,
                staging: StagingBilling::ReadyWindow,
                tie_groups: TieGroups::SharedDepth,
                budget: SearchBudget::FractionOfCandidates,
                averaging: PredecessorAveraging::SiteAggregated,
                speed: SpeedReference::Mean,
                reliability_pruning: false,
            },
            PlannerKind::Ecwsd => VariantProfile {
                priority: PriorityKey::Eft,
                sub_deadline: SubDeadlineRule::DepthShare,
                site_ordering: SiteOrdering::PriceAscending,
                node_ordering: NodeOrdering::AsListed,
                node_selection: NodeSelection::AllNodes,
                level_search: LevelSearch::FastestOnly,
                objective: Objective::Cost,
                staging: StagingBilling::ReadyWindow,
                tie_groups: TieGroups::SharedParent,
                budget: SearchBudget::BoundedFractionOfJobs,
                averaging: PredecessorAveraging::SiteAggregated,
                speed: SpeedReference::Fastest,
                reliability_pruning: false,
            },
            PlannerKind::ReliabilityAware => VariantProfile {
                priority: PriorityKey::CriticalPath,
                sub_deadline: SubDeadlineRule::RankShare,
                site_ordering: SiteOrdering::CheapestCurrentPrice,
                node_ordering: NodeOrdering::AsListed,
                node_selection: NodeSelection::AllNodes,
                level_search: LevelSearch::Exhaustive,
                objective: Objective::Cost,
                staging: StagingBilling::ReadyWindow,
                tie_groups: TieGroups::SharedDepth,
                budget: SearchBudget::GroupCount,
                averaging: PredecessorAveraging::SiteAggregated,
                speed: SpeedReference::Mean,
                reliability_pruning: true,
            },
        }
    }
}

impl fmt::Display for PlannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlannerKind {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        PlannerKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| PlannerError::UnknownPlanner(s.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in PlannerKind::ALL {
            assert_eq!(kind.name().parse::<PlannerKind>().unwrap(), kind);
        }
        assert_eq!("Reliability-Aware".parse::<PlannerKind>().unwrap(), PlannerKind::ReliabilityAware);
        assert_eq!(" DEWS ".parse::<PlannerKind>().unwrap(), PlannerKind::Dews);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "greedy".parse::<PlannerKind>().unwrap_err();
        assert!(matches!(err, PlannerError::UnknownPlanner(ref s) if s == "greedy"));
    }

    #[test]
    fn only_iterated_variants_have_a_search_budget() {
        for kind in PlannerKind::ALL {
            let single = kind.profile().budget == SearchBudget::SinglePass;
            let iterated = matches!(
                kind,
                PlannerKind::Dews | PlannerKind::Ecwsd | PlannerKind::ReliabilityAware
            );
            assert_eq!(single, !iterated, "{kind}");
        }
    }

    #[test]
    fn only_reliability_aware_prunes_on_reliability() {
        for kind in PlannerKind::ALL {
            assert_eq!(
                kind.profile().reliability_pruning,
                kind == PlannerKind::ReliabilityAware
            );
        }
    }
}
