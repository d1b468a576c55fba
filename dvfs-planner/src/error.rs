/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Construction errors for the resource catalog and workflow model.
//!
//! These are raised while *building* a [`Catalog`] or a [`Workflow`], before
//! any planning happens.  Planning failures live in
//! [`PlannerError`](crate::planner::PlannerError).
//!
//! [`Catalog`]: crate::resource::Catalog
//! [`Workflow`]: crate::workflow::Workflow

use thiserror::Error;

/// Why a catalog or workflow could not be constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A site was declared without any hourly price.
    #[error("price schedule has no hourly entries")]
    EmptyPriceSchedule,

    #[error("price {price} for hour {hour} is not a finite non-negative number")]
    InvalidPrice { hour: usize, price: f64 },

    /// A node must expose at least one DVFS level.
    #[error("node '{node}' declares no power levels")]
    NoPowerLevels { node: String },

    #[error("node '{node}' power level {level} is invalid: {reason}")]
    InvalidPowerLevel {
        node: String,
        level: usize,
        reason: &'static str,
    },

    /// Levels must be listed fastest first; the planner relies on index 0
    /// being the top speed.
    #[error("power levels of node '{node}' are not ordered fastest to slowest")]
    UnorderedPowerLevels { node: String },

    #[error("node '{node}' references unknown site #{site}")]
    UnknownSite { node: String, site: usize },

    #[error("node name '{node}' is declared twice")]
    DuplicateNode { node: String },

    #[error("catalog declares no nodes")]
    NoNodes,

    #[error("{link} bandwidth must be positive, got {value}")]
    InvalidBandwidth { link: &'static str, value: f64 },

    #[error("job '{job}' is declared twice")]
    DuplicateJob { job: String },

    #[error("job '{job}' has invalid length {length}")]
    InvalidJobLength { job: String, length: f64 },

    #[error("unknown job #{0}")]
    UnknownJob(usize),

    #[error("artifact '{artifact}' has invalid size {size}")]
    InvalidArtifactSize { artifact: String, size: f64 },

    /// The dependency edges do not form a DAG.
    #[error("workflow '{workflow}' contains a dependency cycle through job '{job}'")]
    CyclicWorkflow { workflow: String, job: String },
}
