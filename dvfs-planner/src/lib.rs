/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! DVFS- and price-aware workflow planner.
//!
//! Places the jobs of workflow DAGs on power-scalable nodes spread over
//! sites with hourly electricity prices, minimising energy cost under a
//! deadline and a reliability goal.
//!
//! ```text
//! lib.rs
//! ├── config/        – YAML catalog, planner and workflow files
//! ├── error.rs       – model construction errors
//! ├── price.rs       – cyclic hourly tariffs, energy cost integral
//! ├── resource.rs    – sites, nodes, power levels, network
//! ├── workflow.rs    – job DAG arena, submission ordering
//! ├── timeline.rs    – per-node busy windows, earliest-fit gap search
//! ├── metrics.rs     – weights, EFT, upward / downward rank
//! ├── deadline.rs    – deadline and sub-deadline rules
//! ├── reliability.rs – execution-time matrix, reliability budget
//! └── planner/       – variants, candidate search, local search, façade
//! ```

pub mod config;
pub mod deadline;
pub mod error;
pub mod metrics;
pub mod planner;
pub mod price;
pub mod reliability;
pub mod resource;
pub mod timeline;
pub mod workflow;

#[cfg(test)]
mod fixtures;
