/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use dvfs_planner::config::workflow::WorkflowFile;
use dvfs_planner::config::PlanningConfig;
use dvfs_planner::planner::{Planner, PlannerKind};
use dvfs_planner::workflow::{SubmissionKey, SubmissionOrder, Workflow, WorkflowId};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Order in which submitted workflows are planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderKey {
    Id,
    Depth,
    Jobs,
    Length,
}

impl From<OrderKey> for SubmissionKey {
    fn from(key: OrderKey) -> Self {
        match key {
            OrderKey::Id => SubmissionKey::Id,
            OrderKey::Depth => SubmissionKey::Depth,
            OrderKey::Jobs => SubmissionKey::JobCount,
            OrderKey::Length => SubmissionKey::Length,
        }
    }
}

/// Energy-cost workflow planner for DVFS nodes under time-varying prices.
///
/// Example:
///   dvfs-planner -c catalog.yaml -w montage.yaml -w epigenomics.yaml \
///                --planner dews --seed 7 --order jobs
#[derive(Debug, Parser)]
#[command(name = "dvfs-planner", about = "DVFS- and price-aware workflow planner", long_about = None)]
struct Cli {
    /// YAML catalog and planner configuration.
    #[arg(short = 'c', long = "catalog")]
    catalog: PathBuf,

    /// Workflow description file; repeat for a batch.
    #[arg(short = 'w', long = "workflow", required = true)]
    workflows: Vec<PathBuf>,

    /// Planner variant (random, heft, epee, dews, ecwsd, reliability_aware).
    #[arg(short = 'p', long = "planner")]
    planner: Option<String>,

    /// Random seed; overrides the configuration file.
    #[arg(long)]
    seed: Option<u64>,

    /// Deadline slack factor; overrides the configuration file.
    #[arg(long)]
    slack: Option<f64>,

    /// Submission ordering key.
    #[arg(long, value_enum, default_value_t = OrderKey::Id)]
    order: OrderKey,

    /// Plan the largest workflows first.
    #[arg(long, default_value_t = false)]
    descending: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(
        catalog = %cli.catalog.display(),
        workflows = cli.workflows.len(),
        planner = ?cli.planner,
        seed = ?cli.seed,
        slack = ?cli.slack,
        order = ?cli.order,
        descending = cli.descending,
        "Configuration"
    );

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // ── Load catalog and planner settings ─────────────────────────────────────
    let PlanningConfig {
        catalog,
        planner: mut config,
    } = PlanningConfig::load_from_file(&cli.catalog)?;
    if let Some(name) = &cli.planner {
        config.kind = name.parse::<PlannerKind>()?;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(slack) = cli.slack {
        config.slack_factor = slack;
    }

    // ── Load workflows ────────────────────────────────────────────────────────
    let mut workflows: Vec<Workflow> = Vec::with_capacity(cli.workflows.len());
    for (i, path) in cli.workflows.iter().enumerate() {
        let file = WorkflowFile::load_from_file(path)?;
        workflows.push(file.into_workflow(WorkflowId(i as u64 + 1), &catalog)?);
    }

    // ── Plan ──────────────────────────────────────────────────────────────────
    let catalog = Arc::new(catalog);
    let mut planner = Planner::from_seed(Arc::clone(&catalog), config);
    let order = SubmissionOrder {
        key: cli.order.into(),
        descending: cli.descending,
    };
    let results = planner.plan_batch(&mut workflows, order);

    let mut failed = 0usize;
    for (workflow, result) in workflows.iter().zip(results) {
        match result {
            Ok(plan) => {
                info!(
                    "[{}] {} | cost {:.6} | finish {:.1}s / deadline {:.1}s | reliability {:.6} / goal {:.6} | passes {}",
                    plan.workflow,
                    plan.name,
                    plan.cost,
                    plan.finish_time,
                    plan.deadline,
                    plan.reliability,
                    plan.reliability_goal,
                    plan.stats.passes.len(),
                );
                for p in &plan.placements {
                    info!(
                        "    {:<24} node={:<12} level={} start={:.1} finish={:.1} cost={:.6}",
                        workflow.job(p.job).name,
                        catalog.node(p.node).name,
                        p.level,
                        p.start,
                        p.finish,
                        p.cost,
                    );
                }
            }
            Err(e) => {
                error!("[{}] {}: {}", workflow.id, workflow.name, e);
                failed += 1;
            }
        }
    }

    info!(
        total_cost = planner.total_cost(),
        finish = planner.global_finish_time(),
        planned = workflows.len() - failed,
        failed,
        "=== Planning complete ==="
    );

    if failed > 0 {
        bail!("{failed} of {} workflow(s) could not be planned", workflows.len());
    }
    Ok(())
}
