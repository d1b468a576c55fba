/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Random layered workflow generator.
//!
//! Writes a workflow YAML that `dvfs-planner --workflow` accepts.  Every job
//! below the first layer depends on at least one job of the layer above and
//! reads the matching output file.
//!
//! Example:
//!   dag-gen --layers 5 --width 4 --seed 7 --input-node e1 -o wf.yaml

use std::path::PathBuf;
use std::process;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use dvfs_planner::config::workflow::{ArtifactEntry, JobEntry, WorkflowFile};

#[derive(Debug, Parser)]
#[command(name = "dag-gen", about = "Random layered workflow generator – NOT for production", long_about = None)]
struct Cli {
    /// Workflow name.
    #[arg(long, default_value = "generated")]
    name: String,

    /// Workflow id written into the file.
    #[arg(long)]
    id: Option<u64>,

    /// Number of layers (DAG depth).
    #[arg(long, default_value_t = 4)]
    layers: usize,

    /// Maximum jobs per layer; each layer gets 1..=width.
    #[arg(long, default_value_t = 3)]
    width: usize,

    /// Shortest job, in instructions.
    #[arg(long, default_value_t = 1.0e6)]
    min_length: f64,

    /// Longest job, in instructions.
    #[arg(long, default_value_t = 1.0e7)]
    max_length: f64,

    /// Largest file exchanged between jobs, in bytes.
    #[arg(long, default_value_t = 1.0e6)]
    max_data: f64,

    /// Probability of each extra edge to the previous layer.
    #[arg(long, default_value_t = 0.3)]
    edge_probability: f64,

    /// Node holding the entry jobs' input files.
    #[arg(long)]
    input_node: Option<String>,

    /// Submission time written into the file.
    #[arg(long, default_value_t = 0.0)]
    submitted_at: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output file; stdout when absent.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    ensure!(cli.layers > 0 && cli.width > 0, "--layers and --width must be positive");
    ensure!(
        cli.min_length > 0.0 && cli.min_length <= cli.max_length,
        "need 0 < --min-length <= --max-length"
    );
    ensure!(cli.max_data >= 0.0, "--max-data must not be negative");
    ensure!(
        (0.0..=1.0).contains(&cli.edge_probability),
        "--edge-probability must be within [0, 1]"
    );

    let file = generate(&cli, &mut StdRng::seed_from_u64(cli.seed));
    let yaml = file.to_yaml()?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("Cannot write workflow file: {}", path.display()))?;
            info!(path = %path.display(), jobs = file.jobs.len(), "workflow written");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

fn generate(cli: &Cli, rng: &mut StdRng) -> WorkflowFile {
    let mut jobs: Vec<JobEntry> = Vec::new();
    let mut previous: Vec<usize> = Vec::new();

    for layer in 0..cli.layers {
        let width = rng.random_range(1..=cli.width);
        let mut current = Vec::with_capacity(width);

        for k in 0..width {
            let name = format!("L{layer}_J{k}");
            let length = if cli.max_length > cli.min_length {
                rng.random_range(cli.min_length..=cli.max_length)
            } else {
                cli.min_length
            };

            let mut parents: Vec<usize> = Vec::new();
            if !previous.is_empty() {
                // one guaranteed parent, then optional extra edges
                let first = rng.random_range(0..previous.len());
                parents.push(previous[first]);
                for &p in &previous {
                    if p != previous[first] && rng.random_bool(cli.edge_probability) {
                        parents.push(p);
                    }
                }
                parents.sort_unstable();
            }

            let mut inputs: Vec<ArtifactEntry> = parents
                .iter()
                .map(|&p| {
                    let out = &jobs[p].outputs[0];
                    ArtifactEntry {
                        name: out.name.clone(),
                        size: out.size,
                        location: None,
                    }
                })
                .collect();
            if layer == 0 {
                inputs.push(ArtifactEntry {
                    name: format!("{name}.in"),
                    size: random_size(rng, cli.max_data),
                    location: cli.input_node.clone(),
                });
            }

            let parents = parents.iter().map(|&p| jobs[p].name.clone()).collect();
            jobs.push(JobEntry {
                parents,
                outputs: vec![ArtifactEntry {
                    name: format!("{name}.out"),
                    size: random_size(rng, cli.max_data),
                    location: None,
                }],
                name,
                length,
                inputs,
            });
            current.push(jobs.len() - 1);
        }
        previous = current;
    }

    info!(
        name = %cli.name,
        layers = cli.layers,
        jobs = jobs.len(),
        seed = cli.seed,
        "workflow generated"
    );

    WorkflowFile {
        name: cli.name.clone(),
        id: cli.id,
        submitted_at: cli.submitted_at,
        reliability_goal: None,
        jobs,
    }
}

fn random_size(rng: &mut StdRng, max: f64) -> f64 {
    if max > 0.0 {
        rng.random_range(0.0..=max).round()
    } else {
        0.0
    }
}
