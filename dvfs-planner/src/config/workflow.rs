/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workflow description files.
//!
//! ```yaml
//! name: montage-small
//! id: 7                  # optional, otherwise assigned by the caller
//! submitted_at: 0.0
//! reliability_goal: 0.95 # optional
//! jobs:
//!   - name: project
//!     length: 4.0e6      # instructions
//!     inputs:
//!       - { name: raw.fits, size: 2.0e6, location: e1 }
//!     outputs:
//!       - { name: proj.fits, size: 1.0e6 }
//!   - name: combine
//!     length: 1.0e6
//!     parents: [project]
//!     inputs:
//!       - { name: proj.fits, size: 1.0e6 }
//! ```
//!
//! `location` names a catalog node holding the file before the workflow
//! starts.  Inputs produced by a parent are matched by name.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resource::Catalog;
use crate::workflow::{Artifact, Workflow, WorkflowBuilder, WorkflowId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub submitted_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_goal: Option<f64>,
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEntry {
    pub name: String,
    pub length: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ArtifactEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ArtifactEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactEntry {
    pub name: String,
    /// Bytes.
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl WorkflowFile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading workflow from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open workflow file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse workflow file: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse workflow YAML")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialise workflow")
    }

    /// Builds the workflow DAG; `default_id` is used when the file has none.
    ///
    /// # Errors
    /// Unknown parent or node names, invalid lengths or sizes, duplicate
    /// job names and dependency cycles.
    pub fn into_workflow(self, default_id: WorkflowId, catalog: &Catalog) -> Result<Workflow> {
        let id = self.id.map_or(default_id, WorkflowId);
        let mut builder = WorkflowBuilder::new(id, self.name.clone())
            .submitted_at(self.submitted_at)
            .reliability_goal(self.reliability_goal);

        let mut ids = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            ids.push(builder.add_job(job.name.clone(), job.length)?);
        }

        for (job, &id) in self.jobs.iter().zip(&ids) {
            for parent in &job.parents {
                let parent_id = builder.job_id(parent).with_context(|| {
                    format!("job '{}' lists unknown parent '{}'", job.name, parent)
                })?;
                builder.add_dependency(parent_id, id)?;
            }
            for input in &job.inputs {
                let mut artifact = Artifact::new(input.name.clone(), input.size);
                if let Some(location) = &input.location {
                    let node = catalog.node_by_name(location).with_context(|| {
                        format!(
                            "input '{}' of job '{}' is stored on unknown node '{}'",
                            input.name, job.name, location
                        )
                    })?;
                    artifact = artifact.at(node.id);
                }
                builder.add_input(id, artifact)?;
            }
            for output in &job.outputs {
                builder.add_output(id, Artifact::new(output.name.clone(), output.size))?;
            }
        }

        let workflow = builder
            .build()
            .with_context(|| format!("workflow '{}' is not a valid DAG", self.name))?;
        debug!(
            "  Workflow: {} | id: {} | jobs: {} | depth: {}",
            workflow.name,
            workflow.id,
            workflow.len(),
            workflow.max_depth() + 1
        );
        Ok(workflow)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
