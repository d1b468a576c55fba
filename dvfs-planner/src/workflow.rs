/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workflow DAG model.
//!
//! A [`Workflow`] owns its jobs in an arena; edges are stored as index lists
//! on both ends so forward and backward passes need no lookups.  Workflows
//! are assembled through [`WorkflowBuilder`], which validates acyclicity,
//! computes depths and splits every job's inputs into
//!
//! * **local** inputs – already resident on some node (or outside the
//!   catalog), staged before the job starts, and
//! * **predecessor** inputs – produced by a parent, matched by file name.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::error::ModelError;
use crate::resource::NodeId;

// ── Identifiers ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowId(pub u64);

/// Index of a job inside its workflow's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub usize);

/// Globally unique job reference, as stored in node timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobRef {
    pub workflow: WorkflowId,
    pub job: JobId,
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wf#{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

// ── Artifacts & jobs ──────────────────────────────────────────────────────────

/// A named file consumed or produced by a job.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub size_bytes: f64,
    /// Node holding the file, for inputs that are already resident.
    pub location: Option<NodeId>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, size_bytes: f64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            location: None,
        }
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.location = Some(node);
        self
    }
}

/// Final placement of a committed job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub node: NodeId,
    pub level: usize,
    pub start: f64,
    pub finish: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    /// Work in instructions.
    pub length: f64,
    /// 0 for roots, `1 + max(depth(parent))` otherwise.
    pub depth: usize,
    pub parents: Vec<JobId>,
    pub children: Vec<JobId>,
    pub local_inputs: Vec<Artifact>,
    pub pred_inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,
    /// Set once, when the workflow's best solution is committed.
    pub binding: Option<Binding>,
}

impl Job {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.children.is_empty()
    }

    /// Bytes this job reads from `parent`'s outputs.
    pub fn data_from(&self, parent: &Job) -> f64 {
        self.pred_inputs
            .iter()
            .filter(|input| parent.outputs.iter().any(|out| out.name == input.name))
            .map(|input| input.size_bytes)
            .sum()
    }
}

// ── Workflow ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    /// Earliest time any job of this workflow may start.
    pub submitted_at: f64,
    /// Minimum end-to-end reliability; the planner derives one when `None`.
    pub reliability_goal: Option<f64>,
    /// Filled in by the planner.
    pub deadline: Option<f64>,
    jobs: Vec<Job>,
}

impl Workflow {
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> &Job {
        &self.jobs[id.0]
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.jobs.iter().map(|j| j.depth).max().unwrap_or(0)
    }

    pub fn total_length(&self) -> f64 {
        self.jobs.iter().map(|j| j.length).sum()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Job> + '_ {
        self.jobs.iter().filter(|j| j.is_root())
    }

    pub fn sinks(&self) -> impl Iterator<Item = &Job> + '_ {
        self.jobs.iter().filter(|j| j.is_sink())
    }

    /// Job ids sorted by `(depth, id)`; a valid topological order.
    pub fn depth_order(&self) -> Vec<JobId> {
        let mut order: Vec<JobId> = self.jobs.iter().map(|j| j.id).collect();
        order.sort_by_key(|id| (self.jobs[id.0].depth, id.0));
        order
    }

    /// Jobs grouped by depth, shallowest first.
    pub fn depth_groups(&self) -> Vec<Vec<JobId>> {
        let mut groups = vec![Vec::new(); self.max_depth() + 1];
        for job in &self.jobs {
            groups[job.depth].push(job.id);
        }
        groups
    }

    pub fn is_bound(&self) -> bool {
        self.jobs.iter().all(|j| j.binding.is_some())
    }

    pub(crate) fn bind(&mut self, job: JobId, binding: Binding) {
        self.jobs[job.0].binding = Some(binding);
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct PendingJob {
    name: String,
    length: f64,
    inputs: Vec<Artifact>,
    outputs: Vec<Artifact>,
}

/// Assembles a [`Workflow`] and validates it on [`build`](Self::build).
#[derive(Debug)]
pub struct WorkflowBuilder {
    id: WorkflowId,
    name: String,
    submitted_at: f64,
    reliability_goal: Option<f64>,
    jobs: Vec<PendingJob>,
    by_name: HashMap<String, JobId>,
    edges: Vec<(JobId, JobId)>,
}

impl WorkflowBuilder {
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            submitted_at: 0.0,
            reliability_goal: None,
            jobs: Vec::new(),
            by_name: HashMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn submitted_at(mut self, t: f64) -> Self {
        self.submitted_at = t;
        self
    }

    pub fn reliability_goal(mut self, goal: Option<f64>) -> Self {
        self.reliability_goal = goal;
        self
    }

    pub fn add_job(&mut self, name: impl Into<String>, length: f64) -> Result<JobId, ModelError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ModelError::DuplicateJob { job: name });
        }
        if !(length.is_finite() && length >= 0.0) {
            return Err(ModelError::InvalidJobLength { job: name, length });
        }
        let id = JobId(self.jobs.len());
        self.by_name.insert(name.clone(), id);
        self.jobs.push(PendingJob {
            name,
            length,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        Ok(id)
    }

    pub fn job_id(&self, name: &str) -> Option<JobId> {
        self.by_name.get(name).copied()
    }

    fn check(&self, id: JobId) -> Result<(), ModelError> {
        if id.0 < self.jobs.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownJob(id.0))
        }
    }

    pub fn add_dependency(&mut self, parent: JobId, child: JobId) -> Result<(), ModelError> {
        self.check(parent)?;
        self.check(child)?;
        self.edges.push((parent, child));
        Ok(())
    }

    fn check_artifact(artifact: &Artifact) -> Result<(), ModelError> {
        if artifact.size_bytes.is_finite() && artifact.size_bytes >= 0.0 {
            Ok(())
        } else {
            Err(ModelError::InvalidArtifactSize {
                artifact: artifact.name.clone(),
                size: artifact.size_bytes,
            })
        }
    }

    pub fn add_input(&mut self, job: JobId, artifact: Artifact) -> Result<(), ModelError> {
        self.check(job)?;
        Self::check_artifact(&artifact)?;
        self.jobs[job.0].inputs.push(artifact);
        Ok(())
    }

    pub fn add_output(&mut self, job: JobId, artifact: Artifact) -> Result<(), ModelError> {
        self.check(job)?;
        Self::check_artifact(&artifact)?;
        self.jobs[job.0].outputs.push(artifact);
        Ok(())
    }

    /// Validates the DAG, computes depths and classifies inputs.
    ///
    /// # Errors
    /// [`ModelError::CyclicWorkflow`] if the edges contain a cycle (including
    /// a self-loop).
    pub fn build(mut self) -> Result<Workflow, ModelError> {
        let n = self.jobs.len();
        self.edges.sort_unstable();
        self.edges.dedup();

        let mut parents = vec![Vec::new(); n];
        let mut children = vec![Vec::new(); n];
        for &(p, c) in &self.edges {
            parents[c.0].push(p);
            children[p.0].push(c);
        }

        // Kahn's algorithm; depth follows the topological order.
        let mut in_degree: Vec<usize> = parents.iter().map(Vec::len).collect();
        let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut depth = vec![0usize; n];
        let mut visited = 0usize;

        while let Some(i) = ready.pop_front() {
            visited += 1;
            for c in &children[i] {
                depth[c.0] = depth[c.0].max(depth[i] + 1);
                in_degree[c.0] -= 1;
                if in_degree[c.0] == 0 {
                    ready.push_back(c.0);
                }
            }
        }

        if visited < n {
            let stuck = (0..n).find(|&i| in_degree[i] > 0).unwrap_or(0);
            return Err(ModelError::CyclicWorkflow {
                workflow: self.name,
                job: self.jobs[stuck].name.clone(),
            });
        }

        let produced: Vec<Vec<String>> = self
            .jobs
            .iter()
            .map(|j| j.outputs.iter().map(|a| a.name.clone()).collect())
            .collect();

        let jobs = self
            .jobs
            .into_iter()
            .enumerate()
            .map(|(i, pending)| {
                let (pred_inputs, local_inputs): (Vec<_>, Vec<_>) =
                    pending.inputs.into_iter().partition(|input| {
                        parents[i]
                            .iter()
                            .any(|p| produced[p.0].iter().any(|name| *name == input.name))
                    });
                Job {
                    id: JobId(i),
                    name: pending.name,
                    length: pending.length,
                    depth: depth[i],
                    parents: std::mem::take(&mut parents[i]),
                    children: std::mem::take(&mut children[i]),
                    local_inputs,
                    pred_inputs,
                    outputs: pending.outputs,
                    binding: None,
                }
            })
            .collect();

        Ok(Workflow {
            id: self.id,
            name: self.name,
            submitted_at: self.submitted_at,
            reliability_goal: self.reliability_goal,
            deadline: None,
            jobs,
        })
    }
}

// ── Submission ordering ───────────────────────────────────────────────────────

/// Key used to order a batch of workflows before planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKey {
    Id,
    Depth,
    JobCount,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOrder {
    pub key: SubmissionKey,
    pub descending: bool,
}

impl Default for SubmissionOrder {
    fn default() -> Self {
        Self {
            key: SubmissionKey::Id,
            descending: false,
        }
    }
}

impl SubmissionOrder {
    pub fn compare(&self, a: &Workflow, b: &Workflow) -> Ordering {
        let ord = match self.key {
            SubmissionKey::Id => a.id.cmp(&b.id),
            SubmissionKey::Depth => a.max_depth().cmp(&b.max_depth()),
            SubmissionKey::JobCount => a.len().cmp(&b.len()),
            SubmissionKey::Length => a.total_length().total_cmp(&b.total_length()),
        };
        // Ties fall back to id so the order is total and stable.
        let ord = if self.descending { ord.reverse() } else { ord };
        ord.then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, workflows: &mut [Workflow]) {
        workflows.sort_by(|a, b| self.compare(a, b));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// a → {b, c} → d, with d reading both intermediate files.
    fn diamond() -> Workflow {
        let mut b = WorkflowBuilder::new(WorkflowId(1), "diamond");
        let a = b.add_job("a", 100.0).unwrap();
        let bj = b.add_job("b", 200.0).unwrap();
        let c = b.add_job("c", 300.0).unwrap();
        let d = b.add_job("d", 400.0).unwrap();
        b.add_input(a, Artifact::new("raw", 10.0).at(NodeId(0))).unwrap();
        b.add_output(a, Artifact::new("a.out", 20.0)).unwrap();
        b.add_input(bj, Artifact::new("a.out", 20.0)).unwrap();
        b.add_input(c, Artifact::new("a.out", 20.0)).unwrap();
        b.add_output(bj, Artifact::new("b.out", 5.0)).unwrap();
        b.add_output(c, Artifact::new("c.out", 7.0)).unwrap();
        b.add_input(d, Artifact::new("b.out", 5.0)).unwrap();
        b.add_input(d, Artifact::new("c.out", 7.0)).unwrap();
        b.add_input(d, Artifact::new("ref.db", 50.0)).unwrap();
        for (p, ch) in [(a, bj), (a, c), (bj, d), (c, d), (a, bj)] {
            b.add_dependency(p, ch).unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn depths_follow_longest_parent_chain() {
        let wf = diamond();
        let depths: Vec<usize> = wf.jobs().iter().map(|j| j.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2]);
        assert_eq!(wf.max_depth(), 2);
        assert_eq!(wf.depth_groups(), vec![vec![JobId(0)], vec![JobId(1), JobId(2)], vec![JobId(3)]]);
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let wf = diamond();
        assert_eq!(wf.job(JobId(0)).children, vec![JobId(1), JobId(2)]);
        assert_eq!(wf.job(JobId(3)).parents, vec![JobId(1), JobId(2)]);
    }

    #[test]
    fn inputs_are_split_into_local_and_predecessor() {
        let wf = diamond();
        let d = wf.job(JobId(3));
        assert_eq!(d.pred_inputs.len(), 2);
        assert_eq!(d.local_inputs.len(), 1);
        assert_eq!(d.local_inputs[0].name, "ref.db");
        assert_eq!(d.data_from(wf.job(JobId(1))), 5.0);
        assert_eq!(d.data_from(wf.job(JobId(2))), 7.0);
        let a = wf.job(JobId(0));
        assert_eq!(a.local_inputs[0].location, Some(NodeId(0)));
        assert!(a.pred_inputs.is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut b = WorkflowBuilder::new(WorkflowId(2), "loop");
        let x = b.add_job("x", 1.0).unwrap();
        let y = b.add_job("y", 1.0).unwrap();
        b.add_dependency(x, y).unwrap();
        b.add_dependency(y, x).unwrap();
        assert!(matches!(b.build(), Err(ModelError::CyclicWorkflow { .. })));

        let mut b = WorkflowBuilder::new(WorkflowId(3), "self");
        let z = b.add_job("z", 1.0).unwrap();
        b.add_dependency(z, z).unwrap();
        assert!(matches!(b.build(), Err(ModelError::CyclicWorkflow { .. })));
    }

    #[test]
    fn builder_validates_names_and_ids() {
        let mut b = WorkflowBuilder::new(WorkflowId(4), "bad");
        b.add_job("x", 1.0).unwrap();
        assert!(matches!(b.add_job("x", 2.0), Err(ModelError::DuplicateJob { .. })));
        assert!(matches!(b.add_job("y", -1.0), Err(ModelError::InvalidJobLength { .. })));
        assert!(matches!(
            b.add_dependency(JobId(0), JobId(9)),
            Err(ModelError::UnknownJob(9))
        ));
        assert_eq!(b.job_id("x"), Some(JobId(0)));
    }

    #[test]
    fn depth_order_is_topological() {
        let wf = diamond();
        let order = wf.depth_order();
        let pos = |id: JobId| order.iter().position(|&j| j == id).unwrap();
        for job in wf.jobs() {
            for p in &job.parents {
                assert!(pos(*p) < pos(job.id));
            }
        }
    }

    #[test]
    fn submission_order_sorts_by_key() {
        let small = {
            let mut b = WorkflowBuilder::new(WorkflowId(7), "small");
            b.add_job("only", 10.0).unwrap();
            b.build().unwrap()
        };
        let mut batch = vec![diamond(), small];
        SubmissionOrder {
            key: SubmissionKey::JobCount,
            descending: false,
        }
        .sort(&mut batch);
        assert_eq!(batch[0].name, "small");

        SubmissionOrder {
            key: SubmissionKey::Length,
            descending: true,
        }
        .sort(&mut batch);
        assert_eq!(batch[0].name, "diamond");

        SubmissionOrder::default().sort(&mut batch);
        assert_eq!(batch[0].id, WorkflowId(1));
    }
}
