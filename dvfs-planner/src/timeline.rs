/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-node execution timelines and earliest-fit gap search.
//!
//! Each node keeps a sorted list of non-overlapping [`ExecWindow`]s.  The
//! free gaps are the spaces between consecutive windows, plus the gap before
//! the first window (starting at 0) and the unbounded gap after the last:
//!
//! ```text
//!   0        w0            w1                  ∞
//!   |..gap..|####|..gap..|#####|......gap.......
//! ```
//!
//! A job of `duration` that becomes ready at `ready` goes into the first gap
//! where `max(gap_start, ready) + duration <= gap_end`.  A gap exactly as long
//! as the job is usable.

use crate::resource::NodeId;
use crate::workflow::JobRef;

/// A busy interval `[start, finish)` reserved for one job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecWindow {
    pub start: f64,
    pub finish: f64,
    pub job: JobRef,
}

/// Ordered, non-overlapping windows of a single node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    windows: Vec<ExecWindow>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn windows(&self) -> &[ExecWindow] {
        &self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Finish time of the last window, or 0 when idle.
    pub fn busy_until(&self) -> f64 {
        self.windows.last().map_or(0.0, |w| w.finish)
    }

    /// Earliest start `>= ready` at which `duration` fits.  No side effects.
    pub fn probe(&self, duration: f64, ready: f64) -> f64 {
        let mut gap_start = 0.0_f64;
        for w in &self.windows {
            let start = gap_start.max(ready);
            if start + duration <= w.start {
                return start;
            }
            gap_start = gap_start.max(w.finish);
        }
        gap_start.max(ready)
    }

    /// Reserves the earliest fitting gap for `job` and returns the window.
    pub fn commit(&mut self, duration: f64, ready: f64, job: JobRef) -> ExecWindow {
        let start = self.probe(duration, ready);
        let window = ExecWindow {
            start,
            finish: start + duration,
            job,
        };
        let at = self.windows.partition_point(|w| w.start <= start);
        self.windows.insert(at, window);
        debug_assert!(self.is_consistent(), "overlapping windows after commit");
        window
    }

    /// Start of the first window beginning strictly after `t`.
    pub fn next_window_start_after(&self, t: f64) -> Option<f64> {
        self.windows.iter().map(|w| w.start).find(|&s| s > t)
    }

    /// `true` when windows are sorted and pairwise disjoint.
    pub fn is_consistent(&self) -> bool {
        self.windows
            .windows(2)
            .all(|p| p[0].start <= p[1].start && p[0].finish <= p[1].start)
    }
}

/// Timelines of every node in a catalog, indexed by [`NodeId`].
///
/// Cloned per search pass; only the best pass replaces the shared copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timelines {
    nodes: Vec<Timeline>,
}

impl Timelines {
    pub fn new(node_count: usize) -> Self {
        Self {
            nodes: vec![Timeline::new(); node_count],
        }
    }

    pub fn node(&self, node: NodeId) -> &Timeline {
        &self.nodes[node.0]
    }

    pub fn probe(&self, node: NodeId, duration: f64, ready: f64) -> f64 {
        self.nodes[node.0].probe(duration, ready)
    }

    pub fn commit(&mut self, node: NodeId, duration: f64, ready: f64, job: JobRef) -> ExecWindow {
        self.nodes[node.0].commit(duration, ready, job)
    }

    pub fn next_window_start_after(&self, node: NodeId, t: f64) -> Option<f64> {
        self.nodes[node.0].next_window_start_after(t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Timeline)> + '_ {
        self.nodes.iter().enumerate().map(|(i, t)| (NodeId(i), t))
    }

    pub fn window_count(&self) -> usize {
        self.nodes.iter().map(|t| t.windows.len()).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{JobId, WorkflowId};

    fn job(i: usize) -> JobRef {
        JobRef {
            workflow: WorkflowId(0),
            job: JobId(i),
        }
    }

    /// Windows at [0,10) and [20,30).
    fn two_windows() -> Timeline {
        let mut t = Timeline::new();
        t.commit(10.0, 0.0, job(0));
        t.commit(10.0, 20.0, job(1));
        t
    }

    #[test]
    fn fills_first_gap_that_fits() {
        let t = two_windows();
        assert_eq!(t.probe(8.0, 5.0), 10.0);
    }

    #[test]
    fn exact_fit_gap_is_usable() {
        let t = two_windows();
        assert_eq!(t.probe(10.0, 0.0), 10.0);
        assert_eq!(t.probe(10.0001, 0.0), 30.0);
    }

    #[test]
    fn ready_time_is_respected_inside_gap() {
        let t = two_windows();
        assert_eq!(t.probe(4.0, 14.0), 14.0);
        assert_eq!(t.probe(4.0, 17.0), 30.0);
        assert_eq!(t.probe(1.0, 100.0), 100.0);
    }

    #[test]
    fn empty_timeline_starts_at_ready() {
        let t = Timeline::new();
        assert_eq!(t.probe(5.0, 0.0), 0.0);
        assert_eq!(t.probe(5.0, 42.0), 42.0);
        assert_eq!(t.busy_until(), 0.0);
    }

    #[test]
    fn probe_has_no_side_effects() {
        let t = two_windows();
        let before = t.clone();
        let _ = t.probe(3.0, 0.0);
        assert_eq!(t, before);
    }

    #[test]
    fn commit_inserts_in_sorted_position() {
        let mut t = two_windows();
        let w = t.commit(8.0, 5.0, job(2));
        assert_eq!((w.start, w.finish), (10.0, 18.0));
        let starts: Vec<f64> = t.windows().iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![0.0, 10.0, 20.0]);
        assert!(t.is_consistent());
        assert_eq!(t.busy_until(), 30.0);
    }

    #[test]
    fn gap_before_first_window_starts_at_zero() {
        let mut t = Timeline::new();
        t.commit(5.0, 50.0, job(0));
        assert_eq!(t.probe(20.0, 0.0), 0.0);
        assert_eq!(t.probe(60.0, 0.0), 55.0);
    }

    #[test]
    fn next_window_lookup() {
        let t = two_windows();
        assert_eq!(t.next_window_start_after(10.0), Some(20.0));
        assert_eq!(t.next_window_start_after(-1.0), Some(0.0));
        assert_eq!(t.next_window_start_after(20.0), None);
    }

    #[test]
    fn timelines_are_independent_per_node() {
        let mut all = Timelines::new(2);
        all.commit(NodeId(0), 10.0, 0.0, job(0));
        assert_eq!(all.probe(NodeId(0), 1.0, 0.0), 10.0);
        assert_eq!(all.probe(NodeId(1), 1.0, 0.0), 0.0);
        assert_eq!(all.window_count(), 1);
        assert_eq!(all.iter().count(), 2);
    }
}
