// src/strategy/greedy.rs

//! Pruned greedy strategy.
//!
//! Commits to the best local groupings instead of exploring the partition
//! lattice: every step expands each retained candidate by one grouping
//! decision and keeps only the `num_pruned` best partial forests. Bounded
//! branching, no global optimality guarantee, deterministic for a fixed
//! catalogue, linearizer, and prune width.

use std::collections::HashSet;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use log::{debug, info};

use crate::attrs::Catalogue;
use crate::linearizer::Linearizer;
use crate::schedule::CompositeSchedule;

use super::{improves, sort_candidates, Optimizations, Partial};

pub const DEFAULT_NUM_PRUNED: usize = 3;

pub struct GreedySearch {
    catalogue: Rc<Catalogue>,
    linearizer: Option<Rc<Linearizer>>,
    num_pruned: usize,
    frontier: Vec<Partial>,
    best_completed: Option<Rc<CompositeSchedule>>,
    steps: u64,
}

impl GreedySearch {
    pub fn new(
        catalogue: Rc<Catalogue>,
        linearizer: Option<Rc<Linearizer>>,
        num_pruned: usize,
    ) -> Self {
        let initial = Partial::initial(&catalogue);
        let mut search = Self {
            catalogue,
            linearizer,
            num_pruned: num_pruned.max(1),
            frontier: Vec::new(),
            best_completed: None,
            steps: 0,
        };
        if initial.is_complete() {
            search.record_completed(initial);
        } else {
            search.frontier.push(initial);
        }
        search
    }

    pub fn best_completed(&self) -> Option<&Rc<CompositeSchedule>> {
        self.best_completed.as_ref()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Expand the whole frontier by one grouping decision and prune.
    /// Returns false once the frontier is exhausted.
    pub fn step(&mut self) -> bool {
        if self.frontier.is_empty() {
            return false;
        }
        let mut next = Vec::new();
        let mut seen = HashSet::new();
        for partial in std::mem::take(&mut self.frontier) {
            for expanded in partial.expansions(
                &self.catalogue,
                self.linearizer.as_deref(),
                Optimizations::default(),
            ) {
                if expanded.is_complete() {
                    self.record_completed(expanded);
                } else if seen.insert(expanded.fingerprint(&self.catalogue)) {
                    next.push(expanded);
                }
            }
        }
        sort_candidates(&mut next, &self.catalogue);
        next.truncate(self.num_pruned);
        self.frontier = next;
        self.steps += 1;
        debug!(
            "greedy step {}: {} partial candidates retained",
            self.steps,
            self.frontier.len()
        );
        !self.frontier.is_empty()
    }

    pub fn run(mut self) -> Result<Rc<CompositeSchedule>> {
        while self.step() {}
        info!("greedy search finished after {} steps", self.steps);
        self.best_completed
            .ok_or_else(|| anyhow!("greedy search found no schedule"))
    }

    fn record_completed(&mut self, partial: Partial) {
        let schedule = partial.into_schedule(&self.catalogue);
        let replace = self
            .best_completed
            .as_ref()
            .map_or(true, |incumbent| improves(&schedule, incumbent));
        if replace {
            self.best_completed = Some(schedule);
        }
    }
}

/// One-shot entry point used by the driver.
pub fn best_greedy_schedule(
    catalogue: Rc<Catalogue>,
    linearizer: Option<Rc<Linearizer>>,
    num_pruned: usize,
) -> Result<Rc<CompositeSchedule>> {
    GreedySearch::new(catalogue, linearizer, num_pruned).run()
}
