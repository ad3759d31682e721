// src/strategy/beam.rs

//! Timed beam strategy.
//!
//! Keeps a frontier of at most `beam_width` partial candidates. Every
//! round expands all of them by one grouping decision, scores the results
//! by the selector ordering, and retains the `beam_width` best. The
//! wall-clock deadline is checked at round boundaries; reaching it with at
//! least one completed candidate returns the best one found so far, while
//! reaching it with none is a reportable failure.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use log::{debug, info};

use crate::attrs::Catalogue;
use crate::linearizer::Linearizer;
use crate::schedule::CompositeSchedule;

use super::{improves, sort_candidates, Optimizations, Partial};

pub const DEFAULT_BEAM_WIDTH: usize = 16;
pub const DEFAULT_TIMEOUT_SECS: f64 = 600.0;

pub struct BeamSearch {
    catalogue: Rc<Catalogue>,
    linearizer: Option<Rc<Linearizer>>,
    beam_width: usize,
    opts: Optimizations,
    frontier: Vec<Partial>,
    best_completed: Option<Rc<CompositeSchedule>>,
    rounds: u64,
}

impl BeamSearch {
    pub fn new(
        catalogue: Rc<Catalogue>,
        linearizer: Option<Rc<Linearizer>>,
        beam_width: usize,
        opts: Optimizations,
    ) -> Self {
        let initial = Partial::initial(&catalogue);
        let mut search = Self {
            catalogue,
            linearizer,
            beam_width: beam_width.max(1),
            opts,
            frontier: Vec::new(),
            best_completed: None,
            rounds: 0,
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

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Expand every frontier member by one grouping decision and keep the
    /// `beam_width` best. Returns false once the frontier is exhausted.
    pub fn round(&mut self) -> bool {
        if self.frontier.is_empty() {
            return false;
        }
        let mut next = Vec::new();
        let mut seen = HashSet::new();
        for partial in std::mem::take(&mut self.frontier) {
            for expanded in
                partial.expansions(&self.catalogue, self.linearizer.as_deref(), self.opts)
            {
                if expanded.is_complete() {
                    self.record_completed(expanded);
                } else if seen.insert(expanded.fingerprint(&self.catalogue)) {
                    next.push(expanded);
                }
            }
        }
        sort_candidates(&mut next, &self.catalogue);
        next.truncate(self.beam_width);
        self.frontier = next;
        self.rounds += 1;
        debug!(
            "beam round {}: {} partial candidates in frontier",
            self.rounds,
            self.frontier.len()
        );
        !self.frontier.is_empty()
    }

    /// Run rounds until the frontier is exhausted or the deadline passes.
    pub fn run(mut self, timeout: Duration) -> Result<Rc<CompositeSchedule>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut timed_out = false;
        while !self.frontier.is_empty() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                timed_out = true;
                break;
            }
            self.round();
        }
        if timed_out {
            info!("beam deadline reached after {} rounds", self.rounds);
        } else {
            info!("beam search finished after {} rounds", self.rounds);
        }
        self.best_completed.ok_or_else(|| {
            if timed_out {
                anyhow!("beam search timed out with no completed schedule")
            } else {
                anyhow!("beam search found no schedule")
            }
        })
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
pub fn best_beam_schedule(
    catalogue: Rc<Catalogue>,
    linearizer: Option<Rc<Linearizer>>,
    beam_width: usize,
    timeout_secs: f64,
    opts: Optimizations,
) -> Result<Rc<CompositeSchedule>> {
    let timeout = Duration::try_from_secs_f64(timeout_secs)
        .map_err(|e| anyhow!("invalid timeout {timeout_secs}: {e}"))?;
    BeamSearch::new(catalogue, linearizer, beam_width, opts).run(timeout)
}
