// src/strategy/mod.rs

//! Bounded heuristic strategies over partial schedules.
//!
//! Both heuristics work on forests: a partial candidate is a set of
//! scheduled units that together cover every operand. A grouping decision
//! merges two or more units into one composite, shrinking the forest; a
//! candidate is complete when a single root remains. Candidates are always
//! compared by the selector ordering, operation count first and total
//! distance as the tie-break.

pub mod beam;
pub mod greedy;

#[cfg(test)]
mod tests;

pub use beam::{best_beam_schedule, BeamSearch};
pub use greedy::{best_greedy_schedule, GreedySearch};

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use bitflags::bitflags;
use log::warn;

use crate::attrs::Catalogue;
use crate::linearizer::Linearizer;
use crate::schedule::{CompositeSchedule, ResultUnit};
use crate::search::ActiveMask;

bitflags! {
    /// Local transformation rules applied during heuristic expansion.
    ///
    /// Each flag bounds the branching factor in a different way; all are
    /// enabled by default and none affects legality.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Optimizations: u64 {
        /// Drop expansions whose forest is equivalent to one already kept.
        const DEDUP_EQUIVALENT = 1 << 0;
        /// Merge exactly two units per grouping decision.
        const PAIRWISE_ONLY = 1 << 1;
        /// Merge only units adjacent in offset order.
        const ADJACENT_ONLY = 1 << 2;
    }
}

impl Default for Optimizations {
    fn default() -> Self {
        Self::all()
    }
}

/// One scheduled unit of a partial candidate.
#[derive(Debug, Clone)]
pub struct Unit {
    pub mask: ActiveMask,
    pub item: ResultUnit,
}

impl Unit {
    fn fingerprint(&self, catalogue: &Catalogue) -> String {
        let (min, _) = self.item.span(catalogue);
        format!("{}@{}", self.item.normalized(), min)
    }
}

/// A forest of scheduled units covering every operand.
#[derive(Debug, Clone)]
pub struct Partial {
    units: Vec<Unit>,
    num_ops: u64,
    total_distance: u64,
}

impl Partial {
    /// The all-singleton forest: one pass-through leaf per operand.
    pub fn initial(catalogue: &Catalogue) -> Self {
        let units = (0..catalogue.len())
            .map(|i| Unit {
                mask: ActiveMask::of_positions(catalogue.len(), &[i]),
                item: ResultUnit::leaf_for(catalogue, i),
            })
            .collect();
        let mut partial = Self {
            units,
            num_ops: 0,
            total_distance: 0,
        };
        partial.canonicalize(catalogue);
        partial
    }

    pub fn is_complete(&self) -> bool {
        self.units.len() <= 1
    }

    pub fn num_ops(&self) -> u64 {
        self.num_ops
    }

    pub fn total_distance(&self) -> u64 {
        self.total_distance
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Stable identity of the forest, used for equivalence pruning and as
    /// the deterministic last tie-break.
    pub fn fingerprint(&self, catalogue: &Catalogue) -> String {
        self.units
            .iter()
            .map(|u| u.fingerprint(catalogue))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// The completed schedule. Must only be called on a complete candidate.
    pub fn into_schedule(mut self, catalogue: &Catalogue) -> Rc<CompositeSchedule> {
        debug_assert!(self.is_complete() && !self.units.is_empty());
        match self.units.pop().map(|u| u.item) {
            Some(ResultUnit::Schedule(s)) => s,
            Some(leaf) => Rc::new(CompositeSchedule::leaf(leaf, catalogue)),
            None => unreachable!("complete candidate with no units"),
        }
    }

    /// Every forest reachable from this one by a single grouping decision,
    /// deterministically ordered best-first.
    pub fn expansions(
        &self,
        catalogue: &Catalogue,
        linearizer: Option<&Linearizer>,
        opts: Optimizations,
    ) -> Vec<Partial> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for picks in self.grouping_choices(opts) {
            let Some(expanded) = self.merge(catalogue, linearizer, &picks) else {
                continue;
            };
            if opts.contains(Optimizations::DEDUP_EQUIVALENT)
                && !seen.insert(expanded.fingerprint(catalogue))
            {
                continue;
            }
            out.push(expanded);
        }
        sort_candidates(&mut out, catalogue);
        out
    }

    /// Index sets of units to merge, per the enabled rules.
    fn grouping_choices(&self, opts: Optimizations) -> Vec<Vec<usize>> {
        let k = self.units.len();
        if k < 2 {
            return Vec::new();
        }
        let pairwise = opts.contains(Optimizations::PAIRWISE_ONLY);
        let adjacent = opts.contains(Optimizations::ADJACENT_ONLY);
        match (pairwise, adjacent) {
            (true, true) => (0..k - 1).map(|i| vec![i, i + 1]).collect(),
            (true, false) => {
                let mut picks = Vec::new();
                for i in 0..k {
                    for j in i + 1..k {
                        picks.push(vec![i, j]);
                    }
                }
                picks
            }
            (false, true) => {
                let mut picks = Vec::new();
                for i in 0..k {
                    for j in i + 1..k {
                        picks.push((i..=j).collect());
                    }
                }
                picks
            }
            (false, false) => {
                if k > 20 {
                    warn!("too many units for free-form grouping, merging pairwise");
                    return self.grouping_choices(opts | Optimizations::PAIRWISE_ONLY);
                }
                let mut picks = Vec::new();
                for bits in 1u64..(1u64 << k) {
                    if bits.count_ones() < 2 {
                        continue;
                    }
                    picks.push((0..k).filter(|i| bits & (1 << i) != 0).collect());
                }
                picks
            }
        }
    }

    fn merge(
        &self,
        catalogue: &Catalogue,
        linearizer: Option<&Linearizer>,
        picks: &[usize],
    ) -> Option<Partial> {
        let children: Vec<ResultUnit> = picks.iter().map(|&i| self.units[i].item.clone()).collect();
        let composed = CompositeSchedule::compose(catalogue, children, linearizer)?;
        let mask = picks
            .iter()
            .map(|&i| &self.units[i].mask)
            .fold(None::<ActiveMask>, |acc, m| {
                Some(acc.map_or_else(|| m.clone(), |a| a.union(m)))
            })?;

        let mut units: Vec<Unit> = self
            .units
            .iter()
            .enumerate()
            .filter(|(i, _)| !picks.contains(i))
            .map(|(_, u)| u.clone())
            .collect();
        units.push(Unit {
            mask,
            item: ResultUnit::Schedule(Rc::new(composed)),
        });

        let mut partial = Partial {
            units,
            num_ops: 0,
            total_distance: 0,
        };
        partial.canonicalize(catalogue);
        Some(partial)
    }

    /// Sort units into offset order and refresh the forest metrics.
    fn canonicalize(&mut self, catalogue: &Catalogue) {
        self.units.sort_by(|a, b| {
            let (amin, _) = a.item.span(catalogue);
            let (bmin, _) = b.item.span(catalogue);
            amin.cmp(&bmin)
                .then_with(|| a.item.normalized().cmp(&b.item.normalized()))
        });
        let mut ops = BTreeMap::new();
        for unit in &self.units {
            unit.item.collect_ops(&mut ops);
        }
        self.num_ops = ops.values().map(|m| m.cost).sum();
        self.total_distance = ops.values().map(|m| m.span).sum();
    }
}

/// Selector ordering with a deterministic final tie-break.
pub(crate) fn sort_candidates(candidates: &mut [Partial], catalogue: &Catalogue) {
    candidates.sort_by(|a, b| {
        a.num_ops
            .cmp(&b.num_ops)
            .then_with(|| a.total_distance.cmp(&b.total_distance))
            .then_with(|| a.fingerprint(catalogue).cmp(&b.fingerprint(catalogue)))
    });
}

/// Whether `candidate` beats `incumbent` by the selector ordering.
pub(crate) fn improves(candidate: &Rc<CompositeSchedule>, incumbent: &Rc<CompositeSchedule>) -> bool {
    candidate.num_ops() < incumbent.num_ops()
        || (candidate.num_ops() == incumbent.num_ops()
            && candidate.total_distance() < incumbent.total_distance())
}
