// src/search/mod.rs

//! Exhaustive subset-search engine.
//!
//! `Schedules` lazily enumerates every distinguishable way to schedule the
//! operands marked live in its active mask. A singleton subset yields its
//! catalogue leaf; anything larger is split into every partition with two
//! or more blocks, each block is resolved through the run cache, and the
//! cross-product of the blocks' candidate sequences is composed into fresh
//! schedules.
//!
//! Memoization is what keeps this tractable: the cache maps the canonical
//! subset identity to the one instance allowed to expand it, and replaying
//! an instance serves its memo before resuming suspended production. The
//! same subset requested by unrelated parent partitions is expanded once
//! per run.
//!
//! Enumeration is pull-based. `Replay` is a cursor into an instance's
//! sequence; the cross-product odometer resets block cursors by asking the
//! cache again, which is cheap because the replay never recomputes.

pub mod mask;
pub mod partition;


pub use mask::{ActiveMask, SubsetKey};
pub use partition::{Orientation, PartitionIter};

use std::cell::{Cell, RefCell};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use anyhow::{anyhow, Result};
use log::{debug, info, trace};

use crate::attrs::Catalogue;
use crate::schedule::{CompositeSchedule, ResultUnit};

/// Monotone counters shared by every subset instance in a run.
#[derive(Debug, Default)]
pub struct RunStats {
    cache_hit: Cell<u64>,
    cache_miss: Cell<u64>,
    constructed: Cell<u64>,
    dropped: Cell<u64>,
    leaves: Cell<u64>,
    partitions: Cell<u64>,
    combinations: Cell<u64>,
}

impl RunStats {
    pub fn cache_hits(&self) -> u64 {
        self.cache_hit.get()
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_miss.get()
    }

    pub fn constructed(&self) -> u64 {
        self.constructed.get()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    pub fn leaves_yielded(&self) -> u64 {
        self.leaves.get()
    }

    pub fn partitions_expanded(&self) -> u64 {
        self.partitions.get()
    }

    pub fn combinations_yielded(&self) -> u64 {
        self.combinations.get()
    }

    pub fn log_summary(&self) {
        info!(
            "cache hits: {}, cache misses: {}",
            self.cache_hit.get(),
            self.cache_miss.get()
        );
        debug!(
            "subset instances constructed: {}, dropped: {}",
            self.constructed.get(),
            self.dropped.get()
        );
        debug!(
            "trips: {} leaves, {} partitions, {} combinations",
            self.leaves.get(),
            self.partitions.get(),
            self.combinations.get()
        );
    }

    fn bump(cell: &Cell<u64>) {
        cell.set(cell.get() + 1);
    }
}

/// Run-scoped registry of subset instances, keyed by canonical identity.
///
/// Append-only; registration is insert-if-absent and a losing duplicate is
/// discarded without ever being enumerated.
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: HashMap<SubsetKey, Rc<Schedules>>,
}

pub type SharedCache = Rc<RefCell<MemoCache>>;

impl MemoCache {
    pub fn new_shared() -> SharedCache {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &SubsetKey) -> Option<Rc<Schedules>> {
        self.entries.get(key).cloned()
    }
}

/// Suspended production state of one subset instance.
enum Producer {
    Leaf { pos: usize, emitted: bool },
    Composite { partitions: PartitionIter, cross: Option<CrossProduct> },
}

/// Subset-search instance bound to one active mask.
pub struct Schedules {
    catalogue: Rc<Catalogue>,
    mask: ActiveMask,
    // Weak so the cache owning this instance does not form a cycle.
    cache: Option<Weak<RefCell<MemoCache>>>,
    stats: Rc<RunStats>,
    orientation: Orientation,
    memo: RefCell<Vec<ResultUnit>>,
    producer: RefCell<Producer>,
    exhausted: Cell<bool>,
}

impl std::fmt::Debug for Schedules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedules")
            .field("mask", &self.mask.to_string())
            .field("memo_len", &self.memo.borrow().len())
            .field("exhausted", &self.exhausted.get())
            .finish()
    }
}

impl Schedules {
    /// Construct an instance and register it in the cache, if one is
    /// supplied. When another instance already owns the subset key the
    /// registered winner is returned and the fresh construction is
    /// discarded unused.
    pub fn shared(
        catalogue: Rc<Catalogue>,
        mask: Option<ActiveMask>,
        cache: Option<SharedCache>,
        stats: Option<Rc<RunStats>>,
        orientation: Orientation,
    ) -> Rc<Self> {
        let mask = mask.unwrap_or_else(|| ActiveMask::full(catalogue.len()));
        debug_assert_eq!(mask.len(), catalogue.len());
        let stats = stats.unwrap_or_else(|| Rc::new(RunStats::default()));

        let active = mask.active_positions();
        let producer = if active.len() == 1 {
            Producer::Leaf {
                pos: active[0],
                emitted: false,
            }
        } else {
            Producer::Composite {
                partitions: PartitionIter::new(active, orientation),
                cross: None,
            }
        };

        let instance = Rc::new(Self {
            catalogue,
            mask,
            cache: cache.as_ref().map(Rc::downgrade),
            stats,
            orientation,
            memo: RefCell::new(Vec::new()),
            producer: RefCell::new(producer),
            exhausted: Cell::new(false),
        });
        RunStats::bump(&instance.stats.constructed);
        trace!("schedules constructed for operands {}", instance.mask);

        if let Some(cache) = cache {
            let key = SubsetKey::of(&instance.catalogue, &instance.mask);
            match cache.borrow_mut().entries.entry(key) {
                Entry::Vacant(slot) => {
                    trace!("insert into cache");
                    slot.insert(instance.clone());
                    instance
                }
                Entry::Occupied(winner) => winner.get().clone(),
            }
        } else {
            instance
        }
    }

    pub fn mask(&self) -> &ActiveMask {
        &self.mask
    }

    pub fn stats(&self) -> &Rc<RunStats> {
        &self.stats
    }

    /// Lazy enumeration of every distinguishable result for this subset.
    ///
    /// Replaying is idempotent: a second cursor serves the memoized items
    /// and only resumes production past them.
    pub fn generate(self: Rc<Self>) -> Replay {
        Replay {
            instance: self,
            pos: 0,
        }
    }

    /// Drain the enumeration and keep the best candidate.
    ///
    /// Strictly fewer operations wins outright; equal operation counts fall
    /// through to the lower total distance. The first candidate seeds the
    /// provisional best unconditionally.
    pub fn best(self: Rc<Self>) -> Result<Rc<CompositeSchedule>> {
        let catalogue = self.catalogue.clone();
        let mut best: Option<Rc<CompositeSchedule>> = None;
        let mut num_ops = 0;
        let mut total_distance = 0;
        let mut evaluated = 0u64;
        for unit in self.generate() {
            let schedule = match unit {
                ResultUnit::Schedule(s) => s,
                leaf => Rc::new(CompositeSchedule::leaf(leaf, &catalogue)),
            };
            evaluated += 1;
            debug!(
                "schedule: {} num_ops: {} total_distance: {}",
                schedule,
                schedule.num_ops(),
                schedule.total_distance()
            );
            let better = best.is_none()
                || schedule.num_ops() < num_ops
                || (schedule.num_ops() == num_ops && schedule.total_distance() < total_distance);
            if better {
                num_ops = schedule.num_ops();
                total_distance = schedule.total_distance();
                best = Some(schedule);
            }
        }
        info!("{evaluated} schedules evaluated");
        best.ok_or_else(|| anyhow!("exhaustive search yielded no schedule"))
    }

    /// Cache-aware lookup used by the partition step: replay the registered
    /// instance on a hit, expand a fresh one on a miss.
    fn lookup_or_build(&self, positions: &[usize]) -> Replay {
        let mask = ActiveMask::of_positions(self.mask.len(), positions);
        let cache = self.cache.as_ref().and_then(Weak::upgrade);
        if let Some(cache) = &cache {
            let key = SubsetKey::of(&self.catalogue, &mask);
            let hit = cache.borrow().get(&key);
            if let Some(instance) = hit {
                RunStats::bump(&self.stats.cache_hit);
                return instance.generate();
            }
        }
        RunStats::bump(&self.stats.cache_miss);
        let instance = Schedules::shared(
            self.catalogue.clone(),
            Some(mask),
            cache,
            Some(self.stats.clone()),
            self.orientation,
        );
        instance.generate()
    }

    fn pull(&self, pos: usize) -> Option<ResultUnit> {
        loop {
            {
                let memo = self.memo.borrow();
                if pos < memo.len() {
                    return Some(memo[pos].clone());
                }
            }
            if !self.step() {
                return None;
            }
        }
    }

    /// Advance production by one item. Returns false once the subset is
    /// fully enumerated.
    fn step(&self) -> bool {
        if self.exhausted.get() {
            return false;
        }
        let mut producer = self.producer.borrow_mut();
        match &mut *producer {
            Producer::Leaf { pos, emitted } => {
                if *emitted {
                    self.exhausted.set(true);
                    return false;
                }
                *emitted = true;
                RunStats::bump(&self.stats.leaves);
                let unit = ResultUnit::leaf_for(&self.catalogue, *pos);
                self.memo.borrow_mut().push(unit);
                true
            }
            Producer::Composite { partitions, cross } => loop {
                if let Some(product) = cross {
                    match product.advance(self) {
                        Some(children) => {
                            match CompositeSchedule::compose(&self.catalogue, children, None) {
                                Some(schedule) => {
                                    RunStats::bump(&self.stats.combinations);
                                    self.memo
                                        .borrow_mut()
                                        .push(ResultUnit::Schedule(Rc::new(schedule)));
                                    return true;
                                }
                                // No descriptor admits this combination.
                                None => continue,
                            }
                        }
                        None => *cross = None,
                    }
                }
                match partitions.next() {
                    Some(blocks) => {
                        RunStats::bump(&self.stats.partitions);
                        trace!("expanding partition with {} blocks", blocks.len());
                        *cross = Some(CrossProduct::new(self, blocks));
                    }
                    None => {
                        self.exhausted.set(true);
                        return false;
                    }
                }
            },
        }
    }
}

impl Drop for Schedules {
    fn drop(&mut self) {
        RunStats::bump(&self.stats.dropped);
    }
}

/// Cursor into one instance's enumerated sequence.
pub struct Replay {
    instance: Rc<Schedules>,
    pos: usize,
}

impl Iterator for Replay {
    type Item = ResultUnit;

    fn next(&mut self) -> Option<ResultUnit> {
        let unit = self.instance.pull(self.pos)?;
        self.pos += 1;
        Some(unit)
    }
}

/// Odometer over the blocks of one partition.
///
/// Each block holds a replayable cursor into its subset's sequence; the
/// rightmost cursor advances fastest and exhausted cursors are reset by a
/// fresh cache lookup.
struct CrossProduct {
    blocks: Vec<Vec<usize>>,
    cursors: Vec<Replay>,
    current: Vec<ResultUnit>,
    primed: bool,
    dead: bool,
}

impl CrossProduct {
    fn new(parent: &Schedules, blocks: Vec<Vec<usize>>) -> Self {
        let cursors = blocks
            .iter()
            .map(|block| parent.lookup_or_build(block))
            .collect();
        Self {
            blocks,
            cursors,
            current: Vec::new(),
            primed: false,
            dead: false,
        }
    }

    fn advance(&mut self, parent: &Schedules) -> Option<Vec<ResultUnit>> {
        if self.dead {
            return None;
        }
        if !self.primed {
            for cursor in &mut self.cursors {
                match cursor.next() {
                    Some(unit) => self.current.push(unit),
                    None => {
                        // A block with no candidates kills the partition.
                        self.dead = true;
                        return None;
                    }
                }
            }
            self.primed = true;
            return Some(self.current.clone());
        }
        let mut g = self.cursors.len() - 1;
        loop {
            if let Some(unit) = self.cursors[g].next() {
                self.current[g] = unit;
                return Some(self.current.clone());
            }
            if g == 0 {
                self.dead = true;
                return None;
            }
            self.cursors[g] = parent.lookup_or_build(&self.blocks[g]);
            match self.cursors[g].next() {
                Some(unit) => self.current[g] = unit,
                None => {
                    self.dead = true;
                    return None;
                }
            }
            g -= 1;
        }
    }
}
