// src/lib.rs

//! Combinatorial schedule search for computation reuse.
//!
//! Given a catalogue of atomic read operands and descriptors of the
//! composite operations they can participate in, this crate searches for
//! the grouping of the operands that needs the fewest operations, breaking
//! ties by the total operand-offset distance. Structurally equal
//! sub-schedules at different offsets count as one operation, which is
//! what makes some groupings strictly cheaper than others.
//!
//! # Architecture
//!
//! Three mutually exclusive strategies, one per run:
//!
//! - **Exhaustive** ([`search::Schedules`]): lazily enumerates every
//!   partition of the operand set, memoizing each distinct subset in a
//!   run-scoped cache so it is expanded at most once, then drains the
//!   enumeration through the selector.
//! - **Greedy** ([`strategy::GreedySearch`]): commits to the best local
//!   groupings, keeping a fixed number of partial candidates per step.
//! - **Beam** ([`strategy::BeamSearch`]): fixed-width frontier expanded
//!   round by round under a wall-clock deadline; the best completed
//!   candidate so far is the answer once the deadline hits.
//!
//! The catalogue and the run parameters arrive in one JSON document; the
//! winning schedule and its metrics are merged back into that document by
//! the binary.

pub mod attrs;
pub mod config;
pub mod linearizer;
pub mod schedule;
pub mod search;
pub mod strategy;

pub use attrs::{ActionDescriptor, Catalogue, ReadOperand};
pub use config::{RunConfig, RunMode, Strategy};
pub use linearizer::Linearizer;
pub use schedule::{CompositeSchedule, ResultUnit};
pub use search::{ActiveMask, MemoCache, Orientation, RunStats, Schedules, SubsetKey};
pub use strategy::{best_beam_schedule, best_greedy_schedule, Optimizations};
