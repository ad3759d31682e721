// src/schedule.rs

//! Composite schedules and the unit type the search engine yields.
//!
//! A `ResultUnit` is either a pass-through leaf (a read operand, or its
//! action descriptor when the catalogue is laid out one descriptor per
//! operand) or a fully built `CompositeSchedule`. Schedules are immutable
//! after construction and carry their derived metrics:
//!
//! - `num_ops`: the cost of the *distinct* operations in the tree. Identity
//!   is the offset-normalized rendering, so structurally equal subtrees at
//!   different offsets count once. This is what makes grouping reusable
//!   reads cheaper than grouping arbitrary ones.
//! - `total_distance`: the summed operand-offset span of those distinct
//!   operations, used as the tie-break.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::attrs::{ActionDescriptor, Catalogue, ReadOperand};
use crate::linearizer::Linearizer;

/// One yielded item of a subset enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultUnit {
    Read(ReadOperand),
    Action(ActionDescriptor),
    Schedule(Rc<CompositeSchedule>),
}

impl ResultUnit {
    /// The pass-through leaf for a singleton subset: the operand's
    /// descriptor when the catalogue is laid out one descriptor per
    /// operand, otherwise the operand itself.
    pub fn leaf_for(catalogue: &Catalogue, pos: usize) -> Self {
        if catalogue.is_parallel() {
            ResultUnit::Action(catalogue.aattrs[pos])
        } else {
            ResultUnit::Read(catalogue.rattrs[pos])
        }
    }

    /// Offset range covered by this unit.
    pub fn span(&self, catalogue: &Catalogue) -> (i64, i64) {
        match self {
            ResultUnit::Read(r) => (r.offset(), r.offset()),
            ResultUnit::Action(a) => {
                let off = catalogue.offset_of_action(a).unwrap_or_default();
                (off, off)
            }
            ResultUnit::Schedule(s) => s.span(),
        }
    }

    /// Rendering relative to the unit's own minimum offset.
    pub fn normalized(&self) -> String {
        match self {
            ResultUnit::Read(_) => "r".to_string(),
            ResultUnit::Action(a) => format!("a{}", a.tag),
            ResultUnit::Schedule(s) => s.normalized().to_string(),
        }
    }

    /// All read operands under this unit.
    pub fn leaf_operands(&self, catalogue: &Catalogue, out: &mut Vec<ReadOperand>) {
        match self {
            ResultUnit::Read(r) => out.push(*r),
            ResultUnit::Action(a) => {
                if let Some(off) = catalogue.offset_of_action(a) {
                    out.push(ReadOperand(off));
                }
            }
            ResultUnit::Schedule(s) => {
                for child in &s.children {
                    child.leaf_operands(catalogue, out);
                }
            }
        }
    }

    /// Distinct operations under this unit; leaves contribute none.
    pub fn collect_ops(&self, map: &mut BTreeMap<String, OpMetrics>) {
        if let ResultUnit::Schedule(s) = self {
            s.collect_ops(map);
        }
    }
}

impl std::fmt::Display for ResultUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultUnit::Read(r) => write!(f, "{r}"),
            ResultUnit::Action(a) => write!(f, "{a}"),
            ResultUnit::Schedule(s) => write!(f, "{s}"),
        }
    }
}

/// Cost and span of one distinct operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpMetrics {
    pub cost: u64,
    pub span: u64,
}

/// An ordered composition of operations over a set of read operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeSchedule {
    children: Vec<ResultUnit>,
    op: Option<ActionDescriptor>,
    min: i64,
    max: i64,
    normalized: String,
    num_ops: u64,
    total_distance: u64,
}

impl CompositeSchedule {
    /// Build one composite operation over `children`.
    ///
    /// Returns `None` when no catalogue descriptor admits this many
    /// children, or when the linearizer rejects the grouping. Children are
    /// reordered into the canonical order (ascending minimum offset) before
    /// rendering.
    pub fn compose(
        catalogue: &Catalogue,
        mut children: Vec<ResultUnit>,
        linearizer: Option<&Linearizer>,
    ) -> Option<Self> {
        debug_assert!(children.len() >= 2);
        let op = catalogue.eligible_op(children.len())?.descriptor();

        children.sort_by(|a, b| {
            let (amin, _) = a.span(catalogue);
            let (bmin, _) = b.span(catalogue);
            amin.cmp(&bmin).then_with(|| a.normalized().cmp(&b.normalized()))
        });

        if let Some(lin) = linearizer {
            let mut operands = Vec::new();
            for child in &children {
                child.leaf_operands(catalogue, &mut operands);
            }
            lin.linearize(&operands)?;
        }

        let mut min = i64::MAX;
        let mut max = i64::MIN;
        for child in &children {
            let (cmin, cmax) = child.span(catalogue);
            min = min.min(cmin);
            max = max.max(cmax);
        }

        let body = children
            .iter()
            .map(|c| {
                let (cmin, _) = c.span(catalogue);
                format!("{}:{}", cmin - min, c.normalized())
            })
            .collect::<Vec<_>>()
            .join(" ");
        let suffix = match &op {
            Some(a) => format!("#a{}", a.tag),
            None => "#*".to_string(),
        };
        let normalized = format!("({body}){suffix}");

        let mut schedule = Self {
            children,
            op,
            min,
            max,
            normalized,
            num_ops: 0,
            total_distance: 0,
        };
        let mut ops = BTreeMap::new();
        schedule.collect_ops(&mut ops);
        schedule.num_ops = ops.values().map(|m| m.cost).sum();
        schedule.total_distance = ops.values().map(|m| m.span).sum();
        Some(schedule)
    }

    /// Wrap a single pass-through leaf as a schedule with no operations.
    pub fn leaf(unit: ResultUnit, catalogue: &Catalogue) -> Self {
        let (min, max) = unit.span(catalogue);
        let normalized = unit.normalized();
        Self {
            children: vec![unit],
            op: None,
            min,
            max,
            normalized,
            num_ops: 0,
            total_distance: 0,
        }
    }

    pub fn num_ops(&self) -> u64 {
        self.num_ops
    }

    pub fn total_distance(&self) -> u64 {
        self.total_distance
    }

    pub fn span(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    pub fn op(&self) -> Option<&ActionDescriptor> {
        self.op.as_ref()
    }

    pub fn children(&self) -> &[ResultUnit] {
        &self.children
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Distinct operations of the subtree, keyed by normalized rendering.
    pub fn collect_ops(&self, map: &mut BTreeMap<String, OpMetrics>) {
        if self.children.len() >= 2 {
            map.insert(
                self.normalized.clone(),
                OpMetrics {
                    cost: self.op.map_or(1, |a| a.cost),
                    span: (self.max - self.min) as u64,
                },
            );
        }
        for child in &self.children {
            child.collect_ops(map);
        }
    }

    pub fn to_string_with_offset(&self) -> String {
        format!("{}@{}", self.normalized, self.min)
    }
}

impl std::fmt::Display for CompositeSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl Serialize for CompositeSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CompositeSchedule", 3)?;
        state.serialize_field("offset", &self.min)?;
        state.serialize_field("op", &self.op.map(|a| a.tag))?;
        state.serialize_field("parts", &self.children)?;
        state.end()
    }
}

impl Serialize for ResultUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultUnit::Read(r) => {
                let mut state = serializer.serialize_struct("Read", 1)?;
                state.serialize_field("read", &r.offset())?;
                state.end()
            }
            ResultUnit::Action(a) => {
                let mut state = serializer.serialize_struct("Action", 1)?;
                state.serialize_field("action", &a.tag)?;
                state.end()
            }
            ResultUnit::Schedule(s) => s.as_ref().serialize(serializer),
        }
    }
}
