// src/attrs.rs

//! Read-operand and action-descriptor attributes.
//!
//! The catalogue is decoded once at startup from the input document and is
//! immutable for the rest of the run. It carries two ordered lists:
//!
//! - `rattrs`: the atomic read operands, identified by their offset.
//! - `aattrs`: descriptors of the composite operations those operands can
//!   participate in. Two layouts are accepted from the same input key: a
//!   list index-parallel to `rattrs` (one descriptor per operand), or a
//!   shorter list of candidate operation templates.

use serde::{Deserialize, Serialize};

/// One atomic read operand, identified by its offset.
///
/// Identity and ordering are by offset; the ordering is what subset
/// canonicalization and linearization rely on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ReadOperand(pub i64);

impl ReadOperand {
    pub fn offset(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ReadOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r@{}", self.0)
    }
}

fn default_cost() -> u64 {
    1
}

/// Attributes of one candidate composite operation.
///
/// A descriptor does not own operands. `arity` bounds how many children a
/// composite built from it may combine (`None` leaves it unbounded), and
/// `cost` is its contribution to the operation count of a schedule.
///
/// Accepted from JSON either as a bare integer tag (the compact form) or as
/// a full record: `{"tag": 3, "arity": 2, "cost": 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ActionDescriptorRepr")]
pub struct ActionDescriptor {
    pub tag: i64,
    pub arity: Option<usize>,
    pub cost: u64,
}

impl ActionDescriptor {
    pub fn new(tag: i64) -> Self {
        Self {
            tag,
            arity: None,
            cost: default_cost(),
        }
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = cost;
        self
    }

    /// Whether a composite of `k` children may use this descriptor.
    pub fn admits(&self, k: usize) -> bool {
        self.arity.map_or(true, |a| a >= k)
    }
}

impl std::fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.tag)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionDescriptorRepr {
    Tag(i64),
    Full {
        tag: i64,
        #[serde(default)]
        arity: Option<usize>,
        #[serde(default = "default_cost")]
        cost: u64,
    },
}

impl From<ActionDescriptorRepr> for ActionDescriptor {
    fn from(repr: ActionDescriptorRepr) -> Self {
        match repr {
            ActionDescriptorRepr::Tag(tag) => ActionDescriptor::new(tag),
            ActionDescriptorRepr::Full { tag, arity, cost } => ActionDescriptor { tag, arity, cost },
        }
    }
}

/// The immutable attribute catalogue for one run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Catalogue {
    pub rattrs: Vec<ReadOperand>,
    #[serde(default)]
    pub aattrs: Vec<ActionDescriptor>,
}

impl Catalogue {
    pub fn new(rattrs: Vec<ReadOperand>, aattrs: Vec<ActionDescriptor>) -> Self {
        Self { rattrs, aattrs }
    }

    pub fn len(&self) -> usize {
        self.rattrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rattrs.is_empty()
    }

    /// One descriptor per operand, by position.
    pub fn is_parallel(&self) -> bool {
        !self.aattrs.is_empty() && self.aattrs.len() == self.rattrs.len()
    }

    /// Offset of the operand a parallel-layout descriptor is attached to.
    pub fn offset_of_action(&self, action: &ActionDescriptor) -> Option<i64> {
        if !self.is_parallel() {
            return None;
        }
        self.aattrs
            .iter()
            .position(|a| a == action)
            .map(|i| self.rattrs[i].offset())
    }

    /// The cheapest descriptor admitting a composite of `k` children.
    ///
    /// Returns `None` when no descriptor admits `k` children, which makes
    /// the composite illegal. An empty descriptor list leaves composition
    /// unconstrained.
    pub fn eligible_op(&self, k: usize) -> Option<OpChoice> {
        if self.aattrs.is_empty() {
            return Some(OpChoice::Unconstrained);
        }
        self.aattrs
            .iter()
            .filter(|a| a.admits(k))
            .min_by_key(|a| a.cost)
            .map(|a| OpChoice::Op(*a))
    }
}

/// Outcome of descriptor selection for a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpChoice {
    /// No descriptors in the catalogue; composition is free-form.
    Unconstrained,
    /// The descriptor the composite operation is built from.
    Op(ActionDescriptor),
}

impl OpChoice {
    pub fn descriptor(&self) -> Option<ActionDescriptor> {
        match self {
            OpChoice::Unconstrained => None,
            OpChoice::Op(a) => Some(*a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_decodes_from_bare_tag_and_record() {
        let bare: ActionDescriptor = serde_json::from_str("7").unwrap();
        assert_eq!(bare, ActionDescriptor::new(7));

        let full: ActionDescriptor =
            serde_json::from_str(r#"{"tag": 3, "arity": 2, "cost": 4}"#).unwrap();
        assert_eq!(full, ActionDescriptor::new(3).with_arity(2).with_cost(4));
    }

    #[test]
    fn eligible_op_picks_cheapest_admitting_descriptor() {
        let cat = Catalogue::new(
            vec![ReadOperand(0), ReadOperand(1), ReadOperand(2)],
            vec![
                ActionDescriptor::new(1).with_arity(2).with_cost(3),
                ActionDescriptor::new(2).with_arity(3).with_cost(2),
            ],
        );
        assert_eq!(cat.eligible_op(2).unwrap().descriptor().unwrap().tag, 2);
        assert_eq!(cat.eligible_op(3).unwrap().descriptor().unwrap().tag, 2);
        assert_eq!(cat.eligible_op(4), None);
    }

    #[test]
    fn empty_descriptor_list_leaves_composition_unconstrained() {
        let cat = Catalogue::new(vec![ReadOperand(0), ReadOperand(5)], vec![]);
        assert_eq!(cat.eligible_op(17), Some(OpChoice::Unconstrained));
    }

    #[test]
    fn parallel_layout_keys_descriptors_back_to_offsets() {
        let cat = Catalogue::new(
            vec![ReadOperand(4), ReadOperand(9)],
            vec![ActionDescriptor::new(1), ActionDescriptor::new(2)],
        );
        assert!(cat.is_parallel());
        assert_eq!(cat.offset_of_action(&ActionDescriptor::new(2)), Some(9));
    }
}
