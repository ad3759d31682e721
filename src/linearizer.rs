// src/linearizer.rs

//! Ordering collaborator for proposed operand groupings.
//!
//! Given a grouping of operands, the linearizer either supplies the
//! canonical legal linear order or rejects the grouping. The search core
//! never looks past this contract; legality here is an offset-window
//! check, with ordering by ascending offset.

use serde::{Deserialize, Serialize};

use crate::attrs::ReadOperand;

/// Decoded from the optional `"linearizer"` key of the input document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Linearizer {
    /// Maximum offset span a single grouping may cover. `None` accepts any
    /// span.
    pub window: Option<u64>,
}

impl Linearizer {
    pub fn with_window(window: u64) -> Self {
        Self {
            window: Some(window),
        }
    }

    /// Canonical legal order for `operands`, or `None` when the grouping
    /// has no legal order.
    pub fn linearize(&self, operands: &[ReadOperand]) -> Option<Vec<ReadOperand>> {
        if operands.is_empty() {
            return None;
        }
        let mut ordered = operands.to_vec();
        ordered.sort();
        let span = (ordered[ordered.len() - 1].offset() - ordered[0].offset()) as u64;
        match self.window {
            Some(window) if span > window => None,
            _ => Some(ordered),
        }
    }
}
