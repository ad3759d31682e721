// src/search/mask.rs

//! Active-operand masks and their canonical cache identity.

use crate::attrs::{Catalogue, ReadOperand};

/// Boolean selection of the operands live in a subproblem.
///
/// Length always equals the catalogue size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMask(Vec<bool>);

impl ActiveMask {
    /// All operands live.
    pub fn full(len: usize) -> Self {
        Self(vec![true; len])
    }

    /// Only the given catalogue positions live.
    pub fn of_positions(len: usize, positions: &[usize]) -> Self {
        let mut bits = vec![false; len];
        for &p in positions {
            bits[p] = true;
        }
        Self(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Mask with the live operands of both inputs.
    pub fn union(&self, other: &ActiveMask) -> ActiveMask {
        debug_assert_eq!(self.len(), other.len());
        ActiveMask(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(&a, &b)| a || b)
                .collect(),
        )
    }

    /// Catalogue positions of the live operands, ascending.
    pub fn active_positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }
}

impl std::fmt::Display for ActiveMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &bit in &self.0 {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Canonical identity of an active mask.
///
/// Built from the operand identities at live positions, in ascending
/// catalogue order, duplicates preserved. Two masks selecting the same
/// offset sequence share one cache entry no matter which recursive call
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubsetKey(Vec<ReadOperand>);

impl SubsetKey {
    pub fn of(catalogue: &Catalogue, mask: &ActiveMask) -> Self {
        debug_assert_eq!(catalogue.len(), mask.len());
        Self(
            mask.active_positions()
                .into_iter()
                .map(|i| catalogue.rattrs[i])
                .collect(),
        )
    }

    pub fn operands(&self) -> &[ReadOperand] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_with_equal_identities_share_a_key() {
        let cat = Catalogue::new(vec![ReadOperand(5), ReadOperand(5), ReadOperand(7)], vec![]);
        let m1 = ActiveMask::of_positions(3, &[0, 2]);
        let m2 = ActiveMask::of_positions(3, &[1, 2]);
        assert_ne!(m1, m2);
        assert_eq!(SubsetKey::of(&cat, &m1), SubsetKey::of(&cat, &m2));
    }

    #[test]
    fn duplicate_identities_are_preserved() {
        let cat = Catalogue::new(vec![ReadOperand(5), ReadOperand(5)], vec![]);
        let key = SubsetKey::of(&cat, &ActiveMask::full(2));
        assert_eq!(key.operands(), &[ReadOperand(5), ReadOperand(5)]);
    }

    #[test]
    fn renders_as_a_bitstring() {
        let mask = ActiveMask::of_positions(4, &[0, 3]);
        assert_eq!(mask.to_string(), "1001");
    }
}
