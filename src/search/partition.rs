// src/search/partition.rs

//! Set-partition enumeration for the subset engine.
//!
//! Partitions are generated from restricted growth strings: position `i` of
//! the string names the block element `i` belongs to, and a string is valid
//! when `a[0] == 0` and `a[i] <= max(a[0..i]) + 1`. Lexicographic
//! enumeration of the strings visits every partition of the element set
//! exactly once, with the block containing the smallest element always
//! first. The single-block partition is skipped; the engine only splits.

/// Exploration order for the exhaustive engine.
///
/// Both orders enumerate the same partitions; only the sequence differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Coarsest first: fewer blocks before more blocks.
    #[default]
    TopDown,
    /// Finest first: more blocks before fewer blocks.
    BottomUp,
}

/// Lexicographic restricted-growth-string enumerator.
struct RgsIter {
    a: Vec<usize>,
    started: bool,
    done: bool,
}

impl RgsIter {
    fn new(n: usize) -> Self {
        Self {
            a: vec![0; n],
            started: false,
            done: false,
        }
    }
}

impl Iterator for RgsIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.a.clone());
        }
        let n = self.a.len();
        let mut i = n;
        while i > 1 {
            i -= 1;
            let prefix_max = self.a[..i].iter().copied().max().unwrap_or(0);
            if self.a[i] <= prefix_max {
                self.a[i] += 1;
                for j in i + 1..n {
                    self.a[j] = 0;
                }
                return Some(self.a.clone());
            }
        }
        self.done = true;
        None
    }
}

fn block_count(rgs: &[usize]) -> usize {
    rgs.iter().copied().max().map_or(0, |m| m + 1)
}

/// Enumerates the partitions of `elements` into two or more blocks.
///
/// Yields blocks of the original elements, first-occurrence ordered, so the
/// first block always contains the smallest element.
pub struct PartitionIter {
    elements: Vec<usize>,
    block_counts: Vec<usize>,
    next_count: usize,
    rgs: Option<RgsIter>,
    current_count: usize,
}

impl PartitionIter {
    pub fn new(elements: Vec<usize>, orientation: Orientation) -> Self {
        let n = elements.len();
        let block_counts: Vec<usize> = match orientation {
            Orientation::TopDown => (2..=n).collect(),
            Orientation::BottomUp => (2..=n).rev().collect(),
        };
        Self {
            elements,
            block_counts,
            next_count: 0,
            rgs: None,
            current_count: 0,
        }
    }
}

impl Iterator for PartitionIter {
    type Item = Vec<Vec<usize>>;

    fn next(&mut self) -> Option<Vec<Vec<usize>>> {
        loop {
            while let Some(string) = self.rgs.as_mut().and_then(Iterator::next) {
                if block_count(&string) != self.current_count {
                    continue;
                }
                let mut blocks = vec![Vec::new(); self.current_count];
                for (pos, &block) in string.iter().enumerate() {
                    blocks[block].push(self.elements[pos]);
                }
                return Some(blocks);
            }
            // Current scan exhausted; start the next block count.
            let &count = self.block_counts.get(self.next_count)?;
            self.next_count += 1;
            self.current_count = count;
            self.rgs = Some(RgsIter::new(self.elements.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_partitions(n: usize, orientation: Orientation) -> Vec<Vec<Vec<usize>>> {
        PartitionIter::new((0..n).collect(), orientation).collect()
    }

    #[test]
    fn counts_match_bell_numbers_minus_the_trivial_partition() {
        // Bell(n) - 1: the single-block partition is never yielded.
        assert_eq!(all_partitions(2, Orientation::TopDown).len(), 1);
        assert_eq!(all_partitions(3, Orientation::TopDown).len(), 4);
        assert_eq!(all_partitions(4, Orientation::TopDown).len(), 14);
        assert_eq!(all_partitions(5, Orientation::BottomUp).len(), 51);
    }

    #[test]
    fn first_block_contains_the_smallest_element() {
        for blocks in all_partitions(4, Orientation::TopDown) {
            assert!(blocks[0].contains(&0));
            for block in &blocks {
                assert!(!block.is_empty());
            }
        }
    }

    #[test]
    fn orientations_enumerate_the_same_set() {
        let mut top: Vec<_> = all_partitions(4, Orientation::TopDown);
        let mut bottom: Vec<_> = all_partitions(4, Orientation::BottomUp);
        top.sort();
        bottom.sort();
        assert_eq!(top, bottom);
    }

    #[test]
    fn orientation_orders_by_block_count() {
        let top = all_partitions(3, Orientation::TopDown);
        assert_eq!(top[0].len(), 2);
        assert_eq!(top.last().unwrap().len(), 3);

        let bottom = all_partitions(3, Orientation::BottomUp);
        assert_eq!(bottom[0].len(), 3);
        assert_eq!(bottom.last().unwrap().len(), 2);
    }

    #[test]
    fn partitions_cover_the_elements_exactly() {
        for blocks in all_partitions(4, Orientation::TopDown) {
            let mut seen: Vec<usize> = blocks.concat();
            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1, 2, 3]);
        }
    }
}
