//! Min-priority frontier shared by the cost-weighted searches.

use std::{cmp::Ordering, collections::BinaryHeap};

use restraint_core::CellCoord;

/// Min-priority queue of cells keyed by floating point cost.
///
/// Equal priorities pop in insertion order so searches stay deterministic.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    heap: BinaryHeap<Entry>,
    sequence: u64,
}

impl Frontier {
    pub(crate) fn push(&mut self, cell: CellCoord, priority: f64) {
        self.heap.push(Entry {
            priority,
            sequence: self.sequence,
            cell,
        });
        self.sequence = self.sequence.wrapping_add(1);
    }

    pub(crate) fn pop(&mut self) -> Option<CellCoord> {
        self.heap.pop().map(|entry| entry.cell)
    }
}

#[derive(Debug)]
struct Entry {
    priority: f64,
    sequence: u64,
    cell: CellCoord,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the std max-heap yields the cheapest entry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
