//! Side table of statically known array lengths
//!
//! Kept separate from the value table because a fixed array shape matters
//! to hardware sizing even when the element values are not constant, and
//! because sizes survive the per-pass clearing of value bindings: the
//! populated table is part of the engine's output.

use super::table::HolderName;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct ArraySizeTable {
    sizes: FxHashMap<HolderName, Option<u64>>,
}

impl ArraySizeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a statically known length for a holder. A conflicting
    /// length poisons the entry: the holder's shape is not fixed.
    /// Returns whether the table changed, since the table outlives the
    /// pass that wrote it and new knowledge must keep the fixpoint loop
    /// running.
    pub fn record(&mut self, holder: HolderName, length: u64) -> bool {
        match self.sizes.get(&holder) {
            Some(None) => false,
            Some(Some(existing)) if *existing != length => {
                self.sizes.insert(holder, None);
                true
            }
            Some(Some(_)) => false,
            None => {
                self.sizes.insert(holder, Some(length));
                true
            }
        }
    }

    /// Mark a holder's length unknown, permanently. Returns whether the
    /// table changed.
    pub fn invalidate(&mut self, holder: HolderName) -> bool {
        self.sizes.insert(holder, None) != Some(None)
    }

    pub fn get(&self, holder: &HolderName) -> Option<u64> {
        self.sizes.get(holder).copied().flatten()
    }

    pub fn is_poisoned(&self, holder: &HolderName) -> bool {
        matches!(self.sizes.get(holder), Some(None))
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Iterate over holders with a known, unpoisoned length
    pub fn iter(&self) -> impl Iterator<Item = (&HolderName, u64)> {
        self.sizes
            .iter()
            .filter_map(|(holder, size)| size.map(|s| (holder, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_length_poisons_the_entry() {
        let mut sizes = ArraySizeTable::new();
        let holder = HolderName::local("C", "m", "arr");

        sizes.record(holder.clone(), 3);
        assert_eq!(sizes.get(&holder), Some(3));

        sizes.record(holder.clone(), 4);
        assert_eq!(sizes.get(&holder), None);
        assert!(sizes.is_poisoned(&holder));

        // Poisoned entries stay poisoned
        sizes.record(holder.clone(), 3);
        assert_eq!(sizes.get(&holder), None);
    }

    #[test]
    fn agreeing_length_is_kept() {
        let mut sizes = ArraySizeTable::new();
        let holder = HolderName::local("C", "m", "arr");

        sizes.record(holder.clone(), 3);
        sizes.record(holder.clone(), 3);
        assert_eq!(sizes.get(&holder), Some(3));
    }
}
