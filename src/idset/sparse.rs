//! List id set.

use crate::error::Result;
use crate::idset::{narrow_id, IdTracker};

/// Below this many candidates a linear scan beats halving.
const LINEAR_SEARCH_THRESHOLD: usize = 8;

/// Id set backed by a list of ids.
///
/// Ids are appended as they arrive. The list is sorted and deduplicated on
/// the first query after an insert that broke ascending order, so ordered
/// input never pays for a sort.
#[derive(Debug, Clone)]
pub struct SparseIdSet {
    ids: Vec<i32>,
    sorted: bool,
}

impl Default for SparseIdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseIdSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self { ids: Vec::new(), sorted: true }
    }

    /// Number of stored entries, counting duplicates not yet removed.
    pub(crate) fn entries(&self) -> usize {
        self.ids.len()
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.ids.sort_unstable();
            self.ids.dedup();
            self.sorted = true;
        }
    }
}

impl IdTracker for SparseIdSet {
    fn insert(&mut self, id: i64) -> Result<()> {
        let id = narrow_id(id)?;
        if let Some(&last) = self.ids.last() {
            if id <= last {
                self.sorted = false;
            }
        }
        self.ids.push(id);
        Ok(())
    }

    fn contains(&mut self, id: i64) -> bool {
        let Ok(id) = narrow_id(id) else {
            return false;
        };
        self.ensure_sorted();

        let mut low = 0;
        let mut high = self.ids.len();
        while high - low > LINEAR_SEARCH_THRESHOLD {
            let mid = low + (high - low) / 2;
            if self.ids[mid] <= id {
                low = mid;
            } else {
                high = mid;
            }
        }
        self.ids[low..high].contains(&id)
    }

    fn iter(&mut self) -> Box<dyn Iterator<Item = i64> + '_> {
        self.ensure_sorted();
        Box::new(self.ids.iter().map(|&id| id as i64))
    }

    fn len(&mut self) -> u64 {
        self.ensure_sorted();
        self.ids.len() as u64
    }

    fn release(&mut self) {
        self.ids = Vec::new();
        self.sorted = true;
    }
}
