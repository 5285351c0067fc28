//! Sets of entity ids.
//!
//! Filters use an [`IdTracker`] to mark the ids they need to keep. Three
//! realizations trade speed against memory:
//!
//! - [`DenseIdSet`]: a bitmap, one bit per id between the smallest and
//!   largest id. Compact only when ids are densely packed.
//! - [`SparseIdSet`]: a list of ids, sorted lazily. Compact when ids are few.
//! - [`SegmentedIdSet`]: splits the id space into 1024-id segments and keeps
//!   each segment as a list or a bitmap depending on how full it is.
//!
//! Dense and sparse sets store ids as `i32`; inserting an id outside that
//! range fails with [`Error::IdOutOfRange`]. The segmented set covers every
//! `i64`.

pub mod dense;
pub mod segmented;
pub mod sparse;

pub use dense::DenseIdSet;
pub use segmented::SegmentedIdSet;
pub use sparse::SparseIdSet;

use crate::config::IdTrackerType;
use crate::error::{Error, Result};

/// Set-of-ids abstraction shared by all realizations.
///
/// Queries take `&mut self` because realizations may reorganise themselves
/// lazily on read.
pub trait IdTracker: Send {
    /// Add an id to the set.
    fn insert(&mut self, id: i64) -> Result<()>;

    /// Check whether an id is in the set.
    fn contains(&mut self, id: i64) -> bool;

    /// Ascending sequence of all ids in the set. Each call starts over.
    fn iter(&mut self) -> Box<dyn Iterator<Item = i64> + '_>;

    /// Number of distinct ids in the set
    fn len(&mut self) -> u64;

    /// Check if the set is empty
    fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Add every id of `other` to this set.
    fn insert_all(&mut self, other: &mut dyn IdTracker) -> Result<()> {
        for id in other.iter() {
            self.insert(id)?;
        }
        Ok(())
    }

    /// Drop all ids and free their memory. Safe to call more than once.
    fn release(&mut self);
}

/// Create an empty tracker of the given kind.
pub fn new_id_tracker(kind: IdTrackerType) -> Box<dyn IdTracker> {
    match kind {
        IdTrackerType::Dense => Box::new(DenseIdSet::new()),
        IdTrackerType::Sparse => Box::new(SparseIdSet::new()),
        IdTrackerType::Segmented => Box::new(SegmentedIdSet::new()),
    }
}

/// Narrow an id to the `i32` range used by dense and sparse sets.
pub(crate) fn narrow_id(id: i64) -> Result<i32> {
    i32::try_from(id).map_err(|_| Error::IdOutOfRange(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [IdTrackerType; 3] =
        [IdTrackerType::Dense, IdTrackerType::Sparse, IdTrackerType::Segmented];

    #[test]
    fn test_realizations_agree_across_segments() {
        for kind in ALL_KINDS {
            let mut tracker = new_id_tracker(kind);
            for id in [2050, -5, 1024, 0, 1023] {
                tracker.insert(id).unwrap();
            }

            for id in [-5, 0, 1023, 1024, 2050] {
                assert!(tracker.contains(id), "{:?} lost {}", kind, id);
            }
            for id in [2051, -4, -6, 1, 1022, 1025, 2049] {
                assert!(!tracker.contains(id), "{:?} invented {}", kind, id);
            }
            assert_eq!(tracker.iter().collect::<Vec<_>>(), vec![-5, 0, 1023, 1024, 2050]);
            assert_eq!(tracker.len(), 5);
        }
    }

    #[test]
    fn test_insert_all_across_kinds() {
        let mut source = new_id_tracker(IdTrackerType::Sparse);
        for id in [7, 3, 3, -10] {
            source.insert(id).unwrap();
        }

        for kind in ALL_KINDS {
            let mut target = new_id_tracker(kind);
            target.insert(5000).unwrap();
            target.insert_all(source.as_mut()).unwrap();
            assert_eq!(target.iter().collect::<Vec<_>>(), vec![-10, 3, 7, 5000]);
        }
    }

    #[test]
    fn test_narrow_id() {
        assert_eq!(narrow_id(-1).unwrap(), -1);
        assert_eq!(narrow_id(i32::MAX as i64).unwrap(), i32::MAX);
        assert!(matches!(narrow_id(i32::MAX as i64 + 1), Err(Error::IdOutOfRange(_))));
        assert!(matches!(narrow_id(i64::MIN), Err(Error::IdOutOfRange(_))));
    }

    #[test]
    fn test_release_is_idempotent() {
        for kind in ALL_KINDS {
            let mut tracker = new_id_tracker(kind);
            tracker.insert(12).unwrap();
            tracker.release();
            tracker.release();
            assert!(tracker.is_empty());
            assert!(!tracker.contains(12));
        }
    }
}
