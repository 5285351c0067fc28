// Tests that every id set realization behaves like an ordered set

use planetcore::{new_id_tracker, Error, IdTracker, IdTrackerType, SegmentedIdSet};
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

const ALL_KINDS: [IdTrackerType; 3] =
    [IdTrackerType::Dense, IdTrackerType::Sparse, IdTrackerType::Segmented];

/// Ids on both sides of segment boundaries
#[test]
fn test_segment_boundaries() {
    for kind in ALL_KINDS {
        let mut tracker = new_id_tracker(kind);
        for id in [-5, 0, 1023, 1024, 2050] {
            tracker.insert(id).unwrap();
        }

        assert!(tracker.contains(2050));
        assert!(!tracker.contains(2051));
        assert_eq!(tracker.iter().collect::<Vec<_>>(), vec![-5, 0, 1023, 1024, 2050]);
    }
}

/// A dense cluster next to scattered ids, inserted in random order
#[test]
fn test_mixed_density() {
    let mut rng = rand::rng();
    let mut expected = BTreeSet::new();
    for id in 10_000..12_000 {
        expected.insert(id);
    }
    for _ in 0..500 {
        expected.insert(rng.random_range(-1_000_000..1_000_000));
    }
    let mut shuffled: Vec<i64> = expected.iter().copied().collect();
    shuffled.shuffle(&mut rng);

    for kind in ALL_KINDS {
        let mut tracker = new_id_tracker(kind);
        for &id in &shuffled {
            tracker.insert(id).unwrap();
        }
        assert_eq!(tracker.len(), expected.len() as u64, "{:?}", kind);
        assert!(tracker.iter().eq(expected.iter().copied()), "{:?}", kind);
    }
}

/// Only the segmented set accepts ids beyond 32 bits
#[test]
fn test_wide_ids() {
    let wide = 5_000_000_000i64;
    for kind in [IdTrackerType::Dense, IdTrackerType::Sparse] {
        let mut tracker = new_id_tracker(kind);
        assert!(matches!(tracker.insert(wide), Err(Error::IdOutOfRange(id)) if id == wide));
        assert!(!tracker.contains(wide));
    }

    let mut set = SegmentedIdSet::new();
    set.insert(wide).unwrap();
    set.insert(-wide).unwrap();
    assert!(set.contains(wide));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![-wide, wide]);
}

/// Merging one tracker into another yields the union
#[test]
fn test_insert_all_union() {
    let mut left = new_id_tracker(IdTrackerType::Segmented);
    let mut right = new_id_tracker(IdTrackerType::Dense);
    for id in 0..100 {
        left.insert(id * 3).unwrap();
        right.insert(id * 5).unwrap();
    }

    left.insert_all(right.as_mut()).unwrap();
    let union: BTreeSet<i64> = (0..100).map(|i| i * 3).chain((0..100).map(|i| i * 5)).collect();
    assert!(left.iter().eq(union.iter().copied()));
    assert_eq!(right.len(), 100);
}

proptest! {
    /// All realizations agree with an ordered set on any 32-bit input
    #[test]
    fn prop_trackers_match_ordered_set(
        ids in prop::collection::vec(
            prop_oneof![-3000i64..3000, any::<i32>().prop_map(i64::from)],
            0..400,
        ),
        probes in prop::collection::vec(-3500i64..3500, 0..100),
    ) {
        let expected: BTreeSet<i64> = ids.iter().copied().collect();

        for kind in [IdTrackerType::Sparse, IdTrackerType::Segmented] {
            let mut tracker = new_id_tracker(kind);
            for &id in &ids {
                tracker.insert(id).unwrap();
            }

            for &probe in probes.iter().chain(ids.iter()) {
                prop_assert_eq!(tracker.contains(probe), expected.contains(&probe));
            }
            prop_assert!(tracker.iter().eq(expected.iter().copied()));
            prop_assert_eq!(tracker.len(), expected.len() as u64);
        }
    }

    /// The bitmap set agrees with an ordered set on small ids
    #[test]
    fn prop_dense_matches_ordered_set(
        ids in prop::collection::vec(-5000i64..5000, 0..400),
        probes in prop::collection::vec(-5500i64..5500, 0..100),
    ) {
        let expected: BTreeSet<i64> = ids.iter().copied().collect();
        let mut tracker = new_id_tracker(IdTrackerType::Dense);
        for &id in &ids {
            tracker.insert(id).unwrap();
        }

        for &probe in &probes {
            prop_assert_eq!(tracker.contains(probe), expected.contains(&probe));
        }
        prop_assert!(tracker.iter().eq(expected.iter().copied()));
    }
}
