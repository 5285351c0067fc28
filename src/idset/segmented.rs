//! Segmented id set.
//!
//! The id space is cut into segments of [`SEGMENT_SIZE`] consecutive ids.
//! Only segments holding at least one id exist. Each starts as a short list
//! of local offsets and switches to a bitmap once the list would take more
//! memory than the bitmap:
//!
//! ```text
//! bitmap: SEGMENT_SIZE bits = 1024 bits
//! list:   32 bits per entry
//! switch: entries > 1024 / 32 = 32
//! ```
//!
//! Segments never switch back.

use crate::error::Result;
use crate::idset::{DenseIdSet, IdTracker, SparseIdSet};

/// Number of consecutive ids covered by one segment
pub const SEGMENT_SIZE: i64 = 1024;

/// Entry count above which a segment switches to a bitmap
const DENSE_THRESHOLD: usize = (SEGMENT_SIZE / 32) as usize;

/// Below this many segments the lookup scans instead of halving.
const LINEAR_SEARCH_THRESHOLD: usize = 8;

#[derive(Debug)]
enum SegmentIds {
    Sparse(SparseIdSet),
    Dense(DenseIdSet),
}

#[derive(Debug)]
struct Segment {
    base: i64,
    ids: SegmentIds,
}

impl Segment {
    fn new(base: i64) -> Self {
        Self { base, ids: SegmentIds::Sparse(SparseIdSet::new()) }
    }

    fn insert(&mut self, offset: i64) -> Result<()> {
        match &mut self.ids {
            SegmentIds::Dense(dense) => dense.insert(offset),
            SegmentIds::Sparse(sparse) => {
                sparse.insert(offset)?;
                if sparse.entries() > DENSE_THRESHOLD && sparse.len() as usize > DENSE_THRESHOLD {
                    let mut dense = DenseIdSet::with_capacity(SEGMENT_SIZE as usize);
                    dense.insert_all(sparse)?;
                    self.ids = SegmentIds::Dense(dense);
                }
                Ok(())
            }
        }
    }

    fn contains(&mut self, offset: i64) -> bool {
        match &mut self.ids {
            SegmentIds::Dense(dense) => dense.contains(offset),
            SegmentIds::Sparse(sparse) => sparse.contains(offset),
        }
    }

    fn iter(&mut self) -> Box<dyn Iterator<Item = i64> + '_> {
        let base = self.base;
        let offsets = match &mut self.ids {
            SegmentIds::Dense(dense) => dense.iter(),
            SegmentIds::Sparse(sparse) => sparse.iter(),
        };
        Box::new(offsets.map(move |offset| base + offset))
    }

    fn len(&mut self) -> u64 {
        match &mut self.ids {
            SegmentIds::Dense(dense) => dense.len(),
            SegmentIds::Sparse(sparse) => sparse.len(),
        }
    }

    fn is_dense(&self) -> bool {
        matches!(self.ids, SegmentIds::Dense(_))
    }
}

/// Id set covering the full `i64` range with memory proportional to the
/// number of occupied segments.
///
/// Usage:
/// ```
/// use planetcore::idset::{IdTracker, SegmentedIdSet};
///
/// let mut set = SegmentedIdSet::new();
/// set.insert(-5).unwrap();
/// set.insert(1 << 40).unwrap();
/// assert!(set.contains(1 << 40));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![-5, 1 << 40]);
/// ```
#[derive(Debug, Default)]
pub struct SegmentedIdSet {
    /// Ordered by ascending base, no two with the same base
    segments: Vec<Segment>,
}

impl SegmentedIdSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments stored as bitmaps
    pub fn dense_segment_count(&self) -> usize {
        self.segments.iter().filter(|segment| segment.is_dense()).count()
    }

    /// Split an id into its segment base and its offset within the segment.
    fn split(id: i64) -> (i64, i64) {
        (id.div_euclid(SEGMENT_SIZE) * SEGMENT_SIZE, id.rem_euclid(SEGMENT_SIZE))
    }

    /// Locate the segment with `base`: `Ok(position)` if it exists, otherwise
    /// `Err(position)` where it would have to be inserted.
    fn find_segment(&self, base: i64) -> std::result::Result<usize, usize> {
        let mut low = 0;
        let mut high = self.segments.len();
        while high - low > LINEAR_SEARCH_THRESHOLD {
            let mid = low + (high - low) / 2;
            if self.segments[mid].base <= base {
                low = mid;
            } else {
                high = mid;
            }
        }

        for position in low..high {
            let candidate = self.segments[position].base;
            if candidate == base {
                return Ok(position);
            }
            if candidate > base {
                return Err(position);
            }
        }
        Err(high)
    }
}

impl IdTracker for SegmentedIdSet {
    fn insert(&mut self, id: i64) -> Result<()> {
        let (base, offset) = Self::split(id);
        let position = match self.find_segment(base) {
            Ok(position) => position,
            Err(position) => {
                self.segments.insert(position, Segment::new(base));
                position
            }
        };
        self.segments[position].insert(offset)
    }

    fn contains(&mut self, id: i64) -> bool {
        let (base, offset) = Self::split(id);
        match self.find_segment(base) {
            Ok(position) => self.segments[position].contains(offset),
            Err(_) => false,
        }
    }

    fn iter(&mut self) -> Box<dyn Iterator<Item = i64> + '_> {
        Box::new(self.segments.iter_mut().flat_map(|segment| segment.iter()))
    }

    fn len(&mut self) -> u64 {
        self.segments.iter_mut().map(|segment| segment.len()).sum()
    }

    fn release(&mut self) {
        if !self.segments.is_empty() {
            log::debug!(
                "Releasing id set with {} segments ({} dense)",
                self.segments.len(),
                self.dense_segment_count()
            );
        }
        self.segments = Vec::new();
    }
}
