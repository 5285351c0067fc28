//! Bitmap id set.

use crate::error::Result;
use crate::idset::{narrow_id, IdTracker};

const WORD_BITS: usize = 64;

/// Id set backed by two bitmaps, one for non-negative ids and one for
/// negative ids.
///
/// Bit `i` of the negative bitmap stands for id `-(i + 1)`. Memory grows with
/// the magnitude of the largest id, not the number of ids.
#[derive(Debug, Clone, Default)]
pub struct DenseIdSet {
    positive: Vec<u64>,
    negative: Vec<u64>,
    len: u64,
}

impl DenseIdSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set with room for ids `0..bits` without growing.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            positive: Vec::with_capacity(bits.div_ceil(WORD_BITS)),
            negative: Vec::new(),
            len: 0,
        }
    }

    fn slot(id: i32) -> (bool, usize) {
        if id >= 0 {
            (false, id as usize)
        } else {
            (true, (-(id as i64) - 1) as usize)
        }
    }
}

impl IdTracker for DenseIdSet {
    fn insert(&mut self, id: i64) -> Result<()> {
        let (negative, bit) = Self::slot(narrow_id(id)?);
        let words = if negative { &mut self.negative } else { &mut self.positive };

        let word = bit / WORD_BITS;
        if word >= words.len() {
            words.resize(word + 1, 0);
        }
        let mask = 1u64 << (bit % WORD_BITS);
        if words[word] & mask == 0 {
            words[word] |= mask;
            self.len += 1;
        }
        Ok(())
    }

    fn contains(&mut self, id: i64) -> bool {
        let Ok(id) = narrow_id(id) else {
            return false;
        };
        let (negative, bit) = Self::slot(id);
        let words = if negative { &self.negative } else { &self.positive };

        words
            .get(bit / WORD_BITS)
            .is_some_and(|word| word & (1u64 << (bit % WORD_BITS)) != 0)
    }

    fn iter(&mut self) -> Box<dyn Iterator<Item = i64> + '_> {
        // Negative ids ascend as their bit index descends.
        let negative = set_bits(&self.negative).rev().map(|bit| -(bit as i64) - 1);
        let positive = set_bits(&self.positive).map(|bit| bit as i64);
        Box::new(negative.chain(positive))
    }

    fn len(&mut self) -> u64 {
        self.len
    }

    fn release(&mut self) {
        self.positive = Vec::new();
        self.negative = Vec::new();
        self.len = 0;
    }
}

/// Indices of the set bits in `words`, in either direction.
fn set_bits(words: &[u64]) -> impl DoubleEndedIterator<Item = usize> + '_ {
    words
        .iter()
        .enumerate()
        .flat_map(|(index, &word)| WordBits(word).map(move |bit| index * WORD_BITS + bit))
}

struct WordBits(u64);

impl Iterator for WordBits {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

impl DoubleEndedIterator for WordBits {
    fn next_back(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = WORD_BITS - 1 - self.0.leading_zeros() as usize;
        self.0 &= !(1u64 << bit);
        Some(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_insert_and_contains() {
        let mut set = DenseIdSet::new();
        for id in [0, 63, 64, 1000, -1, -64, -65] {
            set.insert(id).unwrap();
        }

        for id in [0, 63, 64, 1000, -1, -64, -65] {
            assert!(set.contains(id), "missing {}", id);
        }
        for id in [1, 62, 65, 999, 1001, -2, -63, -66, 1 << 40] {
            assert!(!set.contains(id), "unexpected {}", id);
        }
    }

    #[test]
    fn test_iter_is_ascending_and_distinct() {
        let mut set = DenseIdSet::new();
        for id in [5, -3, 200, 5, -130, 0, -1] {
            set.insert(id).unwrap();
        }

        assert_eq!(set.iter().collect::<Vec<_>>(), vec![-130, -3, -1, 0, 5, 200]);
        assert_eq!(set.len(), 6);
        // A second pass starts from the beginning.
        assert_eq!(set.iter().count(), 6);
    }

    #[test]
    fn test_i32_bounds() {
        let mut set = DenseIdSet::new();
        set.insert(-100_000).unwrap();
        assert!(set.contains(-100_000));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![-100_000]);

        assert!(matches!(set.insert(i32::MAX as i64 + 1), Err(Error::IdOutOfRange(_))));
        assert!(matches!(set.insert(i32::MIN as i64 - 1), Err(Error::IdOutOfRange(_))));
        assert!(!set.contains(i64::MAX));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_word_bits_both_directions() {
        let bits = WordBits(0b1010_0001);
        assert_eq!(bits.collect::<Vec<_>>(), vec![0, 5, 7]);
        let bits = WordBits(0b1010_0001 | 1 << 63);
        assert_eq!(bits.rev().collect::<Vec<_>>(), vec![63, 7, 5, 0]);
    }
}
