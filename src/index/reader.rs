//! Fixed-width index reader.
//!
//! Lookups binary-search the file directly. The search runs over the virtual
//! range `(-1, P - 1]` where `P` is the smallest power of two greater than the
//! element count, so every search takes exactly `log2(P)` steps and step `d`
//! of one search can be compared with step `d` of the previous one. The key
//! read at each step is cached per depth; consecutive lookups of nearby keys
//! share a path prefix and skip the disk reads for it.

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::index::element::{decode_element, IndexElement};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bytes read from the start of the file to measure the first element.
const PROBE_SIZE: u64 = 64 * 1024;

/// Key read at one search depth
#[derive(Debug)]
struct ComparisonEntry<K> {
    index: i64,
    key: K,
}

/// Random-access reader over a file written by
/// [`IndexWriter`](crate::index::IndexWriter).
///
/// A reader is not meant to be shared; each thread that needs lookups opens
/// its own reader over the same file.
///
/// Usage:
/// ```no_run
/// use planetcore::codec::BincodeCodec;
/// use planetcore::index::{IdOffsetElement, IndexReader};
/// use std::sync::Arc;
///
/// let codec = Arc::new(BincodeCodec::<IdOffsetElement>::new());
/// let mut reader = IndexReader::open("nodes.idx", codec).unwrap();
/// match reader.get(&20) {
///     Ok(element) => println!("node 20 at offset {}", element.offset),
///     Err(e) if e.is_not_found() => println!("node 20 missing"),
///     Err(e) => panic!("{}", e),
/// }
/// reader.release();
/// ```
pub struct IndexReader<T: IndexElement> {
    path: PathBuf,
    file: Option<BufReader<File>>,
    position: u64,
    codec: Arc<dyn Codec<T>>,
    element_size: usize,
    element_count: u64,
    search_span: i64,
    cache: Vec<Option<ComparisonEntry<T::Key>>>,
    slot: Vec<u8>,
}

impl<T: IndexElement> IndexReader<T> {
    /// Open an index file. Element width is taken from the encoded size of
    /// the first element.
    pub fn open<P: AsRef<Path>>(path: P, codec: Arc<dyn Codec<T>>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        let mut element_size = 0;
        let mut element_count = 0;
        if file_size > 0 {
            let mut probe = vec![0u8; file_size.min(PROBE_SIZE) as usize];
            file.read_exact(&mut probe)?;
            let mut input = probe.as_slice();
            codec.decode(&mut input)?;
            element_size = probe.len() - input.len();

            if element_size == 0 {
                return Err(Error::corruption("Index element decoded from zero bytes"));
            }
            if file_size % element_size as u64 != 0 {
                return Err(Error::corruption(format!(
                    "Index size {} is not a multiple of element size {}",
                    file_size, element_size
                )));
            }
            element_count = file_size / element_size as u64;
        }

        let mut search_span: i64 = 1;
        while search_span as u64 <= element_count {
            search_span *= 2;
        }
        let depth = search_span.trailing_zeros() as usize;

        log::debug!(
            "Opened index {} with {} elements of {} bytes",
            path.display(),
            element_count,
            element_size
        );

        Ok(Self {
            path,
            file: Some(BufReader::new(file)),
            position: file_size.min(PROBE_SIZE),
            codec,
            element_size,
            element_count,
            search_span,
            cache: (0..depth).map(|_| None).collect(),
            slot: vec![0u8; element_size],
        })
    }

    /// Number of elements in the index
    pub fn len(&self) -> u64 {
        self.element_count
    }

    /// Check if the index holds no elements
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Width in bytes of every element
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Path of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the first element with `key`, returning `None` if there is none.
    pub fn find(&mut self, key: &T::Key) -> Result<Option<T>> {
        self.check_open()?;
        let index = self.key_index(key)?;
        if index >= self.element_count {
            return Ok(None);
        }

        let element = self.read_element(index)?;
        if element.key() == *key {
            Ok(Some(element))
        } else {
            Ok(None)
        }
    }

    /// Look up the first element with `key`.
    ///
    /// A missing key is reported as [`Error::NotFound`].
    pub fn get(&mut self, key: &T::Key) -> Result<T> {
        self.find(key)?.ok_or_else(|| {
            Error::not_found(format!("Key {:?} not found in {}", key, self.path.display()))
        })
    }

    /// Iterate over all elements with `begin <= key <= end` in key order.
    pub fn get_range(&mut self, begin: &T::Key, end: &T::Key) -> Result<RangeIter<'_, T>> {
        self.check_open()?;
        let next = if begin > end { self.element_count } else { self.key_index(begin)? };

        Ok(RangeIter { reader: self, next, end: end.clone(), done: false })
    }

    /// Close the backing file. Safe to call more than once.
    pub fn release(&mut self) {
        self.file = None;
        for entry in self.cache.iter_mut() {
            *entry = None;
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.file.is_none() {
            return Err(Error::invalid_state("Index reader has been released"));
        }
        Ok(())
    }

    /// Index of the first element whose key is `>= key`, or the element
    /// count if there is none.
    fn key_index(&mut self, key: &T::Key) -> Result<u64> {
        let mut begin: i64 = -1;
        let mut end: i64 = self.search_span - 1;
        let mut depth = 0;

        while begin + 1 < end {
            let mid = begin + (end - begin) / 2;

            if (mid as u64) < self.element_count {
                let cached = match &self.cache[depth] {
                    Some(entry) if entry.index == mid => Some(entry.key.clone()),
                    _ => None,
                };
                let mid_key = match cached {
                    Some(key) => key,
                    None => {
                        let key = self.read_element(mid as u64)?.key();
                        self.cache[depth] = Some(ComparisonEntry { index: mid, key: key.clone() });
                        key
                    }
                };

                if *key <= mid_key {
                    end = mid;
                } else {
                    begin = mid;
                }
            } else {
                end = mid;
            }
            depth += 1;
        }

        Ok(end as u64)
    }

    /// Read the element stored at `index`.
    fn read_element(&mut self, index: u64) -> Result<T> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Index reader has been released"))?;

        let offset = index * self.element_size as u64;
        if self.position != offset {
            file.seek(SeekFrom::Start(offset))?;
        }
        // Unknown until the read succeeds
        self.position = u64::MAX;
        file.read_exact(&mut self.slot)?;
        self.position = offset + self.element_size as u64;

        decode_element(&*self.codec, &self.slot)
    }
}

/// Ascending sequence of the elements in a key range.
pub struct RangeIter<'a, T: IndexElement> {
    reader: &'a mut IndexReader<T>,
    next: u64,
    end: T::Key,
    done: bool,
}

impl<T: IndexElement> Iterator for RangeIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next >= self.reader.element_count {
            return None;
        }

        match self.reader.read_element(self.next) {
            Ok(element) if element.key() > self.end => {
                self.done = true;
                None
            }
            Ok(element) => {
                self.next += 1;
                Some(Ok(element))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
