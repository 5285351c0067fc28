//! Fixed-width index writer.

use crate::codec::Codec;
use crate::config::SortOptions;
use crate::error::{Error, Result};
use crate::index::element::{decode_element, IndexElement};
use crate::sort::ExternalSorter;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Writes elements at fixed-width offsets so element `n` starts at byte
/// `n * element_size`.
///
/// Elements may be written in any key order. If they were not ascending,
/// [`complete`](Self::complete) rewrites the file in key order using an
/// external sort.
///
/// Usage:
/// ```no_run
/// use planetcore::codec::BincodeCodec;
/// use planetcore::index::{IdOffsetElement, IndexWriter};
/// use std::sync::Arc;
///
/// let codec = Arc::new(BincodeCodec::<IdOffsetElement>::new());
/// let mut writer = IndexWriter::create("nodes.idx", codec).unwrap();
/// writer.write(&IdOffsetElement::new(20, 512)).unwrap();
/// writer.write(&IdOffsetElement::new(10, 0)).unwrap();
/// writer.complete().unwrap();
/// ```
pub struct IndexWriter<T: IndexElement> {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    codec: Arc<dyn Codec<T>>,
    sort_options: SortOptions,
    buf: Vec<u8>,
    element_count: u64,
    element_size: Option<usize>,
    last_key: Option<T::Key>,
    ordered: bool,
    completed: bool,
}

impl<T: IndexElement> IndexWriter<T> {
    /// Create (or truncate) the index file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, codec: Arc<dyn Codec<T>>) -> Result<Self> {
        Self::with_sort_options(path, codec, SortOptions::default())
    }

    /// Create an index whose re-sort, if needed, uses `sort_options`.
    pub fn with_sort_options<P: AsRef<Path>>(
        path: P,
        codec: Arc<dyn Codec<T>>,
        sort_options: SortOptions,
    ) -> Result<Self> {
        sort_options.validate()?;
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            codec,
            sort_options,
            buf: Vec::new(),
            element_count: 0,
            element_size: None,
            last_key: None,
            ordered: true,
            completed: false,
        })
    }

    /// Append an element.
    ///
    /// Fails with [`Error::InconsistentElementSize`] if the element's encoded
    /// width differs from the first element's.
    pub fn write(&mut self, element: &T) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Index writer is closed"))?;

        self.buf.clear();
        self.codec.encode(element, &mut self.buf)?;

        match self.element_size {
            None if self.buf.is_empty() => {
                return Err(Error::invalid_argument("Index elements cannot be zero bytes wide"));
            }
            None => self.element_size = Some(self.buf.len()),
            Some(expected) if expected != self.buf.len() => {
                return Err(Error::InconsistentElementSize {
                    index: self.element_count,
                    expected,
                    actual: self.buf.len(),
                });
            }
            Some(_) => {}
        }

        let key = element.key();
        if let Some(last) = &self.last_key {
            if key < *last {
                self.ordered = false;
            }
        }
        self.last_key = Some(key);

        writer.write_all(&self.buf)?;
        self.element_count += 1;
        Ok(())
    }

    /// Number of elements written
    pub fn len(&self) -> u64 {
        self.element_count
    }

    /// Check if no elements have been written
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Width in bytes of every element, known after the first write
    pub fn element_size(&self) -> Option<usize> {
        self.element_size
    }

    /// Path of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the index and, if elements arrived out of key order, rewrite
    /// it sorted by key.
    pub fn complete(&mut self) -> Result<()> {
        if self.completed {
            return Ok(());
        }
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::invalid_state("Index writer is closed"))?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        if !self.ordered {
            self.sort_contents()?;
            self.ordered = true;
        }
        self.completed = true;
        Ok(())
    }

    /// Close the file without completing. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                log::warn!("Failed to flush index {}: {}", self.path.display(), e);
            }
        }
    }

    /// Replace the file contents with the same elements in key order.
    fn sort_contents(&mut self) -> Result<()> {
        let element_size = match self.element_size {
            Some(size) => size,
            None => return Ok(()),
        };
        log::debug!(
            "Index {} was written out of order, sorting {} elements",
            self.path.display(),
            self.element_count
        );

        let mut sorter = ExternalSorter::new(
            self.sort_options.clone(),
            Arc::clone(&self.codec),
            Arc::new(|a: &T, b: &T| a.key().cmp(&b.key())),
        )?;
        let result = self.rewrite_sorted(&mut sorter, element_size);
        sorter.release();
        result
    }

    fn rewrite_sorted(&self, sorter: &mut ExternalSorter<T>, element_size: usize) -> Result<()> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut slot = vec![0u8; element_size];
        for _ in 0..self.element_count {
            reader.read_exact(&mut slot)?;
            sorter.add(decode_element(&*self.codec, &slot)?)?;
        }
        drop(reader);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let sorted = NamedTempFile::new_in(&dir)?;
        let mut writer = BufWriter::new(sorted.reopen()?);
        let mut buf = Vec::with_capacity(element_size);
        for element in sorter.iterate()? {
            buf.clear();
            self.codec.encode(&element?, &mut buf)?;
            writer.write_all(&buf)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        sorted.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl<T: IndexElement> Drop for IndexWriter<T> {
    fn drop(&mut self) {
        self.release();
    }
}
