//! Records addressable by id.
//!
//! Variable-length records are appended to a data file. An
//! [`IdOffsetElement`] index beside it maps each id to the offset of its
//! record, so a record can be fetched with one index lookup and one read.

use crate::codec::Codec;
use crate::config::SortOptions;
use crate::error::{Error, Result};
use crate::index::element::IdOffsetElement;
use crate::index::reader::IndexReader;
use crate::index::writer::IndexWriter;
use crate::store::record::{encode_frame, read_frame};
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes records to a data file and indexes them by id.
pub struct IndexedRecordStoreWriter<T> {
    data_path: PathBuf,
    data: Option<BufWriter<File>>,
    offset: u64,
    codec: Arc<dyn Codec<T>>,
    payload: Vec<u8>,
    frame: Vec<u8>,
    index: IndexWriter<IdOffsetElement>,
}

impl<T> IndexedRecordStoreWriter<T> {
    /// Create the data and index files.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        data_path: P,
        index_path: Q,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Self> {
        Self::with_sort_options(data_path, index_path, codec, SortOptions::default())
    }

    /// Create the files, using `sort_options` if the index must be re-sorted.
    pub fn with_sort_options<P: AsRef<Path>, Q: AsRef<Path>>(
        data_path: P,
        index_path: Q,
        codec: Arc<dyn Codec<T>>,
        sort_options: SortOptions,
    ) -> Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        let index = IndexWriter::with_sort_options(
            index_path,
            Arc::new(crate::codec::BincodeCodec::<IdOffsetElement>::new()),
            sort_options,
        )?;
        let data = BufWriter::new(File::create(&data_path)?);

        Ok(Self {
            data_path,
            data: Some(data),
            offset: 0,
            codec,
            payload: Vec::new(),
            frame: Vec::new(),
            index,
        })
    }

    /// Append a record under `id`. Ids may arrive in any order.
    pub fn add(&mut self, id: i64, record: &T) -> Result<()> {
        let data = self
            .data
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Record store writer is closed"))?;

        self.payload.clear();
        self.codec.encode(record, &mut self.payload)?;
        self.frame.clear();
        encode_frame(&self.payload, &mut self.frame)?;
        data.write_all(&self.frame)?;

        self.index.write(&IdOffsetElement::new(id, self.offset))?;
        self.offset += self.frame.len() as u64;
        Ok(())
    }

    /// Number of records written
    pub fn len(&self) -> u64 {
        self.index.len()
    }

    /// Check if no records have been written
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Flush the data file and complete the index.
    pub fn complete(&mut self) -> Result<()> {
        if let Some(mut data) = self.data.take() {
            data.flush()?;
            data.get_ref().sync_all()?;
        }
        self.index.complete()
    }

    /// Close both files without completing. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut data) = self.data.take() {
            if let Err(e) = data.flush() {
                log::warn!("Failed to flush {}: {}", self.data_path.display(), e);
            }
        }
        self.index.release();
    }
}

/// Fetches records by id from files written by [`IndexedRecordStoreWriter`].
pub struct IndexedRecordStoreReader<T> {
    data_path: PathBuf,
    data: Option<BufReader<File>>,
    codec: Arc<dyn Codec<T>>,
    payload: Vec<u8>,
    index: IndexReader<IdOffsetElement>,
}

impl<T> IndexedRecordStoreReader<T> {
    /// Open the data and index files.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        data_path: P,
        index_path: Q,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        let index = IndexReader::open(
            index_path,
            Arc::new(crate::codec::BincodeCodec::<IdOffsetElement>::new()),
        )?;
        let data = BufReader::new(File::open(&data_path)?);

        Ok(Self { data_path, data: Some(data), codec, payload: Vec::new(), index })
    }

    /// Number of indexed records
    pub fn len(&self) -> u64 {
        self.index.len()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Fetch the record stored under `id`, returning `None` if there is none.
    pub fn find(&mut self, id: i64) -> Result<Option<T>> {
        match self.index.find(&id)? {
            Some(element) => self.read_at(element.offset).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the record stored under `id`.
    ///
    /// A missing id is reported as [`Error::NotFound`].
    pub fn get(&mut self, id: i64) -> Result<T> {
        self.find(id)?.ok_or_else(|| {
            Error::not_found(format!("Record {} not found in {}", id, self.data_path.display()))
        })
    }

    /// Close both files. Safe to call more than once.
    pub fn release(&mut self) {
        self.data = None;
        self.index.release();
    }

    fn read_at(&mut self, offset: u64) -> Result<T> {
        let data = self
            .data
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Record store reader has been released"))?;

        data.seek(SeekFrom::Start(offset))?;
        if !read_frame(data, &mut self.payload)? {
            return Err(Error::corruption(format!(
                "Offset {} is past the end of {}",
                offset,
                self.data_path.display()
            )));
        }

        let mut input = self.payload.as_slice();
        self.codec.decode(&mut input)
    }
}
