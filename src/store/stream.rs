//! Buffered, optionally compressed record streams over temporary files.

use crate::codec::Codec;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::store::record::{encode_frame, read_frame};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Write side of a record stream.
pub(crate) enum StreamWriter {
    Plain(BufWriter<File>),
    #[cfg(feature = "snappy")]
    Snappy(snap::write::FrameEncoder<BufWriter<File>>),
}

impl StreamWriter {
    /// Start a new stream at the current position of `writer`.
    pub(crate) fn new(writer: BufWriter<File>, compression: CompressionType) -> Self {
        match compression {
            CompressionType::None => StreamWriter::Plain(writer),
            #[cfg(feature = "snappy")]
            CompressionType::Snappy => {
                StreamWriter::Snappy(snap::write::FrameEncoder::new(writer))
            }
        }
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            StreamWriter::Plain(w) => w.write_all(data)?,
            #[cfg(feature = "snappy")]
            StreamWriter::Snappy(w) => w.write_all(data)?,
        }
        Ok(())
    }

    /// End the stream, flush everything to the file and hand back the
    /// underlying writer so another stream can follow it.
    pub(crate) fn finish(self) -> Result<BufWriter<File>> {
        let mut writer = match self {
            StreamWriter::Plain(w) => w,
            #[cfg(feature = "snappy")]
            StreamWriter::Snappy(w) => w.into_inner().map_err(|e| {
                Error::Io(std::io::Error::new(e.error().kind(), e.error().to_string()))
            })?,
        };
        writer.flush()?;
        Ok(writer)
    }
}

/// Open an independent reader over `len` bytes of `path` starting at `offset`.
pub(crate) fn open_region(
    path: &Path,
    offset: u64,
    len: u64,
    compression: CompressionType,
) -> Result<Box<dyn Read + Send>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let region = BufReader::new(file.take(len));
    Ok(match compression {
        CompressionType::None => Box::new(region),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => Box::new(snap::read::FrameDecoder::new(region)),
    })
}

/// Encodes records and writes them as frames to a stream.
pub(crate) struct RecordEncoder<T> {
    codec: Arc<dyn Codec<T>>,
    payload: Vec<u8>,
    frame: Vec<u8>,
}

impl<T> RecordEncoder<T> {
    pub(crate) fn new(codec: Arc<dyn Codec<T>>) -> Self {
        Self { codec, payload: Vec::new(), frame: Vec::new() }
    }

    pub(crate) fn write(&mut self, record: &T, writer: &mut StreamWriter) -> Result<()> {
        self.payload.clear();
        self.codec.encode(record, &mut self.payload)?;
        self.frame.clear();
        encode_frame(&self.payload, &mut self.frame)?;
        writer.write_all(&self.frame)
    }
}

/// Lazy sequence of records decoded from a framed stream.
///
/// The first error ends the sequence.
pub struct RecordIterator<T> {
    reader: Box<dyn Read + Send>,
    codec: Arc<dyn Codec<T>>,
    payload: Vec<u8>,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RecordIterator<T> {
    pub(crate) fn new(reader: Box<dyn Read + Send>, codec: Arc<dyn Codec<T>>) -> Self {
        Self { reader, codec, payload: Vec::new(), done: false, _marker: PhantomData }
    }

    fn read_next(&mut self) -> Result<Option<T>> {
        if !read_frame(&mut self.reader, &mut self.payload)? {
            return Ok(None);
        }
        let mut input = self.payload.as_slice();
        let record = self.codec.decode(&mut input)?;
        if !input.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after record",
                input.len()
            )));
        }
        Ok(Some(record))
    }
}

impl<T> Iterator for RecordIterator<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
