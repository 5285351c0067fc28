//! Configuration options for planetcore components.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Default number of records buffered in memory before a chunk is spilled.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;

/// Default number of sources merged together at one level of the merge tree.
pub const DEFAULT_FAN_OUT: usize = 2;

/// Default number of merge levels between two drains to a temporary file.
pub const DEFAULT_PERSISTENCE_INTERVAL: usize = 8;

/// Configuration options for an external sort.
#[derive(Debug, Clone)]
pub struct SortOptions {
    /// Number of records held in memory before they are sorted and written
    /// out as one chunk.
    /// Default: 16384
    pub buffer_capacity: usize,

    /// Maximum number of sources merged together at one merge level.
    /// Default: 2
    pub fan_out: usize,

    /// Merge results are drained to a temporary file every this many levels,
    /// capping open file handles at `fan_out ^ persistence_interval`.
    /// Default: 8
    pub persistence_interval: usize,

    /// Compression applied to spilled chunks and persisted merge levels.
    /// Default: CompressionType::Snappy
    pub compression: CompressionType,

    /// Directory for temporary files. `None` uses the OS temp directory.
    /// Default: None
    pub temp_dir: Option<PathBuf>,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            fan_out: DEFAULT_FAN_OUT,
            persistence_interval: DEFAULT_PERSISTENCE_INTERVAL,
            compression: CompressionType::default(),
            temp_dir: None,
        }
    }
}

impl SortOptions {
    /// Creates a new SortOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the in-memory buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Sets the merge fan-out.
    pub fn fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Sets the persistence interval.
    pub fn persistence_interval(mut self, interval: usize) -> Self {
        self.persistence_interval = interval;
        self
    }

    /// Sets the compression algorithm for temporary files.
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the directory for temporary files.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::invalid_argument("buffer_capacity must be > 0"));
        }
        if self.fan_out < 2 {
            return Err(Error::invalid_argument("fan_out must be >= 2"));
        }
        if self.persistence_interval == 0 {
            return Err(Error::invalid_argument("persistence_interval must be > 0"));
        }
        Ok(())
    }

    /// Creates a fresh directory for the temporary files of one component.
    pub(crate) fn create_temp_dir(&self) -> crate::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("planetcore-");
        let dir = match &self.temp_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

/// Compression algorithms for temporary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy frame compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy = 1,
}

impl CompressionType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            #[cfg(feature = "snappy")]
            1 => Some(CompressionType::Snappy),
            _ => None,
        }
    }
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(not(feature = "snappy"))]
        CompressionType::None
    }
}

/// Id tracker realizations selectable by the owning pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdTrackerType {
    /// Bitmap, best when ids are densely packed.
    Dense,
    /// Sorted list, best when ids are few and scattered.
    Sparse,
    /// 1024-id segments, each dense or sparse as fits.
    #[default]
    Segmented,
}

impl FromStr for IdTrackerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" | "bitset" => Ok(IdTrackerType::Dense),
            "sparse" | "idlist" => Ok(IdTrackerType::Sparse),
            "segmented" | "dynamic" => Ok(IdTrackerType::Segmented),
            other => Err(Error::invalid_argument(format!("unknown id tracker type: {}", other))),
        }
    }
}
