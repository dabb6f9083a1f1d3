//! Error types for the stripflood workspace

use thiserror::Error;

/// Main error type for stripflood operations.
///
/// Input problems (missing files, bad datatypes, degenerate grids) and
/// resource problems (transport failures, dead peers) abort the run with a
/// diagnostic. `Protocol` marks an invariant violation between ranks, which
/// indicates a bug rather than bad input.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("unsupported raster datatype: {0}")]
    UnsupportedDataType(String),

    #[error("transport failure with rank {rank}: {reason}")]
    Transport { rank: usize, reason: String },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for stripflood operations
pub type Result<T> = std::result::Result<T, Error>;
