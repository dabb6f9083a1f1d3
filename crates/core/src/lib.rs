//! # stripflood-core
//!
//! Shared raster types and I/O for the stripflood depression filler.
//!
//! This crate provides:
//! - `Raster<T>`: a georeferenced 2D grid with nodata handling
//! - `GeoTransform`: the six-coefficient affine mapping pixels to world
//! - `RasterElement`: the numeric trait bounding cell types
//! - GeoTIFF reading and writing (native `tiff`, or GDAL behind a feature)
//! - The error type used across the workspace

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
