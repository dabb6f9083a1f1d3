//! DEM source and sink adapters
//!
//! The drivers read strips and write filled strips through these two narrow
//! traits; everything geospatial (formats, tags, projections) stays behind
//! them. `GeoTiffSource`/`GeoTiffSink` are the file-backed implementations
//! used by the CLI; `InMemorySource` backs the integration tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array2;
use stripflood_core::io::{read_geotiff, write_geotiff};
use stripflood_core::{Error, GeoTransform, Raster, Result};

/// Read access to the input DEM, shared by all workers.
pub trait DemSource: Send + Sync {
    /// Dimensions as (rows, cols)
    fn dims(&self) -> (usize, usize);

    /// Nodata sentinel (NaN when the source does not declare one)
    fn nodata(&self) -> f32;

    /// Affine geotransform of the full DEM
    fn geotransform(&self) -> GeoTransform;

    /// Projection as WKT, if known
    fn projection(&self) -> Option<String>;

    /// Read rows [r0, r1) into a dense buffer
    fn read_rows(&self, r0: usize, r1: usize) -> Result<Array2<f32>>;
}

/// Write access for filled strips.
pub trait DemSink: Send + Sync {
    /// Write one filled strip. `first_row` is the strip's first row in the
    /// full DEM, used to shift the output georeferencing.
    fn write_strip(&self, strip_index: usize, first_row: usize, elev: &Array2<f32>) -> Result<()>;
}

/// A GeoTIFF DEM loaded once and sliced per worker.
pub struct GeoTiffSource {
    raster: Raster<f32>,
}

impl GeoTiffSource {
    /// Open and validate the input raster.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raster: Raster<f32> = read_geotiff(path.as_ref())?;
        let (rows, cols) = raster.shape();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Ok(Self { raster })
    }
}

impl DemSource for GeoTiffSource {
    fn dims(&self) -> (usize, usize) {
        self.raster.shape()
    }

    fn nodata(&self) -> f32 {
        self.raster.nodata().unwrap_or(f32::NAN)
    }

    fn geotransform(&self) -> GeoTransform {
        *self.raster.transform()
    }

    fn projection(&self) -> Option<String> {
        self.raster.projection().map(str::to_owned)
    }

    fn read_rows(&self, r0: usize, r1: usize) -> Result<Array2<f32>> {
        let (rows, cols) = self.raster.shape();
        if r0 >= r1 || r1 > rows {
            return Err(Error::IndexOutOfBounds {
                row: r1,
                col: 0,
                rows,
                cols,
            });
        }
        Ok(self
            .raster
            .data()
            .slice(ndarray::s![r0..r1, ..])
            .to_owned())
    }
}

/// Per-strip GeoTIFF outputs written beside the input.
///
/// Strip `i` goes to `<stem>_fill_<i>.tif`, carrying the input's projection
/// and a geotransform whose origin is shifted down to the strip's first
/// row. Each file is written under a temporary name and renamed once
/// complete, so an aborted run never leaves output claiming success.
pub struct GeoTiffSink {
    paths: Vec<PathBuf>,
    transform: GeoTransform,
    projection: Option<String>,
    nodata: f32,
}

impl GeoTiffSink {
    /// Plan one output file per strip next to the input path.
    pub fn beside(input: &Path, source: &dyn DemSource, num_strips: usize) -> Result<Self> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Other(format!("bad input path: {}", input.display())))?;
        let dir = input.parent().unwrap_or_else(|| Path::new("."));

        let paths = (0..num_strips)
            .map(|i| dir.join(format!("{}_fill_{}.tif", stem, i)))
            .collect();

        Ok(Self {
            paths,
            transform: source.geotransform(),
            projection: source.projection(),
            nodata: source.nodata(),
        })
    }

    /// The planned output paths, in strip order
    pub fn output_paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl DemSink for GeoTiffSink {
    fn write_strip(&self, strip_index: usize, first_row: usize, elev: &Array2<f32>) -> Result<()> {
        let path = self.paths.get(strip_index).ok_or_else(|| {
            Error::Protocol(format!("no output planned for strip {}", strip_index))
        })?;

        let mut raster = Raster::from_array(elev.clone());
        raster.set_transform(self.transform.shift_rows(first_row));
        raster.set_projection(self.projection.clone());
        if self.nodata.is_nan() {
            raster.set_nodata(None);
        } else {
            raster.set_nodata(Some(self.nodata));
        }

        let tmp = path.with_extension("tif.tmp");
        write_geotiff(&raster, &tmp)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// An in-memory DEM, for tests and library callers that already hold the
/// grid.
pub struct InMemorySource {
    elev: Array2<f32>,
    nodata: f32,
    transform: GeoTransform,
}

impl InMemorySource {
    pub fn new(elev: Array2<f32>, nodata: f32) -> Self {
        Self {
            elev,
            nodata,
            transform: GeoTransform::default(),
        }
    }
}

impl DemSource for InMemorySource {
    fn dims(&self) -> (usize, usize) {
        self.elev.dim()
    }

    fn nodata(&self) -> f32 {
        self.nodata
    }

    fn geotransform(&self) -> GeoTransform {
        self.transform
    }

    fn projection(&self) -> Option<String> {
        None
    }

    fn read_rows(&self, r0: usize, r1: usize) -> Result<Array2<f32>> {
        let (rows, cols) = self.elev.dim();
        if r0 >= r1 || r1 > rows {
            return Err(Error::IndexOutOfBounds {
                row: r1,
                col: 0,
                rows,
                cols,
            });
        }
        Ok(self.elev.slice(ndarray::s![r0..r1, ..]).to_owned())
    }
}

/// Sink that collects strips in memory. Used by tests to reassemble the
/// filled DEM without touching the filesystem.
#[derive(Default)]
pub struct CollectSink {
    strips: Mutex<Vec<(usize, usize, Array2<f32>)>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reassemble the collected strips into one grid, in row order.
    pub fn assemble(&self) -> Option<Array2<f32>> {
        let mut strips = self.strips.lock().unwrap().clone();
        strips.sort_by_key(|&(index, _, _)| index);

        let cols = strips.first()?.2.ncols();
        let rows: usize = strips.iter().map(|(_, _, s)| s.nrows()).sum();
        let mut out = Array2::zeros((rows, cols));
        let mut r = 0;
        for (_, _, strip) in &strips {
            out.slice_mut(ndarray::s![r..r + strip.nrows(), ..])
                .assign(strip);
            r += strip.nrows();
        }
        Some(out)
    }
}

impl DemSink for CollectSink {
    fn write_strip(&self, strip_index: usize, first_row: usize, elev: &Array2<f32>) -> Result<()> {
        self.strips
            .lock()
            .map_err(|_| Error::Other("collect sink poisoned".into()))?
            .push((strip_index, first_row, elev.clone()));
        Ok(())
    }
}
