//! GeoTIFF reading and writing using GDAL
//!
//! Full-fidelity path: arbitrary GDAL-readable rasters, projection strings,
//! any nodata encoding. Input bands must be Float32 (the elevation datatype
//! the filler works in); anything else is refused.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use gdal::raster::GdalType;
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// Read the first band of a GDAL raster into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let dataset = Dataset::open(path.as_ref())?;
    let band = dataset.rasterband(1)?;

    if band.band_type() as u32 != <T as GdalType>::gdal_ordinal() {
        return Err(Error::UnsupportedDataType(format!(
            "band type {:?} does not match requested element type",
            band.band_type()
        )));
    }

    let (cols, rows) = dataset.raster_size();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let buffer = band.read_as::<T>((0, 0), (cols, rows), (cols, rows), None)?;
    let mut raster = Raster::from_vec(buffer.data().to_vec(), rows, cols)?;

    if let Ok(gt) = dataset.geo_transform() {
        raster.set_transform(GeoTransform::from_gdal(gt));
    }

    if let Ok(srs) = dataset.spatial_ref() {
        if let Ok(wkt) = srs.to_wkt() {
            raster.set_projection(Some(wkt));
        }
    }

    if let Some(nodata) = band.no_data_value() {
        raster.set_nodata(num_traits::cast(nodata));
    }

    Ok(raster)
}

/// Write a Raster to a GeoTIFF file via GDAL
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement + GdalType + Copy,
    P: AsRef<Path>,
{
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (rows, cols) = raster.shape();

    let mut dataset = driver.create_with_band_type::<T, _>(path.as_ref(), cols, rows, 1)?;

    dataset.set_geo_transform(&raster.transform().to_gdal())?;
    if let Some(wkt) = raster.projection() {
        let srs = gdal::spatial_ref::SpatialRef::from_wkt(wkt)?;
        dataset.set_spatial_ref(&srs)?;
    }

    let mut band = dataset.rasterband(1)?;
    if let Some(nd) = raster.nodata() {
        if let Some(nd) = num_traits::cast::<T, f64>(nd) {
            band.set_no_data_value(Some(nd))?;
        }
    }

    let data: Vec<T> = raster.data().iter().copied().collect();
    let mut buffer = gdal::raster::Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &mut buffer)?;

    Ok(())
}
