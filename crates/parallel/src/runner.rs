//! Cluster runner: one coordinator plus W workers on scoped threads

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use stripflood_core::{Error, Result};

use crate::coordinator::run_coordinator;
use crate::source::{DemSink, DemSource, GeoTiffSink, GeoTiffSource};
use crate::transport::ChannelMesh;
use crate::worker::{check_partition, run_worker};

/// Fill a DEM with `workers` strips.
///
/// Spawns one thread per worker rank plus the coordinator on the calling
/// thread, all wired through an in-process channel mesh. Any rank failing
/// aborts the whole computation: its channels disconnect, every blocked
/// peer surfaces a transport error, and the first error is returned.
pub fn run_cluster(
    source: Arc<dyn DemSource>,
    sink: Arc<dyn DemSink>,
    workers: usize,
) -> Result<()> {
    let (height, width) = source.dims();
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    check_partition(height, workers)?;

    let mut endpoints = ChannelMesh::connect(workers + 1);
    let coordinator = endpoints.remove(0);
    let nodata = source.nodata();

    std::thread::scope(|scope| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|transport| {
                let source = Arc::clone(&source);
                let sink = Arc::clone(&sink);
                scope.spawn(move || run_worker(&transport, source.as_ref(), sink.as_ref()))
            })
            .collect();

        let mut first_error = run_coordinator(&coordinator, nodata).err();
        // Drop the coordinator endpoint before joining: if resolution
        // failed, workers still waiting for their fill maps must see a
        // disconnect instead of blocking forever. Messages already sent
        // stay readable.
        drop(coordinator);
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    first_error.get_or_insert(Error::Other("worker thread panicked".into()));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}

/// Fill a GeoTIFF DEM from disk, writing one output raster per strip beside
/// the input. Returns the written paths in strip order.
pub fn fill_dem<P: AsRef<Path>>(input: P, workers: usize) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();
    let source = GeoTiffSource::open(input)?;
    let (rows, cols) = source.dims();
    info!(rows, cols, workers, "filling {}", input.display());

    let sink = GeoTiffSink::beside(input, &source, workers)?;
    let outputs = sink.output_paths().to_vec();

    run_cluster(Arc::new(source), Arc::new(sink), workers)?;
    Ok(outputs)
}
