//! # stripflood-engine
//!
//! The filling algorithms: per-strip Priority-Flood with watershed
//! labelling, the spill graph it produces, the coordinator-side resolver
//! that stitches per-strip graphs and computes global fill elevations, and
//! the final apply pass.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117–127.

pub mod apply;
pub mod graph;
pub mod resolve;
pub mod strip;

pub use apply::apply_fills;
pub use graph::SpillGraph;
pub use resolve::{resolve_strips, StripContribution};
pub use strip::{flood_strip, FloodOutcome, Strip, EXTERIOR_LABEL};

/// Check a cell value against the nodata sentinel. NaN always counts as
/// nodata so a NaN sentinel compares correctly.
pub fn is_nodata(z: f32, nodata: f32) -> bool {
    z.is_nan() || z == nodata
}
