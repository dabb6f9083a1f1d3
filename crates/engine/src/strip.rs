//! Per-strip Priority-Flood with watershed labelling
//!
//! Fills locally determinable depressions in one horizontal strip of the DEM
//! while assigning every reachable cell a watershed label, and records in a
//! [`SpillGraph`] the lowest elevation at which each pair of adjacent
//! regions meets. The coordinator later merges these graphs across strips to
//! find the true global fill elevations.
//!
//! Labels are sentinel-coded in a single `i32` grid: 0 means unassigned,
//! a negative value means "queued, inherited from the cell that discovered
//! it", positive means processed. Cells on the DEM's physical outer edge are
//! pre-tagged with −1 so they resolve to the reserved exterior label 1; the
//! fresh-label counter starts at 2.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use ndarray::Array2;
use stripflood_core::{Error, Result};

use crate::graph::SpillGraph;
use crate::is_nodata;

/// The label shared by every cell on the DEM's physical outer edge.
/// Never offset during global namespacing.
pub const EXTERIOR_LABEL: i32 = 1;

const FIRST_INTERIOR_LABEL: i32 = 2;

/// 8-neighbour offsets as (row, col)
const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A queued cell, ordered by elevation (min-heap via reversed `Ord`).
/// Ties break on insertion sequence so runs are bitwise reproducible.
#[derive(Debug, Clone, Copy)]
struct Cell {
    z: f32,
    seq: u64,
    row: usize,
    col: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.z == other.z && self.seq == other.seq
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: lower elevation (then earlier insertion) pops first
        other
            .z
            .partial_cmp(&self.z)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One worker's slice of the DEM: a contiguous block of whole rows.
#[derive(Debug, Clone)]
pub struct Strip {
    /// Elevations, raised in place as depressions are filled
    pub elev: Array2<f32>,
    /// Nodata sentinel from the source raster
    pub nodata: f32,
    /// Whether row 0 is the physical top of the full DEM
    pub physical_top: bool,
    /// Whether the last row is the physical bottom of the full DEM
    pub physical_bottom: bool,
}

impl Strip {
    /// Local strip height
    pub fn height(&self) -> usize {
        self.elev.nrows()
    }

    /// Strip width (the full DEM width)
    pub fn width(&self) -> usize {
        self.elev.ncols()
    }
}

/// What the flood produces besides the raised elevations.
#[derive(Debug)]
pub struct FloodOutcome {
    /// Per-cell watershed labels; 0 only on nodata cells and on cells
    /// unreachable from the strip edges (sealed off by nodata)
    pub labels: Array2<i32>,
    /// Spill elevations between adjacent label regions
    pub graph: SpillGraph,
}

/// Run Priority-Flood with watershed labelling over one strip.
///
/// Every cell of the strip's four local edges seeds the open heap; cells on
/// the physical DEM exterior are pre-tagged so they join the reserved
/// exterior label. The main loop drains the pit queue before the heap,
/// which keeps flooded plateaus at a constant elevation, and relaxes a
/// spill-graph edge whenever two distinct regions touch.
///
/// On return the strip's elevations are raised to the locally determinable
/// fill level and the labels and spill graph describe its drainage regions.
pub fn flood_strip(strip: &mut Strip) -> Result<FloodOutcome> {
    let (h, w) = strip.elev.dim();
    if w == 0 || h < 2 {
        return Err(Error::InvalidDimensions {
            width: w,
            height: h,
        });
    }

    let nodata = strip.nodata;
    let mut labels = Array2::<i32>::zeros((h, w));
    let mut open: BinaryHeap<Cell> = BinaryHeap::new();
    let mut pit: VecDeque<Cell> = VecDeque::new();
    let mut seq: u64 = 0;

    let mut seed = |open: &mut BinaryHeap<Cell>,
                    labels: &mut Array2<i32>,
                    row: usize,
                    col: usize,
                    exterior: bool| {
        let z = strip.elev[(row, col)];
        if is_nodata(z, nodata) {
            return;
        }
        open.push(Cell { z, seq, row, col });
        seq += 1;
        if exterior {
            labels[(row, col)] = -EXTERIOR_LABEL;
        }
    };

    // Top and bottom rows (corners belong to the column pass below). Only
    // rows on the physical DEM edge are pre-tagged exterior; seam rows seed
    // the heap untagged and receive fresh labels.
    for x in 1..w.saturating_sub(1) {
        seed(&mut open, &mut labels, 0, x, strip.physical_top);
        seed(&mut open, &mut labels, h - 1, x, strip.physical_bottom);
    }
    // Left and right columns span the full DEM width, so they always lie on
    // the physical exterior.
    let edge_cols: &[usize] = if w == 1 { &[0] } else { &[0, w - 1] };
    for y in 0..h {
        for &x in edge_cols {
            seed(&mut open, &mut labels, y, x, true);
        }
    }
    drop(seed);

    let mut graph = SpillGraph::new();
    let mut next_label = FIRST_INTERIOR_LABEL;

    loop {
        // Pit cells first: they continue the plateau currently being flooded
        let c = match pit.pop_front().or_else(|| open.pop()) {
            Some(c) => c,
            None => break,
        };

        // Cells can be queued more than once (edge seeds are also reachable
        // from their neighbours); a positive label marks them processed.
        let tag = labels[(c.row, c.col)];
        if tag > 0 {
            continue;
        }
        let my_label = if tag == 0 {
            let fresh = next_label;
            next_label += 1;
            fresh
        } else {
            -tag
        };
        labels[(c.row, c.col)] = my_label;

        let cz = strip.elev[(c.row, c.col)];
        // A cell's elevation is only written before it is queued, so the
        // queue key is always current when it pops.
        debug_assert_eq!(cz, c.z, "queued elevation out of date at pop");

        for (dy, dx) in D8_OFFSETS {
            let ny = c.row as isize + dy;
            let nx = c.col as isize + dx;
            if ny < 0 || nx < 0 || ny as usize >= h || nx as usize >= w {
                continue;
            }
            let (ny, nx) = (ny as usize, nx as usize);

            let nz = strip.elev[(ny, nx)];
            if is_nodata(nz, nodata) {
                continue;
            }

            let ntag = labels[(ny, nx)];
            if ntag != 0 {
                let other = ntag.abs();
                if other != my_label {
                    graph.relax(my_label, other, cz.max(nz));
                }
                continue;
            }

            labels[(ny, nx)] = -my_label;
            if nz <= cz {
                // Depression: raise the neighbour to the spill level and
                // keep flooding the plateau in FIFO order
                strip.elev[(ny, nx)] = cz;
                pit.push_back(Cell {
                    z: cz,
                    seq,
                    row: ny,
                    col: nx,
                });
            } else {
                open.push(Cell {
                    z: nz,
                    seq,
                    row: ny,
                    col: nx,
                });
            }
            seq += 1;
        }
    }

    Ok(FloodOutcome { labels, graph })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ND: f32 = -9999.0;

    fn strip(rows: usize, cols: usize, vals: &[f32], top: bool, bottom: bool) -> Strip {
        Strip {
            elev: Array2::from_shape_vec((rows, cols), vals.to_vec()).unwrap(),
            nodata: ND,
            physical_top: top,
            physical_bottom: bottom,
        }
    }

    #[test]
    fn test_rejects_degenerate_strips() {
        let mut s = strip(1, 4, &[1.0, 1.0, 1.0, 1.0], true, true);
        assert!(flood_strip(&mut s).is_err());

        let mut s = Strip {
            elev: Array2::from_shape_vec((3, 0), vec![]).unwrap(),
            nodata: ND,
            physical_top: true,
            physical_bottom: true,
        };
        assert!(flood_strip(&mut s).is_err());
    }

    #[test]
    fn test_walled_pit_fills_to_wall_and_joins_exterior() {
        // A bowl whose rim is the DEM border pools against the rim: water
        // can only leave over the 9s, so the whole interior rises to 9 and
        // drains with the exterior.
        #[rustfmt::skip]
        let vals = [
            9.0, 9.0, 9.0, 9.0, 9.0,
            9.0, 1.0, 1.0, 1.0, 9.0,
            9.0, 1.0, 0.0, 1.0, 9.0,
            9.0, 1.0, 1.0, 1.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0,
        ];
        let mut s = strip(5, 5, &vals, true, true);
        let out = flood_strip(&mut s).unwrap();

        for ((_, _), &z) in s.elev.indexed_iter() {
            assert_eq!(z, 9.0);
        }
        for ((_, _), &l) in out.labels.indexed_iter() {
            assert_eq!(l, EXTERIOR_LABEL);
        }
        assert!(out.graph.is_empty());
    }

    #[test]
    fn test_pit_fills_to_lowest_outlet() {
        // Border 10 except a low outlet at (4,2); the inner plateau sits at
        // 5 with a pit at its centre. The pit fills to the plateau level,
        // which then drains through the outlet without further raising.
        #[rustfmt::skip]
        let vals = [
            10.0, 10.0, 10.0, 10.0, 10.0,
            10.0,  5.0,  5.0,  5.0, 10.0,
            10.0,  5.0,  1.0,  5.0, 10.0,
            10.0,  5.0,  5.0,  5.0, 10.0,
            10.0, 10.0,  2.0, 10.0, 10.0,
        ];
        let mut s = strip(5, 5, &vals, true, true);
        flood_strip(&mut s).unwrap();

        assert_eq!(s.elev[(2, 2)], 5.0);
        assert_eq!(s.elev[(1, 1)], 5.0);
        // Border cells are never raised
        assert_eq!(s.elev[(4, 2)], 2.0);
    }

    #[test]
    fn test_seam_strip_gets_fresh_labels_and_spill_edge() {
        // Top row is an interior seam: its cells seed the heap untagged and
        // grow their own region, which meets the exterior along the sides
        // and the physical bottom row.
        #[rustfmt::skip]
        let vals = [
            5.0, 5.0, 5.0, 5.0, 5.0,
            5.0, 0.0, 5.0, 5.0, 5.0,
            5.0, 5.0, 5.0, 5.0, 5.0,
        ];
        let mut s = strip(3, 5, &vals, false, true);
        let out = flood_strip(&mut s).unwrap();

        // The pit at (1,1) floods up to the plateau
        assert_eq!(s.elev[(1, 1)], 5.0);

        // Seam cells share one fresh region, edge cells the exterior
        let seam_label = out.labels[(0, 1)];
        assert!(seam_label >= 2);
        assert_eq!(out.labels[(0, 2)], seam_label);
        assert_eq!(out.labels[(1, 1)], seam_label);
        assert_eq!(out.labels[(0, 0)], EXTERIOR_LABEL);
        assert_eq!(out.labels[(2, 2)], EXTERIOR_LABEL);

        // One region pair, meeting on the 5-plateau
        assert_eq!(out.graph.weight(EXTERIOR_LABEL, seam_label), Some(5.0));
        assert_eq!(out.graph.edge_count(), 1);
    }

    #[test]
    fn test_spill_edge_takes_minimum_of_maxima() {
        // The seam basin touches the exterior through cell pairs of maxima
        // 9 (against the bottom wall) and 7 (against the left column); the
        // recorded spill elevation must be the minimum, 7.
        #[rustfmt::skip]
        let vals = [
            7.0, 7.0, 1.0, 7.0, 7.0,
            7.0, 7.0, 2.0, 7.0, 7.0,
            4.0, 9.0, 9.0, 9.0, 9.0,
        ];
        let mut s = strip(3, 5, &vals, false, true);
        let out = flood_strip(&mut s).unwrap();

        let basin = out.labels[(0, 2)];
        assert!(basin >= 2);
        assert_eq!(out.graph.weight(EXTERIOR_LABEL, basin), Some(7.0));
    }

    #[test]
    fn test_nodata_cells_are_skipped() {
        #[rustfmt::skip]
        let vals = [
            9.0, 9.0, 9.0, 9.0,
            9.0, 0.0,  ND, 9.0,
            9.0, 0.0, 0.0, 9.0,
            9.0, 9.0, 9.0, 9.0,
        ];
        let mut s = strip(4, 4, &vals, true, true);
        let out = flood_strip(&mut s).unwrap();

        // Valid pit cells rise to the wall, the hole stays untouched
        assert_eq!(s.elev[(1, 1)], 9.0);
        assert_eq!(s.elev[(2, 1)], 9.0);
        assert_eq!(s.elev[(2, 2)], 9.0);
        assert_eq!(s.elev[(1, 2)], ND);
        assert_eq!(out.labels[(1, 2)], 0);
    }

    #[test]
    fn test_monotone_fill() {
        #[rustfmt::skip]
        let vals = [
            3.0, 8.0, 2.0, 9.0, 4.0,
            6.0, 1.0, 7.0, 0.5, 8.0,
            2.0, 9.0, 3.0, 6.0, 1.0,
            7.0, 4.0, 8.0, 2.0, 9.0,
        ];
        let before = vals;
        let mut s = strip(4, 5, &before, true, true);
        flood_strip(&mut s).unwrap();

        for (i, &orig) in before.iter().enumerate() {
            let filled = s.elev[(i / 5, i % 5)];
            assert!(
                filled >= orig,
                "cell {} lowered: {} -> {}",
                i,
                orig,
                filled
            );
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        #[rustfmt::skip]
        let vals = [
            5.0, 5.0, 5.0, 5.0, 5.0, 5.0,
            5.0, 3.0, 3.0, 1.0, 3.0, 5.0,
            5.0, 3.0, 0.0, 3.0, 3.0, 5.0,
            5.0, 5.0, 5.0, 5.0, 5.0, 5.0,
        ];
        let mut a = strip(4, 6, &vals, false, false);
        let mut b = strip(4, 6, &vals, false, false);
        let out_a = flood_strip(&mut a).unwrap();
        let out_b = flood_strip(&mut b).unwrap();

        assert_eq!(a.elev, b.elev);
        assert_eq!(out_a.labels, out_b.labels);
        assert_eq!(out_a.graph, out_b.graph);
    }

    #[test]
    fn test_every_reachable_cell_labelled() {
        #[rustfmt::skip]
        let vals = [
            4.0, 4.0, 4.0, 4.0,
            4.0, 2.0, 2.0, 4.0,
            4.0, 2.0, 2.0, 4.0,
            4.0, 4.0, 4.0, 4.0,
        ];
        let mut s = strip(4, 4, &vals, false, true);
        let out = flood_strip(&mut s).unwrap();

        for ((_, _), &l) in out.labels.indexed_iter() {
            assert!(l >= 1);
        }
    }
}
