//! Final raise of strip elevations to their resolved fill levels

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::is_nodata;

/// Raise every cell of the strip to its region's resolved fill elevation.
///
/// The local flood has already raised interior cells as far as the strip
/// could determine, and global resolution can only move spill levels up,
/// so taking the maximum is enough; no second flood is needed. Nodata cells
/// and cells whose label has no entry (regions the exterior cannot reach)
/// pass through unchanged.
pub fn apply_fills(
    elev: &mut Array2<f32>,
    labels: &Array2<i32>,
    nodata: f32,
    fills: &BTreeMap<i32, f32>,
) {
    debug_assert_eq!(elev.dim(), labels.dim());

    for ((row, col), z) in elev.indexed_iter_mut() {
        if is_nodata(*z, nodata) {
            continue;
        }
        if let Some(&fill) = fills.get(&labels[(row, col)]) {
            if *z < fill {
                *z = fill;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ND: f32 = -9999.0;

    #[test]
    fn test_raises_only_below_fill() {
        let mut elev = Array2::from_shape_vec((2, 2), vec![1.0, 5.0, 3.0, ND]).unwrap();
        let labels = Array2::from_shape_vec((2, 2), vec![2, 2, 2, 0]).unwrap();
        let fills = BTreeMap::from([(1, f32::NEG_INFINITY), (2, 3.0)]);

        apply_fills(&mut elev, &labels, ND, &fills);

        assert_eq!(elev[(0, 0)], 3.0); // raised
        assert_eq!(elev[(0, 1)], 5.0); // already above
        assert_eq!(elev[(1, 0)], 3.0); // exactly at fill
        assert_eq!(elev[(1, 1)], ND); // nodata untouched
    }

    #[test]
    fn test_unresolved_label_left_alone() {
        let mut elev = Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap();
        let labels = Array2::from_shape_vec((1, 2), vec![7, 7]).unwrap();
        let fills = BTreeMap::from([(1, f32::NEG_INFINITY)]);

        apply_fills(&mut elev, &labels, ND, &fills);

        assert_eq!(elev[(0, 0)], 1.0);
        assert_eq!(elev[(0, 1)], 2.0);
    }

    #[test]
    fn test_exterior_never_raised() {
        let mut elev = Array2::from_shape_vec((1, 3), vec![-5.0, 0.0, 9.0]).unwrap();
        let labels = Array2::from_shape_vec((1, 3), vec![1, 1, 1]).unwrap();
        let fills = BTreeMap::from([(1, f32::NEG_INFINITY)]);

        apply_fills(&mut elev, &labels, ND, &fills);

        assert_eq!(elev[(0, 0)], -5.0);
        assert_eq!(elev[(0, 1)], 0.0);
        assert_eq!(elev[(0, 2)], 9.0);
    }
}
