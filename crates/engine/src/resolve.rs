//! Global resolution of per-strip spill graphs
//!
//! The coordinator rewrites each strip's labels into a disjoint global
//! namespace, stitches the per-strip spill graphs along the seams between
//! adjacent strips, runs a Priority-Flood over the merged graph and hands
//! every strip back a map from its local labels to the global fill
//! elevation of that region.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use stripflood_core::{Error, Result};

use crate::graph::SpillGraph;
use crate::is_nodata;
use crate::strip::EXTERIOR_LABEL;

/// Everything one worker contributes to global resolution: its boundary
/// rows (elevations after local flooding, plus labels) and its spill graph.
#[derive(Debug, Clone)]
pub struct StripContribution {
    pub top_elev: Vec<f32>,
    pub bot_elev: Vec<f32>,
    pub top_labels: Vec<i32>,
    pub bot_labels: Vec<i32>,
    pub graph: SpillGraph,
}

/// Resolve the global fill elevation of every region across all strips.
///
/// Returns, for each strip in order, a map from that strip's local labels to
/// the elevation its cells must be raised to. The exterior entry (label 1)
/// is present in every strip's map. Regions unreachable from the exterior
/// (sealed off by nodata) carry no entry and are left at their locally
/// filled elevations.
pub fn resolve_strips(
    mut strips: Vec<StripContribution>,
    nodata: f32,
) -> Result<Vec<BTreeMap<i32, f32>>> {
    let num_strips = strips.len();
    let width = strips.first().map(|s| s.top_elev.len()).unwrap_or(0);
    for (i, s) in strips.iter().enumerate() {
        if s.top_elev.len() != width
            || s.bot_elev.len() != width
            || s.top_labels.len() != width
            || s.bot_labels.len() != width
        {
            return Err(Error::Protocol(format!(
                "strip {} boundary rows disagree on width",
                i
            )));
        }
    }

    let (mut master, offsets, label_to_strip) = merge_graphs(&mut strips);
    stitch_seams(&mut master, &strips, nodata);
    let resolved = flood_graph(&master);
    partition(resolved, &offsets, &label_to_strip, num_strips)
}

/// Offset every strip's labels into a shared namespace and union the spill
/// graphs. Label 1 (exterior) is never shifted. The running maximum covers
/// boundary-row labels as well as graph vertices, so a strip whose graph is
/// empty cannot hand its namespace to the next strip.
fn merge_graphs(
    strips: &mut [StripContribution],
) -> (SpillGraph, Vec<i32>, BTreeMap<i32, usize>) {
    let mut master = SpillGraph::new();
    let mut offsets = vec![0i32; strips.len()];
    let mut label_to_strip: BTreeMap<i32, usize> = BTreeMap::new();

    // Interior labels start at 2, so a zero first offset leaves strip 0
    // untouched and clear of the exterior label.
    let mut maxlabel = 0i32;

    for (i, s) in strips.iter_mut().enumerate() {
        offsets[i] = maxlabel;
        let off = maxlabel;
        let shift = |l: i32| if l == EXTERIOR_LABEL { l } else { l + off };

        let mut strip_max = maxlabel;
        for (a, b, w) in s.graph.edges() {
            let (ga, gb) = (shift(a), shift(b));
            master.relax(ga, gb, w);
            for g in [ga, gb] {
                if g != EXTERIOR_LABEL {
                    label_to_strip.insert(g, i);
                    strip_max = strip_max.max(g);
                }
            }
        }

        for row in [&mut s.top_labels, &mut s.bot_labels] {
            for l in row.iter_mut() {
                // 0 marks nodata / unreached cells and stays unmapped
                if *l != EXTERIOR_LABEL && *l != 0 {
                    *l += off;
                    label_to_strip.insert(*l, i);
                    strip_max = strip_max.max(*l);
                }
            }
        }

        maxlabel = strip_max;
    }

    (master, offsets, label_to_strip)
}

/// Join the per-strip graphs across each seam. Every cell of a strip's
/// bottom row is paired with its three downward 8-neighbours on the next
/// strip's top row; together with the full sweep over x this enumerates
/// each cross-seam adjacency exactly once.
fn stitch_seams(master: &mut SpillGraph, strips: &[StripContribution], nodata: f32) {
    for pair in strips.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        let width = upper.bot_elev.len() as isize;

        for x in 0..width {
            let ez = upper.bot_elev[x as usize];
            if is_nodata(ez, nodata) {
                continue;
            }
            let my_label = upper.bot_labels[x as usize];
            for nx in [x - 1, x, x + 1] {
                if nx < 0 || nx >= width {
                    continue;
                }
                let oz = lower.top_elev[nx as usize];
                if is_nodata(oz, nodata) {
                    continue;
                }
                let other_label = lower.top_labels[nx as usize];
                if my_label == other_label {
                    // Namespaces are disjoint, so only the shared exterior
                    // can collide with itself here
                    continue;
                }
                master.relax(my_label, other_label, ez.max(oz));
            }
        }
    }
}

/// A vertex queued for the graph flood, ordered by elevation
/// (min-heap via reversed `Ord`), ties broken on the label.
#[derive(Debug, Clone, Copy)]
struct GraphNode {
    elev: f32,
    vertex: i32,
}

impl PartialEq for GraphNode {
    fn eq(&self, other: &Self) -> bool {
        self.elev == other.elev && self.vertex == other.vertex
    }
}

impl Eq for GraphNode {}

impl PartialOrd for GraphNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elev
            .partial_cmp(&self.elev)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Priority-Flood over the master graph: the resolved elevation of a vertex
/// is the minimum over all paths to the exterior of the maximum edge weight
/// along the path, i.e. the lowest level at which the region drains off the
/// map edge.
fn flood_graph(master: &SpillGraph) -> BTreeMap<i32, f32> {
    let mut open: BinaryHeap<GraphNode> = BinaryHeap::new();
    let mut resolved: BTreeMap<i32, f32> = BTreeMap::new();

    open.push(GraphNode {
        elev: f32::NEG_INFINITY,
        vertex: EXTERIOR_LABEL,
    });

    while let Some(GraphNode { elev, vertex }) = open.pop() {
        if resolved.contains_key(&vertex) {
            continue;
        }
        resolved.insert(vertex, elev);

        for (n, w) in master.neighbors(vertex) {
            if !resolved.contains_key(&n) {
                open.push(GraphNode {
                    elev: elev.max(w),
                    vertex: n,
                });
            }
        }
    }

    resolved
}

/// Undo the namespacing: route every resolved global label back to its
/// strip's local value. The exterior is shared by all strips and gets an
/// entry in each map.
fn partition(
    resolved: BTreeMap<i32, f32>,
    offsets: &[i32],
    label_to_strip: &BTreeMap<i32, usize>,
    num_strips: usize,
) -> Result<Vec<BTreeMap<i32, f32>>> {
    let mut out: Vec<BTreeMap<i32, f32>> = vec![BTreeMap::new(); num_strips];

    let exterior = resolved
        .get(&EXTERIOR_LABEL)
        .copied()
        .unwrap_or(f32::NEG_INFINITY);
    for map in &mut out {
        map.insert(EXTERIOR_LABEL, exterior);
    }

    for (&vertex, &elev) in &resolved {
        if vertex == EXTERIOR_LABEL {
            continue;
        }
        let &strip = label_to_strip.get(&vertex).ok_or_else(|| {
            Error::Protocol(format!("resolved label {} belongs to no strip", vertex))
        })?;
        out[strip].insert(vertex - offsets[strip], elev);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ND: f32 = -9999.0;

    fn contribution(
        top_elev: &[f32],
        bot_elev: &[f32],
        top_labels: &[i32],
        bot_labels: &[i32],
        edges: &[(i32, i32, f32)],
    ) -> StripContribution {
        let mut graph = SpillGraph::new();
        for &(a, b, w) in edges {
            graph.relax(a, b, w);
        }
        StripContribution {
            top_elev: top_elev.to_vec(),
            bot_elev: bot_elev.to_vec(),
            top_labels: top_labels.to_vec(),
            bot_labels: bot_labels.to_vec(),
            graph,
        }
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        // Both strips use local label 2; after merging, strip 1's region
        // must come back under a distinct global label while the exterior
        // stays shared.
        let strips = vec![
            contribution(
                &[9.0; 3],
                &[9.0, 2.0, 9.0],
                &[1, 1, 1],
                &[1, 2, 1],
                &[(1, 2, 9.0)],
            ),
            contribution(
                &[9.0, 2.0, 9.0],
                &[9.0; 3],
                &[1, 2, 1],
                &[1, 1, 1],
                &[(1, 2, 9.0)],
            ),
        ];

        let fills = resolve_strips(strips, ND).unwrap();
        assert_eq!(fills.len(), 2);
        // Each strip sees its own local label 2 plus the exterior
        assert!(fills[0].contains_key(&1));
        assert!(fills[0].contains_key(&2));
        assert!(fills[1].contains_key(&1));
        assert!(fills[1].contains_key(&2));
    }

    #[test]
    fn test_empty_graph_strip_keeps_namespace_intact() {
        // Strip 0 found a region (label 2) on its top row but no spill edge
        // at all, and its bottom row is pure nodata so the seam contributes
        // nothing. Its labels must still advance the namespace so strip 1's
        // label 2 does not collide.
        let strips = vec![
            contribution(
                &[ND, 3.0, ND],
                &[ND, ND, ND],
                &[0, 2, 0],
                &[0, 0, 0],
                &[],
            ),
            contribution(
                &[ND, 4.0, ND],
                &[ND, 4.0, ND],
                &[0, 2, 0],
                &[0, 2, 0],
                &[(1, 2, 4.0)],
            ),
        ];

        let fills = resolve_strips(strips, ND).unwrap();
        // Strip 1's region resolves through its own exterior edge; its
        // local label must still be 2 after the offset is undone.
        assert_eq!(fills[1].get(&2), Some(&4.0));
        // Strip 0's sealed-off region stays unresolved.
        assert!(!fills[0].contains_key(&2));
    }

    #[test]
    fn test_stitch_connects_basins_across_seam() {
        // Strip 0's basin (local 2) reaches the exterior over a 4-high rim;
        // strip 1's basin (also local 2) only sees a 9-high rim locally.
        // The seam joins the two basins at level 1, so strip 1's basin must
        // resolve to 4, not 9.
        let strips = vec![
            contribution(
                &[9.0; 5],
                &[9.0, 1.0, 1.0, 1.0, 4.0],
                &[1, 1, 1, 1, 1],
                &[1, 2, 2, 2, 1],
                &[(1, 2, 4.0)],
            ),
            contribution(
                &[9.0, 1.0, 1.0, 1.0, 9.0],
                &[9.0; 5],
                &[1, 2, 2, 2, 1],
                &[1, 1, 1, 1, 1],
                &[(1, 2, 9.0)],
            ),
        ];

        let fills = resolve_strips(strips, ND).unwrap();
        assert_eq!(fills[0].get(&2), Some(&4.0));
        assert_eq!(fills[1].get(&2), Some(&4.0));
    }

    #[test]
    fn test_stitch_skips_nodata() {
        // The only non-nodata seam pairing is diagonal (x=1 over x=2);
        // basins join there at max(2, 3) = 3.
        let strips = vec![
            contribution(
                &[5.0; 4],
                &[ND, 2.0, ND, ND],
                &[1, 1, 1, 1],
                &[0, 2, 0, 0],
                &[(1, 2, 5.0)],
            ),
            contribution(
                &[ND, ND, 3.0, ND],
                &[5.0; 4],
                &[0, 0, 2, 0],
                &[1, 1, 1, 1],
                &[(1, 2, 9.0)],
            ),
        ];

        let fills = resolve_strips(strips, ND).unwrap();
        // Strip 1's basin drains through the seam and strip 0's rim at 5
        assert_eq!(fills[1].get(&2), Some(&5.0));
    }

    #[test]
    fn test_resolved_elevations_are_minimax() {
        // Chain: exterior -8- A -1- B, plus a direct exterior -9- B edge.
        // B's cheapest escape runs through A: max(8, 1) = 8 < 9.
        let strips = vec![contribution(
            &[9.0; 3],
            &[9.0; 3],
            &[1, 2, 3],
            &[1, 1, 1],
            &[(1, 2, 8.0), (2, 3, 1.0), (1, 3, 9.0)],
        )];

        let fills = resolve_strips(strips, ND).unwrap();
        assert_eq!(fills[0].get(&2), Some(&8.0));
        assert_eq!(fills[0].get(&3), Some(&8.0));
        assert_eq!(fills[0].get(&1), Some(&f32::NEG_INFINITY));
    }

    #[test]
    fn test_monotone_along_edges() {
        // For every master-graph edge (u, v, w):
        // resolved[v] <= max(resolved[u], w) once u is resolved first.
        let edges = [(1, 2, 4.0), (2, 3, 6.0), (2, 4, 2.0), (3, 4, 1.0)];
        let strips = vec![contribution(
            &[9.0; 3],
            &[9.0; 3],
            &[1, 1, 1],
            &[1, 1, 1],
            &edges,
        )];

        let fills = resolve_strips(strips, ND).unwrap();
        let r = &fills[0];
        for &(u, v, w) in &edges {
            let (ru, rv) = (r[&u], r[&v]);
            let (lo, hi) = if ru <= rv { (ru, rv) } else { (rv, ru) };
            assert!(
                hi <= lo.max(w),
                "edge ({}, {}, {}) violates minimax: {} vs {}",
                u,
                v,
                w,
                hi,
                lo.max(w)
            );
        }
    }

    #[test]
    fn test_rejects_mismatched_widths() {
        let strips = vec![
            contribution(&[9.0; 3], &[9.0; 3], &[1; 3], &[1; 3], &[]),
            contribution(&[9.0; 4], &[9.0; 4], &[1; 4], &[1; 4], &[]),
        ];
        assert!(resolve_strips(strips, ND).is_err());
    }
}
