//! Worker driver: flood one strip, exchange boundaries, apply, write

use tracing::debug;

use stripflood_core::{Error, Result};
use stripflood_engine::{apply_fills, flood_strip, Strip};

use crate::message::{Message, MessageKind};
use crate::source::{DemSink, DemSource};
use crate::transport::{Transport, COORDINATOR};

/// Which rows of the full DEM one worker owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripPlan {
    pub index: usize,
    pub count: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl StripPlan {
    /// Split `height` rows into `count` strips of whole rows; the last
    /// strip absorbs the remainder.
    pub fn partition(height: usize, count: usize, index: usize) -> Self {
        let base = height / count;
        let first_row = base * index;
        let last_row = if index == count - 1 {
            height
        } else {
            base * (index + 1)
        };
        StripPlan {
            index,
            count,
            first_row,
            last_row,
        }
    }

    /// Strip height in rows
    pub fn height(&self) -> usize {
        self.last_row - self.first_row
    }

    fn is_first(&self) -> bool {
        self.index == 0
    }

    fn is_last(&self) -> bool {
        self.index == self.count - 1
    }
}

/// Run one worker rank to completion.
///
/// Reads the strip, runs the local Priority-Flood, ships boundary rows and
/// the spill graph to the coordinator, waits for the resolved fill
/// elevations, raises the strip and writes it out. The `Sync` token walks
/// worker-to-worker around the diagnostics and the write phase so per-strip
/// output appears in strip order; it carries no data.
pub fn run_worker(
    transport: &dyn Transport,
    source: &dyn DemSource,
    sink: &dyn DemSink,
) -> Result<()> {
    let rank = transport.rank();
    debug_assert_ne!(rank, COORDINATOR);
    let num_strips = transport.world_size() - 1;
    let plan = StripPlan::partition(source.dims().0, num_strips, rank - 1);

    let elev = source.read_rows(plan.first_row, plan.last_row)?;
    let mut strip = Strip {
        elev,
        nodata: source.nodata(),
        physical_top: plan.is_first(),
        physical_bottom: plan.is_last(),
    };

    let outcome = flood_strip(&mut strip)?;

    // Token gate: flooding above ran in parallel; the summary lines come
    // out in strip order.
    if !plan.is_first() {
        transport.recv(rank - 1, MessageKind::Sync)?;
    }
    debug!(
        strip = plan.index,
        rows = plan.height(),
        max_label = outcome.graph.max_vertex().unwrap_or(1),
        edges = outcome.graph.edge_count(),
        "strip flooded"
    );
    if !plan.is_last() {
        transport.send(rank + 1, Message::Sync)?;
    }

    let h = strip.height();
    let top_elev = strip.elev.row(0).to_vec();
    let bot_elev = strip.elev.row(h - 1).to_vec();
    let top_labels = outcome.labels.row(0).to_vec();
    let bot_labels = outcome.labels.row(h - 1).to_vec();

    transport.send(COORDINATOR, Message::TopElevations(top_elev))?;
    transport.send(COORDINATOR, Message::BotElevations(bot_elev))?;
    transport.send(COORDINATOR, Message::TopLabels(top_labels))?;
    transport.send(COORDINATOR, Message::BotLabels(bot_labels))?;
    transport.send(COORDINATOR, Message::Graph(outcome.graph))?;

    let fills = transport
        .recv(COORDINATOR, MessageKind::LabelFills)?
        .into_label_fills()?;

    apply_fills(&mut strip.elev, &outcome.labels, strip.nodata, &fills);

    // Second token pass serialises the strip writes
    if !plan.is_first() {
        transport.recv(rank - 1, MessageKind::Sync)?;
    }
    debug!(strip = plan.index, "writing filled strip");
    sink.write_strip(plan.index, plan.first_row, &strip.elev)?;
    if !plan.is_last() {
        transport.send(rank + 1, Message::Sync)?;
    }

    Ok(())
}

/// Reject row counts that would leave some strip without its two boundary
/// rows.
pub fn check_partition(height: usize, workers: usize) -> Result<()> {
    if workers == 0 || height < 2 * workers {
        return Err(Error::InvalidDimensions {
            width: workers,
            height,
        });
    }
    Ok(())
}
