//! Coordinator driver: gather, resolve, scatter

use tracing::{debug, info};

use stripflood_core::Result;
use stripflood_engine::{resolve_strips, StripContribution};

use crate::message::{Message, MessageKind};
use crate::transport::Transport;

/// Run the coordinator rank to completion.
///
/// Collects every worker's boundary rows and spill graph (in rank order —
/// stitching needs all of them before it can start), resolves the global
/// fill elevation of every region, and sends each worker the map for its
/// strip. Workers hold their apply stage until that map arrives.
pub fn run_coordinator(transport: &dyn Transport, nodata: f32) -> Result<()> {
    let workers = transport.world_size() - 1;

    let mut contributions = Vec::with_capacity(workers);
    for rank in 1..=workers {
        let top_elev = transport
            .recv(rank, MessageKind::TopElevations)?
            .into_elevations()?;
        let bot_elev = transport
            .recv(rank, MessageKind::BotElevations)?
            .into_elevations()?;
        let top_labels = transport
            .recv(rank, MessageKind::TopLabels)?
            .into_labels()?;
        let bot_labels = transport
            .recv(rank, MessageKind::BotLabels)?
            .into_labels()?;
        let graph = transport.recv(rank, MessageKind::Graph)?.into_graph()?;

        debug!(rank, edges = graph.edge_count(), "strip outputs received");
        contributions.push(StripContribution {
            top_elev,
            bot_elev,
            top_labels,
            bot_labels,
            graph,
        });
    }

    info!(strips = workers, "resolving global fill elevations");
    let fills = resolve_strips(contributions, nodata)?;

    for (index, map) in fills.into_iter().enumerate() {
        transport.send(index + 1, Message::LabelFills(map))?;
    }

    Ok(())
}
