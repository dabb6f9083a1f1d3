//! Point-to-point transport between ranks
//!
//! The drivers only depend on the [`Transport`] trait: ordered, reliable,
//! typed messaging between the coordinator (rank 0) and the workers
//! (ranks 1..=W). [`ChannelMesh`] provides the in-process implementation
//! used by the cluster runner: one crossbeam channel per ordered rank pair,
//! so messages between two ranks can never overtake each other.

use crossbeam_channel::{unbounded, Receiver, Sender};
use stripflood_core::{Error, Result};

use crate::message::{Message, MessageKind};

/// Process index within the computation. Rank 0 is the coordinator.
pub type Rank = usize;

/// The coordinator's rank
pub const COORDINATOR: Rank = 0;

/// Ordered, reliable, typed point-to-point messaging.
///
/// `recv` asks for a specific message kind; receiving anything else means
/// the two ranks disagree about the protocol state and is reported as a
/// protocol violation rather than silently reordered.
pub trait Transport: Send {
    fn rank(&self) -> Rank;
    fn world_size(&self) -> usize;
    fn send(&self, to: Rank, msg: Message) -> Result<()>;
    fn recv(&self, from: Rank, kind: MessageKind) -> Result<Message>;
}

/// All-pairs in-process channel transport.
pub struct ChannelMesh {
    rank: Rank,
    /// Indexed by destination rank; `None` at our own index
    outgoing: Vec<Option<Sender<Message>>>,
    /// Indexed by source rank; `None` at our own index
    incoming: Vec<Option<Receiver<Message>>>,
}

impl ChannelMesh {
    /// Build a fully connected mesh of `world_size` endpoints. Endpoint `i`
    /// of the returned vector belongs to rank `i`.
    pub fn connect(world_size: usize) -> Vec<ChannelMesh> {
        let mut outgoing: Vec<Vec<Option<Sender<Message>>>> = (0..world_size)
            .map(|_| (0..world_size).map(|_| None).collect())
            .collect();
        let mut incoming: Vec<Vec<Option<Receiver<Message>>>> = (0..world_size)
            .map(|_| (0..world_size).map(|_| None).collect())
            .collect();

        for src in 0..world_size {
            for dst in 0..world_size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = unbounded();
                outgoing[src][dst] = Some(tx);
                incoming[dst][src] = Some(rx);
            }
        }

        outgoing
            .into_iter()
            .zip(incoming)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| ChannelMesh {
                rank,
                outgoing,
                incoming,
            })
            .collect()
    }

    fn peer_down(&self, rank: Rank, action: &str) -> Error {
        Error::Transport {
            rank,
            reason: format!("peer disconnected while {}", action),
        }
    }
}

impl Transport for ChannelMesh {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.outgoing.len()
    }

    fn send(&self, to: Rank, msg: Message) -> Result<()> {
        let tx = self
            .outgoing
            .get(to)
            .and_then(|t| t.as_ref())
            .ok_or_else(|| Error::Protocol(format!("rank {} cannot send to {}", self.rank, to)))?;
        tx.send(msg).map_err(|_| self.peer_down(to, "sending"))
    }

    fn recv(&self, from: Rank, kind: MessageKind) -> Result<Message> {
        let rx = self
            .incoming
            .get(from)
            .and_then(|r| r.as_ref())
            .ok_or_else(|| {
                Error::Protocol(format!("rank {} cannot receive from {}", self.rank, from))
            })?;
        let msg = rx.recv().map_err(|_| self.peer_down(from, "receiving"))?;
        if msg.kind() != kind {
            return Err(Error::Protocol(format!(
                "rank {} expected {:?} from rank {}, got {:?}",
                self.rank,
                kind,
                from,
                msg.kind()
            )));
        }
        Ok(msg)
    }
}
