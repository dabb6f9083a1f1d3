//! Typed messages exchanged between the coordinator and workers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stripflood_core::{Error, Result};
use stripflood_engine::SpillGraph;

/// Everything that travels between ranks.
///
/// Workers send their boundary rows and spill graph to the coordinator
/// after local flooding; the coordinator answers with the resolved fill
/// elevation per local label. `Sync` is the worker-to-worker token that
/// keeps stderr diagnostics in strip order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    TopElevations(Vec<f32>),
    BotElevations(Vec<f32>),
    TopLabels(Vec<i32>),
    BotLabels(Vec<i32>),
    Graph(SpillGraph),
    LabelFills(BTreeMap<i32, f32>),
    Sync,
}

/// Discriminant used to request a specific message from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    TopElevations,
    BotElevations,
    TopLabels,
    BotLabels,
    Graph,
    LabelFills,
    Sync,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::TopElevations(_) => MessageKind::TopElevations,
            Message::BotElevations(_) => MessageKind::BotElevations,
            Message::TopLabels(_) => MessageKind::TopLabels,
            Message::BotLabels(_) => MessageKind::BotLabels,
            Message::Graph(_) => MessageKind::Graph,
            Message::LabelFills(_) => MessageKind::LabelFills,
            Message::Sync => MessageKind::Sync,
        }
    }

    pub fn into_elevations(self) -> Result<Vec<f32>> {
        match self {
            Message::TopElevations(v) | Message::BotElevations(v) => Ok(v),
            other => Err(wrong_payload("elevations", &other)),
        }
    }

    pub fn into_labels(self) -> Result<Vec<i32>> {
        match self {
            Message::TopLabels(v) | Message::BotLabels(v) => Ok(v),
            other => Err(wrong_payload("labels", &other)),
        }
    }

    pub fn into_graph(self) -> Result<SpillGraph> {
        match self {
            Message::Graph(g) => Ok(g),
            other => Err(wrong_payload("graph", &other)),
        }
    }

    pub fn into_label_fills(self) -> Result<BTreeMap<i32, f32>> {
        match self {
            Message::LabelFills(m) => Ok(m),
            other => Err(wrong_payload("label fills", &other)),
        }
    }
}

fn wrong_payload(expected: &str, got: &Message) -> Error {
    Error::Protocol(format!("expected {} payload, got {:?}", expected, got.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_payload() {
        assert_eq!(
            Message::TopElevations(vec![]).kind(),
            MessageKind::TopElevations
        );
        assert_eq!(Message::Sync.kind(), MessageKind::Sync);
    }

    #[test]
    fn test_payload_extraction() {
        assert_eq!(
            Message::BotElevations(vec![1.0]).into_elevations().unwrap(),
            vec![1.0]
        );
        assert!(Message::Sync.into_graph().is_err());
    }
}
