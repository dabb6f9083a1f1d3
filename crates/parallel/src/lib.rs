//! # stripflood-parallel
//!
//! The distributed half of the filler: typed messages between ranks, the
//! transport abstraction with its in-process channel implementation, the
//! worker and coordinator drivers, the DEM source/sink adapter interface and
//! the cluster runner that wires one coordinator and W workers together.
//!
//! Rank 0 is the coordinator; ranks 1..=W each own one horizontal strip of
//! the DEM, top to bottom.

pub mod coordinator;
pub mod message;
pub mod runner;
pub mod source;
pub mod transport;
pub mod worker;

pub use coordinator::run_coordinator;
pub use message::{Message, MessageKind};
pub use runner::{fill_dem, run_cluster};
pub use source::{CollectSink, DemSink, DemSource, GeoTiffSink, GeoTiffSource, InMemorySource};
pub use transport::{ChannelMesh, Rank, Transport, COORDINATOR};
pub use worker::{run_worker, StripPlan};
