pub mod data;

pub(crate) mod bridge;
pub(crate) mod error;
pub(crate) mod streamer;
pub(crate) mod transport;

pub use bridge::{StreamController, StreamHandler, TimelineBridge};
pub use data::slot::{resource_slot, SlotReader, SlotWriter};
pub use error::{Error, Result};
pub use streamer::EventStreamer;
pub use transport::{Transport, TransportQuery, TransportState};
