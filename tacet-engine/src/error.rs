use thiserror::Error;

use tacet_midi::{SinkError, SourceError};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Time: {0}")]
  Time(#[from] tacet_time::Error),

  #[error("Sink: {0}")]
  Sink(#[from] SinkError),

  #[error("Source: {0}")]
  Source(#[from] SourceError),

  #[error("streamer slot is busy, try again later")]
  SlotBusy,

  #[error("transport shut down")]
  TransportShutdown,

  #[error("Transport: {0}")]
  Transport(String),
}
