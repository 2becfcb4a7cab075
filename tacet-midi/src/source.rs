use thiserror::Error;

use crate::event::Event;

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("failed to read midi source: {0}")]
  Io(#[from] std::io::Error),

  #[error("malformed midi source: {0}")]
  Malformed(String),
}

/// A decoded MIDI file: the tick resolution and the events of all
/// tracks, merged and ordered by non-decreasing ticks.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
  pub ppqn: f64,
  pub events: Vec<Event>,
}

impl Sequence {
  pub fn new(ppqn: f64, events: Vec<Event>) -> Self {
    Self { ppqn, events }
  }
}

/// The file-decoding collaborator. Implementations own the byte-level
/// standard MIDI file format; the player only relies on the ordering
/// contract of the returned `Sequence`.
pub trait EventSource {
  fn load(&mut self) -> Result<Sequence, SourceError>;
}
