use crate::error::Result;

/// Transport states as reported by the external clock. `Starting` is
/// the pre-roll/seek state that precedes rolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
  Stopped,
  Starting,
  Rolling,
  Other,
}

/// Per-block transport snapshot: state plus the playhead frame.
#[derive(Debug, Clone, Copy)]
pub struct TransportQuery {
  pub state: TransportState,
  pub frame: u64,
  pub frame_rate: u32,
}

impl TransportQuery {
  pub fn new(state: TransportState, frame: u64, frame_rate: u32) -> Self {
    Self {
      state,
      frame,
      frame_rate,
    }
  }

  pub fn start_seconds(&self) -> f64 {
    self.frame as f64 / f64::from(self.frame_rate)
  }

  pub fn end_seconds(&self, nframes: u32) -> f64 {
    (self.frame + u64::from(nframes)) as f64 / f64::from(self.frame_rate)
  }
}

/// Control-side handle to the external transport client. Deactivation
/// must stop it from invoking any further notifications.
pub trait Transport {
  fn deactivate(&mut self) -> Result<()>;
}
