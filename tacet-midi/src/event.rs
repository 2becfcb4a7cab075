/// Status byte introducing a meta event in a standard MIDI file track.
pub const META_STATUS: u8 = 0xff;
/// Meta event type for a tempo change (microseconds per quarter note).
pub const META_TEMPO: u8 = 0x51;
/// Meta event type for a time signature change.
pub const META_TIME_SIGNATURE: u8 = 0x58;

/// One timestamped event from a decoded MIDI file.
///
/// The tick timestamp is absolute, in the file's PPQN resolution.
/// Events are immutable once constructed and kept in tick order by
/// whoever owns the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
  pub ticks: f64,
  pub midi: Vec<u8>,
}

impl Event {
  pub fn new(ticks: f64, midi: Vec<u8>) -> Self {
    Self { ticks, midi }
  }

  /// Meta events carry file-level metadata and are never sent to an
  /// output port.
  pub fn is_meta(&self) -> bool {
    self.midi.first() == Some(&META_STATUS)
  }

  /// Meta event type byte, when this is a meta event.
  pub fn meta_type(&self) -> Option<u8> {
    if self.is_meta() {
      self.midi.get(1).copied()
    } else {
      None
    }
  }

  /// Payload of a meta event, when the declared length matches the
  /// actual remaining bytes.
  pub fn meta_payload(&self) -> Option<&[u8]> {
    if !self.is_meta() {
      return None;
    }
    let declared = *self.midi.get(2)? as usize;
    let payload = self.midi.get(3..)?;
    (payload.len() == declared).then_some(payload)
  }
}
