use thiserror::Error;

/// Number of channels addressable by a channel voice message.
pub const MIDI_CHANNELS: u8 = 16;

const CC_ALL_SOUND_OFF: u8 = 0x78;
const CC_RESET_ALL_CONTROLLERS: u8 = 0x79;

#[derive(Debug, Error, PartialEq)]
pub enum SinkError {
  #[error("midi write at frame {offset} rejected by a block of {nframes} frames")]
  InvalidOffset { offset: u32, nframes: u32 },

  #[error("midi output buffer is full")]
  BufferFull,
}

/// Output capability bound to one audio block.
///
/// `write_midi` places raw bytes at an offset expressed in seconds from
/// the start of the block; implementations convert it to a sample offset
/// with the block's frame rate. The provided helpers encode the channel
/// voice messages the player needs on top of it.
pub trait MidiSink {
  fn write_midi(&mut self, offset_seconds: f64, data: &[u8]) -> Result<(), SinkError>;

  fn write_program_change(
    &mut self,
    offset_seconds: f64,
    channel: u8,
    program: u8,
  ) -> Result<(), SinkError> {
    self.write_midi(offset_seconds, &[0xc0 | channel, program])
  }

  fn write_note_on(
    &mut self,
    offset_seconds: f64,
    channel: u8,
    note: u8,
    velocity: u8,
  ) -> Result<(), SinkError> {
    self.write_midi(offset_seconds, &[0x90 | channel, note, velocity])
  }

  /// 14-bit pitch value encoded as two 7-bit bytes, least significant
  /// first.
  fn write_pitch_wheel_change(
    &mut self,
    offset_seconds: f64,
    channel: u8,
    pitch: u16,
  ) -> Result<(), SinkError> {
    let least = (pitch & 0x7f) as u8;
    let most = ((pitch >> 7) & 0x7f) as u8;
    self.write_midi(offset_seconds, &[0xe0 | channel, least, most])
  }

  fn write_control_change(
    &mut self,
    offset_seconds: f64,
    channel: u8,
    control: u8,
    value: u8,
  ) -> Result<(), SinkError> {
    self.write_midi(offset_seconds, &[0xb0 | channel, control, value])
  }

  fn write_all_sound_off(&mut self, offset_seconds: f64, channel: u8) -> Result<(), SinkError> {
    self.write_control_change(offset_seconds, channel, CC_ALL_SOUND_OFF, 0x00)
  }

  fn write_global_sound_off(&mut self, offset_seconds: f64) -> Result<(), SinkError> {
    for channel in 0..MIDI_CHANNELS {
      self.write_all_sound_off(offset_seconds, channel)?;
    }
    Ok(())
  }

  fn write_reset_all_controllers(
    &mut self,
    offset_seconds: f64,
    channel: u8,
  ) -> Result<(), SinkError> {
    self.write_control_change(offset_seconds, channel, CC_RESET_ALL_CONTROLLERS, 0x00)
  }

  fn write_global_reset_controllers(&mut self, offset_seconds: f64) -> Result<(), SinkError> {
    for channel in 0..MIDI_CHANNELS {
      self.write_reset_all_controllers(offset_seconds, channel)?;
    }
    Ok(())
  }
}

/// One raw write captured by a `BlockSink`, at its resolved frame offset.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiWrite {
  pub frame: u32,
  pub data: Vec<u8>,
}

/// `MidiSink` over an owned buffer, standing in for an audio-server port
/// buffer. Rejects writes that fall outside the block.
#[derive(Debug)]
pub struct BlockSink {
  nframes: u32,
  frame_rate: u32,
  writes: Vec<MidiWrite>,
}

impl BlockSink {
  pub fn new(nframes: u32, frame_rate: u32) -> Self {
    Self {
      nframes,
      frame_rate,
      writes: Vec::new(),
    }
  }

  pub fn writes(&self) -> &[MidiWrite] {
    &self.writes
  }

  pub fn clear(&mut self) {
    self.writes.clear();
  }
}

impl MidiSink for BlockSink {
  fn write_midi(&mut self, offset_seconds: f64, data: &[u8]) -> Result<(), SinkError> {
    let offset = (offset_seconds * self.frame_rate as f64) as u32;
    if offset >= self.nframes {
      return Err(SinkError::InvalidOffset {
        offset,
        nframes: self.nframes,
      });
    }
    self.writes.push(MidiWrite {
      frame: offset,
      data: data.to_vec(),
    });
    Ok(())
  }
}
