use tacet_midi::{Event, MidiSink, Sequence, SinkError};
use tacet_time::{TempoMap, TimebaseConfig};

use crate::error::Result;

/// Streams one loaded sequence to a per-block sink, sample-accurately
/// placed against the sequence's own tempo map.
///
/// A streamer is built once per load and replaced wholesale on reload;
/// the cursor only ever moves forward except when `reposition` rewinds
/// it for a transport seek.
#[derive(Debug, Default)]
pub struct EventStreamer {
  events: Vec<Event>,
  tempo_map: TempoMap,
  cursor: usize,
  initialized: bool,
  was_playing: bool,
  repositioned: bool,
}

impl EventStreamer {
  pub fn new(sequence: Sequence) -> Result<Self> {
    let mut tempo_map = TempoMap::new(TimebaseConfig::default().with_ppqn(sequence.ppqn));
    for event in &sequence.events {
      tempo_map.acknowledge_event(event)?;
    }
    Ok(Self {
      events: sequence.events,
      tempo_map,
      cursor: 0,
      initialized: false,
      was_playing: false,
      repositioned: false,
    })
  }

  pub fn tempo_map(&self) -> &TempoMap {
    &self.tempo_map
  }

  pub fn initialized(&self) -> bool {
    self.initialized
  }

  /// Rewinds and seeks the cursor to the first event at or after
  /// `seconds`. Called when the transport enters a seek, and on first
  /// use before any block has been processed.
  pub fn reposition(&mut self, seconds: f64) {
    self.cursor = 0;
    while let Some(event_seconds) = self.next_event_seconds() {
      if event_seconds >= seconds {
        break;
      }
      self.cursor += 1;
    }
    self.initialized = true;
    self.repositioned = true;
  }

  /// Silences everything at offset 0 after a seek or a play-to-stop
  /// edge, so no note rings across a discontinuity.
  pub fn stop_if_needed(
    &mut self,
    now_playing: bool,
    sink: &mut impl MidiSink,
  ) -> core::result::Result<(), SinkError> {
    if self.repositioned || (self.was_playing && !now_playing) {
      sink.write_global_sound_off(0.0)?;
    }
    self.repositioned = false;
    self.was_playing = now_playing;
    Ok(())
  }

  /// Emits every pending non-meta event inside `[start_seconds,
  /// end_seconds)` at its offset from the block start.
  ///
  /// Streaming is continuous: each call's start matches the previous
  /// call's end. An event resolving before `start_seconds` was due in
  /// the already-rendered previous block and is still delivered, at
  /// offset 0, rather than dropped.
  pub fn copy_to_sink(
    &mut self,
    start_seconds: f64,
    end_seconds: f64,
    sink: &mut impl MidiSink,
  ) -> core::result::Result<(), SinkError> {
    while let Some(event) = self.events.get(self.cursor) {
      let seconds = self.tempo_map.get_ticks(event.ticks).seconds;
      if seconds >= end_seconds {
        break;
      }
      if !event.is_meta() {
        let offset_seconds = (seconds - start_seconds).max(0.0);
        sink.write_midi(offset_seconds, &event.midi)?;
      }
      self.cursor += 1;
    }
    Ok(())
  }

  fn next_event_seconds(&self) -> Option<f64> {
    self
      .events
      .get(self.cursor)
      .map(|event| self.tempo_map.get_ticks(event.ticks).seconds)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tacet_midi::BlockSink;

  const FRAME_RATE: u32 = 48_000;

  fn note_on(ticks: f64, note: u8) -> Event {
    Event::new(ticks, vec![0x90, note, 0x40])
  }

  // Quarter notes on every beat at the default 120 BPM, ppqn 768: one
  // event each half second, plus a tempo meta event at tick 0.
  fn metronome() -> Sequence {
    let mut events = vec![Event::new(0.0, vec![0xff, 0x51, 3, 0x07, 0xa1, 0x20])];
    for beat in 0..16 {
      events.push(note_on(beat as f64 * 768.0, 60 + beat as u8 % 12));
    }
    Sequence::new(768.0, events)
  }

  fn block(seconds: f64) -> BlockSink {
    BlockSink::new((seconds * FRAME_RATE as f64) as u32, FRAME_RATE)
  }

  #[test]
  fn streams_events_inside_the_window() {
    let mut streamer = EventStreamer::new(metronome()).unwrap();
    streamer.reposition(0.0);

    let mut sink = block(1.0);
    streamer.copy_to_sink(0.0, 1.0, &mut sink).unwrap();

    // Beats at 0.0 and 0.5; the one at exactly 1.0 is outside the
    // half-open window.
    assert_eq!(sink.writes().len(), 2);
    assert_eq!(sink.writes()[0].frame, 0);
    assert_eq!(sink.writes()[1].frame, 24_000);
  }

  #[test]
  fn window_end_is_exclusive_and_the_next_block_continues() {
    let mut streamer = EventStreamer::new(metronome()).unwrap();
    streamer.reposition(0.0);

    let mut sink = block(1.0);
    streamer.copy_to_sink(0.0, 1.0, &mut sink).unwrap();
    sink.clear();
    streamer.copy_to_sink(1.0, 2.0, &mut sink).unwrap();

    assert_eq!(sink.writes().len(), 2);
    assert_eq!(sink.writes()[0].frame, 0);
    assert_eq!(sink.writes()[1].frame, 24_000);
  }

  #[test]
  fn meta_events_are_never_emitted() {
    let mut streamer = EventStreamer::new(metronome()).unwrap();
    streamer.reposition(0.0);

    let mut sink = block(8.0);
    streamer.copy_to_sink(0.0, 8.0, &mut sink).unwrap();

    assert!(sink.writes().iter().all(|write| write.data[0] != 0xff));
  }

  #[test]
  fn events_missed_across_a_block_boundary_are_clamped_to_offset_zero() {
    let mut streamer = EventStreamer::new(metronome()).unwrap();
    streamer.reposition(0.0);

    // The beat at 0.5 resolves before this window's start; it was due
    // in an already-rendered block and still goes out, at offset 0.
    let mut sink = block(1.0);
    streamer.copy_to_sink(0.6, 1.0, &mut sink).unwrap();

    assert_eq!(sink.writes()[0].frame, 0);
  }

  #[test]
  fn reposition_seeks_past_earlier_events() {
    let mut streamer = EventStreamer::new(metronome()).unwrap();
    streamer.reposition(5.0);

    let mut sink = block(1.0);
    streamer.stop_if_needed(true, &mut sink).unwrap();
    streamer.copy_to_sink(5.0, 6.0, &mut sink).unwrap();

    // Global sound-off on all 16 channels first, then the beats at 5.0
    // and 5.5.
    assert_eq!(sink.writes().len(), 18);
    assert_eq!(sink.writes()[0].frame, 0);
    assert_eq!(sink.writes()[0].data, vec![0xb0, 0x78, 0x00]);
    assert_eq!(sink.writes()[16].data[0], 0x90);
  }

  #[test]
  fn stopping_sends_a_global_sound_off() {
    let mut streamer = EventStreamer::new(metronome()).unwrap();
    streamer.reposition(0.0);

    let mut sink = block(1.0);
    streamer.stop_if_needed(true, &mut sink).unwrap();
    sink.clear();

    // Still playing: quiet.
    streamer.stop_if_needed(true, &mut sink).unwrap();
    assert!(sink.writes().is_empty());

    // Play -> stop edge.
    streamer.stop_if_needed(false, &mut sink).unwrap();
    assert_eq!(sink.writes().len(), 16);

    // Already stopped: quiet again.
    sink.clear();
    streamer.stop_if_needed(false, &mut sink).unwrap();
    assert!(sink.writes().is_empty());
  }

  #[test]
  fn default_streamer_is_uninitialized_and_silent() {
    let mut streamer = EventStreamer::default();
    assert!(!streamer.initialized());

    let mut sink = block(1.0);
    streamer.copy_to_sink(0.0, 1.0, &mut sink).unwrap();
    assert!(sink.writes().is_empty());
  }
}
