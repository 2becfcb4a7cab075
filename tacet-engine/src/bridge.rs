use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ringbuf::{Consumer, Producer, RingBuffer};

use tacet_midi::MidiSink;
use tacet_time::BbtReport;

use crate::data::slot::{resource_slot, SlotReader, SlotWriter};
use crate::error::{Error, Result};
use crate::streamer::EventStreamer;
use crate::transport::{Transport, TransportQuery, TransportState};

/// Wires the control thread to the real-time notification handlers.
///
/// The two halves share exactly three things, all wait-free: the
/// streamer slot, a one-deep fault channel carrying the first failure
/// raised on the real-time side, and the keep-running flag. Nothing on
/// the handler side blocks, allocates, or lets a failure escape into
/// the transport's native call stack.
pub struct TimelineBridge {
  controller: StreamController,
  handler: StreamHandler,
}

impl TimelineBridge {
  pub fn new() -> Self {
    let (streamer_writer, streamer_reader) = resource_slot();
    let (fault_tx, fault_rx) = RingBuffer::new(1).split();
    let keep_running = Arc::new(AtomicBool::new(true));

    Self {
      controller: StreamController {
        streamers: streamer_writer,
        faults: fault_rx,
        keep_running: keep_running.clone(),
      },
      handler: StreamHandler {
        streamers: streamer_reader,
        faults: fault_tx,
        keep_running,
      },
    }
  }

  pub fn split(self) -> (StreamController, StreamHandler) {
    let Self {
      controller,
      handler,
    } = self;
    (controller, handler)
  }
}

impl Default for TimelineBridge {
  fn default() -> Self {
    Self::new()
  }
}

/// Real-time half: one method per transport notification, each invoked
/// once per audio block at most.
pub struct StreamHandler {
  streamers: SlotReader<EventStreamer>,
  faults: Producer<Error>,
  keep_running: Arc<AtomicBool>,
}

impl StreamHandler {
  /// Sync notification: the transport is entering a pre-roll/seek
  /// state, so the cursor repositions to the reported time. Returns
  /// `false` after a failure.
  pub fn sync(&mut self, state: TransportState, frame: u64, frame_rate: u32) -> bool {
    self.guarded(false, |streamers| {
      if state == TransportState::Starting {
        let seconds = frame as f64 / f64::from(frame_rate);
        streamers.fetch().reposition(seconds);
      }
      Ok(true)
    })
  }

  /// Process notification: streams the events of one audio block into
  /// the block's sink. Returns `false` after a failure.
  pub fn process(
    &mut self,
    query: &TransportQuery,
    nframes: u32,
    sink: &mut impl MidiSink,
  ) -> bool {
    self.guarded(false, |streamers| {
      let now_playing = query.state == TransportState::Rolling;
      let start_seconds = query.start_seconds();
      let end_seconds = query.end_seconds(nframes);

      let streamer = streamers.fetch();
      if !streamer.initialized() {
        streamer.reposition(start_seconds);
      }
      streamer.stop_if_needed(now_playing, sink)?;
      if now_playing {
        streamer.copy_to_sink(start_seconds, end_seconds, sink)?;
      }
      Ok(true)
    })
  }

  /// Timebase notification, for when this client holds the
  /// timebase-master role: fills the BBT report for the given frame.
  pub fn timebase(&mut self, frame: u64, frame_rate: u32, report: &mut BbtReport) {
    self.guarded((), |streamers| {
      *report = streamers.fetch().tempo_map().fill_bbt(frame, frame_rate);
      Ok(())
    })
  }

  /// The external transport went away; recorded like any other
  /// real-time fault so the control thread resurfaces it.
  pub fn shutdown(&mut self) {
    self.guarded((), |_| Err(Error::TransportShutdown))
  }

  /// Runs one notification body. With a fault already pending the body
  /// is skipped and the sentinel returned, which keeps the real-time
  /// thread's execution bounded after a fault. A failing body parks its
  /// error in the fault channel and requests deactivation instead of
  /// unwinding across the callback boundary.
  fn guarded<R>(
    &mut self,
    on_error: R,
    body: impl FnOnce(&mut SlotReader<EventStreamer>) -> Result<R>,
  ) -> R {
    if self.faults.is_full() {
      return on_error;
    }
    match body(&mut self.streamers) {
      Ok(value) => value,
      Err(error) => {
        self.faults.push(error).ok();
        self.keep_running.store(false, Ordering::Release);
        on_error
      }
    }
  }
}

/// Control half: loads, publishes, and tears down.
pub struct StreamController {
  streamers: SlotWriter<EventStreamer>,
  faults: Consumer<Error>,
  keep_running: Arc<AtomicBool>,
}

impl StreamController {
  /// Publishes a freshly built streamer; the real-time side picks it up
  /// no later than its next fetch. `Error::SlotBusy` means the consumer
  /// has not advanced yet; retry on a later reload pass.
  pub fn publish(&mut self, streamer: EventStreamer) -> Result<()> {
    self.streamers.publish(streamer).map_err(|_| Error::SlotBusy)
  }

  pub fn keep_running(&self) -> bool {
    self.keep_running.load(Ordering::Acquire)
  }

  pub fn request_deactivate(&self) {
    self.keep_running.store(false, Ordering::Release);
  }

  /// Stops the transport from invoking notifications, then resurfaces
  /// the fault recorded on the real-time side, if any. A deactivation
  /// failure only surfaces when no fault is pending; the fault that
  /// made the real-time side give up comes first. Each fault is
  /// reported exactly once.
  pub fn deactivate(&mut self, transport: &mut impl Transport) -> Result<()> {
    self.keep_running.store(false, Ordering::Release);

    if let Err(error) = transport.deactivate() {
      if self.faults.is_empty() {
        return Err(error);
      }
    }

    match self.faults.pop() {
      Some(error) => Err(error),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tacet_midi::{BlockSink, Event, EventSource, Sequence, SinkError, SourceError};

  const FRAME_RATE: u32 = 48_000;
  const NFRAMES: u32 = 24_000;

  fn metronome() -> Sequence {
    let events = (0..16)
      .map(|beat| Event::new(beat as f64 * 768.0, vec![0x90, 0x40, 0x40]))
      .collect();
    Sequence::new(768.0, events)
  }

  fn rolling_at(frame: u64) -> TransportQuery {
    TransportQuery::new(TransportState::Rolling, frame, FRAME_RATE)
  }

  struct FakeTransport {
    fail: bool,
    deactivations: usize,
  }

  impl FakeTransport {
    fn new(fail: bool) -> Self {
      Self {
        fail,
        deactivations: 0,
      }
    }
  }

  impl Transport for FakeTransport {
    fn deactivate(&mut self) -> Result<()> {
      self.deactivations += 1;
      if self.fail {
        Err(Error::Transport("deactivate failed".into()))
      } else {
        Ok(())
      }
    }
  }

  struct BrokenSink;

  impl MidiSink for BrokenSink {
    fn write_midi(&mut self, _offset_seconds: f64, _data: &[u8]) -> core::result::Result<(), SinkError> {
      Err(SinkError::BufferFull)
    }
  }

  #[test]
  fn process_streams_the_published_sequence() -> anyhow::Result<()> {
    let (mut controller, mut handler) = TimelineBridge::new().split();
    controller.publish(EventStreamer::new(metronome())?)?;

    let mut sink = BlockSink::new(NFRAMES, FRAME_RATE);
    assert!(handler.process(&rolling_at(0), NFRAMES, &mut sink));

    // First use repositions, so the block opens with a global sound-off
    // and then the beat at frame 0.
    assert_eq!(sink.writes().len(), 17);
    assert_eq!(sink.writes()[16].data, vec![0x90, 0x40, 0x40]);

    sink.clear();
    assert!(handler.process(&rolling_at(NFRAMES as u64), NFRAMES, &mut sink));
    assert_eq!(sink.writes().len(), 1);
    assert_eq!(sink.writes()[0].frame, 0);

    let mut transport = FakeTransport::new(false);
    controller.deactivate(&mut transport)?;
    assert_eq!(transport.deactivations, 1);
    Ok(())
  }

  struct ScoreSource {
    fail: bool,
  }

  impl EventSource for ScoreSource {
    fn load(&mut self) -> core::result::Result<Sequence, SourceError> {
      if self.fail {
        Err(SourceError::Malformed("truncated header".into()))
      } else {
        Ok(metronome())
      }
    }
  }

  fn load_streamer(source: &mut impl EventSource) -> Result<EventStreamer> {
    let sequence = source.load()?;
    EventStreamer::new(sequence)
  }

  #[test]
  fn a_loaded_source_publishes_and_a_broken_one_fails_the_attempt() {
    let result = load_streamer(&mut ScoreSource { fail: true });
    assert!(matches!(result, Err(Error::Source(_))));

    let (mut controller, mut handler) = TimelineBridge::new().split();
    let streamer = load_streamer(&mut ScoreSource { fail: false }).unwrap();
    controller.publish(streamer).unwrap();

    let mut sink = BlockSink::new(NFRAMES, FRAME_RATE);
    assert!(handler.process(&rolling_at(0), NFRAMES, &mut sink));
    assert!(!sink.writes().is_empty());
  }

  #[test]
  fn sync_repositions_on_the_starting_state() {
    let (mut controller, mut handler) = TimelineBridge::new().split();
    controller
      .publish(EventStreamer::new(metronome()).unwrap())
      .unwrap();

    // Seek to 5.0 s, then roll from there.
    assert!(handler.sync(TransportState::Starting, 5 * FRAME_RATE as u64, FRAME_RATE));

    let mut sink = BlockSink::new(NFRAMES, FRAME_RATE);
    assert!(handler.process(&rolling_at(5 * FRAME_RATE as u64), NFRAMES, &mut sink));

    // Sound-off from the reposition, then only the beat at 5.0 s.
    assert_eq!(sink.writes().len(), 17);
    assert_eq!(sink.writes()[16].frame, 0);
  }

  #[test]
  fn sync_in_other_states_does_nothing() {
    let (_controller, mut handler) = TimelineBridge::new().split();
    assert!(handler.sync(TransportState::Rolling, 0, FRAME_RATE));
    assert!(handler.sync(TransportState::Stopped, 0, FRAME_RATE));
  }

  #[test]
  fn timebase_reports_from_the_streamer_tempo_map() {
    let (mut controller, mut handler) = TimelineBridge::new().split();
    controller
      .publish(EventStreamer::new(metronome()).unwrap())
      .unwrap();

    let mut report = BbtReport::default();
    handler.timebase(24_000, FRAME_RATE, &mut report);

    assert_eq!(report.bar, 1);
    assert_eq!(report.beat, 2);
    assert_ne!(report.valid, 0);
  }

  #[test]
  fn a_second_publish_before_any_fetch_is_refused() {
    let (mut controller, _handler) = TimelineBridge::new().split();
    controller.publish(EventStreamer::default()).unwrap();

    let result = controller.publish(EventStreamer::default());
    assert!(matches!(result, Err(Error::SlotBusy)));
  }

  #[test]
  fn a_fault_parks_the_handler_until_deactivation() {
    let (mut controller, mut handler) = TimelineBridge::new().split();
    controller
      .publish(EventStreamer::new(metronome()).unwrap())
      .unwrap();

    // The broken sink fails the first block.
    assert!(!handler.process(&rolling_at(0), NFRAMES, &mut BrokenSink));
    assert!(!controller.keep_running());

    // Every further notification is a sentinel no-op.
    assert!(!handler.sync(TransportState::Starting, 0, FRAME_RATE));
    let mut sink = BlockSink::new(NFRAMES, FRAME_RATE);
    assert!(!handler.process(&rolling_at(0), NFRAMES, &mut sink));
    assert!(sink.writes().is_empty());

    let mut untouched = BbtReport::default();
    handler.timebase(0, FRAME_RATE, &mut untouched);
    assert_eq!(untouched, BbtReport::default());

    // The fault resurfaces exactly once, on the control side.
    let mut transport = FakeTransport::new(false);
    let result = controller.deactivate(&mut transport);
    assert!(matches!(result, Err(Error::Sink(SinkError::BufferFull))));
    assert!(controller.deactivate(&mut transport).is_ok());
  }

  #[test]
  fn a_pending_fault_outranks_a_deactivation_failure() {
    let (mut controller, mut handler) = TimelineBridge::new().split();
    handler.shutdown();

    let mut transport = FakeTransport::new(true);
    let result = controller.deactivate(&mut transport);
    assert!(matches!(result, Err(Error::TransportShutdown)));
  }

  #[test]
  fn a_deactivation_failure_surfaces_when_nothing_is_pending() {
    let (mut controller, _handler) = TimelineBridge::new().split();

    let mut transport = FakeTransport::new(true);
    let result = controller.deactivate(&mut transport);
    assert!(matches!(result, Err(Error::Transport(_))));
  }

  #[test]
  fn shutdown_is_bridged_like_any_fault() {
    let (mut controller, mut handler) = TimelineBridge::new().split();
    handler.shutdown();

    assert!(!controller.keep_running());
    assert!(!handler.sync(TransportState::Starting, 0, FRAME_RATE));

    let mut transport = FakeTransport::new(false);
    let result = controller.deactivate(&mut transport);
    assert!(matches!(result, Err(Error::TransportShutdown)));
  }
}
