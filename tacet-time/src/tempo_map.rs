use tacet_midi::{Event, META_TEMPO, META_TIME_SIGNATURE};

use crate::config::TimebaseConfig;
use crate::error::{Error, Result};
use crate::position::{Bbt, Position, EPSILON};
use crate::report::BbtReport;

/// Ordered breakpoints recording every tempo and time-signature change,
/// plus a working position that replays events as they are acknowledged.
///
/// Breakpoint 0 always exists and carries the configured default tempo
/// and meter. Breakpoints are append-only in strictly increasing tick
/// order; an equal tick replaces the last breakpoint instead of
/// duplicating it.
#[derive(Debug, Clone)]
pub struct TempoMap {
  positions: Vec<Position>,
  state: Position,
}

impl Default for TempoMap {
  fn default() -> Self {
    Self::new(TimebaseConfig::default())
  }
}

impl TempoMap {
  pub fn new(config: TimebaseConfig) -> Self {
    let first = Position::with_config(&config);
    Self {
      positions: vec![first.clone()],
      state: first,
    }
  }

  /// Replays one event into the map. Must be called with ticks in
  /// non-decreasing order. Only meta tempo and time-signature events
  /// produce breakpoints; malformed meta payloads are logged and
  /// skipped so playback continues under the prior tempo and meter.
  pub fn acknowledge_event(&mut self, event: &Event) -> Result<()> {
    self.state.set_to_ticks(event.ticks);

    match event.meta_type() {
      Some(META_TEMPO) => match event.meta_payload() {
        Some(&[high, mid, low]) => {
          let microseconds = f64::from(u32::from_be_bytes([0, high, mid, low]));
          self.state.tempo_change(microseconds);
          let breakpoint = self.state.clone();
          self.append(breakpoint)?;
        }
        _ => log::warn!("ignoring malformed tempo meta event at tick {}", event.ticks),
      },
      Some(META_TIME_SIGNATURE) => match event.meta_payload() {
        // A zero numerator or zero 32nds-per-quarter would zero out
        // beats_per_bar or ticks_per_beat and poison every later
        // decomposition; denominators beyond 2^7 are equally garbage.
        Some(&[numerator, denominator_log2, clocks_per_click, thirty_seconds])
          if numerator > 0 && thirty_seconds > 0 && denominator_log2 <= 7 =>
        {
          let denominator = 2f64.powi(i32::from(denominator_log2));
          self.state.time_signature_change(
            f64::from(numerator),
            denominator,
            f64::from(clocks_per_click),
            f64::from(thirty_seconds),
          );
          let breakpoint = self.state.clone();
          self.append(breakpoint)?;
        }
        _ => log::warn!(
          "ignoring malformed time signature meta event at tick {}",
          event.ticks
        ),
      },
      _ => {}
    }

    Ok(())
  }

  pub fn append(&mut self, position: Position) -> Result<()> {
    match self.positions.last_mut() {
      None => self.positions.push(position),
      Some(last) if position.ticks > last.ticks + EPSILON => self.positions.push(position),
      Some(last) if position.ticks >= last.ticks - EPSILON => *last = position,
      Some(last) => {
        return Err(Error::BreakpointOrder {
          last: last.ticks,
          ticks: position.ticks,
        })
      }
    }
    Ok(())
  }

  /// Full coordinates at an absolute time in seconds.
  pub fn get_seconds(&self, seconds: f64) -> Position {
    let index = self.positions.partition_point(|p| p.seconds <= seconds);
    let mut position = self.positions[index.saturating_sub(1)].clone();
    position.set_to_seconds(seconds);
    position
  }

  /// Full coordinates at an absolute tick.
  pub fn get_ticks(&self, ticks: f64) -> Position {
    let index = self.positions.partition_point(|p| p.ticks <= ticks);
    let mut position = self.positions[index.saturating_sub(1)].clone();
    position.set_to_ticks(ticks);
    position
  }

  /// Full coordinates at a bar:beat:tick position.
  pub fn get_bbt(&self, bbt: &Bbt) -> Position {
    let index = self.positions.partition_point(|p| p.bbt <= *bbt);
    let mut position = self.positions[index.saturating_sub(1)].clone();
    position.set_to_bbt(bbt);
    position
  }

  /// BBT coordinates for a transport frame, quantized up to a whole
  /// tick. The start of the enclosing bar is resolved independently so
  /// the consumer can anchor the bar, and the gap between the reported
  /// tick and the exact frame time comes back as fractional frames.
  pub fn fill_bbt(&self, frame: u64, frame_rate: u32) -> BbtReport {
    let seconds = frame as f64 / f64::from(frame_rate);
    let mut position = self.get_seconds(seconds);
    position.round_up();
    let bar_start = self.get_bbt(&position.bbt.last_bar_start());

    BbtReport {
      bar: position.bbt.bar,
      beat: position.bbt.beat,
      tick: position.bbt.tick.round() as i32,
      beats_per_bar: position.beats_per_bar,
      beat_type: position.beat_type,
      ticks_per_beat: position.ticks_per_beat,
      beats_per_minute: position.beats_per_minute,
      bar_start_tick: bar_start.ticks,
      offset_frames: (position.seconds - seconds) * f64::from(frame_rate),
      valid: BbtReport::VALID_BBT | BbtReport::VALID_OFFSET,
    }
  }
}
