use crate::config::TimebaseConfig;

/// Backward drift below this threshold is treated as block-boundary
/// float jitter, not as a seek.
pub(crate) const EPSILON: f64 = 1e-9;

const MICROSECONDS_PER_MINUTE: f64 = 6.0e7;

/// Musical position as bar:beat:tick. Bars and beats start at 1.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Bbt {
  pub bar: i32,
  pub beat: i32,
  pub tick: f64,
}

impl Bbt {
  pub fn new(bar: i32, beat: i32, tick: f64) -> Self {
    Self { bar, beat, tick }
  }

  pub fn last_bar_start(&self) -> Self {
    Self::new(self.bar, 1, 0.0)
  }
}

/// One instant of musical time in all three coordinate systems at once,
/// together with the tempo and meter in effect at that instant.
///
/// Positions only move forward. Setting a coordinate behind the current
/// one is a silent no-op so that small backward drift between audio
/// blocks stays harmless.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
  pub seconds: f64,
  pub ticks: f64,
  pub bbt: Bbt,
  pub beats_per_bar: f64,
  pub beat_type: f64,
  pub ticks_per_beat: f64,
  pub beats_per_minute: f64,
  pub microseconds_per_quarter: f64,
  pub beats_per_quarter: f64,
  pub ppqn: f64,
}

impl Default for Position {
  fn default() -> Self {
    Self::with_config(&TimebaseConfig::default())
  }
}

impl Position {
  pub const INITIAL_BAR: i32 = 1;
  pub const INITIAL_BEAT: i32 = 1;

  pub fn with_config(config: &TimebaseConfig) -> Self {
    Self {
      seconds: 0.0,
      ticks: 0.0,
      bbt: Bbt::new(Self::INITIAL_BAR, Self::INITIAL_BEAT, 0.0),
      beats_per_bar: config.beats_per_bar,
      beat_type: config.beat_type,
      ticks_per_beat: config.ppqn,
      beats_per_minute: config.beats_per_minute,
      microseconds_per_quarter: MICROSECONDS_PER_MINUTE / config.beats_per_minute,
      beats_per_quarter: 1.0,
      ppqn: config.ppqn,
    }
  }

  pub fn set_to_seconds(&mut self, seconds: f64) {
    if seconds < self.seconds {
      return;
    }
    self.increment_by_seconds(seconds - self.seconds);
  }

  pub fn set_to_ticks(&mut self, ticks: f64) {
    if ticks < self.ticks {
      return;
    }
    self.increment_by_ticks(ticks - self.ticks);
  }

  pub fn set_to_bbt(&mut self, bbt: &Bbt) {
    let bars = f64::from(bbt.bar - self.bbt.bar);
    let beats = f64::from(bbt.beat - self.bbt.beat);
    let ticks = (bars * self.beats_per_bar + beats) * self.ticks_per_beat
      + (bbt.tick - self.bbt.tick);
    if ticks <= 0.0 {
      return;
    }
    self.increment_by_ticks(ticks);
  }

  pub fn increment_by_seconds(&mut self, seconds: f64) {
    let ticks = self.seconds_to_ticks(seconds);
    self.increment_by_ticks(ticks);
  }

  pub fn increment_by_ticks(&mut self, ticks: f64) {
    assert!(ticks >= 0.0, "positions only move forward");

    self.seconds += self.ticks_to_seconds(ticks);
    self.ticks += ticks;

    // Decompose the accumulated bbt tick into whole beats and a
    // fractional tick remainder, then fold whole beats into beats and
    // bars. Multi-bar jumps resolve with div/mod, not bar by bar.
    let beats = (self.bbt.tick + ticks) / self.ticks_per_beat;
    let beat_increment = beats.floor();
    self.bbt.tick = (beats - beat_increment) * self.ticks_per_beat;

    let beats_per_bar = self.beats_per_bar as i64;
    let beat = i64::from(self.bbt.beat - Self::INITIAL_BEAT) + beat_increment as i64;
    self.bbt.bar += (beat / beats_per_bar) as i32;
    self.bbt.beat = (beat % beats_per_bar) as i32 + Self::INITIAL_BEAT;
  }

  /// Advances to the next integral tick boundary.
  pub fn round_up(&mut self) {
    let difference = self.bbt.tick.ceil() - self.bbt.tick;
    self.increment_by_ticks(difference);
  }

  /// Relabels the current instant as a bar start, opening a new bar
  /// unless it already is one.
  pub fn start_new_bar(&mut self) {
    if self.bbt.beat != Self::INITIAL_BEAT || self.bbt.tick > EPSILON {
      self.bbt.bar += 1;
      self.bbt.beat = Self::INITIAL_BEAT;
    }
    self.bbt.tick = 0.0;
  }

  pub fn ppqn_change(&mut self, ppqn: f64) {
    self.ppqn = ppqn;
    self.ticks_per_beat = ppqn / self.beats_per_quarter;
  }

  /// Time signature changes always begin a bar. The number of written
  /// 32nd notes per MIDI quarter determines how many beats one quarter
  /// note spans.
  pub fn time_signature_change(
    &mut self,
    numerator: f64,
    denominator: f64,
    _clocks_per_click: f64,
    thirty_seconds_per_quarter: f64,
  ) {
    self.start_new_bar();
    self.beats_per_bar = numerator;
    self.beat_type = denominator;
    self.beats_per_quarter = thirty_seconds_per_quarter * denominator / 32.0;
    self.ticks_per_beat = self.ppqn / self.beats_per_quarter;
    let quarters_per_minute = MICROSECONDS_PER_MINUTE / self.microseconds_per_quarter;
    self.beats_per_minute = quarters_per_minute * self.beats_per_quarter;
  }

  pub fn tempo_change(&mut self, microseconds_per_quarter: f64) {
    self.microseconds_per_quarter = microseconds_per_quarter;
    let quarters_per_minute = MICROSECONDS_PER_MINUTE / microseconds_per_quarter;
    self.beats_per_minute = quarters_per_minute * self.beats_per_quarter;
  }

  pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
    seconds * self.beats_per_minute / 60.0 * self.ticks_per_beat
  }

  pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
    ticks / self.ticks_per_beat * 60.0 / self.beats_per_minute
  }
}
