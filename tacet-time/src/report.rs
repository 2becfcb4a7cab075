/// Timebase-master output for one transport frame: the BBT coordinates
/// of the nearest whole tick at or after the frame, the tempo and meter
/// there, and the fractional frame offset between that tick and the
/// exact frame time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BbtReport {
  pub bar: i32,
  pub beat: i32,
  pub tick: i32,
  pub beats_per_bar: f64,
  pub beat_type: f64,
  pub ticks_per_beat: f64,
  pub beats_per_minute: f64,
  pub bar_start_tick: f64,
  pub offset_frames: f64,
  pub valid: u32,
}

impl BbtReport {
  pub const VALID_BBT: u32 = 1 << 0;
  pub const VALID_OFFSET: u32 = 1 << 1;
}
