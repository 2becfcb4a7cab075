/// Tempo and meter in effect before the first recorded change.
#[derive(Debug, Clone)]
pub struct TimebaseConfig {
  pub beats_per_minute: f64,
  pub beats_per_bar: f64,
  pub beat_type: f64,
  pub ppqn: f64,
}

impl TimebaseConfig {
  pub const DEFAULT_BEATS_PER_MINUTE: f64 = 120.0;
  pub const DEFAULT_BEATS_PER_BAR: f64 = 4.0;
  pub const DEFAULT_BEAT_TYPE: f64 = 4.0;
  pub const DEFAULT_PPQN: f64 = 768.0;

  pub fn with_ppqn(mut self, ppqn: f64) -> Self {
    self.ppqn = ppqn;
    self
  }
}

impl Default for TimebaseConfig {
  fn default() -> Self {
    Self {
      beats_per_minute: Self::DEFAULT_BEATS_PER_MINUTE,
      beats_per_bar: Self::DEFAULT_BEATS_PER_BAR,
      beat_type: Self::DEFAULT_BEAT_TYPE,
      ppqn: Self::DEFAULT_PPQN,
    }
  }
}
