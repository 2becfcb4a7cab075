use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("tempo map breakpoint at tick {ticks} is behind the last breakpoint at tick {last}")]
  BreakpointOrder { last: f64, ticks: f64 },
}
