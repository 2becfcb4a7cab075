pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod position;
pub(crate) mod report;
pub(crate) mod tempo_map;

pub use config::TimebaseConfig;
pub use error::{Error, Result};
pub use position::{Bbt, Position};
pub use report::BbtReport;
pub use tempo_map::TempoMap;
