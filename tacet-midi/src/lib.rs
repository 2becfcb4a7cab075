pub(crate) mod event;
pub(crate) mod sink;
pub(crate) mod source;

pub use event::{Event, META_STATUS, META_TEMPO, META_TIME_SIGNATURE};
pub use sink::{BlockSink, MidiSink, MidiWrite, SinkError, MIDI_CHANNELS};
pub use source::{EventSource, Sequence, SourceError};
