// Stitching turns parsed dispatch records into schedule entities: stop resolution, identity
// synthesis, stop-time sequencing and shape matching.
pub(crate) mod identity;
pub(crate) mod ingest;
pub(crate) mod pattern;
pub(crate) mod resolver;
pub(crate) mod sequencer;

pub use identity::{IdentitySynthesizer, SynthesisOutcome};
pub use ingest::{DispatchListener, IngestStats};
pub use pattern::{ShapeCatalog, StopOrderPattern};
pub use resolver::StopResolver;
pub use sequencer::{AppendOutcome, append_stop_time, headsign, sequence_stop_times, sequence_trip};
