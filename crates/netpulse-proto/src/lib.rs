// netpulse-proto: Wire format and transport for netpulse telemetry (agent side + collector side)

pub mod codec;
pub mod collector;
pub mod error;
pub mod sample;
pub mod session;

pub use codec::SampleCodec;
pub use collector::{ClientEntry, ClientRegistry, CollectorServer};
pub use error::ProtoError;
pub use sample::Sample;
pub use session::{SessionConfig, TransportSession};
