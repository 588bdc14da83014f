//! Event bus, flight-state reconciliation, legacy-track identity mapping and client fanout
//! for the `swim-ingest` pipeline: everything in §4 of the spec except the XML parsers
//! themselves, which live in `swim-formats`.

pub mod actors;
pub mod bus;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod state;

pub use envelope::Envelope;
pub use error::{BrokerError, FanoutError, StoreError};
pub use identity::IdentityMapper;
pub use pipeline::{spawn, Pipeline};
pub use state::{FlightState, FlightStatus, HandoffPhase};
