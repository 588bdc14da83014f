//! One `ractor` actor per concurrent task named in the spec's §5 scheduling model: a broker
//! consumer per feed, the parser-dispatch stage, the domain-event router, the flight-state
//! store, the legacy-track/identity actor, and the client fanout registry.

pub mod broker;
pub mod fanout;
pub mod parser_dispatch;
pub mod router;
pub mod store;
pub mod track;
