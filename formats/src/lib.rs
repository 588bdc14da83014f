//! Domain event types and STDDS/SFDPS XML parsers.
//!
//! This crate makes the link between the raw XML payloads delivered by the broker and the
//! normalized [`DomainEvent`] shapes consumed by the flight-state store. Each parser module is
//! pure: no I/O, no shared mutation, just `&str` (or a parsed [`quick_xml`] document) in,
//! `Vec<DomainEvent>` out.
//!

mod error;
mod event;
mod parsers;
mod service;

pub use error::ParseError;
pub use event::*;
pub use parsers::*;
pub use service::ServiceType;
