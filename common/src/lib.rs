//! Shared configuration, logging and error plumbing for the `swim-ingest` crates.
//!

mod config;
mod error;
mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;
