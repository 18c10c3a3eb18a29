//! Domain types and pure logic for the meeting-processing client.
//!
//! Nothing in this crate performs I/O. The HTTP client and the status
//! poller live in `scribe-client`.

pub mod error;
pub mod meetings;
pub mod processing;
pub mod progress;
pub mod types;
