//! HTTP client and status poller for the meeting-processing backend.
//!
//! [`api::BackendApi`] wraps the backend's REST endpoints.
//! [`session::Session`] carries the bearer token explicitly from sign-in
//! to sign-out. [`poller::StatusPoller`] drives the processing-status
//! poll loop as a cancellable task and reports [`events::PollEvent`]s.

pub mod api;
pub mod config;
pub mod events;
pub mod poller;
pub mod session;
