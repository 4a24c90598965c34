//! # Watch Face Behaviour Tests
//!
//! Drives [`crate::WatchFace`] through recording fakes for every host
//! collaborator, plus a few runs of the tokio host binding. Tests are
//! deterministic: time comes from a manual clock and timer fires are
//! delivered by hand unless a test exercises the tokio timer itself.

mod fakes;
mod host_tests;
mod invariant_tests;
