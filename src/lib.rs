//! # Sunshine Watch Face Core Library
//!
//! This library holds the host-agnostic core of a wearable watch face that shows
//! the time, the date and weather pushed from a companion phone. Drawing, resource
//! loading and the sync transport belong to the host; the core decides *when* to
//! draw and *what* state to draw.
//!
//! ## Design Philosophy
//!
//! ### Power Awareness
//! - **Interactive mode**: a single-pending timer redraws on every whole second
//! - **Ambient mode**: the timer is off; the host's once-per-minute tick drives
//!   redraws instead
//! - **Low-bit ambient**: text anti-aliasing is disabled while ambient on screens
//!   that cannot render it
//!
//! ### Eventual Consistency
//! Weather arrives as asynchronous key-value change batches. Each key is
//! optional; absent keys keep their previous value, and every batch causes at
//! most one redraw. Fresh data is requested with a uniquely tokenised put that
//! the sync layer cannot de-duplicate.
//!
//! ### Single Logical Thread
//! The host serializes every callback onto one queue, so the core holds plain
//! mutable state and no locks.
//!
//! ## Modules
//!
//! - [`face`]: [`WatchFace`] engine and the host callback traits
//! - [`scheduler`]: boundary-aligned redraw timer
//! - [`sync`]: companion connection lifecycle and batch decoding
//! - [`weather`]: [`WeatherSnapshot`] and condition icons
//! - [`time_source`]: clock and time-zone subscription
//! - [`render`]: frame composition and the [`render::Renderer`] trait
//! - [`host`]: tokio event queue, timer and loopback data layer
//! - [`config`]: `face-config.toml` loading

pub mod config;
pub mod face;
pub mod host;
pub mod render;
pub mod scheduler;
pub mod sync;
pub mod time_source;
pub mod weather;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use face::{FaceCallbacks, FaceMode, FaceState, SyncCallbacks, WatchFace};
pub use weather::WeatherSnapshot;
