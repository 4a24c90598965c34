//! # Wall-Clock Time and Time-Zone State
//!
//! The face asks a [`TimeSource`] for the current instant on every draw. The
//! UTC offset is resolved for each instant, so daylight-saving switches apply
//! without a resync. `resync` runs when the host reports a time-zone change
//! or the face becomes visible.
//!
//! [`TimeZoneSubscription`] guards registration with the host's time-zone
//! change notifier so repeated visibility toggles never register or
//! unregister twice.

use chrono::{DateTime, FixedOffset, Local, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Supplies the current instant in the face's time zone.
pub trait TimeSource {
    /// Current instant, carrying the UTC offset in effect at that instant.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Re-read the system time zone and the current instant.
    fn resync(&mut self);
}

/// Resolves the UTC offset in effect at an instant.
pub type ZoneRule = fn(&DateTime<Utc>) -> FixedOffset;

fn local_offset(instant: &DateTime<Utc>) -> FixedOffset {
    *instant.with_timezone(&Local).offset()
}

/// System clock, `chrono::Local` unless built with another zone rule.
#[derive(Clone)]
pub struct SystemClock {
    zone: ZoneRule,
    /// Offset seen at the last resync, for logging zone changes
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_zone(local_offset)
    }

    pub fn with_zone(zone: ZoneRule) -> Self {
        SystemClock {
            zone,
            offset: zone(&Utc::now()),
        }
    }

    /// `instant` in the zone's local time.
    pub fn local_time(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&(self.zone)(&instant))
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.local_time(Utc::now())
    }

    fn resync(&mut self) {
        let offset = (self.zone)(&Utc::now());
        if offset != self.offset {
            log::info!("Time zone offset changed: {} -> {}", self.offset, offset);
        }
        self.offset = offset;
    }
}

/// Clock whose instant is set explicitly.
///
/// Clones share the same instant, so a handle kept outside the face can move
/// time forward after the clock has been handed over.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<FixedOffset>,
    resyncs: usize,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        ManualClock {
            inner: Arc::new(Mutex::new(ManualState { now, resyncs: 0 })),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        self.lock().now = now;
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut state = self.lock();
        state.now += delta;
    }

    /// Number of times [`TimeSource::resync`] was called.
    pub fn resyncs(&self) -> usize {
        self.lock().resyncs
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // The state is plain data; a poisoned lock still holds a usable value.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.lock().now
    }

    fn resync(&mut self) {
        self.lock().resyncs += 1;
    }
}

/// Host hook delivering time-zone-change notifications.
pub trait TimeZoneNotifier {
    fn register(&mut self);
    fn unregister(&mut self);
}

/// Idempotent registration guard around a [`TimeZoneNotifier`].
#[derive(Debug, Default)]
pub struct TimeZoneSubscription {
    registered: bool,
}

impl TimeZoneSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Register with the notifier unless already registered.
    /// Returns true if a registration was issued.
    pub fn register(&mut self, notifier: &mut dyn TimeZoneNotifier) -> bool {
        if self.registered {
            return false;
        }
        self.registered = true;
        notifier.register();
        true
    }

    /// Unregister from the notifier if registered.
    /// Returns true if an unregistration was issued.
    pub fn unregister(&mut self, notifier: &mut dyn TimeZoneNotifier) -> bool {
        if !self.registered {
            return false;
        }
        self.registered = false;
        notifier.unregister();
        true
    }
}
