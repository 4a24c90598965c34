//! # Watch Face Engine
//!
//! [`WatchFace`] owns the mode state and reacts to host callbacks. The host
//! binding drives it through two traits: [`FaceCallbacks`] for lifecycle,
//! timer and time-zone events, and [`SyncCallbacks`] for the companion data
//! layer. All callbacks are expected on one serialized queue, so nothing here
//! locks.
//!
//! ## Modes
//!
//! ```text
//!                 visible            ambient on
//!   Hidden  ─────────────────▶ VisibleInteractive ◀──────▶ VisibleAmbient
//!           ◀─────────────────                      ambient off
//!                 hidden
//! ```
//!
//! - **Become visible**: connect sync, register for time-zone changes,
//!   resync the clock.
//! - **Become hidden**: unregister time-zone changes, drop listener and
//!   connection.
//! - **Ambient toggle**: on low-bit-ambient screens text anti-aliasing is off
//!   while ambient.
//!
//! The scheduler is re-evaluated after every visibility and ambient callback
//! and runs iff `visible && !ambient`. Each transition requests one redraw.

use crate::config::{Config, DisplayConfig};
use crate::render::{compose, Bounds, Renderer, TextPaints};
use crate::scheduler::{RedrawTimer, RenderScheduler, TimerId};
use crate::sync::{AttemptId, ConnectionState, DataEvent, DataLayer, SyncChannel, SyncError};
use crate::time_source::{TimeSource, TimeZoneNotifier, TimeZoneSubscription};
use crate::weather::{IconSource, WeatherSnapshot};
use std::time::Duration;

/// Host hook that schedules a call to `on_draw`.
pub trait Invalidator {
    fn invalidate(&mut self);
}

/// Aggregate mode state read by the scheduler and the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceState {
    pub visible: bool,
    pub ambient: bool,
    pub low_bit_ambient: bool,
    pub is_round: bool,
}

/// Coarse lifecycle mode derived from [`FaceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceMode {
    Hidden,
    VisibleInteractive,
    VisibleAmbient,
}

impl FaceState {
    pub fn mode(&self) -> FaceMode {
        match (self.visible, self.ambient) {
            (false, _) => FaceMode::Hidden,
            (true, false) => FaceMode::VisibleInteractive,
            (true, true) => FaceMode::VisibleAmbient,
        }
    }
}

/// Host lifecycle callbacks.
pub trait FaceCallbacks {
    fn on_create(&mut self);
    fn on_destroy(&mut self);
    fn on_visibility_changed(&mut self, visible: bool);
    fn on_ambient_mode_changed(&mut self, ambient: bool);
    fn on_apply_geometry(&mut self, is_round: bool);
    fn on_properties_changed(&mut self, low_bit_ambient: bool);
    /// Once-per-minute pulse delivered while ambient.
    fn on_time_tick(&mut self);
    fn on_draw(&mut self, renderer: &mut dyn Renderer, bounds: Bounds);
    fn on_timer_fired(&mut self, id: TimerId);
    fn on_time_zone_changed(&mut self);
}

/// Companion data-layer callbacks.
pub trait SyncCallbacks {
    fn on_connected(&mut self, attempt: AttemptId);
    fn on_connection_suspended(&mut self, cause: i32);
    fn on_connection_failed(&mut self, attempt: AttemptId, error: SyncError);
    fn on_data_changed(&mut self, events: &[DataEvent]);
    fn on_put_result(&mut self, request_id: &str, result: Result<(), SyncError>);
}

/// Host-provided collaborators.
pub struct Collaborators {
    pub timer: Box<dyn RedrawTimer>,
    pub data_layer: Box<dyn DataLayer>,
    pub time_zone: Box<dyn TimeZoneNotifier>,
    pub clock: Box<dyn TimeSource>,
    pub icons: Box<dyn IconSource>,
    pub invalidator: Box<dyn Invalidator>,
}

/// The watch face engine.
pub struct WatchFace {
    state: FaceState,
    scheduler: RenderScheduler,
    sync: SyncChannel,
    weather: WeatherSnapshot,
    clock: Box<dyn TimeSource>,
    time_zone: Box<dyn TimeZoneNotifier>,
    tz_subscription: TimeZoneSubscription,
    icons: Box<dyn IconSource>,
    invalidator: Box<dyn Invalidator>,
    paints: TextPaints,
    display: DisplayConfig,
    use_24_hour: bool,
    destroyed: bool,
}

impl WatchFace {
    pub fn new(config: &Config, parts: Collaborators) -> Self {
        let period = Duration::from_millis(config.scheduler.interactive_update_ms);
        WatchFace {
            state: FaceState::default(),
            scheduler: RenderScheduler::new(parts.timer, period),
            sync: SyncChannel::new(parts.data_layer, config.sync.weather_path.clone()),
            weather: WeatherSnapshot::new(),
            clock: parts.clock,
            time_zone: parts.time_zone,
            tz_subscription: TimeZoneSubscription::new(),
            icons: parts.icons,
            invalidator: parts.invalidator,
            paints: TextPaints::new(config.display.sizes(false)),
            display: config.display.clone(),
            use_24_hour: config.display.use_24_hour,
            destroyed: false,
        }
    }

    pub fn state(&self) -> FaceState {
        self.state
    }

    pub fn mode(&self) -> FaceMode {
        self.state.mode()
    }

    pub fn weather(&self) -> &WeatherSnapshot {
        &self.weather
    }

    pub fn paints(&self) -> &TextPaints {
        &self.paints
    }

    pub fn is_timer_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.sync.state()
    }

    pub fn is_listening(&self) -> bool {
        self.sync.is_listening()
    }

    pub fn is_time_zone_registered(&self) -> bool {
        self.tz_subscription.is_registered()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Host 12/24-hour preference.
    pub fn set_use_24_hour(&mut self, use_24_hour: bool) {
        if self.use_24_hour != use_24_hour {
            self.use_24_hour = use_24_hour;
            self.invalidator.invalidate();
        }
    }

    /// Ask the companion for fresh weather now.
    pub fn request_weather(&mut self) -> Option<String> {
        if self.destroyed {
            return None;
        }
        match self.sync.trigger() {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("Weather request not sent: {}", e);
                None
            }
        }
    }

    fn update_timer(&mut self) {
        self.scheduler.on_mode_changed(self.state.visible, self.state.ambient);
    }

    fn resync_clock(&mut self) {
        self.clock.resync();
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Late callbacks after teardown are dropped here.
    fn inert(&self, what: &str) -> bool {
        if self.destroyed {
            log::debug!("Ignoring {} after teardown", what);
        }
        self.destroyed
    }
}

impl FaceCallbacks for WatchFace {
    fn on_create(&mut self) {
        if self.inert("create") {
            return;
        }
        self.paints = TextPaints::new(self.display.sizes(self.state.is_round));
        self.resync_clock();
        log::info!("Watch face created");
    }

    fn on_destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.scheduler.disarm();
        self.tz_subscription.unregister(self.time_zone.as_mut());
        self.sync.disconnect();
        self.state.visible = false;
        self.destroyed = true;
        log::info!("Watch face destroyed");
    }

    fn on_visibility_changed(&mut self, visible: bool) {
        if self.inert("visibility change") {
            return;
        }
        if visible == self.state.visible {
            self.update_timer();
            return;
        }
        self.state.visible = visible;

        if visible {
            self.sync.connect();
            self.tz_subscription.register(self.time_zone.as_mut());
            self.resync_clock();
        } else {
            self.tz_subscription.unregister(self.time_zone.as_mut());
            self.sync.disconnect();
        }
        log::info!("Face now {:?}", self.state.mode());

        self.update_timer();
        self.invalidator.invalidate();
    }

    fn on_ambient_mode_changed(&mut self, ambient: bool) {
        if self.inert("ambient change") {
            return;
        }
        if ambient != self.state.ambient {
            self.state.ambient = ambient;
            // Restoring unconditionally also covers a low-bit flag that
            // changed while ambient.
            let anti_alias = !(ambient && self.state.low_bit_ambient);
            self.paints.set_anti_alias(anti_alias);
            log::debug!("Face now {:?}", self.state.mode());
            self.invalidator.invalidate();
        }
        self.update_timer();
    }

    fn on_apply_geometry(&mut self, is_round: bool) {
        if self.inert("geometry") {
            return;
        }
        self.state.is_round = is_round;
        self.paints.apply_sizes(self.display.sizes(is_round));
    }

    fn on_properties_changed(&mut self, low_bit_ambient: bool) {
        if self.inert("properties") {
            return;
        }
        self.state.low_bit_ambient = low_bit_ambient;
    }

    fn on_time_tick(&mut self) {
        if self.inert("time tick") {
            return;
        }
        self.invalidator.invalidate();
    }

    fn on_draw(&mut self, renderer: &mut dyn Renderer, bounds: Bounds) {
        if self.inert("draw") {
            return;
        }
        let now = self.clock.now();
        let frame = compose(
            &self.state,
            &self.weather,
            &self.paints,
            &now,
            self.use_24_hour,
            bounds,
        );
        renderer.draw(&frame);
    }

    fn on_timer_fired(&mut self, id: TimerId) {
        if self.inert("timer fire") {
            return;
        }
        let now_ms = self.now_ms();
        if self
            .scheduler
            .tick(id, self.state.visible, self.state.ambient, now_ms)
        {
            self.invalidator.invalidate();
        }
    }

    fn on_time_zone_changed(&mut self) {
        if self.inert("time zone change") {
            return;
        }
        self.resync_clock();
    }
}

impl SyncCallbacks for WatchFace {
    fn on_connected(&mut self, attempt: AttemptId) {
        if self.inert("connection") {
            return;
        }
        self.sync.on_connected(attempt);
    }

    fn on_connection_suspended(&mut self, cause: i32) {
        if self.inert("connection suspended") {
            return;
        }
        self.sync.on_connection_suspended(cause);
    }

    fn on_connection_failed(&mut self, attempt: AttemptId, error: SyncError) {
        if self.inert("connection failure") {
            return;
        }
        self.sync.on_connection_failed(attempt, &error);
    }

    fn on_data_changed(&mut self, events: &[DataEvent]) {
        if self.inert("data change") {
            return;
        }
        let batch = self.sync.weather_batch(events);
        if batch.matched == 0 {
            return;
        }
        let icon_height = self.paints.temp_high.size;
        for update in &batch.updates {
            self.weather.apply(update, self.icons.as_ref(), icon_height);
        }
        self.invalidator.invalidate();
    }

    fn on_put_result(&mut self, request_id: &str, result: Result<(), SyncError>) {
        if self.inert("put result") {
            return;
        }
        self.sync.on_put_result(request_id, &result);
    }
}
