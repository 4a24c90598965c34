//! Recording fakes for the face collaborators.

use crate::config::Config;
use crate::face::{Collaborators, FaceCallbacks, Invalidator, SyncCallbacks, WatchFace};
use crate::render::{Background, Bounds, Frame, Renderer};
use crate::scheduler::{RedrawTimer, TimerId};
use crate::sync::{decode_map, AttemptId, DataEvent, DataLayer, DataMap, DataValue, WEATHER_PATH};
use crate::time_source::{ManualClock, TimeZoneNotifier};
use crate::weather::BuiltinIcons;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// Everything the fakes observed.
#[derive(Debug, Default)]
pub struct HostLog {
    /// Timer instances scheduled and not yet fired or cancelled
    pub pending: BTreeMap<TimerId, Duration>,
    pub scheduled: Vec<(TimerId, Duration)>,
    pub connects: usize,
    /// Every attempt handed to `connect`, oldest first
    pub attempts: Vec<AttemptId>,
    pub disconnects: usize,
    pub connected: bool,
    pub listeners: i32,
    pub puts: Vec<(String, DataMap, String)>,
    pub tz_registers: usize,
    pub tz_unregisters: usize,
    pub redraws: usize,
}

pub type Shared = Rc<RefCell<HostLog>>;

struct FakeTimer(Shared);

impl RedrawTimer for FakeTimer {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        let mut log = self.0.borrow_mut();
        log.pending.insert(id, delay);
        log.scheduled.push((id, delay));
    }

    fn cancel(&mut self, id: TimerId) {
        self.0.borrow_mut().pending.remove(&id);
    }
}

struct FakeLayer(Shared);

impl DataLayer for FakeLayer {
    fn connect(&mut self, attempt: AttemptId) {
        let mut log = self.0.borrow_mut();
        log.connects += 1;
        log.attempts.push(attempt);
        log.connected = true;
    }

    fn disconnect(&mut self) {
        let mut log = self.0.borrow_mut();
        log.disconnects += 1;
        log.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn add_listener(&mut self) {
        self.0.borrow_mut().listeners += 1;
    }

    fn remove_listener(&mut self) {
        self.0.borrow_mut().listeners -= 1;
    }

    fn put(&mut self, path: &str, payload: Vec<u8>, request_id: &str) {
        let map = decode_map(&payload).expect("face writes valid maps");
        self.0
            .borrow_mut()
            .puts
            .push((path.to_string(), map, request_id.to_string()));
    }
}

struct FakeTimeZone(Shared);

impl TimeZoneNotifier for FakeTimeZone {
    fn register(&mut self) {
        self.0.borrow_mut().tz_registers += 1;
    }

    fn unregister(&mut self) {
        self.0.borrow_mut().tz_unregisters += 1;
    }
}

struct FakeInvalidator(Shared);

impl Invalidator for FakeInvalidator {
    fn invalidate(&mut self) {
        self.0.borrow_mut().redraws += 1;
    }
}

/// What a drawn frame showed.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub time: String,
    pub am_pm: Option<&'static str>,
    pub date: String,
    pub background: Background,
    pub ambient: bool,
    pub weather: Option<(String, String)>,
    pub icon_size: Option<(u32, u32)>,
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<FrameRecord>,
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, frame: &Frame<'_>) {
        self.frames.push(FrameRecord {
            time: frame.time.text.clone(),
            am_pm: frame.time.am_pm,
            date: frame.date.clone(),
            background: frame.background,
            ambient: frame.ambient,
            weather: frame
                .weather
                .map(|b| (b.high.to_string(), b.low.to_string())),
            icon_size: frame
                .weather
                .and_then(|b| b.icon)
                .map(|i| (i.width(), i.height())),
        });
    }
}

/// `h:m:s.ms` on 2026-10-19 (a Monday), UTC.
pub fn at(h: u32, m: u32, s: u32, ms: i64) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, h, m, s)
        .unwrap()
        + chrono::Duration::milliseconds(ms)
}

/// A face wired to recording fakes.
pub struct Harness {
    pub face: WatchFace,
    pub log: Shared,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::at(at(10, 0, 0, 250))
    }

    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self::with_config(now, &Config::default())
    }

    pub fn with_config(now: DateTime<FixedOffset>, config: &Config) -> Self {
        let log = Shared::default();
        let clock = ManualClock::new(now);
        let face = WatchFace::new(
            config,
            Collaborators {
                timer: Box::new(FakeTimer(log.clone())),
                data_layer: Box::new(FakeLayer(log.clone())),
                time_zone: Box::new(FakeTimeZone(log.clone())),
                clock: Box::new(clock.clone()),
                icons: Box::new(BuiltinIcons),
                invalidator: Box::new(FakeInvalidator(log.clone())),
            },
        );
        Harness { face, log, clock }
    }

    pub fn redraws(&self) -> usize {
        self.log.borrow().redraws
    }

    pub fn pending(&self) -> Vec<(TimerId, Duration)> {
        self.log
            .borrow()
            .pending
            .iter()
            .map(|(id, d)| (*id, *d))
            .collect()
    }

    /// Fire the pending timer after its delay elapses. Returns the delay.
    pub fn fire_pending(&mut self) -> Option<Duration> {
        let (id, delay) = {
            let mut log = self.log.borrow_mut();
            let (id, delay) = log.pending.iter().next().map(|(id, d)| (*id, *d))?;
            log.pending.remove(&id);
            (id, delay)
        };
        self.clock
            .advance(chrono::Duration::from_std(delay).expect("delay fits"));
        self.face.on_timer_fired(id);
        Some(delay)
    }

    /// Most recent connection attempt, or a never-issued id if none.
    pub fn last_attempt(&self) -> AttemptId {
        self.log
            .borrow()
            .attempts
            .last()
            .copied()
            .unwrap_or(AttemptId(0))
    }

    /// Visible, interactive and connected with a listener.
    pub fn connected(mut self) -> Self {
        self.face.on_visibility_changed(true);
        let attempt = self.last_attempt();
        self.face.on_connected(attempt);
        self
    }

    pub fn deliver(&mut self, maps: &[DataMap]) {
        let events: Vec<DataEvent> = maps
            .iter()
            .map(|m| DataEvent::changed(WEATHER_PATH, m).unwrap())
            .collect();
        self.face.on_data_changed(&events);
    }

    pub fn draw(&mut self) -> FrameRecord {
        let mut renderer = RecordingRenderer::default();
        self.face.on_draw(
            &mut renderer,
            Bounds {
                width: 320,
                height: 320,
            },
        );
        renderer.frames.pop().expect("one frame drawn")
    }
}

/// Build a data map from `(key, value)` pairs.
pub fn map(pairs: Vec<(&str, DataValue)>) -> DataMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
