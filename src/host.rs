//! # Tokio Host Binding
//!
//! Runs a [`WatchFace`] on a single serialized event queue, the way a wearable
//! host delivers callbacks:
//!
//! - [`HostEvent`]s travel over an unbounded tokio channel and are dispatched
//!   one at a time by [`FaceRunner::run`].
//! - [`TokioTimer`] implements the redraw timer with an abortable sleeping
//!   task that posts [`HostEvent::TimerFired`] back onto the queue.
//! - [`LoopbackDataLayer`] is an in-memory data layer. It stores items,
//!   reports completions and change batches through the queue, and can hand
//!   puts to a simulated [`Companion`].
//!
//! Redraw requests set a shared dirty flag; the runner draws once after the
//! event that raised it, so several requests inside one callback coalesce.
//!
//! After [`HostEvent::Destroy`] the runner drops the face. Events still in
//! flight (a late put completion, a timer that raced the teardown) find the
//! slot empty and are logged and discarded.

use crate::face::{FaceCallbacks, Invalidator, SyncCallbacks, WatchFace};
use crate::render::{Bounds, Renderer};
use crate::scheduler::{RedrawTimer, TimerId};
use crate::sync::{
    decode_map, encode_map, AttemptId, DataEvent, DataEventKind, DataLayer, DataMap, DataValue,
    SyncError, KEY_REQUEST,
};
use crate::time_source::TimeZoneNotifier;
use crate::weather::{KEY_HIGH, KEY_LOW, KEY_WEATHER_ID};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything the host can deliver to a face.
#[derive(Debug)]
pub enum HostEvent {
    Create,
    Destroy,
    Visibility(bool),
    Ambient(bool),
    Geometry { is_round: bool },
    Properties { low_bit_ambient: bool },
    TimeTick,
    TimeZoneChanged,
    Use24Hour(bool),
    TimerFired(TimerId),
    Connected(AttemptId),
    ConnectionSuspended(i32),
    ConnectionFailed {
        attempt: AttemptId,
        error: SyncError,
    },
    DataChanged(Vec<DataEvent>),
    PutCompleted {
        request_id: String,
        result: Result<(), SyncError>,
    },
}

pub type EventSender = mpsc::UnboundedSender<HostEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<HostEvent>;

/// Create the serialized host queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

fn post(events: &EventSender, event: HostEvent) {
    if let Err(e) = events.send(event) {
        log::debug!("Host queue closed, dropping {:?}", e.0);
    }
}

/// Shared "redraw requested" flag.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Invalidator for DirtyFlag {
    fn invalidate(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Redraw timer backed by tokio sleeps. Must be used inside a runtime.
pub struct TokioTimer {
    events: EventSender,
    pending: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(events: EventSender) -> Self {
        TokioTimer {
            events,
            pending: HashMap::new(),
        }
    }
}

impl RedrawTimer for TokioTimer {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.pending.retain(|_, handle| !handle.is_finished());
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            post(&events, HostEvent::TimerFired(id));
        });
        self.pending.insert(id, handle);
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.pending.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

/// Time-zone notifier for hosts without a change source; only logs.
#[derive(Debug, Default)]
pub struct LoggingTimeZoneNotifier;

impl TimeZoneNotifier for LoggingTimeZoneNotifier {
    fn register(&mut self) {
        log::debug!("Time zone receiver registered");
    }

    fn unregister(&mut self) {
        log::debug!("Time zone receiver unregistered");
    }
}

/// Simulated companion device answering data-layer puts.
pub trait Companion {
    /// React to an item written by the face. Returned items are stored and
    /// delivered as one change batch.
    fn on_item(&mut self, path: &str, map: &DataMap) -> Vec<(String, DataMap)>;
}

/// Companion that answers every weather request with fixed values.
#[derive(Debug, Clone)]
pub struct CannedWeather {
    pub high: String,
    pub low: String,
    pub condition_id: i64,
}

impl Companion for CannedWeather {
    fn on_item(&mut self, path: &str, map: &DataMap) -> Vec<(String, DataMap)> {
        if !map.contains_key(KEY_REQUEST) {
            return Vec::new();
        }
        let mut reply = DataMap::new();
        reply.insert(KEY_HIGH.to_string(), DataValue::from(self.high.as_str()));
        reply.insert(KEY_LOW.to_string(), DataValue::from(self.low.as_str()));
        reply.insert(KEY_WEATHER_ID.to_string(), DataValue::Int(self.condition_id));
        vec![(path.to_string(), reply)]
    }
}

/// In-memory data layer delivering results through the host queue.
pub struct LoopbackDataLayer {
    events: EventSender,
    connected: bool,
    listening: bool,
    available: bool,
    items: BTreeMap<String, Vec<u8>>,
    companion: Option<Box<dyn Companion>>,
}

impl LoopbackDataLayer {
    pub fn new(events: EventSender) -> Self {
        LoopbackDataLayer {
            events,
            connected: false,
            listening: false,
            available: true,
            items: BTreeMap::new(),
            companion: None,
        }
    }

    pub fn with_companion(mut self, companion: Box<dyn Companion>) -> Self {
        self.companion = Some(companion);
        self
    }

    /// Simulate a device without a reachable sync service.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    fn store(&mut self, path: &str, payload: Vec<u8>) -> DataEvent {
        self.items.insert(path.to_string(), payload.clone());
        DataEvent {
            kind: DataEventKind::Changed,
            path: path.to_string(),
            payload,
        }
    }

    fn companion_replies(&mut self, path: &str, payload: &[u8]) -> Vec<DataEvent> {
        let Some(companion) = self.companion.as_mut() else {
            return Vec::new();
        };
        let map = match decode_map(payload) {
            Ok(map) => map,
            Err(e) => {
                log::warn!("Companion could not read {}: {}", path, e);
                return Vec::new();
            }
        };
        let replies = companion.on_item(path, &map);
        let mut events = Vec::with_capacity(replies.len());
        for (reply_path, reply) in replies {
            match encode_map(&reply) {
                Ok(bytes) => events.push(self.store(&reply_path, bytes)),
                Err(e) => log::warn!("Companion reply not encodable: {}", e),
            }
        }
        events
    }
}

impl DataLayer for LoopbackDataLayer {
    fn connect(&mut self, attempt: AttemptId) {
        if self.available {
            self.connected = true;
            post(&self.events, HostEvent::Connected(attempt));
        } else {
            post(
                &self.events,
                HostEvent::ConnectionFailed {
                    attempt,
                    error: SyncError::ConnectionFailed("sync service unavailable".to_string()),
                },
            );
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.listening = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn add_listener(&mut self) {
        self.listening = true;
    }

    fn remove_listener(&mut self) {
        self.listening = false;
    }

    fn put(&mut self, path: &str, payload: Vec<u8>, request_id: &str) {
        if !self.connected {
            post(
                &self.events,
                HostEvent::PutCompleted {
                    request_id: request_id.to_string(),
                    result: Err(SyncError::NotConnected),
                },
            );
            return;
        }

        let unchanged = self.items.get(path) == Some(&payload);
        let own = self.store(path, payload.clone());
        post(
            &self.events,
            HostEvent::PutCompleted {
                request_id: request_id.to_string(),
                result: Ok(()),
            },
        );
        if unchanged {
            // Identical content: the layer reports nothing new.
            return;
        }

        let mut batch = vec![own];
        batch.extend(self.companion_replies(path, &payload));
        if self.listening {
            post(&self.events, HostEvent::DataChanged(batch));
        }
    }
}

/// Dispatches host events to a face, one at a time.
pub struct FaceRunner<R: Renderer> {
    face: Option<WatchFace>,
    events: EventReceiver,
    renderer: R,
    bounds: Bounds,
    dirty: DirtyFlag,
}

impl<R: Renderer> FaceRunner<R> {
    /// `dirty` must be the invalidator the face was built with.
    pub fn new(
        face: WatchFace,
        events: EventReceiver,
        renderer: R,
        bounds: Bounds,
        dirty: DirtyFlag,
    ) -> Self {
        FaceRunner {
            face: Some(face),
            events,
            renderer,
            bounds,
            dirty,
        }
    }

    /// Process events until every sender is gone. Returns the renderer.
    pub async fn run(mut self) -> R {
        while let Some(event) = self.events.recv().await {
            self.dispatch(event);
        }
        log::debug!("Host queue drained");
        self.renderer
    }

    /// Dispatch every event already queued, without waiting for more.
    /// Returns how many were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Handle one event and draw if it requested a redraw.
    pub fn dispatch(&mut self, event: HostEvent) {
        let Some(face) = self.face.as_mut() else {
            log::debug!("Face torn down, discarding {:?}", event);
            return;
        };

        match event {
            HostEvent::Create => face.on_create(),
            HostEvent::Destroy => {
                face.on_destroy();
                self.face = None;
                self.dirty.take();
                return;
            }
            HostEvent::Visibility(visible) => face.on_visibility_changed(visible),
            HostEvent::Ambient(ambient) => face.on_ambient_mode_changed(ambient),
            HostEvent::Geometry { is_round } => face.on_apply_geometry(is_round),
            HostEvent::Properties { low_bit_ambient } => {
                face.on_properties_changed(low_bit_ambient)
            }
            HostEvent::TimeTick => face.on_time_tick(),
            HostEvent::TimeZoneChanged => face.on_time_zone_changed(),
            HostEvent::Use24Hour(enabled) => face.set_use_24_hour(enabled),
            HostEvent::TimerFired(id) => face.on_timer_fired(id),
            HostEvent::Connected(attempt) => face.on_connected(attempt),
            HostEvent::ConnectionSuspended(cause) => face.on_connection_suspended(cause),
            HostEvent::ConnectionFailed { attempt, error } => {
                face.on_connection_failed(attempt, error)
            }
            HostEvent::DataChanged(batch) => face.on_data_changed(&batch),
            HostEvent::PutCompleted { request_id, result } => {
                face.on_put_result(&request_id, result)
            }
        }

        if self.dirty.take() && face.state().visible {
            face.on_draw(&mut self.renderer, self.bounds);
        }
    }

    pub fn face(&self) -> Option<&WatchFace> {
        self.face.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}
