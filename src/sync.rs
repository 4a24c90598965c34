//! # Companion Data Sync
//!
//! This module reconciles weather items pushed by the companion device. The
//! transport itself lives behind the [`DataLayer`] trait; this side only
//! tracks the connection lifecycle, decodes change batches and issues
//! "send me fresh data" requests.
//!
//! ## Wire Contract
//!
//! - **Path**: `/weather`
//! - **Weather keys**: `KEY_MAX_TEMP` (string), `KEY_MIN_TEMP` (string),
//!   `KEY_WEATHER_ID` (integer), each optional
//! - **Request**: the face puts `/weather` with a single `DATA` key holding a
//!   fresh UUID. The sync layer drops puts whose content did not change, so a
//!   new token guarantees the companion observes a new item every time.
//!
//! Item payloads are JSON-encoded key-value maps.
//!
//! ## Error Handling
//!
//! Connectivity failures are logged and never retried here; the next
//! visibility cycle or the next request is the retry path. Undecodable
//! payloads are logged and skipped.

use crate::weather::WeatherUpdate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Logical path carrying weather items.
pub const WEATHER_PATH: &str = "/weather";

/// Key of the request token written by [`SyncChannel::trigger`].
pub const KEY_REQUEST: &str = "DATA";

/// Errors surfaced by the data-sync layer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Payload was not a valid key-value map
    #[error("payload decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// Operation needs a live connection
    #[error("not connected")]
    NotConnected,

    /// Connection could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The layer refused or lost a put
    #[error("put failed: {0}")]
    PutFailed(String),
}

/// A single value in a data map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

/// Key-value payload of a data item.
pub type DataMap = BTreeMap<String, DataValue>;

/// Encode a data map into item payload bytes.
pub fn encode_map(map: &DataMap) -> Result<Vec<u8>, SyncError> {
    Ok(serde_json::to_vec(map)?)
}

/// Decode item payload bytes into a data map.
pub fn decode_map(payload: &[u8]) -> Result<DataMap, SyncError> {
    Ok(serde_json::from_slice(payload)?)
}

/// What happened to a data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEventKind {
    Changed,
    Deleted,
}

/// One entry of a change batch delivered to the listener.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEvent {
    pub kind: DataEventKind,
    pub path: String,
    pub payload: Vec<u8>,
}

impl DataEvent {
    /// Build a `Changed` event carrying `map`.
    pub fn changed(path: &str, map: &DataMap) -> Result<Self, SyncError> {
        Ok(DataEvent {
            kind: DataEventKind::Changed,
            path: path.to_string(),
            payload: encode_map(map)?,
        })
    }
}

/// Identifies one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

/// Connectivity collaborator provided by the host.
///
/// Every call returns immediately. Connection results, change batches and put
/// completions are delivered later through [`crate::face::SyncCallbacks`].
/// Connection results carry the [`AttemptId`] passed to `connect`.
pub trait DataLayer {
    fn connect(&mut self, attempt: AttemptId);
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn add_listener(&mut self);
    fn remove_listener(&mut self);

    /// Create or replace the item at `path`. `request_id` identifies the
    /// completion reported back through `on_put_result`.
    fn put(&mut self, path: &str, payload: Vec<u8>, request_id: &str);
}

/// Connection state as seen by the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Weather content extracted from one change batch.
#[derive(Debug, Default)]
pub struct WeatherBatch {
    /// Events that hit the weather path, decodable or not
    pub matched: usize,
    /// Decoded updates in delivery order
    pub updates: Vec<WeatherUpdate>,
}

/// Connection lifecycle and decoding for the companion data channel.
pub struct SyncChannel {
    layer: Box<dyn DataLayer>,
    state: ConnectionState,
    listening: bool,
    weather_path: String,
    attempt: Option<AttemptId>,
    next_attempt: u64,
}

impl SyncChannel {
    pub fn new(layer: Box<dyn DataLayer>, weather_path: impl Into<String>) -> Self {
        SyncChannel {
            layer,
            state: ConnectionState::Disconnected,
            listening: false,
            weather_path: weather_path.into(),
            attempt: None,
            next_attempt: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while a change listener is registered.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn weather_path(&self) -> &str {
        &self.weather_path
    }

    /// Attempt the channel currently accepts connection results for.
    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.attempt
    }

    /// Start connecting. No-op unless disconnected.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            log::debug!("Connect skipped, already {:?}", self.state);
            return;
        }
        self.next_attempt += 1;
        let attempt = AttemptId(self.next_attempt);
        self.attempt = Some(attempt);
        self.state = ConnectionState::Connecting;
        self.layer.connect(attempt);
    }

    /// True if `attempt` is the live one; logs and rejects anything else.
    fn is_current(&self, attempt: AttemptId, what: &str) -> bool {
        if self.attempt == Some(attempt) {
            return true;
        }
        log::debug!("Ignoring {} for stale attempt {:?}", what, attempt);
        false
    }

    /// Drop the listener and the connection.
    ///
    /// A pending connection attempt is abandoned as well, so its late
    /// results cannot register a listener while hidden or tear down a newer
    /// attempt.
    pub fn disconnect(&mut self) {
        self.attempt = None;
        if self.state == ConnectionState::Disconnected {
            return;
        }
        if self.listening && self.layer.is_connected() {
            self.layer.remove_listener();
        }
        self.listening = false;
        self.layer.disconnect();
        self.state = ConnectionState::Disconnected;
    }

    /// Connection established, or re-established after a suspension:
    /// make sure the one listener is registered and request fresh data.
    ///
    /// Returns the request token, or `None` if the attempt is no longer
    /// wanted.
    pub fn on_connected(&mut self, attempt: AttemptId) -> Option<String> {
        if !self.is_current(attempt, "connection") {
            return None;
        }
        if self.state == ConnectionState::Connected {
            log::info!("Companion connection resumed");
        } else {
            log::info!("Connected to companion data layer");
        }
        self.state = ConnectionState::Connected;
        if !self.listening {
            self.layer.add_listener();
            self.listening = true;
        }

        match self.trigger() {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("Weather request not sent: {}", e);
                None
            }
        }
    }

    pub fn on_connection_suspended(&mut self, cause: i32) {
        log::info!("Companion connection suspended (cause {})", cause);
    }

    pub fn on_connection_failed(&mut self, attempt: AttemptId, error: &SyncError) {
        if !self.is_current(attempt, "connection failure") {
            return;
        }
        log::warn!("Companion connection failed: {}", error);
        self.attempt = None;
        self.listening = false;
        self.state = ConnectionState::Disconnected;
    }

    /// Ask the companion for fresh weather.
    ///
    /// Fire-and-forget: the outcome is only logged when the put completes.
    pub fn trigger(&mut self) -> Result<String, SyncError> {
        let token = Uuid::new_v4().to_string();
        let mut map = DataMap::new();
        map.insert(KEY_REQUEST.to_string(), DataValue::from(token.as_str()));
        let payload = encode_map(&map)?;
        self.layer.put(&self.weather_path, payload, &token);
        log::debug!("Requested weather refresh ({})", token);
        Ok(token)
    }

    /// Log the completion of a [`SyncChannel::trigger`] put.
    pub fn on_put_result(&mut self, request_id: &str, result: &Result<(), SyncError>) {
        match result {
            Ok(()) => log::debug!("Weather request {} delivered", request_id),
            Err(e) => log::warn!("Weather request {} unsuccessful: {}", request_id, e),
        }
    }

    /// Decode the weather updates carried by a change batch.
    ///
    /// Only `Changed` events on the weather path count. Batches arriving
    /// without a registered listener are stale and ignored.
    pub fn weather_batch(&self, events: &[DataEvent]) -> WeatherBatch {
        let mut batch = WeatherBatch::default();
        if !self.listening {
            log::debug!("Dropping {} data events, no listener", events.len());
            return batch;
        }

        for event in events {
            if event.kind != DataEventKind::Changed {
                continue;
            }
            if event.path != self.weather_path {
                log::debug!("Ignoring data change on {}", event.path);
                continue;
            }
            batch.matched += 1;
            match decode_map(&event.payload) {
                Ok(map) => batch.updates.push(WeatherUpdate::from_data_map(&map)),
                Err(e) => log::warn!("Undecodable weather payload: {}", e),
            }
        }
        batch
    }
}
