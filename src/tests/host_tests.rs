//! Face driven through the tokio host binding and the loopback data layer.

use super::fakes::{at, RecordingRenderer};
use crate::config::Config;
use crate::face::{Collaborators, Invalidator, WatchFace};
use crate::host::{
    event_queue, CannedWeather, DirtyFlag, EventSender, FaceRunner, HostEvent,
    LoggingTimeZoneNotifier, LoopbackDataLayer, TokioTimer,
};
use crate::render::Bounds;
use crate::sync::ConnectionState;
use crate::time_source::ManualClock;
use crate::weather::BuiltinIcons;
use std::time::Duration;

fn canned() -> Box<CannedWeather> {
    Box::new(CannedWeather {
        high: "72°".to_string(),
        low: "58°".to_string(),
        condition_id: 800,
    })
}

fn runner(
    events: &EventSender,
    layer: LoopbackDataLayer,
    queue: crate::host::EventReceiver,
) -> FaceRunner<RecordingRenderer> {
    let dirty = DirtyFlag::new();
    let face = WatchFace::new(
        &Config::default(),
        Collaborators {
            timer: Box::new(TokioTimer::new(events.clone())),
            data_layer: Box::new(layer),
            time_zone: Box::new(LoggingTimeZoneNotifier),
            clock: Box::new(ManualClock::new(at(10, 0, 0, 250))),
            icons: Box::new(BuiltinIcons),
            invalidator: Box::new(dirty.clone()),
        },
    );
    FaceRunner::new(
        face,
        queue,
        RecordingRenderer::default(),
        Bounds {
            width: 320,
            height: 320,
        },
        dirty,
    )
}

#[test]
fn dirty_flag_coalesces_requests() {
    let mut dirty = DirtyFlag::new();
    dirty.invalidate();
    dirty.invalidate();
    assert!(dirty.is_set());
    assert!(dirty.take());
    assert!(!dirty.take());
}

#[tokio::test]
async fn loopback_companion_fills_weather() {
    let (events, queue) = event_queue();
    let layer = LoopbackDataLayer::new(events.clone()).with_companion(canned());
    let mut runner = runner(&events, layer, queue);

    events.send(HostEvent::Create).unwrap();
    events.send(HostEvent::Visibility(true)).unwrap();
    // Connected, PutCompleted and DataChanged are posted while draining
    assert!(runner.drain() >= 5);

    let face = runner.face().unwrap();
    assert_eq!(face.connection_state(), ConnectionState::Connected);
    assert_eq!(face.weather().high.as_deref(), Some("72°"));
    assert_eq!(face.weather().condition_id, Some(800));

    let frames = &runner.renderer().frames;
    assert_eq!(frames.len(), 2, "visibility draw plus one for the batch");
    assert_eq!(
        frames[1].weather,
        Some(("72°".to_string(), "58°".to_string()))
    );
}

#[tokio::test]
async fn connection_arriving_after_hide_is_ignored() {
    let (events, queue) = event_queue();
    let layer = LoopbackDataLayer::new(events.clone()).with_companion(canned());
    let mut runner = runner(&events, layer, queue);

    runner.dispatch(HostEvent::Visibility(true));
    runner.dispatch(HostEvent::Visibility(false));
    runner.drain();

    let face = runner.face().unwrap();
    assert!(!face.is_listening());
    assert_eq!(face.connection_state(), ConnectionState::Disconnected);
    assert!(face.weather().high.is_none());
}

#[tokio::test]
async fn unavailable_service_leaves_face_running() {
    let (events, queue) = event_queue();
    let layer = LoopbackDataLayer::new(events.clone()).unavailable();
    let mut runner = runner(&events, layer, queue);

    runner.dispatch(HostEvent::Visibility(true));
    runner.drain();

    let face = runner.face().unwrap();
    assert_eq!(face.connection_state(), ConnectionState::Disconnected);
    assert!(face.is_timer_armed());
}

#[tokio::test]
async fn events_after_destroy_are_discarded() {
    let (events, queue) = event_queue();
    let layer = LoopbackDataLayer::new(events.clone()).with_companion(canned());
    let mut runner = runner(&events, layer, queue);

    runner.dispatch(HostEvent::Visibility(true));
    let frames = runner.renderer().frames.len();
    runner.dispatch(HostEvent::Destroy);
    assert!(runner.face().is_none());

    // Whatever the layer queued before teardown, plus a late completion
    runner.drain();
    runner.dispatch(HostEvent::PutCompleted {
        request_id: "late".to_string(),
        result: Ok(()),
    });
    runner.dispatch(HostEvent::Visibility(true));

    assert!(runner.face().is_none());
    assert_eq!(runner.renderer().frames.len(), frames);
}

#[tokio::test(start_paused = true)]
async fn tokio_timer_drives_interactive_redraws() {
    let (events, queue) = event_queue();
    let layer = LoopbackDataLayer::new(events.clone()).unavailable();
    let runner = runner(&events, layer, queue);

    let driver = tokio::spawn(async move {
        events.send(HostEvent::Visibility(true)).unwrap();
        // Manual clock stays at .250: fires at 0, 750 and 1500 ms
        tokio::time::sleep(Duration::from_millis(1600)).await;
        events.send(HostEvent::Visibility(false)).unwrap();
        events.send(HostEvent::Destroy).unwrap();
    });

    let renderer = runner.run().await;
    driver.await.unwrap();

    // One for becoming visible, one per timer fire
    assert_eq!(renderer.frames.len(), 4);
    assert!(renderer.frames.iter().all(|f| f.time == "10:00"));
}
