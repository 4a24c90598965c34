//! Property checks over arbitrary host callback sequences.

use super::fakes::Harness;
use crate::face::{FaceCallbacks, SyncCallbacks};
use crate::render::accent_for;
use crate::sync::ConnectionState;
use chrono::Weekday;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Visible(bool),
    Ambient(bool),
    LowBit(bool),
    Fire,
    Tick,
    Connected,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<bool>().prop_map(Step::Visible),
        any::<bool>().prop_map(Step::Ambient),
        any::<bool>().prop_map(Step::LowBit),
        Just(Step::Fire),
        Just(Step::Tick),
        Just(Step::Connected),
    ]
}

fn run(h: &mut Harness, step: &Step) {
    match step {
        Step::Visible(v) => h.face.on_visibility_changed(*v),
        Step::Ambient(a) => h.face.on_ambient_mode_changed(*a),
        Step::LowBit(l) => h.face.on_properties_changed(*l),
        Step::Fire => {
            h.fire_pending();
        }
        Step::Tick => h.face.on_time_tick(),
        Step::Connected => {
            let attempt = h.last_attempt();
            h.face.on_connected(attempt);
        }
    }
}

proptest! {
    #[test]
    fn timer_runs_iff_visible_and_interactive(steps in prop::collection::vec(step(), 0..40)) {
        let mut h = Harness::new();
        for s in &steps {
            run(&mut h, s);
            let state = h.face.state();
            prop_assert_eq!(h.face.is_timer_armed(), state.visible && !state.ambient);
            prop_assert!(h.log.borrow().pending.len() <= 1);
        }
    }

    #[test]
    fn subscriptions_track_visibility(steps in prop::collection::vec(step(), 0..40)) {
        let mut h = Harness::new();
        for s in &steps {
            run(&mut h, s);
            let visible = h.face.state().visible;
            let log = h.log.borrow();
            prop_assert_eq!(h.face.is_time_zone_registered(), visible);
            prop_assert_eq!(log.tz_registers - log.tz_unregisters, usize::from(visible));
            prop_assert!(log.listeners == 0 || log.listeners == 1);
            if !visible {
                prop_assert_eq!(h.face.connection_state(), ConnectionState::Disconnected);
                prop_assert_eq!(log.listeners, 0);
            }
        }
    }

    #[test]
    fn anti_alias_off_only_in_low_bit_ambient(steps in prop::collection::vec(step(), 0..40)) {
        let mut h = Harness::new();
        let mut expected = true;
        for s in &steps {
            let before = h.face.state();
            run(&mut h, s);
            let after = h.face.state();
            if before.ambient != after.ambient {
                expected = !(after.ambient && after.low_bit_ambient);
            }
            for paint in h.face.paints().iter() {
                prop_assert_eq!(paint.anti_alias, expected);
            }
        }
    }
}

#[test]
fn accent_is_a_pure_function_of_weekday() {
    let mut day = Weekday::Sun;
    let mut seen = Vec::new();
    for _ in 0..7 {
        assert_eq!(accent_for(day), accent_for(day));
        seen.push(accent_for(day).index());
        day = day.succ();
    }
    assert_eq!(seen, (0..7).collect::<Vec<u8>>());
    assert_eq!(day, Weekday::Sun);
}
