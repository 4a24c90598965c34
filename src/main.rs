//! # Sunshine Watch Face Demo Entry Point
//!
//! Runs the watch face core against the in-memory loopback data layer and a
//! simulated companion, printing frames to the terminal. The scripted session
//! walks through the whole lifecycle: visible and interactive, ambient with
//! minute ticks, back to interactive, hidden, destroyed.
//!
//! Flags:
//! - `--config <path>`: config file (default `face-config.toml`)
//! - `--seconds <n>`: length of each interactive phase (default 3)
//! - `--offline`: simulate an unreachable sync service

use anyhow::Context;
use std::env;
use std::time::Duration;
use sunshine_face_lib::config::{Config, LoggingConfig, DEFAULT_CONFIG_FILE};
use sunshine_face_lib::face::Collaborators;
use sunshine_face_lib::host::{
    event_queue, CannedWeather, DirtyFlag, EventSender, FaceRunner, HostEvent,
    LoggingTimeZoneNotifier, LoopbackDataLayer, TokioTimer,
};
use sunshine_face_lib::render::{AsciiRenderer, Bounds};
use sunshine_face_lib::time_source::SystemClock;
use sunshine_face_lib::weather::{BuiltinIcons, DirectoryIcons, IconSource};
use sunshine_face_lib::WatchFace;

/// Command-line options.
struct Options {
    config_path: String,
    phase: Duration,
    offline: bool,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options {
        config_path: DEFAULT_CONFIG_FILE.to_string(),
        phase: Duration::from_secs(3),
        offline: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                options.config_path = args.next().context("--config needs a path")?;
            }
            "--seconds" => {
                let value = args.next().context("--seconds needs a value")?;
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("invalid --seconds value: {}", value))?;
                options.phase = Duration::from_secs(secs);
            }
            "--offline" => options.offline = true,
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }
    Ok(options)
}

/// Feed the lifecycle script into the host queue.
async fn drive_session(events: EventSender, phase: Duration) {
    let send = |event: HostEvent| {
        if events.send(event).is_err() {
            log::warn!("Face stopped before the session ended");
        }
    };

    send(HostEvent::Create);
    send(HostEvent::Geometry { is_round: true });
    send(HostEvent::Properties {
        low_bit_ambient: true,
    });
    send(HostEvent::Visibility(true));
    tokio::time::sleep(phase).await;

    log::info!("Entering ambient mode");
    send(HostEvent::Ambient(true));
    send(HostEvent::TimeTick);
    tokio::time::sleep(phase / 2).await;
    send(HostEvent::TimeTick);

    log::info!("Leaving ambient mode");
    send(HostEvent::Ambient(false));
    tokio::time::sleep(phase).await;

    send(HostEvent::Visibility(false));
    send(HostEvent::Destroy);
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let options = parse_args()?;
    // Parse first for the log level; the outcome is logged once the logger runs.
    let loaded = Config::try_load_from_path(&options.config_path);
    let level = match &loaded {
        Ok(config) => config.logging.level.clone(),
        Err(_) => LoggingConfig::default().level,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!("Starting Sunshine watch face demo");

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", options.config_path);
            config
        }
        Err(e) => Config::fallback(&e),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let frames = rt.block_on(async move {
        let (events, queue) = event_queue();
        let dirty = DirtyFlag::new();

        let icons: Box<dyn IconSource> = match &config.display.icon_dir {
            Some(dir) => Box::new(DirectoryIcons::new(dir)),
            None => Box::new(BuiltinIcons),
        };

        let mut data_layer = LoopbackDataLayer::new(events.clone()).with_companion(Box::new(
            CannedWeather {
                high: "72°".to_string(),
                low: "58°".to_string(),
                condition_id: 800,
            },
        ));
        if options.offline {
            data_layer = data_layer.unavailable();
        }

        let face = WatchFace::new(
            &config,
            Collaborators {
                timer: Box::new(TokioTimer::new(events.clone())),
                data_layer: Box::new(data_layer),
                time_zone: Box::new(LoggingTimeZoneNotifier),
                clock: Box::new(SystemClock::new()),
                icons,
                invalidator: Box::new(dirty.clone()),
            },
        );

        let runner = FaceRunner::new(
            face,
            queue,
            AsciiRenderer::stdout(),
            Bounds {
                width: 320,
                height: 320,
            },
            dirty,
        );

        tokio::spawn(drive_session(events, options.phase));
        runner.run().await.frames()
    });

    log::info!("Session finished after {} frames", frames);
    Ok(())
}
