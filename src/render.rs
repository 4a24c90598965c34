//! # Frame Composition
//!
//! Resolves everything the drawing backend needs for one frame (time and date
//! strings, background accent, which paints to use and whether the weather
//! block is shown) and hands the result to a [`Renderer`].
//!
//! The only business rule here is the weekday accent: Sunday selects accent 0,
//! Monday 1, through Saturday 6, with no other input.
//!
//! [`AsciiRenderer`] prints frames to a terminal for development without a
//! display.

use crate::config::TextSizes;
use crate::face::FaceState;
use crate::weather::WeatherSnapshot;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use image::RgbaImage;
use std::io::{self, Write};

/// Background accent, one per weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accent {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Accent {
    /// Index 0..=6, Sunday first.
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Accent for a weekday.
pub fn accent_for(weekday: Weekday) -> Accent {
    match weekday {
        Weekday::Sun => Accent::Sunday,
        Weekday::Mon => Accent::Monday,
        Weekday::Tue => Accent::Tuesday,
        Weekday::Wed => Accent::Wednesday,
        Weekday::Thu => Accent::Thursday,
        Weekday::Fri => Accent::Friday,
        Weekday::Sat => Accent::Saturday,
    }
}

/// Surface size handed to `on_draw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn center_x(&self) -> f32 {
        self.width as f32 / 2.0
    }
}

/// Text style state the core controls: size and anti-aliasing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPaint {
    pub size: f32,
    pub anti_alias: bool,
}

impl Default for TextPaint {
    fn default() -> Self {
        TextPaint {
            size: 0.0,
            anti_alias: true,
        }
    }
}

/// Every text paint the face draws with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPaints {
    pub time: TextPaint,
    pub am_pm: TextPaint,
    pub date: TextPaint,
    pub date_ambient: TextPaint,
    pub temp_high: TextPaint,
    pub temp_low: TextPaint,
    pub temp_low_ambient: TextPaint,
}

impl TextPaints {
    pub fn new(sizes: TextSizes) -> Self {
        let mut paints = Self::default();
        paints.apply_sizes(sizes);
        paints
    }

    fn all_mut(&mut self) -> [&mut TextPaint; 7] {
        [
            &mut self.time,
            &mut self.am_pm,
            &mut self.date,
            &mut self.date_ambient,
            &mut self.temp_high,
            &mut self.temp_low,
            &mut self.temp_low_ambient,
        ]
    }

    /// Apply screen-shape dependent text sizes.
    pub fn apply_sizes(&mut self, sizes: TextSizes) {
        self.time.size = sizes.time;
        self.am_pm.size = sizes.temperature * 0.8;
        self.date.size = sizes.date;
        self.date_ambient.size = sizes.date;
        self.temp_high.size = sizes.temperature;
        self.temp_low.size = sizes.temperature;
        self.temp_low_ambient.size = sizes.temperature;
    }

    pub fn set_anti_alias(&mut self, enabled: bool) {
        for paint in self.all_mut() {
            paint.anti_alias = enabled;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextPaint> {
        [
            &self.time,
            &self.am_pm,
            &self.date,
            &self.date_ambient,
            &self.temp_high,
            &self.temp_low,
            &self.temp_low_ambient,
        ]
        .into_iter()
    }
}

/// Background fill for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Black,
    Accent(Accent),
}

/// Formatted clock text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeText {
    pub text: String,
    /// "AM"/"PM" marker in 12-hour mode
    pub am_pm: Option<&'static str>,
}

/// Weather block, present only when high, low and icon are all known.
#[derive(Debug, Clone, Copy)]
pub struct WeatherBlock<'a> {
    pub high: &'a str,
    pub low: &'a str,
    /// Omitted in ambient mode
    pub icon: Option<&'a RgbaImage>,
    pub high_paint: TextPaint,
    pub low_paint: TextPaint,
}

/// Fully resolved frame.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub bounds: Bounds,
    pub ambient: bool,
    pub is_round: bool,
    pub background: Background,
    pub time: TimeText,
    pub time_paint: TextPaint,
    pub am_pm_paint: TextPaint,
    pub date: String,
    pub date_paint: TextPaint,
    pub weather: Option<WeatherBlock<'a>>,
}

/// Drawing backend.
pub trait Renderer {
    fn draw(&mut self, frame: &Frame<'_>);
}

/// Clock text: `HH:MM` in 24-hour mode, `h:MM` plus AM/PM otherwise.
pub fn format_time<T: Timelike>(now: &T, use_24_hour: bool) -> TimeText {
    if use_24_hour {
        TimeText {
            text: format!("{:02}:{:02}", now.hour(), now.minute()),
            am_pm: None,
        }
    } else {
        let (is_pm, hour) = now.hour12();
        TimeText {
            text: format!("{}:{:02}", hour, now.minute()),
            am_pm: Some(if is_pm { "PM" } else { "AM" }),
        }
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SUN",
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
    }
}

fn month_name(month0: u32) -> &'static str {
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    MONTHS[(month0 % 12) as usize]
}

/// Date text, e.g. `MON, OCT 19 2026`.
pub fn format_date<D: Datelike>(now: &D) -> String {
    format!(
        "{}, {} {} {}",
        day_name(now.weekday()),
        month_name(now.month0()),
        now.day(),
        now.year()
    )
}

/// Build the frame for `now`.
pub fn compose<'a>(
    state: &FaceState,
    weather: &'a WeatherSnapshot,
    paints: &TextPaints,
    now: &DateTime<FixedOffset>,
    use_24_hour: bool,
    bounds: Bounds,
) -> Frame<'a> {
    let ambient = state.ambient;
    let background = if ambient {
        Background::Black
    } else {
        Background::Accent(accent_for(now.weekday()))
    };

    let weather_block = match (&weather.high, &weather.low, &weather.icon) {
        (Some(high), Some(low), Some(icon)) => Some(WeatherBlock {
            high,
            low,
            icon: if ambient { None } else { Some(icon) },
            high_paint: paints.temp_high,
            low_paint: if ambient {
                paints.temp_low_ambient
            } else {
                paints.temp_low
            },
        }),
        _ => None,
    };

    Frame {
        bounds,
        ambient,
        is_round: state.is_round,
        background,
        time: format_time(now, use_24_hour),
        time_paint: paints.time,
        am_pm_paint: paints.am_pm,
        date: format_date(now),
        date_paint: if ambient {
            paints.date_ambient
        } else {
            paints.date
        },
        weather: weather_block,
    }
}

/// Terminal renderer for development mode.
pub struct AsciiRenderer<W: Write> {
    out: W,
    frames: usize,
}

impl AsciiRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AsciiRenderer<W> {
    pub fn new(out: W) -> Self {
        AsciiRenderer { out, frames: 0 }
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let mode = if frame.ambient { "ambient" } else { "interactive" };
        let background = match frame.background {
            Background::Black => "black".to_string(),
            Background::Accent(accent) => format!("accent {}", accent.index()),
        };
        let time = match frame.time.am_pm {
            Some(marker) => format!("{} {}", frame.time.text, marker),
            None => frame.time.text.clone(),
        };
        writeln!(self.out, "[{} | {}] {}", mode, background, time)?;
        writeln!(self.out, "  {}", frame.date)?;
        match &frame.weather {
            Some(block) => {
                let icon = match block.icon {
                    Some(icon) => format!("[{}x{}] ", icon.width(), icon.height()),
                    None => String::new(),
                };
                writeln!(self.out, "  ----")?;
                writeln!(self.out, "  {}{}  {}", icon, block.high, block.low)?;
            }
            None => writeln!(self.out, "  (no weather)")?,
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for AsciiRenderer<W> {
    fn draw(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        if let Err(e) = self.write_frame(frame) {
            log::warn!("ASCII frame write failed: {}", e);
        }
    }
}
