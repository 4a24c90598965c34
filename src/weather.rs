//! # Weather Snapshot
//!
//! Latest reconciled weather state shown by the face: high and low
//! temperature strings and a condition icon. Each sync update touches only the
//! fields it carries; an absent key never clears a field.
//!
//! ## Condition Codes
//!
//! The companion sends OpenWeatherMap condition codes. They map onto a small
//! set of icon families:
//!
//! | Codes            | Icon         |
//! |------------------|--------------|
//! | 200-232          | storm        |
//! | 300-321          | light rain   |
//! | 500-504, 520-531 | rain         |
//! | 511, 600-622     | snow         |
//! | 701-761          | fog          |
//! | 781              | storm        |
//! | 800              | clear        |
//! | 801              | light clouds |
//! | 802-804          | clouds       |
//!
//! Any other code has no icon. The raw icon is rescaled so its height matches
//! the high-temperature text size, keeping its aspect ratio.

use crate::sync::DataMap;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const KEY_HIGH: &str = "KEY_MAX_TEMP";
pub const KEY_LOW: &str = "KEY_MIN_TEMP";
pub const KEY_WEATHER_ID: &str = "KEY_WEATHER_ID";

/// Errors resolving a condition code into a displayable icon.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Code outside every known condition range
    #[error("unknown weather condition {0}")]
    UnknownCondition(i32),

    /// Icon file missing or not a decodable image
    #[error("icon image: {0}")]
    Image(#[from] image::ImageError),

    /// Icon or target size has a zero dimension
    #[error("empty icon")]
    EmptyIcon,
}

/// Icon family for a condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherCondition {
    Storm,
    LightRain,
    Rain,
    Snow,
    Fog,
    Clear,
    LightClouds,
    Clouds,
}

impl WeatherCondition {
    /// Map an OpenWeatherMap condition code to its icon family.
    pub fn from_code(code: i32) -> Option<Self> {
        use WeatherCondition::*;
        match code {
            200..=232 => Some(Storm),
            300..=321 => Some(LightRain),
            500..=504 => Some(Rain),
            511 => Some(Snow),
            520..=531 => Some(Rain),
            600..=622 => Some(Snow),
            701..=761 => Some(Fog),
            781 => Some(Storm),
            800 => Some(Clear),
            801 => Some(LightClouds),
            802..=804 => Some(Clouds),
            _ => None,
        }
    }

    /// Base file name of the icon asset.
    pub fn icon_name(self) -> &'static str {
        match self {
            WeatherCondition::Storm => "ic_storm",
            WeatherCondition::LightRain => "ic_light_rain",
            WeatherCondition::Rain => "ic_rain",
            WeatherCondition::Snow => "ic_snow",
            WeatherCondition::Fog => "ic_fog",
            WeatherCondition::Clear => "ic_clear",
            WeatherCondition::LightClouds => "ic_light_clouds",
            WeatherCondition::Clouds => "ic_cloudy",
        }
    }
}

/// Looks up the raw icon image for a condition.
pub trait IconSource {
    fn raw_icon(&self, condition: WeatherCondition) -> Result<RgbaImage, WeatherError>;
}

/// Icons loaded from `<dir>/<icon_name>.png`.
#[derive(Debug, Clone)]
pub struct DirectoryIcons {
    dir: PathBuf,
}

impl DirectoryIcons {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        DirectoryIcons {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl IconSource for DirectoryIcons {
    fn raw_icon(&self, condition: WeatherCondition) -> Result<RgbaImage, WeatherError> {
        let path = self.dir.join(format!("{}.png", condition.icon_name()));
        Ok(image::open(path)?.to_rgba8())
    }
}

/// Generated 4:3 glyphs, one colour per icon family. Used when no icon
/// directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinIcons;

impl BuiltinIcons {
    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;

    fn colour(condition: WeatherCondition) -> Rgba<u8> {
        match condition {
            WeatherCondition::Storm => Rgba([90, 90, 140, 255]),
            WeatherCondition::LightRain => Rgba([120, 170, 220, 255]),
            WeatherCondition::Rain => Rgba([60, 120, 200, 255]),
            WeatherCondition::Snow => Rgba([240, 240, 255, 255]),
            WeatherCondition::Fog => Rgba([180, 180, 180, 255]),
            WeatherCondition::Clear => Rgba([255, 200, 40, 255]),
            WeatherCondition::LightClouds => Rgba([220, 220, 200, 255]),
            WeatherCondition::Clouds => Rgba([160, 160, 170, 255]),
        }
    }
}

impl IconSource for BuiltinIcons {
    fn raw_icon(&self, condition: WeatherCondition) -> Result<RgbaImage, WeatherError> {
        let colour = Self::colour(condition);
        let (cx, cy) = (Self::WIDTH as f32 / 2.0, Self::HEIGHT as f32 / 2.0);
        let radius = Self::HEIGHT as f32 / 2.0;
        Ok(RgbaImage::from_fn(Self::WIDTH, Self::HEIGHT, |x, y| {
            let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
            if dx * dx + dy * dy <= radius * radius {
                colour
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }
}

/// Rescale `icon` to `height` pixels tall, keeping its aspect ratio.
pub fn scale_to_height(icon: &RgbaImage, height: f32) -> Result<RgbaImage, WeatherError> {
    let target_height = height as u32;
    if icon.width() == 0 || icon.height() == 0 || target_height == 0 {
        return Err(WeatherError::EmptyIcon);
    }
    let scaled_width = (height / icon.height() as f32) * icon.width() as f32;
    let target_width = (scaled_width as u32).max(1);
    Ok(imageops::resize(
        icon,
        target_width,
        target_height,
        FilterType::Triangle,
    ))
}

/// Resolve a condition code into an icon sized for the temperature text.
pub fn resolve_icon(
    code: i32,
    icons: &dyn IconSource,
    height: f32,
) -> Result<RgbaImage, WeatherError> {
    let condition = WeatherCondition::from_code(code).ok_or(WeatherError::UnknownCondition(code))?;
    let raw = icons.raw_icon(condition)?;
    scale_to_height(&raw, height)
}

/// Fields carried by one weather sync event. `None` means "key absent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherUpdate {
    pub high: Option<String>,
    pub low: Option<String>,
    pub condition_id: Option<i32>,
}

impl WeatherUpdate {
    /// Pull the weather keys out of a decoded payload.
    ///
    /// A key holding the wrong value type is treated as absent.
    pub fn from_data_map(map: &DataMap) -> Self {
        let text = |key: &str| match map.get(key) {
            Some(value) => {
                let text = value.as_str().map(str::to_string);
                if text.is_none() {
                    log::warn!("Ignoring non-string {}: {:?}", key, value);
                }
                text
            }
            None => None,
        };

        let condition_id = match map.get(KEY_WEATHER_ID) {
            Some(value) => {
                let code = value.as_i64().and_then(|v| i32::try_from(v).ok());
                if code.is_none() {
                    log::warn!("Ignoring invalid {}: {:?}", KEY_WEATHER_ID, value);
                }
                code
            }
            None => None,
        };

        WeatherUpdate {
            high: text(KEY_HIGH),
            low: text(KEY_LOW),
            condition_id,
        }
    }
}

/// Latest weather used for rendering.
#[derive(Debug, Clone, Default)]
pub struct WeatherSnapshot {
    pub high: Option<String>,
    pub low: Option<String>,
    pub condition_id: Option<i32>,
    pub icon: Option<RgbaImage>,
}

impl WeatherSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when high, low and icon are all known.
    pub fn is_complete(&self) -> bool {
        self.high.is_some() && self.low.is_some() && self.icon.is_some()
    }

    /// Merge one update. Present keys overwrite, absent keys keep the old
    /// value. An unresolvable condition code leaves the icon untouched.
    pub fn apply(&mut self, update: &WeatherUpdate, icons: &dyn IconSource, icon_height: f32) {
        match &update.high {
            Some(high) => {
                log::debug!("High = {}", high);
                self.high = Some(high.clone());
            }
            None => log::debug!("Data unavailable - high temp"),
        }

        match &update.low {
            Some(low) => {
                log::debug!("Low = {}", low);
                self.low = Some(low.clone());
            }
            None => log::debug!("Data unavailable - low temp"),
        }

        match update.condition_id {
            Some(code) => match resolve_icon(code, icons, icon_height) {
                Ok(icon) => {
                    log::debug!("Weather id = {} ({}x{})", code, icon.width(), icon.height());
                    self.condition_id = Some(code);
                    self.icon = Some(icon);
                }
                Err(e) => log::warn!("No icon for weather id {}: {}", code, e),
            },
            None => log::debug!("Data unavailable - weather id"),
        }
    }
}
