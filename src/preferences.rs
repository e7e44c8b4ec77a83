//! Preferences record and its on-disk store
//!
//! This module handles loading and saving the single preferences file. Loading
//! never fails: a missing or partially populated file is repaired with
//! defaults and rewritten, a malformed file falls back to defaults in full.

use crate::constants::{
    BREAK_DEFAULT_MINUTES, DURATION_MIN_MINUTES, FONT_DEFAULT_PX, FONT_MAX_PX, FONT_MIN_PX,
    OVERLAY_DEFAULT_COLOR, OVERLAY_DEFAULT_OPACITY, OVERLAY_HEX_DEFAULT_ALPHA, OVERLAY_MAX_OPACITY,
    WIDGET_DEFAULT_HEIGHT, WIDGET_DEFAULT_WIDTH, WIDGET_MAX_SIDE, WIDGET_MIN_SIDE,
    WORK_DEFAULT_MINUTES,
};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KEY_WORK: &str = "work_duration";
const KEY_BREAK: &str = "break_duration";
const KEY_COLOR: &str = "overlay_color";
const KEY_OPACITY: &str = "overlay_opacity";
const KEY_POSITION: &str = "timer_position";
const KEY_WIDTH: &str = "timer_width";
const KEY_HEIGHT: &str = "timer_height";
const KEY_FONT: &str = "timer_font_size";
const KEY_HIDE: &str = "hide_timer";
const KEY_AUTOSTART: &str = "autostart";

/// Rejection raised at the load/save and settings-edit boundaries.
///
/// The `Display` text is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{field}: please enter a valid number")]
    NotANumber { field: &'static str },
    #[error("{field} must be at least {min} minute(s)")]
    TooShort { field: &'static str, min: u32 },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
    #[error("Invalid color '{0}': expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),
}

/// RGBA overlay tint, stored as a four-element array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct OverlayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<[u8; 4]> for OverlayColor {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<OverlayColor> for [u8; 4] {
    fn from(color: OverlayColor) -> Self {
        [color.r, color.g, color.b, color.a]
    }
}

impl Default for OverlayColor {
    fn default() -> Self {
        OVERLAY_DEFAULT_COLOR.into()
    }
}

impl OverlayColor {
    /// Parse "#RRGGBB" (alpha defaults to 128) or "#RRGGBBAA"
    pub fn parse_hex(text: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidColor(text.to_string());
        let hex = text.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 {
            channel(6)?
        } else {
            OVERLAY_HEX_DEFAULT_ALPHA
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: alpha,
        })
    }

    /// Accept either a four-integer array or a hex string
    fn from_value(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Array(items) if items.len() == 4 => {
                let mut channels = [0u8; 4];
                for (slot, item) in channels.iter_mut().zip(items) {
                    *slot = u8::try_from(item.as_integer()?).ok()?;
                }
                Some(channels.into())
            }
            toml::Value::String(text) => Self::parse_hex(text).ok(),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

/// Top-left corner of the countdown widget. (0, 0) means "not placed yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

impl WindowPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_unset(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// User preferences stored in standup.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Work period in minutes (>= 1)
    #[serde(rename = "work_duration")]
    pub work_duration_minutes: u32,
    /// Rest period in minutes (>= 1)
    #[serde(rename = "break_duration")]
    pub break_duration_minutes: u32,
    pub overlay_color: OverlayColor,
    /// Multiplier applied to the color's alpha (0-100)
    #[serde(rename = "overlay_opacity")]
    pub overlay_opacity_percent: u8,
    /// Widget width in pixels (100-500)
    #[serde(rename = "timer_width")]
    pub window_width: u32,
    /// Widget height in pixels (100-500)
    #[serde(rename = "timer_height")]
    pub window_height: u32,
    /// Countdown font size in pixels (12-72)
    #[serde(rename = "timer_font_size")]
    pub font_size_px: u32,
    #[serde(rename = "hide_timer")]
    pub hide_timer_until_last_minute: bool,
    #[serde(rename = "autostart")]
    pub autostart_enabled: bool,
    /// Kept last so it serializes as a trailing `[timer_position]` table
    #[serde(rename = "timer_position")]
    pub window_position: WindowPosition,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            work_duration_minutes: WORK_DEFAULT_MINUTES,
            break_duration_minutes: BREAK_DEFAULT_MINUTES,
            overlay_color: OverlayColor::default(),
            overlay_opacity_percent: OVERLAY_DEFAULT_OPACITY,
            window_position: WindowPosition::default(),
            window_width: WIDGET_DEFAULT_WIDTH,
            window_height: WIDGET_DEFAULT_HEIGHT,
            font_size_px: FONT_DEFAULT_PX,
            hide_timer_until_last_minute: false,
            autostart_enabled: false,
        }
    }
}

fn in_side_range(v: &u32) -> bool {
    (WIDGET_MIN_SIDE..=WIDGET_MAX_SIDE).contains(v)
}

fn in_font_range(v: &u32) -> bool {
    (FONT_MIN_PX..=FONT_MAX_PX).contains(v)
}

impl Preferences {
    pub fn window_size(&self) -> WindowSize {
        WindowSize {
            width: self.window_width,
            height: self.window_height,
        }
    }

    /// Overlay alpha after applying the opacity percentage
    pub fn effective_overlay_alpha(&self) -> u8 {
        let scaled = u32::from(self.overlay_color.a) * u32::from(self.overlay_opacity_percent);
        ((scaled + 50) / 100).min(255) as u8
    }

    /// Check every bounded field
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.work_duration_minutes < DURATION_MIN_MINUTES {
            return Err(SettingsError::TooShort {
                field: "Work duration",
                min: DURATION_MIN_MINUTES,
            });
        }
        if self.break_duration_minutes < DURATION_MIN_MINUTES {
            return Err(SettingsError::TooShort {
                field: "Break duration",
                min: DURATION_MIN_MINUTES,
            });
        }
        if self.overlay_opacity_percent > OVERLAY_MAX_OPACITY {
            return Err(SettingsError::OutOfRange {
                field: "Overlay opacity",
                min: 0,
                max: u32::from(OVERLAY_MAX_OPACITY),
            });
        }
        for (field, value) in [
            ("Timer width", self.window_width),
            ("Timer height", self.window_height),
        ] {
            if !in_side_range(&value) {
                return Err(SettingsError::OutOfRange {
                    field,
                    min: WIDGET_MIN_SIDE,
                    max: WIDGET_MAX_SIDE,
                });
            }
        }
        if !in_font_range(&self.font_size_px) {
            return Err(SettingsError::OutOfRange {
                field: "Font size",
                min: FONT_MIN_PX,
                max: FONT_MAX_PX,
            });
        }
        Ok(())
    }

    /// Build preferences from a parsed TOML table, filling missing or invalid
    /// keys with defaults. Returns the keys that had to be repaired.
    pub fn from_table(table: &toml::Table) -> (Self, Vec<&'static str>) {
        let defaults = Self::default();
        let mut reader = FieldReader {
            table,
            repaired: Vec::new(),
        };

        let prefs = Self {
            work_duration_minutes: reader.read(KEY_WORK, defaults.work_duration_minutes, |v| {
                *v >= DURATION_MIN_MINUTES
            }),
            break_duration_minutes: reader.read(KEY_BREAK, defaults.break_duration_minutes, |v| {
                *v >= DURATION_MIN_MINUTES
            }),
            overlay_color: reader.color(KEY_COLOR, defaults.overlay_color),
            overlay_opacity_percent: reader.read(
                KEY_OPACITY,
                defaults.overlay_opacity_percent,
                |v| *v <= OVERLAY_MAX_OPACITY,
            ),
            window_position: reader.read(KEY_POSITION, defaults.window_position, |_| true),
            window_width: reader.read(KEY_WIDTH, defaults.window_width, in_side_range),
            window_height: reader.read(KEY_HEIGHT, defaults.window_height, in_side_range),
            font_size_px: reader.read(KEY_FONT, defaults.font_size_px, in_font_range),
            hide_timer_until_last_minute: reader.read(
                KEY_HIDE,
                defaults.hide_timer_until_last_minute,
                |_| true,
            ),
            autostart_enabled: reader.read(KEY_AUTOSTART, defaults.autostart_enabled, |_| true),
        };

        (prefs, reader.repaired)
    }
}

struct FieldReader<'a> {
    table: &'a toml::Table,
    repaired: Vec<&'static str>,
}

impl FieldReader<'_> {
    fn read<T: DeserializeOwned>(
        &mut self,
        key: &'static str,
        default: T,
        valid: impl Fn(&T) -> bool,
    ) -> T {
        let Some(value) = self.table.get(key) else {
            debug!("Preference '{}' missing, using default", key);
            self.repaired.push(key);
            return default;
        };

        match value.clone().try_into::<T>() {
            Ok(parsed) if valid(&parsed) => parsed,
            Ok(_) => {
                warn!("Preference '{}' is out of range, using default", key);
                self.repaired.push(key);
                default
            }
            Err(e) => {
                warn!("Preference '{}' has an invalid value ({}), using default", key, e);
                self.repaired.push(key);
                default
            }
        }
    }

    fn color(&mut self, key: &'static str, default: OverlayColor) -> OverlayColor {
        match self.table.get(key) {
            None => {
                debug!("Preference '{}' missing, using default", key);
                self.repaired.push(key);
                default
            }
            Some(value) => match OverlayColor::from_value(value) {
                // Hex strings are accepted but always written back as arrays
                Some(color) if value.is_array() => color,
                Some(color) => {
                    self.repaired.push(key);
                    color
                }
                None => {
                    warn!("Color format error in '{}', using default color", key);
                    self.repaired.push(key);
                    default
                }
            },
        }
    }
}

/// Reads and writes the preferences file at a fixed path
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, repairing or falling back to defaults. Never fatal.
    pub fn load(&self) -> Preferences {
        if !self.path.exists() {
            info!(
                "Preferences file not found at {}, writing defaults",
                self.path.display()
            );
            let prefs = Preferences::default();
            if let Err(e) = self.save(&prefs) {
                warn!("Failed to write default preferences: {:#}", e);
            }
            return prefs;
        }

        match self.read() {
            Ok((prefs, repaired)) => {
                if !repaired.is_empty() {
                    info!("Repaired preference keys: {}", repaired.join(", "));
                    if let Err(e) = self.save(&prefs) {
                        warn!("Failed to rewrite repaired preferences: {:#}", e);
                    }
                }
                info!("Preferences loaded from: {}", self.path.display());
                prefs
            }
            Err(e) => {
                warn!("Failed to load preferences: {:#}. Using defaults.", e);
                Preferences::default()
            }
        }
    }

    /// Parse the file without repairing it on disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn read(&self) -> Result<(Preferences, Vec<&'static str>)> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences file: {}", self.path.display()))?;
        let table: toml::Table =
            toml::from_str(&contents).context("Failed to parse preferences file")?;
        Ok(Preferences::from_table(&table))
    }

    /// Validate and write preferences. Creates the parent directory if needed.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        prefs.validate().context("Refusing to save invalid preferences")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create preferences directory")?;
        }

        let contents = toml::to_string_pretty(prefs).context("Failed to serialize preferences")?;
        fs::write(&self.path, contents).with_context(|| {
            format!("Failed to write preferences file: {}", self.path.display())
        })?;

        info!("Preferences saved to: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_prefs_path() -> PathBuf {
        use std::thread;
        use std::time::{SystemTime, UNIX_EPOCH};

        let mut base = std::env::temp_dir();
        base.push("standup_tests");
        base.push("preferences");

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tid = format!("{:?}", thread::current().id());
        base.push(format!("t_{nanos}_{tid}"));

        let _ = fs::create_dir_all(&base);

        base.join("standup.toml")
    }

    #[test]
    fn test_defaults_are_valid() {
        let prefs = Preferences::default();
        assert!(prefs.validate().is_ok());
        assert_eq!(prefs.work_duration_minutes, 60);
        assert_eq!(prefs.break_duration_minutes, 10);
        assert_eq!(prefs.overlay_color, OverlayColor::from([144, 238, 144, 128]));
        assert!(prefs.window_position.is_unset());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = temp_prefs_path();
        let store = PreferencesStore::new(&path);

        let original = Preferences {
            work_duration_minutes: 45,
            break_duration_minutes: 7,
            overlay_color: OverlayColor::from([10, 20, 30, 200]),
            overlay_opacity_percent: 80,
            window_position: WindowPosition::new(-1280, 512),
            window_width: 220,
            window_height: 110,
            font_size_px: 36,
            hide_timer_until_last_minute: true,
            autostart_enabled: true,
        };

        store.save(&original).expect("save should succeed");
        let (loaded, repaired) = store.read().expect("read should succeed");

        assert_eq!(loaded, original);
        assert!(repaired.is_empty(), "Nothing to repair: {:?}", repaired);

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_boundary_values_roundtrip() {
        let cases = [
            Preferences {
                work_duration_minutes: DURATION_MIN_MINUTES,
                break_duration_minutes: DURATION_MIN_MINUTES,
                window_width: WIDGET_MIN_SIDE,
                window_height: WIDGET_MIN_SIDE,
                font_size_px: FONT_MIN_PX,
                overlay_opacity_percent: 0,
                overlay_color: OverlayColor::from([0, 0, 0, 0]),
                window_position: WindowPosition::new(-3840, -200),
                ..Preferences::default()
            },
            Preferences {
                window_width: WIDGET_MAX_SIDE,
                window_height: WIDGET_MAX_SIDE,
                font_size_px: FONT_MAX_PX,
                overlay_opacity_percent: OVERLAY_MAX_OPACITY,
                overlay_color: OverlayColor::from([255, 255, 255, 255]),
                window_position: WindowPosition::new(0, 0),
                ..Preferences::default()
            },
            Preferences {
                window_width: WIDGET_MIN_SIDE,
                window_height: WIDGET_MAX_SIDE,
                window_position: WindowPosition::new(-1, 2160),
                hide_timer_until_last_minute: true,
                autostart_enabled: true,
                ..Preferences::default()
            },
        ];

        for (i, original) in cases.iter().enumerate() {
            let path = temp_prefs_path();
            let store = PreferencesStore::new(&path);

            assert!(original.validate().is_ok(), "case {} should validate", i);
            store.save(original).expect("save should succeed");
            let (loaded, repaired) = store.read().expect("read should succeed");

            assert_eq!(&loaded, original, "case {}", i);
            assert!(repaired.is_empty(), "case {} repaired {:?}", i, repaired);

            fs::remove_file(path).ok();
        }
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let path = temp_prefs_path();
        let _ = fs::remove_file(&path);
        let store = PreferencesStore::new(&path);

        let prefs = store.load();

        assert_eq!(prefs, Preferences::default());
        assert!(path.exists(), "Defaults should be written immediately");

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_partial_file_is_merged_and_rewritten() {
        let path = temp_prefs_path();
        fs::write(&path, "work_duration = 25\nhide_timer = true\n").unwrap();
        let store = PreferencesStore::new(&path);

        let prefs = store.load();

        assert_eq!(prefs.work_duration_minutes, 25);
        assert!(prefs.hide_timer_until_last_minute);
        assert_eq!(prefs.break_duration_minutes, BREAK_DEFAULT_MINUTES);

        let (reread, repaired) = store.read().unwrap();
        assert_eq!(reread, prefs);
        assert!(repaired.is_empty(), "File should now be complete");

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let path = temp_prefs_path();
        fs::write(&path, "work_duration = = 25 [[[").unwrap();
        let store = PreferencesStore::new(&path);

        assert_eq!(store.load(), Preferences::default());

        // The broken file is left for the user to inspect
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[[["));

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_out_of_range_fields_are_reset() {
        let table: toml::Table = toml::from_str(
            r#"
work_duration = 0
timer_width = 900
timer_font_size = 30
overlay_opacity = 250
"#,
        )
        .unwrap();

        let (prefs, repaired) = Preferences::from_table(&table);

        assert_eq!(prefs.work_duration_minutes, WORK_DEFAULT_MINUTES);
        assert_eq!(prefs.window_width, WIDGET_DEFAULT_WIDTH);
        assert_eq!(prefs.font_size_px, 30);
        assert_eq!(prefs.overlay_opacity_percent, OVERLAY_DEFAULT_OPACITY);
        assert!(repaired.contains(&KEY_WORK));
        assert!(repaired.contains(&KEY_WIDTH));
        assert!(!repaired.contains(&KEY_FONT));
    }

    #[test]
    fn test_wrong_type_is_reset() {
        let table: toml::Table = toml::from_str("break_duration = \"ten\"").unwrap();
        let (prefs, repaired) = Preferences::from_table(&table);
        assert_eq!(prefs.break_duration_minutes, BREAK_DEFAULT_MINUTES);
        assert!(repaired.contains(&KEY_BREAK));
    }

    #[test]
    fn test_color_from_hex_string() {
        let table: toml::Table = toml::from_str("overlay_color = \"#336699\"").unwrap();
        let (prefs, repaired) = Preferences::from_table(&table);
        assert_eq!(prefs.overlay_color, OverlayColor::from([0x33, 0x66, 0x99, 128]));
        assert!(
            repaired.contains(&KEY_COLOR),
            "Hex colors are rewritten as arrays"
        );
    }

    #[test]
    fn test_color_with_wrong_arity_uses_default() {
        let table: toml::Table = toml::from_str("overlay_color = [1, 2, 3]").unwrap();
        let (prefs, _) = Preferences::from_table(&table);
        assert_eq!(prefs.overlay_color, OverlayColor::default());

        let table: toml::Table = toml::from_str("overlay_color = [1, 2, 3, 300]").unwrap();
        let (prefs, _) = Preferences::from_table(&table);
        assert_eq!(prefs.overlay_color, OverlayColor::default());
    }

    #[test]
    fn test_parse_hex_with_alpha() {
        assert_eq!(
            OverlayColor::parse_hex("#000000B4").unwrap(),
            OverlayColor::from([0, 0, 0, 180])
        );
        assert!(OverlayColor::parse_hex("000000").is_err());
        assert!(OverlayColor::parse_hex("#12345").is_err());
        assert!(OverlayColor::parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_effective_alpha() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.effective_overlay_alpha(), 128);
        prefs.overlay_opacity_percent = 50;
        assert_eq!(prefs.effective_overlay_alpha(), 64);
        prefs.overlay_opacity_percent = 0;
        assert_eq!(prefs.effective_overlay_alpha(), 0);
    }

    #[test]
    fn test_save_rejects_invalid_preferences() {
        let path = temp_prefs_path();
        let store = PreferencesStore::new(&path);
        let prefs = Preferences {
            font_size_px: 200,
            ..Preferences::default()
        };

        let result = store.save(&prefs);

        assert!(result.is_err());
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Font size"), "{}", message);
        assert!(!path.exists());
    }
}
