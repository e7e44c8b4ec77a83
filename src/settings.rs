//! Settings surface: raw form input to validated preferences, and the save flow

use crate::autostart::Autostart;
use crate::preferences::{OverlayColor, Preferences, PreferencesStore, SettingsError};
use crate::session::Session;
use anyhow::Result;
use log::{info, warn};
use std::str::FromStr;

/// Text exactly as typed into the settings fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub work_duration: String,
    pub break_duration: String,
    /// "#RRGGBB" or "#RRGGBBAA"
    pub overlay_color: String,
    pub overlay_opacity: String,
    pub timer_width: String,
    pub timer_height: String,
    pub font_size: String,
    pub hide_timer: bool,
    pub autostart: bool,
}

impl SettingsForm {
    /// Prefill the form from the current preferences
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            work_duration: prefs.work_duration_minutes.to_string(),
            break_duration: prefs.break_duration_minutes.to_string(),
            overlay_color: prefs.overlay_color.to_hex(),
            overlay_opacity: prefs.overlay_opacity_percent.to_string(),
            timer_width: prefs.window_width.to_string(),
            timer_height: prefs.window_height.to_string(),
            font_size: prefs.font_size_px.to_string(),
            hide_timer: prefs.hide_timer_until_last_minute,
            autostart: prefs.autostart_enabled,
        }
    }

    /// Validate every field. `base` supplies what the form does not edit.
    pub fn parse(&self, base: &Preferences) -> Result<Preferences, SettingsError> {
        let prefs = Preferences {
            work_duration_minutes: number("Work duration", &self.work_duration)?,
            break_duration_minutes: number("Break duration", &self.break_duration)?,
            overlay_color: OverlayColor::parse_hex(&self.overlay_color)?,
            overlay_opacity_percent: number("Overlay opacity", &self.overlay_opacity)?,
            window_width: number("Timer width", &self.timer_width)?,
            window_height: number("Timer height", &self.timer_height)?,
            font_size_px: number("Font size", &self.font_size)?,
            hide_timer_until_last_minute: self.hide_timer,
            autostart_enabled: self.autostart,
            window_position: base.window_position,
        };
        prefs.validate()?;
        Ok(prefs)
    }
}

fn number<T: FromStr>(field: &'static str, text: &str) -> Result<T, SettingsError> {
    text.trim()
        .parse()
        .map_err(|_| SettingsError::NotANumber { field })
}

/// Save flow: autostart first, then the running session, then disk.
///
/// Invalid preferences are rejected before anything is touched. An autostart
/// failure is logged and the old flag kept. A failed write is returned; the
/// session already holds the new preferences either way.
pub fn apply_settings(
    session: &mut Session,
    store: &PreferencesStore,
    autostart: &mut dyn Autostart,
    mut prefs: Preferences,
) -> Result<()> {
    prefs.validate()?;

    let current = session.preferences();
    let was_enabled = current.autostart_enabled;
    // The widget may have been dragged while the form was open
    prefs.window_position = current.window_position;

    if prefs.autostart_enabled != was_enabled {
        match autostart.set_registered(prefs.autostart_enabled) {
            Ok(()) => info!(
                "Autostart {}",
                if prefs.autostart_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            ),
            Err(e) => {
                warn!("Failed to update autostart: {:#}", e);
                prefs.autostart_enabled = was_enabled;
            }
        }
    }

    session.update_preferences(prefs)?;
    store.save(session.preferences())
}
